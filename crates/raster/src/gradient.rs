//! Linear gradient rendering.

use sheetdeck_core::{Error, GradientDescriptor, RasterImage, Rasterizer, Result};
use tiny_skia::{
    Color, GradientStop, LinearGradient, Paint, Pixmap, Point, Rect, SpreadMode, Transform,
};

/// Software rasterizer for gradient backgrounds.
#[derive(Debug, Clone, Copy)]
pub struct TinySkiaRasterizer {
    /// Fill applied before the gradient. Only visible below full opacity.
    canvas_background: Color,
}

impl Default for TinySkiaRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TinySkiaRasterizer {
    /// Create a rasterizer compositing onto a transparent canvas.
    pub fn new() -> Self {
        Self {
            canvas_background: Color::TRANSPARENT,
        }
    }

    /// Composite onto an opaque canvas color instead of transparency.
    pub fn with_canvas_background(mut self, red: u8, green: u8, blue: u8) -> Self {
        self.canvas_background = Color::from_rgba8(red, green, blue, 255);
        self
    }

    /// Render the gradient and encode it as PNG.
    pub fn render(&self, gradient: &GradientDescriptor, width: u32, height: u32) -> Result<Vec<u8>> {
        if width == 0 || height == 0 {
            return Err(Error::RasterizationError(format!(
                "invalid canvas size {}x{}",
                width, height
            )));
        }

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::RasterizationError(format!("could not allocate {}x{} pixmap", width, height))
        })?;
        pixmap.fill(self.canvas_background);

        let start_color = parse_hex_color(gradient.start)?;
        let end_color = parse_hex_color(gradient.end)?;

        let (start, end) = gradient_axis(gradient.angle_degrees(), width as f32, height as f32);
        let mut shader = LinearGradient::new(
            start,
            end,
            vec![
                GradientStop::new(0.0, start_color),
                GradientStop::new(1.0, end_color),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        )
        .ok_or_else(|| Error::RasterizationError("could not build gradient shader".to_string()))?;
        shader.apply_opacity(gradient.opacity() as f32);

        let paint = Paint {
            shader,
            anti_alias: false,
            ..Paint::default()
        };

        let rect = Rect::from_xywh(0.0, 0.0, width as f32, height as f32)
            .ok_or_else(|| Error::RasterizationError("invalid canvas rectangle".to_string()))?;
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);

        pixmap
            .encode_png()
            .map_err(|e| Error::RasterizationError(format!("PNG encoding failed: {}", e)))
    }
}

impl Rasterizer for TinySkiaRasterizer {
    fn rasterize_gradient(
        &self,
        gradient: &GradientDescriptor,
        width: u32,
        height: u32,
    ) -> Option<RasterImage> {
        match self.render(gradient, width, height) {
            Ok(png) => {
                log::debug!("Rasterized {}x{} gradient ({} bytes)", width, height, png.len());
                Some(RasterImage::png(png))
            }
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }
}

/// Gradient axis endpoints for a CSS-style angle.
///
/// The angle runs clockwise from "towards the top". In y-down raster space
/// that direction is `(sin a, -cos a)`. Both endpoints sit half a diagonal
/// from the center, so the ramp spans the whole canvas at any angle.
fn gradient_axis(angle_degrees: f64, width: f32, height: f32) -> (Point, Point) {
    let radians = (angle_degrees as f32).to_radians();
    let (dx, dy) = (radians.sin(), -radians.cos());
    let half_diagonal = (width * width + height * height).sqrt() / 2.0;
    let (cx, cy) = (width / 2.0, height / 2.0);

    (
        Point::from_xy(cx - dx * half_diagonal, cy - dy * half_diagonal),
        Point::from_xy(cx + dx * half_diagonal, cy + dy * half_diagonal),
    )
}

/// Parse a 6-digit hex color without leading `#`.
fn parse_hex_color(hex: &str) -> Result<Color> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(Error::RasterizationError(format!("invalid color '{}'", hex)));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| Error::RasterizationError(format!("invalid color '{}'", hex)))
    };

    Ok(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255))
}
