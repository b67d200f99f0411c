//! Capabilities the generation pipeline delegates to backend crates.

use crate::error::Result;
use crate::theme::GradientDescriptor;
use crate::types::{Presentation, RasterImage};

/// Default raster width, matching the 16:9 slide aspect.
pub const DEFAULT_RASTER_WIDTH: u32 = 1600;

/// Default raster height, matching the 16:9 slide aspect.
pub const DEFAULT_RASTER_HEIGHT: u32 = 900;

/// Turns a gradient descriptor into an encoded image.
pub trait Rasterizer {
    /// Render `gradient` onto a `width` x `height` canvas.
    ///
    /// Returns `None` when the backend is unavailable or fails; callers
    /// fall back to a solid fill with the gradient's end color.
    fn rasterize_gradient(
        &self,
        gradient: &GradientDescriptor,
        width: u32,
        height: u32,
    ) -> Option<RasterImage>;
}

/// Rasterizer for hosts without a graphics backend. Always reports failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRasterizer;

impl Rasterizer for NoRasterizer {
    fn rasterize_gradient(&self, _: &GradientDescriptor, _: u32, _: u32) -> Option<RasterImage> {
        None
    }
}

/// Writes a presentation into a single binary document.
pub trait DocumentSerializer {
    /// Whether the output format's native slide-background image property is
    /// used. When `false`, image backgrounds are drawn as a full-bleed picture.
    ///
    /// The serializer applies its own strategy; the generator only reports it.
    fn supports_native_background(&self) -> bool;

    /// Serialize all slides into one document.
    fn serialize(&self, presentation: &Presentation) -> Result<Vec<u8>>;
}
