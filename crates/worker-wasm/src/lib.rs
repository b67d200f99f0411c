//! WASM-compatible wrapper for spreadsheet-to-slides generation.
//!
//! This crate exposes theme listing, slide previews and PPTX generation
//! to JavaScript for use in Cloudflare Workers.

use serde::Serialize;
use sheetdeck_core::{
    BackgroundDescriptor, CancelFlag, GenerationOptions, GenerationRequest, Generator,
    RasterImage, SlideBody, SlideSpec, TextColors, ThemeRegistry,
};
use sheetdeck_pptx::PptxWriter;
use sheetdeck_raster::TinySkiaRasterizer;
use sheetdeck_xlsx::XlsxReader;
use std::io::Cursor;
use wasm_bindgen::prelude::*;

const PREVIEW_RASTER_WIDTH: u32 = 16;
const PREVIEW_RASTER_HEIGHT: u32 = 9;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// A selectable theme.
#[derive(Debug, Serialize)]
pub struct ThemeInfo {
    pub key: String,
    pub name: String,
    pub colors: TextColors,
}

/// Background of a previewed slide, without image bytes.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackgroundPreview {
    Gradient { theme: String },
    Image { format: String },
    Solid { color: String },
}

/// One slide as it will be generated.
#[derive(Debug, Serialize)]
pub struct SlidePreview {
    pub title: String,
    pub subtitle: String,
    /// Bullet lines, empty when the slide shows the placeholder.
    pub bullets: Vec<String>,
    pub placeholder: Option<String>,
    pub colors: TextColors,
    pub background: BackgroundPreview,
}

/// List the built-in themes as `{ key, name, colors }` objects.
#[wasm_bindgen]
pub fn list_themes() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&list_themes_impl())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn list_themes_impl() -> Vec<ThemeInfo> {
    ThemeRegistry::themes()
        .iter()
        .map(|theme| ThemeInfo {
            key: theme.key.to_string(),
            name: theme.name.to_string(),
            colors: theme.colors.clone(),
        })
        .collect()
}

/// Lay out the slides of an XLSX workbook without rendering them.
///
/// # Arguments
/// * `data` - The raw bytes of the XLSX file
/// * `filename` - The original filename, shown in slide subtitles
/// * `theme` - Theme key; unknown or missing keys use the default theme
#[wasm_bindgen]
pub fn preview_slides(data: &[u8], filename: &str, theme: Option<String>) -> Result<JsValue, JsValue> {
    let result =
        preview_slides_impl(data, filename, theme.as_deref()).map_err(|e| JsValue::from_str(&e))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn preview_slides_impl(
    data: &[u8],
    filename: &str,
    theme: Option<&str>,
) -> Result<Vec<SlidePreview>, String> {
    let request = build_request(data, filename, theme, None)?;

    // Previews only report the background kind, so a thumbnail-sized raster is enough.
    let options = GenerationOptions {
        raster_width: PREVIEW_RASTER_WIDTH,
        raster_height: PREVIEW_RASTER_HEIGHT,
        ..GenerationOptions::default()
    };
    let generator = Generator::new(TinySkiaRasterizer::new(), PptxWriter::new()).with_options(options);
    let presentation = generator
        .layout(request, &CancelFlag::new())
        .map_err(|e| format!("Layout error: {}", e))?;

    Ok(presentation.slides.iter().map(preview_slide).collect())
}

/// Generate a PPTX document from an XLSX workbook.
///
/// # Arguments
/// * `data` - The raw bytes of the XLSX file
/// * `filename` - The original filename, shown in slide subtitles
/// * `theme` - Theme key; unknown or missing keys use the default theme
/// * `background` - Optional image bytes replacing the theme gradient
///
/// # Returns
/// The PPTX bytes as a `Uint8Array`, or throws on error.
#[wasm_bindgen]
pub fn generate_presentation(
    data: &[u8],
    filename: &str,
    theme: Option<String>,
    background: Option<Vec<u8>>,
) -> Result<js_sys::Uint8Array, JsValue> {
    let bytes = generate_presentation_impl(data, filename, theme.as_deref(), background)
        .map_err(|e| JsValue::from_str(&e))?;

    Ok(js_sys::Uint8Array::from(bytes.as_slice()))
}

fn generate_presentation_impl(
    data: &[u8],
    filename: &str,
    theme: Option<&str>,
    background: Option<Vec<u8>>,
) -> Result<Vec<u8>, String> {
    let request = build_request(data, filename, theme, background)?;

    let generator = Generator::new(TinySkiaRasterizer::new(), PptxWriter::new());
    let document = generator
        .generate(request, &CancelFlag::new())
        .map_err(|e| format!("Generation error: {}", e))?;

    Ok(document.bytes)
}

fn build_request(
    data: &[u8],
    filename: &str,
    theme: Option<&str>,
    background: Option<Vec<u8>>,
) -> Result<GenerationRequest, String> {
    let rows = XlsxReader::new()
        .read_rows(Cursor::new(data))
        .map_err(|e| format!("XLSX parsing error: {}", e))?;

    let mut request = GenerationRequest::new(rows).with_source_file_name(filename);
    if let Some(key) = theme {
        request = request.with_theme(key);
    }
    if let Some(bytes) = background {
        let image = RasterImage::from_bytes(bytes).map_err(|e| e.to_string())?;
        request = request.with_background(image);
    }

    Ok(request)
}

fn preview_slide(slide: &SlideSpec) -> SlidePreview {
    let (bullets, placeholder) = match slide.body() {
        SlideBody::Bullets(lines) => (lines.to_vec(), None),
        SlideBody::Placeholder(text) => (Vec::new(), Some(text.to_string())),
    };

    let background = match &slide.background {
        BackgroundDescriptor::GradientRef { theme, .. } => BackgroundPreview::Gradient {
            theme: theme.to_string(),
        },
        BackgroundDescriptor::RasterImage(image) => BackgroundPreview::Image {
            format: image.format().extension().to_string(),
        },
        BackgroundDescriptor::SolidFill { color } => BackgroundPreview::Solid {
            color: color.clone(),
        },
    };

    SlidePreview {
        title: slide.title_text.clone(),
        subtitle: slide.subtitle_text.clone(),
        bullets,
        placeholder,
        colors: slide.colors.clone(),
        background,
    }
}
