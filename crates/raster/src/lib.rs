//! Gradient rasterizer backend for slide backgrounds.
//!
//! Renders theme gradients to PNG with `tiny-skia`.

pub mod gradient;

pub use gradient::TinySkiaRasterizer;
