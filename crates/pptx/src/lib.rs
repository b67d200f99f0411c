//! PPTX (Office Open XML) writer backend for generated presentations.
//!
//! Writes .pptx files: ZIP archives holding one XML part per slide plus a
//! minimal master, layout and theme.

mod parts;
mod slide;
pub mod writer;
mod xml;

pub use writer::{BackgroundStrategy, PptxWriter};
