//! Core domain types, themes, row normalization and slide layout for
//! turning spreadsheet rows into presentations.

pub mod backend;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod pipeline;
pub mod theme;
pub mod types;

pub use backend::{DocumentSerializer, NoRasterizer, Rasterizer};
pub use error::{Error, Result};
pub use layout::{resolve_background, ResolvedBackground, SlideLayoutEngine};
pub use normalize::{display_value, NormalizedRow, RowNormalizer};
pub use pipeline::{CancelFlag, GenerationOptions, GenerationRequest, Generator, Stage};
pub use theme::{GradientDescriptor, Theme, ThemeRegistry};
pub use types::{
    BackgroundDescriptor, CellValue, Field, GeneratedDocument, ImageFormat, Presentation,
    RasterImage, Row, RowField, SlideBody, SlideSpec, TextColors,
};
