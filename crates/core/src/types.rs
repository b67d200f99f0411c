//! Domain types for rows, slides and the presentation they form.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Widescreen (16:9) slide width in EMUs (13.333 inches).
pub const SLIDE_WIDTH_EMU: i64 = 12_192_000;

/// Widescreen (16:9) slide height in EMUs (7.5 inches).
pub const SLIDE_HEIGHT_EMU: i64 = 6_858_000;

/// EMUs per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Body line rendered when a row has nothing beyond its title.
pub const PLACEHOLDER_TEXT: &str = "(No additional data)";

/// File name used when the caller does not supply one.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "Excel_to_PPT.pptx";

/// A raw spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    /// Empty or absent cell.
    Empty,
    /// Text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Date without a time component.
    Date(NaiveDate),
    /// Date with a time component.
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Whether the cell carries no value at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One named cell of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowField {
    /// Column header.
    pub name: String,
    /// Raw value.
    pub value: CellValue,
}

/// One spreadsheet record: field name to value, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    fields: Vec<RowField>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.push(RowField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Builder form of [`Row::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Fields in source column order.
    pub fn fields(&self) -> &[RowField] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<CellValue>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.push(name, value);
        }
        row
    }
}

/// A field after normalization: name plus display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub display_value: String,
}

/// Encoded image formats accepted as slide backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // BMP needs at least a file header after the marker
        if bytes.len() >= 14 && bytes.starts_with(b"BM") {
            return Some(Self::Bmp);
        }

        None
    }

    /// File extension used inside the package.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    /// MIME content type.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }
}

/// An encoded raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl RasterImage {
    /// Wrap encoded image bytes, detecting the format.
    ///
    /// Fails with [`Error::ImageFetchError`] when the bytes are not a known image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::from_magic(&bytes).ok_or_else(|| {
            Error::ImageFetchError(format!(
                "unrecognized image data ({} bytes)",
                bytes.len()
            ))
        })?;
        Ok(Self { format, bytes })
    }

    /// Wrap bytes already known to be PNG.
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            format: ImageFormat::Png,
            bytes,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Colors for the text roles of a slide, as 6-digit hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextColors {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub text: &'static str,
    pub bullet: &'static str,
}

/// How a slide's background is filled.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundDescriptor {
    /// Rasterized gradient of the named theme.
    GradientRef {
        theme: &'static str,
        image: Arc<RasterImage>,
    },
    /// Caller-supplied override image.
    RasterImage(Arc<RasterImage>),
    /// Solid color, used when the gradient could not be rasterized.
    SolidFill { color: String },
}

impl BackgroundDescriptor {
    /// The image backing this background, if any.
    pub fn image(&self) -> Option<&Arc<RasterImage>> {
        match self {
            Self::GradientRef { image, .. } | Self::RasterImage(image) => Some(image),
            Self::SolidFill { .. } => None,
        }
    }

    /// Whether both descriptors point at the same resource instance.
    ///
    /// Images compare by pointer, solid fills by color.
    pub fn shares_resource_with(&self, other: &Self) -> bool {
        match (self.image(), other.image()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => self == other,
            _ => false,
        }
    }
}

/// Body content of a slide as the serializer should render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideBody<'a> {
    Bullets(&'a [String]),
    Placeholder(&'static str),
}

/// Fully resolved content of one output slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideSpec {
    pub title_text: String,
    pub subtitle_text: String,
    /// Non-empty bullet lines; may be empty, see [`SlideSpec::body`].
    pub bullet_lines: Vec<String>,
    pub colors: TextColors,
    pub background: BackgroundDescriptor,
}

impl SlideSpec {
    /// The body to render: the bullet lines, or the placeholder when there are none.
    pub fn body(&self) -> SlideBody<'_> {
        if self.bullet_lines.is_empty() {
            SlideBody::Placeholder(PLACEHOLDER_TEXT)
        } else {
            SlideBody::Bullets(&self.bullet_lines)
        }
    }
}

/// An ordered set of slides sharing one background resource.
#[derive(Debug, Clone)]
pub struct Presentation {
    /// Source spreadsheet name, used for document properties.
    pub source_file_name: Option<String>,

    /// The background resource every slide references.
    pub background: BackgroundDescriptor,

    /// Slides in row order.
    pub slides: Vec<SlideSpec>,
}

impl Presentation {
    /// Create an empty presentation around a resolved background.
    pub fn new(background: BackgroundDescriptor) -> Self {
        Self {
            source_file_name: None,
            background,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: SlideSpec) {
        self.slides.push(slide);
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}

/// Result of one generation call.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    /// File name to save the document under.
    pub file_name: String,
    /// Number of slides written.
    pub slide_count: usize,
    /// Serialized document.
    pub bytes: Vec<u8>,
}
