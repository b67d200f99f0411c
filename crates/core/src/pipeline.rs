//! One-shot generation pipeline.
//!
//! `Idle -> Validate -> ResolveBackgroundOnce -> LayoutEachRow -> Serialize -> Done`.
//! Any failure ends the call; nothing is retried and no partial document
//! is returned.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{DocumentSerializer, Rasterizer, DEFAULT_RASTER_HEIGHT, DEFAULT_RASTER_WIDTH};
use crate::error::{Error, Result};
use crate::layout::{resolve_background, SlideLayoutEngine};
use crate::theme::ThemeRegistry;
use crate::types::{GeneratedDocument, Presentation, RasterImage, Row, DEFAULT_OUTPUT_FILE_NAME};

/// Pipeline stages, logged as the generator moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validate,
    ResolveBackgroundOnce,
    LayoutEachRow,
    Serialize,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validate => "validate",
            Self::ResolveBackgroundOnce => "resolve-background",
            Self::LayoutEachRow => "layout",
            Self::Serialize => "serialize",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared cancellation flag, checked between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every generation call holding this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settings that stay the same across generation calls.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Gradient raster width in pixels.
    pub raster_width: u32,
    /// Gradient raster height in pixels.
    pub raster_height: u32,
    /// Output file name when the request does not name one.
    pub output_file_name: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            raster_width: DEFAULT_RASTER_WIDTH,
            raster_height: DEFAULT_RASTER_HEIGHT,
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
        }
    }
}

/// Inputs of a single generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub rows: Vec<Row>,
    /// Selected theme key; unknown or missing keys use the default theme.
    pub theme_key: Option<String>,
    /// Spreadsheet name shown in subtitles.
    pub source_file_name: Option<String>,
    /// Caller-supplied background, already decoded to bytes.
    pub background_override: Option<RasterImage>,
    /// Overrides [`GenerationOptions::output_file_name`].
    pub output_file_name: Option<String>,
}

impl GenerationRequest {
    /// Create a request for the given rows.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, key: impl Into<String>) -> Self {
        self.theme_key = Some(key.into());
        self
    }

    pub fn with_source_file_name(mut self, name: impl Into<String>) -> Self {
        self.source_file_name = Some(name.into());
        self
    }

    pub fn with_background(mut self, image: RasterImage) -> Self {
        self.background_override = Some(image);
        self
    }

    pub fn with_output_file_name(mut self, name: impl Into<String>) -> Self {
        self.output_file_name = Some(name.into());
        self
    }
}

/// Runs generation calls against a rasterizer and a document serializer.
pub struct Generator<R, S> {
    rasterizer: R,
    serializer: S,
    options: GenerationOptions,
}

impl<R: Rasterizer, S: DocumentSerializer> Generator<R, S> {
    /// Create a generator with default options.
    pub fn new(rasterizer: R, serializer: S) -> Self {
        Self {
            rasterizer,
            serializer,
            options: GenerationOptions::default(),
        }
    }

    /// Replace the generator options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Build the slide specifications without serializing them.
    pub fn layout(&self, request: GenerationRequest, cancel: &CancelFlag) -> Result<Presentation> {
        let mut stage = Stage::Idle;
        let result = self.layout_stages(request, cancel, &mut stage);
        if let Err(e) = &result {
            log::debug!("Generation failed during {}: {}", stage, e);
        }
        result
    }

    /// Run the whole pipeline and return the serialized document.
    pub fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancelFlag,
    ) -> Result<GeneratedDocument> {
        let file_name = request
            .output_file_name
            .clone()
            .unwrap_or_else(|| self.options.output_file_name.clone());

        let presentation = self.layout(request, cancel)?;

        log::debug!(
            "Pipeline stage: {} ({} background)",
            Stage::Serialize,
            background_mode(&self.serializer, &presentation)
        );
        let bytes = self.serializer.serialize(&presentation).map_err(|e| {
            log::debug!("Pipeline stage: {} ({})", Stage::Failed, e);
            match e {
                Error::SerializationError(_) => e,
                other => Error::SerializationError(other.to_string()),
            }
        })?;

        log::debug!(
            "Pipeline stage: {} ({} slides, {} bytes)",
            Stage::Done,
            presentation.slide_count(),
            bytes.len()
        );

        Ok(GeneratedDocument {
            file_name,
            slide_count: presentation.slide_count(),
            bytes,
        })
    }

    fn layout_stages(
        &self,
        request: GenerationRequest,
        cancel: &CancelFlag,
        stage: &mut Stage,
    ) -> Result<Presentation> {
        *stage = Stage::Validate;
        log::debug!("Pipeline stage: {}", stage);
        if request.rows.is_empty() {
            return Err(Error::EmptyDatasetError);
        }

        *stage = Stage::ResolveBackgroundOnce;
        log::debug!("Pipeline stage: {}", stage);
        let theme = ThemeRegistry::lookup(request.theme_key.as_deref());
        let background = resolve_background(
            theme,
            request.background_override,
            &self.rasterizer,
            self.options.raster_width,
            self.options.raster_height,
        );

        *stage = Stage::LayoutEachRow;
        log::debug!("Pipeline stage: {} ({} rows)", stage, request.rows.len());
        let engine = SlideLayoutEngine::new(background)
            .with_source_file_name(request.source_file_name.clone());

        let mut presentation = Presentation::new(engine.background().clone());
        presentation.source_file_name = request.source_file_name;

        for (index, row) in request.rows.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::CancelledError { completed: index });
            }
            presentation.add_slide(engine.layout_row(index, row));
        }

        Ok(presentation)
    }
}

/// How the serializer will attach the shared background, for logging.
fn background_mode(serializer: &impl DocumentSerializer, presentation: &Presentation) -> &'static str {
    match presentation.background.image() {
        None => "solid",
        Some(_) if serializer.supports_native_background() => "native image",
        Some(_) => "picture-shape image",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::GradientDescriptor;
    use crate::types::BackgroundDescriptor;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingRasterizer {
        calls: Cell<usize>,
        fail: bool,
    }

    impl Rasterizer for CountingRasterizer {
        fn rasterize_gradient(&self, _: &GradientDescriptor, w: u32, h: u32) -> Option<RasterImage> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                None
            } else {
                Some(RasterImage::png(vec![w as u8, h as u8]))
            }
        }
    }

    struct SlideCountSerializer;

    impl DocumentSerializer for SlideCountSerializer {
        fn supports_native_background(&self) -> bool {
            true
        }

        fn serialize(&self, presentation: &Presentation) -> Result<Vec<u8>> {
            Ok(vec![presentation.slide_count() as u8])
        }
    }

    struct FailingSerializer;

    impl DocumentSerializer for FailingSerializer {
        fn supports_native_background(&self) -> bool {
            false
        }

        fn serialize(&self, _: &Presentation) -> Result<Vec<u8>> {
            Err(Error::IoError(std::io::Error::other("disk full")))
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row::new().with("Title", format!("Row {}", i)).with("A", "1"))
            .collect()
    }

    #[test]
    fn test_generate_one_slide_per_row() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer);
        let doc = generator
            .generate(GenerationRequest::new(rows(5)), &CancelFlag::new())
            .unwrap();
        assert_eq!(doc.slide_count, 5);
        assert_eq!(doc.bytes, vec![5]);
        assert_eq!(doc.file_name, "Excel_to_PPT.pptx");
    }

    #[test]
    fn test_background_resolved_once_and_shared() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer);
        let presentation = generator
            .layout(
                GenerationRequest::new(rows(4)).with_theme("salad"),
                &CancelFlag::new(),
            )
            .unwrap();

        assert_eq!(generator.rasterizer.calls.get(), 1);
        assert_eq!(presentation.slides.len(), 4);
        let shared = presentation.background.image().unwrap();
        for slide in &presentation.slides {
            assert!(Arc::ptr_eq(slide.background.image().unwrap(), shared));
        }
    }

    #[test]
    fn test_rasterizer_failure_solid_fill_everywhere() {
        let rasterizer = CountingRasterizer {
            fail: true,
            ..Default::default()
        };
        let generator = Generator::new(rasterizer, SlideCountSerializer);
        let presentation = generator
            .layout(
                GenerationRequest::new(rows(3)).with_theme("ocean"),
                &CancelFlag::new(),
            )
            .unwrap();

        for slide in &presentation.slides {
            assert_eq!(
                slide.background,
                BackgroundDescriptor::SolidFill {
                    color: "000851".to_string()
                }
            );
            assert!(slide.background.image().is_none());
        }
    }

    #[test]
    fn test_empty_dataset_before_background() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer);
        let err = generator
            .generate(GenerationRequest::new(Vec::new()), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyDatasetError));
        assert_eq!(generator.rasterizer.calls.get(), 0);
    }

    #[test]
    fn test_override_skips_rasterizer() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer);
        let presentation = generator
            .layout(
                GenerationRequest::new(rows(2)).with_background(RasterImage::png(vec![7])),
                &CancelFlag::new(),
            )
            .unwrap();
        assert_eq!(generator.rasterizer.calls.get(), 0);
        assert!(matches!(
            presentation.background,
            BackgroundDescriptor::RasterImage(_)
        ));
    }

    #[test]
    fn test_cancelled_before_layout() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = generator
            .generate(GenerationRequest::new(rows(3)), &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::CancelledError { completed: 0 }));
    }

    #[test]
    fn test_serializer_failure_is_serialization_error() {
        let generator = Generator::new(CountingRasterizer::default(), FailingSerializer);
        let err = generator
            .generate(GenerationRequest::new(rows(1)), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, Error::SerializationError(_)));
    }

    #[test]
    fn test_output_file_name_override() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer)
            .with_options(GenerationOptions {
                output_file_name: "deck.pptx".to_string(),
                ..GenerationOptions::default()
            });
        let doc = generator
            .generate(GenerationRequest::new(rows(1)), &CancelFlag::new())
            .unwrap();
        assert_eq!(doc.file_name, "deck.pptx");

        let doc = generator
            .generate(
                GenerationRequest::new(rows(1)).with_output_file_name("other.pptx"),
                &CancelFlag::new(),
            )
            .unwrap();
        assert_eq!(doc.file_name, "other.pptx");
    }

    struct PictureOnlySerializer;

    impl DocumentSerializer for PictureOnlySerializer {
        fn supports_native_background(&self) -> bool {
            false
        }

        fn serialize(&self, _: &Presentation) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_background_mode_follows_serializer_capability() {
        let generator = Generator::new(CountingRasterizer::default(), SlideCountSerializer);
        let gradient = generator
            .layout(GenerationRequest::new(rows(1)), &CancelFlag::new())
            .unwrap();
        assert_eq!(background_mode(&SlideCountSerializer, &gradient), "native image");
        assert_eq!(
            background_mode(&PictureOnlySerializer, &gradient),
            "picture-shape image"
        );

        let failing = Generator::new(
            CountingRasterizer {
                fail: true,
                ..Default::default()
            },
            PictureOnlySerializer,
        );
        let solid = failing
            .layout(GenerationRequest::new(rows(1)), &CancelFlag::new())
            .unwrap();
        assert_eq!(background_mode(&PictureOnlySerializer, &solid), "solid");
    }
}
