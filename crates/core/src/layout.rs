//! Slide layout: turns normalized rows into slide specifications.

use std::sync::Arc;

use crate::backend::Rasterizer;
use crate::normalize::{NormalizedRow, RowNormalizer};
use crate::theme::{Theme, ThemeRegistry};
use crate::types::{BackgroundDescriptor, RasterImage, Row, SlideSpec};

/// The background shared by every slide of one generation call, and the
/// theme whose text colors go with it.
#[derive(Debug, Clone)]
pub struct ResolvedBackground {
    pub descriptor: BackgroundDescriptor,
    pub text_theme: &'static Theme,
}

/// Resolve the single background resource for a generation call.
///
/// An override image wins and forces the neutral theme for text, since its
/// colors are unknown. Otherwise the theme gradient is rasterized once; when
/// that fails the end color becomes a solid fill.
pub fn resolve_background(
    theme: &'static Theme,
    override_image: Option<RasterImage>,
    rasterizer: &dyn Rasterizer,
    width: u32,
    height: u32,
) -> ResolvedBackground {
    if let Some(image) = override_image {
        log::debug!(
            "Using override background ({:?}, {} bytes)",
            image.format(),
            image.bytes().len()
        );
        return ResolvedBackground {
            descriptor: BackgroundDescriptor::RasterImage(Arc::new(image)),
            text_theme: ThemeRegistry::neutral(),
        };
    }

    let descriptor = match rasterizer.rasterize_gradient(&theme.gradient, width, height) {
        Some(image) => BackgroundDescriptor::GradientRef {
            theme: theme.key,
            image: Arc::new(image),
        },
        None => {
            log::warn!(
                "Gradient for theme '{}' could not be rasterized, using solid #{}",
                theme.key,
                theme.gradient.end
            );
            BackgroundDescriptor::SolidFill {
                color: theme.gradient.end.to_string(),
            }
        }
    };

    ResolvedBackground {
        descriptor,
        text_theme: theme,
    }
}

/// Lays out rows onto slides with one theme and one background.
#[derive(Debug, Clone)]
pub struct SlideLayoutEngine {
    normalizer: RowNormalizer,
    background: ResolvedBackground,
    source_file_name: Option<String>,
}

impl SlideLayoutEngine {
    /// Create a layout engine around an already resolved background.
    pub fn new(background: ResolvedBackground) -> Self {
        Self {
            normalizer: RowNormalizer::new(),
            background,
            source_file_name: None,
        }
    }

    /// Set the source file name shown in every subtitle.
    pub fn with_source_file_name(mut self, name: Option<impl Into<String>>) -> Self {
        self.source_file_name = name.map(Into::into).filter(|n: &String| !n.is_empty());
        self
    }

    /// The background every slide from this engine references.
    pub fn background(&self) -> &BackgroundDescriptor {
        &self.background.descriptor
    }

    /// Lay out the row at 0-based `index`.
    pub fn layout_row(&self, index: usize, row: &Row) -> SlideSpec {
        let number = index + 1;
        let normalized = self.normalizer.normalize(row, &format!("Slide {}", number));

        SlideSpec {
            subtitle_text: self.subtitle(number),
            bullet_lines: bullet_lines(&normalized),
            title_text: normalized.title_text,
            colors: self.background.text_theme.colors.clone(),
            background: self.background.descriptor.clone(),
        }
    }

    fn subtitle(&self, number: usize) -> String {
        match &self.source_file_name {
            Some(name) => format!("Row {} • {}", number, name),
            None => format!("Row {}", number),
        }
    }
}

/// Format remaining fields as `"name - value"`, skipping blank values.
fn bullet_lines(normalized: &NormalizedRow) -> Vec<String> {
    normalized
        .remaining_fields
        .iter()
        .filter(|f| !f.display_value.trim().is_empty())
        .map(|f| format!("{} - {}", f.name, f.display_value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoRasterizer;
    use crate::theme::GradientDescriptor;
    use crate::types::{CellValue, SlideBody, PLACEHOLDER_TEXT};

    struct FixedRasterizer;

    impl Rasterizer for FixedRasterizer {
        fn rasterize_gradient(&self, _: &GradientDescriptor, _: u32, _: u32) -> Option<RasterImage> {
            Some(RasterImage::png(vec![0x89, b'P', b'N', b'G']))
        }
    }

    fn gradient_engine(theme: &'static Theme) -> SlideLayoutEngine {
        SlideLayoutEngine::new(resolve_background(theme, None, &FixedRasterizer, 16, 9))
    }

    #[test]
    fn test_layout_title_and_bullets() {
        let engine = gradient_engine(ThemeRegistry::default_theme());
        let row = Row::new().with("Title", "Hi").with("A", "1").with("B", "2");
        let slide = engine.layout_row(0, &row);

        assert_eq!(slide.title_text, "Hi");
        assert_eq!(slide.subtitle_text, "Row 1");
        assert_eq!(slide.bullet_lines, vec!["A - 1", "B - 2"]);
    }

    #[test]
    fn test_single_field_renders_placeholder() {
        let engine = gradient_engine(ThemeRegistry::default_theme());
        let slide = engine.layout_row(0, &Row::new().with("Foo", "x"));

        assert_eq!(slide.title_text, "x");
        assert!(slide.bullet_lines.is_empty());
        assert_eq!(slide.body(), SlideBody::Placeholder(PLACEHOLDER_TEXT));
    }

    #[test]
    fn test_blank_values_dropped() {
        let engine = gradient_engine(ThemeRegistry::default_theme());
        let row = Row::new()
            .with("Title", "T")
            .with("Empty", CellValue::Empty)
            .with("Spaces", "   ")
            .with("Kept", 3.0);
        let slide = engine.layout_row(2, &row);
        assert_eq!(slide.bullet_lines, vec!["Kept - 3"]);

        let row = Row::new()
            .with("Title", "T")
            .with("Empty", CellValue::Empty);
        let slide = engine.layout_row(2, &row);
        assert_eq!(slide.body(), SlideBody::Placeholder(PLACEHOLDER_TEXT));
    }

    #[test]
    fn test_subtitle_with_source_file() {
        let engine = gradient_engine(ThemeRegistry::default_theme())
            .with_source_file_name(Some("songs.xlsx"));
        let slide = engine.layout_row(4, &Row::new().with("Title", "T"));
        assert_eq!(slide.subtitle_text, "Row 5 • songs.xlsx");
    }

    #[test]
    fn test_empty_row_uses_slide_label() {
        let engine = gradient_engine(ThemeRegistry::default_theme());
        let slide = engine.layout_row(6, &Row::new());
        assert_eq!(slide.title_text, "Slide 7");
    }

    #[test]
    fn test_gradient_background_uses_theme_colors() {
        let ocean = ThemeRegistry::lookup(Some("ocean"));
        let engine = gradient_engine(ocean);
        let slide = engine.layout_row(0, &Row::new().with("Title", "T"));

        assert_eq!(slide.colors, ocean.colors);
        assert!(matches!(
            slide.background,
            BackgroundDescriptor::GradientRef { theme: "ocean", .. }
        ));
    }

    #[test]
    fn test_override_forces_neutral_colors() {
        let ocean = ThemeRegistry::lookup(Some("ocean"));
        let image = RasterImage::png(vec![1, 2, 3]);
        let engine = SlideLayoutEngine::new(resolve_background(
            ocean,
            Some(image),
            &FixedRasterizer,
            16,
            9,
        ));
        let slide = engine.layout_row(0, &Row::new().with("Title", "T"));

        assert_eq!(slide.colors, ThemeRegistry::neutral().colors);
        assert!(matches!(slide.background, BackgroundDescriptor::RasterImage(_)));
    }

    #[test]
    fn test_rasterizer_failure_uses_end_color() {
        let mimosa = ThemeRegistry::lookup(Some("mimosa"));
        let resolved = resolve_background(mimosa, None, &NoRasterizer, 16, 9);
        assert_eq!(
            resolved.descriptor,
            BackgroundDescriptor::SolidFill {
                color: "DAAE51".to_string()
            }
        );
        assert_eq!(resolved.text_theme.key, "mimosa");
    }
}
