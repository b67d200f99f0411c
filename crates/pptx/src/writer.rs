//! PPTX package writer.

use std::io::{Cursor, Seek, Write};

use chrono::{DateTime, Utc};
use sheetdeck_core::{
    BackgroundDescriptor, DocumentSerializer, Error, ImageFormat, Presentation, Result,
};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::parts;
use crate::slide::{slide_xml, SlideBackground};
use crate::xml::IMAGE_REL_ID;

/// How image backgrounds are attached to slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundStrategy {
    /// The slide's own background property (`<p:bg>` with a picture fill).
    #[default]
    Native,
    /// A picture shape slightly larger than the canvas, behind all text.
    /// For consumers that ignore picture backgrounds.
    PictureShape,
}

/// Writer for PPTX (Office Open XML) presentations.
#[derive(Debug, Clone, Default)]
pub struct PptxWriter {
    background_strategy: BackgroundStrategy,
    created: Option<DateTime<Utc>>,
}

impl PptxWriter {
    /// Create a new PPTX writer using native slide backgrounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose how image backgrounds are written.
    pub fn with_background_strategy(mut self, strategy: BackgroundStrategy) -> Self {
        self.background_strategy = strategy;
        self
    }

    /// Fix the creation timestamp written to the document properties.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn background_strategy(&self) -> BackgroundStrategy {
        self.background_strategy
    }

    /// Write a presentation as a PPTX package into `writer`.
    pub fn write<W: Write + Seek>(&self, presentation: &Presentation, writer: W) -> Result<W> {
        check_shared_background(presentation)?;

        let image = presentation.background.image();
        let image_format = image.map(|i| i.format());
        let slide_count = presentation.slide_count();

        let mut package = Package::new(writer);

        package.add_part("[Content_Types].xml", &parts::content_types(slide_count, image_format))?;
        package.add_part("_rels/.rels", &parts::package_rels())?;

        let title = presentation
            .source_file_name
            .as_deref()
            .unwrap_or(sheetdeck_core::types::DEFAULT_OUTPUT_FILE_NAME);
        let created = self.created.unwrap_or_else(Utc::now);
        package.add_part("docProps/core.xml", &parts::core_properties(title, created))?;
        package.add_part("docProps/app.xml", &parts::app_properties(slide_count))?;

        package.add_part("ppt/presentation.xml", &parts::presentation(slide_count))?;
        package.add_part(
            "ppt/_rels/presentation.xml.rels",
            &parts::presentation_rels(slide_count),
        )?;
        package.add_part("ppt/slideMasters/slideMaster1.xml", &parts::slide_master())?;
        package.add_part(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &parts::slide_master_rels(),
        )?;
        package.add_part("ppt/slideLayouts/slideLayout1.xml", &parts::slide_layout())?;
        package.add_part(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &parts::slide_layout_rels(),
        )?;
        package.add_part("ppt/theme/theme1.xml", &parts::theme())?;

        // The background image is stored once and referenced by every slide
        if let Some(image) = image {
            package.add_media(&parts::media_path(image.format()), image.bytes())?;
        }

        for (index, slide) in presentation.slides.iter().enumerate() {
            let number = index + 1;
            let background = match &slide.background {
                BackgroundDescriptor::SolidFill { color } => SlideBackground::Solid(color),
                BackgroundDescriptor::GradientRef { .. } | BackgroundDescriptor::RasterImage(_) => {
                    match self.background_strategy {
                        BackgroundStrategy::Native => SlideBackground::NativeImage {
                            rel_id: IMAGE_REL_ID,
                        },
                        BackgroundStrategy::PictureShape => SlideBackground::PictureShape {
                            rel_id: IMAGE_REL_ID,
                        },
                    }
                }
            };

            package.add_part(&parts::slide_path(number), &slide_xml(slide, background)?)?;
            package.add_part(&parts::slide_rels_path(number), &parts::slide_rels(image_format))?;
        }

        log::debug!(
            "Wrote PPTX package: {} slides, background {}",
            slide_count,
            describe_background(&presentation.background, image_format)
        );

        package.finish()
    }
}

impl DocumentSerializer for PptxWriter {
    fn supports_native_background(&self) -> bool {
        self.background_strategy == BackgroundStrategy::Native
    }

    fn serialize(&self, presentation: &Presentation) -> Result<Vec<u8>> {
        let cursor = self.write(presentation, Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }
}

/// Every slide must reference the presentation's single background resource.
fn check_shared_background(presentation: &Presentation) -> Result<()> {
    for (index, slide) in presentation.slides.iter().enumerate() {
        if !slide.background.shares_resource_with(&presentation.background) {
            return Err(Error::SerializationError(format!(
                "slide {} does not share the presentation background",
                index + 1
            )));
        }
    }
    Ok(())
}

fn describe_background(background: &BackgroundDescriptor, format: Option<ImageFormat>) -> String {
    match (background, format) {
        (BackgroundDescriptor::SolidFill { color }, _) => format!("solid #{}", color),
        (BackgroundDescriptor::GradientRef { theme, .. }, Some(f)) => {
            format!("gradient '{}' ({})", theme, f.extension())
        }
        (_, Some(f)) => format!("image ({})", f.extension()),
        (_, None) => "none".to_string(),
    }
}

/// Thin wrapper over the ZIP writer mapping errors into ours.
struct Package<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> Package<W> {
    fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
        }
    }

    fn add_part(&mut self, path: &str, xml: &str) -> Result<()> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.add_file(path, xml.as_bytes(), options)
    }

    fn add_media(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        // Images are already compressed
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        self.add_file(path, bytes, options)
    }

    fn add_file(&mut self, path: &str, bytes: &[u8], options: FileOptions) -> Result<()> {
        self.zip
            .start_file(path, options)
            .map_err(|e| Error::SerializationError(format!("Failed to add '{}': {}", path, e)))?;
        self.zip
            .write_all(bytes)
            .map_err(|e| Error::SerializationError(format!("Failed to write '{}': {}", path, e)))
    }

    fn finish(mut self) -> Result<W> {
        self.zip
            .finish()
            .map_err(|e| Error::SerializationError(format!("Failed to finish ZIP: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetdeck_core::{RasterImage, SlideSpec, ThemeRegistry};
    use std::io::Read;
    use std::sync::Arc;
    use zip::ZipArchive;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn slide(title: &str, background: &BackgroundDescriptor) -> SlideSpec {
        SlideSpec {
            title_text: title.to_string(),
            subtitle_text: "Row".to_string(),
            bullet_lines: vec!["A - 1".to_string()],
            colors: ThemeRegistry::default_theme().colors.clone(),
            background: background.clone(),
        }
    }

    fn presentation(background: BackgroundDescriptor, titles: &[&str]) -> Presentation {
        let mut p = Presentation::new(background.clone());
        for title in titles {
            p.add_slide(slide(title, &background));
        }
        p
    }

    fn image_background() -> BackgroundDescriptor {
        BackgroundDescriptor::GradientRef {
            theme: "neutral",
            image: Arc::new(RasterImage::png(PNG_MAGIC.to_vec())),
        }
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_package_contains_all_parts() {
        let bytes = PptxWriter::new()
            .serialize(&presentation(image_background(), &["One", "Two", "Three"]))
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "ppt/presentation.xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/media/image1.png",
            "ppt/slides/slide3.xml",
            "ppt/slides/_rels/slide3.xml.rels",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }
        assert!(archive.by_name("ppt/slides/slide4.xml").is_err());

        let media: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/media/"))
            .map(str::to_string)
            .collect();
        assert_eq!(media, vec!["ppt/media/image1.png"]);

        assert!(read_entry(&mut archive, "ppt/slides/slide2.xml").contains("<a:t>Two</a:t>"));
        assert!(read_entry(&mut archive, "ppt/slides/_rels/slide1.xml.rels")
            .contains("../media/image1.png"));
    }

    #[test]
    fn test_native_background_strategy() {
        let writer = PptxWriter::new();
        assert!(writer.supports_native_background());
        let bytes = writer
            .serialize(&presentation(image_background(), &["One"]))
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let xml = read_entry(&mut archive, "ppt/slides/slide1.xml");
        assert!(xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(xml.contains("<p:bg>"));
        assert!(!xml.contains("<p:pic>"));
    }

    #[test]
    fn test_picture_shape_strategy() {
        let writer = PptxWriter::new().with_background_strategy(BackgroundStrategy::PictureShape);
        assert!(!writer.supports_native_background());
        let bytes = writer
            .serialize(&presentation(image_background(), &["One"]))
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let xml = read_entry(&mut archive, "ppt/slides/slide1.xml");
        assert!(xml.contains("<p:pic>"));
        assert!(!xml.contains("<p:bg>"));
    }

    #[test]
    fn test_solid_background_has_no_media() {
        let background = BackgroundDescriptor::SolidFill {
            color: "F3F4F6".to_string(),
        };
        let bytes = PptxWriter::new()
            .with_background_strategy(BackgroundStrategy::PictureShape)
            .serialize(&presentation(background, &["One", "Two"]))
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(!archive.file_names().any(|n| n.starts_with("ppt/media/")));
        let xml = read_entry(&mut archive, "ppt/slides/slide2.xml");
        assert!(xml.contains(r#"<a:srgbClr val="F3F4F6"/>"#));
        assert!(!xml.contains("<p:pic>"));
        assert!(!read_entry(&mut archive, "[Content_Types].xml").contains("image/png"));
    }

    #[test]
    fn test_override_jpeg_extension() {
        let jpeg = RasterImage::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap();
        let background = BackgroundDescriptor::RasterImage(Arc::new(jpeg));
        let bytes = PptxWriter::new()
            .serialize(&presentation(background, &["One"]))
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("ppt/media/image1.jpeg").is_ok());
        assert!(read_entry(&mut archive, "[Content_Types].xml").contains("image/jpeg"));
    }

    #[test]
    fn test_unshared_background_rejected() {
        let mut p = presentation(image_background(), &["One"]);
        p.add_slide(slide("Two", &image_background()));
        let err = PptxWriter::new().serialize(&p).unwrap_err();
        assert!(matches!(err, Error::SerializationError(_)));
    }

    #[test]
    fn test_core_properties_use_source_name() {
        let mut p = presentation(image_background(), &["One"]);
        p.source_file_name = Some("songs.xlsx".to_string());
        let created = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let bytes = PptxWriter::new().with_created(created).serialize(&p).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let xml = read_entry(&mut archive, "docProps/core.xml");
        assert!(xml.contains("<dc:title>songs.xlsx</dc:title>"));
        assert!(xml.contains("2024-01-02T03:04:05Z"));
        assert!(read_entry(&mut archive, "docProps/app.xml").contains("<Slides>1</Slides>"));
    }
}
