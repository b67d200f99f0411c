//! Slide part XML.

use std::fmt::Write as FmtWrite;

use sheetdeck_core::types::{EMU_PER_INCH, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};
use sheetdeck_core::{Result, SlideBody, SlideSpec};

use crate::parts::GROUP_SHAPE_HEADER;
use crate::xml::{escape_text, fmt_error, hex_color, split_lines, NS_MAIN, NS_PML, NS_REL, XML_DECLARATION};

const TITLE_FONT_SIZE: u32 = 2600;
const SUBTITLE_FONT_SIZE: u32 = 1000;
const BODY_FONT_SIZE: u32 = 1800;
const PLACEHOLDER_FONT_SIZE: u32 = 1200;

/// Body line spacing in hundredths of a point.
const BODY_LINE_SPACING: u32 = 2000;

const PLACEHOLDER_COLOR: &str = "999999";

/// Bullet indent in EMUs (0.375 inch).
const BULLET_INDENT: i64 = 342_900;

/// How far the fallback background picture overhangs each canvas edge.
const BLEED: i64 = EMU_PER_INCH / 5;

fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Position and size of a shape, in EMUs.
#[derive(Debug, Clone, Copy)]
struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl Frame {
    /// Frame spanning the canvas width minus `margin` inches on each side.
    fn full_width(margin: f64, y: f64, height: f64) -> Self {
        Self {
            x: inches(margin),
            y: inches(y),
            cx: SLIDE_WIDTH_EMU - 2 * inches(margin),
            cy: inches(height),
        }
    }

    /// Frame overhanging the canvas on all sides.
    fn bleed() -> Self {
        Self {
            x: -BLEED,
            y: -BLEED,
            cx: SLIDE_WIDTH_EMU + 2 * BLEED,
            cy: SLIDE_HEIGHT_EMU + 2 * BLEED,
        }
    }
}

/// Background rendering chosen by the writer for one slide.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SlideBackground<'a> {
    Solid(&'a str),
    /// `<p:bg>` picture fill referencing the image relationship.
    NativeImage { rel_id: &'a str },
    /// Full-bleed picture as the bottom-most shape.
    PictureShape { rel_id: &'a str },
}

/// Generate the XML of one slide.
pub(crate) fn slide_xml(slide: &SlideSpec, background: SlideBackground<'_>) -> Result<String> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECLARATION);
    write!(
        xml,
        r#"<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#,
        NS_MAIN, NS_REL, NS_PML
    )
    .map_err(fmt_error)?;
    xml.push_str("<p:cSld>");

    // Background must come before the shape tree
    match background {
        SlideBackground::Solid(color) => write!(
            xml,
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
            hex_color(color)?
        )
        .map_err(fmt_error)?,
        SlideBackground::NativeImage { rel_id } => write!(
            xml,
            concat!(
                r#"<p:bg><p:bgPr><a:blipFill dpi="0" rotWithShape="1"><a:blip r:embed="{}"/>"#,
                "<a:srcRect/><a:stretch><a:fillRect/></a:stretch></a:blipFill><a:effectLst/></p:bgPr></p:bg>"
            ),
            rel_id
        )
        .map_err(fmt_error)?,
        SlideBackground::PictureShape { .. } => {}
    }

    xml.push_str("<p:spTree>");
    xml.push_str(GROUP_SHAPE_HEADER);

    let mut next_id = 2u32;
    if let SlideBackground::PictureShape { rel_id } = background {
        write_picture(&mut xml, next_id, rel_id, Frame::bleed())?;
        next_id += 1;
    }

    let colors = &slide.colors;

    // Title
    let title_rpr = run_properties(TITLE_FONT_SIZE, true, colors.title)?;
    let mut paragraphs = String::new();
    write_paragraph(&mut paragraphs, &slide.title_text, r#"<a:pPr algn="ctr"/>"#, &title_rpr)?;
    write_text_shape(
        &mut xml,
        next_id,
        "Title",
        Frame::full_width(0.5, 0.35, 0.9),
        "ctr",
        &paragraphs,
    )?;
    next_id += 1;

    // Subtitle
    let subtitle_rpr = run_properties(SUBTITLE_FONT_SIZE, false, colors.subtitle)?;
    let mut paragraphs = String::new();
    write_paragraph(&mut paragraphs, &slide.subtitle_text, r#"<a:pPr algn="ctr"/>"#, &subtitle_rpr)?;
    write_text_shape(
        &mut xml,
        next_id,
        "Subtitle",
        Frame::full_width(0.5, 1.05, 0.4),
        "t",
        &paragraphs,
    )?;
    next_id += 1;

    // Body
    match slide.body() {
        SlideBody::Bullets(lines) => {
            let ppr = format!(
                concat!(
                    r#"<a:pPr marL="{}" indent="-{}" algn="l">"#,
                    r#"<a:lnSpc><a:spcPts val="{}"/></a:lnSpc>"#,
                    r#"<a:buClr><a:srgbClr val="{}"/></a:buClr>"#,
                    r#"<a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#
                ),
                BULLET_INDENT,
                BULLET_INDENT,
                BODY_LINE_SPACING,
                hex_color(colors.bullet)?
            );
            let rpr = run_properties(BODY_FONT_SIZE, false, colors.text)?;
            let mut paragraphs = String::new();
            for line in lines {
                write_paragraph(&mut paragraphs, line, &ppr, &rpr)?;
            }
            write_text_shape(
                &mut xml,
                next_id,
                "Body",
                Frame::full_width(0.7, 1.6, 5.4),
                "t",
                &paragraphs,
            )?;
        }
        SlideBody::Placeholder(text) => {
            let rpr = run_properties(PLACEHOLDER_FONT_SIZE, false, PLACEHOLDER_COLOR)?;
            let mut paragraphs = String::new();
            write_paragraph(&mut paragraphs, text, r#"<a:pPr algn="l"/>"#, &rpr)?;
            write_text_shape(
                &mut xml,
                next_id,
                "Body",
                Frame::full_width(1.0, 2.0, 0.5),
                "t",
                &paragraphs,
            )?;
        }
    }

    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    xml.push_str("</p:sld>");

    Ok(xml)
}

/// Run properties: size in hundredths of a point, optional bold, solid color.
fn run_properties(size: u32, bold: bool, color: &str) -> Result<String> {
    Ok(format!(
        r#"<a:rPr lang="en-US" sz="{}"{} dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr>"#,
        size,
        if bold { r#" b="1""# } else { "" },
        hex_color(color)?
    ))
}

/// Write one paragraph. Newlines inside `text` become line breaks.
fn write_paragraph(xml: &mut String, text: &str, ppr: &str, rpr: &str) -> Result<()> {
    xml.push_str("<a:p>");
    xml.push_str(ppr);
    for (i, line) in split_lines(text).iter().enumerate() {
        if i > 0 {
            write!(xml, "<a:br>{}</a:br>", rpr).map_err(fmt_error)?;
        }
        if !line.is_empty() {
            write!(xml, "<a:r>{}<a:t>{}</a:t></a:r>", rpr, escape_text(line)).map_err(fmt_error)?;
        }
    }
    xml.push_str("</a:p>");
    Ok(())
}

fn write_text_shape(
    xml: &mut String,
    id: u32,
    name: &str,
    frame: Frame,
    anchor: &str,
    paragraphs: &str,
) -> Result<()> {
    write!(
        xml,
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{}"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#,
            "{}</p:txBody></p:sp>"
        ),
        id,
        name,
        id - 1,
        frame.x,
        frame.y,
        frame.cx,
        frame.cy,
        anchor,
        paragraphs
    )
    .map_err(fmt_error)
}

fn write_picture(xml: &mut String, id: u32, rel_id: &str, frame: Frame) -> Result<()> {
    write!(
        xml,
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Background {}"/>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
        ),
        id,
        id - 1,
        rel_id,
        frame.x,
        frame.y,
        frame.cx,
        frame.cy
    )
    .map_err(fmt_error)
}
