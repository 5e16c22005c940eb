//! Minimal PresentationML package writer: one master, one blank layout, one
//! theme, and absolutely positioned text boxes on each slide.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// English Metric Units per inch.
const EMU_PER_INCH: i64 = 914_400;
const SLIDE_WIDTH: i64 = 10 * EMU_PER_INCH;
const SLIDE_HEIGHT: i64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone, PartialEq)]
pub enum SlideContent {
    Title {
        title: String,
        subtitle: Option<String>,
    },
    Bullets {
        title: String,
        bullets: Vec<String>,
    },
    TwoColumn {
        title: String,
        left: Vec<String>,
        right: Vec<String>,
    },
    /// Title plus a free-text body rendered as plain paragraphs.
    Body {
        title: String,
        body: String,
    },
}

impl SlideContent {
    pub fn title(&self) -> &str {
        match self {
            SlideContent::Title { title, .. }
            | SlideContent::Bullets { title, .. }
            | SlideContent::TwoColumn { title, .. }
            | SlideContent::Body { title, .. } => title,
        }
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Paragraph of a text box.
struct Para<'a> {
    text: &'a str,
    size: u32,
    bold: bool,
    bullet: bool,
    centered: bool,
}

impl<'a> Para<'a> {
    fn plain(text: &'a str, size: u32) -> Self {
        Self {
            text,
            size,
            bold: false,
            bullet: false,
            centered: false,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn bullet(mut self) -> Self {
        self.bullet = true;
        self
    }

    fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    fn to_xml(&self) -> String {
        let mut ppr = String::new();
        if self.centered {
            ppr.push_str(r#" algn="ctr""#);
        }
        if self.bullet {
            ppr.push_str(r#" marL="342900" indent="-342900""#);
        }
        let bullet = if self.bullet {
            r#"<a:buFont typeface="Arial"/><a:buChar char="&#8226;"/>"#
        } else {
            "<a:buNone/>"
        };
        format!(
            r#"<a:p><a:pPr{ppr}>{bullet}</a:pPr><a:r><a:rPr lang="en-US" sz="{size}" b="{b}" dirty="0"/><a:t>{text}</a:t></a:r></a:p>"#,
            size = self.size * 100,
            b = u8::from(self.bold),
            text = escape_xml(self.text),
        )
    }
}

struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64) as i64
}

fn text_box(id: u32, name: &str, frame: Frame, paragraphs: &[Para<'_>]) -> String {
    let body: String = if paragraphs.is_empty() {
        "<a:p><a:endParaRPr lang=\"en-US\"/></a:p>".to_string()
    } else {
        paragraphs.iter().map(Para::to_xml).collect()
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        name = escape_xml(name),
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
    )
}

fn slide_xml(slide: &SlideContent) -> String {
    let heading = |title: &str| {
        text_box(
            2,
            "Title",
            Frame {
                x: inches(0.5),
                y: inches(0.4),
                cx: inches(9.0),
                cy: inches(1.0),
            },
            &[Para::plain(title, 32).bold()],
        )
    };
    let column = |id: u32, name: &str, x: f64, width: f64, items: &[String]| {
        let paras: Vec<Para<'_>> = items.iter().map(|b| Para::plain(b, 18).bullet()).collect();
        text_box(
            id,
            name,
            Frame {
                x: inches(x),
                y: inches(1.6),
                cx: inches(width),
                cy: inches(5.4),
            },
            &paras,
        )
    };

    let shapes = match slide {
        SlideContent::Title { title, subtitle } => {
            let mut shapes = text_box(
                2,
                "Title",
                Frame {
                    x: inches(0.75),
                    y: inches(2.4),
                    cx: inches(8.5),
                    cy: inches(1.5),
                },
                &[Para::plain(title, 40).bold().centered()],
            );
            if let Some(subtitle) = subtitle {
                shapes.push_str(&text_box(
                    3,
                    "Subtitle",
                    Frame {
                        x: inches(1.5),
                        y: inches(4.1),
                        cx: inches(7.0),
                        cy: inches(1.0),
                    },
                    &[Para::plain(subtitle, 20).centered()],
                ));
            }
            shapes
        }
        SlideContent::Bullets { title, bullets } => {
            heading(title) + &column(3, "Content", 0.5, 9.0, bullets)
        }
        SlideContent::TwoColumn { title, left, right } => {
            heading(title)
                + &column(3, "Left", 0.5, 4.35, left)
                + &column(4, "Right", 5.15, 4.35, right)
        }
        SlideContent::Body { title, body } => {
            let paras: Vec<Para<'_>> = body
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| Para::plain(l, 16))
                .collect();
            heading(title)
                + &text_box(
                    3,
                    "Body",
                    Frame {
                        x: inches(0.5),
                        y: inches(1.6),
                        cx: inches(9.0),
                        cy: inches(5.4),
                    },
                    &paras,
                )
        }
    };

    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn content_types(slides: usize) -> String {
    let overrides: String = (1..=slides)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>{overrides}</Types>"#
    )
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#
    )
}

fn core_props(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{title}</dc:title><dc:creator>Dynamo AI</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created></cp:coreProperties>"#,
        title = escape_xml(title),
        created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
    )
}

/// Master is rId1, theme is last, slides sit in between from rId2.
fn presentation_xml(slides: usize) -> String {
    let ids: String = (0..slides)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

fn presentation_rels(slides: usize) -> String {
    let slide_rels: String = (1..=slides)
        .map(|n| {
            format!(
                r#"<Relationship Id="rId{}" Type="{REL_BASE}/slide" Target="slides/slide{n}.xml"/>"#,
                n + 1
            )
        })
        .collect();
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_BASE}/slideMaster" Target="slideMasters/slideMaster1.xml"/>{slide_rels}<Relationship Id="rId{theme}" Type="{REL_BASE}/theme" Target="theme/theme1.xml"/></Relationships>"#,
        theme = slides + 2,
    )
}

fn single_rel(kind: &str, target: &str) -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_BASE}/{kind}" Target="{target}"/></Relationships>"#
    )
}

fn master_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_BASE}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_BASE}/theme" Target="../theme/theme1.xml"/></Relationships>"#
    )
}

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{EMPTY_TREE}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank">{EMPTY_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme() -> String {
    let solid = |c: &str| format!(r#"<a:solidFill><a:schemeClr val="{c}"/></a:solidFill>"#);
    let fills = solid("phClr").repeat(3);
    let lines = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#.repeat(3);
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="{NS_A}" name="Dynamo"><a:themeElements><a:clrScheme name="Dynamo"><a:dk1><a:srgbClr val="111827"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2><a:accent1><a:srgbClr val="EAB308"/></a:accent1><a:accent2><a:srgbClr val="2563EB"/></a:accent2><a:accent3><a:srgbClr val="16A34A"/></a:accent3><a:accent4><a:srgbClr val="DC2626"/></a:accent4><a:accent5><a:srgbClr val="9333EA"/></a:accent5><a:accent6><a:srgbClr val="0D9488"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink></a:clrScheme><a:fontScheme name="Dynamo"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Dynamo"><a:fillStyleLst>{fills}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst><a:effectStyleLst>{effects}</a:effectStyleLst><a:bgFillStyleLst>{fills}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

/// Package `slides` into a `.pptx`. The first slide's title becomes the
/// document title.
pub fn build(slides: &[SlideContent]) -> Result<Vec<u8>> {
    let title = slides.first().map(SlideContent::title).unwrap_or_default();

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types(slides.len())),
        ("_rels/.rels".into(), root_rels()),
        ("docProps/core.xml".into(), core_props(title)),
        ("ppt/presentation.xml".into(), presentation_xml(slides.len())),
        ("ppt/_rels/presentation.xml.rels".into(), presentation_rels(slides.len())),
        ("ppt/slideMasters/slideMaster1.xml".into(), slide_master()),
        ("ppt/slideMasters/_rels/slideMaster1.xml.rels".into(), master_rels()),
        ("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            single_rel("slideMaster", "../slideMasters/slideMaster1.xml"),
        ),
        ("ppt/theme/theme1.xml".into(), theme()),
    ];
    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        parts.push((format!("ppt/slides/slide{n}.xml"), slide_xml(slide)));
        parts.push((
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            single_rel("slideLayout", "../slideLayouts/slideLayout1.xml"),
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, xml) in parts {
        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("failed to start {name}"))?;
        writer
            .write_all(xml.as_bytes())
            .with_context(|| format!("failed to write {name}"))?;
    }

    let cursor = writer.finish().context("failed to finalize PPTX")?;
    Ok(cursor.into_inner())
}
