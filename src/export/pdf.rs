use std::io::BufWriter;

use anyhow::{anyhow, Result};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::model::message::Message;

pub const REPORT_TITLE: &str = "Dynamo AI Intelligence Report";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.5;
const WRAP_CHARS: usize = 90;

/// A run of paragraph text, bold or regular.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Paragraph markup for one message. Only the role label is markup; the
/// content is escaped so any tags in it stay literal text.
pub fn paragraph_markup(message: &Message) -> String {
    format!(
        "<b>{}:</b> {}",
        message.role.display_name(),
        escape_html(&message.content)
    )
}

/// Parse the paragraph markup. `<b>` and `</b>` toggle bold; every other
/// character is text.
pub fn parse_markup(markup: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut bold = false;
    let mut rest = markup;

    loop {
        let next = ["<b>", "</b>"]
            .iter()
            .filter_map(|tag| rest.find(tag).map(|at| (at, *tag)))
            .min_by_key(|(at, _)| *at);

        let (at, tag) = match next {
            Some(found) => found,
            None => (rest.len(), ""),
        };

        if at > 0 {
            spans.push(Span {
                text: unescape_html(&rest[..at]),
                bold,
            });
        }
        if tag.is_empty() {
            break;
        }
        bold = tag == "<b>";
        rest = &rest[at + tag.len()..];
    }

    spans
}

/// Flow spans into lines of at most `max_chars`, keeping each word's weight.
/// A bold label and the text after it share a line when they fit.
fn layout(spans: &[Span], max_chars: usize) -> Vec<Vec<Span>> {
    let mut lines = Vec::new();
    let mut line: Vec<Span> = Vec::new();
    let mut width = 0;

    for span in spans {
        for (i, paragraph) in span.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(std::mem::take(&mut line));
                width = 0;
            }
            for word in paragraph.split_whitespace() {
                let len = word.chars().count();
                if width > 0 && width + 1 + len > max_chars {
                    lines.push(std::mem::take(&mut line));
                    width = 0;
                }
                let sep = if width > 0 { " " } else { "" };
                match line.last_mut() {
                    Some(last) if last.bold == span.bold => {
                        last.text.push_str(sep);
                        last.text.push_str(word);
                    }
                    _ => line.push(Span {
                        text: format!("{sep}{word}"),
                        bold: span.bold,
                    }),
                }
                width += sep.len() + len;
            }
        }
    }

    lines.push(line);
    lines
}

struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl Writer<'_> {
    fn make_room(&mut self) {
        if self.y < BOTTOM {
            self.pages += 1;
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Layer {}", self.pages),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        self.make_room();
        self.layer.use_text(text, size, Mm(MARGIN_X), Mm(self.y), font);
        self.y -= LINE_HEIGHT * size / 11.0;
    }

    /// One baseline with mixed weights; the text cursor advances across spans.
    fn mixed_line(
        &mut self,
        spans: &[Span],
        size: f32,
        regular: &IndirectFontRef,
        bold: &IndirectFontRef,
    ) {
        self.make_room();
        self.layer.begin_text_section();
        self.layer.set_text_cursor(Mm(MARGIN_X), Mm(self.y));
        for span in spans {
            let face = if span.bold { bold } else { regular };
            self.layer.set_font(face, size);
            self.layer.write_text(span.text.as_str(), face);
        }
        self.layer.end_text_section();
        self.y -= LINE_HEIGHT * size / 11.0;
    }
}

pub fn build_report(messages: &[Message]) -> Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("failed to load Helvetica: {e}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("failed to load Helvetica-Bold: {e}"))?;

    let mut writer = Writer {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        y: TOP,
        pages: 1,
    };

    writer.line(REPORT_TITLE, 20.0, &bold);
    writer.y -= 6.0;

    for message in messages {
        let spans = parse_markup(&paragraph_markup(message));
        for line in layout(&spans, WRAP_CHARS) {
            writer.mixed_line(&line, 11.0, &font, &bold);
        }
        writer.y -= 4.0;
    }

    let mut bytes = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))
        .map_err(|e| anyhow!("failed to save PDF: {e}"))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::Role;

    #[test]
    fn script_tags_stay_literal() {
        let message = Message::new(Role::User, "<script>alert(1)</script> & <b>bold?</b>");
        let markup = paragraph_markup(&message);
        assert_eq!(
            markup,
            "<b>User:</b> &lt;script&gt;alert(1)&lt;/script&gt; &amp; &lt;b&gt;bold?&lt;/b&gt;"
        );

        let spans = parse_markup(&markup);
        assert_eq!(
            spans,
            vec![
                Span {
                    text: "User:".into(),
                    bold: true
                },
                Span {
                    text: " <script>alert(1)</script> & <b>bold?</b>".into(),
                    bold: false
                },
            ]
        );
    }

    fn span(text: &str, bold: bool) -> Span {
        Span {
            text: text.into(),
            bold,
        }
    }

    #[test]
    fn role_label_shares_the_first_line() {
        let message = Message::new(Role::User, "What is QUIC?");
        let lines = layout(&parse_markup(&paragraph_markup(&message)), WRAP_CHARS);
        assert_eq!(
            lines,
            vec![vec![span("User:", true), span(" What is QUIC?", false)]]
        );
    }

    #[test]
    fn layout_respects_width_and_newlines() {
        let lines = layout(&[span("Dynamo AI:", true), span(" one two three\nfour", false)], 16);
        assert_eq!(
            lines,
            vec![
                vec![span("Dynamo AI:", true), span(" one", false)],
                vec![span("two three", false)],
                vec![span("four", false)],
            ]
        );
    }

    #[test]
    fn long_report_spans_pages() {
        let messages: Vec<Message> = (0..60)
            .map(|i| Message::new(Role::Assistant, format!("Finding {i}: {}", "word ".repeat(40))))
            .collect();
        let bytes = build_report(&messages).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
