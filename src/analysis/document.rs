use std::io::{Cursor, Read};

use anyhow::{anyhow, Context, Result};

/// Ceiling on extracted text handed back to the client.
pub const MAX_DOCUMENT_CHARS: usize = 30_000;

pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // The extractor panics on some malformed files.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| anyhow!("PDF parser aborted on malformed input"))?
        .map_err(|e| anyhow!("failed to extract text from PDF: {e:?}"))
}

pub fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("failed to read DOCX as ZIP")?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX missing word/document.xml")?
        .read_to_string(&mut xml)
        .context("failed to read word/document.xml")?;

    Ok(docx_paragraphs(&xml).join("\n"))
}

pub fn extract_txt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Text of every non-empty `<w:p>` paragraph, in document order.
fn docx_paragraphs(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text {
            current.push_str(&decode_entities(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_end_matches('/')
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("");

        match name {
            "w:t" if !self_closing => in_text = true,
            "/w:t" => in_text = false,
            "w:tab" => current.push('\t'),
            "w:br" | "w:cr" => current.push('\n'),
            "/w:p" => {
                if !current.trim().is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
