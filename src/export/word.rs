use std::io::Cursor;

use anyhow::{Context, Result};
use docx_rs::{Docx, Paragraph, Run, Style, StyleType};

use crate::model::message::Message;

pub const REPORT_TITLE: &str = "Dynamo AI Research Report";

const HEADING_STYLE: &str = "Heading1";

fn heading_style() -> Style {
    Style::new(HEADING_STYLE, StyleType::Paragraph)
        .name("Heading 1")
        .size(28)
        .bold()
}

/// Title, then a `Heading 1` role label and a body paragraph per message.
pub fn build_report(messages: &[Message]) -> Result<Vec<u8>> {
    let mut docx = Docx::new().add_style(heading_style()).add_paragraph(
        Paragraph::new().add_run(Run::new().add_text(REPORT_TITLE).size(40).bold()),
    );

    for message in messages {
        docx = docx
            .add_paragraph(
                Paragraph::new()
                    .style(HEADING_STYLE)
                    .add_run(Run::new().add_text(message.role.display_name())),
            )
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(&message.content).size(22)));
    }

    let mut bytes = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut bytes))
        .context("failed to pack DOCX")?;
    Ok(bytes)
}
