//! Document assemblers for chat exports and smart presentations.

pub mod pdf;
pub mod pptx;
pub mod slides;
pub mod word;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    model::{message::Message, presentation::PresentationSpec},
};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const PDF_MIME: &str = "application/pdf";

/// A built file ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub filename: &'static str,
}

impl Document {
    pub fn word(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: DOCX_MIME,
            filename: "DynamoAI_Report.docx",
        }
    }

    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: PDF_MIME,
            filename: "DynamoAI_Report.pdf",
        }
    }

    pub fn report_slides(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: PPTX_MIME,
            filename: "DynamoAI_Report.pptx",
        }
    }

    pub fn presentation(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: PPTX_MIME,
            filename: "DynamoAI_Presentation.pptx",
        }
    }
}

/// Chat history export targets, as named in `/export/{format}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Word,
    Slides,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "word" | "docx" => Some(ExportFormat::Word),
            "ppt" | "pptx" => Some(ExportFormat::Slides),
            _ => None,
        }
    }

    /// CPU-bound; call from a blocking task.
    pub fn build(self, messages: &[Message]) -> Result<Document, AppError> {
        match self {
            ExportFormat::Pdf => pdf::build_report(messages)
                .map(Document::pdf)
                .map_err(AppError::build("PDF report")),
            ExportFormat::Word => word::build_report(messages)
                .map(Document::word)
                .map_err(AppError::build("Word report")),
            ExportFormat::Slides => pptx::build(&slides::history_deck(messages))
                .map(Document::report_slides)
                .map_err(AppError::build("slide report")),
        }
    }
}

/// CPU-bound; call from a blocking task.
pub fn build_presentation(spec: &PresentationSpec) -> Result<Document, AppError> {
    pptx::build(&slides::smart_deck(spec))
        .map(Document::presentation)
        .map_err(AppError::build("presentation"))
}

/// `attachment; filename="…"` for a fixed ASCII filename.
pub fn attachment(filename: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

impl IntoResponse for Document {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(self.mime)),
                (header::CONTENT_DISPOSITION, attachment(self.filename)),
            ],
            self.bytes,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::Role;

    #[test]
    fn format_names_resolve() {
        assert_eq!(ExportFormat::parse("PDF"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::parse("word"), Some(ExportFormat::Word));
        assert_eq!(ExportFormat::parse("ppt"), Some(ExportFormat::Slides));
        assert_eq!(ExportFormat::parse("odt"), None);
    }

    #[test]
    fn every_format_builds() {
        let messages = vec![
            Message::new(Role::User, "Compare TCP and QUIC"),
            Message::new(Role::Assistant, "QUIC runs over UDP."),
        ];
        for format in [ExportFormat::Pdf, ExportFormat::Word, ExportFormat::Slides] {
            let doc = format.build(&messages).unwrap();
            assert!(!doc.bytes.is_empty(), "{format:?} produced nothing");
        }
        assert_eq!(
            ExportFormat::Slides.build(&messages).unwrap().filename,
            "DynamoAI_Report.pptx"
        );
    }

    #[test]
    fn download_headers_are_set() {
        let response = Document::pdf(b"%PDF".to_vec()).into_response();
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], PDF_MIME);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"DynamoAI_Report.pdf\""
        );
    }
}
