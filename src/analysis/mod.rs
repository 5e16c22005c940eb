//! `/analyze-data`: classify an upload by extension and hand it to the
//! matching reader.

pub mod chart;
pub mod document;
pub mod tabular;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{info, warn};

use crate::{error::AppError, model::analysis::AnalysisResult, providers::VisionDescriber};

pub const VISION_INSTRUCTION: &str = "Describe this image for research purposes.";
pub const VISION_NOT_CONFIGURED: &str = "Vision analysis is not configured.";
pub const UNSUPPORTED_FORMAT: &str = "Unsupported file format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
    Pdf,
    Docx,
    Txt,
    Image(&'static str),
    Unsupported,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Self {
        // Suffix match, so a bare ".csv" still counts as CSV.
        let name = filename.to_ascii_lowercase();
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();

        match ext {
            "csv" => FileKind::Csv,
            "xlsx" | "xls" => FileKind::Excel,
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Docx,
            "txt" => FileKind::Txt,
            "png" => FileKind::Image("image/png"),
            "jpg" | "jpeg" => FileKind::Image("image/jpeg"),
            "webp" => FileKind::Image("image/webp"),
            _ => FileKind::Unsupported,
        }
    }
}

pub async fn analyze(
    bytes: Vec<u8>,
    filename: &str,
    vision: Option<&dyn VisionDescriber>,
) -> Result<AnalysisResult, AppError> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty file".into()));
    }

    let kind = FileKind::from_filename(filename);
    info!(filename, ?kind, size = bytes.len(), "analyzing upload");

    match kind {
        FileKind::Csv | FileKind::Excel => {
            let name = filename.to_string();
            let result = tokio::task::spawn_blocking(move || {
                let grid = match kind {
                    FileKind::Csv => tabular::read_csv(&bytes),
                    _ => tabular::read_excel(bytes),
                }?;
                tabular::summarize(grid, &name)
            })
            .await?;

            result.map_err(|err| {
                warn!(filename, err = %err, "tabular upload unreadable");
                AppError::Unprocessable("Unable to read tabular data.".into())
            })
        }

        FileKind::Pdf | FileKind::Docx | FileKind::Txt => {
            let text = tokio::task::spawn_blocking(move || match kind {
                FileKind::Pdf => document::extract_pdf(&bytes),
                FileKind::Docx => document::extract_docx(&bytes),
                _ => Ok(document::extract_txt(&bytes)),
            })
            .await?
            .map_err(|err| {
                warn!(filename, err = %err, "document upload unreadable");
                AppError::Unprocessable("Unable to read document.".into())
            })?;

            Ok(AnalysisResult::Text {
                content: document::truncate_chars(&text, document::MAX_DOCUMENT_CHARS),
                insight: Some(format!("Read {filename} successfully.")),
            })
        }

        FileKind::Image(mime) => {
            let Some(vision) = vision else {
                warn!(filename, "vision backend not configured");
                return Ok(AnalysisResult::notice(VISION_NOT_CONFIGURED));
            };

            let content = vision.describe(&bytes, mime, VISION_INSTRUCTION).await?;
            Ok(AnalysisResult::Vision {
                content,
                image: format!("data:{mime};base64,{}", STANDARD.encode(&bytes)),
                insight: "Visual analysis complete.".into(),
            })
        }

        FileKind::Unsupported => Ok(AnalysisResult::notice(UNSUPPORTED_FORMAT)),
    }
}
