use serde::Serialize;

/// Result of `/analyze-data`, tagged by `type` for the front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisResult {
    Chart {
        image: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        insight: String,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        insight: String,
    },
    Text {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        insight: Option<String>,
    },
    Vision {
        content: String,
        image: String,
        insight: String,
    },
}

impl AnalysisResult {
    pub fn notice(content: impl Into<String>) -> Self {
        AnalysisResult::Text {
            content: content.into(),
            insight: None,
        }
    }
}
