use serde::Deserialize;

pub const DEFAULT_PRESENTATION_TITLE: &str = "Dynamo AI Presentation";

/// Caller-supplied description of a deck for `/generate-ppt-smart`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentationSpec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub slides: Vec<SlideSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    #[default]
    Content,
    Conclusion,
    TwoColumn,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlideSpec {
    #[serde(rename = "type", default)]
    pub kind: SlideKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub left: Vec<String>,
    #[serde(default)]
    pub right: Vec<String>,
}
