use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub identity: &'static str,
    pub capabilities: Capabilities,
}

/// Which optional integrations are configured.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Capabilities {
    pub chat: bool,
    pub deep_dive: bool,
    pub llama: bool,
    pub web_search: bool,
    pub vision: bool,
    pub image_generation: bool,
    pub image_fallback: bool,
    pub speech: bool,
    pub exports: bool,
}

/// Body of the audio endpoints. Extra chat fields are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub messages: Value,
}
