use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{TextGenerator, VisionDescriber};
use crate::{
    config::GeminiConfig,
    error::ProviderError,
    model::message::Role,
    prompts::Prompt,
};

const PROVIDER: &str = "gemini";

/// Google Gemini `generateContent` client bound to one model.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: &GeminiConfig, model: &str) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            model: model.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, body: Value) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, "gemini generateContent");

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let response = ProviderError::check(PROVIDER, response).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        parsed.into_text()
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

fn contents(prompt: &Prompt) -> Vec<Content<'_>> {
    let mut out: Vec<Content<'_>> = prompt
        .history
        .iter()
        .map(|m| Content {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "model",
            },
            parts: vec![Part { text: &m.content }],
        })
        .collect();

    out.push(Content {
        role: "user",
        parts: vec![Part {
            text: &prompt.question,
        }],
    });
    out
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": contents(prompt),
        });
        self.generate_content(body).await
    }
}

#[async_trait]
impl VisionDescriber for GeminiClient {
    async fn describe(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": instruction },
                    { "inline_data": { "mime_type": mime_type, "data": STANDARD.encode(image) } }
                ]
            }]
        });
        self.generate_content(body).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, ProviderError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::invalid(
                PROVIDER,
                format!("prompt blocked: {reason}"),
            ));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid(PROVIDER, "no candidates returned"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(ProviderError::invalid(
                PROVIDER,
                format!("empty candidate (finish reason: {reason})"),
            ));
        }
        Ok(text)
    }
}
