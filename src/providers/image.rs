use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{config::ImageConfig, error::ProviderError};

const POLLINATIONS: &str = "pollinations";
const HUGGING_FACE: &str = "huggingface";

/// A generated image ready for the front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedImage {
    /// `data:` URI with the base64 payload.
    pub content: String,
    pub prompt: String,
    pub source: &'static str,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw image bytes and their MIME type.
    async fn generate(&self, prompt: &str) -> Result<(Vec<u8>, &'static str), ProviderError>;
}

pub struct PollinationsClient {
    http: reqwest::Client,
    base_url: String,
}

impl PollinationsClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, prompt: &str) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ProviderError::invalid(POLLINATIONS, format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::invalid(POLLINATIONS, "base url cannot carry a path"))?
            .push(prompt.trim());
        url.query_pairs_mut()
            .append_pair("nologo", "true")
            .append_pair("width", "1024")
            .append_pair("height", "1024")
            .append_pair("seed", &Uuid::new_v4().to_string());
        Ok(url)
    }
}

#[async_trait]
impl ImageGenerator for PollinationsClient {
    fn name(&self) -> &'static str {
        POLLINATIONS
    }

    async fn generate(&self, prompt: &str) -> Result<(Vec<u8>, &'static str), ProviderError> {
        let response = self
            .http
            .get(self.url_for(prompt)?)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(ProviderError::transport(POLLINATIONS))?;

        let response = ProviderError::check(POLLINATIONS, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(ProviderError::transport(POLLINATIONS))?;
        Ok((bytes.to_vec(), "image/jpeg"))
    }
}

pub struct HuggingFaceClient {
    http: reqwest::Client,
    token: String,
    url: String,
}

impl HuggingFaceClient {
    pub fn new(http: reqwest::Client, token: &str, url: &str) -> Self {
        Self {
            http,
            token: token.to_string(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceClient {
    fn name(&self) -> &'static str {
        HUGGING_FACE
    }

    async fn generate(&self, prompt: &str) -> Result<(Vec<u8>, &'static str), ProviderError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(60))
            .json(&json!({
                "inputs": prompt,
                "options": { "wait_for_model": true }
            }))
            .send()
            .await
            .map_err(ProviderError::transport(HUGGING_FACE))?;

        let response = ProviderError::check(HUGGING_FACE, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(ProviderError::transport(HUGGING_FACE))?;
        Ok((bytes.to_vec(), "image/png"))
    }
}

/// Primary generator with an optional fallback.
pub struct ImageService {
    primary: Arc<dyn ImageGenerator>,
    fallback: Option<Arc<dyn ImageGenerator>>,
}

impl ImageService {
    pub fn new(primary: Arc<dyn ImageGenerator>, fallback: Option<Arc<dyn ImageGenerator>>) -> Self {
        Self { primary, fallback }
    }

    pub fn from_config(http: reqwest::Client, config: &ImageConfig) -> Self {
        let primary: Arc<dyn ImageGenerator> =
            Arc::new(PollinationsClient::new(http.clone(), &config.pollinations_url));
        let fallback = config.hf_token.as_deref().map(|token| {
            Arc::new(HuggingFaceClient::new(http, token, &config.hf_url)) as Arc<dyn ImageGenerator>
        });
        Self::new(primary, fallback)
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let primary_err = match self.primary.generate(prompt).await {
            Ok(image) => return Ok(encode(image, prompt, self.primary.name())),
            Err(err) => err,
        };
        warn!(provider = self.primary.name(), err = %primary_err, "primary image provider failed");

        let Some(fallback) = &self.fallback else {
            return Err(primary_err);
        };

        info!(provider = fallback.name(), "trying fallback image provider");
        let image = fallback.generate(prompt).await?;
        Ok(encode(image, prompt, fallback.name()))
    }
}

fn encode((bytes, mime): (Vec<u8>, &'static str), prompt: &str, source: &'static str) -> GeneratedImage {
    GeneratedImage {
        content: format!("data:{mime};base64,{}", STANDARD.encode(bytes)),
        prompt: prompt.to_string(),
        source,
    }
}

/// Image prompt for a chat message that asked for an image: the text after
/// the last " of " when present, otherwise the whole message.
pub fn image_prompt(message: &str) -> String {
    let lower = message.to_lowercase();
    match lower.rfind(" of ") {
        // Lowercasing can shift byte offsets for some scripts; fall back to
        // the whole message when the index is not a boundary in the original.
        Some(idx) if lower.len() == message.len() && message.is_char_boundary(idx + 4) => {
            let tail = message[idx + 4..].trim();
            if tail.is_empty() {
                message.trim().to_string()
            } else {
                tail.to_string()
            }
        }
        _ => message.trim().to_string(),
    }
}

pub fn wants_image(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["generate image", "create image"]
        .iter()
        .any(|k| lower.contains(k))
}
