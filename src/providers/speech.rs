use async_trait::async_trait;
use tracing::debug;

use crate::{config::SpeechConfig, error::ProviderError};

const PROVIDER: &str = "azure-speech";
const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// MP3 bytes for `text` spoken by `voice`.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Azure neural text-to-speech over the REST endpoint.
#[derive(Clone)]
pub struct AzureSpeechClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl AzureSpeechClient {
    pub fn new(http: reqwest::Client, config: &SpeechConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                config.region
            ),
        }
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn ssml(text: &str, voice: &str) -> String {
    let lang = voice.splitn(3, '-').take(2).collect::<Vec<_>>().join("-");
    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"{lang}\">\
<voice name=\"{voice}\">{}</voice></speak>",
        escape_xml(text),
        lang = escape_xml(&lang),
        voice = escape_xml(voice),
    )
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeechClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ProviderError> {
        debug!(voice, chars = text.chars().count(), "synthesizing speech");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(reqwest::header::USER_AGENT, "dynamo-hub")
            .body(ssml(text, voice))
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let response = ProviderError::check(PROVIDER, response).await?;
        let audio = response
            .bytes()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if audio.is_empty() {
            return Err(ProviderError::invalid(PROVIDER, "empty audio stream"));
        }
        Ok(audio.to_vec())
    }
}
