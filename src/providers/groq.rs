use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TextGenerator;
use crate::{config::GroqConfig, error::ProviderError, model::message::Role, prompts::Prompt};

const PROVIDER: &str = "groq";

/// OpenAI-compatible chat completions on Groq (Llama 3 family).
#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(http: reqwest::Client, config: &GroqConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_messages(prompt: &Prompt) -> Vec<ChatMessage<'_>> {
    let mut messages = Vec::with_capacity(prompt.history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: &prompt.system,
    });
    messages.extend(prompt.history.iter().map(|m| ChatMessage {
        role: match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: &m.content,
    }));
    messages.push(ChatMessage {
        role: "user",
        content: &prompt.question,
    });
    messages
}

#[async_trait]
impl TextGenerator for GroqClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: chat_messages(prompt),
        };
        debug!(model = %self.model, turns = request.messages.len(), "groq chat completion");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let response = ProviderError::check(PROVIDER, response).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid(PROVIDER, "no completion content returned"))
    }
}
