//! The `/chat` pipeline: identity guard, image trigger, optional web
//! context, prompt assembly and backend routing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::Config,
    conversation::normalize_history,
    error::{AppError, ProviderError},
    prompts::{build_prompt, identity_reply},
    providers::{
        image::{image_prompt, wants_image, ImageService},
        search::{web_context, WebSearch},
        Backend, ProviderRouter,
    },
};

fn default_use_search() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Value,
    #[serde(default = "default_use_search")]
    pub use_search: bool,
    #[serde(default)]
    pub deep_dive: bool,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatReply {
    /// Model answers carry the backend; the local identity answer has none.
    Text {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        backend: Option<Backend>,
    },
    #[serde(rename = "image_v2")]
    Image {
        content: String,
        prompt: String,
        source: &'static str,
    },
    Notice {
        content: String,
        reason: &'static str,
    },
}

pub const NO_BACKEND_NOTICE: &str =
    "Dynamo AI text generation is currently unavailable. Please try again later.";

/// Collaborators the chat pipeline calls out to.
pub struct ChatDeps<'a> {
    pub config: &'a Config,
    pub router: &'a ProviderRouter,
    pub search: Option<&'a dyn WebSearch>,
    pub images: &'a ImageService,
}

pub async fn respond(deps: &ChatDeps<'_>, req: &ChatRequest) -> Result<ChatReply, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".into()));
    }

    if let Some(identity) = identity_reply(message) {
        info!("identity question answered locally");
        return Ok(ChatReply::Text {
            content: identity.to_string(),
            backend: None,
        });
    }

    if wants_image(message) {
        let prompt = image_prompt(message);
        info!(%prompt, "image generation requested");
        let image = deps.images.generate(&prompt).await?;
        return Ok(ChatReply::Image {
            content: image.content,
            prompt: image.prompt,
            source: image.source,
        });
    }

    let context = match (req.use_search, deps.search) {
        (true, Some(search)) => web_context(search, message, req.deep_dive).await,
        (true, None) => {
            warn!("web search requested but not configured");
            None
        }
        (false, _) => None,
    };

    let history = normalize_history(&req.history, deps.config.history_window);
    let prompt = build_prompt(message, history, context.as_deref(), req.deep_dive)?;

    let requested = Backend::from_hint(req.model.as_deref());
    let route = match deps.router.select(requested, req.deep_dive) {
        Ok(route) => route,
        Err(ProviderError::Unavailable { .. }) => {
            warn!("no text backend configured");
            return Ok(ChatReply::Notice {
                content: NO_BACKEND_NOTICE.to_string(),
                reason: "not_configured",
            });
        }
        Err(err) => return Err(err.into()),
    };

    let content = deps.router.generate(&route, &prompt).await?;
    info!(
        backend = %route.backend,
        preferred = %route.preferred,
        fell_back = route.fell_back,
        deep = req.deep_dive,
        searched = context.is_some(),
        "chat answered"
    );

    Ok(ChatReply::Text {
        content,
        backend: Some(route.backend),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        config::DeepDivePrecedence,
        prompts::{DEEP_OUTLINE_MARKER, DYNAMO_IDENTITY},
        providers::search::SearchHit,
        testing::{MockGenerator, MockImages, MockSearch},
    };

    struct Harness {
        config: Config,
        router: ProviderRouter,
        search: Arc<MockSearch>,
        images: ImageService,
        gemini: Arc<MockGenerator>,
        llama: Arc<MockGenerator>,
        pollinations: Arc<MockImages>,
    }

    impl Harness {
        fn new() -> Self {
            let gemini = MockGenerator::replying("gemini says hi");
            let llama = MockGenerator::replying("llama says hi");
            let pollinations = MockImages::ok("pollinations");
            Self {
                config: Config::bare(),
                router: ProviderRouter::new(DeepDivePrecedence::DeepDive)
                    .with_backend(Backend::Gemini, gemini.clone())
                    .with_backend(Backend::Llama, llama.clone()),
                search: MockSearch::with_hits(vec![SearchHit {
                    title: "Result".into(),
                    content: "fresh fact".into(),
                    url: "https://example.com".into(),
                }]),
                images: ImageService::new(pollinations.clone(), None),
                gemini,
                llama,
                pollinations,
            }
        }

        async fn ask(&self, body: Value) -> Result<ChatReply, AppError> {
            let req: ChatRequest = serde_json::from_value(body).unwrap();
            let deps = ChatDeps {
                config: &self.config,
                router: &self.router,
                search: Some(self.search.as_ref()),
                images: &self.images,
            };
            respond(&deps, &req).await
        }
    }

    #[tokio::test]
    async fn identity_short_circuits_everything() {
        let h = Harness::new();
        let reply = h
            .ask(json!({
                "message": "Who are you? generate image of yourself",
                "deep_dive": true,
                "use_search": true,
                "model": "llama"
            }))
            .await
            .unwrap();

        assert_eq!(
            reply,
            ChatReply::Text {
                content: DYNAMO_IDENTITY.to_string(),
                backend: None
            }
        );
        assert_eq!(serde_json::to_value(&reply).unwrap()["type"], "text");
        assert_eq!(h.gemini.calls() + h.llama.calls(), 0);
        assert!(h.search.queries().is_empty());
        assert_eq!(h.pollinations.calls(), 0);
    }

    #[tokio::test]
    async fn plain_question_uses_search_and_default_backend() {
        let h = Harness::new();
        let reply = h
            .ask(json!({
                "message": "what changed in rust 1.80?",
                "history": [
                    {"role": "user", "content": "hi"},
                    {"role": "system", "content": "dropped"},
                    {"role": "assistant", "content": "hello"}
                ]
            }))
            .await
            .unwrap();

        assert_eq!(
            reply,
            ChatReply::Text {
                content: "gemini says hi".into(),
                backend: Some(Backend::Gemini)
            }
        );
        let prompt = h.gemini.last_prompt().unwrap();
        assert_eq!(prompt.history.len(), 2);
        assert!(prompt.question.contains("fresh fact"));
        assert_eq!(h.search.queries().len(), 1);
    }

    #[tokio::test]
    async fn search_can_be_switched_off() {
        let h = Harness::new();
        h.ask(json!({"message": "offline please", "use_search": false}))
            .await
            .unwrap();
        assert!(h.search.queries().is_empty());
        assert!(!h.gemini.last_prompt().unwrap().question.contains("CONTEXT:"));
    }

    #[tokio::test]
    async fn model_hint_routes_to_llama() {
        let h = Harness::new();
        let reply = h
            .ask(json!({"message": "explain monads", "model": "Llama3", "use_search": false}))
            .await
            .unwrap();
        assert!(matches!(reply, ChatReply::Text { backend: Some(Backend::Llama), .. }));
        assert_eq!(h.llama.calls(), 1);
        assert_eq!(h.gemini.calls(), 0);
    }

    #[tokio::test]
    async fn deep_dive_prompt_has_outline_once() {
        let h = Harness::new();
        h.ask(json!({"message": "explain raft", "deep_dive": true, "use_search": false}))
            .await
            .unwrap();

        // No deep backend configured, so the fast default answers.
        let prompt = h.gemini.last_prompt().unwrap();
        assert_eq!(prompt.system.matches(DEEP_OUTLINE_MARKER).count(), 1);
    }

    #[tokio::test]
    async fn image_trigger_uses_text_after_of() {
        let h = Harness::new();
        let reply = h
            .ask(json!({"message": "Please generate image of a red fox in snow"}))
            .await
            .unwrap();

        match reply {
            ChatReply::Image { content, prompt, source } => {
                assert_eq!(prompt, "a red fox in snow");
                assert_eq!(source, "pollinations");
                assert!(content.starts_with("data:image/png;base64,"));
            }
            other => panic!("expected image, got {other:?}"),
        }
        assert_eq!(h.gemini.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_an_error_not_text() {
        let mut h = Harness::new();
        h.router = ProviderRouter::new(DeepDivePrecedence::DeepDive)
            .with_backend(Backend::Gemini, MockGenerator::failing("quota exceeded"));

        let err = h
            .ask(json!({"message": "hello there", "use_search": false}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn no_backend_is_a_notice() {
        let mut h = Harness::new();
        h.router = ProviderRouter::new(DeepDivePrecedence::DeepDive);

        let reply = h
            .ask(json!({"message": "hello there", "use_search": false}))
            .await
            .unwrap();
        assert!(matches!(reply, ChatReply::Notice { reason: "not_configured", .. }));
    }

    #[test]
    fn reply_serializes_with_type_tag() {
        let text = serde_json::to_value(ChatReply::Text {
            content: "hi".into(),
            backend: Some(Backend::GeminiDeep),
        })
        .unwrap();
        assert_eq!(text, json!({"type": "text", "content": "hi", "backend": "gemini-deep"}));

        let identity = serde_json::to_value(ChatReply::Text {
            content: DYNAMO_IDENTITY.into(),
            backend: None,
        })
        .unwrap();
        assert_eq!(identity, json!({"type": "text", "content": DYNAMO_IDENTITY}));

        let image = serde_json::to_value(ChatReply::Image {
            content: "data:".into(),
            prompt: "fox".into(),
            source: "huggingface",
        })
        .unwrap();
        assert_eq!(image["type"], "image_v2");
    }
}
