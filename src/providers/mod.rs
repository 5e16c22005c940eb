//! Outbound provider clients and the text-backend router.

pub mod gemini;
pub mod groq;
pub mod image;
pub mod search;
pub mod speech;

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::{config::DeepDivePrecedence, error::ProviderError, prompts::Prompt};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait VisionDescriber: Send + Sync {
    async fn describe(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ProviderError>;
}

/// Generation backends the router knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Gemini,
    GeminiDeep,
    Llama,
}

/// Checked in order; the first alias contained in the hint wins.
const ALIASES: &[(Backend, &[&str])] = &[
    (Backend::Llama, &["llama", "groq"]),
    (Backend::GeminiDeep, &["-pro", "deepthink"]),
    (Backend::Gemini, &["gemini", "flash"]),
];

impl Backend {
    pub const DEFAULT: Backend = Backend::Gemini;
    pub const DEEP: Backend = Backend::GeminiDeep;

    /// Resolve a free-form model name from the client. Unknown names map to
    /// `None`, which means "use the default".
    pub fn from_hint(hint: Option<&str>) -> Option<Backend> {
        let hint = hint?.trim().to_lowercase();
        if hint.is_empty() {
            return None;
        }
        ALIASES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|alias| hint.contains(alias)))
            .map(|(backend, _)| *backend)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::GeminiDeep => "gemini-deep",
            Backend::Llama => "llama",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Backend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub backend: Backend,
    pub preferred: Backend,
    pub fell_back: bool,
}

pub struct ProviderRouter {
    backends: HashMap<Backend, Arc<dyn TextGenerator>>,
    precedence: DeepDivePrecedence,
}

impl ProviderRouter {
    pub fn new(precedence: DeepDivePrecedence) -> Self {
        Self {
            backends: HashMap::new(),
            precedence,
        }
    }

    pub fn with_backend(mut self, backend: Backend, generator: Arc<dyn TextGenerator>) -> Self {
        self.backends.insert(backend, generator);
        self
    }

    pub fn is_available(&self, backend: Backend) -> bool {
        self.backends.contains_key(&backend)
    }

    pub fn has_any(&self) -> bool {
        !self.backends.is_empty()
    }

    /// Pick the backend for a request. The preferred backend comes from the
    /// explicit request and the deep-dive flag; if it is not configured the
    /// chain falls back to the deep default (for deep requests) and then to
    /// the fast default.
    pub fn select(
        &self,
        requested: Option<Backend>,
        deep_dive: bool,
    ) -> Result<Route, ProviderError> {
        let explicit = requested.filter(|b| *b != Backend::DEFAULT);

        let preferred = match (explicit, deep_dive) {
            (Some(named), true) if named != Backend::DEEP => {
                let winner = match self.precedence {
                    DeepDivePrecedence::DeepDive => Backend::DEEP,
                    DeepDivePrecedence::Model => named,
                };
                warn!(
                    requested = %named,
                    chosen = %winner,
                    precedence = ?self.precedence,
                    "deep dive requested together with an alternate backend"
                );
                winner
            }
            (Some(named), _) => named,
            (None, true) => Backend::DEEP,
            (None, false) => Backend::DEFAULT,
        };

        let mut chain = vec![preferred];
        if deep_dive && preferred != Backend::DEEP {
            chain.push(Backend::DEEP);
        }
        chain.push(Backend::DEFAULT);

        let backend = chain
            .into_iter()
            .find(|b| self.is_available(*b))
            .ok_or(ProviderError::Unavailable {
                provider: "text generation",
            })?;

        let fell_back = backend != preferred;
        if fell_back {
            info!(%preferred, %backend, "preferred backend not configured, falling back");
        }

        Ok(Route {
            backend,
            preferred,
            fell_back,
        })
    }

    pub async fn generate(&self, route: &Route, prompt: &Prompt) -> Result<String, ProviderError> {
        let generator = self
            .backends
            .get(&route.backend)
            .ok_or(ProviderError::Unavailable {
                provider: "text generation",
            })?;
        debug!(backend = %route.backend, client = generator.name(), "generating");
        generator.generate(prompt).await
    }
}
