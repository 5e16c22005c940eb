use std::path::PathBuf;

use anyhow::{bail, Context, Result};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_HISTORY_WINDOW: usize = 10;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Which side wins when a request names an alternate backend and also asks
/// for a deep dive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepDivePrecedence {
    DeepDive,
    Model,
}

impl DeepDivePrecedence {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deep_dive" | "deep-dive" | "deep" => Ok(Self::DeepDive),
            "model" => Ok(Self::Model),
            other => bail!("DEEP_DIVE_PRECEDENCE must be `deep_dive` or `model`, got `{other}`"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub deep_model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub pollinations_url: String,
    pub hf_token: Option<String>,
    pub hf_url: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: String,
    pub region: String,
}

/// Process configuration, read once at start-up and handed to every
/// component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub history_window: usize,
    pub max_upload_bytes: usize,
    pub deep_dive_precedence: DeepDivePrecedence,
    pub gemini: Option<GeminiConfig>,
    pub groq: Option<GroqConfig>,
    pub search: Option<SearchConfig>,
    pub image: ImageConfig,
    pub speech: Option<SpeechConfig>,
    pub voice: String,
    pub audio_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = parse_var("PORT", DEFAULT_PORT)?;
        let history_window = parse_var("HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?;
        if history_window == 0 {
            bail!("HISTORY_WINDOW must be at least 1");
        }
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let deep_dive_precedence = match secret("DEEP_DIVE_PRECEDENCE") {
            Some(raw) => DeepDivePrecedence::parse(&raw)?,
            None => DeepDivePrecedence::DeepDive,
        };

        let gemini = secret("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: var_or("GEMINI_MODEL", "gemini-2.0-flash"),
            deep_model: var_or("GEMINI_DEEP_MODEL", "gemini-2.5-pro"),
            base_url: var_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
        });

        let groq = secret("GROQ_API_KEY").map(|api_key| GroqConfig {
            api_key,
            model: var_or("GROQ_MODEL", "llama-3.3-70b-versatile"),
            base_url: var_or("GROQ_BASE_URL", "https://api.groq.com/openai/v1"),
        });

        let search = secret("TAVILY_API_KEY").map(|api_key| SearchConfig {
            api_key,
            base_url: var_or("TAVILY_BASE_URL", "https://api.tavily.com"),
        });

        let image = ImageConfig {
            pollinations_url: var_or("POLLINATIONS_URL", "https://image.pollinations.ai/prompt"),
            hf_token: secret("HF_API_TOKEN"),
            hf_url: var_or(
                "HF_IMAGE_URL",
                "https://api-inference.huggingface.co/models/stabilityai/sdxl-turbo",
            ),
        };

        let speech = match (secret("AZURE_SPEECH_KEY"), secret("AZURE_SPEECH_REGION")) {
            (Some(api_key), Some(region)) => Some(SpeechConfig { api_key, region }),
            _ => None,
        };

        let audio_dir = secret("AUDIO_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            port,
            history_window,
            max_upload_bytes,
            deep_dive_precedence,
            gemini,
            groq,
            search,
            image,
            speech,
            voice: var_or("TTS_VOICE", "en-IN-PrabhatNeural"),
            audio_dir,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// A variable that counts as unset when blank.
fn secret(name: &str) -> Option<String> {
    dotenvy::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    secret(name).unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match secret(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {name}: `{raw}`")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with every optional provider switched off.
    pub fn bare() -> Self {
        Self {
            port: DEFAULT_PORT,
            history_window: DEFAULT_HISTORY_WINDOW,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            deep_dive_precedence: DeepDivePrecedence::DeepDive,
            gemini: None,
            groq: None,
            search: None,
            image: ImageConfig {
                pollinations_url: "http://127.0.0.1:9/prompt".into(),
                hf_token: None,
                hf_url: "http://127.0.0.1:9/hf".into(),
            },
            speech: None,
            voice: "en-IN-PrabhatNeural".into(),
            audio_dir: std::env::temp_dir(),
        }
    }
}
