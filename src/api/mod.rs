use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::{info, warn};

use crate::{
    config::Config,
    providers::{
        gemini::GeminiClient,
        groq::GroqClient,
        image::ImageService,
        search::{TavilyClient, WebSearch},
        speech::{AzureSpeechClient, SpeechSynthesizer},
        Backend, ProviderRouter, VisionDescriber,
    },
};

pub mod handlers;
pub mod types;

use handlers::{
    analyze_data, chat, export_audio, export_history, generate_ppt_smart, generate_radio, health,
};

/// Everything a handler needs, built once from [`Config`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub router: Arc<ProviderRouter>,
    pub vision: Option<Arc<dyn VisionDescriber>>,
    pub search: Option<Arc<dyn WebSearch>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    pub images: Arc<ImageService>,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build HTTP client")?;

        let mut router = ProviderRouter::new(config.deep_dive_precedence);
        let mut vision: Option<Arc<dyn VisionDescriber>> = None;

        match &config.gemini {
            Some(gemini) => {
                let fast = Arc::new(GeminiClient::new(http.clone(), gemini, &gemini.model));
                let deep = Arc::new(GeminiClient::new(http.clone(), gemini, &gemini.deep_model));
                info!(fast = fast.model(), deep = deep.model(), "gemini enabled");
                router = router
                    .with_backend(Backend::Gemini, fast.clone())
                    .with_backend(Backend::GeminiDeep, deep);
                vision = Some(fast as Arc<dyn VisionDescriber>);
            }
            None => warn!("GEMINI_API_KEY not set; gemini text and vision disabled"),
        }

        match &config.groq {
            Some(groq) => {
                info!(model = %groq.model, "groq llama enabled");
                let llama = Arc::new(GroqClient::new(http.clone(), groq));
                router = router.with_backend(Backend::Llama, llama);
            }
            None => warn!("GROQ_API_KEY not set; llama backend disabled"),
        }

        if !router.has_any() {
            warn!("no text backend configured; chat will answer with a notice");
        }

        let search = config.search.as_ref().map(|search| {
            info!("tavily web search enabled");
            Arc::new(TavilyClient::new(http.clone(), search)) as Arc<dyn WebSearch>
        });
        if search.is_none() {
            warn!("TAVILY_API_KEY not set; web search disabled");
        }

        let speech = config.speech.as_ref().map(|speech| {
            info!(region = %speech.region, voice = %config.voice, "azure speech enabled");
            Arc::new(AzureSpeechClient::new(http.clone(), speech)) as Arc<dyn SpeechSynthesizer>
        });
        if speech.is_none() {
            warn!("AZURE_SPEECH_KEY/AZURE_SPEECH_REGION not set; audio endpoints disabled");
        }

        let images = ImageService::from_config(http, &config.image);
        if !images.has_fallback() {
            info!("HF_API_TOKEN not set; image generation has no fallback");
        }

        Ok(Self {
            config: Arc::new(config),
            router: Arc::new(router),
            vision,
            search,
            speech,
            images: Arc::new(images),
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/chat", post(chat))
        .route("/analyze-data", post(analyze_data))
        .route("/generate-ppt-smart", post(generate_ppt_smart))
        .route("/generate-radio", post(generate_radio))
        .route("/export-audio", post(export_audio))
        .route("/export/{format}", post(export_history))
}
