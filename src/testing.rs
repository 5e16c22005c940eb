//! Provider doubles shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    error::ProviderError,
    prompts::Prompt,
    providers::{
        image::ImageGenerator,
        search::{SearchHit, WebSearch},
        speech::SpeechSynthesizer,
        TextGenerator, VisionDescriber,
    },
};

pub struct MockGenerator {
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        self.reply.clone().map_err(|detail| ProviderError::Status {
            provider: "mock",
            status: 500,
            body: detail,
        })
    }
}

#[derive(Default)]
pub struct MockVision {
    calls: AtomicUsize,
}

impl MockVision {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionDescriber for MockVision {
    async fn describe(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{instruction} [{mime_type}, {} bytes]", image.len()))
    }
}

pub struct MockSearch {
    hits: Option<Vec<SearchHit>>,
    queries: Mutex<Vec<(String, bool)>>,
}

impl MockSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits: Some(hits),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            hits: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<(String, bool)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    async fn search(&self, query: &str, deep: bool) -> Result<Vec<SearchHit>, ProviderError> {
        self.queries.lock().unwrap().push((query.to_string(), deep));
        self.hits
            .clone()
            .ok_or_else(|| ProviderError::invalid("mock-search", "offline"))
    }
}

#[derive(Default)]
pub struct MockSpeech {
    texts: Mutex<Vec<String>>,
}

impl MockSpeech {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>, ProviderError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(b"ID3fake-mp3-bytes".to_vec())
    }
}

pub struct MockImages {
    name: &'static str,
    ok: bool,
    calls: AtomicUsize,
}

impl MockImages {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            ok: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            ok: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for MockImages {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, _prompt: &str) -> Result<(Vec<u8>, &'static str), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.ok {
            Ok((vec![0x89, b'P', b'N', b'G'], "image/png"))
        } else {
            Err(ProviderError::invalid(self.name, "busy"))
        }
    }
}
