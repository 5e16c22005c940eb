//! Text-to-speech flows behind `/export-audio` and `/generate-radio`.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, ProviderError},
    export::attachment,
    model::dialogue::DialogueScript,
    prompts::{self, Prompt},
    providers::{speech::SpeechSynthesizer, ProviderRouter},
};

pub const MAX_SIMPLE_CHARS: usize = 2_000;
pub const MAX_DIALOGUE_CHARS: usize = 1_500;
pub const VOICE_FILENAME: &str = "dynamo_ai_voice.mp3";
pub const RADIO_FILENAME: &str = "dynamo_ai_radio.mp3";

/// A synthesized MP3 on disk. The file is removed when the guard drops.
pub struct TempAudio {
    file: Option<NamedTempFile>,
}

impl TempAudio {
    pub async fn write(dir: &Path, audio: Vec<u8>) -> Result<Self, AppError> {
        let dir: PathBuf = dir.to_path_buf();
        let file = tokio::task::spawn_blocking(move || -> anyhow::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("voice_")
                .suffix(".mp3")
                .tempfile_in(&dir)
                .with_context(|| format!("failed to create temp audio in {}", dir.display()))?;
            file.write_all(&audio).context("failed to write temp audio")?;
            file.flush().context("failed to flush temp audio")?;
            Ok(file)
        })
        .await?
        .map_err(AppError::build("audio file"))?;

        debug!(path = %file.path().display(), "temp audio written");
        Ok(Self { file: Some(file) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else { return };
        let path = file.path().to_path_buf();
        match file.close() {
            Ok(()) => debug!(path = %path.display(), "temp audio removed"),
            Err(err) => warn!(path = %path.display(), %err, "failed to remove temp audio"),
        }
    }
}

/// Stream the file back; the guard rides along in the body stream so the
/// file is deleted once the body is finished or dropped.
pub async fn audio_response(audio: TempAudio, filename: &str) -> Result<Response, AppError> {
    let path = audio
        .path()
        .ok_or_else(|| anyhow::anyhow!("temp audio already released"))?
        .to_path_buf();
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("failed to reopen {}", path.display()))?;

    let stream = ReaderStream::new(file).map(move |chunk| {
        let _guard = &audio;
        chunk
    });

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
            (header::CONTENT_DISPOSITION, attachment(filename)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn synthesizer(
    speech: Option<&dyn SpeechSynthesizer>,
) -> Result<&dyn SpeechSynthesizer, AppError> {
    speech.ok_or_else(|| {
        warn!("speech synthesis requested but not configured");
        AppError::from(ProviderError::Unavailable { provider: "speech" })
    })
}

/// Single-voice reading of `text`.
pub async fn speak(
    speech: Option<&dyn SpeechSynthesizer>,
    voice: &str,
    audio_dir: &Path,
    text: &str,
) -> Result<Response, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("No text provided for voice output".into()));
    }
    let speech = synthesizer(speech)?;

    let audio = speech.synthesize(&truncate(text, MAX_SIMPLE_CHARS), voice).await?;
    info!(bytes = audio.len(), "voice output synthesized");

    audio_response(TempAudio::write(audio_dir, audio).await?, VOICE_FILENAME).await
}

/// Parse the backend's script. Surrounding code fences are tolerated,
/// nothing else.
pub fn parse_script(raw: &str) -> Result<DialogueScript, AppError> {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        body = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    let script: DialogueScript =
        serde_json::from_str(body).map_err(|e| AppError::Script(e.to_string()))?;

    if script.flatten().is_empty() {
        return Err(AppError::Script("dialogue is empty".into()));
    }
    Ok(script)
}

/// Two-speaker radio segment on `topic`: one script generation, then one
/// synthesis of the flattened dialogue.
pub async fn radio(
    router: &ProviderRouter,
    speech: Option<&dyn SpeechSynthesizer>,
    voice: &str,
    audio_dir: &Path,
    topic: &str,
) -> Result<Response, AppError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(AppError::BadRequest("No topic provided".into()));
    }
    let speech = synthesizer(speech)?;

    let route = router.select(None, false)?;
    let prompt = Prompt {
        system: prompts::DYNAMO_IDENTITY.to_string(),
        history: Vec::new(),
        question: prompts::radio_script_prompt(topic)?,
    };
    let raw = router.generate(&route, &prompt).await?;
    let script = parse_script(&raw)?;
    info!(backend = %route.backend, turns = script.dialogue.len(), "radio script generated");

    let text = truncate(&script.flatten(), MAX_DIALOGUE_CHARS);
    let audio = speech.synthesize(&text, voice).await?;

    audio_response(TempAudio::write(audio_dir, audio).await?, RADIO_FILENAME).await
}
