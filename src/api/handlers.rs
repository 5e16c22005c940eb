use axum::{
    extract::{Multipart, Path, State},
    response::Response,
    Json,
};
use tracing::info;

use crate::{
    analysis,
    api::{
        types::{Capabilities, ExportRequest, HealthResponse, SpeechRequest},
        AppState,
    },
    chat::{self, ChatDeps, ChatReply, ChatRequest},
    conversation::{normalize_all, validate_export_history},
    error::AppError,
    export::{self, Document, ExportFormat},
    model::{analysis::AnalysisResult, presentation::PresentationSpec},
    providers::Backend,
    voice,
};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online",
        identity: "Dynamo AI",
        capabilities: Capabilities {
            chat: state.router.has_any(),
            deep_dive: state.router.is_available(Backend::DEEP),
            llama: state.router.is_available(Backend::Llama),
            web_search: state.search.is_some(),
            vision: state.vision.is_some(),
            image_generation: true,
            image_fallback: state.images.has_fallback(),
            speech: state.speech.is_some(),
            exports: true,
        },
    })
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let deps = ChatDeps {
        config: &state.config,
        router: &state.router,
        search: state.search.as_deref(),
        images: &state.images,
    };
    Ok(Json(chat::respond(&deps, &req).await?))
}

pub async fn analyze_data(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read field: {e}")))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .ok_or_else(|| AppError::BadRequest("No file found in multipart upload".into()))?;

    let result = analysis::analyze(bytes.to_vec(), &filename, state.vision.as_deref()).await?;
    Ok(Json(result))
}

pub async fn generate_ppt_smart(Json(spec): Json<PresentationSpec>) -> Result<Document, AppError> {
    info!(slides = spec.slides.len(), "building smart presentation");
    tokio::task::spawn_blocking(move || export::build_presentation(&spec)).await?
}

pub async fn generate_radio(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Response, AppError> {
    voice::radio(
        &state.router,
        state.speech.as_deref(),
        &state.config.voice,
        &state.config.audio_dir,
        &req.message,
    )
    .await
}

pub async fn export_audio(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Response, AppError> {
    voice::speak(
        state.speech.as_deref(),
        &state.config.voice,
        &state.config.audio_dir,
        &req.message,
    )
    .await
}

pub async fn export_history(
    Path(name): Path<String>,
    Json(req): Json<ExportRequest>,
) -> Result<Document, AppError> {
    let format = ExportFormat::parse(&name)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported export format: {name}")))?;
    validate_export_history(&req.messages)?;

    let messages = normalize_all(&req.messages);
    info!(?format, messages = messages.len(), "exporting chat history");

    tokio::task::spawn_blocking(move || format.build(&messages)).await?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::FromRequest,
        http::{header, Request, StatusCode},
        response::IntoResponse,
    };
    use serde_json::json;

    use super::*;
    use crate::{
        config::{Config, DeepDivePrecedence},
        prompts::DYNAMO_IDENTITY,
        providers::{image::ImageService, speech::SpeechSynthesizer, ProviderRouter},
        testing::{MockGenerator, MockImages, MockSpeech},
    };

    const SCRIPT: &str =
        r#"{"dialogue": [{"speaker": "Host", "text": "Qubits!"}, {"speaker": "Guest", "text": "Superposition."}]}"#;

    struct Fixture {
        state: AppState,
        generator: Arc<MockGenerator>,
        speech: Arc<MockSpeech>,
        audio_dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let audio_dir = tempfile::tempdir().unwrap();
        let generator = MockGenerator::replying(SCRIPT);
        let speech = MockSpeech::new();

        let mut config = Config::bare();
        config.audio_dir = audio_dir.path().to_path_buf();

        let state = AppState {
            config: Arc::new(config),
            router: Arc::new(
                ProviderRouter::new(DeepDivePrecedence::DeepDive)
                    .with_backend(Backend::Gemini, generator.clone()),
            ),
            vision: None,
            search: None,
            speech: Some(speech.clone() as Arc<dyn SpeechSynthesizer>),
            images: Arc::new(ImageService::new(MockImages::ok("pollinations"), None)),
        };

        Fixture {
            state,
            generator,
            speech,
            audio_dir,
        }
    }

    #[tokio::test]
    async fn health_lists_capabilities() {
        let f = fixture();
        let Json(report) = health(State(f.state)).await;
        assert_eq!(report.status, "online");
        assert_eq!(report.identity, "Dynamo AI");
        assert!(report.capabilities.chat);
        assert!(report.capabilities.speech);
        assert!(!report.capabilities.deep_dive);
        assert!(!report.capabilities.web_search);
        assert!(!report.capabilities.image_fallback);
    }

    #[tokio::test]
    async fn who_are_you_never_reaches_a_provider() {
        let f = fixture();
        let req = serde_json::from_value(json!({"message": "who are you"})).unwrap();
        let Json(reply) = chat(State(f.state), Json(req)).await.unwrap();

        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"type": "text", "content": DYNAMO_IDENTITY})
        );
        assert_eq!(f.generator.calls(), 0);
        assert_eq!(f.speech.calls(), 0);
    }

    #[tokio::test]
    async fn radio_runs_one_generation_and_one_synthesis() {
        let f = fixture();
        let req = serde_json::from_value(json!({"message": "quantum computing"})).unwrap();

        let response = generate_radio(State(f.state), Json(req)).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"dynamo_ai_radio.mp3\""
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!body.is_empty());
        assert_eq!(f.generator.calls(), 1);
        assert_eq!(f.speech.calls(), 1);
        assert_eq!(std::fs::read_dir(f.audio_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn pdf_export_streams_a_document() {
        let req = serde_json::from_value(json!({
            "messages": [
                {"role": "user", "content": "<script>alert('x')</script>"},
                {"role": "assistant", "content": "That is markup."}
            ]
        }))
        .unwrap();

        let response = export_history(Path("pdf".into()), Json(req))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn export_rejects_bad_history() {
        let empty = serde_json::from_value(json!({"messages": []})).unwrap();
        let err = export_history(Path("word".into()), Json(empty)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No chat history provided");

        let missing = serde_json::from_value(json!({"messages": [{"role": "user"}]})).unwrap();
        let err = export_history(Path("word".into()), Json(missing)).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid message format");

        let valid = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        let err = export_history(Path("odt".into()), Json(valid)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn smart_presentation_has_fixed_filename() {
        let spec = serde_json::from_value(json!({
            "title": "Launch plan",
            "slides": [{"title": "Goals", "bullets": ["ship"]}]
        }))
        .unwrap();
        let document = generate_ppt_smart(Json(spec)).await.unwrap();
        assert_eq!(document.filename, "DynamoAI_Presentation.pptx");
        assert_eq!(document.mime, export::PPTX_MIME);
    }

    async fn multipart(filename: &str, content: &str) -> Multipart {
        let body = format!(
            "--BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
Content-Type: application/octet-stream\r\n\r\n{content}\r\n--BOUNDARY--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/analyze-data")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn uploaded_csv_is_analyzed() {
        let f = fixture();
        let upload = multipart("scores.csv", "name,score\nada,9\nlinus,7").await;

        let Json(result) = analyze_data(State(f.state), upload).await.unwrap();
        match result {
            AnalysisResult::Chart { columns, rows, .. } => {
                assert_eq!(columns, ["name", "score"]);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("expected chart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn uploaded_image_without_vision_is_a_notice() {
        let f = fixture();
        let upload = multipart("photo.png", "not really a png").await;

        let Json(result) = analyze_data(State(f.state), upload).await.unwrap();
        assert_eq!(
            result,
            AnalysisResult::notice(analysis::VISION_NOT_CONFIGURED)
        );
    }
}
