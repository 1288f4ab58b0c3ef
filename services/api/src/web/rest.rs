//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use koala_core::clusters::generate_clusters;
use koala_core::domain::{
    ChatMessage, Gender, GrammarAttempt, LangCode, Role, SpeechRequest, TextGenerationRequest,
    YesNo,
};
use koala_core::grammar::grade_attempt;
use koala_core::lesson::{lesson_audio, LessonCard, LessonType};
use koala_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Longest accepted base64 audio payload, in characters.
pub const MAX_AUDIO_CHARS: usize = 1_000_000;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        speech_url_handler,
        lesson_audio_handler,
        transcribe_handler,
        card_image_handler,
        blob_url_handler,
        chat_handler,
        grammar_handler,
        clusters_handler,
    ),
    components(
        schemas(
            SpeechUrlRequest,
            UrlResponse,
            LessonAudioRequest,
            LessonKind,
            TranscribeRequest,
            TranscribeResponse,
            CardImageRequest,
            ChatRequest,
            ChatMessagePayload,
            ChatRole,
            ChatResponse,
            UsagePayload,
            GrammarRequest,
            GrammarResponse,
            ClustersRequest,
            ClusterPayload,
            ClustersResponse,
        )
    ),
    tags(
        (
            name = "Koala API",
            description = "Cached lesson media and language tools for flash-card lessons."
        )
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SpeechUrlRequest {
    text: String,
    /// A language tag such as `ko` or `en-US`.
    lang_code: String,
    /// `F`, `M` or `N`. Anything else is treated as neutral.
    gender: String,
    /// Speaking rate in percent.
    speed: Option<u32>,
}

#[derive(Deserialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Speaking,
    Listening,
    New,
    Remedial,
}

#[derive(Deserialize, ToSchema)]
pub struct LessonAudioRequest {
    term: String,
    definition: String,
    gender: String,
    lang_code: String,
    lesson_type: LessonKind,
    /// Speaking rate in percent for the term.
    speed: Option<u32>,
}

/// A time-limited link to a stored artifact.
#[derive(Serialize, ToSchema)]
pub struct UrlResponse {
    url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TranscribeRequest {
    /// Base64 audio, optionally as a `data:` URI.
    audio: String,
    lang: String,
}

#[derive(Serialize, ToSchema)]
pub struct TranscribeResponse {
    result: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CardImageRequest {
    term: String,
    definition: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BlobUrlQuery {
    /// The storage key of a previously generated artifact.
    key: String,
}

#[derive(Deserialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatMessagePayload {
    role: ChatRole,
    content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    messages: Vec<ChatMessagePayload>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    system: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UsagePayload {
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u32,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    text: String,
    usage: UsagePayload,
}

#[derive(Deserialize, ToSchema)]
pub struct GrammarRequest {
    term: String,
    definition: String,
    lang_code: String,
    user_input: String,
}

#[derive(Serialize, ToSchema)]
pub struct GrammarResponse {
    /// `yes` when the answer is acceptable.
    yes_no: String,
    why: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ClustersRequest {
    /// Target words; only the first 120 are used.
    words: Vec<String>,
    lang_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct ClusterPayload {
    term: String,
    definition: String,
}

#[derive(Serialize, ToSchema)]
pub struct ClustersResponse {
    clusters: Vec<ClusterPayload>,
}

impl From<LessonKind> for LessonType {
    fn from(kind: LessonKind) -> Self {
        match kind {
            LessonKind::Speaking => LessonType::Speaking,
            LessonKind::Listening => LessonType::Listening,
            LessonKind::New => LessonType::New,
            LessonKind::Remedial => LessonType::Remedial,
        }
    }
}

impl From<ChatMessagePayload> for ChatMessage {
    fn from(payload: ChatMessagePayload) -> Self {
        let role = match payload.role {
            ChatRole::System => Role::System,
            ChatRole::User => Role::User,
            ChatRole::Assistant => Role::Assistant,
        };
        ChatMessage {
            role,
            content: payload.content,
        }
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn status_for(error: &PortError) -> StatusCode {
    match error {
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PortError::Producer(_)
        | PortError::EmptyArtifact(_)
        | PortError::Storage(_)
        | PortError::TranscriptionFailed(_) => StatusCode::BAD_GATEWAY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Logs a failed operation and turns it into a handler error.
fn port_failure(operation: &str, error: PortError) -> (StatusCode, String) {
    error!("Failed to {}: {}", operation, error);
    (status_for(&error), error.to_string())
}

fn bad_request(message: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Get a signed URL for lesson audio, synthesizing it only on first request.
#[utoipa::path(
    post,
    path = "/speech",
    request_body = SpeechUrlRequest,
    responses(
        (status = 200, description = "Audio is stored", body = UrlResponse),
        (status = 400, description = "Empty text"),
        (status = 502, description = "Speech synthesis or storage failed")
    )
)]
pub async fn speech_url_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SpeechUrlRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }

    let request = SpeechRequest {
        text: payload.text,
        lang_code: payload.lang_code,
        gender: Gender::parse_or_neutral(&payload.gender),
        speed: payload.speed,
    };

    let url = app_state
        .speech
        .generate_speech_url(&request)
        .await
        .map_err(|e| port_failure("generate speech", e))?;

    Ok(Json(UrlResponse {
        url: url.into_string(),
    }))
}

/// Get a signed URL for a card's lesson audio in the given lesson style.
#[utoipa::path(
    post,
    path = "/lesson-audio",
    request_body = LessonAudioRequest,
    responses(
        (status = 200, description = "Audio is stored", body = UrlResponse),
        (status = 400, description = "Empty term"),
        (status = 502, description = "Speech synthesis or storage failed")
    )
)]
pub async fn lesson_audio_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LessonAudioRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.term.trim().is_empty() {
        return Err(bad_request("term must not be empty"));
    }

    let card = LessonCard {
        term: payload.term,
        definition: payload.definition,
        gender: Gender::parse_or_neutral(&payload.gender),
        lang_code: payload.lang_code,
    };

    let url = lesson_audio(
        &app_state.speech,
        &card,
        payload.lesson_type.into(),
        payload.speed,
    )
    .await
    .map_err(|e| port_failure("generate lesson audio", e))?;

    Ok(Json(UrlResponse {
        url: url.into_string(),
    }))
}

/// Transcribe a short base64 recording.
#[utoipa::path(
    post,
    path = "/transcriptions",
    request_body = TranscribeRequest,
    responses(
        (status = 200, description = "First line of the transcript", body = TranscribeResponse),
        (status = 400, description = "Audio missing, too large or not base64"),
        (status = 502, description = "The transcription job failed"),
        (status = 504, description = "The transcription job did not finish in time")
    )
)]
pub async fn transcribe_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TranscribeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.audio.is_empty() {
        return Err(bad_request("audio must not be empty"));
    }
    if payload.audio.len() > MAX_AUDIO_CHARS {
        return Err(bad_request("audio must be at most 1000000 characters"));
    }

    let lang = LangCode::parse(&payload.lang).unwrap_or(LangCode::En);
    let result = app_state
        .transcriber
        .transcribe_b64(&payload.audio, lang)
        .await
        .map_err(|e| port_failure("transcribe audio", e))?;

    info!(%lang, chars = result.chars().count(), "Transcription returned");
    Ok(Json(TranscribeResponse { result }))
}

/// Get a signed URL for a flash card's illustration, generating it on first request.
#[utoipa::path(
    post,
    path = "/card-images",
    request_body = CardImageRequest,
    responses(
        (status = 200, description = "Image is stored", body = UrlResponse),
        (status = 400, description = "Empty term"),
        (status = 502, description = "Prompt or image generation failed")
    )
)]
pub async fn card_image_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CardImageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.term.trim().is_empty() {
        return Err(bad_request("term must not be empty"));
    }

    let url = app_state
        .card_images
        .card_image_url(&payload.term, &payload.definition)
        .await
        .map_err(|e| port_failure("create card image", e))?;

    Ok(Json(UrlResponse {
        url: url.into_string(),
    }))
}

/// Sign a fresh read URL for an already stored artifact.
#[utoipa::path(
    get,
    path = "/blobs/url",
    params(BlobUrlQuery),
    responses(
        (status = 200, description = "Signed URL", body = UrlResponse),
        (status = 400, description = "Missing key"),
        (status = 502, description = "Signing failed")
    )
)]
pub async fn blob_url_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<BlobUrlQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if query.key.is_empty() {
        return Err(bad_request("key must not be empty"));
    }

    let url = app_state
        .store
        .sign(&query.key)
        .await
        .map_err(|e| port_failure("sign blob URL", e))?;

    Ok(Json(UrlResponse {
        url: url.into_string(),
    }))
}

/// Run a free-form chat completion.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Generated text", body = ChatResponse),
        (status = 400, description = "No messages"),
        (status = 502, description = "The model call failed")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.messages.is_empty() {
        return Err(bad_request("messages must not be empty"));
    }

    let mut request =
        TextGenerationRequest::new(payload.messages.into_iter().map(ChatMessage::from).collect());
    if let Some(max_tokens) = payload.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = payload.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(system) = payload.system {
        request = request.with_system(system);
    }

    let generation = app_state
        .text
        .generate(&request)
        .await
        .map_err(|e| port_failure("generate text", e))?;

    Ok(Json(ChatResponse {
        usage: UsagePayload {
            input_tokens: generation.usage.input_tokens,
            output_tokens: generation.usage.output_tokens,
            total_tokens: generation.usage.total(),
        },
        text: generation.text,
    }))
}

/// Grade a learner's answer to a flash card.
#[utoipa::path(
    post,
    path = "/grammar",
    request_body = GrammarRequest,
    responses(
        (status = 200, description = "The verdict", body = GrammarResponse),
        (status = 502, description = "The model call failed or returned unreadable output")
    )
)]
pub async fn grammar_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<GrammarRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let attempt = GrammarAttempt {
        term: payload.term,
        definition: payload.definition,
        lang_code: payload.lang_code,
        user_input: payload.user_input,
    };

    let verdict = grade_attempt(app_state.text.as_ref(), &attempt)
        .await
        .map_err(|e| port_failure("grade answer", e))?;

    let yes_no = match verdict.yes_no {
        YesNo::Yes => "yes",
        YesNo::No => "no",
    };
    Ok((
        StatusCode::OK,
        Json(GrammarResponse {
            yes_no: yes_no.to_string(),
            why: verdict.why,
        }),
    ))
}

/// Suggest idiomatic phrases that use the given target words.
#[utoipa::path(
    post,
    path = "/clusters",
    request_body = ClustersRequest,
    responses(
        (status = 200, description = "Suggested cards, sorted by term", body = ClustersResponse),
        (status = 400, description = "Unsupported language"),
        (status = 502, description = "The model call failed or returned unreadable output")
    )
)]
pub async fn clusters_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ClustersRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lang = LangCode::parse(&payload.lang_code)
        .ok_or_else(|| bad_request("lang_code is not a supported language"))?;

    let clusters = generate_clusters(app_state.text.as_ref(), &payload.words, lang)
        .await
        .map_err(|e| port_failure("generate clusters", e))?;

    Ok(Json(ClustersResponse {
        clusters: clusters
            .into_iter()
            .map(|c| ClusterPayload {
                term: c.term,
                definition: c.definition,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::web::router;
    use crate::web::state::Ports;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use http_body_util::BodyExt;
    use koala_core::content_address::derive_key;
    use koala_core::domain::TranscriptionJobStatus;
    use koala_core::testing::{
        FakeImageGenerator, FakeSpeechSynthesis, InMemoryBlobStore, ScriptedTextClient,
        ScriptedTranscriptionJobs,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Harness {
        store: Arc<InMemoryBlobStore>,
        speech: Arc<FakeSpeechSynthesis>,
        text: Arc<ScriptedTextClient>,
        jobs: Arc<ScriptedTranscriptionJobs>,
        app: axum::Router,
    }

    fn harness(replies: &[&str], statuses: Vec<TranscriptionJobStatus>) -> Harness {
        let config = Config::from_lookup(|name| match name {
            "AWS_S3_BUCKET_NAME" => Some("koala-test".to_string()),
            "TRANSCRIBE_TIMEOUT_SECS" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(InMemoryBlobStore::new());
        let speech = Arc::new(FakeSpeechSynthesis::new(b"ID3-mp3"));
        let text = Arc::new(ScriptedTextClient::new(replies.iter().copied()));
        let jobs = Arc::new(ScriptedTranscriptionJobs::new(
            statuses,
            r#"{"results":{"transcripts":[{"transcript":"hola"}]}}"#,
        ));

        let state = AppState::new(
            Arc::new(config),
            Ports {
                store: store.clone(),
                speech: speech.clone(),
                text: text.clone(),
                images: Arc::new(FakeImageGenerator::new(b"\x89PNG")),
                transcription: jobs.clone(),
            },
        );

        Harness {
            store,
            speech,
            text,
            jobs,
            app: router(Arc::new(state)),
        }
    }

    async fn post(app: &axum::Router, path: &str, body: Value) -> Response<Body> {
        app.clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn speech_is_synthesized_once_per_key() {
        let h = harness(&[], vec![]);
        let body = json!({"text": "hello", "lang_code": "en", "gender": "F"});

        let first = post(&h.app, "/speech", body.clone()).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;
        let second = json_body(post(&h.app, "/speech", body).await).await;

        let key = derive_key("lesson-audio", &["hello", "en", "F"], "mp3");
        assert_eq!(first["url"], format!("memory://{}", key));
        assert_eq!(first, second);
        assert_eq!(h.speech.requests().len(), 1);
        assert_eq!(h.store.put_count(), 1);
    }

    #[tokio::test]
    async fn empty_speech_text_is_rejected() {
        let h = harness(&[], vec![]);
        let response = post(
            &h.app,
            "/speech",
            json!({"text": " ", "lang_code": "en", "gender": "F"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.speech.requests().is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_is_a_bad_gateway() {
        let h = harness(&[], vec![]);
        h.speech.fail(true);
        let response = post(
            &h.app,
            "/speech",
            json!({"text": "hi", "lang_code": "ko", "gender": "M"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn card_image_is_generated_from_a_prompt() {
        let h = harness(&["a koala holding an apple"], vec![]);
        let response = post(
            &h.app,
            "/card-images",
            json!({"term": "사과", "definition": "apple"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let key = derive_key("card-images", &["사과", "apple"], "png");
        assert_eq!(json_body(response).await["url"], format!("memory://{}", key));
        assert_eq!(h.text.requests().len(), 1);
    }

    #[tokio::test]
    async fn blob_url_signs_the_given_key() {
        let h = harness(&[], vec![]);
        let response = h
            .app
            .clone()
            .oneshot(
                Request::get("/blobs/url?key=card-images/v1abc.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["url"], "memory://card-images/v1abc.png");
    }

    #[tokio::test]
    async fn chat_returns_text_and_usage() {
        let h = harness(&["three word reply"], vec![]);
        let response = post(
            &h.app,
            "/chat",
            json!({
                "messages": [{"role": "user", "content": "Hi"}],
                "max_tokens": 64,
                "system": "Be brief."
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "three word reply");
        assert_eq!(body["usage"]["total_tokens"], 13);

        let sent = &h.text.requests()[0];
        assert_eq!(sent.max_tokens, 64);
        assert_eq!(sent.system.as_deref(), Some("Be brief."));
    }

    #[tokio::test]
    async fn chat_without_messages_is_rejected() {
        let h = harness(&[], vec![]);
        let response = post(&h.app, "/chat", json!({"messages": []})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn grammar_verdict_is_returned() {
        let h = harness(&[r#"{"yesNo":"no","why":"Too casual."}"#], vec![]);
        let response = post(
            &h.app,
            "/grammar",
            json!({
                "term": "밥 먹었어요?",
                "definition": "Did you eat?",
                "lang_code": "ko",
                "user_input": "밥 먹었어?"
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["yes_no"], "no");
        assert_eq!(body["why"], "Too casual.");
    }

    #[tokio::test]
    async fn unreadable_grammar_reply_is_a_bad_gateway() {
        let h = harness(&["not json"], vec![]);
        let response = post(
            &h.app,
            "/grammar",
            json!({"term": "a", "definition": "b", "lang_code": "es", "user_input": "c"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test(start_paused = true)]
    async fn transcription_returns_the_first_line() {
        let h = harness(
            &[],
            vec![
                TranscriptionJobStatus::InProgress,
                TranscriptionJobStatus::Completed {
                    transcript_uri: Some("https://transcripts/1.json".to_string()),
                },
            ],
        );
        let audio = format!("data:audio/webm;base64,{}", STANDARD.encode([1u8, 0, 2, 0]));

        let response = post(&h.app, "/transcriptions", json!({"audio": audio, "lang": "es"})).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["result"], "hola");
        assert_eq!(h.jobs.started()[0].2, "es-ES");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_transcription_is_a_gateway_timeout() {
        let h = harness(&[], vec![]);
        let audio = STANDARD.encode([1u8, 0]);

        let response = post(&h.app, "/transcriptions", json!({"audio": audio, "lang": "ko"})).await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(h.jobs.poll_count(), 3);
    }

    #[tokio::test]
    async fn oversized_or_invalid_audio_is_rejected() {
        let h = harness(&[], vec![]);

        let huge = "A".repeat(MAX_AUDIO_CHARS + 1);
        let response = post(&h.app, "/transcriptions", json!({"audio": huge, "lang": "ko"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post(&h.app, "/transcriptions", json!({"audio": "%%%", "lang": "ko"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.jobs.started().is_empty());
    }

    #[tokio::test]
    async fn lesson_audio_sends_the_listening_template() {
        let h = harness(&[], vec![]);
        let response = post(
            &h.app,
            "/lesson-audio",
            json!({
                "term": "사과 (fruit)",
                "definition": "apple",
                "gender": "F",
                "lang_code": "ko",
                "lesson_type": "listening",
                "speed": 80
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let ssml = "<speak><prosody rate=\"80%\">사과</prosody></speak>";
        let key = derive_key("lesson-audio", &[ssml, "ko", "F"], "mp3");
        assert_eq!(json_body(response).await["url"], format!("memory://{}", key));
        assert_eq!(h.speech.requests()[0].text, ssml);
    }

    #[tokio::test]
    async fn unknown_lesson_type_is_rejected() {
        let h = harness(&[], vec![]);
        let response = post(
            &h.app,
            "/lesson-audio",
            json!({
                "term": "a",
                "definition": "b",
                "gender": "F",
                "lang_code": "ko",
                "lesson_type": "dictation"
            }),
        )
        .await;
        assert!(response.status().is_client_error());
        assert!(h.speech.requests().is_empty());
    }

    #[tokio::test]
    async fn clusters_are_returned_sorted() {
        let h = harness(
            &[
                "draft",
                r#"{"clusters":[{"term":"진한 커피","definition":"Strong coffee"},
                    {"term":"결정을 내려요","definition":"Make a decision."}]}"#,
            ],
            vec![],
        );
        let response = post(
            &h.app,
            "/clusters",
            json!({"words": ["진하다", "결정"], "lang_code": "ko"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["clusters"][0]["term"], "결정을 내려요");
        assert_eq!(body["clusters"][1]["definition"], "Strong coffee");
    }

    #[tokio::test]
    async fn clusters_for_an_unsupported_language_are_rejected() {
        let h = harness(&[], vec![]);
        let response = post(
            &h.app,
            "/clusters",
            json!({"words": ["hola"], "lang_code": "xx"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.text.requests().is_empty());
    }
}
