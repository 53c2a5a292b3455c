//! HTTP server for the HealthLens web UI
//!
//! Image analysis is stateless. Chat transcripts live in per-session storage,
//! created on demand and expired after inactivity.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::assets;
use super::sessions::SessionStore;
use crate::assistant::{
    render_markdown, Analysis, Assistant, AssistantError, Exchange, UploadedImage,
};
use crate::config::Config;
use crate::generation::GeminiClient;

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

pub struct Server {
    config: Config,
    assistant: Assistant,
    model: String,
}

struct AppState {
    assistant: Assistant,
    sessions: SessionStore,
    model: String,
}

impl Server {
    /// Server backed by the Gemini API for the configured profile.
    pub fn new(config: &Config) -> Result<Self> {
        let profile = config.domain_profile()?;
        let model = config.model_for(&profile);
        let client = GeminiClient::from_config(config, &profile)?;
        let assistant = Assistant::new(profile, Arc::new(client));

        Ok(Self::with_assistant(config, assistant, model))
    }

    pub fn with_assistant(config: &Config, assistant: Assistant, model: String) -> Self {
        Self {
            config: config.clone(),
            assistant,
            model,
        }
    }

    fn state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            assistant: self.assistant.clone(),
            sessions: SessionStore::new(
                self.config.server.max_sessions,
                Duration::from_secs(self.config.server.session_timeout_minutes * 60),
            ),
            model: self.model.clone(),
        })
    }

    pub fn router(&self) -> Router {
        build_router(self.state(), self.config.server.max_upload_bytes)
    }

    pub async fn run(&self) -> Result<()> {
        let state = self.state();

        // Spawn session cleanup task
        let cleanup_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                cleanup_state.sessions.cleanup_expired().await;
            }
        });

        let app = build_router(state, self.config.server.max_upload_bytes);

        let addr: SocketAddr =
            format!("{}:{}", self.config.server.bind, self.config.server.port).parse()?;

        info!(
            "Starting {} assistant on http://{} (model {})",
            self.assistant.profile().kind,
            addr,
            self.model
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/assets/{*path}", get(assets::static_asset))
        .route("/health", get(health_check))
        .route("/api/status", get(status))
        .route("/api/profile", get(profile))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", axum::routing::delete(end_session))
        .route("/api/sessions/{id}/transcript", get(transcript_json))
        .route("/api/sessions/{id}/transcript.html", get(transcript_html))
        .route("/api/analyze", post(analyze))
        .route("/api/chat", post(chat))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// Error response type
struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<AssistantError> for AppError {
    fn from(e: AssistantError) -> Self {
        let status = match &e {
            AssistantError::EmptyImage | AssistantError::EmptyQuery => StatusCode::BAD_REQUEST,
            AssistantError::UnsupportedMimeType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AssistantError::Blocked { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AssistantError::NoContent => StatusCode::BAD_GATEWAY,
            AssistantError::Generation(g) if g.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AssistantError::Generation(_) => StatusCode::BAD_GATEWAY,
        };
        AppError(status, e.to_string())
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    match assets::render_index(state.assistant.profile()) {
        Some(page) => page.into_response(),
        None => AppError(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Web UI assets missing".to_string(),
        )
        .into_response(),
    }
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// Status endpoint
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    profile: String,
    model: String,
    active_sessions: usize,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        profile: state.assistant.profile().kind.to_string(),
        model: state.model.clone(),
        active_sessions: state.sessions.len().await,
    })
}

async fn profile(State(state): State<Arc<AppState>>) -> Response {
    Json(state.assistant.profile()).into_response()
}

// Session management endpoints
#[derive(Deserialize, Default)]
struct CreateSessionRequest {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SessionResponse>, AppError> {
    // Body is optional; an empty POST starts an anonymous session
    let request: CreateSessionRequest = if body.is_empty() {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)))?
    };
    let (session_id, _) = state.sessions.get_or_create(request.session_id).await;
    Ok(Json(SessionResponse { session_id }))
}

async fn end_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.sessions.remove(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        AppError(StatusCode::NOT_FOUND, "Session not found".to_string()).into_response()
    }
}

async fn transcript_json(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(transcript) = state.sessions.get(&id).await else {
        return AppError(StatusCode::NOT_FOUND, "Session not found".to_string()).into_response();
    };
    let transcript = transcript.lock().await;
    Json(json!({ "session_id": id, "entries": &*transcript })).into_response()
}

async fn transcript_html(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(transcript) = state.sessions.get(&id).await else {
        return AppError(StatusCode::NOT_FOUND, "Session not found".to_string()).into_response();
    };
    let transcript = transcript.lock().await;
    Html(state.assistant.render_transcript(&transcript)).into_response()
}

// Image analysis endpoint
#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    analysis: Analysis,
    /// `text` rendered from Markdown, safe to insert as HTML
    html: String,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let image = read_image_field(multipart).await?;
    let analysis = state.assistant.submit_image_analysis(image).await?;
    let html = render_markdown(&analysis.text);
    Ok(Json(AnalyzeResponse { analysis, html }))
}

async fn read_image_field(mut multipart: Multipart) -> Result<UploadedImage, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError(e.status(), e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let mime_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                field
                    .file_name()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_default();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError(e.status(), e.body_text()))?;

        return Ok(UploadedImage::new(data.to_vec(), mime_type));
    }

    Err(AppError(
        StatusCode::BAD_REQUEST,
        format!("Missing '{}' field in upload", IMAGE_FIELD),
    ))
}

// Chat endpoint
#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    exchange: Exchange,
    transcript_html: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.query.is_empty() {
        return Err(AssistantError::EmptyQuery.into());
    }

    let (session_id, transcript) = state.sessions.get_or_create(request.session_id).await;

    // Held for the whole exchange: one chat in flight per session
    let mut transcript = transcript.lock().await;

    debug!("Chat [{}]: {}", session_id, request.query);

    let exchange = state
        .assistant
        .submit_chat_query(&mut transcript, &request.query)
        .await?
        .clone();

    Ok(Json(ChatResponse {
        session_id,
        exchange,
        transcript_html: state.assistant.render_transcript(&transcript),
    }))
}
