use axum::{
    routing::{get, post, put},
    Router,
    Json,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{Html, IntoResponse, Response},
    http::{header, StatusCode},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::{RagSettings, SettingsPatch};
use crate::session::{
    ChatMessage, ChatExport, ProcessOutcome, RagServices, SessionError, SessionStats,
    SessionStore, SourceRef, UploadedFile,
};

/// Upload ceiling per request.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub services: RagServices,
    pub defaults: RagSettings,
}

impl AppState {
    pub fn new(services: RagServices, defaults: RagSettings) -> Self {
        Self {
            sessions: SessionStore::new(),
            services,
            defaults,
        }
    }

    fn allowed_models(&self) -> Vec<String> {
        self.services.factory.available_models()
    }
}

#[derive(Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    answer: String,
    sources: Vec<SourceRef>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    session_id: Uuid,
    stats: SessionStats,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    status: String,
    #[serde(flatten)]
    outcome: ProcessOutcome,
}

#[derive(Serialize)]
pub struct FilesResponse {
    files: Vec<String>,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiResponse>)>;

fn api_error(e: SessionError) -> (StatusCode, Json<ApiResponse>) {
    let status = match &e {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::NoDocuments => StatusCode::CONFLICT,
        SessionError::MissingApiKey
        | SessionError::InvalidInput(_)
        | SessionError::UnsupportedFile(_)
        | SessionError::NothingToExport => StatusCode::BAD_REQUEST,
        SessionError::Processing(_) | SessionError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("{}", e);
    } else {
        warn!("{}", e);
    }

    (status, Json(ApiResponse { status: e.to_string() }))
}

/// Create and configure the API router
pub fn create_api(state: AppState) -> Router {
    // Fully permissive CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/settings", put(update_settings))
        .route(
            "/api/sessions/:id/files",
            post(upload_files)
                .get(list_files)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/sessions/:id/chat", post(chat_handler))
        .route("/api/sessions/:id/messages", get(list_messages).delete(clear_messages))
        .route("/api/sessions/:id/export", get(export_history))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string()
    }).into_response()
}

async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<SessionResponse> {
    let mut settings = state.defaults.clone();

    // Only an empty body means "use the defaults"
    if !body.iter().all(u8::is_ascii_whitespace) {
        let patch: SettingsPatch = serde_json::from_slice(&body)
            .map_err(|e| api_error(SessionError::InvalidInput(format!("Invalid settings: {}", e))))?;
        settings
            .apply(patch, &state.allowed_models())
            .map_err(|e| api_error(SessionError::InvalidInput(e)))?;
    }

    let (session_id, session) = state.sessions.create(settings);
    let stats = session.lock().await.stats();
    info!(session = %session_id, "Session created");

    Ok(Json(SessionResponse { session_id, stats }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionResponse> {
    let session = state.sessions.get(id).map_err(api_error)?;
    let stats = session.lock().await.stats();
    Ok(Json(SessionResponse { session_id: id, stats }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse> {
    let session = state.sessions.remove(id).map_err(api_error)?;
    session.lock().await.close().await;
    info!(session = %id, "Session closed");
    Ok(Json(ApiResponse { status: "Session deleted".to_string() }))
}

async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SettingsPatch>,
) -> ApiResult<SessionResponse> {
    let session = state.sessions.get(id).map_err(api_error)?;
    let mut session = session.lock().await;
    session
        .update_settings(patch, &state.allowed_models())
        .map_err(api_error)?;
    Ok(Json(SessionResponse { session_id: id, stats: session.stats() }))
}

async fn upload_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<ProcessResponse> {
    let session = state.sessions.get(id).map_err(api_error)?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(SessionError::InvalidInput(format!("Invalid upload: {}", e))))?
    {
        // Form fields without a file name are not uploads
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| api_error(SessionError::InvalidInput(format!("Invalid upload: {}", e))))?;
        uploads.push(UploadedFile { name, data: data.to_vec() });
    }

    info!(session = %id, files = uploads.len(), "Processing uploaded files");
    let outcome = session
        .lock()
        .await
        .process_files(&state.services, uploads)
        .await
        .map_err(api_error)?;

    Ok(Json(ProcessResponse {
        status: outcome.summary(),
        outcome,
    }))
}

async fn list_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<FilesResponse> {
    let session = state.sessions.get(id).map_err(api_error)?;
    let files = session.lock().await.processed_files().to_vec();
    Ok(Json(FilesResponse { files }))
}

async fn chat_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    request
        .validate()
        .map_err(|e| api_error(SessionError::InvalidInput(format!("Invalid message: {}", e))))?;

    let session = state.sessions.get(id).map_err(api_error)?;
    let reply = session
        .lock()
        .await
        .ask(&request.message)
        .await
        .map_err(api_error)?;

    Ok(Json(ChatResponse {
        answer: reply.content,
        sources: reply.sources.unwrap_or_default(),
    }))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MessagesResponse> {
    let session = state.sessions.get(id).map_err(api_error)?;
    let messages = session.lock().await.messages().to_vec();
    Ok(Json(MessagesResponse { messages }))
}

async fn clear_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse> {
    let session = state.sessions.get(id).map_err(api_error)?;
    session.lock().await.clear_history();
    Ok(Json(ApiResponse { status: "Chat history cleared".to_string() }))
}

async fn export_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    let session = match state.sessions.get(id) {
        Ok(session) => session,
        Err(e) => return api_error(e).into_response(),
    };

    let now = Local::now().naive_local();
    let export = match session.lock().await.export(now) {
        Ok(export) => export,
        Err(e) => return api_error(e).into_response(),
    };

    match export.to_json() {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", ChatExport::file_name(now)),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => api_error(SessionError::Processing(e.to_string())).into_response(),
    }
}
