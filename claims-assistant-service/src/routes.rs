//! HTTP surface of the claims assistant.
//!
//! Session rules: no `session_id` starts a new conversation, a malformed
//! one is a 400, an unknown one is a 404. Both chat endpoints persist the
//! session after the turn completes.

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{
        Json,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use agent_flow::{Agent, AgentEvent, ImageSource, Session, SessionStorage};

use crate::images::{ImageAttachment, validate_attachments};
use crate::tools::session_keys;

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub session_storage: Arc<dyn SessionStorage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub images: Vec<ImageAttachment>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
}

/// Middleware to tag every request with a correlation ID span.
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .route("/session/{id}", get(get_session))
        .route("/session/{id}", delete(delete_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Claims Assistant Service",
        "version": "1.0.0",
        "description": "Conversational auto-insurance claims assistant",
        "endpoints": {
            "POST /chat": "Send a message (optionally with damage photos), get the full reply",
            "POST /chat/stream": "Same, but the reply is streamed as SSE events",
            "GET /session/{id}": "Claim progress summary for a session",
            "DELETE /session/{id}": "Discard a session",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Load or create the session per the request's `session_id`.
async fn resolve_session(
    state: &AppState,
    session_id: &Option<String>,
) -> Result<Session, ApiError> {
    match session_id {
        Some(id) => {
            if Uuid::parse_str(id).is_err() {
                return Err(bad_request_error("Invalid session ID format"));
            }
            match state.session_storage.get(id).await {
                Ok(Some(session)) => Ok(session),
                Ok(None) => Err(not_found_error("Session not found", id)),
                Err(e) => {
                    error!(session_id = %id, error = %e, "Failed to load session");
                    Err(internal_error("Failed to load session", &e.to_string()))
                }
            }
        }
        None => {
            let id = Uuid::new_v4().to_string();
            let session = Session::new(id);
            let reference = format!("CLM-{:08X}", rand::random::<u32>());
            session
                .context
                .set(session_keys::CLAIM_REFERENCE, &reference)
                .await;
            info!(session_id = %session.id, claim_reference = %reference, "Creating new session");
            Ok(session)
        }
    }
}

fn validate_images(attachments: &[ImageAttachment]) -> Result<Vec<ImageSource>, ApiError> {
    validate_attachments(attachments).map_err(|e| bad_request_error(&e))
}

/// Running total of damage photos attached over the session's lifetime.
async fn record_image_count(session: &Session, new_images: usize) {
    if new_images == 0 {
        return;
    }
    let previous: u64 = session
        .context
        .get(session_keys::IMAGES_UPLOADED)
        .await
        .unwrap_or(0);
    session
        .context
        .set(session_keys::IMAGES_UPLOADED, previous + new_images as u64)
        .await;
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let session = resolve_session(&state, &request.session_id).await?;
    let images = validate_images(&request.images)?;

    info!(
        session_id = %session.id,
        message_length = request.message.len(),
        images = images.len(),
        "Processing chat request"
    );

    record_image_count(&session, images.len()).await;

    let response = state
        .agent
        .chat(&session.context, &request.message, &images)
        .await
        .map_err(|e| {
            error!(session_id = %session.id, error = %e, "Chat turn failed");
            internal_error("Chat turn failed", &e.to_string())
        })?;

    let session_id = session.id.clone();
    if let Err(e) = state.session_storage.save(session).await {
        error!(session_id = %session_id, error = %e, "Failed to save session");
        return Err(internal_error("Failed to save session", &e.to_string()));
    }

    Ok(Json(ChatResponse {
        session_id,
        response,
    }))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = resolve_session(&state, &request.session_id).await?;
    let images = validate_images(&request.images)?;

    info!(
        session_id = %session.id,
        message_length = request.message.len(),
        images = images.len(),
        "Processing streamed chat request"
    );

    record_image_count(&session, images.len()).await;

    let session_id = session.id.clone();
    let (tx, mut rx) = mpsc::channel::<AgentEvent>(100);

    // The turn runs to completion server-side even if the client drops
    // the stream; the session is saved once the turn ends.
    let agent = state.agent.clone();
    let storage = state.session_storage.clone();
    let message = request.message;
    tokio::spawn(
        async move {
            agent.chat_stream(&session.context, message, &images, tx).await;
            if let Err(e) = storage.save(session).await {
                error!(error = %e, "Failed to save session after streamed turn");
            }
        }
        .in_current_span(),
    );

    let stream = async_stream::stream! {
        let opening = json!({ "type": "session", "session_id": session_id });
        yield Ok(Event::default().data(opening.to_string()));

        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok(Event::default().data(data)),
                Err(e) => {
                    error!(error = %e, "Failed to serialize agent event");
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let session = match state.session_storage.get(&session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(not_found_error("Session not found", &session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to load session");
            return Err(internal_error("Failed to load session", &e.to_string()));
        }
    };

    let context = &session.context;
    let images_uploaded: u64 = context
        .get(session_keys::IMAGES_UPLOADED)
        .await
        .unwrap_or(0);

    let claim_reference: Option<String> = context.get(session_keys::CLAIM_REFERENCE).await;

    Ok(Json(json!({
        "session_id": session.id,
        "claim_reference": claim_reference,
        "created_at": session.created_at.to_rfc3339(),
        "updated_at": session.updated_at.to_rfc3339(),
        "turn_count": context.user_turn_count().await,
        "has_client": context.contains_key(session_keys::CLIENT),
        "has_coverage_analysis": context.contains_key(session_keys::COVERAGE_ANALYSIS),
        "has_risk_assessment": context.contains_key(session_keys::RISK_ASSESSMENT),
        "images_uploaded": images_uploaded,
        "claim_context": context.data_snapshot(),
    })))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    match state.session_storage.get(&session_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found_error("Session not found", &session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to load session");
            return Err(internal_error("Failed to load session", &e.to_string()));
        }
    }

    if let Err(e) = state.session_storage.delete(&session_id).await {
        error!(session_id = %session_id, error = %e, "Failed to delete session");
        return Err(internal_error("Failed to delete session", &e.to_string()));
    }

    info!(session_id = %session_id, "Session deleted");
    Ok(Json(json!({ "deleted": true, "session_id": session_id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_flow::{Context, InMemorySessionStorage, LlmClient};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let client = LlmClient::new("test-key", "test-model");
        let agent = Arc::new(Agent::builder(client).system_prompt("test").build());
        let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        create_app(AppState {
            agent,
            session_storage,
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_session_id() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "session_id": "not-a-uuid", "message": "hi" }).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_rejects_unknown_session_id() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "session_id": Uuid::new_v4().to_string(),
                    "message": "hi"
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_image() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "message": "here is a photo",
                    "images": [{ "data": "not!!base64~~", "media_type": "image/png" }]
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("base64"));
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_404() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/session/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_summary_reports_progress() {
        let client = LlmClient::new("test-key", "test-model");
        let agent = Arc::new(Agent::builder(client).system_prompt("test").build());
        let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());

        let session = Session::new(Uuid::new_v4().to_string());
        let id = session.id.clone();
        session.context.add_user_message("my car was stolen").await;
        session
            .context
            .set(session_keys::CLIENT, json!({ "name": "Alice Wong" }))
            .await;
        session_storage.save(session).await.unwrap();

        let app = create_app(AppState {
            agent,
            session_storage,
        });
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/session/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["turn_count"], 1);
        assert_eq!(json["has_client"], true);
        assert_eq!(json["has_risk_assessment"], false);
        assert_eq!(json["claim_context"]["client"]["name"], "Alice Wong");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let client = LlmClient::new("test-key", "test-model");
        let agent = Arc::new(Agent::builder(client).system_prompt("test").build());
        let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());

        let session = Session::new(Uuid::new_v4().to_string());
        let id = session.id.clone();
        session_storage.save(session).await.unwrap();

        let app = create_app(AppState {
            agent,
            session_storage: session_storage.clone(),
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/session/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_storage.get(&id).await.unwrap().is_none());
    }
}
