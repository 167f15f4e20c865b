//! Axum router and handlers.

use crate::error::RpcError;
use crate::handlers::{
    AttachContextBody, CreateSessionBody, CreateSessionResponse, ListSessionsQuery,
    ListSessionsResponse, SessionResponse,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tahaqq_service::{CreateSessionRequest, VerificationService};
use tahaqq_types::{CountryCode, Timestamp};
use tracing::info;

/// Build the API router around a service handle.
pub fn router(service: Arc<VerificationService>, enable_metrics: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/v1/sessions", post(create_session).get(list_sessions))
        .route("/v1/sessions/:id", get(get_session))
        .route("/v1/sessions/:id/context", post(attach_context))
        .route("/v1/sessions/:id/cancel", post(cancel_session));
    if enable_metrics {
        router = router.route("/metrics", get(metrics));
    }
    router.with_state(service)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    service: Arc<VerificationService>,
    port: u16,
    enable_metrics: bool,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "verification API listening");
    axum::serve(listener, router(service, enable_metrics))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics(State(service): State<Arc<VerificationService>>) -> impl IntoResponse {
    service.metrics().encode()
}

async fn create_session(
    State(service): State<Arc<VerificationService>>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<CreateSessionResponse>, RpcError> {
    let outcome = service
        .create_session(CreateSessionRequest {
            verification_type: body.verification_type,
            country: body.country,
            return_url: body.return_url,
            client_reference: body.client_reference,
            regional_context: body.regional_context,
            device_signals: body.device_signals,
            metadata: body.metadata,
        })
        .await?;
    Ok(Json(outcome.into()))
}

async fn get_session(
    State(service): State<Arc<VerificationService>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let session = service.get_session_status(&id).await?;
    Ok(Json(SessionResponse { session }))
}

async fn attach_context(
    State(service): State<Arc<VerificationService>>,
    Path(id): Path<String>,
    Json(body): Json<AttachContextBody>,
) -> Result<Json<SessionResponse>, RpcError> {
    let session = service.attach_context(&id, body).await?;
    Ok(Json(SessionResponse { session }))
}

async fn cancel_session(
    State(service): State<Arc<VerificationService>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let session = service.cancel_session(&id)?;
    Ok(Json(SessionResponse { session }))
}

async fn list_sessions(
    State(service): State<Arc<VerificationService>>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<(StatusCode, Json<ListSessionsResponse>), RpcError> {
    let sessions = service.list_sessions(
        &CountryCode::parse(&query.country),
        Timestamp::new(query.from),
        Timestamp::new(query.to),
    )?;
    Ok((StatusCode::OK, Json(ListSessionsResponse { sessions })))
}
