//! REST API gateway
//!
//! Thin HTTP adapter over the orchestrator: authenticates, parses payloads,
//! calls the entry points. Timeouts live here, not in the router.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agent::Orchestrator;
use crate::config::Settings;
use crate::models::TransactionRecord;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub transaction: Option<Value>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    api_key_digest: [u8; 32],
}

fn digest(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

type ApiReply = (StatusCode, Json<Value>);

fn error_reply(status: StatusCode, message: impl Into<String>) -> ApiReply {
    (status, Json(json!({ "error": message.into() })))
}

/// =============================
/// Auth
/// =============================

async fn require_api_key(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|key| digest(key) == state.api_key_digest)
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Unauthorized request");
        error_reply(StatusCode::UNAUTHORIZED, "Unauthorized access").into_response()
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_available": state.orchestrator.model_available(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoint
/// =============================

async fn query(
    State(state): State<ApiState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiReply {
    let request_id = Uuid::new_v4();

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_reply(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let query = match req.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return error_reply(StatusCode::BAD_REQUEST, "The 'query' parameter is required"),
    };

    let transaction = match req.transaction.map(TransactionRecord::from_value).transpose() {
        Ok(tx) => tx,
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let response = state
        .orchestrator
        .handle_query(&query, transaction.as_ref())
        .instrument(info_span!("query", %request_id))
        .await;

    (StatusCode::OK, Json(json!({ "response": response })))
}

/// =============================
/// Transaction Endpoint
/// =============================

async fn predict_transaction(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiReply {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Transaction request");

    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_reply(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let transaction = match TransactionRecord::from_value(body) {
        Ok(tx) if !tx.is_empty() => tx,
        Ok(_) => return error_reply(StatusCode::BAD_REQUEST, "No input data provided"),
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.orchestrator.handle_transaction(&transaction) {
        Ok(assessment) => (StatusCode::OK, Json(assessment.to_value())),
        Err(e) if e.is_validation() => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            error!(error = %e, "Error in predict_transaction");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn not_found() -> ApiReply {
    error_reply(StatusCode::NOT_FOUND, "Not found")
}

/// =============================
/// Router
/// =============================

pub fn create_router(
    orchestrator: Arc<Orchestrator>,
    api_key: &str,
    request_timeout: Duration,
) -> Router {
    let state = ApiState {
        orchestrator,
        api_key_digest: digest(api_key),
    };

    let api = Router::new()
        .route("/query", post(query))
        .route("/predict_transaction", post(predict_transaction))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    settings: &Settings,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator, &settings.api_key, settings.request_timeout);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", settings.port);

    axum::serve(listener, router).await?;

    Ok(())
}
