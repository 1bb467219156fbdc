//! HTTP transport for the webhook orchestrator.
//!
//! A thin axum layer: parse and validate the body, classify the event,
//! hand it to the router, and serialize the decision back. Malformed
//! JSON is rejected before any side effect. Internal failures are caught
//! at this level: logged with the full error chain, reported through the
//! notification gateway, and echoed to the caller with diagnostic detail
//! only outside production.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::dispatch::{DispatchResult, Dispatcher, WorkflowDispatcher};
use crate::event::{StageEvent, WebhookEnvelope};
use crate::notify::{NotificationGateway, Notifier, Severity};
use crate::router::EventRouter;
use crate::stage::StageId;

/// Shared application state; everything in here is immutable or
/// internally synchronized, safe for unrestricted concurrent reads.
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub router: EventRouter,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub notifier: Arc<dyn Notifier>,
}

pub type SharedState = Arc<AppState>;

/// Build application state with the real outbound adapters.
pub fn build_state(config: RelayConfig) -> SharedState {
    let config = Arc::new(config);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(WorkflowDispatcher::new(
        config.github_owner.clone(),
        config.github_token.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(NotificationGateway::new(
        config.slack_webhook_url.clone(),
        config.notification_email.clone(),
    ));
    state_with(config, dispatcher, notifier)
}

/// State with explicit adapters; tests inject recording doubles here.
pub fn state_with(
    config: Arc<RelayConfig>,
    dispatcher: Arc<dyn Dispatcher>,
    notifier: Arc<dyn Notifier>,
) -> SharedState {
    let router = EventRouter::new(config.clone(), dispatcher.clone(), notifier.clone());
    Arc::new(AppState {
        config,
        router,
        dispatcher,
        notifier,
    })
}

/// Build the application router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(handle_webhook))
        .route("/health", get(health_check))
        .route("/automation", post(handle_automation))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Start the webhook server and run until interrupted.
pub async fn start_server(config: RelayConfig) -> Result<()> {
    let state = build_state(config);
    let addr = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    info!(
        addr = %local_addr,
        project = %state.config.project_name,
        environment = %state.config.environment,
        "relay webhook server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("shutting down");
}

// ── Handlers ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    project: String,
    environment: String,
    timestamp: DateTime<Utc>,
}

async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        project: state.config.project_name.clone(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now(),
    })
}

async fn handle_webhook(State(state): State<SharedState>, body: Bytes) -> Response {
    let delivery = Uuid::new_v4();
    info!(%delivery, project = %state.config.project_name, "webhook received");

    if body.is_empty() {
        return client_error("Empty request body");
    }
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            error!(%delivery, error = %err, "failed to parse webhook JSON");
            return client_error("Invalid JSON");
        }
    };
    info!(%delivery, kind = %envelope.kind, action = %envelope.action, "event received");

    let event = match StageEvent::classify(envelope) {
        Ok(event) => event,
        Err(err) => {
            error!(%delivery, error = %err, "rejecting malformed event payload");
            return client_error(&err.to_string());
        }
    };

    match state.router.route(event).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => internal_error(&state, &body, err).await,
    }
}

#[derive(Deserialize)]
struct AutomationRequest {
    #[serde(default)]
    action: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Default, Deserialize)]
struct TriggerStagePayload {
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    project_name: Option<String>,
}

/// Manual automation surface: the same dispatcher the webhook path uses,
/// driven by an explicit `{action, payload}` request.
async fn handle_automation(State(state): State<SharedState>, body: Bytes) -> Response {
    let request: AutomationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            error!(error = %err, "failed to parse automation request");
            return client_error("Invalid JSON");
        }
    };
    info!(action = %request.action, "automation request");

    match request.action.as_str() {
        "trigger_stage" => trigger_stage(&state, request.payload).await,
        "sync_status" => {
            // Reserved for tracker/CI status reconciliation.
            (
                StatusCode::OK,
                Json(serde_json::json!({"status": "sync_complete"})),
            )
                .into_response()
        }
        other => client_error(&format!("unknown action: {}", other)),
    }
}

async fn trigger_stage(state: &AppState, payload: Value) -> Response {
    let payload = if payload.is_null() {
        TriggerStagePayload::default()
    } else {
        match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(err) => return client_error(&format!("malformed payload: {}", err)),
        }
    };

    let Some(token) = payload.stage else {
        return client_error("stage required");
    };
    let stage: StageId = match token.parse() {
        Ok(stage) => stage,
        Err(err) => return client_error(&err.to_string()),
    };
    let project = payload
        .project_name
        .unwrap_or_else(|| state.config.project_name.clone());

    match state.dispatcher.trigger(&project, stage, None).await {
        DispatchResult::Ok => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "triggered", "stage": stage})),
        )
            .into_response(),
        DispatchResult::Failed { reason } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "dispatch_failed", "details": reason})),
        )
            .into_response(),
    }
}

// ── Error responses ───────────────────────────────────────────────────

fn client_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message})),
    )
        .into_response()
}

/// Top-level catch for unexpected failures: log everything server-side,
/// send a best-effort error notification with a payload excerpt, and
/// echo diagnostic detail only outside production.
async fn internal_error(state: &AppState, payload: &[u8], err: anyhow::Error) -> Response {
    error!(error = ?err, "error processing webhook");

    let excerpt: String = String::from_utf8_lossy(payload).chars().take(500).collect();
    let message = format!(
        "Error: {:#}\nTimestamp: {}\nEnvironment: {}\n\nEvent payload (excerpt):\n{}",
        err,
        Utc::now().to_rfc3339(),
        state.config.environment,
        excerpt
    );
    state
        .notifier
        .notify(
            &format!("Error in pipeline {}", state.config.project_name),
            &message,
            Severity::Error,
        )
        .await;

    let body = if state.config.is_production() {
        serde_json::json!({"error": "internal error"})
    } else {
        serde_json::json!({"error": "internal error", "detail": format!("{:#}", err)})
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
