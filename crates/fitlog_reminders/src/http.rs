//! HTTP trigger surface for the reminder jobs.

use std::sync::Arc;

use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::{JobReport, ReminderError, ReminderJob, ReminderService};

pub struct AppState {
    pub service: ReminderService,
    pub metrics: Option<PrometheusHandle>,
    /// When set, `POST /functions/{job}` requires `Authorization: Bearer <token>`.
    pub trigger_token: Option<SecretString>,
    pub clock: fn() -> NaiveDate,
}

impl AppState {
    pub fn new(service: ReminderService) -> Self {
        Self {
            service,
            metrics: None,
            trigger_token: None,
            clock: fitlog_client::dates::today_local,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/functions/{job}", post(trigger))
        .with_state(state)
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.as_ref().map(|m| m.render()).unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn trigger(
    State(state): State<Arc<AppState>>,
    Path(job): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JobReport>, (StatusCode, Json<Value>)> {
    authorize(state.trigger_token.as_ref(), &headers).map_err(map_err)?;
    let job: ReminderJob = job.parse().map_err(map_err)?;
    let today = (state.clock)();
    state.service.run(job, today).await.map(Json).map_err(map_err)
}

fn authorize(expected: Option<&SecretString>, headers: &HeaderMap) -> Result<(), ReminderError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match supplied {
        Some(token) if token == expected.expose_secret() => Ok(()),
        _ => Err(ReminderError::Unauthorized),
    }
}

fn map_err(e: ReminderError) -> (StatusCode, Json<Value>) {
    let status = match e {
        ReminderError::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": e.to_string() })))
}
