use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;
use secrecy::SecretString;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use fitlog_reminders::http::{AppState, router};
use fitlog_reminders::{ReminderService, log_filter};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

fn timeout_from(raw: Option<String>) -> Duration {
    raw.and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

fn trigger_token_from(raw: Option<String>) -> Option<SecretString> {
    raw.filter(|t| !t.trim().is_empty())
        .map(|t| SecretString::new(t.trim().into()))
}

#[cfg(test)]
#[allow(clippy::items_after_test_module)]
mod tests {
    use super::*;

    #[test]
    fn timeout_falls_back_to_default() {
        assert_eq!(timeout_from(None), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(timeout_from(Some("0".into())), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(timeout_from(Some("abc".into())), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(timeout_from(Some("30".into())), Duration::from_secs(30));
    }

    #[test]
    fn blank_trigger_token_disables_auth() {
        assert!(trigger_token_from(Some("  ".into())).is_none());
        assert!(trigger_token_from(Some("abc".into())).is_some());
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let log_env = log_filter();
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "fitlog-reminders-http: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let service = match ReminderService::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };

    let trigger_token = trigger_token_from(std::env::var("FITLOG_TRIGGER_TOKEN").ok());
    if trigger_token.is_none() {
        tracing::warn!("FITLOG_TRIGGER_TOKEN not set; job triggers are unauthenticated");
    }
    let timeout = timeout_from(std::env::var("FITLOG_HTTP_TIMEOUT_SECS").ok());

    let mut state = AppState::new(service);
    state.metrics = Some(handle);
    state.trigger_token = trigger_token;

    let app = router(Arc::new(state))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = std::env::var("ADDRESS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
    info!(%addr, timeout_secs = timeout.as_secs(), "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl+c: {e}");
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
