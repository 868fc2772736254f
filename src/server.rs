use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    backup,
    config::AppConfig,
    error::ApiError,
    executor::CommandRunner,
    logs::{self, LogKind},
    openvpn, performance, security,
    status::{self, StatusSnapshot},
    wireguard,
};

/// Per-process handles shared by every request. Both are read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub runner: Arc<dyn CommandRunner>,
}

impl AppState {
    pub fn new(config: AppConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub lines: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    let api = Router::new()
        .route("/status", get(get_status))
        .route("/wireguard/peers", get(get_wireguard_peers))
        .route("/openvpn/clients", get(get_openvpn_clients))
        .route("/system/performance", get(get_performance))
        .route("/logs", get(get_logs))
        .route("/config/backup", post(post_backup))
        .route("/security/status", get(get_security))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            api.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => api,
    };
    app.layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn spawn_server(state: AppState, shutdown: CancellationToken) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "serving dashboard API");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> Json<StatusSnapshot> {
    Json(status::build_snapshot(app.runner.as_ref(), &app.config).await)
}

async fn get_wireguard_peers(
    State(app): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let interface = &app.config.services.wireguard_interface;
    let peers = wireguard::dump_peers(app.runner.as_ref(), interface)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "wg show failed");
            ApiError::Internal("Failed to get WireGuard status".to_string())
        })?;
    Ok(Json(json!({ "peers": peers })))
}

async fn get_openvpn_clients(
    State(app): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let clients = openvpn::load_clients(&app.config.paths.openvpn_status_log)
        .await
        .map_err(|e| ApiError::Internal(format!("{e:#}")))?;
    Ok(Json(json!({ "clients": clients })))
}

async fn get_performance(State(app): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = performance::collect(app.runner.as_ref(), &app.config).await?;
    Ok(Json(report))
}

async fn get_logs(
    State(app): State<AppState>,
    Query(q): Query<LogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match q.kind.as_deref() {
        Some(k) => k.parse::<LogKind>().map_err(ApiError::BadRequest)?,
        None => LogKind::default(),
    };
    let lines = match q.lines.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ApiError::BadRequest(format!("invalid lines value: {raw}")))?,
        None => logs::DEFAULT_LINES,
    }
    .min(app.config.probe.max_log_lines);
    let entries = logs::fetch(app.runner.as_ref(), &app.config, kind, lines).await;
    Ok(Json(json!({ "logs": entries })))
}

async fn post_backup(State(app): State<AppState>) -> impl IntoResponse {
    let at = OffsetDateTime::now_utc();
    match backup::create_backup(app.runner.as_ref(), &app.config.paths, at).await {
        Ok(archive) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "backup_file": archive.backup_file,
                "included": archive.included,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "configuration backup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

async fn get_security(State(app): State<AppState>) -> impl IntoResponse {
    Json(security::collect(app.runner.as_ref(), &app.config).await)
}
