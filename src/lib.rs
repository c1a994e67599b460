pub mod types;
pub mod config;
pub mod bracket;
pub mod teams;
pub mod snapshot;
pub mod commands;

use commands::BracketStore;
use config::{load_config_inner, load_env_file, logs_dir, resolve_repo_path};
use types::{AppConfig, DecideRequest, SharedBracket, StartRequest};

use axum::{
    extract::State as AxumState,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
    Json, Router,
};
use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── HTTP handlers ──────────────────────────────────────────────────────

async fn get_state_json(AxumState(state): AxumState<SharedBracket>) -> impl IntoResponse {
    let body = commands::get_state(&state)
        .ok()
        .and_then(|payload| serde_json::to_string(&payload).ok())
        .unwrap_or_else(|| "{}".to_string());
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
}

fn command_response<T: serde::Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err).into_response(),
    }
}

async fn post_start(
    AxumState(state): AxumState<SharedBracket>,
    Json(req): Json<StartRequest>,
) -> Response {
    command_response(commands::start_tournament(&state, req.draw_mode, req.draw_list))
}

async fn post_decide(
    AxumState(state): AxumState<SharedBracket>,
    Json(req): Json<DecideRequest>,
) -> Response {
    command_response(commands::decide_match(&state, &req.match_id, &req.winner_id))
}

async fn post_restart(AxumState(state): AxumState<SharedBracket>) -> Response {
    command_response(commands::restart_brackets(&state))
}

async fn get_save(AxumState(state): AxumState<SharedBracket>) -> Response {
    command_response(commands::export_save(&state))
}

async fn post_load(
    AxumState(state): AxumState<SharedBracket>,
    Json(save): Json<snapshot::SaveFile>,
) -> Response {
    command_response(commands::load_save(&state, save))
}

async fn post_hard_reset(AxumState(state): AxumState<SharedBracket>) -> Response {
    command_response(commands::hard_reset(&state))
}

// ── Server ─────────────────────────────────────────────────────────────

fn bracket_router(state: SharedBracket, viewer_dir: PathBuf) -> Router {
    let viewer_files = get_service(ServeDir::new(viewer_dir));

    Router::new()
        .route("/state.json", get(get_state_json))
        .route("/api/start", post(post_start))
        .route("/api/decide", post(post_decide))
        .route("/api/restart", post(post_restart))
        .route("/api/save", get(get_save))
        .route("/api/load", post(post_load))
        .route("/api/hard-reset", post(post_hard_reset))
        .nest_service("/", viewer_files)
        .with_state(state)
}

async fn start_server(state: SharedBracket, viewer_dir: PathBuf, addr: &str) {
    let app = bracket_router(state, viewer_dir);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bracket server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("bracket server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("bracket server error: {e}");
    }
}

// ── Entry point ────────────────────────────────────────────────────────

pub async fn run() {
    load_env_file();

    // Initialize tracing with file + stderr output
    let logs_dir = logs_dir();
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Bracket tool starting");

    let config = load_config_inner().unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to default config");
        AppConfig::default()
    });

    let mut store = BracketStore::from_config(&config);
    let restored = commands::restore_on_boot(&mut store, &config);
    info!(restored, "boot restore complete");
    let state: SharedBracket = Arc::new(Mutex::new(store));

    let viewer_dir = resolve_repo_path(&config.viewer_dir);
    fs::create_dir_all(&viewer_dir).ok();

    start_server(state, viewer_dir, &config.listen_addr).await;
}
