//! nfm-daemon entry point.
//!
//! Thin: loads config, sets up tracing, builds the shared state, wires
//! middleware and starts the HTTP server. Handlers live in `routes.rs`;
//! state wiring lives in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use nfm_config::{load_layered_yaml, report_unused_keys, resolve_secrets, UnusedKeyPolicy};
use nfm_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs).context("load daemon config")?;

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }

    let cfg = loaded.settings()?;
    let secrets = resolve_secrets(&cfg)?;
    let shared = Arc::new(state::AppState::from_config(&loaded, &secrets)?);

    if let Some(interval) = cfg.cache_policy().refetch_interval {
        info!(interval_ms = interval.as_millis() as u64, "interval refetch enabled");
        state::spawn_refetch_loop(Arc::clone(&shared), interval);
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_for_frontend());

    let addr: SocketAddr = match bind_addr_from_env() {
        Some(a) => a,
        None => cfg
            .daemon
            .bind
            .parse()
            .with_context(|| format!("invalid daemon.bind: {}", cfg.daemon.bind))?,
    };
    info!(config_hash = %loaded.config_hash, "nfm-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Comma-separated YAML layers in `NFM_CONFIG`; none means built-in defaults.
fn config_paths_from_env() -> Vec<String> {
    std::env::var("NFM_CONFIG")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("NFM_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Origins the marketplace frontend is served from during local development.
const FRONTEND_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// CORS restricted to the local frontend; GET for reads, POST for session and refetch.
fn cors_for_frontend() -> CorsLayer {
    let origins = FRONTEND_ORIGINS
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
