//! Axum router and all HTTP handlers for nfm-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers, so tests can drive the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use nfm_compliance::GateSnapshot;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::{
    api_types::{ComplianceStatusResponse, HealthResponse, SessionResponse, SetAddressRequest},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/session/address", post(set_address))
        .route("/v1/compliance/:address", get(compliance_status))
        .route("/v1/listings", get(listings))
        .route("/v1/listings/refetch", post(refetch_listings))
        .route("/v1/view", get(view))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/session/address
// ---------------------------------------------------------------------------

/// Record the viewer's wallet. A changed, non-empty address starts one
/// compliance check in the background; the response does not wait for it.
pub(crate) async fn set_address(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SetAddressRequest>,
) -> impl IntoResponse {
    let check = st.coordinator.set_address(req.address.as_deref());
    let snap = st.coordinator.gate().snapshot();

    info!(
        address = snap.address.as_deref().unwrap_or(""),
        check_issued = check.is_some(),
        status = %snap.effective,
        "session/address"
    );

    (
        StatusCode::OK,
        Json(SessionResponse {
            address: snap.address,
            status: snap.effective,
            check_issued: check.is_some(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/compliance/:address
// ---------------------------------------------------------------------------

pub(crate) async fn compliance_status(
    State(st): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let status = st.coordinator.compliance_status(&address);
    (
        StatusCode::OK,
        Json(ComplianceStatusResponse { address, status }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/listings   POST /v1/listings/refetch
// ---------------------------------------------------------------------------

/// Fetch failures are reported inside the body (`error`) alongside the last
/// good listings, so this route always answers 200.
pub(crate) async fn listings(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(st.coordinator.active_listings().await))
}

pub(crate) async fn refetch_listings(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let view = st.coordinator.listings().refetch().await;
    info!(
        listings = view.listings.len(),
        error = view.error.as_ref().map(|e| e.kind()),
        "listings/refetch"
    );
    (StatusCode::OK, Json(view))
}

// ---------------------------------------------------------------------------
// GET /v1/view
// ---------------------------------------------------------------------------

pub(crate) async fn view(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(st.coordinator.load_view().await))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

/// One `compliance` event with the current gate snapshot, then one per
/// transition.
pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let events = watch_to_sse(st.coordinator.gate().subscribe());

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn watch_to_sse(
    rx: watch::Receiver<GateSnapshot>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    WatchStream::new(rx).filter_map(|snap| async move {
        let data = serde_json::to_string(&snap).ok()?;
        Some(Ok(Event::default().event("compliance").data(data)))
    })
}
