//! nfm-daemon wired from YAML against mock indexer and oracle endpoints.
//!
//! Proves `AppState::from_config` honours the configured endpoints, listed
//! limit and pending policy end to end.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use httpmock::prelude::*;
use nfm_config::{load_layered_yaml_from_strings, ResolvedSecrets};
use nfm_daemon::{routes, state};
use serde_json::json;
use tower::ServiceExt; // oneshot

fn indexer_body() -> serde_json::Value {
    json!({
        "data": {
            "allItemListeds": { "nodes": [
                { "rindexerId": "3", "seller": "0xS", "nftAddress": "0xNFT", "tokenId": "3", "price": "30", "contractAddress": "0xM ", "blockNumber": "13", "txHash": "0x3" },
                { "rindexerId": "2", "seller": "0xS", "nftAddress": "0xNFT", "tokenId": "2", "price": "20", "contractAddress": "0xM", "blockNumber": 12, "txHash": "0x2" },
                { "rindexerId": "1", "seller": "0xS", "nftAddress": "0xNFT", "tokenId": "1", "price": "10", "contractAddress": "0xM", "blockNumber": 11, "txHash": "0x1" }
            ] },
            "allItemBoughts": { "nodes": [ { "nftAddress": "0xNFT", "tokenId": "2" } ] },
            "allItemCanceleds": { "nodes": [] }
        }
    })
}

async fn call(st: &Arc<state::AppState>, req: Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let resp = routes::build_router(Arc::clone(st)).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

#[tokio::test]
async fn configured_daemon_serves_gated_listings() {
    let server = MockServer::start_async().await;
    let indexer = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/graphql")
                .body_contains("first: 7");
            then.status(200).json_body(indexer_body());
        })
        .await;
    let oracle = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/compliance")
                .json_body(json!({ "address": "0xVIEWER" }));
            then.status(200).json_body(json!({ "success": true, "isApproved": true }));
        })
        .await;

    let yaml = format!(
        "indexer:\n  endpoint: \"{}\"\n  listed_limit: 7\ncompliance:\n  endpoint: \"{}\"\n  default_before_check: hide_content\nhttp:\n  request_timeout_ms: 2000\n",
        server.url("/api/graphql"),
        server.url("/api/compliance"),
    );
    let loaded = load_layered_yaml_from_strings(&[yaml.as_str()]).unwrap();
    let st = Arc::new(state::AppState::from_config(&loaded, &ResolvedSecrets::default()).unwrap());

    let (status, health) = call(&st, get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["config_hash"], loaded.config_hash.as_str());

    let (_, listings) = call(&st, get("/v1/listings")).await;
    let ids: Vec<&str> = listings["listings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["3", "1"]);
    assert_eq!(listings["listings"][0]["contractAddress"], "0xM");
    indexer.assert_async().await;

    let req = Request::builder()
        .method("POST")
        .uri("/v1/session/address")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(json!({ "address": "0xVIEWER" }).to_string()))
        .unwrap();
    let (_, session) = call(&st, req).await;
    assert_eq!(session["status"], "pending");

    let mut rx = st.coordinator.gate().subscribe();
    rx.wait_for(|snap| snap.status.is_settled()).await.unwrap();
    oracle.assert_async().await;

    let (_, view) = call(&st, get("/v1/view")).await;
    assert_eq!(view["kind"], "listings");
    assert_eq!(view["address"], "0xVIEWER");
    assert_eq!(view["listings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_oracle_fails_closed_through_the_daemon() {
    // Port 9 (discard) is not listening on test hosts.
    let yaml = "compliance:\n  endpoint: \"http://127.0.0.1:9/api/compliance\"\nhttp:\n  request_timeout_ms: 500\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let st = Arc::new(state::AppState::from_config(&loaded, &ResolvedSecrets::default()).unwrap());

    let check = st.coordinator.set_address(Some("0xA")).unwrap();
    check.await.unwrap();

    let (_, body) = call(&st, get("/v1/compliance/0xA")).await;
    assert_eq!(body["status"], "denied");

    let (_, view) = call(&st, get("/v1/view")).await;
    assert_eq!(view["kind"], "denied");
}
