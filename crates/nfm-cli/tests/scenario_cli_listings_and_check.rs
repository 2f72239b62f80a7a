use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;

fn write_yaml(dir: &Path, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("{name}.yaml"));
    std::fs::write(&path, body)?;
    Ok(path)
}

fn nfm() -> anyhow::Result<std::process::Command> {
    let mut cmd = std::process::Command::cargo_bin("nfm")?;
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn cli_config_hash_is_stable_across_key_order() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let a = write_yaml(tmp.path(), "hash-a", "http:\n  request_timeout_ms: 1500\nreconcile:\n  max_active: 5\n")?;
    let b = write_yaml(tmp.path(), "hash-b", "reconcile:\n  max_active: 5\nhttp:\n  request_timeout_ms: 1500\n")?;

    let out_a = nfm()?.arg("config-hash").arg(&a).output()?;
    let out_b = nfm()?.arg("config-hash").arg(&b).output()?;
    assert!(out_a.status.success());
    assert!(out_b.status.success());

    let first_line = |out: &[u8]| {
        String::from_utf8_lossy(out)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    };
    let hash_a = first_line(&out_a.stdout);
    assert!(hash_a.starts_with("config_hash="));
    assert_eq!(hash_a, first_line(&out_b.stdout));
    Ok(())
}

#[test]
fn cli_listings_prints_reconciled_set() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start();
    let indexer = server.mock(|when, then| {
        when.method(POST).path("/graphql");
        then.status(200).json_body(json!({
            "data": {
                "allItemListeds": { "nodes": [
                    { "rindexerId": "5", "seller": "0xS", "nftAddress": "0xNFT", "tokenId": "5", "price": "50", "contractAddress": "0xM", "blockNumber": 15, "txHash": "0x5" },
                    { "rindexerId": "4", "seller": "0xS", "nftAddress": "0xNFT", "tokenId": "4", "price": "40", "contractAddress": "0xM", "blockNumber": 14, "txHash": "0x4" }
                ] },
                "allItemBoughts": { "nodes": [] },
                "allItemCanceleds": { "nodes": [ { "nftAddress": "0xNFT", "tokenId": "4" } ] }
            }
        }));
    });

    let cfg = write_yaml(
        tmp.path(),
        "listings",
        &format!("indexer:\n  endpoint: \"{}\"\n", server.url("/graphql")),
    )?;

    let out = nfm()?
        .args(["listings", "--config"])
        .arg(&cfg)
        .arg("--report")
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    indexer.assert();

    let report: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    let listings = report["listings"].as_array().cloned().unwrap_or_default();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["tokenId"], "5");
    assert_eq!(report["exclusions"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn cli_listings_fails_when_indexer_errors() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/graphql");
        then.status(502);
    });

    let cfg = write_yaml(
        tmp.path(),
        "listings-502",
        &format!("indexer:\n  endpoint: \"{}\"\n", server.url("/graphql")),
    )?;

    nfm()?
        .args(["listings", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("indexer fetch failed"));
    Ok(())
}

#[test]
fn cli_check_prints_approved_status() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start();
    let oracle = server.mock(|when, then| {
        when.method(POST)
            .path("/compliance")
            .json_body(json!({ "address": "0xOK" }));
        then.status(200).json_body(json!({ "success": true, "isApproved": true }));
    });

    let cfg = write_yaml(
        tmp.path(),
        "check-ok",
        &format!("compliance:\n  endpoint: \"{}\"\n", server.url("/compliance")),
    )?;

    nfm()?
        .args(["check", "--address", "0xOK", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("address=0xOK"))
        .stdout(predicate::str::contains("status=approved"));
    oracle.assert();
    Ok(())
}

#[test]
fn cli_check_fails_closed_on_oracle_error() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/compliance");
        then.status(500);
    });

    let cfg = write_yaml(
        tmp.path(),
        "check-500",
        &format!("compliance:\n  endpoint: \"{}\"\n", server.url("/compliance")),
    )?;

    nfm()?
        .args(["check", "--address", "0xBAD", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("status=denied"))
        .stdout(predicate::str::contains("http_status"));
    Ok(())
}

#[test]
fn cli_check_rejects_missing_api_key_env() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let cfg = write_yaml(
        tmp.path(),
        "check-secret",
        "compliance:\n  api_key_env: \"NFM_CLI_TEST_KEY_THAT_IS_NEVER_SET\"\n",
    )?;

    nfm()?
        .args(["check", "--address", "0xA", "--config"])
        .arg(&cfg)
        .env_remove("NFM_CLI_TEST_KEY_THAT_IS_NEVER_SET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"));
    Ok(())
}
