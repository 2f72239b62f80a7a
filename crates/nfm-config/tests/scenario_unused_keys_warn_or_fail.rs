use nfm_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// scenario_unused_keys_warn_or_fail
///
/// 1) Misspelled keys are reported in Warn mode without error.
/// 2) The same keys fail in Fail mode.
/// 3) Every key the typed settings read is registered as consumed.

const FULL_YAML: &str = r#"
indexer:
  endpoint: "http://127.0.0.1:3000/api/graphql"
  listed_limit: 20
  terminal_page_size: 500
compliance:
  endpoint: "http://127.0.0.1:3000/api/compliance"
  api_key_env: "MARKET_COMPLIANCE_KEY"
  default_before_check: "denied"
  check_timeout_ms: 5000
http:
  request_timeout_ms: 10000
reconcile:
  max_active: 100
cache:
  stale_after_ms: 0
  refetch_interval_ms: 30000
daemon:
  bind: "127.0.0.1:8899"
"#;

#[test]
fn full_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("every documented key must be consumed");
    assert!(report.is_clean());

    // And every key parses into the typed settings.
    let cfg = loaded.settings().unwrap();
    assert_eq!(cfg.indexer.terminal_page_size, Some(500));
    assert_eq!(cfg.compliance.check_timeout_ms, Some(5000));
}

#[test]
fn warn_mode_reports_typos_without_error() {
    let yaml = r#"
cache:
  stale_afer_ms: 60000
indexer:
  listed_limit: 20
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(report.unused_leaf_pointers, vec!["/cache/stale_afer_ms".to_string()]);
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = "unused_section:\n  foo: 1\n  bar: 2\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("2 unused"), "got: {err}");
}

#[test]
fn unused_pointers_are_sorted() {
    let yaml = "zeta: 1\nalpha: 2\nmid:\n  b: 1\n  a: 2\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/alpha", "/mid/a", "/mid/b", "/zeta"]
    );
}
