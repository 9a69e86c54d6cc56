use fipscan::config::{DEFAULT_MAX_PARALLEL, DEFAULT_REFUSAL_MARKERS, STRICT_MODE_ENV};
use fipscan::{ScanConfig, ScanError};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_empty_document_gives_defaults() {
    let config = ScanConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ScanConfig::default());
    assert_eq!(config.max_parallel, DEFAULT_MAX_PARALLEL);
    assert_eq!(config.probe.markers.len(), DEFAULT_REFUSAL_MARKERS.len());
    assert_eq!(config.probe.env.get(STRICT_MODE_ENV).map(String::as_str), Some("1"));
}

#[test]
fn test_partial_document_overrides() {
    let config = ScanConfig::from_json_str(
        r#"{
            "max_parallel": 4,
            "excluded_prefixes": ["/proc", "/mnt/backup"],
            "probe": { "timeout": { "secs": 5, "nanos": 0 } },
            "io": { "max_file_size": 1048576 }
        }"#,
    )
    .unwrap();

    assert_eq!(config.max_parallel, 4);
    assert_eq!(
        config.excluded_prefixes,
        vec![PathBuf::from("/proc"), PathBuf::from("/mnt/backup")]
    );
    assert_eq!(config.probe.timeout, Duration::from_secs(5));
    assert_eq!(config.probe.max_stderr_bytes, 64 * 1024);
    assert_eq!(config.io.max_file_size, 1_048_576);
}

#[test]
fn test_invalid_values_are_rejected() {
    for json in [
        r#"{"max_parallel": 0}"#,
        r#"{"probe": {"timeout": {"secs": 0, "nanos": 0}}}"#,
        r#"{"probe": {"markers": []}}"#,
    ] {
        let result = ScanConfig::from_json_str(json);
        assert!(
            matches!(result, Err(ScanError::InvalidConfig(_))),
            "{json} should be rejected"
        );
    }
}

#[test]
fn test_malformed_json() {
    let err = ScanConfig::from_json_str("{ max_parallel: ").unwrap_err();
    assert!(err.to_string().contains("malformed JSON"));
}

#[test]
fn test_round_trip_through_json() {
    let config = ScanConfig::default()
        .with_max_parallel(2)
        .with_probe_timeout(Duration::from_millis(750))
        .with_excluded_prefixes(["/proc"]);
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(ScanConfig::from_json_str(&json).unwrap(), config);
}
