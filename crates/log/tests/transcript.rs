//! Transcript file output
//!
//! Installs the global subscriber, so this file holds a single test.

use keyshift_log::{Config, Format, LoggerBuilder, WriterConfig};

#[test]
fn test_records_are_appended_to_transcript() {
    // GIVEN: A logger writing compact records to a transcript file
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotation.log");
    let config = Config {
        level: "info".to_string(),
        format: Format::Compact,
        writer: WriterConfig::File { path: path.clone() },
        ..Config::default()
    };
    let _guard = LoggerBuilder::from_config(config)
        .run_id("test-run")
        .build()
        .expect("logger should install");

    // WHEN: Records at and below the filter level are emitted
    tracing::info!(identity = "CONTOSO\\svc_search", "Secret rotated");
    tracing::debug!("filtered out");

    // THEN: Only the info record reaches the transcript, with its span and fields
    let transcript = std::fs::read_to_string(&path).unwrap();
    assert!(transcript.contains("Secret rotated"));
    assert!(transcript.contains("svc_search"));
    assert!(transcript.contains("test-run"));
    assert!(!transcript.contains("filtered out"));
}
