// tests/config_file.rs
use std::path::Path;

use trendforge::config::AppConfig;
use trendforge::PipelineError;

#[test]
fn shipped_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/trendforge.toml");
    let cfg = AppConfig::load_from(&path).expect("shipped config");
    assert_eq!(cfg.filter.daily_limit, 10);
    assert!((cfg.filter.weight_for("HackerNews") - 1.2).abs() < 1e-12);
    assert!((cfg.filter.threshold_for("reddit") - 500.0).abs() < 1e-12);
    assert!(cfg.filter.keywords().contains(&"machine learning".to_string()));
    assert_eq!(cfg.generation.provider, "mock");
    assert_eq!(cfg.storage.track_paths, vec!["content/", "data/"]);
}

#[test]
fn unreadable_path_is_a_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = AppConfig::load_from(&tmp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, PipelineError::Config { .. }));
}

#[test]
fn malformed_file_is_a_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("bad.toml");
    std::fs::write(&p, "[dedup]\nsimilarity_threshold = \"high\"\n").unwrap();
    let err = AppConfig::load_from(&p).unwrap_err();
    match err {
        PipelineError::Config { path, reason } => {
            assert_eq!(path, p);
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}
