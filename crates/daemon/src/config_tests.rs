// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::auth::AuthMode;

const MINIMAL: &str = r#"
[service]
export_root = "/var/lib/finetuned/exports"

[auth]
mode = "debug"
"#;

fn minimal() -> DaemonConfig {
    DaemonConfig::from_toml(MINIMAL).unwrap()
}

fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn minimal_document_gets_defaults() {
    let config = minimal();
    assert_eq!(config.mode, ServiceMode::Training);
    assert_eq!(config.bind_addr, "127.0.0.1:8750");
    assert_eq!(config.engine.workers, 2);
    assert_eq!(config.engine.max_queue_depth, 256);
    assert_eq!(config.engine.retain_terminal_for, Duration::from_secs(86_400));
    assert_eq!(config.engine.cancel_grace, Duration::from_secs(30));
    assert!(config.engine.job_run_timeout.is_none());
    assert_eq!(config.engine.max_subscribers, 1024);
    assert_eq!(config.engine.subscriber_buffer, 64);
    assert!(config.search_index.is_none());
    assert!(config.feedback_path.is_none());
}

#[test]
fn full_document_parses() {
    let config = DaemonConfig::from_toml(
        r#"
[service]
mode = "dataset"
bind_addr = "0.0.0.0:9000"
export_root = "/exports"
document_root = "/documents"

[limits]
workers = 4
max_queue_depth = 32
retain_terminal_secs = 600
cancel_grace_secs = 5
job_run_timeout_secs = 3600
max_subscribers = 16
subscriber_buffer = 8

[auth]
mode = "production"
jwt_secret = "sekrit"
issuer = "https://auth.example.com"

[search]
index_path = "/indexes/corpus.jsonl"

[feedback]
path = "/feedback/queue.jsonl"
"#,
    )
    .unwrap();

    assert_eq!(config.mode, ServiceMode::Dataset);
    assert_eq!(config.engine.workers, 4);
    assert_eq!(config.engine.job_run_timeout, Some(Duration::from_secs(3600)));
    assert_eq!(config.auth_mode, AuthMode::Production);
    assert_eq!(config.issuer.as_deref(), Some("https://auth.example.com"));
    assert!(config.search_index.is_some());
    assert!(config.feedback_path.is_some());
}

#[test]
fn production_mode_requires_secret() {
    let err = DaemonConfig::from_toml(
        r#"
[service]
export_root = "/exports"

[auth]
mode = "production"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("jwt_secret"));
}

#[test]
fn zero_run_timeout_means_unbounded() {
    let config = DaemonConfig::from_toml(
        r#"
[service]
export_root = "/exports"

[limits]
job_run_timeout_secs = 0

[auth]
mode = "debug"
"#,
    )
    .unwrap();
    assert!(config.engine.job_run_timeout.is_none());
}

#[test]
fn unknown_section_field_is_rejected() {
    let err = DaemonConfig::from_toml(
        r#"
[service]
export_root = "/exports"
colour = "teal"

[auth]
mode = "debug"
"#,
    );
    assert!(err.is_err());
}

#[test]
fn bad_bind_addr_is_rejected() {
    let err = DaemonConfig::from_toml(
        r#"
[service]
export_root = "/exports"
bind_addr = "not-an-address"

[auth]
mode = "debug"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("bind_addr"));
}

#[test]
fn env_overrides_scalars() {
    let mut config = minimal();
    config
        .apply_env(
            env(&[
                ("FT_WORKERS", "8"),
                ("FT_QUEUE_DEPTH", "16"),
                ("FT_BIND_ADDR", "127.0.0.1:9999"),
                ("FT_CANCEL_GRACE_SECS", "2"),
                ("FT_RUN_TIMEOUT_SECS", "60"),
                ("FT_SERVICE", "all"),
                ("FT_AUTH_MODE", "testing"),
                ("HOME", "/root"),
            ])
            .into_iter(),
        )
        .unwrap();

    assert_eq!(config.engine.workers, 8);
    assert_eq!(config.engine.max_queue_depth, 16);
    assert_eq!(config.bind_addr, "127.0.0.1:9999");
    assert_eq!(config.engine.cancel_grace, Duration::from_secs(2));
    assert_eq!(config.engine.job_run_timeout, Some(Duration::from_secs(60)));
    assert_eq!(config.mode, ServiceMode::All);
    assert_eq!(config.auth_mode, AuthMode::Testing);
}

#[test]
fn env_override_bad_number_is_rejected() {
    let mut config = minimal();
    let err = config.apply_env(env(&[("FT_WORKERS", "plenty")]).into_iter()).unwrap_err();
    assert!(matches!(err, ConfigError::BadOverride { .. }));
}

#[test]
fn env_override_cannot_break_invariants() {
    let mut config = minimal();
    let err = config.apply_env(env(&[("FT_WORKERS", "0")]).into_iter()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "limits.workers", .. }));
}

#[test]
fn unknown_ft_variables_are_ignored() {
    let mut config = minimal();
    config
        .apply_env(env(&[("FT_SOMETHING_ELSE", "whatever")]).into_iter())
        .unwrap();
    assert_eq!(config.engine.workers, 2);
}

#[test]
fn load_missing_file_is_unreadable() {
    let err = DaemonConfig::load(std::path::Path::new("/no/such/finetuned.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Unreadable { .. }));
}
