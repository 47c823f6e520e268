// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: one TOML document plus flat `FT_*` env overrides.
//!
//! The document is loaded once at startup and validated in full; changing
//! any of it requires a restart. Every scalar is overridable from the
//! environment, with env taking precedence over the file.

use ft_core::Role;
use ft_engine::EngineConfig;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Env override prefix: `FT_WORKERS`, `FT_BIND_ADDR`, and friends.
pub const ENV_PREFIX: &str = "FT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{path}' unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config field '{field}': {message}")]
    Invalid { field: &'static str, message: String },

    #[error("invalid env override '{var}': {message}")]
    BadOverride { var: String, message: String },
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, message: message.into() }
}

/// Which trainer kinds this deployment serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// LoRA, QLoRA, and continuous kinds.
    Training,
    /// Dataset assembly only.
    Dataset,
    /// Everything; single-process deployments and tests.
    All,
}

impl ServiceMode {
    pub fn parse(s: &str) -> Option<ServiceMode> {
        match s {
            "training" => Some(ServiceMode::Training),
            "dataset" => Some(ServiceMode::Dataset),
            "all" => Some(ServiceMode::All),
            _ => None,
        }
    }
}

ft_core::simple_display! {
    ServiceMode {
        Training => "training",
        Dataset => "dataset",
        All => "all",
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceSection {
    #[serde(default = "default_mode")]
    mode: ServiceMode,
    #[serde(default = "default_bind_addr")]
    bind_addr: String,
    export_root: PathBuf,
    #[serde(default)]
    document_root: Option<PathBuf>,
}

fn default_mode() -> ServiceMode {
    ServiceMode::Training
}

fn default_bind_addr() -> String {
    "127.0.0.1:8750".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LimitsSection {
    workers: Option<usize>,
    max_queue_depth: Option<usize>,
    retain_terminal_secs: Option<u64>,
    cancel_grace_secs: Option<u64>,
    job_run_timeout_secs: Option<u64>,
    max_subscribers: Option<usize>,
    subscriber_buffer: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthSection {
    #[serde(default = "default_auth_mode")]
    mode: String,
    #[serde(default)]
    jwt_secret: Option<String>,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default = "default_mock_roles")]
    mock_roles: Vec<String>,
}

fn default_auth_mode() -> String {
    "production".to_string()
}

fn default_mock_roles() -> Vec<String> {
    vec!["admin".to_string(), "trainer".to_string(), "analyst".to_string()]
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            jwt_secret: None,
            issuer: None,
            mock_roles: default_mock_roles(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchSection {
    index_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeedbackSection {
    path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    service: ServiceSection,
    #[serde(default)]
    limits: LimitsSection,
    #[serde(default)]
    auth: AuthSection,
    #[serde(default)]
    search: Option<SearchSection>,
    #[serde(default)]
    feedback: Option<FeedbackSection>,
}

/// Fully validated daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub mode: ServiceMode,
    pub bind_addr: String,
    pub export_root: PathBuf,
    pub document_root: Option<PathBuf>,
    pub engine: EngineConfig,
    pub auth_mode: crate::auth::AuthMode,
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub mock_roles: BTreeSet<Role>,
    pub search_index: Option<PathBuf>,
    pub feedback_path: Option<PathBuf>,
}

impl DaemonConfig {
    /// Load from a TOML file, then apply overrides from the process
    /// environment.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(raw)?;

        let auth_mode = crate::auth::AuthMode::parse(&raw.auth.mode)
            .ok_or_else(|| invalid("auth.mode", format!("unknown mode '{}'", raw.auth.mode)))?;

        let mut mock_roles = BTreeSet::new();
        for name in &raw.auth.mock_roles {
            let role = Role::parse(name)
                .ok_or_else(|| invalid("auth.mock_roles", format!("unknown role '{}'", name)))?;
            mock_roles.insert(role);
        }

        let defaults = EngineConfig::default();
        let limits = raw.limits;
        let engine = EngineConfig {
            workers: limits.workers.unwrap_or(defaults.workers),
            max_queue_depth: limits.max_queue_depth.unwrap_or(defaults.max_queue_depth),
            retain_terminal_for: limits
                .retain_terminal_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.retain_terminal_for),
            cancel_grace: limits
                .cancel_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cancel_grace),
            job_run_timeout: limits
                .job_run_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_subscribers: limits.max_subscribers.unwrap_or(defaults.max_subscribers),
            subscriber_buffer: limits.subscriber_buffer.unwrap_or(defaults.subscriber_buffer),
        };

        let config = Self {
            mode: raw.service.mode,
            bind_addr: raw.service.bind_addr,
            export_root: raw.service.export_root,
            document_root: raw.service.document_root,
            engine,
            auth_mode,
            jwt_secret: raw.auth.jwt_secret,
            issuer: raw.auth.issuer,
            mock_roles,
            search_index: raw.search.map(|s| s.index_path),
            feedback_path: raw.feedback.map(|f| f.path),
        };
        config.check()?;
        Ok(config)
    }

    /// Apply `FT_*` overrides; env wins over the file.
    pub fn apply_env(
        &mut self,
        vars: impl Iterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let bad = |message: String| ConfigError::BadOverride {
                var: key.clone(),
                message,
            };
            match field {
                "SERVICE" => {
                    self.mode = ServiceMode::parse(&value)
                        .ok_or_else(|| bad(format!("unknown service mode '{}'", value)))?;
                }
                "BIND_ADDR" => self.bind_addr = value,
                "EXPORT_ROOT" => self.export_root = PathBuf::from(value),
                "DOCUMENT_ROOT" => self.document_root = Some(PathBuf::from(value)),
                "WORKERS" => self.engine.workers = parse_num(&value).map_err(bad)?,
                "QUEUE_DEPTH" => self.engine.max_queue_depth = parse_num(&value).map_err(bad)?,
                "RETAIN_TERMINAL_SECS" => {
                    self.engine.retain_terminal_for =
                        Duration::from_secs(parse_num(&value).map_err(bad)?);
                }
                "CANCEL_GRACE_SECS" => {
                    self.engine.cancel_grace =
                        Duration::from_secs(parse_num(&value).map_err(bad)?);
                }
                "RUN_TIMEOUT_SECS" => {
                    let secs: u64 = parse_num(&value).map_err(bad)?;
                    self.engine.job_run_timeout =
                        (secs > 0).then(|| Duration::from_secs(secs));
                }
                "MAX_SUBSCRIBERS" => {
                    self.engine.max_subscribers = parse_num(&value).map_err(bad)?;
                }
                "SUBSCRIBER_BUFFER" => {
                    self.engine.subscriber_buffer = parse_num(&value).map_err(bad)?;
                }
                "AUTH_MODE" => {
                    self.auth_mode = crate::auth::AuthMode::parse(&value)
                        .ok_or_else(|| bad(format!("unknown auth mode '{}'", value)))?;
                }
                "JWT_SECRET" => self.jwt_secret = Some(value),
                "ISSUER" => self.issuer = Some(value),
                "SEARCH_INDEX" => self.search_index = Some(PathBuf::from(value)),
                "FEEDBACK_PATH" => self.feedback_path = Some(PathBuf::from(value)),
                // Unknown FT_ variables are ignored; other tools own them.
                _ => {}
            }
        }
        self.check()
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.engine.workers == 0 {
            return Err(invalid("limits.workers", "must be at least 1"));
        }
        if self.engine.max_queue_depth == 0 {
            return Err(invalid("limits.max_queue_depth", "must be at least 1"));
        }
        if self.engine.subscriber_buffer == 0 {
            return Err(invalid("limits.subscriber_buffer", "must be at least 1"));
        }
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid(
                "service.bind_addr",
                format!("'{}' is not a socket address", self.bind_addr),
            ));
        }
        if self.auth_mode == crate::auth::AuthMode::Production && self.jwt_secret.is_none() {
            return Err(invalid(
                "auth.jwt_secret",
                "required when auth.mode is 'production'",
            ));
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value.parse().map_err(|_| format!("'{}' is not a number", value))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
