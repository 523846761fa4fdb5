//! `parley-config`: runtime configuration for the Parley client.
//!
//! Provides:
//! - Typed config schema (backend, chat, generation, auth, logging)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution
//! - Config redaction for safe display
//! - Default value application and validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{
    config_dir, config_file_path, expand_home, load_config, resolve_config_path, write_config,
    CONFIG_DIR_ENV,
};
pub use redact::redact;
pub use schema::ParleyConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Environment variable that replaces `backend.baseUrl`.
pub const API_URL_ENV: &str = "PARLEY_API_URL";

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<ParleyConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    prepare(load_config(path).await?, &env)
}

/// The processing half of [`load_and_prepare`], with an explicit environment.
pub fn prepare(raw_config: ParleyConfig, env: &HashMap<String, String>) -> Result<ParleyConfig> {
    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: ParleyConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, env);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        bail!(first);
    }

    Ok(config)
}

fn apply_env_overrides(mut config: ParleyConfig, env: &HashMap<String, String>) -> ParleyConfig {
    if let Some(url) = env.get(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
        config
            .backend
            .get_or_insert_with(Default::default)
            .base_url = Some(url.trim().to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AuthConfig, BackendConfig, ChatConfig};

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn api_url_env_overrides_file() {
        let raw = ParleyConfig {
            backend: Some(BackendConfig {
                base_url: Some("http://file.local".into()),
            }),
            ..Default::default()
        };
        let cfg = prepare(raw, &env(&[(API_URL_ENV, "https://api.example.com")])).unwrap();
        assert_eq!(cfg.base_url(), Some("https://api.example.com"));
    }

    #[test]
    fn token_is_resolved_from_env() {
        let raw = ParleyConfig {
            auth: Some(AuthConfig {
                bearer_token: Some("${PARLEY_TOKEN}".into()),
            }),
            ..Default::default()
        };
        let cfg = prepare(raw, &env(&[("PARLEY_TOKEN", "secret-value")])).unwrap();
        assert_eq!(cfg.bearer_token(), Some("secret-value"));
    }

    #[test]
    fn invalid_config_fails_to_load() {
        let raw = ParleyConfig {
            chat: Some(ChatConfig {
                deadline_ms: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = prepare(raw, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("chat.deadlineMs"));
    }

    #[tokio::test]
    async fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "chat:\n  model: mistral-large\n").unwrap();

        let cfg = load_and_prepare(&path).await.unwrap();
        assert_eq!(cfg.chat.unwrap().model.as_deref(), Some("mistral-large"));
    }
}
