//! Config validation: checks a defaulted config before anything uses it.

use crate::schema::ParleyConfig;
use thiserror::Error;
use url::Url;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &ParleyConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_backend(config, &mut report);
    validate_chat(config, &mut report);
    validate_generation(config, &mut report);
    validate_deadline_order(config, &mut report);
    report
}

fn validate_backend(config: &ParleyConfig, report: &mut ValidationReport) {
    let Some(base_url) = config.base_url() else { return };
    match Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => report.error(
            "backend.baseUrl",
            format!("Unsupported scheme '{}'; use http or https", url.scheme()),
        ),
        Err(e) => report.error("backend.baseUrl", format!("'{base_url}' is not a valid URL: {e}")),
    }
}

fn validate_path(path: Option<&str>, field: &str, report: &mut ValidationReport) {
    if let Some(path) = path {
        if !path.starts_with('/') {
            report.error(field, format!("Path '{path}' must start with '/'"));
        }
    }
}

fn validate_chat(config: &ParleyConfig, report: &mut ValidationReport) {
    let Some(chat) = &config.chat else { return };
    validate_path(chat.path.as_deref(), "chat.path", report);
    if chat.deadline_ms == Some(0) {
        report.error("chat.deadlineMs", "deadlineMs must be > 0");
    }
    if let Some(model) = &chat.model {
        if model.trim().is_empty() {
            report.error("chat.model", "Model name cannot be empty");
        }
    }
}

fn validate_generation(config: &ParleyConfig, report: &mut ValidationReport) {
    let Some(generation) = &config.generation else { return };
    validate_path(generation.path.as_deref(), "generation.path", report);
    if generation.deadline_ms == Some(0) {
        report.error("generation.deadlineMs", "deadlineMs must be > 0");
    }
    if generation.forward_credential == Some(true) && config.bearer_token().is_none() {
        report.warn(
            "generation.forwardCredential",
            "Credential forwarding is on but auth.bearerToken is not set",
        );
    }
}

fn validate_deadline_order(config: &ParleyConfig, report: &mut ValidationReport) {
    let chat = config.chat.as_ref().and_then(|c| c.deadline_ms);
    let generation = config.generation.as_ref().and_then(|g| g.deadline_ms);
    if let (Some(chat), Some(generation)) = (chat, generation) {
        if chat > 0 && chat >= generation {
            report.warn(
                "chat.deadlineMs",
                format!("Chat deadline ({chat} ms) is not shorter than the generation deadline ({generation} ms)"),
            );
        }
    }
}
