//! Runtime wiring: turns a prepared [`ParleyConfig`] into session settings,
//! a transport, and logger options.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;

use parley_config::defaults::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_DEADLINE_MS, DEFAULT_GENERATION_DEADLINE_MS, DEFAULT_LOG_LEVEL,
};
use parley_config::{expand_home, ParleyConfig};
use parley_core::{Credential, Transport};
use parley_logging::LoggerOptions;
use parley_session::{ChatSettings, GenerationSettings, SessionSettings};
use parley_transport::{HttpTransport, ScriptedReply, ScriptedTransport};

/// Map config sections onto session settings. Unset fields keep session defaults.
pub fn session_settings(config: &ParleyConfig) -> SessionSettings {
    let mut chat = ChatSettings::default();
    if let Some(section) = &config.chat {
        if let Some(path) = &section.path {
            chat.path = path.clone();
        }
        if let Some(model) = &section.model {
            chat.model = model.clone();
        }
        chat.deadline =
            Duration::from_millis(section.deadline_ms.unwrap_or(DEFAULT_CHAT_DEADLINE_MS));
        if let Some(greeting) = &section.greeting {
            chat.greeting = Some(greeting.clone()).filter(|g| !g.trim().is_empty());
        }
    }

    let mut generation = GenerationSettings::default();
    if let Some(section) = &config.generation {
        if let Some(path) = &section.path {
            generation.path = path.clone();
        }
        generation.deadline =
            Duration::from_millis(section.deadline_ms.unwrap_or(DEFAULT_GENERATION_DEADLINE_MS));
        generation.forward_credential = section.forward_credential.unwrap_or(false);
    }

    SessionSettings { chat, generation }
}

pub fn credential(config: &ParleyConfig) -> Option<Credential> {
    config.bearer_token().map(Credential::new)
}

/// The HTTP transport, or canned replies when running offline.
pub fn build_transport(
    config: &ParleyConfig,
    settings: &SessionSettings,
    offline: bool,
) -> Result<Arc<dyn Transport>> {
    if offline {
        return Ok(Arc::new(offline_transport(settings)));
    }
    let base_url = config.base_url().unwrap_or(DEFAULT_BASE_URL);
    let transport = HttpTransport::new(base_url)
        .with_context(|| format!("Failed to set up transport for {base_url}"))?;
    Ok(Arc::new(transport))
}

/// A backend stand-in for demos: echoes chat messages and writes a short
/// article for any submitted profile.
pub fn offline_transport(settings: &SessionSettings) -> ScriptedTransport {
    let generation_path = settings.generation.path.clone();
    ScriptedTransport::new().with_fallback(move |request| {
        let body = request.body.clone().unwrap_or_default();
        if request.path == generation_path {
            let name = body["name"].as_str().unwrap_or("learner");
            let profession = body["profession"].as_str().unwrap_or("student");
            ScriptedReply::json(
                200,
                json!({
                    "article": format!(
                        "Welcome, {name}! This offline article shows how a {profession} can get started."
                    ),
                    "topics": [
                        { "title": "Getting started", "url": "https://example.com/start" }
                    ]
                }),
            )
            .after(Duration::from_millis(300))
        } else {
            let message = body["message"].as_str().unwrap_or_default();
            ScriptedReply::json(200, json!({ "response": format!("(offline) You said: {message}") }))
                .after(Duration::from_millis(100))
        }
    })
}

pub fn logger_options(config: &ParleyConfig) -> LoggerOptions {
    let logging = config.logging.clone().unwrap_or_default();
    LoggerOptions {
        level: logging.level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        dir: logging.dir.as_deref().map(expand_home),
        json: logging.json.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::apply_all_defaults;
    use parley_config::schema::{ChatConfig, GenerationConfig, LoggingConfig};
    use parley_session::Session;

    #[test]
    fn defaults_map_to_session_defaults() {
        let settings = session_settings(&apply_all_defaults(ParleyConfig::default()));
        assert_eq!(settings.chat.path, "/chat");
        assert_eq!(settings.chat.deadline, Duration::from_secs(60));
        assert_eq!(settings.generation.deadline, Duration::from_secs(360));
        assert!(!settings.generation.forward_credential);
    }

    #[test]
    fn config_values_override_and_blank_greeting_disables() {
        let cfg = ParleyConfig {
            chat: Some(ChatConfig {
                model: Some("mistral-large".into()),
                deadline_ms: Some(1_500),
                greeting: Some("".into()),
                ..Default::default()
            }),
            generation: Some(GenerationConfig {
                forward_credential: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let settings = session_settings(&cfg);
        assert_eq!(settings.chat.model, "mistral-large");
        assert_eq!(settings.chat.deadline, Duration::from_millis(1_500));
        assert!(settings.chat.greeting.is_none());
        assert!(settings.generation.forward_credential);
    }

    #[test]
    fn expands_home_in_log_dir() {
        let cfg = ParleyConfig {
            logging: Some(LoggingConfig {
                dir: Some("~/.parley/logs".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = logger_options(&cfg);
        let dir = options.dir.unwrap();
        assert!(dir.ends_with(".parley/logs"));
        assert!(!dir.starts_with("~"));
        assert_eq!(options.level, "info");
    }

    #[tokio::test]
    async fn offline_session_answers_both_endpoints() {
        let settings = SessionSettings::default();
        let transport = Arc::new(offline_transport(&settings));
        let session = Session::new(transport, settings);

        session.send_chat_message("ping").await;
        let log = session.conversation().await;
        assert_eq!(log.last().unwrap().text(), "(offline) You said: ping");

        let profile = serde_json::from_value(json!({
            "name": "Ada", "age": 36, "profession": "engineer", "interests": ["math"]
        }))
        .unwrap();
        session.submit_for_generation(profile).await.unwrap();
        assert_eq!(
            session.generation().await.phase,
            parley_core::GenerationPhase::Succeeded
        );
    }
}
