//! Config defaults: fills every unset field with its runtime value.

use parley_session::chat::DEFAULT_CHAT_DEADLINE;
use parley_session::generation::DEFAULT_GENERATION_DEADLINE;

use crate::schema::{BackendConfig, ChatConfig, GenerationConfig, LoggingConfig, ParleyConfig};

pub use parley_session::chat::{DEFAULT_CHAT_MODEL, DEFAULT_CHAT_PATH, DEFAULT_GREETING};
pub use parley_session::generation::DEFAULT_GENERATION_PATH;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub const DEFAULT_CHAT_DEADLINE_MS: u64 = DEFAULT_CHAT_DEADLINE.as_millis() as u64;

pub const DEFAULT_GENERATION_DEADLINE_MS: u64 = DEFAULT_GENERATION_DEADLINE.as_millis() as u64;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ParleyConfig) -> ParleyConfig {
    let config = apply_backend_defaults(config);
    let config = apply_chat_defaults(config);
    let config = apply_generation_defaults(config);
    apply_logging_defaults(config)
}

fn apply_backend_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let backend = config.backend.get_or_insert_with(BackendConfig::default);
    if backend.base_url.is_none() {
        backend.base_url = Some(DEFAULT_BASE_URL.to_string());
    }
    config
}

fn apply_chat_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let chat = config.chat.get_or_insert_with(ChatConfig::default);
    if chat.path.is_none() {
        chat.path = Some(DEFAULT_CHAT_PATH.to_string());
    }
    if chat.model.is_none() {
        chat.model = Some(DEFAULT_CHAT_MODEL.to_string());
    }
    if chat.deadline_ms.is_none() {
        chat.deadline_ms = Some(DEFAULT_CHAT_DEADLINE_MS);
    }
    if chat.greeting.is_none() {
        chat.greeting = Some(DEFAULT_GREETING.to_string());
    }
    config
}

fn apply_generation_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let generation = config.generation.get_or_insert_with(GenerationConfig::default);
    if generation.path.is_none() {
        generation.path = Some(DEFAULT_GENERATION_PATH.to_string());
    }
    if generation.deadline_ms.is_none() {
        generation.deadline_ms = Some(DEFAULT_GENERATION_DEADLINE_MS);
    }
    if generation.forward_credential.is_none() {
        generation.forward_credential = Some(false);
    }
    config
}

fn apply_logging_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(ParleyConfig::default());
        assert_eq!(cfg.base_url(), Some(DEFAULT_BASE_URL));
        let chat = cfg.chat.unwrap();
        assert_eq!(chat.deadline_ms, Some(DEFAULT_CHAT_DEADLINE_MS));
        assert_eq!(chat.model.as_deref(), Some(DEFAULT_CHAT_MODEL));
        let generation = cfg.generation.unwrap();
        assert_eq!(generation.path.as_deref(), Some(DEFAULT_GENERATION_PATH));
        assert_eq!(generation.deadline_ms, Some(DEFAULT_GENERATION_DEADLINE_MS));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
        assert!(cfg.auth.is_none());
    }

    #[test]
    fn matches_session_runtime_defaults() {
        use parley_session::{ChatSettings, GenerationSettings};

        let cfg = apply_all_defaults(ParleyConfig::default());
        let chat = cfg.chat.unwrap();
        let runtime = ChatSettings::default();
        assert_eq!(chat.path.as_deref(), Some(runtime.path.as_str()));
        assert_eq!(chat.model.as_deref(), Some(runtime.model.as_str()));
        assert_eq!(chat.greeting, runtime.greeting);
        assert_eq!(chat.deadline_ms, Some(runtime.deadline.as_millis() as u64));

        let generation = cfg.generation.unwrap();
        let runtime = GenerationSettings::default();
        assert_eq!(generation.path.as_deref(), Some(runtime.path.as_str()));
        assert_eq!(generation.deadline_ms, Some(runtime.deadline.as_millis() as u64));
        assert_eq!(generation.forward_credential, Some(runtime.forward_credential));
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = ParleyConfig {
            chat: Some(ChatConfig {
                deadline_ms: Some(5_000),
                greeting: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let chat = apply_all_defaults(cfg).chat.unwrap();
        assert_eq!(chat.deadline_ms, Some(5_000));
        assert_eq!(chat.greeting.as_deref(), Some(""));
        assert_eq!(chat.path.as_deref(), Some(DEFAULT_CHAT_PATH));
    }
}
