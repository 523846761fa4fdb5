//! Config redaction for `config show` and logs.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &[
    "bearerToken",
    "bearer_token",
    "token",
    "accessToken",
    "access_token",
    "apiKey",
    "api_key",
    "password",
    "secret",
];

/// Replace every sensitive string leaf with a short hint ending in `***`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if !is_sensitive_key(key) || s.is_empty() {
        return Value::String(s.to_string());
    }
    let hint = if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    };
    Value::String(hint)
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_bearer_token() {
        let v = json!({ "auth": { "bearerToken": "eyJhbGciOiJIUzI1NiJ9.payload.sig" } });
        let token = redact(&v)["auth"]["bearerToken"].as_str().unwrap().to_string();
        assert_eq!(token, "eyJh***");
    }

    #[test]
    fn short_secret_is_fully_masked() {
        let v = json!({ "password": "hunter2" });
        assert_eq!(redact(&v)["password"], "***");
    }

    #[test]
    fn leaves_other_fields_alone() {
        let v = json!({ "backend": { "baseUrl": "http://localhost:8000" }, "chat": { "deadlineMs": 60000 } });
        assert_eq!(redact(&v), v);
    }
}
