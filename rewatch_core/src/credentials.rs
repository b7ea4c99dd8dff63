// src/credentials.rs
use crate::error::HistoryError;

pub const GOOGLE_USERNAME_ENV: &str = "GOOGLE_USERNAME";
pub const GOOGLE_PASSWORD_ENV: &str = "GOOGLE_PASSWORD";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Read a single required value from the environment.
pub fn require_env(key: &str) -> Result<String, HistoryError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            HistoryError::Configuration(format!("missing required environment variable {key}"))
        })
}

/// Credentials for a collection run, read once at startup. Every missing key
/// is reported in a single fatal error so the user can fix them all at once,
/// and nothing touches the network before this succeeds.
#[derive(Clone)]
pub struct Credentials {
    google_username: String,
    google_password: String,
    openai_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, HistoryError> {
        let mut missing = Vec::new();
        let google_username = read_or_flag(GOOGLE_USERNAME_ENV, &mut missing);
        let google_password = read_or_flag(GOOGLE_PASSWORD_ENV, &mut missing);
        let openai_api_key = read_or_flag(OPENAI_API_KEY_ENV, &mut missing);

        if !missing.is_empty() {
            return Err(HistoryError::Configuration(format!(
                "missing required credentials in the environment: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            google_username,
            google_password,
            openai_api_key,
        })
    }

    pub fn google_username(&self) -> &str {
        &self.google_username
    }

    pub fn google_password(&self) -> &str {
        &self.google_password
    }

    pub fn openai_api_key(&self) -> &str {
        &self.openai_api_key
    }
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_username", &"***")
            .field("google_password", &"***")
            .field("openai_api_key", &"***")
            .finish()
    }
}

fn read_or_flag(key: &'static str, missing: &mut Vec<&'static str>) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(key);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let creds = Credentials {
            google_username: "user@example.com".into(),
            google_password: "hunter2".into(),
            openai_api_key: "sk-secret".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("***"));
    }
}
