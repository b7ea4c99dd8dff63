// src/agent.rs
//
// Boundary to the browsing-automation agent. The structured batch shape is
// the contract; free text survives only as a degraded legacy mode and as the
// carrier of the two-factor sentinel.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::credentials::Credentials;
use crate::error::HistoryError;

/// Marker the agent emits when the sign-in flow hit a two-factor prompt.
pub const TWO_FACTOR_SENTINEL: &str = "2FA_REQUIRED";

/// Environment variable naming the agent service endpoint.
pub const AGENT_URL_ENV: &str = "REWATCH_AGENT_URL";

const AGENT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub enum AgentResponse {
    /// Structured batch of raw watch-history records.
    Batch(Vec<Value>),
    /// Unstructured agent output; may carry the two-factor sentinel.
    FreeText(String),
}

impl AgentResponse {
    pub fn requires_two_factor(&self) -> bool {
        matches!(self, AgentResponse::FreeText(text) if text.contains(TWO_FACTOR_SENTINEL))
    }
}

#[async_trait]
pub trait AutomationAgent: Send + Sync {
    /// Execute a natural-language browsing task and return what was observed.
    async fn run_task(&self, task: &str) -> Result<AgentResponse, HistoryError>;
}

/// Suspension point for the two-factor gate. The collector parks here until
/// an external confirmation arrives; implementations must not block the
/// async runtime.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn wait_for_confirmation(&self) -> Result<(), HistoryError>;
}

/// Gate backed by a [`tokio::sync::Notify`], for embedding the collector in
/// non-interactive hosts. `confirm` may fire before or after the collector
/// starts waiting; the permit is retained either way.
#[derive(Default)]
pub struct NotifyGate {
    notify: Notify,
}

impl NotifyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirm(&self) {
        self.notify.notify_one();
    }
}

#[async_trait]
impl ConfirmationGate for NotifyGate {
    async fn wait_for_confirmation(&self) -> Result<(), HistoryError> {
        self.notify.notified().await;
        Ok(())
    }
}

/// Best-effort recovery of a record batch embedded in free text. Degraded
/// path only; callers log it as such.
pub fn extract_embedded_batch(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Vec<Value>>(&text[start..=end]).ok()
}

/// Agent consumed over HTTP: the task string and sensitive credential values
/// are posted to the service, which replies with either a structured
/// `{"records": [...]}` payload or free text.
pub struct HttpAutomationAgent {
    client: reqwest::Client,
    endpoint: String,
    sensitive_data: Value,
}

impl HttpAutomationAgent {
    pub fn new(endpoint: impl Into<String>, credentials: &Credentials) -> Result<Self, HistoryError> {
        let client = reqwest::Client::builder()
            .user_agent("rewatch/0.1.0")
            .timeout(Duration::from_secs(AGENT_TIMEOUT_SECS))
            .build()
            .map_err(|e| HistoryError::Other(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sensitive_data: json!({
                "google_username": credentials.google_username(),
                "google_password": credentials.google_password(),
            }),
        })
    }

    pub fn from_env(credentials: &Credentials) -> Result<Self, HistoryError> {
        let endpoint = crate::credentials::require_env(AGENT_URL_ENV)?;
        Self::new(endpoint, credentials)
    }
}

#[async_trait]
impl AutomationAgent for HttpAutomationAgent {
    async fn run_task(&self, task: &str) -> Result<AgentResponse, HistoryError> {
        let body = json!({
            "task": task,
            "sensitive_data": self.sensitive_data,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(HistoryError::HttpRequest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(HistoryError::HttpRequest)?;
        if !status.is_success() {
            return Err(HistoryError::Agent(format!(
                "agent service error: {} - {}",
                status, text
            )));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => Ok(AgentResponse::Batch(items)),
            Ok(value) => {
                if let Some(records) = value.get("records").and_then(|r| r.as_array()) {
                    return Ok(AgentResponse::Batch(records.clone()));
                }
                if let Some(free) = value.get("text").and_then(|t| t.as_str()) {
                    return Ok(AgentResponse::FreeText(free.to_string()));
                }
                Ok(AgentResponse::FreeText(text))
            }
            Err(_) => Ok(AgentResponse::FreeText(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_detected_only_in_free_text() {
        let gated = AgentResponse::FreeText("sign-in stalled: 2FA_REQUIRED".to_string());
        assert!(gated.requires_two_factor());

        let plain = AgentResponse::FreeText("collected nothing".to_string());
        assert!(!plain.requires_two_factor());

        let batch = AgentResponse::Batch(vec![]);
        assert!(!batch.requires_two_factor());
    }

    #[test]
    fn embedded_batch_is_recovered_from_prose() {
        let text = r#"Here is what I found: [{"title": "A"}, {"title": "B"}] end of run"#;
        let batch = extract_embedded_batch(text).unwrap();
        assert_eq!(batch.len(), 2);

        assert!(extract_embedded_batch("no structured data here").is_none());
    }

    #[tokio::test]
    async fn notify_gate_accepts_early_confirmation() {
        let gate = NotifyGate::new();
        gate.confirm();
        gate.wait_for_confirmation().await.unwrap();
    }
}
