// src/error.rs
use serde_json::Value;

/// Run-level errors. Only `Configuration` and `Persist` abort a run; every
/// other failure mode in the pipeline degrades per-record or per-batch.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Automation agent error: {0}")]
    Agent(String),

    #[error("Confirmation gate closed before sign-in was approved")]
    GateClosed,

    #[error("Other error: {0}")]
    Other(String),
}

impl HistoryError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, HistoryError::Configuration(_))
    }
}

/// Per-record validation rejections. These never abort a batch: the caller
/// accumulates them and keeps processing the remaining records.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecordRejection {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str, raw: Value },

    #[error("unparseable watch timestamp {raw:?}")]
    TimestampParse { raw: String },

    #[error("no video id could be derived from {raw:?}")]
    IdentifierExtraction { raw: String },
}

impl RecordRejection {
    pub fn code_str(&self) -> &'static str {
        match self {
            RecordRejection::MissingField { .. } => "missing_field",
            RecordRejection::TimestampParse { .. } => "timestamp_parse",
            RecordRejection::IdentifierExtraction { .. } => "identifier_extraction",
        }
    }
}
