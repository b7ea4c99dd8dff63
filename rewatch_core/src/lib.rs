// src/lib.rs
pub mod agent;
pub mod collector;
pub mod credentials;
pub mod error;
pub mod prompts;
pub mod record;
pub mod store;
pub mod summarize;
pub mod text;
pub mod timestamp;
pub mod transcript;

pub use agent::{
    AgentResponse, AutomationAgent, ConfirmationGate, HttpAutomationAgent, NotifyGate,
    AGENT_URL_ENV, TWO_FACTOR_SENTINEL,
};
pub use collector::{
    CollectorConfig, CollectorReport, CollectorState, StopReason, WatchWindow,
    WatchWindowCollector, DEFAULT_MAX_ROUNDS,
};
pub use credentials::Credentials;
pub use error::{HistoryError, RecordRejection};
pub use record::{RawRecord, ValidatedBatch, VideoRecord};
pub use store::HistoryStore;
pub use summarize::{
    GenerationService, OpenAiGenerator, SummaryRecord, SummaryReport, DEFAULT_GENERATION_MODEL,
    GENERATION_FAILURE_SUMMARY,
};
pub use transcript::{TranscriptOutcome, TranscriptSource, YouTubeTranscriptSource};
