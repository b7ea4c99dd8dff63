// src/summarize.rs
//
// Per-record summary pipeline: transcript (else description, else skip) →
// generation service → structured summary. Every failure mode past this
// point degrades; nothing here aborts a batch.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::HistoryError;
use crate::prompts;
use crate::record::VideoRecord;
use crate::transcript::{TranscriptOutcome, TranscriptSource};

/// Summary text used when the generation call itself fails.
pub const GENERATION_FAILURE_SUMMARY: &str = "Summary generation failed.";

pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Structured summary of one processed video. `summary` is never absent: it
/// degrades to the raw response text or a fixed failure string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub watch_timestamp: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub learnings: Vec<String>,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, HistoryError>;
}

/// Generation service backed by the OpenAI chat completions API.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Result<Self, HistoryError> {
        let client = reqwest::Client::builder()
            .user_agent("rewatch/0.1.0")
            .build()
            .map_err(|e| HistoryError::Other(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl GenerationService for OpenAiGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, HistoryError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.5,
        });

        let resp = self
            .client
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(HistoryError::HttpRequest)?;

        let status = resp.status();
        let value: Value = resp.json().await.map_err(HistoryError::HttpRequest)?;
        if !status.is_success() {
            return Err(HistoryError::Other(format!(
                "generation service error: {} - {}",
                status, value
            )));
        }

        let content = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .unwrap_or("")
            .to_string();
        Ok(content)
    }
}

#[derive(Debug, Deserialize)]
struct StructuredSummary {
    summary: Option<String>,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    learnings: Vec<String>,
}

/// Parse a generation response as structured data: strict JSON first, then a
/// fenced code block. `None` means the caller keeps the raw text wholesale.
fn parse_structured_response(raw: &str) -> Option<StructuredSummary> {
    let candidates = [Some(raw.trim()), strip_code_fence(raw)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(parsed) = serde_json::from_str::<StructuredSummary>(candidate) {
            if parsed.summary.is_some() {
                return Some(parsed);
            }
        }
    }
    None
}

fn strip_code_fence(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(after[..end].trim())
}

/// Outcome counters for one summary run; reported to the user at the end.
#[derive(Debug, Default)]
pub struct SummaryReport {
    pub summaries: Vec<SummaryRecord>,
    /// Video ids skipped because neither transcript nor description existed.
    pub skipped: Vec<String>,
    /// Responses that were not parseable as structured data.
    pub degraded: usize,
    /// Generation calls that failed outright.
    pub failed: usize,
}

/// Process one record into the report. Never fails: every outcome is either
/// a summary (possibly degraded) or a recorded skip.
pub async fn summarize_into(
    report: &mut SummaryReport,
    record: &VideoRecord,
    transcripts: &dyn TranscriptSource,
    generator: &dyn GenerationService,
) {
    let content = match transcripts.fetch(&record.video_id).await {
        TranscriptOutcome::Available(text) => text,
        TranscriptOutcome::Unavailable => record.description.clone(),
    };
    if content.trim().is_empty() {
        debug!(video_id = %record.video_id, "no transcript or description; skipping");
        report.skipped.push(record.video_id.clone());
        return;
    }

    let prompt = prompts::summary_prompt(&record.title, &record.author, &content);
    let (summary, key_points, learnings) =
        match generator.generate(prompts::SUMMARY_SYSTEM, &prompt).await {
            Ok(raw) => match parse_structured_response(&raw) {
                Some(parsed) => (
                    parsed.summary.unwrap_or_default(),
                    parsed.key_points,
                    parsed.learnings,
                ),
                None => {
                    warn!(
                        video_id = %record.video_id,
                        "generation response was not structured; keeping raw text"
                    );
                    report.degraded += 1;
                    (raw, Vec::new(), Vec::new())
                }
            },
            Err(e) => {
                warn!(video_id = %record.video_id, error = %e, "generation call failed");
                report.failed += 1;
                (GENERATION_FAILURE_SUMMARY.to_string(), Vec::new(), Vec::new())
            }
        };

    report.summaries.push(SummaryRecord {
        video_id: record.video_id.clone(),
        title: record.title.clone(),
        author: record.author.clone(),
        watch_timestamp: record.watch_timestamp,
        summary,
        key_points,
        learnings,
    });
}

/// Summarize a whole run's records in order.
pub async fn summarize_records(
    records: &[VideoRecord],
    transcripts: &dyn TranscriptSource,
    generator: &dyn GenerationService,
) -> SummaryReport {
    let mut report = SummaryReport::default();
    for record in records {
        summarize_into(&mut report, record, transcripts, generator).await;
    }
    report
}

/// Write the dated summary artifact for this run. Summaries are not merged
/// with prior runs; each run gets its own artifact.
pub fn write_summary_artifact(
    dir: &Path,
    run_date: NaiveDate,
    summaries: &[SummaryRecord],
) -> Result<PathBuf, HistoryError> {
    fs::create_dir_all(dir).map_err(|e| HistoryError::Persist(format!("{}: {e}", dir.display())))?;

    let path = dir.join(format!("summaries_{}.json", run_date.format("%Y-%m-%d")));
    let body = serde_json::to_string_pretty(&json!({ "summaries": summaries }))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|e| HistoryError::Persist(format!("{}: {e}", tmp.display())))?;
    fs::rename(&tmp, &path).map_err(|e| HistoryError::Persist(format!("{}: {e}", path.display())))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_parses() {
        let parsed = parse_structured_response(
            r#"{"summary": "s", "key_points": ["k"], "learnings": ["l"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.summary.as_deref(), Some("s"));
        assert_eq!(parsed.key_points, vec!["k"]);
        assert_eq!(parsed.learnings, vec!["l"]);
    }

    #[test]
    fn fenced_json_parses() {
        let raw = "Here you go:\n```json\n{\"summary\": \"s\"}\n```\n";
        let parsed = parse_structured_response(raw).unwrap();
        assert_eq!(parsed.summary.as_deref(), Some("s"));
        assert!(parsed.key_points.is_empty());
    }

    #[test]
    fn prose_and_keyless_objects_do_not_parse() {
        assert!(parse_structured_response("This video covers Rust.").is_none());
        // A JSON object without the summary key is not a structured summary.
        assert!(parse_structured_response(r#"{"title": "x"}"#).is_none());
    }

    #[test]
    fn artifact_is_dated_and_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let path = write_summary_artifact(dir.path(), date, &[]).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("summaries_2024-03-10.json")
        );

        let body: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(body.get("summaries").and_then(|s| s.as_array()).is_some());
    }
}
