// src/record.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::RecordRejection;
use crate::timestamp;

/// One normalized watched video. `url` is the uniqueness key across the
/// persisted store; `video_id` is derived from it when the agent did not
/// report one directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub url: String,
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub watch_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// One raw observation as the agent reports it, of unknown completeness.
/// Field spellings drifted across agent revisions; the legacy names are
/// accepted as aliases and unified into the canonical schema here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "video_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "channel")]
    pub author: Option<String>,
    #[serde(default, alias = "watch_date")]
    pub watch_timestamp: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of validating one batch: valid records plus the classified
/// rejections for everything else. A bad record never aborts the batch.
#[derive(Debug, Default)]
pub struct ValidatedBatch {
    pub records: Vec<VideoRecord>,
    pub rejections: Vec<RecordRejection>,
}

/// Derive the canonical video identifier.
///
/// An identifier already reported by the agent wins unchanged. Otherwise the
/// `v=` query parameter (or the `youtu.be/<id>` short form) is extracted from
/// the URL. When neither exists the record must be rejected, never given a
/// guessed or empty identifier.
pub fn extract_video_id(existing: Option<&str>, url: &str) -> Result<String, RecordRejection> {
    if let Some(id) = existing {
        let id = id.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }

        if parsed.host_str() == Some("youtu.be") {
            let segment = parsed.path().trim_matches('/');
            if !segment.is_empty() {
                return Ok(segment.to_string());
            }
        }
    } else if let Some(value) = scan_v_param(url) {
        // Scheme-less URLs still carry a recognizable v= parameter.
        return Ok(value);
    }

    Err(RecordRejection::IdentifierExtraction {
        raw: url.to_string(),
    })
}

// `v=` value up to the next `&` or end of string.
fn scan_v_param(url: &str) -> Option<String> {
    let query = url.splitn(2, '?').nth(1)?;
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("v=") {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Validate one raw record against the canonical schema. Pure transform: all
/// I/O stays with the caller.
pub fn validate(raw: &Value, now: DateTime<Utc>) -> Result<VideoRecord, RecordRejection> {
    let parsed: RawRecord =
        serde_json::from_value(raw.clone()).map_err(|_| RecordRejection::MissingField {
            field: "record",
            raw: raw.clone(),
        })?;

    let title = parsed
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RecordRejection::MissingField {
            field: "title",
            raw: raw.clone(),
        })?
        .to_string();

    // Author must be reported, but an empty string ("unknown") is accepted.
    let author = parsed
        .author
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| RecordRejection::MissingField {
            field: "author",
            raw: raw.clone(),
        })?
        .to_string();

    let url = resolve_url(&parsed).ok_or_else(|| RecordRejection::MissingField {
        field: "url",
        raw: raw.clone(),
    })?;

    let ts_raw = parsed
        .watch_timestamp
        .as_ref()
        .ok_or_else(|| RecordRejection::MissingField {
            field: "watch_timestamp",
            raw: raw.clone(),
        })?;
    let ts_text = match ts_raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let watch_timestamp = timestamp::normalize(&ts_text, now)?;

    let video_id = extract_video_id(parsed.video_id.as_deref(), &url)?;

    Ok(VideoRecord {
        url,
        video_id,
        title,
        author,
        watch_timestamp,
        description: parsed.description.unwrap_or_default(),
    })
}

// A bare video_id resolves to the canonical watch URL; the legacy agent
// sometimes reported only the id.
fn resolve_url(parsed: &RawRecord) -> Option<String> {
    if let Some(url) = parsed.url.as_deref() {
        let url = url.trim();
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    let id = parsed.video_id.as_deref()?.trim();
    if id.is_empty() {
        return None;
    }
    Some(format!("https://www.youtube.com/watch?v={}", id))
}

/// Validate a whole batch, accumulating rejections instead of failing.
pub fn validate_batch(raw_batch: &[Value], now: DateTime<Utc>) -> ValidatedBatch {
    let mut batch = ValidatedBatch::default();
    for raw in raw_batch {
        match validate(raw, now) {
            Ok(record) => batch.records.push(record),
            Err(rejection) => {
                tracing::debug!(code = rejection.code_str(), %rejection, "rejected record");
                batch.rejections.push(rejection);
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn extracts_id_between_v_and_next_ampersand() {
        let id = extract_video_id(None, "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s");
        assert_eq!(id.unwrap(), "dQw4w9WgXcQ");

        let id = extract_video_id(None, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(id.unwrap(), "abc123");
    }

    #[test]
    fn short_form_and_existing_ids() {
        let id = extract_video_id(None, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(id.unwrap(), "dQw4w9WgXcQ");

        // An already-reported identifier wins unchanged.
        let id = extract_video_id(Some("explicit"), "https://www.youtube.com/watch?v=other");
        assert_eq!(id.unwrap(), "explicit");
    }

    #[test]
    fn unrecognizable_urls_are_rejected_not_coerced() {
        let err = extract_video_id(None, "https://www.youtube.com/feed/history").unwrap_err();
        assert!(matches!(err, RecordRejection::IdentifierExtraction { .. }));

        let err = extract_video_id(Some("   "), "not a url").unwrap_err();
        assert!(matches!(err, RecordRejection::IdentifierExtraction { .. }));
    }

    #[test]
    fn valid_record_round_trips() {
        let raw = json!({
            "url": "https://www.youtube.com/watch?v=abc123",
            "title": "  Understanding Quantum Entanglement ",
            "author": "Science Hour",
            "watch_timestamp": "2024-03-09T08:30:00Z",
            "description": "A deep dive."
        });
        let record = validate(&raw, reference()).unwrap();
        assert_eq!(record.video_id, "abc123");
        assert_eq!(record.title, "Understanding Quantum Entanglement");
        assert_eq!(record.author, "Science Hour");
        assert_eq!(record.description, "A deep dive.");
    }

    #[test]
    fn missing_title_is_classified() {
        let raw = json!({
            "url": "https://www.youtube.com/watch?v=abc123",
            "author": "Science Hour",
            "watch_timestamp": "2024-03-09T08:30:00Z"
        });
        let err = validate(&raw, reference()).unwrap_err();
        match err {
            RecordRejection::MissingField { field, .. } => assert_eq!(field, "title"),
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[test]
    fn legacy_spellings_are_unified() {
        // watch_date + bare video_id, the older agent's schema.
        let raw = json!({
            "video_id": "def456",
            "title": "Transformers Explained",
            "author": "",
            "watch_date": "yesterday 15:45"
        });
        let record = validate(&raw, reference()).unwrap();
        assert_eq!(record.url, "https://www.youtube.com/watch?v=def456");
        assert_eq!(record.video_id, "def456");
        assert_eq!(
            record.watch_timestamp,
            Utc.with_ymd_and_hms(2024, 3, 9, 15, 45, 0).unwrap()
        );
        assert_eq!(record.description, "");
    }

    #[test]
    fn bad_record_does_not_abort_the_batch() {
        let batch = vec![
            json!({
                "url": "https://www.youtube.com/watch?v=ok1",
                "title": "Good",
                "author": "A",
                "watch_timestamp": "2024-03-09T08:30:00Z"
            }),
            json!({
                "url": "https://www.youtube.com/watch?v=bad",
                "author": "B",
                "watch_timestamp": "2024-03-09T08:30:00Z"
            }),
            json!({
                "url": "https://www.youtube.com/watch?v=ok2",
                "title": "Also good",
                "author": "C",
                "watch_timestamp": "2024-03-08T10:00:00Z"
            }),
        ];
        let outcome = validate_batch(&batch, reference());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.rejections.len(), 1);
        assert!(matches!(
            outcome.rejections[0],
            RecordRejection::MissingField { field: "title", .. }
        ));
    }
}
