use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use rewatch_core::{
    summarize, AgentResponse, AutomationAgent, CollectorConfig, ConfirmationGate, GenerationService,
    HistoryError, HistoryStore, NotifyGate, StopReason, TranscriptOutcome, TranscriptSource,
    VideoRecord, WatchWindow, WatchWindowCollector, GENERATION_FAILURE_SUMMARY,
};

/// Agent that replays a fixed script of responses, then reports empty batches.
struct ScriptedAgent {
    responses: Mutex<Vec<AgentResponse>>,
}

impl ScriptedAgent {
    fn new(responses: Vec<AgentResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl AutomationAgent for ScriptedAgent {
    async fn run_task(&self, _task: &str) -> Result<AgentResponse, HistoryError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(AgentResponse::Batch(Vec::new()))
        } else {
            Ok(responses.remove(0))
        }
    }
}

/// Agent that fabricates a fresh record every round, for exercising the
/// round budget.
struct EndlessAgent {
    counter: Mutex<u32>,
}

#[async_trait]
impl AutomationAgent for EndlessAgent {
    async fn run_task(&self, _task: &str) -> Result<AgentResponse, HistoryError> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let n = *counter;
        Ok(AgentResponse::Batch(vec![json!({
            "url": format!("https://www.youtube.com/watch?v=vid{n}"),
            "title": format!("Video {n}"),
            "author": "Channel",
            "watch_timestamp": "2024-01-02T00:00:00Z",
        })]))
    }
}

fn raw(url: &str, title: &str, ts: &str) -> Value {
    json!({
        "url": url,
        "title": title,
        "author": "Channel",
        "watch_timestamp": ts,
    })
}

fn window(start: &str) -> WatchWindow {
    WatchWindow {
        start: start.parse().unwrap(),
        end: Utc::now(),
    }
}

#[tokio::test]
async fn collector_merges_batches_and_stops_without_progress() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::new(dir.path().join("video_info.json"));

    // Pre-seed the store so the merge has something to overwrite.
    store
        .persist(&[VideoRecord {
            url: "https://www.youtube.com/watch?v=u1".to_string(),
            video_id: "u1".to_string(),
            title: "A".to_string(),
            author: "Channel".to_string(),
            watch_timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            description: String::new(),
        }])
        .unwrap();

    let batch = vec![
        raw(
            "https://www.youtube.com/watch?v=u1",
            "B",
            "2024-01-03T00:00:00Z",
        ),
        raw(
            "https://www.youtube.com/watch?v=u2",
            "C",
            "2024-01-01T00:00:00Z",
        ),
    ];
    // The second, identical batch makes no forward progress and ends the run.
    let agent = ScriptedAgent::new(vec![
        AgentResponse::Batch(batch.clone()),
        AgentResponse::Batch(batch),
    ]);
    let gate = NotifyGate::new();

    let collector = WatchWindowCollector::new(
        &agent,
        &gate,
        &mut store,
        CollectorConfig::new(window("2023-12-01T00:00:00Z")),
    );
    let report = collector.run().await.unwrap();

    assert_eq!(report.rounds, 2);
    assert_eq!(report.stop_reason, StopReason::NoForwardProgress);
    assert_eq!(report.new_urls, 2);
    assert!(report.rejections.is_empty());

    // Last write won wholesale and the persisted order is newest-first.
    let merged = report.merged;
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].url, "https://www.youtube.com/watch?v=u1");
    assert_eq!(merged[0].title, "B");
    assert_eq!(
        merged[0].watch_timestamp,
        Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
    );
    assert_eq!(merged[1].url, "https://www.youtube.com/watch?v=u2");
    assert_eq!(merged[1].title, "C");

    assert_eq!(store.load().unwrap(), merged);
}

#[tokio::test]
async fn collector_suspends_on_two_factor_and_retries_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::new(dir.path().join("video_info.json"));

    let agent = ScriptedAgent::new(vec![
        AgentResponse::FreeText("sign-in needs approval: 2FA_REQUIRED".to_string()),
        AgentResponse::Batch(vec![raw(
            "https://www.youtube.com/watch?v=u1",
            "After the gate",
            "2024-01-02T00:00:00Z",
        )]),
    ]);
    let gate = NotifyGate::new();
    gate.confirm(); // external approval already granted

    let collector = WatchWindowCollector::new(
        &agent,
        &gate,
        &mut store,
        CollectorConfig::new(window("2023-12-01T00:00:00Z")),
    );
    let report = collector.run().await.unwrap();

    assert_eq!(report.new_urls, 1);
    assert_eq!(report.merged[0].title, "After the gate");
}

#[tokio::test]
async fn collector_rejects_bad_records_but_keeps_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::new(dir.path().join("video_info.json"));

    let agent = ScriptedAgent::new(vec![AgentResponse::Batch(vec![
        raw(
            "https://www.youtube.com/watch?v=good",
            "Good",
            "2024-01-02T00:00:00Z",
        ),
        json!({
            "url": "https://www.youtube.com/watch?v=bad",
            "author": "Channel",
            "watch_timestamp": "2024-01-02T00:00:00Z",
        }),
    ])]);
    let gate = NotifyGate::new();

    let collector = WatchWindowCollector::new(
        &agent,
        &gate,
        &mut store,
        CollectorConfig::new(window("2023-12-01T00:00:00Z")),
    );
    let report = collector.run().await.unwrap();

    assert_eq!(report.merged.len(), 1);
    assert_eq!(report.merged[0].video_id, "good");
    assert_eq!(report.rejections.len(), 1);
}

#[tokio::test]
async fn collector_stops_when_the_window_is_covered() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::new(dir.path().join("video_info.json"));

    // Everything observed predates the window start.
    let agent = ScriptedAgent::new(vec![AgentResponse::Batch(vec![raw(
        "https://www.youtube.com/watch?v=old",
        "Old",
        "2023-06-01T00:00:00Z",
    )])]);
    let gate = NotifyGate::new();

    let collector = WatchWindowCollector::new(
        &agent,
        &gate,
        &mut store,
        CollectorConfig::new(window("2024-01-01T00:00:00Z")),
    );
    let report = collector.run().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::WindowCovered);
    // Out-of-window records are observed but never merged.
    assert!(report.merged.is_empty());
    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn collector_honors_the_round_budget() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::new(dir.path().join("video_info.json"));

    let agent = EndlessAgent {
        counter: Mutex::new(0),
    };
    let gate = NotifyGate::new();

    let mut config = CollectorConfig::new(window("2023-12-01T00:00:00Z"));
    config.max_rounds = 3;

    let collector = WatchWindowCollector::new(&agent, &gate, &mut store, config);
    let report = collector.run().await.unwrap();

    assert_eq!(report.rounds, 3);
    assert_eq!(report.stop_reason, StopReason::RoundBudgetExhausted);
    assert_eq!(report.merged.len(), 3);
}

// ---- summary pipeline ----

struct FixedTranscripts {
    outcome: TranscriptOutcome,
}

#[async_trait]
impl TranscriptSource for FixedTranscripts {
    async fn fetch(&self, _video_id: &str) -> TranscriptOutcome {
        self.outcome.clone()
    }
}

enum Script {
    Reply(String),
    Fail,
}

struct ScriptedGenerator {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(&self, _system: &str, prompt: &str) -> Result<String, HistoryError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(HistoryError::Other("service unreachable".to_string())),
        }
    }
}

fn video(video_id: &str, description: &str) -> VideoRecord {
    VideoRecord {
        url: format!("https://www.youtube.com/watch?v={video_id}"),
        video_id: video_id.to_string(),
        title: "Title".to_string(),
        author: "Author".to_string(),
        watch_timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        description: description.to_string(),
    }
}

#[tokio::test]
async fn structured_response_fills_all_fields() {
    let transcripts = FixedTranscripts {
        outcome: TranscriptOutcome::Available("spoken words".to_string()),
    };
    let generator = ScriptedGenerator::new(Script::Reply(
        r#"{"summary": "s", "key_points": ["k1", "k2"], "learnings": ["l"]}"#.to_string(),
    ));

    let report =
        summarize::summarize_records(&[video("abc", "")], &transcripts, &generator).await;

    assert_eq!(report.summaries.len(), 1);
    let summary = &report.summaries[0];
    assert_eq!(summary.summary, "s");
    assert_eq!(summary.key_points, vec!["k1", "k2"]);
    assert_eq!(summary.learnings, vec!["l"]);
    assert_eq!(report.degraded, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn unparseable_response_degrades_to_raw_text() {
    let transcripts = FixedTranscripts {
        outcome: TranscriptOutcome::Available("spoken words".to_string()),
    };
    let generator =
        ScriptedGenerator::new(Script::Reply("I could not produce JSON today.".to_string()));

    let report =
        summarize::summarize_records(&[video("abc", "")], &transcripts, &generator).await;

    let summary = &report.summaries[0];
    assert_eq!(summary.summary, "I could not produce JSON today.");
    assert!(summary.key_points.is_empty());
    assert!(summary.learnings.is_empty());
    assert_eq!(report.degraded, 1);
}

#[tokio::test]
async fn generation_failure_yields_fixed_summary() {
    let transcripts = FixedTranscripts {
        outcome: TranscriptOutcome::Available("spoken words".to_string()),
    };
    let generator = ScriptedGenerator::new(Script::Fail);

    let report =
        summarize::summarize_records(&[video("abc", "")], &transcripts, &generator).await;

    assert_eq!(report.summaries[0].summary, GENERATION_FAILURE_SUMMARY);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn description_is_the_fallback_and_empty_records_are_skipped() {
    let transcripts = FixedTranscripts {
        outcome: TranscriptOutcome::Unavailable,
    };
    let generator = ScriptedGenerator::new(Script::Reply(
        r#"{"summary": "from description"}"#.to_string(),
    ));

    let report = summarize::summarize_records(
        &[video("with-desc", "the description"), video("empty", "")],
        &transcripts,
        &generator,
    )
    .await;

    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.summaries[0].video_id, "with-desc");
    assert_eq!(report.skipped, vec!["empty".to_string()]);

    // The prompt carried the fallback content.
    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("the description"));
}
