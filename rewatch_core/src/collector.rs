// src/collector.rs
//
// Watch-window collector: drives repeated fetch-and-merge cycles against the
// automation agent until the requested window is covered or the agent stops
// making forward progress. Every batch is validated and committed before the
// next fetch, so partial progress survives a later failure.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::agent::{extract_embedded_batch, AgentResponse, AutomationAgent, ConfirmationGate};
use crate::error::{HistoryError, RecordRejection};
use crate::prompts;
use crate::record::{self, VideoRecord};
use crate::store::HistoryStore;

pub const DEFAULT_MAX_ROUNDS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    FetchingBatch,
    AwaitingUserGate,
    MergingBatch,
    ScrollingForMore,
    Done,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The latest batch contained no record not already seen this run.
    NoForwardProgress,
    /// Every observed timestamp in the latest batch was older than the
    /// window start; the requested window is fully covered.
    WindowCovered,
    /// Safety cap on fetch/scroll rounds was reached.
    RoundBudgetExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::NoForwardProgress => write!(f, "no forward progress"),
            StopReason::WindowCovered => write!(f, "window fully covered"),
            StopReason::RoundBudgetExhausted => write!(f, "round budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WatchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WatchWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub window: WatchWindow,
    pub max_rounds: usize,
}

impl CollectorConfig {
    pub fn new(window: WatchWindow) -> Self {
        Self {
            window,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

#[derive(Debug)]
pub struct CollectorReport {
    /// Full merged collection after the run, newest first.
    pub merged: Vec<VideoRecord>,
    /// Distinct in-window URLs observed this run.
    pub new_urls: usize,
    pub rejections: Vec<RecordRejection>,
    pub rounds: usize,
    pub stop_reason: StopReason,
}

pub struct WatchWindowCollector<'a> {
    agent: &'a dyn AutomationAgent,
    gate: &'a dyn ConfirmationGate,
    store: &'a mut HistoryStore,
    config: CollectorConfig,
    state: CollectorState,
}

impl<'a> WatchWindowCollector<'a> {
    pub fn new(
        agent: &'a dyn AutomationAgent,
        gate: &'a dyn ConfirmationGate,
        store: &'a mut HistoryStore,
        config: CollectorConfig,
    ) -> Self {
        Self {
            agent,
            gate,
            store,
            config,
            state: CollectorState::Idle,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub async fn run(mut self) -> Result<CollectorReport, HistoryError> {
        let task = prompts::watch_history_task(self.config.window.start, self.config.window.end);
        let max_rounds = self.config.max_rounds.max(1);

        let mut seen: HashSet<String> = HashSet::new();
        let mut rejections: Vec<RecordRejection> = Vec::new();
        let mut merged = self.store.load()?;
        let mut new_urls = 0usize;
        let mut rounds = 0usize;
        let stop_reason;

        loop {
            if rounds >= max_rounds {
                warn!(max_rounds, "stopping: round budget exhausted");
                stop_reason = StopReason::RoundBudgetExhausted;
                break;
            }
            rounds += 1;

            self.state = CollectorState::FetchingBatch;
            let response = self.fetch_through_gate(&task).await?;
            let raw_batch = self.raw_batch(response);

            self.state = CollectorState::MergingBatch;
            let outcome = record::validate_batch(&raw_batch, Utc::now());
            rejections.extend(outcome.rejections);

            let mut progressed = false;
            for observed in &outcome.records {
                if seen.insert(observed.url.clone()) {
                    progressed = true;
                    if self.config.window.contains(observed.watch_timestamp) {
                        new_urls += 1;
                    }
                }
            }

            // Records outside the requested window are observed (they drive
            // termination) but not merged.
            let in_window: Vec<VideoRecord> = outcome
                .records
                .iter()
                .filter(|r| self.config.window.contains(r.watch_timestamp))
                .cloned()
                .collect();

            // Commit before deciding whether to continue; partial progress
            // survives even if a later batch in the same run fails.
            if !in_window.is_empty() {
                merged = self.store.merge_and_persist(in_window)?;
            }

            if !progressed {
                info!(rounds, "stopping: batch contained nothing unseen this run");
                stop_reason = StopReason::NoForwardProgress;
                break;
            }

            let window_covered = !outcome.records.is_empty()
                && outcome
                    .records
                    .iter()
                    .all(|r| r.watch_timestamp < self.config.window.start);
            if window_covered {
                info!(rounds, "stopping: every observed timestamp is older than the window start");
                stop_reason = StopReason::WindowCovered;
                break;
            }

            self.state = CollectorState::ScrollingForMore;
        }

        self.state = CollectorState::Done;
        let report = CollectorReport {
            merged,
            new_urls,
            rejections,
            rounds,
            stop_reason,
        };
        self.state = CollectorState::Terminated;
        Ok(report)
    }

    // One fetch, with at most one gated retry: a second two-factor sentinel
    // after confirmation terminates the run instead of looping on the gate.
    async fn fetch_through_gate(&mut self, task: &str) -> Result<AgentResponse, HistoryError> {
        let response = self.agent.run_task(task).await?;
        if !response.requires_two_factor() {
            return Ok(response);
        }

        info!("two-factor gate raised; suspending until confirmation");
        self.state = CollectorState::AwaitingUserGate;
        self.gate.wait_for_confirmation().await?;

        self.state = CollectorState::FetchingBatch;
        let retried = self.agent.run_task(task).await?;
        if retried.requires_two_factor() {
            return Err(HistoryError::Agent(
                "two-factor gate raised again after confirmation".to_string(),
            ));
        }
        Ok(retried)
    }

    fn raw_batch(&self, response: AgentResponse) -> Vec<Value> {
        match response {
            AgentResponse::Batch(values) => values,
            AgentResponse::FreeText(text) => match extract_embedded_batch(&text) {
                Some(values) => {
                    warn!(
                        count = values.len(),
                        "agent returned free text; recovered an embedded batch (degraded path)"
                    );
                    values
                }
                None => {
                    warn!("agent returned free text with no recoverable batch");
                    Vec::new()
                }
            },
        }
    }
}
