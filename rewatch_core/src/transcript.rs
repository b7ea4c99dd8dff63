// src/transcript.rs
//
// Transcript retrieval is strictly optional: disabled captions, a missing
// transcript, and transport failures all resolve to `Unavailable` so the
// summary pipeline can fall back to the video description.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use yt_transcript_rs::YouTubeTranscriptApi;

use crate::error::HistoryError;
use crate::text::clean_html_entities;

const TRANSCRIPT_LANGUAGES: [&str; 1] = ["en"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Available(String),
    Unavailable,
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &str) -> TranscriptOutcome;
}

pub struct YouTubeTranscriptSource {
    api: YouTubeTranscriptApi,
}

impl YouTubeTranscriptSource {
    pub fn new() -> Result<Self, HistoryError> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| HistoryError::Other(e.to_string()))?;
        Ok(Self { api })
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscriptSource {
    async fn fetch(&self, video_id: &str) -> TranscriptOutcome {
        // Guard against upstream panics in the transcript library
        let fetched = AssertUnwindSafe(self.api.fetch_transcript(
            video_id,
            &TRANSCRIPT_LANGUAGES,
            false,
        ))
        .catch_unwind()
        .await;

        match fetched {
            Ok(Ok(transcript)) => {
                let raw_text = transcript
                    .parts()
                    .iter()
                    .map(|p| p.text.clone())
                    .collect::<Vec<_>>()
                    .join(" ");
                let cleaned = clean_html_entities(&raw_text);
                if cleaned.trim().is_empty() {
                    TranscriptOutcome::Unavailable
                } else {
                    TranscriptOutcome::Available(cleaned)
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    video_id = %video_id,
                    "failed to fetch transcript; falling back to description"
                );
                TranscriptOutcome::Unavailable
            }
            Err(_) => {
                tracing::warn!(video_id = %video_id, "transcript fetch panicked");
                TranscriptOutcome::Unavailable
            }
        }
    }
}
