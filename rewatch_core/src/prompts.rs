// src/prompts.rs
use chrono::{DateTime, Utc};

use crate::agent::TWO_FACTOR_SENTINEL;

/// Natural-language task handed to the automation agent for one
/// watch-history collection window.
pub fn watch_history_task(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "Go to the YouTube watch history at https://myactivity.google.com/product/youtube/?hl=en \
and collect videos watched between {start} and {end}.

The page uses infinite scroll. Follow these steps:
1. Navigate to the login page and sign in.
2. If a two-factor prompt appears, stop and reply with the exact text {sentinel}.
3. For each visible video entry, extract:
   - the full video URL from the link to the video
   - the video title and the channel name
   - the watch timestamp; keep symbolic labels like \"today 15:45\" or \
\"yesterday 15:45\" exactly as shown, they are resolved later
4. After processing the visible entries, scroll to the bottom of the page and \
wait for new entries to load. Keep scrolling until either a video older than \
{start} appears or no new entries load.

Reply with a JSON object {{\"records\": [...]}} where each record has the \
fields url, title, author, watch_timestamp, and description. Do not wrap the \
JSON in prose.",
        start = start.date_naive(),
        end = end.date_naive(),
        sentinel = TWO_FACTOR_SENTINEL,
    )
}

pub const SUMMARY_SYSTEM: &str =
    "You are a helpful assistant that summarizes technical YouTube videos.";

/// Prompt for one video summary. Requests strict JSON so the response can be
/// parsed into a structured summary; unparseable replies are kept as raw
/// text downstream.
pub fn summary_prompt(title: &str, author: &str, content: &str) -> String {
    format!(
        "Summarize the following YouTube video content. The video is titled \
'{title}' by '{author}'.

Content:
{content}

Reply with a single JSON object and nothing else, with exactly these keys:
  \"summary\": a concise high-level summary (string)
  \"key_points\": the main points covered (array of strings)
  \"learnings\": concrete things a viewer would take away (array of strings)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn task_is_parameterized_by_the_window() {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
        let task = watch_history_task(start, end);
        assert!(task.contains("2024-02-01"));
        assert!(task.contains("2024-02-15"));
        assert!(task.contains(TWO_FACTOR_SENTINEL));
    }

    #[test]
    fn summary_prompt_names_the_required_keys() {
        let prompt = summary_prompt("Title", "Author", "transcript text");
        for key in ["summary", "key_points", "learnings"] {
            assert!(prompt.contains(key));
        }
    }
}
