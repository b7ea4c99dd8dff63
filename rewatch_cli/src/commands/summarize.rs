use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rewatch_core::{
    credentials, summarize, HistoryStore, OpenAiGenerator, SummaryReport, VideoRecord,
    YouTubeTranscriptSource,
};

use crate::commands::Result;

pub async fn run(
    days: i64,
    output_dir: &PathBuf,
    store: Option<PathBuf>,
    model: Option<String>,
) -> Result<()> {
    // Only the generation key is needed here; resolved before any network.
    let api_key = credentials::require_env(credentials::OPENAI_API_KEY_ENV)?;

    let store_path = store.unwrap_or_else(|| output_dir.join("video_info.json"));
    let store = HistoryStore::new(store_path);

    let cutoff = Utc::now() - chrono::Duration::days(days.max(0));
    let records: Vec<VideoRecord> = store
        .load()?
        .into_iter()
        .filter(|r| r.watch_timestamp >= cutoff)
        .collect();

    if records.is_empty() {
        println!(
            "No videos watched in the last {} days found in {}",
            days,
            store.path().display().to_string().cyan()
        );
        return Ok(());
    }

    let transcripts = YouTubeTranscriptSource::new()?;
    let generator = OpenAiGenerator::new(api_key, model)?;

    println!(
        "Summarizing {} videos watched in the last {} days...",
        records.len().to_string().green().bold(),
        days
    );

    let bar = ProgressBar::new(records.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut report = SummaryReport::default();
    for record in &records {
        bar.set_message(record.title.clone());
        summarize::summarize_into(&mut report, record, &transcripts, &generator).await;
        bar.inc(1);
    }
    bar.finish_and_clear();

    let artifact = summarize::write_summary_artifact(
        output_dir,
        Utc::now().date_naive(),
        &report.summaries,
    )?;

    print_digest(&report, &artifact.display().to_string());
    Ok(())
}

fn print_digest(report: &SummaryReport, artifact: &str) {
    println!();
    println!("{}", "Summary of watched videos:".bold().cyan());
    for (idx, summary) in report.summaries.iter().enumerate() {
        println!();
        println!(
            "{}. {} {}",
            idx + 1,
            summary.title.bold(),
            format!("({})", summary.author).dimmed()
        );
        println!("   {}", summary.summary);
        for point in &summary.key_points {
            println!("   - {}", point);
        }
    }

    println!();
    println!(
        "{} {} summaries written to {}",
        "Done:".bold().green(),
        report.summaries.len().to_string().green().bold(),
        artifact.cyan()
    );
    if !report.skipped.is_empty() {
        println!(
            "  {} skipped (no transcript or description): {}",
            report.skipped.len().to_string().yellow(),
            report.skipped.join(", ").dimmed()
        );
    }
    if report.degraded > 0 {
        println!(
            "  {} responses kept as raw text (unparseable)",
            report.degraded.to_string().yellow()
        );
    }
    if report.failed > 0 {
        println!(
            "  {} generation calls failed",
            report.failed.to_string().yellow()
        );
    }
}
