use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use owo_colors::OwoColorize;
use rewatch_core::{
    CollectorConfig, Credentials, HistoryStore, HttpAutomationAgent, WatchWindow,
    WatchWindowCollector,
};

use crate::commands::{CommandError, Result};
use crate::gate::StdinGate;

pub async fn run(
    days: Option<i64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    output_dir: &PathBuf,
    store: Option<PathBuf>,
    max_rounds: usize,
) -> Result<()> {
    // All configuration is resolved before anything touches the network.
    let credentials = Credentials::from_env()?;
    let window = resolve_window(days, start_date, end_date)?;

    let agent = HttpAutomationAgent::from_env(&credentials)?;
    let gate = StdinGate;

    let store_path = store.unwrap_or_else(|| output_dir.join("video_info.json"));
    let mut store = HistoryStore::new(store_path);

    println!(
        "Fetching videos from {} to {}...",
        window.start.date_naive().to_string().cyan(),
        window.end.date_naive().to_string().cyan()
    );

    let mut config = CollectorConfig::new(window);
    config.max_rounds = max_rounds;
    let collector = WatchWindowCollector::new(&agent, &gate, &mut store, config);
    let report = collector.run().await?;

    println!();
    println!(
        "{} {} new videos in {} rounds ({})",
        "Collected:".bold().green(),
        report.new_urls.to_string().green().bold(),
        report.rounds,
        report.stop_reason
    );
    println!(
        "  {} records in the store at {}",
        report.merged.len().to_string().bold(),
        store.path().display().to_string().cyan()
    );

    if !report.rejections.is_empty() {
        println!(
            "  {} {} records rejected:",
            "Warning:".yellow().bold(),
            report.rejections.len()
        );
        for rejection in &report.rejections {
            println!("    - {} ({})", rejection, rejection.code_str().dimmed());
        }
    }

    Ok(())
}

fn resolve_window(
    days: Option<i64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<WatchWindow> {
    let end = match end_date {
        Some(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        None => Utc::now(),
    };

    let start = match (days, start_date) {
        (Some(n), _) => {
            if n <= 0 {
                return Err(CommandError::InvalidArgs(
                    "--days must be a positive number".to_string(),
                ));
            }
            end - Duration::days(n)
        }
        (None, Some(date)) => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        (None, None) => {
            return Err(CommandError::InvalidArgs(
                "one of --days or --start-date is required".to_string(),
            ));
        }
    };

    if start >= end {
        return Err(CommandError::InvalidArgs(format!(
            "start date {} is not before end date {}",
            start.date_naive(),
            end.date_naive()
        )));
    }

    Ok(WatchWindow { start, end })
}
