use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rewatch")]
#[command(about = "rewatch - collect and summarize your YouTube watch history")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  rewatch collect --days 7                   Collect the last week of history
  rewatch collect --start-date 2024-02-01 --end-date 2024-02-15
  rewatch summarize                          Summarize the stored history

\x1b[1;36mConfiguration:\x1b[0m
  GOOGLE_USERNAME / GOOGLE_PASSWORD          Sign-in for the automation agent
  OPENAI_API_KEY                             Generation service key
  REWATCH_AGENT_URL                          Automation agent endpoint

\x1b[1;36mMore Info:\x1b[0m
  rewatch <command> --help                   Get help for any command")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect watch history through the automation agent and merge it into
    /// the store
    ///
    /// Exactly one of --days or --start-date selects the window. Batches are
    /// merged and persisted as they arrive, so partial progress survives an
    /// interrupted run.
    #[command(group(ArgGroup::new("window").required(true).args(["days", "start_date"])))]
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  rewatch collect --days 7
  rewatch collect --start-date 2024-02-01
  rewatch collect --start-date 2024-02-01 --end-date 2024-02-15")]
    Collect {
        /// Number of days to look back from the end date
        #[arg(long)]
        days: Option<i64>,

        /// Start date (YYYY-MM-DD, UTC)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// End date (YYYY-MM-DD, UTC); defaults to now
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Directory for artifacts
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,

        /// Path to the history store (defaults to <output-dir>/video_info.json)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Safety cap on fetch/scroll rounds
        #[arg(long, default_value_t = rewatch_core::DEFAULT_MAX_ROUNDS)]
        max_rounds: usize,
    },

    /// Summarize recently watched videos from the store
    ///
    /// Fetches each video's transcript (falling back to its description),
    /// asks the generation service for a structured summary, and writes a
    /// dated artifact. Transcript and generation failures degrade per video;
    /// they never abort the run.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  rewatch summarize
  rewatch summarize --days 14 --model gpt-4o")]
    Summarize {
        /// Only summarize videos watched within this many days
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Directory for artifacts
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,

        /// Path to the history store (defaults to <output-dir>/video_info.json)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Generation model
        #[arg(long)]
        model: Option<String>,
    },
}
