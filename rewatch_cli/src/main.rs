use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod gate;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Collect {
            days,
            start_date,
            end_date,
            output_dir,
            store,
            max_rounds,
        } => {
            commands::collect::run(
                *days,
                *start_date,
                *end_date,
                output_dir,
                store.clone(),
                *max_rounds,
            )
            .await
        }
        Commands::Summarize {
            days,
            output_dir,
            store,
            model,
        } => commands::summarize::run(*days, output_dir, store.clone(), model.clone()).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        if e.wants_usage() {
            eprintln!();
            let _ = Cli::command().print_help();
        }
        process::exit(1);
    }
}
