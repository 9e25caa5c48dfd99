// ABOUTME: Entry point for the dbcutover CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use dbcutover::config::Config;
use dbcutover::error::Result;
use dbcutover::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli.command, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    match command {
        Commands::Init { instance, force } => commands::init(instance.as_deref(), force, output),
        Commands::Plan => commands::plan(discover()?, output),
        Commands::Rehearse { realtime } => commands::rehearse(discover()?, realtime, output).await,
    }
}

fn discover() -> Result<Config> {
    let cwd = env::current_dir()?;
    Config::discover(&cwd)
}
