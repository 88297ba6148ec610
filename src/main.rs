// ABOUTME: Entry point for the skiff CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use skiff::commands;
use skiff::config::{self, Config};
use skiff::error::{Error, Result};
use skiff::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    let result = run(cli, output).await;

    if let Err(e) = result {
        match e {
            // Expected first-run flow: the operator has a file to edit.
            Error::VariablesCreated(_) => eprintln!("{e}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    match cli.command {
        Commands::Init { project, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, project.as_deref(), force)
        }
        Commands::Deploy { environment } => {
            let config = load_config(environment.as_deref())?;
            commands::deploy(config, output).await
        }
        Commands::Destroy { yes, environment } => {
            if !yes {
                return Err(Error::DestroyNotConfirmed);
            }
            let config = load_config(environment.as_deref())?;
            commands::destroy(config, output).await
        }
        Commands::Verify { environment } => {
            let config = load_config(environment.as_deref())?;
            commands::verify(config, output).await
        }
        Commands::Smoke { environment } => {
            let config = load_config(environment.as_deref())?;
            commands::smoke(config, output).await
        }
    }
}

fn load_config(environment: Option<&str>) -> Result<Config> {
    let cwd = env::current_dir()?;
    let config = Config::discover(&cwd)?;
    match environment {
        Some(name) => config.for_environment(name),
        None => Ok(config),
    }
}
