use anyhow::Context;
use clap::Parser;
use iprof::cli::{Cli, Command};
use iprof::error::exit_code;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `IPROF_LOG=iprof=debug`
const LOG_ENV: &str = "IPROF_LOG";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(iprof_err) = e.downcast_ref::<iprof::Error>() {
                ExitCode::from(iprof_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    cli.validate()
        .map_err(iprof::Error::InvalidArgument)
        .context("Invalid arguments")?;

    init_logging();

    match cli.command {
        Command::Demo {
            workload,
            duration,
            percentiles,
            json,
            csv,
        } => {
            iprof::commands::demo::run(&workload, duration, &percentiles, json, csv)?;
        }
        Command::Watch {
            workload,
            interval,
            pace,
        } => {
            iprof::tui::run(&workload, interval, pace)?;
        }
        Command::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "iprof", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Logs go to stderr so report output on stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
