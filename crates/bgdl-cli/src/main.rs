//! CLI entry point - the composition root.
//!
//! Parses arguments, installs logging, bootstraps the registry and
//! dispatches to the command handlers.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bgdl_cli::handlers::{self, start::StartArgs};
use bgdl_cli::{Cli, CliConfig, CliError, Commands, bootstrap};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig::with_defaults()
        .with_data_dir(cli.data_dir)
        .with_poll_interval(Duration::from_millis(cli.poll_ms.max(1)));
    let ctx = bootstrap(&config)?;

    match cli.command {
        Commands::Start {
            url,
            file_path,
            policy,
            headers,
            wait,
        } => {
            let args = StartArgs {
                url,
                file_path,
                policy,
                headers,
                wait,
            };
            handlers::start::execute(&ctx, args).await?;
        }
        Commands::List => {
            handlers::list::execute(&ctx).await?;
        }
        Commands::Wait { file_path } => {
            handlers::wait::execute(&ctx, &file_path).await?;
        }
        Commands::Cancel { file_path } => {
            handlers::cancel::execute(&ctx, &file_path).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e}");
            let code = u8::try_from(e.exit_code()).unwrap_or(1);
            Ok(ExitCode::from(code))
        }
    }
}
