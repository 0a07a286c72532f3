//! data-transfer-cli: run and inspect data-movement tasks

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use data_transfer_sdk::cli::CliError;
use data_transfer_sdk::cli::commands::{profile, run, test};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "data-transfer-cli")]
#[command(about = "Move data between databases, SaaS APIs and flat files")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "transfer.toml", global = true)]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task and print its execution log
    Run {
        /// Task id from the configuration
        #[arg(short, long)]
        task: String,
    },

    /// Test a named connection
    Test {
        /// Connection name from the configuration
        #[arg(long)]
        connection: String,
    },

    /// Extract a task's source and print the inferred schema
    Profile {
        /// Task id from the configuration
        #[arg(short, long)]
        task: String,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run { task } => run::handle_run(&cli.config, &task)
            .await
            .with_context(|| format!("running task '{task}'")),
        Commands::Test { connection } => test::handle_test(&cli.config, &connection)
            .await
            .with_context(|| format!("testing connection '{connection}'")),
        Commands::Profile { task } => profile::handle_profile(&cli.config, &task)
            .await
            .map(|()| true)
            .with_context(|| format!("profiling task '{task}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match dispatch(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(cli_err) => eprintln!("Error {}: {}", e, cli_err.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
