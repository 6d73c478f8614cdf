use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use adw::config::AdwConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "adw")]
#[command(version, about = "Autonomous issue-to-commit workflow")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a spec for an issue and commit it
    Plan { issue: u64 },
    /// Implement a spec and run the static check
    Build {
        issue: u64,
        /// Spec file, relative to the working directory
        spec_path: PathBuf,
    },
    /// Run tests, asking the agent for fixes between failing runs
    Test {
        issue: u64,
        /// Spec file, relative to the working directory
        spec_path: PathBuf,
    },
    /// Commit all changes, push, and close the issue
    Commit {
        issue: u64,
        /// Test attempts to report in the closing comment
        #[arg(long, default_value = "1")]
        test_attempts: u32,
    },
    /// Run the full guarded cycle for one issue
    Run { issue: u64 },
    /// Run all four phases without touching the marker labels
    Cycle {
        issue: u64,
        /// Persist the result snapshot
        #[arg(long)]
        save_state: bool,
    },
    /// Start the webhook listener
    Serve {
        #[arg(short, long, env = "WEBHOOK_PORT", default_value = "5000")]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
    /// Show the last recorded cycle for an issue
    Status {
        issue: u64,
        /// Print the raw snapshot
        #[arg(long)]
        json: bool,
    },
    /// Show effective configuration
    Config {
        /// Only report validation warnings
        #[arg(long)]
        validate: bool,
    },
}

impl Commands {
    /// Commands that drive the workflow also log to `workflow.log`.
    fn logs_to_file(&self) -> bool {
        !matches!(self, Commands::Status { .. } | Commands::Config { .. })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Env-backed arguments can come from a .env in the working directory
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let _ = dotenvy::from_path(project_dir.join(".env"));

    let config = AdwConfig::load(&project_dir);
    let logs_dir = match (&config, cli.command.logs_to_file()) {
        (Ok(config), true) => Some(config.logs_dir()),
        _ => None,
    };
    let _log_guard = adw::logging::init(cli.verbose, logs_dir.as_deref());
    let config = config?;

    let success = match cli.command {
        Commands::Plan { issue } => cmd::cmd_plan(config, issue).await?,
        Commands::Build { issue, spec_path } => cmd::cmd_build(config, issue, spec_path).await?,
        Commands::Test { issue, spec_path } => cmd::cmd_test(config, issue, spec_path).await?,
        Commands::Commit {
            issue,
            test_attempts,
        } => cmd::cmd_commit(config, issue, test_attempts).await?,
        Commands::Run { issue } => cmd::cmd_run(config, issue).await?,
        Commands::Cycle { issue, save_state } => cmd::cmd_cycle(config, issue, save_state).await?,
        Commands::Serve { port, host } => cmd::cmd_serve(config, host, port).await?,
        Commands::Status { issue, json } => cmd::cmd_status(&config, issue, json)?,
        Commands::Config { validate } => cmd::cmd_config(&config, validate)?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
