//! CLI command implementations.

use std::path::PathBuf;

use agora_governance::{Dao, DaoConfig};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{self, ConfigFile};
use crate::output::{print_events, print_success, print_summary, print_warning};
use crate::script::{self, Replayer};

/// Main CLI.
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(about = "Agora - reputation-weighted DAO governance engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Log filter directive
    #[arg(short, long, global = true, default_value = "warn", env = "AGORA_LOG")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default configuration
    InitConfig {
        /// Destination file
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check a configuration file
    Validate {
        /// Config file path
        config: PathBuf,
    },
    /// Replay a JSON script against a fresh engine and print the event log
    Replay {
        /// Config file path; defaults apply when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Script file
        script: PathBuf,
        /// Continue past failing steps
        #[arg(long)]
        keep_going: bool,
        /// Print the event log as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn execute(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            DaoConfig::default().to_file(&path)?;
            print_success(&format!("Wrote default configuration to {}", path.display()));
        }
        Commands::Validate { config } => {
            config::load(Some(&config))?;
            print_success(&format!("{} is valid", config.display()));
        }
        Commands::Replay {
            config,
            script,
            keep_going,
            json,
        } => {
            let config = config::load(config.as_deref())?;
            let steps = script::load(&script)?;
            info!(steps = steps.len(), "replaying {}", script.display());

            let mut replayer = Replayer::new(Dao::new(&config)?);
            let failures = replayer.run(&steps, keep_going)?;

            print_events(replayer.dao().events(), json)?;
            if !json {
                print_summary(replayer.dao(), replayer.proposals())?;
            }
            for failure in &failures {
                print_warning(&format!(
                    "step {} ({}) failed: {:#}",
                    failure.index, failure.op, failure.error
                ));
            }
        }
    }
    Ok(())
}
