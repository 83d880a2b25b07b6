//! Agora CLI - configuration and scripted replay for the Agora governance
//! engine.

pub mod commands;
pub mod config;
pub mod output;
pub mod script;
pub mod telemetry;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = commands::Cli::parse();

    match &cli.log_file {
        Some(path) => telemetry::init_telemetry_with_file(&cli.log_level, path)?,
        None => telemetry::init_telemetry(&cli.log_level, cli.json_logs)?,
    }

    if let Err(e) = commands::execute(cli.command) {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
