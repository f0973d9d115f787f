//! # ember
//!
//! Command-line front end for the Ember EVM interpreter.
//!
//! ## Usage
//!
//! ```bash
//! # Disassemble bytecode
//! ember disasm 0x6001600101
//!
//! # Execute a transaction described by a TOML config
//! ember run tx.toml
//! ember run --code 0x6001600101
//! ember --json run tx.toml --rpc-url http://localhost:8545
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;
mod output;
mod rpc;

pub use error::CliError;

/// Ember EVM interpreter
#[derive(Parser, Debug)]
#[command(name = "ember")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute bytecode against a transaction config
    Run(commands::run::RunCommand),
    /// Print the decoded instructions of bytecode
    Disasm(commands::disasm::DisasmCommand),
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json)?;

    let result = match cli.command {
        Commands::Run(cmd) => cmd.execute(cli.json),
        Commands::Disasm(cmd) => cmd.execute(cli.json).map(|()| true),
    };

    match result {
        Ok(true) => Ok(()),
        // halted without success; the result is already printed
        Ok(false) => std::process::exit(1),
        Err(e) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "error": e.to_string(),
                        "success": false
                    })
                );
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(2);
        }
    }
}
