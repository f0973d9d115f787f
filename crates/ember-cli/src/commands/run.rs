//! Execute a transaction against a contract

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use ember_evm::{
    CachedProvider, EmptyProvider, ExecutionConfig, Interpreter, RunResult, StateProvider, Word,
};
use serde_json::{json, Value};
use tracing::info;

use crate::config::{self, Overrides};
use crate::rpc::RpcProvider;
use crate::{output::Output, CliError};

/// Arguments for `ember run`
#[derive(Debug, Args)]
pub struct RunCommand {
    /// TOML execution config
    pub config: Option<PathBuf>,

    /// Bytecode hex for the `to` account, replacing any configured code
    #[arg(long)]
    pub code: Option<String>,

    /// Calldata hex
    #[arg(long)]
    pub calldata: Option<String>,

    /// JSON-RPC endpoint for accounts not seeded in the config
    #[arg(long, env = "EMBER_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Transaction gas limit
    #[arg(long)]
    pub gas_limit: Option<u64>,
}

impl RunCommand {
    /// Returns whether the run halted successfully
    pub fn execute(self, json: bool) -> Result<bool, CliError> {
        let mut config = config::load(self.config.as_deref())?;
        config::apply(
            &mut config,
            &Overrides {
                code: self.code,
                rpc_url: self.rpc_url,
                gas_limit: self.gas_limit,
                calldata: self.calldata,
            },
        );

        let provider = provider(&config)?;
        let mut interpreter = Interpreter::new(&config, provider)?;
        let result = interpreter.run();
        info!(halt = %result.halt, gas_used = result.gas_used(), "execution finished");

        render(&result, &interpreter.stack(), json).print();
        Ok(result.is_success())
    }
}

fn provider(config: &ExecutionConfig) -> Result<Arc<dyn StateProvider>, CliError> {
    match config::rpc_url(config) {
        Some(url) => {
            let rpc = RpcProvider::new(url)?;
            info!(url = rpc.url(), block = config.state_block(), "using remote state");
            Ok(Arc::new(CachedProvider::new(rpc)))
        }
        None => Ok(Arc::new(EmptyProvider)),
    }
}

fn word_hex(word: &Word) -> String {
    format!("0x{:x}", word)
}

fn render(result: &RunResult, stack: &[Word], json: bool) -> Output {
    let return_data = format!("0x{}", hex::encode(&result.return_data));

    let logs: Vec<Value> = result
        .logs
        .iter()
        .map(|log| {
            json!({
                "address": log.address.to_hex(),
                "topics": log.topics.iter().map(word_hex).collect::<Vec<_>>(),
                "data": format!("0x{}", hex::encode(&log.data)),
            })
        })
        .collect();

    let changes: Vec<Value> = result
        .storage_changes
        .iter()
        .map(|c| {
            json!({
                "address": c.address.to_hex(),
                "key": word_hex(&c.key),
                "original": word_hex(&c.original),
                "current": word_hex(&c.current),
            })
        })
        .collect();

    let mut output = Output::new(json)
        .field("halt", &result.halt.to_string())
        .field_bool("success", result.is_success())
        .field_u64("gas_used", result.gas_used())
        .field_u64("gas_remaining", result.gas_remaining)
        .field_i64("gas_refund", result.gas_refund)
        .field("return_data", &return_data)
        .field_value("stack", stack.iter().map(word_hex).collect())
        .field_value("logs", Value::Array(logs))
        .field_value("storage_changes", Value::Array(changes))
        .line(format!("Halt:        {}", result.halt))
        .line(format!("Gas used:    {}", result.gas_used()))
        .line(format!("Gas refund:  {}", result.gas_refund))
        .line(format!("Return data: {}", return_data));

    output = output.line(format!("Stack ({}):", stack.len()));
    for (i, word) in stack.iter().enumerate() {
        output = output.line(format!("  {:>4}: {}", i, word_hex(word)));
    }

    if !result.logs.is_empty() {
        output = output.line(format!("Logs ({}):", result.logs.len()));
        for log in &result.logs {
            let topics: Vec<String> = log.topics.iter().map(word_hex).collect();
            output = output.line(format!(
                "  {} [{}] 0x{}",
                log.address,
                topics.join(", "),
                hex::encode(&log.data)
            ));
        }
    }

    if !result.storage_changes.is_empty() {
        output = output.line(format!("Storage changes ({}):", result.storage_changes.len()));
        for c in &result.storage_changes {
            output = output.line(format!(
                "  {} {}: {} -> {}",
                c.address,
                word_hex(&c.key),
                word_hex(&c.original),
                word_hex(&c.current)
            ));
        }
    }

    output
}
