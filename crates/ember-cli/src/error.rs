//! CLI error types

use ember_evm::EvmError;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Config file could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Execution could not be set up
    #[error("EVM error: {0}")]
    Evm(#[from] EvmError),

    /// RPC client could not be built
    #[error("RPC error: {0}")]
    Rpc(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
