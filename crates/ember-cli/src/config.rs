//! Execution config loading

use std::path::Path;

use ember_evm::{ExecutionConfig, ProviderConfig};
use tracing::debug;

use crate::CliError;

/// Command-line overrides applied on top of the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Bytecode for the `to` account
    pub code: Option<String>,
    /// JSON-RPC endpoint
    pub rpc_url: Option<String>,
    /// Transaction gas limit
    pub gas_limit: Option<u64>,
    /// Calldata hex
    pub calldata: Option<String>,
}

/// Load a TOML config, or the defaults when no path is given
pub fn load(path: Option<&Path>) -> Result<ExecutionConfig, CliError> {
    let Some(path) = path else {
        return Ok(ExecutionConfig::default());
    };
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), "loaded config");
    parse(&content)
}

/// Parse TOML config text
pub fn parse(content: &str) -> Result<ExecutionConfig, CliError> {
    toml::from_str(content).map_err(|e| CliError::Config(e.to_string()))
}

/// Apply command-line overrides
pub fn apply(config: &mut ExecutionConfig, overrides: &Overrides) {
    if let Some(code) = &overrides.code {
        config.set_code(code);
    }
    if let Some(url) = &overrides.rpc_url {
        match config.provider.as_mut() {
            Some(provider) => provider.rpc_url = url.clone(),
            None => {
                config.provider = Some(ProviderConfig {
                    rpc_url: url.clone(),
                    block_number: None,
                })
            }
        }
    }
    if let Some(gas_limit) = overrides.gas_limit {
        config.transaction.gas_limit = gas_limit;
    }
    if let Some(calldata) = &overrides.calldata {
        config.transaction.calldata = calldata.clone();
    }
}

/// RPC endpoint, if the config names a usable one
pub fn rpc_url(config: &ExecutionConfig) -> Option<&str> {
    config
        .provider
        .as_ref()
        .map(|p| p.rpc_url.trim())
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[block]
number = 12

[transaction]
to = "0x00000000000000000000000000000000000000cc"
gas_limit = 50000

[provider]
rpc_url = "http://localhost:8545"
block_number = 11
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.block.number, 12);
        assert_eq!(config.transaction.gas_limit, 50_000);
        assert_eq!(config.state_block(), 11);
        assert_eq!(rpc_url(&config), Some("http://localhost:8545"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse("[block\nnumber = 1"), Err(CliError::Config(_))));
        assert!(matches!(parse("[block]\nnumber = \"x\""), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load(Some(Path::new("/nonexistent/ember.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let mut config = ExecutionConfig::default();
        assert_eq!(rpc_url(&config), None);
        apply(
            &mut config,
            &Overrides {
                code: Some("0x6001".into()),
                rpc_url: Some("http://node:8545".into()),
                gas_limit: Some(30_000),
                calldata: Some("0xff".into()),
            },
        );
        assert_eq!(config.contracts[0].bytecode, "0x6001");
        assert_eq!(rpc_url(&config), Some("http://node:8545"));
        assert_eq!(config.transaction.gas_limit, 30_000);
        assert_eq!(config.transaction.calldata, "0xff");
    }
}
