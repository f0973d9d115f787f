//! JSON-RPC state provider
//!
//! Blocking `eth_getCode`, `eth_getBalance` and `eth_getStorageAt` calls
//! against a single endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use ember_evm::{decode_hex, ProviderError, StateProvider, Word};
use ember_primitives::{Address, BlockNumber};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::CliError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResponse {
    Success { result: Value },
    Error { error: RpcErrorBody },
}

/// State provider backed by an Ethereum JSON-RPC endpoint
pub struct RpcProvider {
    client: reqwest::blocking::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcProvider {
    /// Connect to `url`
    pub fn new(url: impl Into<String>) -> Result<Self, CliError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CliError::Rpc(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, method: &str, params: Vec<Value>) -> Result<String, ProviderError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!(endpoint = %self.url, ?request, "sending rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .json::<RpcResponse>()
            .map_err(|e| invalid(method, e))?;

        match response {
            RpcResponse::Success { result } => {
                debug!(method, "rpc request successful");
                parse_result(method, result)
            }
            RpcResponse::Error { error } => Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

impl StateProvider for RpcProvider {
    fn get_code(&self, address: Address, block: BlockNumber) -> Result<Bytes, ProviderError> {
        let result = self.request("eth_getCode", vec![json!(address.to_hex()), block_tag(block)])?;
        decode_hex(&result)
            .map(Bytes::from)
            .map_err(|e| invalid("eth_getCode", e))
    }

    fn get_balance(&self, address: Address, block: BlockNumber) -> Result<Word, ProviderError> {
        let result =
            self.request("eth_getBalance", vec![json!(address.to_hex()), block_tag(block)])?;
        parse_quantity("eth_getBalance", &result)
    }

    fn get_storage_at(
        &self,
        address: Address,
        slot: Word,
        block: BlockNumber,
    ) -> Result<Word, ProviderError> {
        let result = self.request(
            "eth_getStorageAt",
            vec![
                json!(address.to_hex()),
                json!(format!("0x{}", slot.to_hex_string())),
                block_tag(block),
            ],
        )?;
        parse_quantity("eth_getStorageAt", &result)
    }
}

fn block_tag(block: BlockNumber) -> Value {
    json!(format!("0x{:x}", block))
}

fn invalid(method: &str, reason: impl ToString) -> ProviderError {
    ProviderError::InvalidResponse {
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_result(method: &str, result: Value) -> Result<String, ProviderError> {
    match result {
        Value::String(s) => Ok(s),
        other => Err(invalid(method, format!("expected hex string, got {}", other))),
    }
}

fn parse_quantity(method: &str, s: &str) -> Result<Word, ProviderError> {
    if s == "0x" {
        return Ok(Word::ZERO);
    }
    Word::from_hex(s).map_err(|e| invalid(method, e))
}
