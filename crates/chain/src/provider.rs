//! The chain read seam and its HTTP JSON-RPC implementation.

use crate::error::{ChainError, ChainResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use url::Url;
use vaultscan_core::Address;

/// The read operations the discovery pipeline issues against a chain node.
///
/// Everything above this trait is transport-agnostic; tests substitute an
/// in-memory implementation.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Executes a read-only contract call (`eth_call`) at the latest block
    /// and returns the raw return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> ChainResult<Vec<u8>>;

    /// Returns the deployed bytecode at an address (`eth_getCode`); empty
    /// for accounts without code.
    async fn get_code(&self, at: Address) -> ChainResult<Vec<u8>>;

    /// Returns the chain id (`eth_chainId`); used as the connect-time probe.
    async fn chain_id(&self) -> ChainResult<u64>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC 2.0 client for Ethereum-compatible nodes.
pub struct EthRpcClient {
    endpoint: Url,
    http_client: Client,
    next_id: AtomicU64,
}

impl EthRpcClient {
    /// Creates a client with a default HTTP client.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Creates a client over an existing HTTP client, e.g. one carrying
    /// timeouts or proxy settings.
    #[must_use]
    pub fn with_client(http_client: Client, endpoint: Url) -> Self {
        Self {
            endpoint,
            http_client,
            next_id: AtomicU64::new(1),
        }
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one JSON-RPC request and returns the `result` value.
    async fn send(&self, method: &str, params: Value) -> ChainResult<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!(method, endpoint = %self.endpoint, "sending JSON-RPC request");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = body.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        body.result
            .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: no result returned")))
    }
}

#[async_trait]
impl ChainProvider for EthRpcClient {
    async fn call(&self, to: Address, data: Vec<u8>) -> ChainResult<Vec<u8>> {
        let params = json!([
            {
                "to": to.to_string(),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest",
        ]);
        let result = self.send("eth_call", params).await?;
        decode_hex_data(&result, "eth_call")
    }

    async fn get_code(&self, at: Address) -> ChainResult<Vec<u8>> {
        let params = json!([at.to_string(), "latest"]);
        let result = self.send("eth_getCode", params).await?;
        decode_hex_data(&result, "eth_getCode")
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        let result = self.send("eth_chainId", json!([])).await?;
        decode_hex_quantity(&result, "eth_chainId")
    }
}

fn hex_str<'a>(value: &'a Value, context: &str) -> ChainResult<&'a str> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::InvalidResponse(format!("{context}: expected hex string")))?;
    Ok(s.strip_prefix("0x").unwrap_or(s))
}

fn decode_hex_data(value: &Value, context: &str) -> ChainResult<Vec<u8>> {
    let s = hex_str(value, context)?;
    hex::decode(s).map_err(|e| ChainError::InvalidResponse(format!("{context}: {e}")))
}

fn decode_hex_quantity(value: &Value, context: &str) -> ChainResult<u64> {
    let s = hex_str(value, context)?;
    u64::from_str_radix(s, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("{context}: {e}")))
}
