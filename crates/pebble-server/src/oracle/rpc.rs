//! JSON-RPC `eth_call` implementation of [`OwnershipOracle`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pebble_core::config::ChainConfig;
use pebble_crypto::{Address, keccak256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{OracleError, OwnershipOracle, TokenId};

const DEVICE_TOKEN_ID: &str = "deviceTokenId(address)";
const OWNER_OF: &str = "ownerOf(uint256)";

/// Calls the ioID registry and token contracts through a node's JSON-RPC API.
#[derive(Debug)]
pub struct RpcOwnershipOracle {
    http: reqwest::Client,
    endpoint: String,
    ioid: Address,
    registry: Address,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (CallArgs<'a>, &'static str),
}

#[derive(Serialize)]
struct CallArgs<'a> {
    to: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcOwnershipOracle {
    /// Build an oracle from the chain settings. Both contract addresses are
    /// required.
    pub fn new(config: &ChainConfig) -> Result<Self, OracleError> {
        if config.rpc_endpoint.is_empty() {
            return Err(OracleError::Config("rpc_endpoint is empty".into()));
        }
        let ioid = parse_contract("ioid_contract", config.ioid_contract.as_deref())?;
        let registry = parse_contract(
            "ioid_registry_contract",
            config.ioid_registry_contract.as_deref(),
        )?;

        // reqwest is built without a bundled crypto provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OracleError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.rpc_endpoint.clone(),
            ioid,
            registry,
            next_id: AtomicU64::new(1),
        })
    }

    async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, OracleError> {
        let to = format!("{to:#x}");
        let data = format!("0x{}", hex::encode(data));
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "eth_call",
            params: (CallArgs { to: &to, data: &data }, "latest"),
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OracleError::Unavailable(format!(
                "node answered {}",
                status.as_u16()
            )));
        }

        let body: RpcResponse = resp
            .json()
            .await
            .map_err(|e| OracleError::Data(format!("invalid JSON-RPC response: {e}")))?;

        if let Some(err) = body.error {
            return Err(OracleError::Data(format!(
                "call to {to} failed ({}): {}",
                err.code, err.message
            )));
        }
        let result = body
            .result
            .ok_or_else(|| OracleError::Data("JSON-RPC response has no result".into()))?;
        let digits = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(digits).map_err(|e| OracleError::Data(format!("result is not hex: {e}")))
    }
}

#[async_trait]
impl OwnershipOracle for RpcOwnershipOracle {
    async fn token_for_device(&self, device: Address) -> Result<TokenId, OracleError> {
        let output = self
            .eth_call(self.registry, &encode_call(DEVICE_TOKEN_ID, address_word(&device)))
            .await?;
        let token = TokenId(first_word(&output)?);
        if token.is_zero() {
            return Err(OracleError::Data(format!("device {device} has no ioID token")));
        }
        debug!(device = %device, token = %token, "Resolved device token");
        Ok(token)
    }

    async fn owner_of(&self, token: TokenId) -> Result<Address, OracleError> {
        let output = self.eth_call(self.ioid, &encode_call(OWNER_OF, token.0)).await?;
        let word = first_word(&output)?;
        let owner = Address::from_slice_lenient(&word[12..]);
        debug!(token = %token, owner = %owner, "Resolved token owner");
        Ok(owner)
    }
}

fn parse_contract(name: &str, value: Option<&str>) -> Result<Address, OracleError> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OracleError::Config(format!("{name} is not set")))?;
    value
        .parse()
        .map_err(|e| OracleError::Config(format!("{name}: {e}")))
}

/// Function selector followed by a single 32-byte argument.
pub(super) fn encode_call(signature: &str, arg: [u8; 32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&keccak256(signature.as_bytes())[..4]);
    data.extend_from_slice(&arg);
    data
}

pub(super) fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub(super) fn first_word(output: &[u8]) -> Result<[u8; 32], OracleError> {
    output
        .get(..32)
        .and_then(|w| <[u8; 32]>::try_from(w).ok())
        .ok_or_else(|| {
            OracleError::Data(format!("expected a 32-byte word, got {} bytes", output.len()))
        })
}
