//! Read-only on-chain ownership queries.
//!
//! Consulted only when a device is seen for the first time, to find the
//! account that holds the device's ioID token.

mod memory;
mod rpc;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
#[path = "rpc_tests.rs"]
mod rpc_tests;

use std::fmt;

use async_trait::async_trait;
use pebble_crypto::Address;

pub use memory::InMemoryOracle;
pub use rpc::RpcOwnershipOracle;

/// 256-bit ERC-721 token id, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenId(pub [u8; 32]);

impl TokenId {
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({self})")
    }
}

/// Oracle failures. All of them are server-side faults for the caller.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Node unreachable, timed out, or answered with a non-success status.
    #[error("ownership oracle unavailable: {0}")]
    Unavailable(String),

    /// The call reverted or returned something that is not an answer.
    #[error("ownership oracle data error: {0}")]
    Data(String),

    #[error("ownership oracle configuration error: {0}")]
    Config(String),
}

/// Ownership lookups against the ioID contracts.
#[async_trait]
pub trait OwnershipOracle: Send + Sync {
    /// Token bound to a device address in the ioID registry.
    async fn token_for_device(&self, device: Address) -> Result<TokenId, OracleError>;

    /// Current holder of an ioID token.
    async fn owner_of(&self, token: TokenId) -> Result<Address, OracleError>;
}
