//! In-process oracle backed by maps. Used for local runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use pebble_crypto::Address;
use tokio::sync::RwLock;

use super::{OracleError, OwnershipOracle, TokenId};

/// Answers ownership queries from registered bindings and counts every call.
#[derive(Debug, Default)]
pub struct InMemoryOracle {
    tokens: RwLock<HashMap<Address, TokenId>>,
    owners: RwLock<HashMap<TokenId, Address>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `device` to `token` and make `owner` its holder.
    pub async fn register(&self, device: Address, token: TokenId, owner: Address) {
        self.tokens.write().await.insert(device, token);
        self.owners.write().await.insert(token, owner);
    }

    /// Move `token` to a new holder.
    pub async fn transfer(&self, token: TokenId, owner: Address) {
        self.owners.write().await.insert(token, owner);
    }

    /// Make every subsequent call fail with [`OracleError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Total number of oracle calls served or refused.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("oracle switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OwnershipOracle for InMemoryOracle {
    async fn token_for_device(&self, device: Address) -> Result<TokenId, OracleError> {
        self.enter()?;
        self.tokens
            .read()
            .await
            .get(&device)
            .copied()
            .ok_or_else(|| OracleError::Data(format!("device {device} has no ioID token")))
    }

    async fn owner_of(&self, token: TokenId) -> Result<Address, OracleError> {
        self.enter()?;
        self.owners
            .read()
            .await
            .get(&token)
            .copied()
            .ok_or_else(|| OracleError::Data(format!("token {token} does not exist")))
    }
}
