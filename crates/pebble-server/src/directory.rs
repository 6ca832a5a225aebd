//! Device ownership resolution.
//!
//! The local store is authoritative for every device it knows. A device seen
//! for the first time on the write path is registered from the ioID
//! contracts; the read path never consults the chain.

use std::sync::Arc;

use pebble_crypto::{Address, CryptoError};
use tracing::{info, instrument};

use crate::oracle::{OracleError, OwnershipOracle};
use crate::storage::{DatabaseError, Device, DeviceStatus, NewDevice, PebbleDatabase};

/// Prefix of decentralized device identifiers.
pub const DID_PREFIX: &str = "did:io:";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("device {0} does not exist")]
    NotFound(String),

    #[error("{signer} has no permission to access device {device_id}")]
    PermissionDenied { device_id: String, signer: Address },

    #[error("device id {device_id} is not an address: {source}")]
    InvalidDeviceId {
        device_id: String,
        #[source]
        source: CryptoError,
    },

    #[error("failed to query device owner on chain: {0}")]
    Oracle(#[from] OracleError),

    #[error("device store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Local device registry with on-chain bootstrap.
#[derive(Clone)]
pub struct DeviceDirectory {
    db: PebbleDatabase,
    oracle: Arc<dyn OwnershipOracle>,
}

impl DeviceDirectory {
    pub fn new(db: PebbleDatabase, oracle: Arc<dyn OwnershipOracle>) -> Self {
        Self { db, oracle }
    }

    /// Read path: the device must already be registered to `signer`.
    pub async fn authorize(
        &self,
        device_id: &str,
        signer: &Address,
    ) -> Result<Device, DirectoryError> {
        let device = self
            .db
            .get_device(device_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(device_id.to_string()))?;
        check_owner(device, signer)
    }

    /// Write path: like [`authorize`](Self::authorize), but an unknown device
    /// is registered when the chain says `signer` holds its token.
    ///
    /// Concurrent first contacts race to the same upsert with the same
    /// answer, so no lock is taken around the oracle round-trip.
    pub async fn resolve(
        &self,
        device_id: &str,
        signer: &Address,
    ) -> Result<Device, DirectoryError> {
        match self.db.get_device(device_id).await? {
            Some(device) => check_owner(device, signer),
            None => self.bootstrap(device_id, signer).await,
        }
    }

    #[instrument(skip(self, signer), fields(signer = %signer))]
    async fn bootstrap(
        &self,
        device_id: &str,
        signer: &Address,
    ) -> Result<Device, DirectoryError> {
        let address = device_address(device_id)?;
        let token = self.oracle.token_for_device(address).await?;
        let owner = self.oracle.owner_of(token).await?;
        if owner != *signer {
            return Err(DirectoryError::PermissionDenied {
                device_id: device_id.to_string(),
                signer: *signer,
            });
        }

        let device = self
            .db
            .upsert_device(&NewDevice {
                id: device_id.to_string(),
                owner: owner.to_string(),
                address: address.to_string(),
                status: DeviceStatus::Confirmed,
                proposer: signer.to_string(),
            })
            .await?;
        info!(device_id, token = %token, owner = %owner, "Device registered from chain");
        Ok(device)
    }
}

fn check_owner(device: Device, signer: &Address) -> Result<Device, DirectoryError> {
    if device.owner != signer.to_string() {
        return Err(DirectoryError::PermissionDenied {
            device_id: device.id,
            signer: *signer,
        });
    }
    Ok(device)
}

/// On-chain address of a device: the id with any `did:io:` prefix removed,
/// read as hex and fitted to 20 bytes.
pub fn device_address(device_id: &str) -> Result<Address, DirectoryError> {
    let hex = device_id.strip_prefix(DID_PREFIX).unwrap_or(device_id);
    Address::from_hex_lenient(hex).map_err(|source| DirectoryError::InvalidDeviceId {
        device_id: device_id.to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[path = "directory_tests.rs"]
mod tests;
