//! The two device operations: ownership query and telemetry submission.
//!
//! Both authenticate by recovering the signer of the JSON request. A query
//! only reads; a submission may register an unseen device, then decodes the
//! envelope and applies it.

use std::sync::Arc;

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine, alphabet};
use pebble_crypto::{CryptoError, SignedRequest, recover_signer};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::directory::{DeviceDirectory, DirectoryError};
use crate::dispatch::{Applied, dispatch};
use crate::envelope::{self, DecodeError};
use crate::oracle::{OracleError, OwnershipOracle};
use crate::storage::{DatabaseError, Device, PebbleDatabase};

/// Unpadded URL-safe base64 for envelope payloads. Non-zero trailing bits in
/// the last symbol are ignored, which existing device firmware relies on.
const PAYLOAD_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

// =============================================================================
// Requests and responses
// =============================================================================

/// Ownership query, signed over `{"deviceID": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

/// Telemetry submission, signed over `{"deviceID": ..., "payload": ...}`.
///
/// `payload` is an unpadded URL-safe base64 envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveRequest {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub payload: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

impl SignedRequest for QueryRequest {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

impl SignedRequest for ReceiveRequest {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: i32,
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub firmware: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Who is at fault for a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or undecodable input. Retrying unchanged will fail again.
    Client,
    /// The signer does not control the device.
    Authorization,
    /// Store, oracle or serialization failure.
    Server,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid request payload: {0}")]
    InvalidRequest(String),

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("invalid signature; could not recover public key: {0}")]
    SignatureRecoveryFailed(String),

    #[error("invalid device id {device_id}: {reason}")]
    InvalidDeviceId { device_id: String, reason: String },

    #[error("failed to decode base64 data: {0}")]
    InvalidPayloadEncoding(#[source] base64::DecodeError),

    #[error("device {0} does not exist")]
    DeviceNotFound(String),

    #[error("no permission to access device {device_id}")]
    PermissionDenied { device_id: String, signer: String },

    #[error("failed to unmarshal payload: unknown envelope type {0}")]
    UnknownEnvelopeType(i32),

    #[error("failed to unmarshal payload: {0}")]
    MalformedPayload(String),

    #[error("failed to {op} for device {device_id}: {source}")]
    Oracle {
        op: &'static str,
        device_id: String,
        #[source]
        source: OracleError,
    },

    #[error("failed to {op} for device {device_id}: {source}")]
    Store {
        op: &'static str,
        device_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to process request data: {0}")]
    Canonicalization(#[source] serde_json::Error),
}

impl ServiceError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidSignatureFormat(_)
            | Self::SignatureRecoveryFailed(_)
            | Self::InvalidDeviceId { .. }
            | Self::InvalidPayloadEncoding(_)
            | Self::DeviceNotFound(_)
            | Self::UnknownEnvelopeType(_)
            | Self::MalformedPayload(_) => ErrorKind::Client,
            Self::PermissionDenied { .. } => ErrorKind::Authorization,
            Self::Oracle { .. } | Self::Store { .. } | Self::Canonicalization(_) => {
                ErrorKind::Server
            }
        }
    }

    /// Stable machine-readable classification.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidSignatureFormat(_) => "invalid_signature_format",
            Self::SignatureRecoveryFailed(_) => "signature_recovery_failed",
            Self::InvalidDeviceId { .. } => "invalid_device_id",
            Self::InvalidPayloadEncoding(_) => "invalid_payload_encoding",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::UnknownEnvelopeType(_) => "unknown_envelope_type",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Oracle {
                source: OracleError::Unavailable(_),
                ..
            } => "oracle_unavailable",
            Self::Oracle { .. } => "oracle_data_error",
            Self::Store { .. } => "store_error",
            Self::Canonicalization(_) => "canonicalization_failed",
        }
    }

    /// Message safe to return to the caller. Server faults do not expose
    /// their cause.
    pub fn public_message(&self) -> String {
        match self {
            Self::Oracle { op, .. } | Self::Store { op, .. } => format!("failed to {op}"),
            Self::Canonicalization(_) => "failed to process request data".to_string(),
            other => other.to_string(),
        }
    }

    fn from_directory(err: DirectoryError, op: &'static str, device_id: &str) -> Self {
        match err {
            DirectoryError::NotFound(device_id) => Self::DeviceNotFound(device_id),
            DirectoryError::PermissionDenied { device_id, signer } => Self::PermissionDenied {
                device_id,
                signer: signer.to_string(),
            },
            DirectoryError::InvalidDeviceId { device_id, source } => Self::InvalidDeviceId {
                device_id,
                reason: source.to_string(),
            },
            DirectoryError::Oracle(source) => Self::Oracle {
                op: "query device owner on chain",
                device_id: device_id.to_string(),
                source,
            },
            DirectoryError::Store(source) => Self::Store {
                op,
                device_id: device_id.to_string(),
                source,
            },
        }
    }

    fn log(&self, op: &str, device_id: &str) {
        match self.kind() {
            ErrorKind::Server => {
                error!(op, device_id, code = self.code(), error = %self, "Request failed");
            }
            ErrorKind::Client | ErrorKind::Authorization => {
                warn!(op, device_id, code = self.code(), error = %self, "Request rejected");
            }
        }
    }
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidSignatureFormat(msg) => Self::InvalidSignatureFormat(msg),
            CryptoError::SignatureRecoveryFailed(msg) | CryptoError::InvalidAddress(msg) => {
                Self::SignatureRecoveryFailed(msg)
            }
            CryptoError::Canonicalization(e) => Self::Canonicalization(e),
        }
    }
}

impl From<DecodeError> for ServiceError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownEnvelopeType(t) => Self::UnknownEnvelopeType(t),
            DecodeError::MalformedPayload(msg) => Self::MalformedPayload(msg),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}

// =============================================================================
// Service
// =============================================================================

/// Device operations over shared store and oracle handles.
#[derive(Clone)]
pub struct DeviceService {
    db: PebbleDatabase,
    directory: DeviceDirectory,
}

impl DeviceService {
    pub fn new(db: PebbleDatabase, oracle: Arc<dyn OwnershipOracle>) -> Self {
        let directory = DeviceDirectory::new(db.clone(), oracle);
        Self { db, directory }
    }

    /// Ownership and firmware status of a registered device.
    #[instrument(skip(self, request), fields(op = "query", device_id = %request.device_id))]
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, ServiceError> {
        let result = self.query_inner(&request).await;
        if let Err(e) = &result {
            e.log("query", &request.device_id);
        }
        result
    }

    /// Authenticate, resolve and apply one telemetry envelope.
    #[instrument(skip(self, request), fields(op = "receive", device_id = %request.device_id))]
    pub async fn receive(&self, request: ReceiveRequest) -> Result<Applied, ServiceError> {
        let result = self.receive_inner(&request).await;
        match &result {
            Ok(applied) => info!(applied = ?applied, "Envelope applied"),
            Err(e) => e.log("receive", &request.device_id),
        }
        result
    }

    async fn query_inner(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError> {
        require("deviceID", &request.device_id)?;
        require("signature", &request.signature)?;

        let signer = recover_signer(request)?;
        let device = self
            .directory
            .authorize(&request.device_id, &signer)
            .await
            .map_err(|e| ServiceError::from_directory(e, "query device", &request.device_id))?;

        let mut response = QueryResponse {
            status: device.status,
            owner: device.owner.clone(),
            ..QueryResponse::default()
        };
        self.fill_firmware(&device, &mut response).await?;
        Ok(response)
    }

    /// Firmware details come from the app named by the first half of a
    /// two-part `"<appID> <version>"` firmware string.
    async fn fill_firmware(
        &self,
        device: &Device,
        response: &mut QueryResponse,
    ) -> Result<(), ServiceError> {
        let parts: Vec<&str> = device.real_firmware.split(' ').collect();
        let [app_id, _] = parts.as_slice() else {
            return Ok(());
        };

        let app = self
            .db
            .get_app(app_id)
            .await
            .map_err(|source| ServiceError::Store {
                op: "query app",
                device_id: device.id.clone(),
                source,
            })?;
        if let Some(app) = app {
            response.firmware = app.id;
            response.uri = app.uri;
            response.version = app.version;
        }
        Ok(())
    }

    async fn receive_inner(&self, request: &ReceiveRequest) -> Result<Applied, ServiceError> {
        require("deviceID", &request.device_id)?;
        require("payload", &request.payload)?;
        require("signature", &request.signature)?;

        let signer = recover_signer(request)?;
        let device = self
            .directory
            .resolve(&request.device_id, &signer)
            .await
            .map_err(|e| ServiceError::from_directory(e, "query device", &request.device_id))?;

        let payload = PAYLOAD_ENCODING
            .decode(&request.payload)
            .map_err(ServiceError::InvalidPayloadEncoding)?;
        let (envelope, message) = envelope::decode(&payload)?;

        dispatch(&self.db, &device.id, &envelope, &message)
            .await
            .map_err(|source| ServiceError::Store {
                op: "apply message",
                device_id: device.id.clone(),
                source,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
#[path = "service_tests.rs"]
mod tests;
