//! Crypto error types.

/// Errors from signature and address operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("invalid signature; could not recover public key: {0}")]
    SignatureRecoveryFailed(String),

    #[error("failed to canonicalize request: {0}")]
    Canonicalization(#[from] serde_json::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
