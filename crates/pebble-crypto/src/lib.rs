//! Pebble request authentication primitives.
//!
//! Devices and their owners sign JSON requests with secp256k1 keys. This
//! crate recovers the signing address from such a request:
//!
//! - **Canonical form**: compact JSON, declaration order, HTML-safe escapes
//! - **Digest**: Keccak-256 over the canonical form without the signature
//! - **Recovery**: 65-byte `r || s || v` signature, `v` in `0..=3`
//! - **Address**: last 20 bytes of the public key hash, EIP-55 rendered

pub mod address;
pub mod canonical;
pub mod error;
pub mod hash;
pub mod signer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::{ADDRESS_LEN, Address};
pub use canonical::canonical_json;
pub use error::CryptoError;
pub use hash::keccak256;
pub use signer::{
    SIGNATURE_LEN, SignedRequest, decode_signature, recover_address, recover_signer,
    request_digest,
};
