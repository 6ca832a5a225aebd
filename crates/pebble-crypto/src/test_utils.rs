//! Deterministic signing helpers for tests.

use k256::ecdsa::SigningKey;

use crate::address::Address;
use crate::hash::keccak256;
use crate::signer::{SignedRequest, request_digest};

/// A secp256k1 key derived from a label, for producing request signatures.
#[derive(Clone)]
pub struct TestSigner {
    key: SigningKey,
}

impl TestSigner {
    /// Derive a key from the Keccak-256 of `label`.
    #[allow(clippy::expect_used)]
    pub fn new(label: &str) -> Self {
        let key = SigningKey::from_slice(&keccak256(label.as_bytes()))
            .expect("keccak output is a valid scalar");
        Self { key }
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self.key.verifying_key())
    }

    /// 65-byte `r || s || v` signature over a prehashed digest.
    #[allow(clippy::expect_used)]
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Vec<u8> {
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .expect("signing a 32-byte digest");
        let mut out = sig.to_bytes().to_vec();
        out.push(recovery_id.to_byte());
        out
    }

    /// Fill in the signature field of `request`.
    #[allow(clippy::expect_used)]
    pub fn sign_request<T: SignedRequest>(&self, request: &mut T) {
        let digest = request_digest(request).expect("request serializes");
        let sig = self.sign_digest(&digest);
        request.set_signature(format!("0x{}", hex::encode(sig)));
    }
}
