//! Signer recovery for JSON requests.
//!
//! A request is signed over the Keccak-256 of its canonical JSON with the
//! signature field emptied (and therefore omitted). The signature is the
//! 65-byte `r || s || v` form, hex encoded with a `0x` prefix.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::Serialize;

use crate::address::Address;
use crate::canonical::canonical_json;
use crate::error::CryptoError;
use crate::hash::keccak256;

/// Length of a recoverable signature: `r` (32) + `s` (32) + `v` (1).
pub const SIGNATURE_LEN: usize = 65;

/// A request that carries its own signature as a hex string.
pub trait SignedRequest: Serialize + Clone {
    fn signature(&self) -> &str;

    fn set_signature(&mut self, signature: String);
}

/// Digest a request is signed over: Keccak-256 of the canonical JSON of a
/// copy with the signature cleared.
pub fn request_digest<T: SignedRequest>(request: &T) -> Result<[u8; 32], CryptoError> {
    let mut unsigned = request.clone();
    unsigned.set_signature(String::new());
    Ok(keccak256(&canonical_json(&unsigned)?))
}

/// Decode a `0x`-prefixed hex signature.
///
/// Only the encoding is checked here; length and recovery id problems
/// surface from [`recover_address`].
pub fn decode_signature(signature: &str) -> Result<Vec<u8>, CryptoError> {
    let digits = signature
        .strip_prefix("0x")
        .or_else(|| signature.strip_prefix("0X"))
        .ok_or_else(|| CryptoError::InvalidSignatureFormat("missing 0x prefix".into()))?;
    hex::decode(digits).map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))
}

/// Recover the address that produced `signature` over `digest`.
///
/// High-S signatures are accepted and normalized before recovery.
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::SignatureRecoveryFailed(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }

    let recovery_id = RecoveryId::from_byte(signature[64]).ok_or_else(|| {
        CryptoError::SignatureRecoveryFailed(format!("invalid recovery id {}", signature[64]))
    })?;
    let mut sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CryptoError::SignatureRecoveryFailed(e.to_string()))?;

    let recovery_id = match sig.normalize_s() {
        Some(normalized) => {
            sig = normalized;
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced())
        }
        None => recovery_id,
    };

    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| CryptoError::SignatureRecoveryFailed(e.to_string()))?;
    Ok(Address::from_public_key(&key))
}

/// Recover the signer of `request`.
pub fn recover_signer<T: SignedRequest>(request: &T) -> Result<Address, CryptoError> {
    let digest = request_digest(request)?;
    let signature = decode_signature(request.signature())?;
    recover_address(&digest, &signature)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;
    use crate::test_utils::TestSigner;

    #[derive(Debug, Clone, Serialize)]
    struct Ping {
        #[serde(rename = "deviceID")]
        device_id: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        signature: String,
    }

    impl SignedRequest for Ping {
        fn signature(&self) -> &str {
            &self.signature
        }

        fn set_signature(&mut self, signature: String) {
            self.signature = signature;
        }
    }

    fn ping(id: &str) -> Ping {
        Ping {
            device_id: id.to_string(),
            signature: String::new(),
        }
    }

    #[test]
    fn recovers_the_signing_key() {
        let signer = TestSigner::new("owner");
        let mut req = ping("did:io:0x01");
        signer.sign_request(&mut req);

        assert!(req.signature.starts_with("0x"));
        assert_eq!(req.signature.len(), 2 + SIGNATURE_LEN * 2);
        assert_eq!(recover_signer(&req).unwrap(), signer.address());
    }

    #[test]
    fn digest_ignores_signature_field() {
        let signer = TestSigner::new("owner");
        let mut req = ping("did:io:0x01");
        let before = request_digest(&req).unwrap();
        signer.sign_request(&mut req);
        assert_eq!(request_digest(&req).unwrap(), before);
    }

    #[test]
    fn tampered_field_recovers_another_address() {
        let signer = TestSigner::new("owner");
        let mut req = ping("did:io:0x01");
        signer.sign_request(&mut req);
        req.device_id = "did:io:0x02".to_string();

        // Either recovery fails or it yields an unrelated key.
        if let Ok(addr) = recover_signer(&req) {
            assert_ne!(addr, signer.address());
        }
    }

    #[test]
    fn missing_prefix_is_a_format_error() {
        let mut req = ping("x");
        req.signature = "abcd".into();
        assert!(matches!(
            recover_signer(&req),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
    }

    #[test]
    fn non_hex_is_a_format_error() {
        assert!(matches!(
            decode_signature("0xzz"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
    }

    #[test]
    fn bare_prefix_fails_recovery() {
        let mut req = ping("x");
        req.signature = "0x".into();
        assert!(matches!(
            recover_signer(&req),
            Err(CryptoError::SignatureRecoveryFailed(_))
        ));
    }

    #[test]
    fn out_of_range_recovery_id_fails() {
        let signer = TestSigner::new("owner");
        let digest = [7u8; 32];
        let mut sig = signer.sign_digest(&digest);
        sig[64] = 27;
        assert!(matches!(
            recover_address(&digest, &sig),
            Err(CryptoError::SignatureRecoveryFailed(_))
        ));
    }

    #[test]
    fn high_s_signature_recovers_same_address() {
        let signer = TestSigner::new("owner");
        let digest = [9u8; 32];
        let raw = signer.sign_digest(&digest);

        let sig = Signature::from_slice(&raw[..64]).unwrap();
        let (r, s) = sig.split_scalars();
        let high_s = -*s.as_ref();
        let high = Signature::from_scalars(r.to_bytes(), high_s.to_bytes()).unwrap();
        let mut flipped = high.to_bytes().to_vec();
        flipped.push(raw[64] ^ 1);

        assert_eq!(recover_address(&digest, &flipped).unwrap(), signer.address());
    }
}
