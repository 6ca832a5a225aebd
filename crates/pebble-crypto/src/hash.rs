//! Keccak-256, the hash used for request digests, addresses and EIP-55.

use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 digest of `input`.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_digest() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn function_selector() {
        // ERC-721 ownerOf selector
        assert_eq!(hex::encode(&keccak256(b"ownerOf(uint256)")[..4]), "6352211e");
    }
}
