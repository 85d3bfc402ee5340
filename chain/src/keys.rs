//! Hot-wallet key derivation.
//!
//! The wallet identity is derived deterministically from a mnemonic seed
//! phrase: the phrase is hashed to a 32-byte seed, the seed becomes an
//! Ed25519 signing key, and the address is the configured prefix plus the
//! truncated hash of the public key.

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

/// The dispensing wallet's key pair and derived address.
pub struct WalletKey {
    signing: SigningKey,
    address: String,
}

impl WalletKey {
    /// Derive a key from a mnemonic phrase and a bech32-style address prefix.
    pub fn from_mnemonic(mnemonic: &str, prefix: &str) -> Self {
        let seed: [u8; 32] = Sha256::digest(mnemonic.trim().as_bytes()).into();
        let signing = SigningKey::from_bytes(&seed);

        let pubkey_hash = Sha256::digest(signing.verifying_key().as_bytes());
        let address = format!("{}1{}", prefix, hex::encode(&pubkey_hash[..20]));

        Self { signing, address }
    }

    /// The wallet's address, starting with the configured prefix.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().as_bytes())
    }

    /// Sign arbitrary bytes, returning the hex-encoded signature.
    pub fn sign_hex(&self, payload: &[u8]) -> String {
        hex::encode(self.signing.sign(payload).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = WalletKey::from_mnemonic("test test test", "wasm");
        let b = WalletKey::from_mnemonic("test test test", "wasm");
        assert_eq!(a.address(), b.address());
        assert_eq!(a.public_key_hex(), b.public_key_hex());
    }

    #[test]
    fn address_carries_prefix() {
        let key = WalletKey::from_mnemonic("alpha beta gamma", "juno");
        assert!(key.address().starts_with("juno1"));
        // prefix + "1" + 20-byte hex hash
        assert_eq!(key.address().len(), "juno1".len() + 40);
    }

    #[test]
    fn different_mnemonics_different_addresses() {
        let a = WalletKey::from_mnemonic("one", "wasm");
        let b = WalletKey::from_mnemonic("two", "wasm");
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn signature_is_stable_hex() {
        let key = WalletKey::from_mnemonic("one", "wasm");
        let s1 = key.sign_hex(b"payload");
        let s2 = key.sign_hex(b"payload");
        assert_eq!(s1, s2);
        assert_eq!(s1.len(), 128); // 64-byte Ed25519 signature
    }
}
