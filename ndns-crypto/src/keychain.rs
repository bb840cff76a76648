use std::collections::HashMap;
use std::sync::Mutex;

use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};

use ndns_types::Name;

use crate::error::CryptoError;
use crate::Signer;

/// An in-process keychain: Ed25519 key pairs indexed by key name, never
/// persisted. Stands in for the external key-management daemon (spec §1).
pub struct InMemoryKeychain {
    rng: SystemRandom,
    keys: Mutex<HashMap<Name, Ed25519KeyPair>>,
}

impl Default for InMemoryKeychain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKeychain {
    pub fn new() -> Self {
        InMemoryKeychain {
            rng: SystemRandom::new(),
            keys: Mutex::new(HashMap::new()),
        }
    }
}

impl Signer for InMemoryKeychain {
    fn generate_key(&self, key_name: Name) -> Result<Vec<u8>, CryptoError> {
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&self.rng).map_err(|_| CryptoError::MalformedKey)?;
        let keypair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|_| CryptoError::MalformedKey)?;
        let public_key = keypair.public_key().as_ref().to_vec();

        let mut keys = self.keys.lock().unwrap();
        if keys.contains_key(&key_name) {
            return Err(CryptoError::KeyAlreadyExists(key_name));
        }
        keys.insert(key_name, keypair);
        Ok(public_key)
    }

    fn sign(&self, key_name: &Name, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.lock().unwrap();
        let keypair = keys
            .get(key_name)
            .ok_or_else(|| CryptoError::SigningKeyNotFound(key_name.clone()))?;
        Ok(keypair.sign(data).as_ref().to_vec())
    }

    fn public_key(&self, key_name: &Name) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.lock().unwrap();
        let keypair = keys
            .get(key_name)
            .ok_or_else(|| CryptoError::SigningKeyNotFound(key_name.clone()))?;
        Ok(keypair.public_key().as_ref().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keychain = InMemoryKeychain::new();
        let key_name = Name::from_labels(&["net", "example", "KSK-1"]);
        let public_key = keychain.generate_key(key_name.clone()).unwrap();

        let signature = keychain.sign(&key_name, b"hello").unwrap();
        let unparsed =
            ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, &public_key);
        assert!(unparsed.verify(b"hello", &signature).is_ok());
    }

    #[test]
    fn generate_key_rejects_duplicate_names() {
        let keychain = InMemoryKeychain::new();
        let key_name = Name::from_labels(&["net", "example", "KSK-1"]);
        keychain.generate_key(key_name.clone()).unwrap();
        assert_eq!(
            Err(CryptoError::KeyAlreadyExists(key_name.clone())),
            keychain.generate_key(key_name)
        );
    }

    #[test]
    fn sign_with_unknown_key_fails() {
        let keychain = InMemoryKeychain::new();
        let key_name = Name::from_labels(&["net", "example", "KSK-1"]);
        assert_eq!(
            Err(CryptoError::SigningKeyNotFound(key_name.clone())),
            keychain.sign(&key_name, b"hello")
        );
    }
}
