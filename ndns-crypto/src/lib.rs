//! Signing and signature verification (spec §4.8, §9): the `Signer` trait
//! and an in-memory keychain implementing it, a `Certificate` type, and the
//! pure verification primitives the resolver's validator builds its
//! hierarchical trust walk on top of. The key store that actually produces
//! signatures in a real deployment is an external collaborator; this crate
//! only needs to behave like one well enough to make signing and
//! verification real.

mod certificate;
mod error;
mod keychain;

pub use certificate::Certificate;
pub use error::CryptoError;
pub use keychain::InMemoryKeychain;

use ndns_types::Name;

/// Produces signatures for named keys. A real deployment's signer lives
/// behind a key-management daemon (spec §1); `InMemoryKeychain` is the
/// in-process stand-in used by the server, the management tool, and every
/// test in this workspace.
pub trait Signer: Send + Sync {
    /// Generates a new Ed25519 key pair under `key_name`, returning its
    /// public key.
    fn generate_key(&self, key_name: Name) -> Result<Vec<u8>, CryptoError>;

    /// Signs `data` with the named key.
    fn sign(&self, key_name: &Name, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// The public key for a previously generated key name.
    fn public_key(&self, key_name: &Name) -> Result<Vec<u8>, CryptoError>;
}

/// Verifies an arbitrary signed payload against a raw Ed25519 public key.
/// Used by the resolver's validator to check an rrset's signature once it
/// has obtained the signing key's public key from a certificate.
pub fn verify(tbs: &[u8], signature: &[u8], public_key: &[u8]) -> Result<(), CryptoError> {
    let unparsed_key = ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, public_key);
    unparsed_key
        .verify(tbs, signature)
        .map_err(|_| CryptoError::VerificationFailed)
}
