use std::fmt;

use ndns_types::Name;

/// Errors from signing and signature verification (spec §7 "Cryptographic
/// errors").
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CryptoError {
    SigningKeyNotFound(Name),
    KeyAlreadyExists(Name),
    VerificationFailed,
    MalformedKey,
    ChainBroken(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::SigningKeyNotFound(name) => write!(f, "no signing key named '{name}'"),
            CryptoError::KeyAlreadyExists(name) => write!(f, "a key named '{name}' already exists"),
            CryptoError::VerificationFailed => write!(f, "signature verification failed"),
            CryptoError::MalformedKey => write!(f, "malformed key material"),
            CryptoError::ChainBroken(reason) => write!(f, "certificate chain broken: {reason}"),
        }
    }
}

impl std::error::Error for CryptoError {}
