use std::fmt;

use ndns_types::{ContentType, Name, RecordType};

/// Errors from the record factory and the management tool (spec §7 "Update
/// semantic errors", "Management pre-condition errors"). The authoritative
/// server never surfaces these to the network — it either answers or drops
/// (spec §4.5) — so this enum is consumed by management operations and by
/// the factory's own callers, not by `AuthServer::handle_interest`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ServerError {
    ZoneAlreadyExists(Name),
    ZoneNotFound(Name),
    /// Creating a non-root zone whose parent does not yet exist: there is
    /// nothing to sign the child's KSK with.
    ParentZoneNotFound(Name),
    /// The parent zone exists but has no recorded DSK, so it cannot issue a
    /// delegation certificate for the child.
    ParentMissingDsk(Name),
    /// The zone has no DSK on record; the factory has nothing to sign with.
    MissingDsk(Name),
    RrsetNotFound { label: Name, rr_type: RecordType },
    StaleVersion { current: u64, attempted: u64 },
    /// An explicit or inferred content-type tag that the record type
    /// rejects outright (spec §9's reject table).
    RejectedContentCombination {
        rr_type: RecordType,
        content_type: ContentType,
    },
    /// The update interest's embedded signed-Data component did not decode.
    MalformedUpdateEnvelope(String),
    Crypto(ndns_crypto::CryptoError),
    Store(ndns_store::StoreError),
    Wire(ndns_types::Error),
    Resolution(ndns_resolver::ResolutionError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::ZoneAlreadyExists(name) => write!(f, "a zone named '{name}' already exists"),
            ServerError::ZoneNotFound(name) => write!(f, "no zone named '{name}'"),
            ServerError::ParentZoneNotFound(name) => {
                write!(f, "parent zone of '{name}' does not exist")
            }
            ServerError::ParentMissingDsk(name) => {
                write!(f, "parent zone of '{name}' has no DSK on record")
            }
            ServerError::MissingDsk(name) => write!(f, "zone '{name}' has no DSK on record"),
            ServerError::RrsetNotFound { label, rr_type } => {
                write!(f, "no '{rr_type}' rrset at label '{label}'")
            }
            ServerError::StaleVersion { current, attempted } => write!(
                f,
                "update version {attempted} is not newer than the current version {current}"
            ),
            ServerError::RejectedContentCombination { rr_type, content_type } => write!(
                f,
                "record type '{rr_type}' cannot carry content-type '{content_type:?}'"
            ),
            ServerError::MalformedUpdateEnvelope(reason) => {
                write!(f, "malformed update envelope: {reason}")
            }
            ServerError::Crypto(err) => write!(f, "{err}"),
            ServerError::Store(err) => write!(f, "{err}"),
            ServerError::Wire(err) => write!(f, "{err}"),
            ServerError::Resolution(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<ndns_crypto::CryptoError> for ServerError {
    fn from(err: ndns_crypto::CryptoError) -> Self {
        ServerError::Crypto(err)
    }
}

impl From<ndns_store::StoreError> for ServerError {
    fn from(err: ndns_store::StoreError) -> Self {
        ServerError::Store(err)
    }
}

impl From<ndns_types::Error> for ServerError {
    fn from(err: ndns_types::Error) -> Self {
        ServerError::Wire(err)
    }
}

impl From<ndns_resolver::ResolutionError> for ServerError {
    fn from(err: ndns_resolver::ResolutionError) -> Self {
        ServerError::Resolution(err)
    }
}
