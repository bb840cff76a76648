use std::fmt;

use ndns_types::{Name, RecordType};

/// An error from resolving a name (spec §7 "Timeouts", "Protocol errors").
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResolutionError {
    /// The controller was aborted: a timeout, too many LINK redirects, or
    /// the interest-count bound was exceeded.
    Aborted { target: Name, reason: String },
    /// A fetched `Data` packet didn't decode, or arrived for a type/label
    /// combination that doesn't make sense in context. The resolver drops
    /// these and logs, matching spec §7's "Protocol errors... logged and
    /// abort client-side".
    Protocol { target: Name, reason: String },
    /// The certificate fetcher exhausted its retries without obtaining a
    /// usable certificate (spec §4.7 `CANNOT_RETRIEVE_CERT`).
    CannotRetrieveCert { key_name: Name },
    /// The name does not exist, proven by a `DOE` record (or a bare NACK
    /// with no proof attached).
    NoSuchName { target: Name, rr_type: RecordType },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::Aborted { target, reason } => {
                write!(f, "aborted resolving '{target}': {reason}")
            }
            ResolutionError::Protocol { target, reason } => {
                write!(f, "protocol error resolving '{target}': {reason}")
            }
            ResolutionError::CannotRetrieveCert { key_name } => {
                write!(f, "could not retrieve a certificate for '{key_name}'")
            }
            ResolutionError::NoSuchName { target, rr_type } => {
                write!(f, "no '{rr_type}' record at '{target}'")
            }
        }
    }
}

impl std::error::Error for ResolutionError {}
