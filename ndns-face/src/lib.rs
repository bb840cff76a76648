//! The transport abstraction (spec §1 "transport face"): an `Interest`/
//! `Data` envelope and a `Face` trait for sending interests and
//! registering interest filters, plus an in-memory simulated forwarder.
//!
//! A real face sits on top of a network socket or a local forwarder's IPC
//! protocol; that is an external collaborator (spec.md §1). `InMemoryForwarder`
//! is grounded in `tests/dummy-forwarder.{cpp,hpp}`'s `DummyForwarder`: a
//! forwarder stub where every registered face can see every other
//! registered face's interests and data, used so the resolver, the
//! authoritative server, and the CLI tools can be exercised end to end
//! without a real NFD.

mod forwarder;

pub use forwarder::{InMemoryFace, InMemoryForwarder};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ndns_types::Name;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request for a single named data object, optionally carrying a
/// forwarding hint (spec §4.6's "forwarding-hint propagation").
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Interest {
    pub name: Name,
    pub must_be_fresh: bool,
    pub forwarding_hint: Option<Vec<Name>>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Interest {
            name,
            must_be_fresh: true,
            forwarding_hint: None,
        }
    }

    pub fn with_forwarding_hint(mut self, hint: Vec<Name>) -> Self {
        self.forwarding_hint = Some(hint);
        self
    }
}

/// A signed data object: the wire envelope around an `ndns_types::Response`
/// (carried as `content`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Data {
    pub name: Name,
    pub content: Vec<u8>,
    pub key_locator: Name,
    pub signature: Vec<u8>,
}

/// Errors a `Face` can report back to a caller awaiting an interest.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FaceError {
    /// No registered prefix covers the interest's name.
    NoRoute,
    /// A producer was reached but declined to answer (network-layer NACK,
    /// distinct from the application-layer `Content::Nack`).
    Nacked,
    Timeout,
}

impl fmt::Display for FaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceError::NoRoute => write!(f, "no route to the requested name"),
            FaceError::Nacked => write!(f, "interest was nacked"),
            FaceError::Timeout => write!(f, "interest timed out"),
        }
    }
}

impl std::error::Error for FaceError {}

/// A handler registered against a name prefix, invoked for every interest
/// the forwarder routes to that prefix.
pub trait InterestHandler: Send + Sync {
    fn handle_interest(&self, interest: Interest) -> BoxFuture<'static, Option<Data>>;
}

/// The transport abstraction used by the resolver and the authoritative
/// server alike: send an interest and await a data reply, or register to
/// answer interests under a prefix.
pub trait Face: Send + Sync {
    fn send_interest(&self, interest: Interest) -> BoxFuture<'_, Result<Data, FaceError>>;
    fn register_prefix(&self, prefix: Name, handler: Arc<dyn InterestHandler>);
}
