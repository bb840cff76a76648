//! The zone and rrset data model (spec §3). These are the records the store
//! persists; `ndns-store` defines the repository interface over them.

use std::collections::HashMap;

use crate::name::{Component, Name, RecordType};

/// An opaque, arena-style identifier. Zones and rrsets are identified by
/// these rather than by reference, so the store can hand out owned copies
/// without an in-memory object graph (spec §9 "Design Notes").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ZoneId(pub u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RrsetId(pub u64);

/// A zone: a node in the NDNS hierarchy owned by a cryptographic identity.
///
/// The signing key hierarchy is KSK (key-signing key, the zone's trust
/// root) signs DSK (delegation-signing key, used for day-to-day rrset
/// signing) signs DKEY (the certificate naming the parent's delegation to
/// this zone). `ksk_name`/`dsk_name`/`dkey_name` hold the *names* of the
/// corresponding certificates; the certificates themselves live as CERT
/// rrsets and the private keys live in the signer's keychain
/// (`ndns-crypto`), not here.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: Name,
    pub default_ttl: u32,
    pub ksk_name: Option<Name>,
    pub dsk_name: Option<Name>,
    pub dkey_name: Option<Name>,
    /// Free-form key/value metadata (spec §6 schema's `zone_info` table).
    pub zone_info: HashMap<String, Vec<u8>>,
}

impl Zone {
    pub fn new(id: ZoneId, name: Name, default_ttl: u32) -> Self {
        Zone {
            id,
            name,
            default_ttl,
            ksk_name: None,
            dsk_name: None,
            dkey_name: None,
            zone_info: HashMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn set_info(&mut self, key: &str, value: Vec<u8>) {
        self.zone_info.insert(key.to_string(), value);
    }

    pub fn get_info(&self, key: &str) -> Option<&Vec<u8>> {
        self.zone_info.get(key)
    }
}

/// A resource record set: one signed, versioned answer for
/// `(zone, label, type)`.
///
/// `data` is the complete pre-signed wire encoding (a serialised
/// `Response`, spec §4.2) and `signature` is the detached signature over
/// it, both computed once by the record factory at creation or update time
/// — the store never inspects, reconstructs, or re-signs either, it only
/// stores and retrieves the bytes the factory produced.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Rrset {
    pub id: RrsetId,
    pub zone: ZoneId,
    pub label: Name,
    pub rr_type: RecordType,
    pub version: u64,
    pub ttl: u32,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Rrset {
    /// The label ordering used for DoE lower-bound lookups (spec §4.3):
    /// this must agree with `Name`'s canonical `Ord` so that a store
    /// backed by a sorted index returns the correct predecessor.
    pub fn label_key(&self) -> &[Component] {
        &self.label.components
    }
}
