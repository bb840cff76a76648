//! The zone-store contract (spec §4.3): the repository interface the
//! authoritative server and management tool use to persist zones and
//! rrsets. The real, persistent, relational implementation lives outside
//! this codebase; this crate owns the trait plus an in-memory
//! implementation good enough to run the server and its test suite.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, RwLock};

use ndns_types::{Name, RecordType, Rrset, RrsetId, Zone, ZoneId};

/// Errors from the zone store (spec §7 "Store errors").
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    ZoneNotFound(Name),
    ZoneAlreadyExists(Name),
    RrsetNotFound { label: Name, rr_type: RecordType },
    StaleVersion { current: u64, attempted: u64 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ZoneNotFound(name) => write!(f, "no zone named '{name}'"),
            StoreError::ZoneAlreadyExists(name) => write!(f, "a zone named '{name}' already exists"),
            StoreError::RrsetNotFound { label, rr_type } => {
                write!(f, "no '{rr_type}' rrset at label '{label}'")
            }
            StoreError::StaleVersion { current, attempted } => write!(
                f,
                "update version {attempted} is not newer than the current version {current}"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

/// The parameters for inserting a new rrset; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRrset {
    pub zone: ZoneId,
    pub label: Name,
    pub rr_type: RecordType,
    pub version: u64,
    pub ttl: u32,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

/// The zone-store contract. All operations are synchronous: the reference
/// implementation is an in-memory structure, and a real relational-backed
/// implementation would perform its own internal async-to-sync bridging
/// or blocking IO, as `resolved`'s own store abstraction does.
pub trait ZoneStore: Send + Sync {
    fn insert_zone(&self, name: Name, default_ttl: u32) -> Result<Zone, StoreError>;
    fn find_zone(&self, name: &Name) -> Result<Zone, StoreError>;
    fn find_zone_by_id(&self, id: ZoneId) -> Result<Zone, StoreError>;
    fn list_zones(&self) -> Vec<Zone>;
    fn remove_zone(&self, id: ZoneId) -> Result<(), StoreError>;

    fn set_zone_info(&self, id: ZoneId, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    fn get_zone_info(&self, id: ZoneId, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set_zone_keys(
        &self,
        id: ZoneId,
        ksk_name: Option<Name>,
        dsk_name: Option<Name>,
        dkey_name: Option<Name>,
    ) -> Result<(), StoreError>;

    fn insert_rrset(&self, new: NewRrset) -> Result<Rrset, StoreError>;
    fn find_rrset(
        &self,
        zone: ZoneId,
        label: &Name,
        rr_type: RecordType,
    ) -> Result<Rrset, StoreError>;
    /// The rrset whose label is the greatest label strictly less than
    /// `label` within this zone, regardless of type. Used to construct a
    /// DoE lower-bound proof for an absent name (spec §4.3, §4.5).
    fn find_rrset_lower_bound(&self, zone: ZoneId, label: &Name) -> Option<Rrset>;
    /// The rrset whose label is the least label strictly greater than
    /// `label` within this zone, regardless of type. Paired with
    /// `find_rrset_lower_bound` to bracket an absent name for a DoE proof.
    fn find_rrset_upper_bound(&self, zone: ZoneId, label: &Name) -> Option<Rrset>;
    fn list_rrsets_by_zone(&self, zone: ZoneId) -> Vec<Rrset>;
    fn update_rrset(
        &self,
        id: RrsetId,
        version: u64,
        ttl: u32,
        data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<Rrset, StoreError>;
    fn remove_rrset(&self, id: RrsetId) -> Result<(), StoreError>;
    fn remove_by_zone_and_type(&self, zone: ZoneId, rr_type: RecordType) -> Result<usize, StoreError>;
}

#[derive(Default)]
struct Inner {
    next_zone_id: u64,
    next_rrset_id: u64,
    zones: HashMap<ZoneId, Zone>,
    zone_by_name: HashMap<Name, ZoneId>,
    rrsets: HashMap<RrsetId, Rrset>,
    rrset_index: HashMap<(ZoneId, Name, RecordType), RrsetId>,
    labels_by_zone: BTreeMap<ZoneId, BTreeSet<Name>>,
}

/// An in-memory store satisfying the `ZoneStore` contract. Good enough to
/// run the authoritative server, the management tool, and every test in
/// this workspace; a persistent implementation is an external
/// collaborator.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    // Guards the `labels_by_zone` index against concurrent readers seeing
    // a half-updated set while an insert/remove is in progress across the
    // two maps it touches.
    index_lock: RwLock<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            inner: Mutex::new(Inner::default()),
            index_lock: RwLock::new(()),
        }
    }

    fn first_rrset_at_label(inner: &Inner, zone: ZoneId, label: &Name) -> Option<Rrset> {
        inner
            .rrset_index
            .iter()
            .find(|(key, _)| key.0 == zone && key.1 == *label)
            .and_then(|(_, id)| inner.rrsets.get(id).cloned())
    }
}

impl ZoneStore for InMemoryStore {
    fn insert_zone(&self, name: Name, default_ttl: u32) -> Result<Zone, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.zone_by_name.contains_key(&name) {
            return Err(StoreError::ZoneAlreadyExists(name));
        }
        let id = ZoneId(inner.next_zone_id);
        inner.next_zone_id += 1;
        let zone = Zone::new(id, name.clone(), default_ttl);
        inner.zone_by_name.insert(name, id);
        inner.zones.insert(id, zone.clone());
        inner.labels_by_zone.insert(id, BTreeSet::new());
        Ok(zone)
    }

    fn find_zone(&self, name: &Name) -> Result<Zone, StoreError> {
        let inner = self.inner.lock().unwrap();
        let id = inner
            .zone_by_name
            .get(name)
            .ok_or_else(|| StoreError::ZoneNotFound(name.clone()))?;
        Ok(inner.zones[id].clone())
    }

    fn find_zone_by_id(&self, id: ZoneId) -> Result<Zone, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .zones
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::ZoneNotFound(Name::root()))
    }

    fn list_zones(&self) -> Vec<Zone> {
        let inner = self.inner.lock().unwrap();
        let mut zones: Vec<Zone> = inner.zones.values().cloned().collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones
    }

    fn remove_zone(&self, id: ZoneId) -> Result<(), StoreError> {
        let _guard = self.index_lock.write().unwrap();
        let mut inner = self.inner.lock().unwrap();
        let zone = inner
            .zones
            .remove(&id)
            .ok_or_else(|| StoreError::ZoneNotFound(Name::root()))?;
        inner.zone_by_name.remove(&zone.name);
        inner.labels_by_zone.remove(&id);
        inner.rrset_index.retain(|(z, _, _), _| *z != id);
        inner.rrsets.retain(|_, rrset| rrset.zone != id);
        Ok(())
    }

    fn set_zone_info(&self, id: ZoneId, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let zone = inner
            .zones
            .get_mut(&id)
            .ok_or_else(|| StoreError::ZoneNotFound(Name::root()))?;
        zone.set_info(key, value);
        Ok(())
    }

    fn get_zone_info(&self, id: ZoneId, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let zone = inner
            .zones
            .get(&id)
            .ok_or_else(|| StoreError::ZoneNotFound(Name::root()))?;
        Ok(zone.get_info(key).cloned())
    }

    fn set_zone_keys(
        &self,
        id: ZoneId,
        ksk_name: Option<Name>,
        dsk_name: Option<Name>,
        dkey_name: Option<Name>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let zone = inner
            .zones
            .get_mut(&id)
            .ok_or_else(|| StoreError::ZoneNotFound(Name::root()))?;
        if ksk_name.is_some() {
            zone.ksk_name = ksk_name;
        }
        if dsk_name.is_some() {
            zone.dsk_name = dsk_name;
        }
        if dkey_name.is_some() {
            zone.dkey_name = dkey_name;
        }
        Ok(())
    }

    fn insert_rrset(&self, new: NewRrset) -> Result<Rrset, StoreError> {
        let _guard = self.index_lock.write().unwrap();
        let mut inner = self.inner.lock().unwrap();
        if !inner.zones.contains_key(&new.zone) {
            return Err(StoreError::ZoneNotFound(Name::root()));
        }

        let key = (new.zone, new.label.clone(), new.rr_type);
        if let Some(existing_id) = inner.rrset_index.get(&key).copied() {
            let existing = &inner.rrsets[&existing_id];
            if new.version <= existing.version {
                return Err(StoreError::StaleVersion {
                    current: existing.version,
                    attempted: new.version,
                });
            }
        }

        let id = RrsetId(inner.next_rrset_id);
        inner.next_rrset_id += 1;
        let rrset = Rrset {
            id,
            zone: new.zone,
            label: new.label.clone(),
            rr_type: new.rr_type,
            version: new.version,
            ttl: new.ttl,
            data: new.data,
            signature: new.signature,
        };
        inner.rrsets.insert(id, rrset.clone());
        inner.rrset_index.insert(key, id);
        inner
            .labels_by_zone
            .entry(new.zone)
            .or_default()
            .insert(new.label);
        Ok(rrset)
    }

    fn find_rrset(
        &self,
        zone: ZoneId,
        label: &Name,
        rr_type: RecordType,
    ) -> Result<Rrset, StoreError> {
        let inner = self.inner.lock().unwrap();
        let id = inner
            .rrset_index
            .get(&(zone, label.clone(), rr_type))
            .ok_or_else(|| StoreError::RrsetNotFound {
                label: label.clone(),
                rr_type,
            })?;
        Ok(inner.rrsets[id].clone())
    }

    fn find_rrset_lower_bound(&self, zone: ZoneId, label: &Name) -> Option<Rrset> {
        let inner = self.inner.lock().unwrap();
        let labels = inner.labels_by_zone.get(&zone)?;
        let predecessor = labels.range(..label.clone()).next_back()?.clone();
        Self::first_rrset_at_label(&inner, zone, &predecessor)
    }

    fn find_rrset_upper_bound(&self, zone: ZoneId, label: &Name) -> Option<Rrset> {
        let inner = self.inner.lock().unwrap();
        let labels = inner.labels_by_zone.get(&zone)?;
        let mut above = labels.range(label.clone()..);
        let first = above.next();
        let successor = match first {
            Some(l) if l == label => above.next()?.clone(),
            Some(l) => l.clone(),
            None => return None,
        };
        Self::first_rrset_at_label(&inner, zone, &successor)
    }

    fn list_rrsets_by_zone(&self, zone: ZoneId) -> Vec<Rrset> {
        let inner = self.inner.lock().unwrap();
        let mut rrsets: Vec<Rrset> = inner
            .rrsets
            .values()
            .filter(|rrset| rrset.zone == zone)
            .cloned()
            .collect();
        rrsets.sort_by(|a, b| a.label.cmp(&b.label).then(a.rr_type.cmp(&b.rr_type)));
        rrsets
    }

    fn update_rrset(
        &self,
        id: RrsetId,
        version: u64,
        ttl: u32,
        data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<Rrset, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let existing = inner
            .rrsets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::RrsetNotFound {
                label: Name::root(),
                rr_type: RecordType::Txt,
            })?;
        if version <= existing.version {
            return Err(StoreError::StaleVersion {
                current: existing.version,
                attempted: version,
            });
        }
        let updated = Rrset {
            version,
            ttl,
            data,
            signature,
            ..existing
        };
        inner.rrsets.insert(id, updated.clone());
        Ok(updated)
    }

    fn remove_rrset(&self, id: RrsetId) -> Result<(), StoreError> {
        let _guard = self.index_lock.write().unwrap();
        let mut inner = self.inner.lock().unwrap();
        let rrset = inner
            .rrsets
            .remove(&id)
            .ok_or_else(|| StoreError::RrsetNotFound {
                label: Name::root(),
                rr_type: RecordType::Txt,
            })?;
        inner
            .rrset_index
            .remove(&(rrset.zone, rrset.label.clone(), rrset.rr_type));
        let label_still_used = inner
            .rrset_index
            .keys()
            .any(|(z, l, _)| *z == rrset.zone && *l == rrset.label);
        if !label_still_used {
            if let Some(labels) = inner.labels_by_zone.get_mut(&rrset.zone) {
                labels.remove(&rrset.label);
            }
        }
        Ok(())
    }

    fn remove_by_zone_and_type(&self, zone: ZoneId, rr_type: RecordType) -> Result<usize, StoreError> {
        let _guard = self.index_lock.write().unwrap();
        let mut inner = self.inner.lock().unwrap();
        let ids: Vec<RrsetId> = inner
            .rrsets
            .values()
            .filter(|rrset| rrset.zone == zone && rrset.rr_type == rr_type)
            .map(|rrset| rrset.id)
            .collect();
        let count = ids.len();
        for id in ids {
            let rrset = inner.rrsets.remove(&id).unwrap();
            inner
                .rrset_index
                .remove(&(rrset.zone, rrset.label.clone(), rrset.rr_type));
            let label_still_used = inner
                .rrset_index
                .keys()
                .any(|(z, l, _)| *z == rrset.zone && *l == rrset.label);
            if !label_still_used {
                if let Some(labels) = inner.labels_by_zone.get_mut(&rrset.zone) {
                    labels.remove(&rrset.label);
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_zone_rejects_duplicates() {
        let store = InMemoryStore::new();
        let name = Name::from_labels(&["net", "example"]);
        store.insert_zone(name.clone(), 3600).unwrap();
        assert_eq!(
            Err(StoreError::ZoneAlreadyExists(name.clone())),
            store.insert_zone(name, 3600)
        );
    }

    #[test]
    fn insert_rrset_rejects_stale_version() {
        let store = InMemoryStore::new();
        let name = Name::from_labels(&["net", "example"]);
        let zone = store.insert_zone(name, 3600).unwrap();
        let label = Name::from_labels(&["www"]);

        store
            .insert_rrset(NewRrset {
                zone: zone.id,
                label: label.clone(),
                rr_type: RecordType::Txt,
                version: 2,
                ttl: 3600,
                data: vec![1],
                signature: vec![],
            })
            .unwrap();

        assert_eq!(
            Err(StoreError::StaleVersion {
                current: 2,
                attempted: 1
            }),
            store.insert_rrset(NewRrset {
                zone: zone.id,
                label,
                rr_type: RecordType::Txt,
                version: 1,
                ttl: 3600,
                data: vec![2],
                signature: vec![],
            })
        );
    }

    #[test]
    fn lower_and_upper_bound_bracket_an_absent_label() {
        let store = InMemoryStore::new();
        let name = Name::from_labels(&["net", "example"]);
        let zone = store.insert_zone(name, 3600).unwrap();

        for label in ["alice", "carol", "eve"] {
            store
                .insert_rrset(NewRrset {
                    zone: zone.id,
                    label: Name::from_labels(&[label]),
                    rr_type: RecordType::Txt,
                    version: 1,
                    ttl: 3600,
                    data: vec![],
                    signature: vec![],
                })
                .unwrap();
        }

        let absent = Name::from_labels(&["bob"]);
        let lower = store.find_rrset_lower_bound(zone.id, &absent).unwrap();
        let upper = store.find_rrset_upper_bound(zone.id, &absent).unwrap();
        assert_eq!(Name::from_labels(&["alice"]), lower.label);
        assert_eq!(Name::from_labels(&["carol"]), upper.label);
    }

    #[test]
    fn cascading_zone_delete_removes_rrsets() {
        let store = InMemoryStore::new();
        let name = Name::from_labels(&["net", "example"]);
        let zone = store.insert_zone(name, 3600).unwrap();
        store
            .insert_rrset(NewRrset {
                zone: zone.id,
                label: Name::from_labels(&["www"]),
                rr_type: RecordType::Txt,
                version: 1,
                ttl: 3600,
                data: vec![],
                signature: vec![],
            })
            .unwrap();

        store.remove_zone(zone.id).unwrap();
        assert_eq!(0, store.list_rrsets_by_zone(zone.id).len());
    }
}
