//! The zone-management tool (spec §5, original `src/mgmt/management-tool.cpp`):
//! the offline counterpart to `AuthServer` — creates/deletes zones, mints
//! the KSK/DSK signing hierarchy, and inserts/removes/lists rrsets directly
//! against the store rather than over the network.

use std::sync::Arc;

use ndns_crypto::{Certificate, Signer};
use ndns_store::{NewRrset, ZoneStore};
use ndns_types::{Name, RecordType, Rrset, Zone};

use crate::error::ServerError;
use crate::factory::{RecordFactory, SignedRrset, VersionSpec};

/// The content a caller wants `add_rr` to publish; dispatches to the
/// matching typed `RecordFactory::generate_*` method (spec §4.4).
#[derive(Debug, Clone)]
pub enum RrContent {
    Ns(Vec<Name>),
    Txt(Vec<String>),
    Cert(Certificate),
    Auth,
    Doe { lower_bound: Name, upper_bound: Name },
}

pub struct ManagementTool {
    store: Arc<dyn ZoneStore>,
    signer: Arc<dyn Signer>,
}

impl ManagementTool {
    pub fn new(store: Arc<dyn ZoneStore>, signer: Arc<dyn Signer>) -> Self {
        ManagementTool { store, signer }
    }

    fn parent_name(zone_name: &Name) -> Name {
        zone_name.prefix(zone_name.len().saturating_sub(1))
    }

    fn store_cert_rrset(&self, zone: &Zone, label: &str, cert: &Certificate) -> Result<(), ServerError> {
        let factory = RecordFactory::new(zone.clone(), self.signer.as_ref());
        let rrset = factory.generate_cert_rrset(Name::from_labels(&[label]), VersionSpec::Explicit(1), zone.default_ttl, cert)?;
        self.insert(zone.id, rrset)
    }

    fn insert(&self, zone: ndns_types::ZoneId, rrset: SignedRrset) -> Result<(), ServerError> {
        self.store.insert_rrset(NewRrset {
            zone,
            label: rrset.label,
            rr_type: rrset.rr_type,
            version: rrset.version,
            ttl: rrset.ttl,
            data: rrset.data,
            signature: rrset.signature,
        })?;
        Ok(())
    }

    /// Creates `zone_name`, generating its KSK and DSK and publishing both
    /// certificates as the zone's own `KSK-1`/`DSK-1` CERT rrsets.
    ///
    /// The root zone's KSK is self-signed (spec §9 "KSK self-signed-root
    /// bootstrap"). A non-root zone's KSK is signed by its parent's DSK —
    /// the DKEY bridging the two zones (spec glossary) — so the parent
    /// zone must already exist and have a DSK on record.
    pub fn create_zone(&self, zone_name: Name, default_ttl: u32) -> Result<Zone, ServerError> {
        if self.store.find_zone(&zone_name).is_ok() {
            return Err(ServerError::ZoneAlreadyExists(zone_name));
        }

        let ksk_name = zone_name.append_label("KSK-1");
        let ksk_public = self.signer.generate_key(ksk_name.clone())?;
        let ksk_issuer = if zone_name.is_empty() {
            ksk_name.clone()
        } else {
            let parent_name = Self::parent_name(&zone_name);
            let parent = self
                .store
                .find_zone(&parent_name)
                .map_err(|_| ServerError::ParentZoneNotFound(zone_name.clone()))?;
            parent
                .dsk_name
                .clone()
                .ok_or_else(|| ServerError::ParentMissingDsk(zone_name.clone()))?
        };
        let ksk_cert = Certificate::issue(
            ksk_name.append_label("CERT"),
            ksk_name.clone(),
            ksk_public,
            ksk_issuer,
            self.signer.as_ref(),
        )?;

        let dsk_name = zone_name.append_label("DSK-1");
        let dsk_public = self.signer.generate_key(dsk_name.clone())?;
        let dsk_cert = Certificate::issue(
            dsk_name.append_label("CERT"),
            dsk_name.clone(),
            dsk_public,
            ksk_name.clone(),
            self.signer.as_ref(),
        )?;

        let zone = self.store.insert_zone(zone_name, default_ttl)?;
        self.store
            .set_zone_keys(zone.id, Some(ksk_name), Some(dsk_name), None)?;
        let zone = self.store.find_zone_by_id(zone.id)?;

        self.store_cert_rrset(&zone, "KSK-1", &ksk_cert)?;
        self.store_cert_rrset(&zone, "DSK-1", &dsk_cert)?;

        self.store.find_zone_by_id(zone.id).map_err(Into::into)
    }

    /// Removes `zone_name` and every rrset it holds.
    pub fn delete_zone(&self, zone_name: &Name) -> Result<(), ServerError> {
        let zone = self
            .store
            .find_zone(zone_name)
            .map_err(|_| ServerError::ZoneNotFound(zone_name.clone()))?;
        for rrset in self.store.list_rrsets_by_zone(zone.id) {
            self.store.remove_rrset(rrset.id)?;
        }
        self.store.remove_zone(zone.id)?;
        Ok(())
    }

    /// Mints and inserts an rrset for `zone_name`, signed by the zone's
    /// current DSK (spec §4.4).
    pub fn add_rr(
        &self,
        zone_name: &Name,
        label: Name,
        content: RrContent,
        version: VersionSpec,
        ttl: Option<u32>,
    ) -> Result<SignedRrset, ServerError> {
        let zone = self
            .store
            .find_zone(zone_name)
            .map_err(|_| ServerError::ZoneNotFound(zone_name.clone()))?;
        let ttl = ttl.unwrap_or(zone.default_ttl);
        let factory = RecordFactory::new(zone.clone(), self.signer.as_ref());

        let rrset = match content {
            RrContent::Ns(delegations) => factory.generate_ns_rrset(label, version, ttl, delegations)?,
            RrContent::Txt(strings) => factory.generate_txt_rrset(label, version, ttl, strings)?,
            RrContent::Cert(cert) => factory.generate_cert_rrset(label, version, ttl, &cert)?,
            RrContent::Auth => factory.generate_auth_rrset(label, version, ttl)?,
            RrContent::Doe { lower_bound, upper_bound } => {
                factory.generate_doe_rrset(label, version, ttl, lower_bound, upper_bound)?
            }
        };

        self.insert(zone.id, rrset.clone())?;
        Ok(rrset)
    }

    pub fn remove_rr(&self, zone_name: &Name, label: &Name, rr_type: RecordType) -> Result<(), ServerError> {
        let zone = self
            .store
            .find_zone(zone_name)
            .map_err(|_| ServerError::ZoneNotFound(zone_name.clone()))?;
        let rrset = self.store.find_rrset(zone.id, label, rr_type)?;
        self.store.remove_rrset(rrset.id)?;
        Ok(())
    }

    pub fn get_rr(&self, zone_name: &Name, label: &Name, rr_type: RecordType) -> Result<Rrset, ServerError> {
        let zone = self
            .store
            .find_zone(zone_name)
            .map_err(|_| ServerError::ZoneNotFound(zone_name.clone()))?;
        self.store.find_rrset(zone.id, label, rr_type).map_err(Into::into)
    }

    /// Returns the zone plus every rrset it holds, ordered by label (spec
    /// §4.3 `listRrsetsByZone`), for a zone-file-style dump.
    pub fn list_zone(&self, zone_name: &Name) -> Result<(Zone, Vec<Rrset>), ServerError> {
        let zone = self
            .store
            .find_zone(zone_name)
            .map_err(|_| ServerError::ZoneNotFound(zone_name.clone()))?;
        let rrsets = self.store.list_rrsets_by_zone(zone.id);
        Ok((zone, rrsets))
    }

    pub fn list_all_zones(&self) -> Vec<Zone> {
        self.store.list_zones()
    }
}
