//! The authoritative server (spec §4.5): answers queries for a single zone
//! from the store, and accepts authenticated updates.

use std::sync::Arc;

use ndns_crypto::{Certificate, Signer};
use ndns_face::{BoxFuture, Data, Face, Interest, InterestHandler};
use ndns_resolver::{CertificateFetcher, FifoCache, Validator};
use ndns_store::{NewRrset, StoreError, ZoneStore};
use ndns_types::{
    match_against_zone, match_data_against_zone, Component, Content, MatchResult, Name, QueryKind,
    RecordType, Response, Zone, ZoneId,
};

use crate::error::ServerError;
use crate::update::decode_update_component;

/// Spec §4.5 "content freshness (default 4 s)".
pub const DEFAULT_CONTENT_FRESHNESS: u32 = 4;

const NS_CACHE_CAPACITY: usize = 256;
const CERT_CACHE_CAPACITY: usize = 256;

/// Per-zone authoritative server state (spec §4.5's "zone object, DSK
/// certificate name, content freshness, store handle, signer, validator").
/// One instance is registered per configured zone, under both its `NDNS`
/// and `NDNS-R` query prefixes plus its bare zone prefix (for `UPDATE`
/// interests, which do not carry either marker right after the zone name).
pub struct AuthServer {
    zone_id: ZoneId,
    zone_name: Name,
    store: Arc<dyn ZoneStore>,
    signer: Arc<dyn Signer>,
    face: Arc<dyn Face>,
    trust_anchor: Certificate,
    ns_cache: Arc<FifoCache>,
    cert_cache: Arc<FifoCache>,
    content_freshness: u32,
}

impl AuthServer {
    pub fn new(
        zone_id: ZoneId,
        zone_name: Name,
        store: Arc<dyn ZoneStore>,
        signer: Arc<dyn Signer>,
        face: Arc<dyn Face>,
        trust_anchor: Certificate,
    ) -> Arc<Self> {
        Arc::new(AuthServer {
            zone_id,
            zone_name,
            store,
            signer,
            face,
            trust_anchor,
            ns_cache: Arc::new(FifoCache::new(NS_CACHE_CAPACITY)),
            cert_cache: Arc::new(FifoCache::new(CERT_CACHE_CAPACITY)),
            content_freshness: DEFAULT_CONTENT_FRESHNESS,
        })
    }

    pub fn with_content_freshness(mut self, seconds: u32) -> Self {
        self.content_freshness = seconds;
        self
    }

    /// Installs this server's filters on `face` (spec §4.5 "On startup the
    /// server installs two filters: the iterative-query prefix `<zone>/NDNS`
    /// and the cert-query prefix `<zone>/NDNS-R`"), plus the bare zone
    /// prefix so `UPDATE` interests (which aren't under either marker) still
    /// route here.
    pub fn register(self: &Arc<Self>, face: &dyn Face) {
        face.register_prefix(self.zone_name.append_label("NDNS"), self.clone());
        face.register_prefix(self.zone_name.append_label("NDNS-R"), self.clone());
        face.register_prefix(self.zone_name.clone(), self.clone());
    }
}

impl InterestHandler for AuthServer {
    fn handle_interest(&self, interest: Interest) -> BoxFuture<'static, Option<Data>> {
        let worker = RequestWorker {
            zone_id: self.zone_id,
            zone_name: self.zone_name.clone(),
            store: Arc::clone(&self.store),
            signer: Arc::clone(&self.signer),
            face: Arc::clone(&self.face),
            trust_anchor: self.trust_anchor.clone(),
            ns_cache: Arc::clone(&self.ns_cache),
            cert_cache: Arc::clone(&self.cert_cache),
            content_freshness: self.content_freshness,
        };
        Box::pin(async move { worker.handle(interest).await })
    }
}

/// Everything a single `handle_interest` call needs, owned rather than
/// borrowed from `AuthServer`, so the returned future can be `'static`
/// (spec §5's single-task-per-request model, adapted to `tokio`).
struct RequestWorker {
    zone_id: ZoneId,
    zone_name: Name,
    store: Arc<dyn ZoneStore>,
    signer: Arc<dyn Signer>,
    face: Arc<dyn Face>,
    trust_anchor: Certificate,
    ns_cache: Arc<FifoCache>,
    cert_cache: Arc<FifoCache>,
    content_freshness: u32,
}

impl RequestWorker {
    async fn handle(&self, interest: Interest) -> Option<Data> {
        if is_update_interest(&interest.name, &self.zone_name) {
            self.handle_update(&interest).await
        } else {
            self.handle_query(&interest)
        }
    }

    /// spec §4.5 `handleQuery`.
    fn handle_query(&self, interest: &Interest) -> Option<Data> {
        let (kind, m) = match_against_zone(&interest.name, &self.zone_name).ok()?;
        if !matches!(kind, QueryKind::Ndns | QueryKind::NdnsR) {
            return None;
        }
        let zone = self.store.find_zone_by_id(self.zone_id).ok()?;

        match self.store.find_rrset(self.zone_id, &m.rr_label, m.rr_type) {
            Ok(rrset) => {
                if m.version.is_none() || m.version == Some(rrset.version) {
                    let dsk_name = zone.dsk_name?;
                    let data_name = self
                        .zone_name
                        .append_label(kind.label())
                        .append_name(&m.rr_label)
                        .append_label(m.rr_type.label())
                        .append(Component::Version(rrset.version));
                    Some(Data {
                        name: data_name,
                        content: rrset.data,
                        key_locator: dsk_name,
                        signature: rrset.signature,
                    })
                } else {
                    self.sign_response(&zone, &interest.name, Content::Nack(None))
                }
            }
            Err(StoreError::RrsetNotFound { .. }) => {
                if m.rr_type == RecordType::Ns && self.has_deeper_label(&m.rr_label) {
                    self.sign_response(&zone, &interest.name, Content::Auth(Vec::new()))
                } else {
                    let proof = self.doe_proof(&m.rr_label).map(Box::new);
                    self.sign_response(&zone, &interest.name, Content::Nack(proof))
                }
            }
            Err(_) => None,
        }
    }

    fn has_deeper_label(&self, label: &Name) -> bool {
        self.store
            .list_rrsets_by_zone(self.zone_id)
            .iter()
            .any(|r| r.label.is_strictly_prefixed_by(label))
    }

    /// spec §4.3's `findRrsetLowerBound`/an analogous upper-bound lookup,
    /// bracketing an absent label into a `DOE` proof.
    fn doe_proof(&self, label: &Name) -> Option<Content> {
        let lower = self.store.find_rrset_lower_bound(self.zone_id, label)?;
        let upper = self.store.find_rrset_upper_bound(self.zone_id, label)?;
        Some(Content::Doe {
            lower_bound: lower.label,
            upper_bound: upper.label,
        })
    }

    fn sign_response(&self, zone: &Zone, interest_name: &Name, content: Content) -> Option<Data> {
        let dsk_name = zone.dsk_name.clone()?;
        let response = Response::new(content, self.content_freshness);
        let tbs = response.to_octets();
        let signature = self.signer.sign(&dsk_name, &tbs).ok()?;
        Some(Data {
            name: interest_name.clone(),
            content: tbs,
            key_locator: dsk_name,
            signature,
        })
    }

    /// spec §4.5 `handleUpdate`.
    async fn handle_update(&self, interest: &Interest) -> Option<Data> {
        if interest.name.len() < self.zone_name.len() + 2 {
            return None;
        }
        let component_index = interest.name.len() - 2;
        let proposed_component = interest.name.get(component_index)?;
        let proposed = match proposed_component {
            Component::Generic(bytes) => decode_update_component(bytes).ok()?,
            _ => return None,
        };

        let zone = self.store.find_zone_by_id(self.zone_id).ok()?;
        let inner_match = match_data_against_zone(&proposed.name, &self.zone_name).ok()?;
        let version = inner_match.version?;

        let fetcher = CertificateFetcher::new(self.face.as_ref(), &self.ns_cache, &self.cert_cache);
        let validator = Validator::new(&fetcher, self.trust_anchor.clone());
        let validation = validator
            .validate(
                &self.zone_name,
                &proposed.key_locator,
                &proposed.content,
                &proposed.signature,
            )
            .await;
        // Authentication failure is a silent drop (spec §4.5 "On failure,
        // drop silently"), not an UPDATE_FAILURE reply: leaking a reply
        // would confirm the interest reached a real zone.
        validation.ok()?;

        let outcome = self.apply_update(&zone, &inner_match, version, &proposed.content, &proposed.signature);
        let (code, message) = match outcome {
            Ok(()) => (ndns_types::UpdateReturnCode::Success, "OK".to_string()),
            Err(err) => (ndns_types::UpdateReturnCode::Failure, err.to_string()),
        };
        let reply = Content::Resp(vec![ndns_types::response::encode_update_reply(code, &message)]);
        self.sign_response(&zone, &interest.name, reply)
    }

    fn apply_update(
        &self,
        zone: &Zone,
        m: &MatchResult,
        version: u64,
        content: &[u8],
        signature: &[u8],
    ) -> Result<(), ServerError> {
        match self.store.find_rrset(self.zone_id, &m.rr_label, m.rr_type) {
            Ok(existing) => {
                if version > existing.version {
                    self.store
                        .update_rrset(existing.id, version, existing.ttl, content.to_vec(), signature.to_vec())?;
                    Ok(())
                } else {
                    Err(ServerError::StaleVersion {
                        current: existing.version,
                        attempted: version,
                    })
                }
            }
            Err(StoreError::RrsetNotFound { .. }) => {
                self.store.insert_rrset(NewRrset {
                    zone: self.zone_id,
                    label: m.rr_label.clone(),
                    rr_type: m.rr_type,
                    version,
                    ttl: zone.default_ttl,
                    data: content.to_vec(),
                    signature: signature.to_vec(),
                })?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// An update interest's name does not carry the `NDNS`/`NDNS-R` marker
/// right after the zone prefix; instead its *last* component is the
/// `UPDATE` marker (spec §4.5 "Last component is the UPDATE marker").
fn is_update_interest(name: &Name, zone: &Name) -> bool {
    name.len() > zone.len() && name.get(name.len() - 1).and_then(|c| c.as_label()) == Some("UPDATE")
}
