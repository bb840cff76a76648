//! The record factory (spec §4.4): builds ready-to-store signed rrsets.
//! Every produced rrset's `data` is a complete `Response` encoding and
//! `signature` is a detached signature over those same octets, both under
//! the zone's current DSK — the store never inspects or re-signs either.

use std::time::{SystemTime, UNIX_EPOCH};

use ndns_crypto::{Certificate, Signer};
use ndns_types::{Component, Content, ContentType, Name, RecordType, Response, SubRecord, Zone};

use crate::error::ServerError;

/// The version a caller wants a newly-minted rrset to carry: either an
/// explicit value, or the sentinel meaning "assign the current Unix time"
/// (spec §4.4 "If the caller passes the sentinel... the factory assigns
/// `version = current_unix_time_ms`").
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VersionSpec {
    Explicit(u64),
    UnixTimestampMs,
}

fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}

/// A signed rrset ready for `ZoneStore::insert_rrset`/`update_rrset`, plus
/// the full wire name it would be served under (spec §4.4's `(rrset,
/// fullName)` pair).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignedRrset {
    pub label: Name,
    pub rr_type: RecordType,
    pub version: u64,
    pub ttl: u32,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
    pub full_name: Name,
}

/// Infers the content-type tag for a generic add-rr request when the caller
/// did not specify one explicitly, and validates an explicit tag against
/// the documented reject combinations (spec §9 "Content-type
/// autodetection"). This is the generic/legacy insertion path; the typed
/// `generate_ns_rrset`/`generate_txt_rrset`/etc. methods below always
/// produce their modern wire form (`NS` as `LINK`) regardless of this
/// inference table.
pub fn infer_content_type(
    rr_type: RecordType,
    explicit: Option<ContentType>,
    element_count: usize,
) -> Result<ContentType, ServerError> {
    let content_type = match explicit {
        Some(ct) => ct,
        None => match rr_type {
            RecordType::Ns | RecordType::Txt => ContentType::Resp,
            RecordType::Cert | RecordType::AppCert => ContentType::Key,
            RecordType::Doe => ContentType::Doe,
        },
    };

    let reject = match (rr_type, content_type) {
        (RecordType::Ns, ContentType::Blob) => true,
        (RecordType::Txt, ct) if ct != ContentType::Resp => true,
        (_, ContentType::Blob) if element_count > 1 => true,
        _ => false,
    };
    if reject {
        return Err(ServerError::RejectedContentCombination { rr_type, content_type });
    }
    Ok(content_type)
}

pub struct RecordFactory<'a> {
    zone: Zone,
    signer: &'a dyn Signer,
}

impl<'a> RecordFactory<'a> {
    pub fn new(zone: Zone, signer: &'a dyn Signer) -> Self {
        RecordFactory { zone, signer }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    fn resolve_version(&self, version: VersionSpec) -> u64 {
        match version {
            VersionSpec::Explicit(v) => v,
            VersionSpec::UnixTimestampMs => unix_time_ms(),
        }
    }

    /// spec §4.4 `generateBaseRrset`: builds `(rrset, fullName)` and signs
    /// the encoded response under the zone's current DSK. Every other
    /// `generate_*` method below is this plus a specific `Content`.
    pub fn generate_rrset(
        &self,
        label: Name,
        rr_type: RecordType,
        version: VersionSpec,
        ttl: u32,
        content: Content,
    ) -> Result<SignedRrset, ServerError> {
        let dsk_name = self
            .zone
            .dsk_name
            .clone()
            .ok_or_else(|| ServerError::MissingDsk(self.zone.name.clone()))?;

        let version = self.resolve_version(version);
        let full_name = self
            .zone
            .name
            .append_label(rr_type.query_kind().label())
            .append_name(&label)
            .append_label(rr_type.label())
            .append(Component::Version(version));

        let response = Response::new(content, ttl);
        let data = response.to_octets();
        let signature = self.signer.sign(&dsk_name, &data)?;

        Ok(SignedRrset {
            label,
            rr_type,
            version,
            ttl,
            data,
            signature,
            full_name,
        })
    }

    /// `generateNsRrset`: a `LINK` delegation list.
    pub fn generate_ns_rrset(
        &self,
        label: Name,
        version: VersionSpec,
        ttl: u32,
        delegations: Vec<Name>,
    ) -> Result<SignedRrset, ServerError> {
        self.generate_rrset(label, RecordType::Ns, version, ttl, Content::Link(delegations))
    }

    /// `generateTxtRrset`: `RESP` with each string as a sub-record.
    pub fn generate_txt_rrset(
        &self,
        label: Name,
        version: VersionSpec,
        ttl: u32,
        strings: Vec<String>,
    ) -> Result<SignedRrset, ServerError> {
        let subrecords = strings
            .into_iter()
            .map(|s| SubRecord::new(s.into_bytes()))
            .collect();
        self.generate_rrset(label, RecordType::Txt, version, ttl, Content::Resp(subrecords))
    }

    /// `generateCertRrset`: `KEY` carrying the certificate bytes.
    pub fn generate_cert_rrset(
        &self,
        label: Name,
        version: VersionSpec,
        ttl: u32,
        certificate: &Certificate,
    ) -> Result<SignedRrset, ServerError> {
        self.generate_rrset(
            label,
            RecordType::Cert,
            version,
            ttl,
            Content::Key(certificate.to_octets()),
        )
    }

    /// `generateAuthRrset`: the `AUTH` marker, no sub-records. Always
    /// answers an `NS` probe (spec §4.5's "type == NS and something exists
    /// further down"), so the full name it signs is built as an `NS` query
    /// even though nothing is actually stored under that type.
    pub fn generate_auth_rrset(
        &self,
        label: Name,
        version: VersionSpec,
        ttl: u32,
    ) -> Result<SignedRrset, ServerError> {
        self.generate_rrset(label, RecordType::Ns, version, ttl, Content::Auth(Vec::new()))
    }

    /// `generateDoeRrset`: a denial-of-existence proof bracketing the
    /// absent label between `lower_bound` and `upper_bound`.
    pub fn generate_doe_rrset(
        &self,
        label: Name,
        version: VersionSpec,
        ttl: u32,
        lower_bound: Name,
        upper_bound: Name,
    ) -> Result<SignedRrset, ServerError> {
        self.generate_rrset(
            label,
            RecordType::Doe,
            version,
            ttl,
            Content::Doe { lower_bound, upper_bound },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndns_crypto::InMemoryKeychain;
    use ndns_types::ZoneId;

    fn zone_with_dsk(signer: &InMemoryKeychain) -> Zone {
        let name = Name::from_labels(&["net", "example"]);
        let dsk_name = name.append_label("DSK-1");
        signer.generate_key(dsk_name.clone()).unwrap();
        let mut zone = Zone::new(ZoneId(1), name, 3600);
        zone.dsk_name = Some(dsk_name);
        zone
    }

    #[test]
    fn generate_txt_rrset_is_signed_and_named() {
        let keychain = InMemoryKeychain::new();
        let zone = zone_with_dsk(&keychain);
        let factory = RecordFactory::new(zone.clone(), &keychain);

        let rrset = factory
            .generate_txt_rrset(
                Name::from_labels(&["www"]),
                VersionSpec::Explicit(1),
                3600,
                vec!["hello".to_string()],
            )
            .unwrap();

        assert_eq!(1, rrset.version);
        assert!(!rrset.signature.is_empty());

        let response = Response::from_octets(&rrset.data).unwrap();
        assert_eq!(Content::Resp(vec![SubRecord::new(b"hello".to_vec())]), response.content);

        let expected_name = zone
            .name
            .append_label("NDNS")
            .append_label("www")
            .append_label("TXT")
            .append(Component::Version(1));
        assert_eq!(expected_name, rrset.full_name);
    }

    #[test]
    fn missing_dsk_is_rejected() {
        let keychain = InMemoryKeychain::new();
        let zone = Zone::new(ZoneId(1), Name::from_labels(&["net", "example"]), 3600);
        let factory = RecordFactory::new(zone, &keychain);

        let result = factory.generate_auth_rrset(Name::from_labels(&["www"]), VersionSpec::Explicit(1), 3600);
        assert!(matches!(result, Err(ServerError::MissingDsk(_))));
    }

    #[test]
    fn infer_content_type_applies_defaults_and_rejects() {
        assert_eq!(Ok(ContentType::Resp), infer_content_type(RecordType::Ns, None, 1));
        assert_eq!(Ok(ContentType::Resp), infer_content_type(RecordType::Txt, None, 1));
        assert_eq!(Ok(ContentType::Key), infer_content_type(RecordType::Cert, None, 1));

        assert!(infer_content_type(RecordType::Ns, Some(ContentType::Blob), 1).is_err());
        assert!(infer_content_type(RecordType::Txt, Some(ContentType::Blob), 1).is_err());
        assert!(infer_content_type(RecordType::Cert, Some(ContentType::Blob), 2).is_err());
    }
}
