//! The name/label codec (spec §4.1): a name is an ordered sequence of typed,
//! opaque components.  Two component forms are supported: a generic opaque
//! byte string, and a non-negative integer (used for the version component
//! and any other numbered component), the latter encoded with a marker byte
//! so the wire form can be told apart from a generic component that happens
//! to decode as text.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::tlv::{ConsumableBuffer, WritableBuffer};
use crate::Error;

pub const TLV_NAME: u64 = 7;
pub const TLV_GENERIC_COMPONENT: u64 = 8;

/// Marks the value octets of a component as a non-negative integer rather
/// than an opaque byte string. See spec §4.1 "versioned-component (same
/// encoding with a marker byte)".
const VERSION_MARKER: u8 = 0xFD;

/// A single typed component of a `Name`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Component {
    /// An opaque byte string, e.g. a zone label or the `NDNS` query marker.
    Generic(Vec<u8>),
    /// A plain non-negative integer component (no marker byte).
    Number(u64),
    /// A non-negative integer component carrying the version marker byte.
    Version(u64),
}

impl Component {
    pub fn generic(label: &str) -> Self {
        Component::Generic(label.as_bytes().to_vec())
    }

    /// The component's value octets as they appear on the wire, used both
    /// for encoding and for the canonical ordering.
    fn value_octets(&self) -> Vec<u8> {
        match self {
            Component::Generic(octets) => octets.clone(),
            Component::Number(n) => {
                let mut buf = WritableBuffer::default();
                buf.write_nonneg(*n);
                buf.octets
            }
            Component::Version(n) => {
                let mut buf = WritableBuffer::default();
                buf.write_u8(VERSION_MARKER);
                buf.write_nonneg(*n);
                buf.octets
            }
        }
    }

    /// If this is a `Generic` component which happens to be valid UTF-8,
    /// returns it as a string. Used to recognise the `NDNS`/`NDNS-R`/
    /// `UPDATE` markers and record-type labels.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Component::Generic(octets) => std::str::from_utf8(octets).ok(),
            _ => None,
        }
    }

    fn encode(&self, buffer: &mut WritableBuffer) {
        buffer.write_tlv(TLV_GENERIC_COMPONENT, &self.value_octets());
    }

    fn decode(typ: u64, value: &[u8]) -> Result<Self, Error> {
        if typ != TLV_GENERIC_COMPONENT {
            return Err(Error::UnknownComponentType(typ));
        }
        match value {
            [VERSION_MARKER, rest @ ..] if matches!(rest.len(), 1 | 2 | 4 | 8) => {
                let mut cbuf = ConsumableBuffer::new(rest);
                let n = cbuf
                    .take_nonneg(rest.len())
                    .ok_or(Error::MalformedVersion)?;
                Ok(Component::Version(n))
            }
            _ => Ok(Component::Generic(value.to_vec())),
        }
    }
}

impl Ord for Component {
    /// Canonical ordering: shorter wire values sort first, then
    /// lexicographically by octet. This is the order used consistently by
    /// the name codec, the zone store's label ordering, and DoE
    /// construction (spec §4.3).
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.value_octets();
        let b = other.value_octets();
        a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An NDNS name: an ordered sequence of components.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
pub struct Name {
    pub components: Vec<Component>,
}

impl Name {
    pub fn root() -> Self {
        Name {
            components: Vec::new(),
        }
    }

    pub fn from_labels(labels: &[&str]) -> Self {
        Name {
            components: labels.iter().map(|l| Component::generic(l)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn append(&self, component: Component) -> Self {
        let mut components = self.components.clone();
        components.push(component);
        Name { components }
    }

    pub fn append_label(&self, label: &str) -> Self {
        self.append(Component::generic(label))
    }

    pub fn append_name(&self, other: &Name) -> Self {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Name { components }
    }

    /// A name `p` is a prefix of `self` iff `self`'s first `p.len()`
    /// components equal `p`'s. Every name is a prefix of itself.
    pub fn is_prefixed_by(&self, prefix: &Name) -> bool {
        prefix.components.len() <= self.components.len()
            && self.components[..prefix.components.len()] == prefix.components[..]
    }

    /// Strict prefix containment: `prefix` must be shorter than `self`.
    pub fn is_strictly_prefixed_by(&self, prefix: &Name) -> bool {
        prefix.components.len() < self.components.len() && self.is_prefixed_by(prefix)
    }

    pub fn prefix(&self, n: usize) -> Name {
        Name {
            components: self.components[..n.min(self.components.len())].to_vec(),
        }
    }

    pub fn suffix(&self, from: usize) -> Name {
        let from = from.min(self.components.len());
        Name {
            components: self.components[from..].to_vec(),
        }
    }

    pub fn subsequence(&self, from: usize, to: usize) -> Name {
        let from = from.min(self.components.len());
        let to = to.min(self.components.len()).max(from);
        Name {
            components: self.components[from..to].to_vec(),
        }
    }

    pub fn get(&self, i: usize) -> Option<&Component> {
        self.components.get(i)
    }

    pub fn encode(&self, buffer: &mut WritableBuffer) {
        let mut inner = WritableBuffer::default();
        for component in &self.components {
            component.encode(&mut inner);
        }
        buffer.write_tlv(TLV_NAME, &inner.octets);
    }

    pub fn to_octets(&self) -> Vec<u8> {
        let mut buffer = WritableBuffer::default();
        self.encode(&mut buffer);
        buffer.octets
    }

    pub fn decode(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let (typ, value) = buffer.next_tlv().ok_or(Error::BufferTooShort)?;
        if typ != TLV_NAME {
            return Err(Error::UnexpectedTlvType {
                expected: TLV_NAME,
                actual: typ,
            });
        }
        Self::decode_value(value)
    }

    fn decode_value(value: &[u8]) -> Result<Self, Error> {
        let mut cbuf = ConsumableBuffer::new(value);
        let mut components = Vec::new();
        while !cbuf.is_empty() {
            let (typ, cvalue) = cbuf.next_tlv().ok_or(Error::BufferTooShort)?;
            components.push(Component::decode(typ, cvalue)?);
        }
        Ok(Name { components })
    }

    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        Self::decode(&mut ConsumableBuffer::new(octets))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "/")?;
            match component {
                Component::Generic(octets) => match std::str::from_utf8(octets) {
                    Ok(s) => write!(f, "{s}")?,
                    Err(_) => write!(f, "{}", hex_encode(octets))?,
                },
                Component::Number(n) => write!(f, "{n}")?,
                Component::Version(n) => write!(f, "v={n}")?,
            }
        }
        Ok(())
    }
}

fn hex_encode(octets: &[u8]) -> String {
    octets.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parses the slash-separated form used by the CLI tools and this crate's
/// own `Display` impl, e.g. `/net/example`. The root name is `/` or the
/// empty string. Every non-empty segment becomes a generic label
/// component; there is no support for the version or number forms here,
/// since a human never types those directly.
impl FromStr for Name {
    type Err = NameFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(Name::root());
        }
        let mut components = Vec::new();
        for label in trimmed.split('/') {
            if label.is_empty() {
                return Err(NameFromStrError::EmptyLabel);
            }
            components.push(Component::generic(label));
        }
        Ok(Name { components })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NameFromStrError {
    EmptyLabel,
}

impl fmt::Display for NameFromStrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name contains an empty label")
    }
}

impl std::error::Error for NameFromStrError {}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Name {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n = u.int_in_range(0..=8)?;
        let mut components = Vec::with_capacity(n);
        for _ in 0..n {
            if u.ratio(1u8, 4u8)? {
                components.push(Component::Version(u.arbitrary()?));
            } else {
                let len = u.int_in_range(0..=16)?;
                components.push(Component::Generic(u.bytes(len)?.to_vec()));
            }
        }
        Ok(Name { components })
    }
}

/// The query-kind marker following a zone name: either an iterative
/// (`NDNS`) or certificate (`NDNS-R`) query, or an authenticated update.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum QueryKind {
    Ndns,
    NdnsR,
    Update,
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::Ndns => "NDNS",
            QueryKind::NdnsR => "NDNS-R",
            QueryKind::Update => "UPDATE",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "NDNS" => Some(QueryKind::Ndns),
            "NDNS-R" => Some(QueryKind::NdnsR),
            "UPDATE" => Some(QueryKind::Update),
            _ => None,
        }
    }
}

/// The record types in the closed set (spec §3). `UPDATE`, `NDNS`, and
/// `NDNS-R` are query-kind markers, not record types, and are represented
/// by `QueryKind`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordType {
    Ns,
    Txt,
    Cert,
    AppCert,
    Doe,
}

impl RecordType {
    pub fn label(&self) -> &'static str {
        match self {
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Cert => "CERT",
            RecordType::AppCert => "APPCERT",
            RecordType::Doe => "DOE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "NS" => Some(RecordType::Ns),
            "TXT" => Some(RecordType::Txt),
            "CERT" => Some(RecordType::Cert),
            "APPCERT" => Some(RecordType::AppCert),
            "DOE" => Some(RecordType::Doe),
            _ => None,
        }
    }

    /// The query-kind marker a lookup for this record type is issued under:
    /// `CERT` queries use the reserved `NDNS-R` prefix (spec §4.4, §6),
    /// everything else uses `NDNS`.
    pub fn query_kind(&self) -> QueryKind {
        match self {
            RecordType::Cert => QueryKind::NdnsR,
            _ => QueryKind::Ndns,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RecordType {
    type Err = RecordTypeFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::from_label(&s.to_ascii_uppercase()).ok_or(RecordTypeFromStrError::Unknown)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RecordTypeFromStrError {
    Unknown,
}

impl fmt::Display for RecordTypeFromStrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised record type, expected one of NS/TXT/CERT/APPCERT/DOE")
    }
}

impl std::error::Error for RecordTypeFromStrError {}

/// The result of matching a received name against a zone's name (spec
/// §4.1).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MatchResult {
    pub rr_label: Name,
    pub rr_type: RecordType,
    pub version: Option<u64>,
}

/// Errors from matching a name against a zone. Per spec §4.1, any of these
/// means the consumer must drop the packet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MatchError {
    NotUnderZone,
    MissingMarker,
    UnknownRecordType,
    Empty,
    MissingVersion,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NotUnderZone => write!(f, "name is not under the zone"),
            MatchError::MissingMarker => write!(f, "missing NDNS/NDNS-R/UPDATE marker"),
            MatchError::UnknownRecordType => write!(f, "unrecognised record type label"),
            MatchError::Empty => write!(f, "no label/type components after the marker"),
            MatchError::MissingVersion => write!(f, "data name is missing its version component"),
        }
    }
}

impl std::error::Error for MatchError {}

/// Matches a received name against a zone name, per spec §4.1. Works for
/// both interests (version optional) and data packets (version always
/// present, checked by the caller via `rr_label`/`version`).
pub fn match_against_zone(
    name: &Name,
    zone: &Name,
) -> Result<(QueryKind, MatchResult), MatchError> {
    if !name.is_strictly_prefixed_by(zone) {
        return Err(MatchError::NotUnderZone);
    }

    let marker = &name.components[zone.len()];
    let kind = marker
        .as_label()
        .and_then(QueryKind::from_label)
        .ok_or(MatchError::MissingMarker)?;

    let tail = &name.components[zone.len() + 1..];
    if tail.is_empty() {
        return Err(MatchError::Empty);
    }

    let (version, rest) = match tail.last() {
        Some(Component::Version(v)) => (Some(*v), &tail[..tail.len() - 1]),
        _ => (None, tail),
    };

    let (rr_type_component, rr_label_components) =
        rest.split_last().ok_or(MatchError::Empty)?;
    let rr_type = rr_type_component
        .as_label()
        .and_then(RecordType::from_label)
        .ok_or(MatchError::UnknownRecordType)?;

    Ok((
        kind,
        MatchResult {
            rr_label: Name {
                components: rr_label_components.to_vec(),
            },
            rr_type,
            version,
        },
    ))
}

/// Matches a data packet's name against a zone name, requiring the trailing
/// version component that all stored data objects carry (spec §3 "Every
/// stored data object has name `<zone>/NDNS|NDNS-R/<rrLabel>/<rrType>/
/// <version>`").
pub fn match_data_against_zone(name: &Name, zone: &Name) -> Result<MatchResult, MatchError> {
    let (_, result) = match_against_zone(name, zone)?;
    if result.version.is_none() {
        return Err(MatchError::MissingVersion);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrip() {
        let name = Name::from_labels(&["net", "example"])
            .append_label("NDNS")
            .append_label("www")
            .append_label("TXT")
            .append(Component::Version(42));
        let octets = name.to_octets();
        assert_eq!(name, Name::from_octets(&octets).unwrap());
    }

    #[test]
    fn prefix_containment() {
        let zone = Name::from_labels(&["net", "example"]);
        let name = zone.append_label("www");
        assert!(name.is_strictly_prefixed_by(&zone));
        assert!(!zone.is_strictly_prefixed_by(&zone));
        assert!(zone.is_prefixed_by(&zone));
    }

    #[test]
    fn from_str_parses_slash_separated_labels() {
        assert_eq!(Name::root(), "/".parse().unwrap());
        assert_eq!(Name::root(), "".parse().unwrap());
        assert_eq!(
            Name::from_labels(&["net", "example"]),
            "/net/example".parse().unwrap()
        );
        assert_eq!(
            Name::from_labels(&["net", "example"]),
            "net/example".parse().unwrap()
        );
        assert!("net//example".parse::<Name>().is_err());
    }

    #[test]
    fn record_type_from_str_is_case_insensitive() {
        assert_eq!(RecordType::Txt, "txt".parse().unwrap());
        assert_eq!(RecordType::Cert, "CERT".parse().unwrap());
        assert!("bogus".parse::<RecordType>().is_err());
    }

    #[test]
    fn component_ordering_is_by_length_then_bytes() {
        let mut cs = vec![
            Component::generic("zz"),
            Component::generic("a"),
            Component::generic("bb"),
        ];
        cs.sort();
        assert_eq!(
            vec![
                Component::generic("a"),
                Component::generic("bb"),
                Component::generic("zz"),
            ],
            cs
        );
    }

    #[test]
    fn match_interest_without_version() {
        let zone = Name::from_labels(&["net", "example"]);
        let name = zone
            .append_label("NDNS")
            .append_label("www")
            .append_label("TXT");
        let (kind, mr) = match_against_zone(&name, &zone).unwrap();
        assert_eq!(QueryKind::Ndns, kind);
        assert_eq!(Name::from_labels(&["www"]), mr.rr_label);
        assert_eq!(RecordType::Txt, mr.rr_type);
        assert_eq!(None, mr.version);
    }

    #[test]
    fn match_data_with_version() {
        let zone = Name::from_labels(&["net", "example"]);
        let name = zone
            .append_label("NDNS")
            .append_label("www")
            .append_label("TXT")
            .append(Component::Version(7));
        let mr = match_data_against_zone(&name, &zone).unwrap();
        assert_eq!(Name::from_labels(&["www"]), mr.rr_label);
        assert_eq!(RecordType::Txt, mr.rr_type);
        assert_eq!(Some(7), mr.version);
    }

    #[test]
    fn match_rejects_missing_marker() {
        let zone = Name::from_labels(&["net", "example"]);
        let name = zone.append_label("www").append_label("TXT");
        assert_eq!(Err(MatchError::MissingMarker), match_against_zone(&name, &zone).map(|_| ()));
    }

    #[test]
    fn match_rejects_names_outside_zone() {
        let zone = Name::from_labels(&["net", "example"]);
        let other = Name::from_labels(&["net", "other"]).append_label("NDNS").append_label("TXT");
        assert_eq!(Err(MatchError::NotUnderZone), match_against_zone(&other, &zone).map(|_| ()));
    }

    #[test]
    fn cert_record_type_uses_ndns_r() {
        assert_eq!(QueryKind::NdnsR, RecordType::Cert.query_kind());
        assert_eq!(QueryKind::Ndns, RecordType::Txt.query_kind());
    }
}
