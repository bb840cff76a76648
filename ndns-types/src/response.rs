//! The rrset content codec (spec §4.2, §6): the wire format for the `data`
//! octets stored in an `Rrset` and carried in an authoritative answer.
//!
//! A response is tagged with one of the six content types (`RESP`, `NACK`,
//! `AUTH`, `LINK`, `KEY`, `BLOB`); the wire type number doubles as the
//! `NdnsType` enum from §6 (`RESP`=1, `NACK`=2, `AUTH`=3, `LINK`=4, `KEY`=5,
//! `BLOB`=6, `DOE`=7). The tag is also the outer TLV type, so a response
//! decodes in one step: read the outer TLV, dispatch on its type.

use crate::name::Name;
use crate::tlv::{ConsumableBuffer, WritableBuffer};
use crate::Error;

pub const NDNS_TYPE_RESP: u64 = 1;
pub const NDNS_TYPE_NACK: u64 = 2;
pub const NDNS_TYPE_AUTH: u64 = 3;
pub const NDNS_TYPE_LINK: u64 = 4;
pub const NDNS_TYPE_KEY: u64 = 5;
pub const NDNS_TYPE_BLOB: u64 = 6;
pub const NDNS_TYPE_DOE: u64 = 7;

const TLV_SUBRECORD: u64 = 9;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContentType {
    Resp,
    Nack,
    Auth,
    Link,
    Key,
    Blob,
    Doe,
}

impl ContentType {
    pub fn wire_type(&self) -> u64 {
        match self {
            ContentType::Resp => NDNS_TYPE_RESP,
            ContentType::Nack => NDNS_TYPE_NACK,
            ContentType::Auth => NDNS_TYPE_AUTH,
            ContentType::Link => NDNS_TYPE_LINK,
            ContentType::Key => NDNS_TYPE_KEY,
            ContentType::Blob => NDNS_TYPE_BLOB,
            ContentType::Doe => NDNS_TYPE_DOE,
        }
    }
}

/// An opaque sub-record of a `RESP` content. Insertion order is
/// significant and preserved (spec §9 "RESP sub-record order = insertion
/// order"): for an NS answer each sub-record is one nameserver's name
/// encoding; for an update acknowledgement there is exactly one sub-record
/// carrying the return code and message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubRecord {
    pub octets: Vec<u8>,
}

impl SubRecord {
    pub fn new(octets: Vec<u8>) -> Self {
        SubRecord { octets }
    }

    fn encode(&self, buffer: &mut WritableBuffer) {
        buffer.write_tlv(TLV_SUBRECORD, &self.octets);
    }

    fn decode(cbuf: &mut ConsumableBuffer) -> Result<Self, Error> {
        let (typ, value) = cbuf.next_tlv().ok_or(Error::BufferTooShort)?;
        if typ != TLV_SUBRECORD {
            return Err(Error::UnexpectedTlvType {
                expected: TLV_SUBRECORD,
                actual: typ,
            });
        }
        Ok(SubRecord::new(value.to_vec()))
    }
}

/// The update acknowledgement's return code (spec §6 `UpdateReturnCode`).
/// Stored as the update reply's sole `RESP` sub-record, per spec §9's note
/// preferring this form over the legacy top-level encoding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UpdateReturnCode {
    Success,
    Failure,
}

impl UpdateReturnCode {
    fn to_u8(self) -> u8 {
        match self {
            UpdateReturnCode::Success => 0,
            UpdateReturnCode::Failure => 1,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(UpdateReturnCode::Success),
            1 => Some(UpdateReturnCode::Failure),
            _ => None,
        }
    }
}

/// Encodes an update reply's single `RESP` sub-record: one return-code
/// octet followed by the UTF-8 return message.
pub fn encode_update_reply(code: UpdateReturnCode, message: &str) -> SubRecord {
    let mut octets = vec![code.to_u8()];
    octets.extend_from_slice(message.as_bytes());
    SubRecord::new(octets)
}

/// Decodes an update reply's single `RESP` sub-record. Rejects anything
/// that isn't exactly `[code, message...]` — in particular the legacy form
/// that put the return code at the top level instead of inside the `RESP`
/// sub-record is rejected here as a parse error rather than accepted.
pub fn decode_update_reply(record: &SubRecord) -> Result<(UpdateReturnCode, String), Error> {
    let (code_octet, message_octets) = record.octets.split_first().ok_or(Error::BufferTooShort)?;
    let code = UpdateReturnCode::from_u8(*code_octet).ok_or(Error::MalformedVersion)?;
    let message = String::from_utf8(message_octets.to_vec()).map_err(|_| Error::MalformedVersion)?;
    Ok((code, message))
}

/// The decoded content of an rrset or answer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Content {
    /// A successful answer: an ordered list of opaque sub-records.
    Resp(Vec<SubRecord>),
    /// A negative answer, optionally carrying a copy of the `DOE` rrset's
    /// data as a denial-of-existence proof (spec §4.5's negative-answer
    /// construction).
    Nack(Option<Box<Content>>),
    /// An authenticated acknowledgement, e.g. for an update.
    Auth(Vec<u8>),
    /// A delegation/forwarding-hint list: the names of the next zone's
    /// nameservers or forwarding hints (spec §4.6's "forwarding-hint
    /// propagation from prior LINK delegation lists").
    Link(Vec<Name>),
    /// A certificate (CERT or APPCERT rrdata).
    Key(Vec<u8>),
    /// An opaque blob (TXT rrdata).
    Blob(Vec<u8>),
    /// A denial-of-existence proof: the labels immediately below and above
    /// the absent name, establishing there is nothing between them (spec
    /// §4.3's "consistent label ordering" requirement feeds this).
    Doe {
        lower_bound: Name,
        upper_bound: Name,
    },
}

impl Content {
    pub fn content_type(&self) -> ContentType {
        match self {
            Content::Resp(_) => ContentType::Resp,
            Content::Nack(_) => ContentType::Nack,
            Content::Auth(_) => ContentType::Auth,
            Content::Link(_) => ContentType::Link,
            Content::Key(_) => ContentType::Key,
            Content::Blob(_) => ContentType::Blob,
            Content::Doe { .. } => ContentType::Doe,
        }
    }

    fn encode_value(&self, buffer: &mut WritableBuffer) {
        match self {
            Content::Resp(subrecords) => {
                for sub in subrecords {
                    sub.encode(buffer);
                }
            }
            Content::Nack(proof) => {
                if let Some(inner) = proof {
                    let mut inner_buf = WritableBuffer::default();
                    inner.encode_value(&mut inner_buf);
                    buffer.write_tlv(inner.content_type().wire_type(), &inner_buf.octets);
                }
            }
            Content::Auth(octets) | Content::Key(octets) | Content::Blob(octets) => {
                buffer.write_octets(octets);
            }
            Content::Link(names) => {
                for name in names {
                    name.encode(buffer);
                }
            }
            Content::Doe {
                lower_bound,
                upper_bound,
            } => {
                lower_bound.encode(buffer);
                upper_bound.encode(buffer);
            }
        }
    }

    fn decode_value(wire_type: u64, value: &[u8]) -> Result<Self, Error> {
        match wire_type {
            NDNS_TYPE_RESP => {
                let mut cbuf = ConsumableBuffer::new(value);
                let mut subrecords = Vec::new();
                while !cbuf.is_empty() {
                    subrecords.push(SubRecord::decode(&mut cbuf)?);
                }
                Ok(Content::Resp(subrecords))
            }
            NDNS_TYPE_NACK => {
                if value.is_empty() {
                    Ok(Content::Nack(None))
                } else {
                    let mut cbuf = ConsumableBuffer::new(value);
                    let (typ, inner_value) = cbuf.next_tlv().ok_or(Error::BufferTooShort)?;
                    let inner = Content::decode_value(typ, inner_value)?;
                    Ok(Content::Nack(Some(Box::new(inner))))
                }
            }
            NDNS_TYPE_AUTH => Ok(Content::Auth(value.to_vec())),
            NDNS_TYPE_LINK => {
                let mut cbuf = ConsumableBuffer::new(value);
                let mut names = Vec::new();
                while !cbuf.is_empty() {
                    names.push(Name::decode(&mut cbuf)?);
                }
                Ok(Content::Link(names))
            }
            NDNS_TYPE_KEY => Ok(Content::Key(value.to_vec())),
            NDNS_TYPE_BLOB => Ok(Content::Blob(value.to_vec())),
            NDNS_TYPE_DOE => {
                let mut cbuf = ConsumableBuffer::new(value);
                let lower_bound = Name::decode(&mut cbuf)?;
                let upper_bound = Name::decode(&mut cbuf)?;
                Ok(Content::Doe {
                    lower_bound,
                    upper_bound,
                })
            }
            other => Err(Error::UnknownContentType(other)),
        }
    }
}

/// A complete response: the content plus its freshness period. This is
/// what `ndns-server`'s record factory produces as an `Rrset`'s `data`,
/// and what the resolver decodes from a fetched `Data` packet's content.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Response {
    pub content: Content,
    pub freshness_period: u32,
}

impl Response {
    pub fn new(content: Content, freshness_period: u32) -> Self {
        Response {
            content,
            freshness_period,
        }
    }

    pub fn encode(&self, buffer: &mut WritableBuffer) {
        let mut inner = WritableBuffer::default();
        self.content.encode_value(&mut inner);
        buffer.write_tlv(self.content.content_type().wire_type(), &inner.octets);
        buffer.write_varnum(u64::from(self.freshness_period));
    }

    pub fn to_octets(&self) -> Vec<u8> {
        let mut buffer = WritableBuffer::default();
        self.encode(&mut buffer);
        buffer.octets
    }

    pub fn decode(cbuf: &mut ConsumableBuffer) -> Result<Self, Error> {
        let (typ, value) = cbuf.next_tlv().ok_or(Error::BufferTooShort)?;
        let content = Content::decode_value(typ, value)?;
        let freshness_period = cbuf.next_varnum().ok_or(Error::BufferTooShort)? as u32;
        Ok(Response {
            content,
            freshness_period,
        })
    }

    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        let mut cbuf = ConsumableBuffer::new(octets);
        let response = Self::decode(&mut cbuf)?;
        if !cbuf.is_empty() {
            return Err(Error::TrailingOctets);
        }
        Ok(response)
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Response {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let content = match u.int_in_range(0..=5)? {
            0 => Content::Resp(
                (0..u.int_in_range(0..=4)?)
                    .map(|_| Ok(SubRecord::new(u.arbitrary()?)))
                    .collect::<arbitrary::Result<_>>()?,
            ),
            1 => Content::Nack(None),
            2 => Content::Auth(u.arbitrary()?),
            3 => Content::Link(
                (0..u.int_in_range(0..=4)?)
                    .map(|_| Name::arbitrary(u))
                    .collect::<arbitrary::Result<_>>()?,
            ),
            4 => Content::Key(u.arbitrary()?),
            _ => Content::Blob(u.arbitrary()?),
        };
        Ok(Response {
            content,
            freshness_period: u.arbitrary()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrip() {
        let response = Response::new(Content::Blob(b"hello world".to_vec()), 3600);
        let octets = response.to_octets();
        assert_eq!(response, Response::from_octets(&octets).unwrap());
    }

    #[test]
    fn resp_preserves_subrecord_order() {
        let response = Response::new(
            Content::Resp(vec![
                SubRecord::new(b"ns1.example.net".to_vec()),
                SubRecord::new(b"ns2.example.net".to_vec()),
            ]),
            3600,
        );
        let octets = response.to_octets();
        let decoded = Response::from_octets(&octets).unwrap();
        match decoded.content {
            Content::Resp(subrecords) => {
                assert_eq!(b"ns1.example.net".to_vec(), subrecords[0].octets);
                assert_eq!(b"ns2.example.net".to_vec(), subrecords[1].octets);
            }
            _ => panic!("expected RESP content"),
        }
    }

    #[test]
    fn update_reply_roundtrip() {
        let sub = encode_update_reply(UpdateReturnCode::Success, "OK");
        let (code, message) = decode_update_reply(&sub).unwrap();
        assert_eq!(UpdateReturnCode::Success, code);
        assert_eq!("OK", message);
    }

    #[test]
    fn nack_with_doe_proof_roundtrip() {
        let doe = Content::Doe {
            lower_bound: Name::from_labels(&["alice"]),
            upper_bound: Name::from_labels(&["carol"]),
        };
        let response = Response::new(Content::Nack(Some(Box::new(doe))), 0);
        let octets = response.to_octets();
        assert_eq!(response, Response::from_octets(&octets).unwrap());
    }

    #[test]
    fn link_preserves_order() {
        let response = Response::new(
            Content::Link(vec![
                Name::from_labels(&["hub1"]),
                Name::from_labels(&["hub2"]),
            ]),
            300,
        );
        let octets = response.to_octets();
        assert_eq!(response, Response::from_octets(&octets).unwrap());
    }
}
