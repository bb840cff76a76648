//! The wire form of an authenticated update's embedded signed `Data` object
//! (spec §6 "Update: interest whose last component is the `UPDATE` marker
//! and whose prior single component is the serialized signed Data object").
//! Exact tag numbers are an implementation choice, per spec §6's "chosen by
//! the implementation but must be stable across server/client".

use ndns_face::Data;
use ndns_types::tlv::{ConsumableBuffer, WritableBuffer};
use ndns_types::Name;

use crate::error::ServerError;

const TLV_UPDATE_ENVELOPE: u64 = 40;
const TLV_UPDATE_CONTENT: u64 = 41;
const TLV_UPDATE_SIGNATURE: u64 = 42;

/// Encodes the proposed new record (a signed `Data` object) as a single
/// opaque name component, for embedding in an update interest's name.
pub fn encode_update_component(data: &Data) -> Vec<u8> {
    let mut inner = WritableBuffer::default();
    data.name.encode(&mut inner);
    data.key_locator.encode(&mut inner);
    inner.write_tlv(TLV_UPDATE_CONTENT, &data.content);
    inner.write_tlv(TLV_UPDATE_SIGNATURE, &data.signature);
    let mut buffer = WritableBuffer::default();
    buffer.write_tlv(TLV_UPDATE_ENVELOPE, &inner.octets);
    buffer.octets
}

/// Decodes the update component back into the proposed `Data` object.
pub fn decode_update_component(octets: &[u8]) -> Result<Data, ServerError> {
    let mut cbuf = ConsumableBuffer::new(octets);
    let (typ, value) = cbuf
        .next_tlv()
        .ok_or_else(|| ServerError::MalformedUpdateEnvelope("empty buffer".to_string()))?;
    if typ != TLV_UPDATE_ENVELOPE {
        return Err(ServerError::MalformedUpdateEnvelope(format!(
            "expected outer tlv {TLV_UPDATE_ENVELOPE}, got {typ}"
        )));
    }

    let mut inner = ConsumableBuffer::new(value);
    let name =
        Name::decode(&mut inner).map_err(|err| ServerError::MalformedUpdateEnvelope(err.to_string()))?;
    let key_locator =
        Name::decode(&mut inner).map_err(|err| ServerError::MalformedUpdateEnvelope(err.to_string()))?;

    let (content_typ, content_value) = inner
        .next_tlv()
        .ok_or_else(|| ServerError::MalformedUpdateEnvelope("missing content".to_string()))?;
    if content_typ != TLV_UPDATE_CONTENT {
        return Err(ServerError::MalformedUpdateEnvelope(format!(
            "expected content tlv {TLV_UPDATE_CONTENT}, got {content_typ}"
        )));
    }

    let (sig_typ, sig_value) = inner
        .next_tlv()
        .ok_or_else(|| ServerError::MalformedUpdateEnvelope("missing signature".to_string()))?;
    if sig_typ != TLV_UPDATE_SIGNATURE {
        return Err(ServerError::MalformedUpdateEnvelope(format!(
            "expected signature tlv {TLV_UPDATE_SIGNATURE}, got {sig_typ}"
        )));
    }

    Ok(Data {
        name,
        content: content_value.to_vec(),
        key_locator,
        signature: sig_value.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_component_roundtrip() {
        let data = Data {
            name: Name::from_labels(&["net", "example", "www"]),
            content: b"payload".to_vec(),
            key_locator: Name::from_labels(&["net", "example", "DSK-1"]),
            signature: vec![1, 2, 3, 4],
        };
        let encoded = encode_update_component(&data);
        let decoded = decode_update_component(&encoded).unwrap();
        assert_eq!(data.name, decoded.name);
        assert_eq!(data.content, decoded.content);
        assert_eq!(data.key_locator, decoded.key_locator);
        assert_eq!(data.signature, decoded.signature);
    }

    #[test]
    fn rejects_truncated_envelope() {
        assert!(decode_update_component(&[]).is_err());
    }
}
