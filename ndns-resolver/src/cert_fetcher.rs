use ndns_crypto::Certificate;
use ndns_face::{Data, Face, Interest};
use ndns_types::tlv::{ConsumableBuffer, WritableBuffer};
use ndns_types::{Content, Error as WireError, Name, RecordType, Response};

use crate::cache::FifoCache;
use crate::error::ResolutionError;
use crate::iterative::{IterativeQueryController, Outcome};
use crate::validator::Validator;

const TLV_APPCERT_ENVELOPE: u64 = 30;
const TLV_KEY_LOCATOR: u64 = 31;
const TLV_SIGNATURE: u64 = 32;
const TLV_INNER_CERT: u64 = 33;

/// An `APPCERT`'s rrdata: an application-signed envelope wrapping a plain
/// certificate, so the inner certificate can be validated before it is
/// trusted (spec §4.7's "APPCERT path... recursive validation and
/// de-encapsulation").
struct AppCertEnvelope {
    key_locator: Name,
    signature: Vec<u8>,
    inner: Vec<u8>,
}

impl AppCertEnvelope {
    fn to_octets(&self) -> Vec<u8> {
        let mut inner_buf = WritableBuffer::default();
        self.key_locator.encode(&mut inner_buf);
        inner_buf.write_tlv(TLV_SIGNATURE, &self.signature);
        inner_buf.write_tlv(TLV_INNER_CERT, &self.inner);
        let mut buffer = WritableBuffer::default();
        buffer.write_tlv(TLV_APPCERT_ENVELOPE, &inner_buf.octets);
        buffer.octets
    }

    fn from_octets(octets: &[u8]) -> Result<Self, WireError> {
        let mut cbuf = ConsumableBuffer::new(octets);
        let (typ, value) = cbuf.next_tlv().ok_or(WireError::BufferTooShort)?;
        if typ != TLV_APPCERT_ENVELOPE {
            return Err(WireError::UnexpectedTlvType {
                expected: TLV_APPCERT_ENVELOPE,
                actual: typ,
            });
        }
        let mut inner = ConsumableBuffer::new(value);
        let key_locator = Name::decode(&mut inner)?;
        let (sig_typ, sig_value) = inner.next_tlv().ok_or(WireError::BufferTooShort)?;
        if sig_typ != TLV_SIGNATURE {
            return Err(WireError::UnexpectedTlvType {
                expected: TLV_SIGNATURE,
                actual: sig_typ,
            });
        }
        let (cert_typ, cert_value) = inner.next_tlv().ok_or(WireError::BufferTooShort)?;
        if cert_typ != TLV_INNER_CERT {
            return Err(WireError::UnexpectedTlvType {
                expected: TLV_INNER_CERT,
                actual: cert_typ,
            });
        }
        Ok(AppCertEnvelope {
            key_locator,
            signature: sig_value.to_vec(),
            inner: cert_value.to_vec(),
        })
    }
}

/// Fetches the certificate vouching for a key name (spec §4.7). The plain
/// `CERT` path is just an iterative resolution of `key_name` as a `CERT`
/// rrset; `APPCERT` additionally de-encapsulates and validates an inner
/// certificate before returning it.
pub struct CertificateFetcher<'a> {
    face: &'a dyn Face,
    ns_cache: &'a FifoCache,
    cert_cache: &'a FifoCache,
    max_retries: usize,
}

impl<'a> CertificateFetcher<'a> {
    pub fn new(face: &'a dyn Face, ns_cache: &'a FifoCache, cert_cache: &'a FifoCache) -> Self {
        CertificateFetcher {
            face,
            ns_cache,
            cert_cache,
            max_retries: 2,
        }
    }

    /// Fetches a plain `CERT` certificate for `key_name`, retrying up to
    /// `max_retries` times before giving up with `CANNOT_RETRIEVE_CERT`.
    pub async fn fetch(&self, key_name: &Name) -> Result<Certificate, ResolutionError> {
        if let Some(cached) = self.cert_cache.get(key_name) {
            return Self::decode_cert(&cached.content, key_name);
        }

        for attempt in 0..=self.max_retries {
            match self.fetch_once(key_name).await {
                Ok(cert) => return Ok(cert),
                Err(err) => {
                    tracing::debug!(%key_name, attempt, %err, "certificate fetch attempt failed");
                }
            }
        }

        Err(ResolutionError::CannotRetrieveCert {
            key_name: key_name.clone(),
        })
    }

    /// The certificate's owning zone and key label are already determined
    /// by `key_name` itself (the zone is everything but the trailing key
    /// label), so unlike an ordinary rrset lookup there is no need to
    /// rediscover the zone cut by walking NS delegations for the full
    /// name. An NS walk is still used, but only to obtain a forwarding
    /// hint for routing the CERT interest; its failure is not fatal, since
    /// the interest's name alone is enough for a forwarder to route it.
    async fn fetch_once(&self, key_name: &Name) -> Result<Certificate, ResolutionError> {
        let zone = key_name.prefix(key_name.len().saturating_sub(1));
        let label = key_name.suffix(key_name.len().saturating_sub(1));
        let query_name = zone
            .append_label(RecordType::Cert.query_kind().label())
            .append_name(&label)
            .append_label(RecordType::Cert.label());

        let hint = self.resolve_forwarding_hint(&zone).await;

        let mut interest = Interest::new(query_name.clone());
        if let Some(hint) = hint {
            interest = interest.with_forwarding_hint(hint);
        }

        let data = self
            .face
            .send_interest(interest)
            .await
            .map_err(|err| ResolutionError::Aborted {
                target: query_name.clone(),
                reason: err.to_string(),
            })?;

        let response = Response::from_octets(&data.content).map_err(|err| ResolutionError::Protocol {
            target: query_name.clone(),
            reason: err.to_string(),
        })?;

        match response.content {
            Content::Key(bytes) => {
                let cert = Self::decode_cert(&bytes, key_name)?;
                self.cert_cache.insert(key_name.clone(), data, response.freshness_period);
                Ok(cert)
            }
            _ => Err(ResolutionError::Protocol {
                target: query_name,
                reason: "unexpected content type for a CERT query".to_string(),
            }),
        }
    }

    /// Best-effort: a failure here just means the interest is sent without
    /// a forwarding hint, relying on the name itself to route.
    async fn resolve_forwarding_hint(&self, zone: &Name) -> Option<Vec<Name>> {
        if zone.is_empty() {
            return None;
        }
        let controller =
            IterativeQueryController::new(self.face, self.ns_cache, zone.clone(), RecordType::Ns);
        match controller.resolve().await {
            Outcome::Success {
                content: Content::Resp(subrecords),
                ..
            } => {
                let names: Vec<Name> = subrecords
                    .iter()
                    .filter_map(|sub| Name::from_octets(&sub.octets).ok())
                    .collect();
                if names.is_empty() {
                    None
                } else {
                    Some(names)
                }
            }
            _ => None,
        }
    }

    fn decode_cert(bytes: &[u8], key_name: &Name) -> Result<Certificate, ResolutionError> {
        Certificate::from_octets(bytes).map_err(|err| ResolutionError::Protocol {
            target: key_name.clone(),
            reason: err.to_string(),
        })
    }

    /// Fetches an `APPCERT` for `key_name`, validating the envelope's
    /// signature against `validator`'s trust chain before trusting the
    /// inner certificate it wraps.
    pub async fn fetch_app(
        &self,
        key_name: &Name,
        validator: &Validator<'_>,
    ) -> Result<Certificate, ResolutionError> {
        let controller = IterativeQueryController::new(
            self.face,
            self.ns_cache,
            key_name.clone(),
            RecordType::AppCert,
        );

        let (content, working_zone) = match controller.resolve().await {
            Outcome::Success {
                content: Content::Key(bytes),
                working_zone,
                ..
            } => (bytes, working_zone),
            Outcome::Success { .. } => {
                return Err(ResolutionError::Protocol {
                    target: key_name.clone(),
                    reason: "unexpected content type for an APPCERT query".to_string(),
                })
            }
            Outcome::Absent { .. } => {
                return Err(ResolutionError::CannotRetrieveCert {
                    key_name: key_name.clone(),
                })
            }
            Outcome::Failure(err) => return Err(err),
        };

        let envelope = AppCertEnvelope::from_octets(&content).map_err(|err| ResolutionError::Protocol {
            target: key_name.clone(),
            reason: err.to_string(),
        })?;

        validator
            .validate(&working_zone, &envelope.key_locator, &envelope.inner, &envelope.signature)
            .await?;

        Self::decode_cert(&envelope.inner, key_name)
    }
}

/// Encodes an `APPCERT` rrdata envelope, used by the server's record
/// factory when issuing an app-signed certificate.
pub fn encode_app_cert(key_locator: Name, signature: Vec<u8>, inner: Vec<u8>) -> Vec<u8> {
    AppCertEnvelope {
        key_locator,
        signature,
        inner,
    }
    .to_octets()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_roundtrip() {
        let envelope = AppCertEnvelope {
            key_locator: Name::from_labels(&["net", "example", "app-signer"]),
            signature: vec![1, 2, 3],
            inner: vec![4, 5, 6, 7],
        };
        let octets = envelope.to_octets();
        let decoded = AppCertEnvelope::from_octets(&octets).unwrap();
        assert_eq!(envelope.key_locator, decoded.key_locator);
        assert_eq!(envelope.signature, decoded.signature);
        assert_eq!(envelope.inner, decoded.inner);
    }
}
