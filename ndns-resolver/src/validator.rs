use async_recursion::async_recursion;

use ndns_crypto::Certificate;
use ndns_types::Name;

use crate::cert_fetcher::CertificateFetcher;
use crate::error::ResolutionError;

/// Validates a signed object's signature chain up to a configured trust
/// anchor (spec §4.8): the signature must verify under the key locator's
/// certified public key, the key locator's identity must be a prefix of
/// (or equal to) the signed object's owner zone, and the certifying
/// certificate itself must chain up to the anchor — rejecting a
/// self-signed certificate anywhere but at the anchor itself.
pub struct Validator<'a> {
    fetcher: &'a CertificateFetcher<'a>,
    trust_anchor: Certificate,
    max_chain_depth: usize,
}

impl<'a> Validator<'a> {
    pub fn new(fetcher: &'a CertificateFetcher<'a>, trust_anchor: Certificate) -> Self {
        Validator {
            fetcher,
            trust_anchor,
            max_chain_depth: 8,
        }
    }

    /// Validates `signature` over `tbs`, claimed to be signed by
    /// `key_locator`'s key on behalf of an object owned by `owner_zone`.
    pub async fn validate(
        &self,
        owner_zone: &Name,
        key_locator: &Name,
        tbs: &[u8],
        signature: &[u8],
    ) -> Result<(), ResolutionError> {
        self.validate_at_depth(owner_zone, key_locator, tbs, signature, 0)
            .await
    }

    #[async_recursion]
    async fn validate_at_depth(
        &self,
        owner_zone: &Name,
        key_locator: &Name,
        tbs: &[u8],
        signature: &[u8],
        depth: usize,
    ) -> Result<(), ResolutionError> {
        if depth > self.max_chain_depth {
            return Err(ResolutionError::Protocol {
                target: key_locator.clone(),
                reason: "certificate chain exceeded the maximum depth".to_string(),
            });
        }

        let cert = self.fetcher.fetch(key_locator).await?;
        if &cert.key_name != key_locator {
            return Err(ResolutionError::Protocol {
                target: key_locator.clone(),
                reason: "certificate does not vouch for the claimed key locator".to_string(),
            });
        }

        let identity_zone = identity_zone(&cert.key_name);
        if !owner_zone.is_prefixed_by(&identity_zone) {
            return Err(ResolutionError::Protocol {
                target: owner_zone.clone(),
                reason: "key locator is not a prefix of the signed object's owner zone".to_string(),
            });
        }

        ndns_crypto::verify(tbs, signature, &cert.public_key).map_err(|err| {
            ResolutionError::Protocol {
                target: key_locator.clone(),
                reason: err.to_string(),
            }
        })?;

        self.validate_certificate(&cert, depth).await
    }

    #[async_recursion]
    async fn validate_certificate(
        &self,
        cert: &Certificate,
        depth: usize,
    ) -> Result<(), ResolutionError> {
        if cert.is_self_signed() {
            return if cert.key_name == self.trust_anchor.key_name
                && cert.public_key == self.trust_anchor.public_key
            {
                Ok(())
            } else {
                Err(ResolutionError::Protocol {
                    target: cert.key_name.clone(),
                    reason: "self-signed certificate does not match the trust anchor".to_string(),
                })
            };
        }

        let tbs = Certificate::to_be_signed(&cert.key_name, &cert.public_key);
        let issuer_zone = identity_zone(&cert.key_name);
        self.validate_at_depth(&issuer_zone, &cert.issuer, &tbs, &cert.signature, depth + 1)
            .await
    }
}

/// The identity a certified key belongs to: its name with the trailing
/// key-label component stripped off.
fn identity_zone(key_name: &Name) -> Name {
    key_name.prefix(key_name.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndns_crypto::{InMemoryKeychain, Signer};
    use ndns_face::InMemoryForwarder;
    use ndns_types::{Content, RecordType, Response};

    use crate::cache::FifoCache;

    fn cert_query_name(key_name: &Name) -> Name {
        let zone = key_name.prefix(key_name.len().saturating_sub(1));
        let label = key_name.suffix(key_name.len().saturating_sub(1));
        zone.append_label(RecordType::Cert.query_kind().label())
            .append_name(&label)
            .append_label(RecordType::Cert.label())
    }

    struct CertServer {
        answers: Vec<(Name, Vec<u8>)>,
    }

    impl ndns_face::InterestHandler for CertServer {
        fn handle_interest(
            &self,
            interest: ndns_face::Interest,
        ) -> ndns_face::BoxFuture<'static, Option<ndns_face::Data>> {
            let found = self
                .answers
                .iter()
                .find(|(name, _)| *name == interest.name)
                .map(|(name, bytes)| {
                    let response = Response::new(Content::Key(bytes.clone()), 3600);
                    ndns_face::Data {
                        name: name.clone(),
                        content: response.to_octets(),
                        key_locator: Name::root(),
                        signature: vec![],
                    }
                });
            Box::pin(async move { found })
        }
    }

    #[tokio::test]
    async fn validates_a_two_level_chain_to_a_self_signed_anchor() {
        let keychain = InMemoryKeychain::new();

        let root_ksk_name = Name::root().append_label("KSK-1");
        let root_ksk_public = keychain.generate_key(root_ksk_name.clone()).unwrap();
        let trust_anchor = Certificate::issue(
            Name::root().append_label("KSK-1").append_label("CERT"),
            root_ksk_name.clone(),
            root_ksk_public,
            root_ksk_name.clone(),
            &keychain,
        )
        .unwrap();

        let net_example_dsk_name = Name::from_labels(&["net", "example", "DSK-1"]);
        let net_example_dsk_public = keychain.generate_key(net_example_dsk_name.clone()).unwrap();
        let net_example_cert = Certificate::issue(
            net_example_dsk_name.append_label("CERT"),
            net_example_dsk_name.clone(),
            net_example_dsk_public,
            root_ksk_name.clone(),
            &keychain,
        )
        .unwrap();

        let forwarder = InMemoryForwarder::new();
        let server_face = forwarder.face();
        let client_face = forwarder.face();

        let answers = vec![
            (
                cert_query_name(&root_ksk_name),
                trust_anchor.to_octets(),
            ),
            (
                cert_query_name(&net_example_dsk_name),
                net_example_cert.to_octets(),
            ),
        ];
        server_face.register_prefix(
            Name::root(),
            std::sync::Arc::new(CertServer { answers }),
        );

        let ns_cache = FifoCache::new(16);
        let cert_cache = FifoCache::new(16);
        let fetcher = CertificateFetcher::new(&client_face, &ns_cache, &cert_cache);
        let validator = Validator::new(&fetcher, trust_anchor);

        let owner_zone = Name::from_labels(&["net", "example"]);
        let tbs = b"some rrset bytes".to_vec();
        let signature = keychain.sign(&net_example_dsk_name, &tbs).unwrap();

        let result = validator
            .validate(&owner_zone, &net_example_dsk_name, &tbs, &signature)
            .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn rejects_a_key_locator_outside_the_owner_zone() {
        let keychain = InMemoryKeychain::new();

        let root_ksk_name = Name::root().append_label("KSK-1");
        let root_ksk_public = keychain.generate_key(root_ksk_name.clone()).unwrap();
        let trust_anchor = Certificate::issue(
            Name::root().append_label("KSK-1").append_label("CERT"),
            root_ksk_name.clone(),
            root_ksk_public,
            root_ksk_name.clone(),
            &keychain,
        )
        .unwrap();

        let net_other_dsk_name = Name::from_labels(&["net", "other", "DSK-1"]);
        let net_other_dsk_public = keychain.generate_key(net_other_dsk_name.clone()).unwrap();
        let net_other_cert = Certificate::issue(
            net_other_dsk_name.append_label("CERT"),
            net_other_dsk_name.clone(),
            net_other_dsk_public,
            root_ksk_name.clone(),
            &keychain,
        )
        .unwrap();

        let forwarder = InMemoryForwarder::new();
        let server_face = forwarder.face();
        let client_face = forwarder.face();

        let answers = vec![(
            cert_query_name(&net_other_dsk_name),
            net_other_cert.to_octets(),
        )];
        server_face.register_prefix(
            Name::root(),
            std::sync::Arc::new(CertServer { answers }),
        );

        let ns_cache = FifoCache::new(16);
        let cert_cache = FifoCache::new(16);
        let fetcher = CertificateFetcher::new(&client_face, &ns_cache, &cert_cache);
        let validator = Validator::new(&fetcher, trust_anchor);

        let owner_zone = Name::from_labels(&["net", "example"]);
        let tbs = b"some rrset bytes".to_vec();
        let signature = keychain.sign(&net_other_dsk_name, &tbs).unwrap();

        let result = validator
            .validate(&owner_zone, &net_other_dsk_name, &tbs, &signature)
            .await;
        assert!(result.is_err());
    }
}
