//! Resolver behaviour against a real three-zone `AuthServer` hierarchy
//! rather than the hand-rolled mock faces the unit tests use, covering
//! cache population and multi-hop certificate chain fetching that the
//! per-module tests don't reach on their own.

use std::sync::Arc;

use ndns_crypto::{Certificate, InMemoryKeychain, Signer};
use ndns_face::{Face, InMemoryForwarder};
use ndns_resolver::{CertificateFetcher, FifoCache, IterativeQueryController, Outcome, Validator};
use ndns_server::{AuthServer, ManagementTool, RrContent, VersionSpec};
use ndns_store::{InMemoryStore, ZoneStore};
use ndns_types::{Content, Name, RecordType};

struct Hierarchy {
    store: Arc<InMemoryStore>,
    keychain: Arc<InMemoryKeychain>,
    trust_anchor: Certificate,
    client_face: ndns_face::InMemoryFace,
}

/// `/`, `/net`, `/net/example`, `/net/example/deep`, each with its own
/// `AuthServer`, the last holding a single `www TXT` rrset.
fn build_hierarchy() -> Hierarchy {
    let store = Arc::new(InMemoryStore::new());
    let keychain = Arc::new(InMemoryKeychain::new());
    let tool = ManagementTool::new(store.clone(), keychain.clone());

    let root = tool.create_zone(Name::root(), 3600).unwrap();
    let net = tool.create_zone(Name::from_labels(&["net"]), 3600).unwrap();
    let net_example = tool
        .create_zone(Name::from_labels(&["net", "example"]), 3600)
        .unwrap();
    let deep = tool
        .create_zone(Name::from_labels(&["net", "example", "deep"]), 3600)
        .unwrap();

    tool.add_rr(
        &net.name,
        Name::root(),
        RrContent::Ns(vec![Name::from_labels(&["net", "example"])]),
        VersionSpec::Explicit(1),
        None,
    )
    .unwrap();
    tool.add_rr(
        &net_example.name,
        Name::root(),
        RrContent::Ns(vec![Name::from_labels(&["net", "example", "deep"])]),
        VersionSpec::Explicit(1),
        None,
    )
    .unwrap();
    tool.add_rr(
        &deep.name,
        Name::from_labels(&["www"]),
        RrContent::Txt(vec!["hello from deep".to_string()]),
        VersionSpec::Explicit(1),
        None,
    )
    .unwrap();

    let root_ksk_rrset = store
        .find_rrset(root.id, &Name::from_labels(&["KSK-1"]), RecordType::Cert)
        .unwrap();
    let response = ndns_types::Response::from_octets(&root_ksk_rrset.data).unwrap();
    let trust_anchor = match response.content {
        Content::Key(bytes) => Certificate::from_octets(&bytes).unwrap(),
        other => panic!("expected KEY content for the root KSK, got {other:?}"),
    };

    let forwarder = InMemoryForwarder::new();
    for zone in [&root, &net, &net_example, &deep] {
        let server_face = forwarder.face();
        let server = AuthServer::new(
            zone.id,
            zone.name.clone(),
            store.clone(),
            keychain.clone(),
            Arc::new(server_face.clone()),
            trust_anchor.clone(),
        );
        server.register(&server_face);
    }

    Hierarchy {
        store,
        keychain,
        trust_anchor,
        client_face: forwarder.face(),
    }
}

#[tokio::test]
async fn walks_three_delegations_and_populates_the_ns_cache() {
    let h = build_hierarchy();
    let cache = FifoCache::new(16);

    let target = Name::from_labels(&["net", "example", "deep", "www"]);
    let outcome = IterativeQueryController::new(&h.client_face, &cache, target, RecordType::Txt)
        .resolve()
        .await;

    match outcome {
        Outcome::Success { content, working_zone, .. } => {
            assert_eq!(Name::from_labels(&["net", "example", "deep"]), working_zone);
            assert_eq!(
                Content::Resp(vec![ndns_types::SubRecord::new(b"hello from deep".to_vec())]),
                content
            );
        }
        other => panic!("expected success, got {other:?}"),
    }

    // one NS-delegation answer cached per hop walked: root -> net, net -> net.example
    assert!(cache.len() >= 2, "expected the NS cache to retain delegation hops, got {}", cache.len());
}

#[tokio::test]
async fn certificate_fetcher_fetches_a_deep_zones_dsk_cert_and_reuses_its_cache() {
    let h = build_hierarchy();

    let deep_dsk = h
        .store
        .find_zone(&Name::from_labels(&["net", "example", "deep"]))
        .unwrap()
        .dsk_name
        .unwrap();

    let ns_cache = FifoCache::new(16);
    let cert_cache = FifoCache::new(16);
    let fetcher = CertificateFetcher::new(&h.client_face, &ns_cache, &cert_cache);

    let first = fetcher.fetch(&deep_dsk).await.unwrap();
    assert_eq!(deep_dsk, first.key_name);

    let cached_len = cert_cache.len();
    assert!(cached_len > 0);

    // a second fetch for the same key must be served entirely from cache.
    let second = fetcher.fetch(&deep_dsk).await.unwrap();
    assert_eq!(first.public_key, second.public_key);
    assert_eq!(cached_len, cert_cache.len());
}

#[tokio::test]
async fn validator_chains_a_four_zone_deep_signature_back_to_the_root_anchor() {
    let h = build_hierarchy();

    let deep_dsk = h
        .store
        .find_zone(&Name::from_labels(&["net", "example", "deep"]))
        .unwrap()
        .dsk_name
        .unwrap();

    let ns_cache = FifoCache::new(16);
    let cert_cache = FifoCache::new(16);
    let fetcher = CertificateFetcher::new(&h.client_face, &ns_cache, &cert_cache);
    let validator = Validator::new(&fetcher, h.trust_anchor.clone());

    let tbs = b"some deeply nested signed bytes".to_vec();
    let signature = h.keychain.sign(&deep_dsk, &tbs).unwrap();

    let result = validator
        .validate(&Name::from_labels(&["net", "example", "deep"]), &deep_dsk, &tbs, &signature)
        .await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn validator_rejects_a_signature_checked_against_the_wrong_trust_anchor() {
    let h = build_hierarchy();

    let deep_dsk = h
        .store
        .find_zone(&Name::from_labels(&["net", "example", "deep"]))
        .unwrap()
        .dsk_name
        .unwrap();

    let ns_cache = FifoCache::new(16);
    let cert_cache = FifoCache::new(16);
    let fetcher = CertificateFetcher::new(&h.client_face, &ns_cache, &cert_cache);

    // an unrelated, self-signed "foreign" root used as a bogus trust anchor
    let foreign_keychain = InMemoryKeychain::new();
    let foreign_ksk_name = Name::root().append_label("KSK-1");
    let foreign_ksk_public = foreign_keychain.generate_key(foreign_ksk_name.clone()).unwrap();
    let foreign_anchor = Certificate::issue(
        foreign_ksk_name.append_label("CERT"),
        foreign_ksk_name.clone(),
        foreign_ksk_public,
        foreign_ksk_name.clone(),
        &foreign_keychain,
    )
    .unwrap();

    let validator = Validator::new(&fetcher, foreign_anchor);

    let tbs = b"some signed rrset bytes".to_vec();
    let signature = h.keychain.sign(&deep_dsk, &tbs).unwrap();

    let result = validator
        .validate(&Name::from_labels(&["net", "example", "deep"]), &deep_dsk, &tbs, &signature)
        .await;
    assert!(result.is_err(), "validation should not succeed against an unrelated trust anchor");
}
