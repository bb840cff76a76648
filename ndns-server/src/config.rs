//! Configuration for the daemon and CLI front ends (spec §6 "Environment":
//! database file path, validator-config file path, root-anchor certificate
//! path, all resolvable from configuration).
//!
//! The real persistent store and the validator policy-file parser are
//! external collaborators (spec.md §1); this module only builds the
//! zone hierarchy this workspace *can* run end to end — an `InMemoryStore`
//! populated from a TOML file — the same shape `bin-dnsq`'s
//! `load_zone_configuration` builds from zone files in the teacher crate.

use std::sync::Arc;

use ndns_crypto::{Certificate, InMemoryKeychain, Signer};
use ndns_store::{InMemoryStore, ZoneStore};
use ndns_types::{Content, Name, RecordType, Response, Zone};
use serde::Deserialize;

use crate::error::ServerError;
use crate::factory::VersionSpec;
use crate::management::{ManagementTool, RrContent};

fn default_ttl() -> u32 {
    3600
}

/// The root of a loaded configuration: a flat list of zones, listed
/// parent-before-child so each one's KSK can be certified against its
/// already-created parent (spec §3 "Lifecycle").
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneConfig {
    /// Dotted form, e.g. `"net.example"`; the root zone is `""`.
    pub name: String,
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
    /// Content freshness override for this zone's `AuthServer` (spec §4.5);
    /// `None` keeps `DEFAULT_CONTENT_FRESHNESS`.
    #[serde(default)]
    pub content_freshness: Option<u32>,
    #[serde(default)]
    pub ns: Vec<NsConfig>,
    #[serde(default)]
    pub txt: Vec<TxtConfig>,
}

#[derive(Debug, Deserialize)]
pub struct NsConfig {
    /// Dotted form, relative to the zone; `""` for the zone's own NS.
    pub label: String,
    pub delegations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TxtConfig {
    pub label: String,
    pub strings: Vec<String>,
}

/// Parses the dotted zone-name form used in configuration files (distinct
/// from `Name`'s slash-separated `FromStr`, which is for the CLI tools'
/// interactive arguments).
pub fn parse_dotted_name(s: &str) -> Name {
    let trimmed = s.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Name::root();
    }
    let labels: Vec<&str> = trimmed.split('.').collect();
    Name::from_labels(&labels)
}

/// The result of building a configuration: the populated store, the zones
/// it contains in configuration order, and the trust anchor certificate
/// every zone's `AuthServer`/resolver validates back up to (the first
/// zone's self-signed KSK, per spec §9's "self-signed-root bootstrap").
pub struct Built {
    pub store: Arc<dyn ZoneStore>,
    pub signer: Arc<dyn Signer>,
    pub zones: Vec<Zone>,
    pub trust_anchor: Certificate,
}

impl ServerConfig {
    /// Creates every configured zone in order and publishes its NS/TXT
    /// rrsets, using a fresh in-memory store and keychain.
    pub fn build(&self) -> Result<Built, ServerError> {
        let store: Arc<dyn ZoneStore> = Arc::new(InMemoryStore::new());
        let signer: Arc<dyn Signer> = Arc::new(InMemoryKeychain::new());
        let tool = ManagementTool::new(store.clone(), signer.clone());

        let mut zones = Vec::with_capacity(self.zones.len());
        let mut trust_anchor: Option<Certificate> = None;

        for zone_config in &self.zones {
            let zone_name = parse_dotted_name(&zone_config.name);
            let zone = tool.create_zone(zone_name.clone(), zone_config.default_ttl)?;

            if trust_anchor.is_none() {
                let ksk_name = zone
                    .ksk_name
                    .clone()
                    .ok_or_else(|| ServerError::MissingDsk(zone_name.clone()))?;
                let ksk_rrset = store.find_rrset(zone.id, &Name::from_labels(&["KSK-1"]), RecordType::Cert)?;
                let response = Response::from_octets(&ksk_rrset.data)?;
                let cert = match response.content {
                    Content::Key(bytes) => Certificate::from_octets(&bytes)?,
                    _ => {
                        return Err(ServerError::MalformedUpdateEnvelope(
                            "root KSK rrset did not carry a KEY content".to_string(),
                        ))
                    }
                };
                debug_assert_eq!(ksk_name, cert.key_name);
                trust_anchor = Some(cert);
            }

            for ns in &zone_config.ns {
                let label = parse_dotted_name(&ns.label);
                let delegations = ns.delegations.iter().map(|d| parse_dotted_name(d)).collect();
                tool.add_rr(
                    &zone_name,
                    label,
                    RrContent::Ns(delegations),
                    VersionSpec::UnixTimestampMs,
                    None,
                )?;
            }
            for txt in &zone_config.txt {
                let label = parse_dotted_name(&txt.label);
                tool.add_rr(
                    &zone_name,
                    label,
                    RrContent::Txt(txt.strings.clone()),
                    VersionSpec::UnixTimestampMs,
                    None,
                )?;
            }

            zones.push(zone);
        }

        let trust_anchor = trust_anchor.ok_or_else(|| {
            ServerError::ZoneNotFound(Name::root())
        })?;

        Ok(Built {
            store,
            signer,
            zones,
            trust_anchor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_names() {
        assert_eq!(Name::root(), parse_dotted_name(""));
        assert_eq!(Name::root(), parse_dotted_name("."));
        assert_eq!(Name::from_labels(&["net", "example"]), parse_dotted_name("net.example"));
    }

    #[test]
    fn builds_a_zone_hierarchy_from_config() {
        let config = ServerConfig {
            zones: vec![
                ZoneConfig {
                    name: "".to_string(),
                    default_ttl: 3600,
                    content_freshness: None,
                    ns: vec![],
                    txt: vec![],
                },
                ZoneConfig {
                    name: "net".to_string(),
                    default_ttl: 3600,
                    content_freshness: None,
                    ns: vec![NsConfig {
                        label: "".to_string(),
                        delegations: vec!["ns1.net".to_string()],
                    }],
                    txt: vec![],
                },
                ZoneConfig {
                    name: "net.example".to_string(),
                    default_ttl: 3600,
                    content_freshness: Some(10),
                    ns: vec![],
                    txt: vec![TxtConfig {
                        label: "www".to_string(),
                        strings: vec!["hello".to_string()],
                    }],
                },
            ],
        };

        let built = config.build().unwrap();
        assert_eq!(3, built.zones.len());
        assert!(built.trust_anchor.is_self_signed());

        let net_example = built
            .zones
            .iter()
            .find(|z| z.name == Name::from_labels(&["net", "example"]))
            .unwrap();
        let rrset = built
            .store
            .find_rrset(net_example.id, &Name::from_labels(&["www"]), RecordType::Txt)
            .unwrap();
        assert_eq!(1, rrset.version.max(1));
    }

    #[test]
    fn deserialises_from_toml() {
        let toml_text = r#"
            [[zones]]
            name = ""

            [[zones]]
            name = "net"
            [[zones.ns]]
            label = ""
            delegations = ["ns1.net"]
        "#;
        let config: ServerConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(2, config.zones.len());
        assert_eq!("net", config.zones[1].name);
        assert_eq!(1, config.zones[1].ns.len());
    }
}
