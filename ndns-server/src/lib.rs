//! The authoritative server and zone-management tool (spec §4.4, §4.5, §5):
//! the write/serve side of NDNS, built on top of `ndns-store`'s repository
//! contract, `ndns-crypto`'s signing, and `ndns-face`'s transport.

pub mod auth_server;
pub mod config;
pub mod error;
pub mod factory;
pub mod management;
pub mod update;

pub use auth_server::{AuthServer, DEFAULT_CONTENT_FRESHNESS};
pub use config::{ServerConfig, ZoneConfig};
pub use error::ServerError;
pub use factory::{infer_content_type, RecordFactory, SignedRrset, VersionSpec};
pub use management::{ManagementTool, RrContent};
