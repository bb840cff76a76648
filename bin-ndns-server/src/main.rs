//! The authoritative server daemon (spec §4.5, §6): loads a zone
//! configuration, registers one `AuthServer` per configured zone on a
//! shared face, and serves interests until it receives a shutdown signal.
//!
//! The real network transport is an external collaborator (spec.md §1):
//! this binary wires its zones onto `ndns_face::InMemoryForwarder`, the
//! same in-process forwarder every test in this workspace uses, so this is
//! a self-contained demonstration of the wiring a real deployment (with a
//! socket-backed `Face`) would plug into rather than a standalone network
//! service.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ndns_face::Face;
use ndns_server::{AuthServer, ServerConfig};

/// NDNS authoritative server daemon
#[derive(Parser)]
struct Args {
    /// Path to the TOML zone configuration file.
    #[clap(long, value_parser, env = "NDNS_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config_text = match fs::read_to_string(&args.config) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error reading config file '{}': {err}", args.config.display());
            process::exit(1);
        }
    };
    let config: ServerConfig = match toml::from_str(&config_text) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error parsing config file '{}': {err}", args.config.display());
            process::exit(1);
        }
    };

    let built = match config.build() {
        Ok(built) => built,
        Err(err) => {
            eprintln!("error building zone hierarchy: {err}");
            process::exit(1);
        }
    };

    let forwarder = ndns_face::InMemoryForwarder::new();
    let mut servers = Vec::with_capacity(built.zones.len());
    for zone in &built.zones {
        let server_face = forwarder.face();
        let server = AuthServer::new(
            zone.id,
            zone.name.clone(),
            built.store.clone(),
            built.signer.clone(),
            Arc::new(server_face.clone()),
            built.trust_anchor.clone(),
        );
        server.register(&server_face);
        tracing::info!(zone = %zone.name, "registered authoritative server");
        servers.push(server);
    }

    tracing::info!(zones = servers.len(), "ndns-server ready");

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal, exiting"),
        Err(err) => tracing::error!(%err, "failed to install signal handler"),
    }
}
