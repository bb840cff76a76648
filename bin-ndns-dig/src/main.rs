//! NDNS iterative lookup utility (spec §6 CLI surface "dig"): resolves a
//! single name against the zone hierarchy described by a configuration
//! file and prints the answer.
//!
//! NDNS's transport face is an external collaborator (spec.md §1), so
//! there is no separate running daemon this tool dials into over a real
//! network; like the teacher's `dnsq`, it loads the zone data itself (via
//! the same `ndns_server::ServerConfig` the daemon uses) and performs the
//! resolution in-process against an `InMemoryForwarder` carrying every
//! configured zone's `AuthServer`.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ndns_face::Face;
use ndns_resolver::{FifoCache, IterativeQueryController, Outcome};
use ndns_server::{AuthServer, ServerConfig};
use ndns_types::{Content, Name, RecordType};

/// NDNS iterative lookup utility
#[derive(Parser)]
struct Args {
    /// Path to the TOML zone configuration file describing the hierarchy
    /// to resolve against.
    #[clap(long, value_parser, env = "NDNS_CONFIG")]
    config: PathBuf,

    /// Name to resolve, slash-separated, e.g. `/net/example/www`.
    #[clap(value_parser)]
    name: Name,

    /// Record type to resolve.
    #[clap(value_parser, default_value = "TXT")]
    rr_type: RecordType,

    /// Number of leading components of `name` already known to be
    /// routable; resolution starts here rather than at the root (spec
    /// §4.6 `startComponentIndex`).
    #[clap(long, default_value_t = 0)]
    start_component_index: usize,
}

fn print_content(content: &Content) {
    match content {
        Content::Resp(subrecords) => {
            for sub in subrecords {
                match std::str::from_utf8(&sub.octets) {
                    Ok(s) => println!("{s}"),
                    Err(_) => println!("{}", hex(&sub.octets)),
                }
            }
        }
        Content::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => println!("{s}"),
            Err(_) => println!("{}", hex(bytes)),
        },
        Content::Key(bytes) => println!("KEY ({} bytes): {}", bytes.len(), hex(bytes)),
        Content::Link(names) => {
            for name in names {
                println!("{name}");
            }
        }
        Content::Auth(_) => println!(";; AUTH: something exists further down this label"),
        Content::Nack(_) => println!(";; NACK"),
        Content::Doe {
            lower_bound,
            upper_bound,
        } => println!(";; DOE: nothing between {lower_bound} and {upper_bound}"),
    }
}

fn hex(octets: &[u8]) -> String {
    octets.iter().map(|b| format!("{b:02x}")).collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
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
    }

    let client_face = forwarder.face();
    let ns_cache = FifoCache::new(64);

    let outcome = IterativeQueryController::new(&client_face, &ns_cache, args.name.clone(), args.rr_type)
        .with_start_component_index(args.start_component_index)
        .resolve()
        .await;

    match outcome {
        Outcome::Success {
            content,
            working_zone,
            ..
        } => {
            println!(";; ANSWER for {} {} (zone {working_zone})", args.name, args.rr_type);
            print_content(&content);
        }
        Outcome::Absent { working_zone, proof } => {
            println!(";; NXDOMAIN for {} {} (zone {working_zone})", args.name, args.rr_type);
            if let Some(proof) = proof {
                print_content(&proof);
            }
            process::exit(1);
        }
        Outcome::Failure(err) => {
            eprintln!("error resolving '{}': {err}", args.name);
            process::exit(1);
        }
    }
}
