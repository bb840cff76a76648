//! NDNS zone-management CLI (spec §6 CLI surface: create-zone, delete-zone,
//! add-rr, remove-rr, get-rr, list-zone, list-all-zones), folded into one
//! tool as the original `management-tool.cpp` does, rather than split by
//! conversion direction the way the teacher's `htoh`/`ztoh`/`ztoz` are.
//!
//! The persistent relational store is an external collaborator (spec.md
//! §1): this tool loads the zone hierarchy described by a configuration
//! file into a fresh in-memory store, applies the single requested
//! operation, and prints the result. It does not persist any change back
//! to the configuration file — a real deployment points `ManagementTool`
//! at a durable `ZoneStore` implementation instead.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ndns_server::{ManagementTool, RrContent, ServerConfig, VersionSpec};
use ndns_types::{Name, RecordType};

/// NDNS zone-management tool
#[derive(Parser)]
struct Args {
    /// Path to the TOML zone configuration file describing the existing
    /// hierarchy to load before applying the command.
    #[clap(long, value_parser, env = "NDNS_CONFIG")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new zone under an already-configured parent.
    CreateZone {
        name: Name,
        #[clap(long, default_value_t = 3600)]
        ttl: u32,
    },
    /// Delete a zone and every rrset it holds.
    DeleteZone { name: Name },
    /// Add an NS, TXT, or AUTH rrset to a zone.
    AddRr {
        zone: Name,
        label: Name,
        rr_type: RecordType,
        /// TXT strings to publish (for `rr_type = TXT`).
        #[clap(long)]
        txt: Vec<String>,
        /// Delegation names to publish (for `rr_type = NS`).
        #[clap(long)]
        ns: Vec<Name>,
        #[clap(long)]
        version: Option<u64>,
        #[clap(long)]
        ttl: Option<u32>,
    },
    /// Remove an rrset from a zone.
    RemoveRr {
        zone: Name,
        label: Name,
        rr_type: RecordType,
    },
    /// Print a single rrset.
    GetRr {
        zone: Name,
        label: Name,
        rr_type: RecordType,
    },
    /// List every rrset in a zone.
    ListZone { zone: Name },
    /// List every configured zone.
    ListAllZones,
}

fn die(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let config_text = fs::read_to_string(&args.config)
        .unwrap_or_else(|err| die(format!("reading config file '{}': {err}", args.config.display())));
    let config: ServerConfig =
        toml::from_str(&config_text).unwrap_or_else(|err| die(format!("parsing config file: {err}")));
    let built = config.build().unwrap_or_else(|err| die(err));

    let tool = ManagementTool::new(built.store, built.signer);

    match args.command {
        Command::CreateZone { name, ttl } => match tool.create_zone(name, ttl) {
            Ok(zone) => println!("created zone '{}'", zone.name),
            Err(err) => die(err),
        },
        Command::DeleteZone { name } => match tool.delete_zone(&name) {
            Ok(()) => println!("deleted zone '{name}'"),
            Err(err) => die(err),
        },
        Command::AddRr {
            zone,
            label,
            rr_type,
            txt,
            ns,
            version,
            ttl,
        } => {
            let content = match rr_type {
                RecordType::Txt => RrContent::Txt(txt),
                RecordType::Ns => RrContent::Ns(ns),
                RecordType::Doe | RecordType::Cert | RecordType::AppCert => die(format!(
                    "'{rr_type}' rrsets are not addable from this CLI; use the library API"
                )),
            };
            let version = version.map(VersionSpec::Explicit).unwrap_or(VersionSpec::UnixTimestampMs);
            match tool.add_rr(&zone, label, content, version, ttl) {
                Ok(rrset) => println!("added '{}' version {}", rrset.full_name, rrset.version),
                Err(err) => die(err),
            }
        }
        Command::RemoveRr { zone, label, rr_type } => match tool.remove_rr(&zone, &label, rr_type) {
            Ok(()) => println!("removed '{rr_type}' rrset at '{label}' in zone '{zone}'"),
            Err(err) => die(err),
        },
        Command::GetRr { zone, label, rr_type } => match tool.get_rr(&zone, &label, rr_type) {
            Ok(rrset) => println!(
                "{} {} v{} ttl={} ({} bytes of signed data)",
                zone.append_name(&label),
                rrset.rr_type,
                rrset.version,
                rrset.ttl,
                rrset.data.len()
            ),
            Err(err) => die(err),
        },
        Command::ListZone { zone } => match tool.list_zone(&zone) {
            Ok((zone, rrsets)) => {
                println!("zone '{}' (ttl={})", zone.name, zone.default_ttl);
                for rrset in rrsets {
                    println!("  {} {} v{}", rrset.label, rrset.rr_type, rrset.version);
                }
            }
            Err(err) => die(err),
        },
        Command::ListAllZones => {
            for zone in tool.list_all_zones() {
                println!("{}", zone.name);
            }
        }
    }
}
