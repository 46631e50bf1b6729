//! ais-server: vessel tracking daemon and CLI.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ais_core::config::{self, TrackerConfig};
use ais_core::geofence::GeofenceEngine;
use ais_core::registry::{VesselEvent, VesselRegistry};
use ais_core::types::{AisError, Mmsi};

mod db;
mod pipeline;

#[derive(Parser)]
#[command(name = "ais", version, about = "AIS vessel registry and geofence tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track vessels from decoded NDJSON reports, with persistence
    Track {
        /// Report file, one decoded JSON object per line ('-' for stdin)
        file: PathBuf,

        /// SQLite database path (overrides the config file)
        #[arg(long, env = "AIS_DB")]
        db_path: Option<String>,

        /// Registry capacity (overrides the config file)
        #[arg(long, env = "AIS_MAX_TRACKED")]
        max_tracked: Option<usize>,

        /// Geofence zone as name,lat,lon,radius_km (repeatable; first
        /// listed is matched first; overrides the config file)
        #[arg(long = "zone", value_name = "SPEC")]
        zones: Vec<String>,

        /// JSON config file
        #[arg(long, env = "AIS_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show the stored identity record for one vessel
    Vessel {
        /// Vessel MMSI
        mmsi: String,

        /// SQLite database path
        #[arg(long, env = "AIS_DB", default_value = config::DEFAULT_DB_PATH)]
        db_path: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show durable store statistics
    Stats {
        /// SQLite database path
        #[arg(long, env = "AIS_DB", default_value = config::DEFAULT_DB_PATH)]
        db_path: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Track {
            file,
            db_path,
            max_tracked,
            zones,
            config,
        } => cmd_track(file, db_path, max_tracked, zones, config),
        Commands::Vessel {
            mmsi,
            db_path,
            json,
        } => cmd_vessel(&mmsi, &db_path, json),
        Commands::Stats { db_path } => cmd_stats(&db_path),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Resolve the effective config: file values first, then CLI overrides.
fn resolve_config(
    config_path: Option<PathBuf>,
    db_path: Option<String>,
    max_tracked: Option<usize>,
    zone_specs: &[String],
) -> Result<TrackerConfig, AisError> {
    let mut config = match config_path {
        Some(path) => TrackerConfig::load(&path)?,
        None => TrackerConfig::default(),
    };
    if let Some(path) = db_path {
        config.database = path;
    }
    if let Some(max) = max_tracked {
        config.max_tracked = max;
    }
    if !zone_specs.is_empty() {
        config.zones = zone_specs
            .iter()
            .map(|spec| config::parse_zone_spec(spec))
            .collect::<Result<Vec<_>, _>>()?;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_track(
    file: PathBuf,
    db_path: Option<String>,
    max_tracked: Option<usize>,
    zone_specs: Vec<String>,
    config_path: Option<PathBuf>,
) -> Result<(), AisError> {
    let config = resolve_config(config_path, db_path, max_tracked, &zone_specs)?;

    let store = db::SqliteStore::open(&config.database)?;
    let geofence = GeofenceEngine::with_zones(config.zones.clone());
    let registry = VesselRegistry::new(config.max_tracked, geofence, store);
    info!(
        max_tracked = config.max_tracked,
        zones = config.zones.len(),
        db = %config.database,
        "tracker starting"
    );

    let (report_tx, report_rx) = mpsc::channel();
    let (sink, events) = pipeline::EventSink::channel();

    let reader = open_reader(&file)?;
    let producer = thread::spawn(move || feed_lines(reader, report_tx));
    let worker = pipeline::spawn_worker(registry, report_rx, sink);

    // Stand-in for the presentation consumers: surface zone
    // transitions on stdout. Plain updates are already logged by the
    // registry itself.
    for event in events {
        if let VesselEvent::ZoneChange {
            vessel,
            previous_zone,
        } = event
        {
            match (&vessel.zone, previous_zone) {
                (Some(zone), _) => println!(
                    "ZONE  {} ({}) entered {zone}",
                    vessel.statics.name,
                    vessel.mmsi()
                ),
                (None, Some(prev)) => println!(
                    "ZONE  {} ({}) left {prev}",
                    vessel.statics.name,
                    vessel.mmsi()
                ),
                (None, None) => {}
            }
        }
    }

    let _ = producer.join();
    let (registry, undecodable) = worker
        .join()
        .map_err(|_| AisError::Io(io::Error::other("registry worker panicked")))?;

    let stats = registry.store().stats()?;
    println!();
    println!("Track complete: {}", file.display());
    println!(
        "  Reports: {} accepted, {} rejected, {} undecodable",
        registry.accepted, registry.rejected, undecodable
    );
    println!(
        "  Registry: {} tracked, {} evicted, {} storage failures",
        registry.len(),
        registry.evicted,
        registry.store_failures
    );
    println!("  Database: {} vessels in {}", stats.vessels, config.database);
    Ok(())
}

fn cmd_vessel(mmsi: &str, db_path: &str, json: bool) -> Result<(), AisError> {
    let mmsi: Mmsi = mmsi.parse()?;
    let store = db::SqliteStore::open(db_path)?;
    match store.get_vessel(mmsi)? {
        Some(row) if json => println!("{}", serde_json::to_string_pretty(&row)?),
        Some(row) => {
            println!("MMSI:       {}", row.mmsi);
            println!("Name:       {}", row.name);
            println!("Callsign:   {}", row.callsign);
            println!("IMO:        {}", row.imo);
            println!("Type:       {}", row.ship_type);
            println!(
                "Size:       {}m x {}m (bow {}, stern {}, port {}, starboard {})",
                row.to_bow + row.to_stern,
                row.to_port + row.to_starboard,
                row.to_bow,
                row.to_stern,
                row.to_port,
                row.to_starboard
            );
            println!("First seen: {}", row.first_sight);
            println!("Last seen:  {}", row.last_sight);
        }
        None => println!("No record for MMSI {mmsi}"),
    }
    Ok(())
}

fn cmd_stats(db_path: &str) -> Result<(), AisError> {
    let store = db::SqliteStore::open(db_path)?;
    let stats = store.stats()?;
    println!();
    println!("Database: {db_path}");
    println!("  Vessels:        {}", stats.vessels);
    println!(
        "  Earliest sight: {}",
        stats
            .earliest_sight
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into())
    );
    println!(
        "  Latest sight:   {}",
        stats
            .latest_sight
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into())
    );
    println!();
    Ok(())
}

fn open_reader(file: &PathBuf) -> Result<Box<dyn BufRead + Send>, AisError> {
    if file.to_str() == Some("-") {
        Ok(Box::new(io::BufReader::new(io::stdin())))
    } else {
        let f = std::fs::File::open(file)?;
        Ok(Box::new(io::BufReader::new(f)))
    }
}

/// Producer side of the input queue: push decoder lines until EOF or
/// the worker goes away.
fn feed_lines(reader: Box<dyn BufRead + Send>, tx: Sender<String>) {
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if tx.send(line).is_err() {
            break;
        }
    }
}
