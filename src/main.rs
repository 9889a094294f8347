use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use device_registry::{
    AddOutcome, Config, Delivery, Device, DeviceRegistry, MessageTopic, SnapshotStore,
    SqliteStore, UpdateOutcome, db,
};

/// devreg - inspect and feed the persisted device registry
#[derive(Parser)]
#[command(name = "devreg", version, about)]
struct Cli {
    /// `SQLite` database holding the snapshot (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List known devices
    List,
    /// Print one device as JSON
    Show {
        /// Device ID
        id: String,
    },
    /// Add a device
    Add {
        /// Device ID
        id: String,
        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Rename a device
    Rename {
        /// Device ID
        id: String,
        /// New display name
        name: String,
    },
    /// Apply JSON-lines deliveries from a file ("-" for stdin)
    Ingest {
        /// Input file
        input: PathBuf,
        /// Add unknown devices before applying their messages
        #[arg(long)]
        announce: bool,
    },
    /// Print the raw stored snapshot
    Export,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => config
            .as_ref()
            .map_or("info", |c| c.log_filter.as_str())
            .to_string(),
        1 => "info,device_registry=debug".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli, config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let database = cli.database.unwrap_or(config.database_path);
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        database = %database.display(),
        "loaded configuration"
    );

    let store = SqliteStore::new(db::init(&database)?);
    let mut registry = DeviceRegistry::load(&store)?;
    let loaded_at = registry.revision();

    match cli.command {
        Command::List => list(&registry),
        Command::Show { id } => show(&registry, &id)?,
        Command::Add { id, name } => add(&mut registry, id, name),
        Command::Rename { id, name } => {
            if registry.update_device_name(&id, name) == UpdateOutcome::NotFound {
                anyhow::bail!("device '{id}' not found");
            }
        }
        Command::Ingest { input, announce } => ingest(&mut registry, &input, announce)?,
        Command::Export => export(&store)?,
    }

    if registry.revision() != loaded_at {
        registry.persist(&store)?;
    }

    Ok(())
}

/// Current time in epoch milliseconds
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn format_last_seen(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn list(registry: &DeviceRegistry) {
    if registry.is_empty() {
        println!("No devices.");
        return;
    }

    for device in registry.devices() {
        let counts: Vec<String> = MessageTopic::ALL
            .iter()
            .map(|&topic| format!("{topic}={}", device.messages(topic).len()))
            .collect();
        println!(
            "{:<20} {:<24} {}  {}",
            device.id,
            device.name,
            format_last_seen(device.last_seen),
            counts.join(" ")
        );
    }
}

fn show(registry: &DeviceRegistry, id: &str) -> anyhow::Result<()> {
    let Some(device) = registry.get(id) else {
        anyhow::bail!("device '{id}' not found");
    };
    println!("{}", serde_json::to_string_pretty(device)?);
    Ok(())
}

fn add(registry: &mut DeviceRegistry, id: String, name: String) {
    match registry.add_device(Device::new(id.clone(), name, now_ms())) {
        AddOutcome::Inserted => println!("Added {id}."),
        AddOutcome::AlreadyPresent => println!("Device {id} already exists, left unchanged."),
    }
}

/// Tally of one ingest run
#[derive(Debug, Default, PartialEq, Eq)]
struct IngestSummary {
    applied: usize,
    unknown: usize,
    malformed: usize,
}

fn ingest(registry: &mut DeviceRegistry, input: &Path, announce: bool) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = if input.as_os_str() == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        let file =
            File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
        Box::new(BufReader::new(file))
    };

    let summary = ingest_from(registry, reader, announce);
    println!(
        "Applied {}, unknown device {}, malformed {}.",
        summary.applied, summary.unknown, summary.malformed
    );
    Ok(())
}

/// Apply JSON-lines deliveries, skipping lines that cannot be used
///
/// A payload is decoded before anything touches the registry, so a rejected
/// line never announces a device. A read failure ends the input; everything
/// applied up to that point is kept.
fn ingest_from<R: BufRead>(
    registry: &mut DeviceRegistry,
    reader: R,
    announce: bool,
) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line_no = index + 1;
        let bytes = match line {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "read failed, stopping ingest");
                summary.malformed += 1;
                break;
            }
        };
        let Ok(line) = String::from_utf8(bytes) else {
            tracing::warn!(line = line_no, "skipping line that is not valid UTF-8");
            summary.malformed += 1;
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }

        let parts = Delivery::from_json(&line).and_then(Delivery::into_parts);
        let (device_id, message) = match parts {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed delivery");
                summary.malformed += 1;
                continue;
            }
        };

        let received_at = now_ms();
        if announce && registry.get(&device_id).is_none() {
            registry.add_device(Device::new(device_id.clone(), device_id.clone(), received_at));
        }

        match registry.record_message(&device_id, message) {
            UpdateOutcome::Updated => {
                registry.update_device_last_seen(&device_id, received_at);
                summary.applied += 1;
            }
            UpdateOutcome::NotFound => summary.unknown += 1,
        }
    }

    summary
}

fn export<S: SnapshotStore>(store: &S) -> anyhow::Result<()> {
    if let Some(text) = DeviceRegistry::restore(store)? {
        println!("{text}");
    }
    Ok(())
}
