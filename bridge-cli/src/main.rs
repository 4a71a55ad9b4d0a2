/*!
Bridge CLI - inspect and manage state persisted by the bridge.

Works directly on a namespace directory, so it can be pointed at the data of an
application that is not running.
*/

use std::io::{self, Write};
use std::sync::Arc;

use bridge_core::{
    codec::EnvelopeCodec,
    compression::CompressionAdapter,
    store::{blob_key, BLOB_KEY_PREFIX},
    BridgeConfig, BridgeError, CompressionKind, EntryMetadata, PreferenceStore, Token,
};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tabled::{Table, Tabled};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "bridge")]
#[command(about = "Inspect state persisted by the bridge")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Namespace directory (its last component is the namespace)
    #[arg(short, long, global = true, env = "BRIDGE_PATH", default_value = "./bridge")]
    path: String,

    /// Compression the application was configured with
    #[arg(short, long, global = true, value_enum, default_value = "gzip")]
    compression: CompressionArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompressionArg {
    Gzip,
    None,
}

#[derive(Subcommand)]
enum Commands {
    /// List all persisted entries
    List {
        /// Show hashes and entry counts
        #[arg(short, long)]
        detailed: bool,
    },
    /// Show the header and contents of an entry
    Show {
        /// Token of the entry
        token: String,
    },
    /// Fully decode an entry, including its integrity check
    Verify {
        /// Token of the entry
        token: String,
    },
    /// Delete one entry
    Delete {
        /// Token of the entry
        token: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Delete every key in the namespace
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Saved")]
    saved_at: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Algorithm")]
    algorithm: String,
}

#[derive(Tabled)]
struct DetailedEntryRow {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Saved")]
    saved_at: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Raw")]
    raw: String,
    #[tabled(rename = "Stored")]
    stored: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

type Codec = EnvelopeCodec<Box<dyn CompressionAdapter>>;

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    let config = create_config(&cli)?;
    let store = config.open_store()?;
    let codec = config.build_codec()?;

    match cli.command {
        Commands::List { detailed } => list_entries(store.as_ref(), &codec, detailed)?,
        Commands::Show { token } => show_entry(store.as_ref(), &codec, &token.into())?,
        Commands::Verify { token } => verify_entry(store.as_ref(), &codec, &token.into())?,
        Commands::Delete { token, force } => delete_entry(&store, &token.into(), force)?,
        Commands::Clear { force } => clear_namespace(&store, force)?,
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<(), anyhow::Error> {
    if json {
        bridge_core::observability::init_observability()?;
        return Ok(());
    }

    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn create_config(cli: &Cli) -> Result<BridgeConfig, anyhow::Error> {
    let compression = match cli.compression {
        CompressionArg::Gzip => CompressionKind::Gzip,
        CompressionArg::None => CompressionKind::None,
    };
    let config = BridgeConfig::from_uri(&cli.path)?.with_compression(compression);
    config.validate()?;
    Ok(config)
}

fn list_entries(
    store: &dyn PreferenceStore,
    codec: &Codec,
    detailed: bool,
) -> Result<(), anyhow::Error> {
    info!(namespace = store.namespace(), "Listing entries");

    let mut entries: Vec<(EntryMetadata, usize)> = Vec::new();
    let mut keys = store.keys()?;
    keys.sort();

    for key in keys {
        if !key.starts_with(BLOB_KEY_PREFIX) {
            warn!(key = %key, "Skipping key not written by the bridge");
            continue;
        }
        let Some(encoded) = store.get(&key)? else {
            continue;
        };
        match codec.inspect(&encoded) {
            Ok(metadata) => entries.push((metadata, encoded.len())),
            Err(e) => warn!(key = %key, error = %e, "Unreadable entry"),
        }
    }

    if entries.is_empty() {
        println!("No entries found in namespace '{}'", store.namespace());
        return Ok(());
    }

    entries.sort_by(|(a, _), (b, _)| a.saved_at.cmp(&b.saved_at));

    if detailed {
        let rows: Vec<DetailedEntryRow> = entries
            .into_iter()
            .map(|(metadata, stored)| DetailedEntryRow {
                token: metadata.token.to_string(),
                saved_at: format_timestamp(metadata.saved_at),
                entries: metadata.entry_count,
                raw: format_size(metadata.uncompressed_size as u64),
                stored: format_size(stored as u64),
                hash: metadata.content_hash.chars().take(12).collect(),
            })
            .collect();
        println!("{}", Table::new(rows));
    } else {
        let rows: Vec<EntryRow> = entries
            .into_iter()
            .map(|(metadata, stored)| EntryRow {
                token: metadata.token.to_string(),
                saved_at: format_timestamp(metadata.saved_at),
                size: format_size(stored as u64),
                algorithm: metadata.compression_algorithm,
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}

fn load_encoded(store: &dyn PreferenceStore, token: &Token) -> Result<String, anyhow::Error> {
    store
        .get(&blob_key(token))?
        .ok_or_else(|| anyhow::anyhow!("No entry for token {token}"))
}

fn show_entry(
    store: &dyn PreferenceStore,
    codec: &Codec,
    token: &Token,
) -> Result<(), anyhow::Error> {
    info!(%token, "Showing entry");

    let encoded = load_encoded(store, token)?;
    let (metadata, blob) = codec.decode_entry(token, &encoded)?;

    println!("Entry Details:");
    println!("  Token: {}", metadata.token);
    println!("  Saved: {}", format_timestamp(metadata.saved_at));
    println!("  Format Version: {}", metadata.format_version);
    println!("  Compression: {}", metadata.compression_algorithm);
    println!("  Content Hash: {}", metadata.content_hash);
    println!(
        "  Size: {} raw, {} stored",
        format_size(metadata.uncompressed_size as u64),
        format_size(encoded.len() as u64)
    );
    println!("  Values ({}):", blob.len());
    for (key, value) in &blob {
        println!("    {key} = {}", serde_json::to_string_pretty(value)?);
    }

    Ok(())
}

fn verify_entry(
    store: &dyn PreferenceStore,
    codec: &Codec,
    token: &Token,
) -> Result<(), anyhow::Error> {
    info!(%token, "Verifying entry");

    let encoded = load_encoded(store, token)?;
    match codec.decode_entry(token, &encoded) {
        Ok((metadata, _)) => {
            println!(
                "✓ Entry is valid ({} values, integrity check passed)",
                metadata.entry_count
            );
            Ok(())
        }
        Err(BridgeError::IntegrityCheckFailed { expected, actual }) => {
            error!("✗ Integrity check failed:");
            error!("  Expected hash: {}", expected);
            error!("  Actual hash: {}", actual);
            Err(anyhow::anyhow!("Integrity check failed"))
        }
        Err(e) => {
            error!("✗ Failed to verify entry: {}", e);
            Err(e.into())
        }
    }
}

fn delete_entry(
    store: &Arc<dyn PreferenceStore>,
    token: &Token,
    force: bool,
) -> Result<(), anyhow::Error> {
    if !force && !confirm(&format!("Delete entry '{token}'?"))? {
        println!("Deletion cancelled");
        return Ok(());
    }

    store.remove(&blob_key(token))?;
    println!("✓ Entry deleted");
    Ok(())
}

fn clear_namespace(store: &Arc<dyn PreferenceStore>, force: bool) -> Result<(), anyhow::Error> {
    let count = store.keys()?.len();
    if !force
        && !confirm(&format!(
            "Delete all {count} keys in namespace '{}'?",
            store.namespace()
        ))?
    {
        println!("Clear cancelled");
        return Ok(());
    }

    store.clear()?;
    println!("✓ Removed {count} keys");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, io::Error> {
    print!("{prompt} (y/N): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_lowercase().starts_with('y'))
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
