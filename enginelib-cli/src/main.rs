//! enginelib-cli: inspect and seed Engine library databases
//!
//! Thin wrapper over enginelib-core for poking at a library directory from
//! the command line: create or open a database, list its contents, verify
//! its schema.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use enginelib_core::{schema, Database, MusicalKey};

#[derive(Parser)]
#[command(name = "enginelib")]
#[command(about = "Engine DJ library database tool")]
struct Cli {
    /// Library directory (holds m.db, and p.db for v1 layouts)
    #[arg(short, long, default_value = "Engine Library")]
    dir: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database if missing, then print its status
    Init {
        /// Create the two-file v1 layout instead of the latest version
        #[arg(long)]
        v1: bool,
    },

    /// Print version, uuid and object counts
    Status,

    /// Verify the schema against its version's reference structure
    Verify,

    /// List tracks
    List {
        /// Emit full track snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// List crates with their parents
    Crates,

    /// Create a root crate
    AddCrate { name: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Init { v1 } => {
            let version = if v1 {
                schema::VERSION_LATEST_V1
            } else {
                schema::VERSION_LATEST
            };
            let (db, created) = Database::create_or_load(&cli.dir, version)
                .with_context(|| format!("opening {}", cli.dir.display()))?;
            println!(
                "{} database in {}",
                if created { "Created" } else { "Loaded" },
                cli.dir.display()
            );
            print_status(&db)?;
        }
        Command::Status => {
            let db = open(&cli.dir)?;
            print_status(&db)?;
        }
        Command::Verify => {
            let db = open(&cli.dir)?;
            db.verify()?;
            println!("✓ schema matches {}", db.version_name());
        }
        Command::List { json } => {
            let db = open(&cli.dir)?;
            let tracks = db.tracks()?;
            if json {
                let snapshots = tracks
                    .iter()
                    .map(|t| t.snapshot())
                    .collect::<enginelib_core::Result<Vec<_>>>()?;
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            } else {
                println!(
                    "{:<5} {:<30} {:<25} {:<8} {:<5}",
                    "ID", "Title", "Artist", "BPM", "Key"
                );
                println!("{}", "-".repeat(76));
                for track in &tracks {
                    println!(
                        "{:<5} {:<30} {:<25} {:<8} {:<5}",
                        track.id(),
                        truncate(&track.title()?.unwrap_or_default(), 29),
                        truncate(&track.artist()?.unwrap_or_default(), 24),
                        track
                            .bpm()?
                            .map(|b| format!("{b:.1}"))
                            .unwrap_or_else(|| "-".into()),
                        track.key()?.map(MusicalKey::name).unwrap_or("-"),
                    );
                }
                println!("{} track(s)", tracks.len());
            }
        }
        Command::Crates => {
            let db = open(&cli.dir)?;
            for cr in db.crates()? {
                match cr.parent()? {
                    Some(parent) => {
                        println!("{:<5} {} (in {})", cr.id(), cr.name()?, parent.name()?)
                    }
                    None => println!("{:<5} {}", cr.id(), cr.name()?),
                }
            }
        }
        Command::AddCrate { name } => {
            let db = open(&cli.dir)?;
            let cr = db.create_root_crate(&name)?;
            println!("✓ created crate {} (id {})", name, cr.id());
        }
    }

    Ok(())
}

fn open(dir: &PathBuf) -> anyhow::Result<Database> {
    Database::load(dir).with_context(|| format!("opening {}", dir.display()))
}

fn print_status(db: &Database) -> anyhow::Result<()> {
    println!("Version: {}", db.version_name());
    println!("UUID:    {}", db.uuid()?);
    println!("Tracks:  {}", db.tracks()?.len());
    println!("Crates:  {}", db.crates()?.len());
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{truncated}…")
    }
}
