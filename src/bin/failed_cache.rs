//! Inspect or prune the failure cache so lyrics can be retried.
//!
//! Usage: failed-cache [--cache-file PATH] <list|forget PATTERN|clear>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lrc_fetch::cache::{FailureCache, DEFAULT_CACHE_FILE};

#[derive(Parser)]
#[command(name = "failed-cache")]
#[command(about = "Inspect or prune the lrc-fetch failure cache")]
struct Args {
    #[arg(long, default_value = DEFAULT_CACHE_FILE)]
    cache_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every cached "artist|title|album" key
    List,
    /// Drop keys containing PATTERN (case-insensitive) so they are retried
    Forget { pattern: String },
    /// Drop every key
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cache = FailureCache::load(&args.cache_file);

    match args.command {
        Command::List => {
            for key in cache.entries() {
                println!("{}", key);
            }
            eprintln!("{} cached failures in {}", cache.len(), args.cache_file.display());
        }
        Command::Forget { pattern } => {
            let removed = cache.forget(&pattern);
            cache.persist().context("Failed to save failure cache")?;
            println!("Removed {} entries matching '{}'", removed, pattern);
        }
        Command::Clear => {
            let removed = cache.len();
            cache.clear();
            cache.persist().context("Failed to save failure cache")?;
            println!("Removed {} entries", removed);
        }
    }

    Ok(())
}
