use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use lrc_fetch::cache::{FailureCache, DEFAULT_CACHE_FILE};
use lrc_fetch::client::LrclibClient;
use lrc_fetch::config::{FetchConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS};
use lrc_fetch::pipeline::FetchPipeline;
use lrc_fetch::progress::{create_spinner, format_duration};
use lrc_fetch::resolver::LoftyReader;
use lrc_fetch::scan::scan_library;

#[derive(Parser)]
#[command(name = "lrc-fetch")]
#[command(about = "Fast parallel LRC fetcher with failure caching and album batching (LRCLIB)")]
struct Args {
    /// Music library root
    path: PathBuf,

    /// Replace existing .lrc sidecars
    #[arg(long)]
    overwrite: bool,

    /// Accept plain lyrics when no synced lyrics exist
    #[arg(long)]
    unsynced: bool,

    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[arg(long, default_value = DEFAULT_CACHE_FILE)]
    cache_file: PathBuf,

    /// Also look up live/remix/edit/karaoke/instrumental titles
    #[arg(long)]
    include_variants: bool,

    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Write the run summary as JSON
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Hide progress bars, print periodic progress lines (for cron/docker logs)
    #[arg(long)]
    log_only: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> FetchConfig {
        FetchConfig {
            music_folder: self.path.clone(),
            overwrite: self.overwrite,
            allow_unsynced: self.unsynced,
            workers: self.workers,
            request_timeout: Duration::from_secs(self.timeout),
            cache_path: self.cache_file.clone(),
            skip_variant_titles: !self.include_variants,
            api_url: self.api_url.clone(),
            log_only: self.log_only,
            ..FetchConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        },
    );
    clog.init();

    let config = args.to_config();
    config.validate()?;

    let start = Instant::now();

    let cache = FailureCache::load(&config.cache_path);
    info!(
        "Loaded {} cached failures from {}",
        cache.len(),
        config.cache_path.display()
    );

    let spinner = create_spinner("Scanning library", config.log_only);
    let albums = scan_library(&config.music_folder)?;
    let track_count: usize = albums.iter().map(|a| a.tracks.len()).sum();
    spinner.finish_with_message(format!(
        "Found {} tracks in {} albums",
        track_count,
        albums.len()
    ));
    if config.log_only {
        eprintln!("[SCAN] {} tracks in {} albums", track_count, albums.len());
    }

    let client = LrclibClient::new(&config);
    let pipeline = FetchPipeline::new(config, LoftyReader, client, cache);
    let summary = pipeline.run(&albums)?;

    println!("\n{}", summary);
    println!("Elapsed: {}", format_duration(start.elapsed()));

    if let Some(path) = &args.stats_json {
        // The run already completed; a stats write failure only warns
        let written = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize stats")
            .and_then(|json| {
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write stats to {}", path.display()))
            });
        if let Err(e) = written {
            warn!("{:#}", e);
        }
    }

    Ok(())
}
