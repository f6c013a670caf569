use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use glean::analysis::{AnalyzeProgress, Analyzer, PublicationAnalysis};
use glean::catalog::Catalog;
use glean::config::{load_sources, Config};
use glean::content::LibraryStore;
use glean::feed::{FeedClient, FeedClientConfig, PublicationSource};
use glean::ingest::{BatchReport, IngestOptions, Ingestor};

/// Get the config directory path (~/.config/glean/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("glean");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(
    name = "glean",
    about = "Score publications for quality and curate a markdown reading library"
)]
struct Args {
    /// Path to config.toml (default: ~/.config/glean/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score publications from their feed history
    Analyze {
        /// Publication slugs or feed URLs
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Print full analyses as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Only show publications scoring at least this
        #[arg(long, value_name = "SCORE")]
        min_score: Option<u8>,
    },

    /// Ingest configured sources into the library
    Ingest {
        /// Ingest only this source slug from sources.toml
        #[arg(long, value_name = "SLUG")]
        source: Option<String>,

        /// Report what would be stored without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Include audio and video items instead of skipping them
        #[arg(long)]
        all_media: bool,

        /// Only ingest items published on or after this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        since: Option<String>,

        /// Cap on items taken per source
        #[arg(long, value_name = "N")]
        max_articles: Option<usize>,

        /// Skip articles shorter than this many minutes (0 disables)
        #[arg(long, value_name = "MINUTES")]
        min_read_time: Option<u32>,

        /// Log each skipped item at info level
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze configured sources, then ingest those scoring at or above
    /// the threshold
    Curate {
        /// Minimum quality score a source must reach to be ingested
        #[arg(long, default_value_t = 60, value_name = "SCORE")]
        threshold: u8,

        /// Report what would be stored without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Log each skipped item at info level
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let (config_path, sources_path) = match &args.config {
        Some(path) => {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (path.clone(), dir.join("sources.toml"))
        }
        None => {
            let config_dir = get_config_dir()?;
            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)
                    .context("Failed to create config directory")?;
                println!("Created config directory: {}", config_dir.display());
            }

            // Set directory permissions on Unix (user-only access)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                match std::fs::metadata(&config_dir) {
                    Ok(metadata) => {
                        let mut perms = metadata.permissions();
                        perms.set_mode(0o700);
                        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                            tracing::warn!(
                                path = %config_dir.display(),
                                error = %e,
                                "Failed to set config directory permissions to 0700"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %config_dir.display(),
                            error = %e,
                            "Failed to read config directory metadata"
                        );
                    }
                }
            }

            (config_dir.join("config.toml"), config_dir.join("sources.toml"))
        }
    };

    let config = Config::load(&config_path)?;

    match args.command {
        Command::Analyze {
            inputs,
            json,
            min_score,
        } => run_analyze(&config, &inputs, json, min_score).await,
        Command::Ingest {
            source,
            dry_run,
            all_media,
            since,
            max_articles,
            min_read_time,
            verbose,
        } => {
            let mut options = config.ingest_options();
            options.dry_run = dry_run;
            options.verbose = verbose;
            if all_media {
                options.text_only = false;
            }
            if let Some(n) = max_articles {
                options.max_articles = Some(n);
            }
            if let Some(minutes) = min_read_time {
                options.min_read_time = minutes;
            }
            if let Some(date) = &since {
                options.since = Some(parse_since(date)?);
            }
            run_ingest(&config, &sources_path, options, source.as_deref()).await
        }
        Command::Curate {
            threshold,
            dry_run,
            verbose,
        } => {
            let mut options = config.ingest_options();
            options.dry_run = dry_run;
            options.verbose = verbose;
            run_curate(&config, &sources_path, options, threshold).await
        }
    }
}

fn build_client(config: &Config) -> Result<Arc<FeedClient>> {
    let client = FeedClient::new(FeedClientConfig {
        request_gap: Duration::from_millis(config.request_delay_ms),
        ..FeedClientConfig::default()
    })
    .context("Failed to build HTTP client")?;
    Ok(Arc::new(client))
}

fn parse_since(date: &str) -> Result<DateTime<Utc>> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid --since date '{date}', expected YYYY-MM-DD"))?;
    let midnight = parsed
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid --since date '{date}'"))?;
    Ok(midnight.and_utc())
}

async fn run_analyze(
    config: &Config,
    inputs: &[String],
    json: bool,
    min_score: Option<u8>,
) -> Result<()> {
    let client = build_client(config)?;
    let analyzer = Analyzer::new(client);

    // Progress goes to stderr so --json output stays parseable
    let (tx, mut rx) = mpsc::channel::<AnalyzeProgress>(16);
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            eprintln!(
                "[{}/{}] analyzing {}",
                progress.index + 1,
                progress.total,
                progress.slug
            );
        }
    });

    let batch = analyzer.analyze_many(inputs, Some(tx)).await;
    let _ = printer.await;

    let mut results: Vec<&PublicationAnalysis> = batch
        .results
        .iter()
        .filter(|a| min_score.map_or(true, |min| a.quality_score >= min))
        .collect();
    results.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No publications matched.");
    } else {
        println!("{:>5}  {:<24} {:<32} TOPICS", "SCORE", "SLUG", "NAME");
        for analysis in &results {
            println!(
                "{:>5}  {:<24} {:<32} {}",
                analysis.quality_score,
                analysis.slug,
                analysis.name,
                analysis.topics.join(", ")
            );
        }
    }

    if !batch.errors.is_empty() {
        for (input, error) in &batch.errors {
            eprintln!("Error: {input}: {error}");
        }
        anyhow::bail!(
            "{} of {} analyses failed",
            batch.errors.len(),
            inputs.len()
        );
    }
    Ok(())
}

async fn run_ingest(
    config: &Config,
    sources_path: &Path,
    options: IngestOptions,
    only: Option<&str>,
) -> Result<()> {
    let mut sources = load_sources(sources_path)?;
    if let Some(slug) = only {
        sources.retain(|s| s.slug == slug);
        if sources.is_empty() {
            anyhow::bail!(
                "Source '{}' not found in {}",
                slug,
                sources_path.display()
            );
        }
    }
    if sources.is_empty() {
        eprintln!("No sources configured at {}", sources_path.display());
        eprintln!();
        eprintln!("Add entries like:");
        eprintln!("  [[sources]]");
        eprintln!("  name = \"Example Letters\"");
        eprintln!("  slug = \"example-letters\"");
        eprintln!("  feed_url = \"https://example-letters.substack.com/feed\"");
        std::process::exit(1);
    }

    let client = build_client(config)?;
    let batch = ingest_sources(config, client, options, &sources).await?;
    print_batch(&batch);

    if !batch.success() {
        anyhow::bail!("Ingestion finished with errors");
    }
    Ok(())
}

async fn run_curate(
    config: &Config,
    sources_path: &Path,
    options: IngestOptions,
    threshold: u8,
) -> Result<()> {
    let sources = load_sources(sources_path)?;
    if sources.is_empty() {
        anyhow::bail!(
            "No sources configured at {}; add [[sources]] entries first",
            sources_path.display()
        );
    }

    // One client for both passes: the ingest fetch of a qualifying source
    // is served from the analysis fetch's cache.
    let client = build_client(config)?;
    let analyzer = Analyzer::new(client.clone());

    let mut qualified: Vec<PublicationSource> = Vec::new();
    for source in &sources {
        match analyzer.analyze(&source.feed_url).await {
            Ok(analysis) => {
                let keep = analysis.quality_score >= threshold;
                println!(
                    "{:>5}  {:<24} {}",
                    analysis.quality_score,
                    source.slug,
                    if keep { "ingest" } else { "below threshold" }
                );
                if keep {
                    qualified.push(source.clone());
                }
            }
            Err(e) => {
                eprintln!("Error: {}: analysis failed: {e}", source.slug);
            }
        }
    }

    if qualified.is_empty() {
        println!("No sources reached score {threshold}; nothing to ingest.");
        return Ok(());
    }

    println!();
    let batch = ingest_sources(config, client, options, &qualified).await?;
    print_batch(&batch);

    if !batch.success() {
        anyhow::bail!("Ingestion finished with errors");
    }
    Ok(())
}

async fn ingest_sources(
    config: &Config,
    client: Arc<FeedClient>,
    options: IngestOptions,
    sources: &[PublicationSource],
) -> Result<BatchReport> {
    let store = LibraryStore::new(&config.library_root);
    let mut ingestor = Ingestor::new(client, store, options);
    if let Some(path) = &config.catalog_path {
        let catalog = Catalog::open(path)
            .await
            .with_context(|| format!("Failed to open catalog at '{path}'"))?;
        ingestor = ingestor.with_catalog(catalog);
    }
    Ok(ingestor.ingest_batch(sources).await)
}

fn print_batch(batch: &BatchReport) {
    for report in &batch.reports {
        println!(
            "{:<24} stored {:>3}  skipped {:>3}  errors {:>3}",
            report.slug,
            report.stored,
            report.skipped,
            report.errors.len()
        );
    }
    println!(
        "\n{} stored, {} skipped, {} errors in {:.1}s",
        batch.total_stored(),
        batch.total_skipped(),
        batch.all_errors().count(),
        batch.duration.as_secs_f64()
    );
    for error in batch.all_errors() {
        eprintln!("  [{}] {}: {}", error.phase, error.title, error.message);
    }
    for note in batch.all_non_fatal() {
        eprintln!("  note: {note}");
    }
}
