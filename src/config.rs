//! Configuration for ~/.config/glean/config.toml and the sources list.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos. Sources are
//! a separate TOML file so the curated list can be edited and versioned on its
//! own; every entry is validated at load time, before any network access.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::feed::PublicationSource;
use crate::ingest::IngestOptions;
use crate::util::{validate_input, SourceInput};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A sources entry failed validation.
    #[error("Invalid source {name:?}: {reason}")]
    InvalidSource { name: String, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the markdown library.
    pub library_root: PathBuf,

    /// Catalog database path. None disables the catalog entirely.
    pub catalog_path: Option<String>,

    /// Delay between feed requests and between batch sources, in ms.
    pub request_delay_ms: u64,

    /// Minimum estimated read time for ingested articles (0 = no minimum).
    pub min_read_time_minutes: u32,

    /// Skip audio/video items during ingestion.
    pub text_only: bool,

    /// Maximum articles considered per source (0 = unlimited).
    pub max_articles_per_source: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("library"),
            catalog_path: None,
            request_delay_ms: 1000,
            min_read_time_minutes: 2,
            text_only: true,
            max_articles_per_source: 0,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion from a
        // maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "library_root",
                "catalog_path",
                "request_delay_ms",
                "min_read_time_minutes",
                "text_only",
                "max_articles_per_source",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            library_root = %config.library_root.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Baseline ingestion options from this config. A pure derivation; CLI
    /// flags are layered on by the caller.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            request_delay: Duration::from_millis(self.request_delay_ms),
            max_articles: if self.max_articles_per_source > 0 {
                Some(self.max_articles_per_source as usize)
            } else {
                None
            },
            since: None,
            dry_run: false,
            text_only: self.text_only,
            min_read_time: self.min_read_time_minutes,
            verbose: false,
        }
    }
}

// ============================================================================
// Sources List
// ============================================================================

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<PublicationSource>,
}

/// Load the `[[sources]]` list, validating every slug and feed URL before
/// anything touches the network or filesystem.
///
/// A missing file is an empty list, not an error.
pub fn load_sources(path: &Path) -> Result<Vec<PublicationSource>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No sources file found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };

    let file: SourcesFile = toml::from_str(&content)?;

    for source in &file.sources {
        match validate_input(&source.slug) {
            Ok(SourceInput::Slug(_)) => {}
            Ok(SourceInput::FeedUrl(_)) => {
                return Err(ConfigError::InvalidSource {
                    name: source.name.clone(),
                    reason: "slug must not be a URL".to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidSource {
                    name: source.name.clone(),
                    reason: e.to_string(),
                });
            }
        }

        match validate_input(&source.feed_url) {
            Ok(SourceInput::FeedUrl(_)) => {}
            Ok(SourceInput::Slug(_)) => {
                return Err(ConfigError::InvalidSource {
                    name: source.name.clone(),
                    reason: "feed_url must be an http(s) URL".to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidSource {
                    name: source.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(path = %path.display(), count = file.sources.len(), "Loaded sources");
    Ok(file.sources)
}

// ============================================================================
// Tests
// ============================================================================
