use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use super::convert::ConvertedArticle;

/// Store failures. These are per-item; the orchestrator records them and
/// keeps going.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A slug reached the store that could escape the library root.
    /// Slugs are validated upstream, so hitting this means a caller bypassed
    /// the pipeline.
    #[error("unsafe path segment: {0:?}")]
    UnsafeSlug(String),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Receipt for a stored document.
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub path: PathBuf,
    pub word_count: u32,
    pub read_time_minutes: u32,
}

/// Writes markdown documents under `{root}/{publication}/{article}.md`.
///
/// Writes are atomic (temp file then rename), so a crash mid-write never
/// leaves a partial document behind.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    root: PathBuf,
}

impl LibraryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a document for this publication/article pair is already on
    /// disk. Unsafe slugs report false; the write path rejects them with a
    /// proper error.
    pub fn article_exists(&self, publication_slug: &str, article_slug: &str) -> bool {
        if !is_safe_slug(publication_slug) || !is_safe_slug(article_slug) {
            return false;
        }
        self.article_path(publication_slug, article_slug).is_file()
    }

    /// Writes the document, replacing any previous version atomically.
    pub fn store(&self, article: &ConvertedArticle) -> Result<StoredArticle, StoreError> {
        for slug in [&article.publication_slug, &article.slug] {
            if !is_safe_slug(slug) {
                return Err(StoreError::UnsafeSlug(slug.clone()));
            }
        }

        let dir = self.root.join(&article.publication_slug);
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let path = self.article_path(&article.publication_slug, &article.slug);
        atomic_write(&path, article.document.as_bytes()).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "Stored article");

        Ok(StoredArticle {
            path,
            word_count: article.meta.word_count,
            read_time_minutes: article.meta.read_time_minutes,
        })
    }

    fn article_path(&self, publication_slug: &str, article_slug: &str) -> PathBuf {
        self.root
            .join(publication_slug)
            .join(format!("{article_slug}.md"))
    }
}

/// Single path segments only: ASCII alphanumeric plus `-` and `_`, so no
/// separators and no `..`.
fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Write-to-temp-then-rename so the destination is never partial. The temp
/// name carries a nanosecond suffix, so a concurrent writer cannot predict
/// or collide with it.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{suffix:016x}"));

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    if let Err(e) = temp_file.write_all(bytes).and_then(|()| temp_file.sync_all()) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(temp_file);

    // Rename on Windows fails when the destination exists
    #[cfg(windows)]
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
