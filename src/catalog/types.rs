use sqlx::FromRow;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Catalog errors with user-facing messages. During ingestion these are
/// demoted to the report's non-fatal channel; the stored document always
/// wins over its index entry.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Another process has the catalog database locked.
    #[error("Another process appears to be using the catalog. Please close it and try again.")]
    Locked,

    /// Schema migration failed.
    #[error("Catalog migration failed: {0}")]
    Migration(String),

    /// Generic database error.
    #[error("Catalog error: {0}")]
    Other(#[from] sqlx::Error),
}

impl CatalogError {
    /// Classify a sqlx error, recognizing SQLite lock conditions.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return CatalogError::Locked;
        }

        CatalogError::Other(err)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A cataloged publication.
#[derive(Debug, Clone, FromRow)]
pub struct PublicationRecord {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub feed_url: String,
    pub url: Option<String>,
    pub author: Option<String>,
    /// Unix timestamp of first cataloging.
    pub created_at: i64,
}

/// A cataloged article. `url` is the canonical identity; `stored_path`
/// points at the markdown document in the library.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRecord {
    pub id: i64,
    pub publication_id: i64,
    pub slug: String,
    pub title: String,
    pub url: String,
    /// Unix timestamp, absent for undated items.
    pub published: Option<i64>,
    pub author: Option<String>,
    pub word_count: i64,
    pub read_time_minutes: i64,
    pub stored_path: String,
    /// Unix timestamp of the run that stored the document.
    pub ingested_at: i64,
}

// ============================================================================
// Insert Shapes
// ============================================================================

/// Fields for a new publication row.
#[derive(Debug, Clone)]
pub struct NewPublication {
    pub slug: String,
    pub name: String,
    pub feed_url: String,
    pub url: Option<String>,
    pub author: Option<String>,
}

/// Fields for a new article row.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub publication_id: i64,
    pub slug: String,
    pub title: String,
    pub url: String,
    pub published: Option<i64>,
    pub author: Option<String>,
    pub word_count: u32,
    pub read_time_minutes: u32,
    pub stored_path: String,
}
