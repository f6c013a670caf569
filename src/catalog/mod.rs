//! Persistent catalog of publications, articles, and their outbound links.
//!
//! The catalog is an index over the markdown library, not the source of
//! truth: losing it loses nothing that a re-ingest cannot rebuild. Ingestion
//! therefore treats every catalog failure as non-fatal.

mod db;
mod enrich;
mod types;

pub use db::Catalog;
pub use enrich::{EnrichError, Enricher, LinkEnricher};
pub use types::{ArticleRecord, CatalogError, NewArticle, NewPublication, PublicationRecord};
