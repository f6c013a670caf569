//! Ingestion orchestration.
//!
//! One source at a time, one item at a time: fetch the feed, walk every
//! item through a fixed filter/convert/persist pipeline, and account for
//! each outcome. Skips are normal filter behavior; only conversion and
//! store failures (or an unreachable feed) count against a run.
//!
//! The pipeline order is deliberate. The existence check runs first so
//! re-running over an unchanged feed stores nothing; the catalog is only
//! touched after a document is safely on disk, because the filesystem is
//! the source of truth and the catalog a rebuildable index.

mod orchestrator;
mod report;

pub use orchestrator::{IngestOptions, Ingestor};
pub use report::{BatchReport, IngestionReport, ItemError, ItemOutcome, Phase};
