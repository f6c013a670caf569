//! Scores publications for quality and curates a markdown reading library
//! from their feeds.
//!
//! The two halves are independent and composed by the caller:
//!
//! - [`analysis`] turns a publication's feed history into a deterministic
//!   0-100 quality score with activity, length, depth, and consistency
//!   components.
//! - [`ingest`] walks feed items through a filter/convert/persist pipeline
//!   into a markdown library, with per-item accounting.
//!
//! Shared plumbing: [`feed`] fetches and normalizes feeds (rate limited,
//! cached), [`content`] converts items and owns the on-disk library,
//! [`catalog`] keeps a rebuildable SQLite index, [`util`] validates
//! user-supplied identifiers before any I/O happens.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod content;
pub mod feed;
pub mod ingest;
pub mod util;
