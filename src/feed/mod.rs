//! Feed retrieval and normalization.
//!
//! This module owns everything between a feed URL and the normalized
//! [`Feed`] shape the engines consume:
//!
//! - **Types**: [`Feed`], [`FeedItem`], [`MediaKind`], [`PublicationSource`]
//! - **Parsing**: RSS/Atom bytes into a [`Feed`] via the `feed-rs` crate
//! - **Fetching**: rate-limited HTTP retrieval with retry, size caps, and
//!   an in-process cache
//!
//! # Architecture
//!
//! - `parser` holds the pure bytes-to-[`Feed`] step
//! - `limiter` is the single request gate shared by a run
//! - `client` composes both behind [`FeedClient::fetch`]
//!
//! # Example
//!
//! ```ignore
//! use glean::feed::{FeedClient, FeedClientConfig};
//!
//! let client = FeedClient::new(FeedClientConfig::default())?;
//! let fetched = client.fetch("https://example.com/feed.xml").await?;
//! println!("{} items", fetched.feed.items.len());
//! ```

mod client;
mod limiter;
mod parser;
mod types;

pub use client::{FeedClient, FeedClientConfig, FetchError, FetchedFeed};
pub use limiter::RateLimiter;
pub use parser::{parse_feed, ParseResult};
pub use types::{Feed, FeedItem, MediaKind, PublicationSource};
