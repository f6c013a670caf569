//! Utility functions shared across the crate.
//!
//! This module provides reusable utilities for:
//!
//! - **Input validation**: strict slug/feed-URL checks that run before any
//!   network or filesystem access
//! - **Text processing**: markup stripping, word counting, read-time
//!   estimation, and slug derivation
//!
//! # Examples
//!
//! ```
//! use glean::util::{validate_input, slugify, strip_markup, word_count};
//!
//! // Validate a publication identifier before touching the network
//! let input = validate_input("astralcodexten").unwrap();
//!
//! // Reduce feed markup to countable text
//! let text = strip_markup("<p>Hello world</p>");
//! assert_eq!(word_count(&text), 2);
//!
//! // Derive the storage slug for an article title
//! assert_eq!(slugify("Why Rates Matter"), "why-rates-matter");
//! ```

mod input;
mod text;

pub use input::{validate_input, InputError, SourceInput};
pub use text::{read_time_minutes, slugify, strip_markup, word_count};
