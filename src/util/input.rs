use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors produced when a publication identifier fails validation.
///
/// Validation runs before any network or filesystem access and is the only
/// defense against path traversal via user-supplied identifiers, so the
/// rules are strict and the messages stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The input was the empty string.
    #[error("Input must be a non-empty string")]
    Empty,
    /// The input contained only whitespace.
    #[error("Input cannot be empty")]
    Blank,
    /// The input looked like a URL but is not an http(s) URL with a dotted
    /// hostname.
    #[error("Invalid feed URL format")]
    InvalidUrl,
    /// The input contained path-traversal sequences (`..` or `//`).
    #[error("Invalid characters in input")]
    InvalidCharacters,
    /// The input failed the slug shape check.
    #[error("Invalid slug format: must start with a letter or digit and use only letters, digits, hyphens, or underscores (max 63 characters)")]
    InvalidSlug,
}

/// A validated publication identifier, borrowed from the caller's input
/// with surrounding whitespace removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInput<'a> {
    /// A bare publication slug, e.g. `astralcodexten`.
    Slug(&'a str),
    /// A full feed URL, e.g. `https://example.com/feed.xml`.
    FeedUrl(&'a str),
}

impl<'a> SourceInput<'a> {
    /// The validated string itself, whichever form it took.
    pub fn as_str(&self) -> &'a str {
        match self {
            SourceInput::Slug(s) | SourceInput::FeedUrl(s) => s,
        }
    }
}

fn feed_url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // scheme://host.tld[/path]: dotted host, >=2-letter TLD, no port,
        // path restricted to the RFC 3986 charset
        Regex::new(
            r"^https?://[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}(?:/[A-Za-z0-9._~:/?#\[\]@!$&'()*+,;=%-]*)?$",
        )
        .unwrap()
    })
}

fn slug_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,62}$").unwrap())
}

/// Validates a raw publication identifier (slug or feed URL).
///
/// Rules, checked in order:
///
/// 1. The empty string is rejected ([`InputError::Empty`]).
/// 2. Whitespace-only input is rejected ([`InputError::Blank`]); otherwise
///    the input is trimmed before the remaining checks.
/// 3. Input containing `://` is treated as a URL and must be
///    `http(s)://host.tld[/path]` with a dotted hostname and a TLD of at
///    least two letters ([`InputError::InvalidUrl`]).
/// 4. Anything else is treated as a slug: `..` and `//` are rejected
///    outright ([`InputError::InvalidCharacters`]), then the slug must
///    start with an ASCII alphanumeric and contain at most 63 characters
///    from `[A-Za-z0-9_-]` ([`InputError::InvalidSlug`]).
///
/// # Returns
///
/// The trimmed input tagged as [`SourceInput::Slug`] or
/// [`SourceInput::FeedUrl`].
///
/// # Examples
///
/// ```
/// use glean::util::{validate_input, InputError, SourceInput};
///
/// assert_eq!(validate_input("acx"), Ok(SourceInput::Slug("acx")));
/// assert_eq!(
///     validate_input("https://example.com/feed.xml"),
///     Ok(SourceInput::FeedUrl("https://example.com/feed.xml")),
/// );
/// assert_eq!(validate_input("../etc"), Err(InputError::InvalidCharacters));
/// assert_eq!(validate_input("file:///etc/passwd"), Err(InputError::InvalidUrl));
/// ```
pub fn validate_input(input: &str) -> Result<SourceInput<'_>, InputError> {
    if input.is_empty() {
        return Err(InputError::Empty);
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Blank);
    }

    if trimmed.contains("://") {
        if feed_url_pattern().is_match(trimmed) {
            return Ok(SourceInput::FeedUrl(trimmed));
        }
        return Err(InputError::InvalidUrl);
    }

    if trimmed.contains("..") || trimmed.contains("//") {
        return Err(InputError::InvalidCharacters);
    }

    if slug_pattern().is_match(trimmed) {
        Ok(SourceInput::Slug(trimmed))
    } else {
        Err(InputError::InvalidSlug)
    }
}
