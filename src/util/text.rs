use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Assumed reading speed when estimating read time.
const WORDS_PER_MINUTE: u32 = 200;

/// Maximum length of a generated slug, in bytes.
const MAX_SLUG_LEN: usize = 80;

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap())
}

fn whitespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Reduces feed-supplied markup to plain text.
///
/// Decodes HTML entities, removes tags (each tag acts as a word boundary so
/// `<p>a</p><p>b</p>` stays two words), collapses runs of whitespace to a
/// single space, and trims the ends.
///
/// Returns `Cow::Borrowed` when the input is already plain collapsed text
/// (the common case for titles).
///
/// # Examples
///
/// ```
/// use glean::util::strip_markup;
///
/// assert_eq!(strip_markup("plain title"), "plain title");
/// assert_eq!(strip_markup("<p>Hello</p><p>world</p>"), "Hello world");
/// assert_eq!(strip_markup("a &amp; b"), "a & b");
/// ```
pub fn strip_markup(s: &str) -> Cow<'_, str> {
    if is_plain_collapsed(s) {
        return Cow::Borrowed(s);
    }

    let decoded = html_escape::decode_html_entities(s);
    let stripped = tag_pattern().replace_all(&decoded, " ");
    let collapsed = whitespace_pattern().replace_all(stripped.trim(), " ");
    Cow::Owned(collapsed.into_owned())
}

/// Fast-path check: no tags or entities to rewrite, whitespace already
/// single spaces with none at the ends.
fn is_plain_collapsed(s: &str) -> bool {
    if s.starts_with(' ') || s.ends_with(' ') {
        return false;
    }
    let mut prev_space = false;
    for c in s.chars() {
        match c {
            '<' | '&' => return false,
            ' ' => {
                if prev_space {
                    return false;
                }
                prev_space = true;
            }
            c if c.is_whitespace() => return false,
            _ => prev_space = false,
        }
    }
    true
}

/// Counts whitespace-separated words in already-stripped text.
pub fn word_count(s: &str) -> u32 {
    s.split_whitespace().count() as u32
}

/// Estimated minutes to read `words` words, at 200 words per minute.
///
/// Always at least 1, so even a stub post registers as a minute of reading.
///
/// # Examples
///
/// ```
/// use glean::util::read_time_minutes;
///
/// assert_eq!(read_time_minutes(0), 1);
/// assert_eq!(read_time_minutes(200), 1);
/// assert_eq!(read_time_minutes(201), 2);
/// assert_eq!(read_time_minutes(1000), 5);
/// ```
pub fn read_time_minutes(words: u32) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Derives a filesystem-safe slug from a title.
///
/// ASCII alphanumerics are lowercased and kept; every other run of
/// characters becomes a single `-`. Leading/trailing dashes are dropped and
/// the result is capped at 80 bytes. When nothing usable survives (an empty
/// or fully non-ASCII title), falls back to `item-` plus a short stable hash
/// of the input so distinct titles still get distinct slugs.
///
/// # Examples
///
/// ```
/// use glean::util::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  Rates -- and Curves  "), "rates-and-curves");
/// assert!(slugify("日本語").starts_with("item-"));
/// ```
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len().min(MAX_SLUG_LEN));
    let mut prev_dash = false;

    for c in s.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash && !slug.is_empty() {
            slug.push('-');
            prev_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        let hash = format!("{:x}", Sha256::digest(s.as_bytes()));
        slug = format!("item-{}", &hash[..12]);
    }

    slug
}
