use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::feed::{FeedItem, PublicationSource};
use crate::util::{read_time_minutes, slugify, strip_markup, word_count};

/// Conversion failures. The orchestrator records these against the item and
/// moves on; they never abort a run.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The item body produced no markdown at all.
    #[error("item has no usable content")]
    EmptyContent,

    /// Front matter could not be serialized.
    #[error("front matter serialization failed: {0}")]
    FrontMatter(#[from] toml::ser::Error),
}

/// Inputs that vary per run rather than per item.
#[derive(Debug, Clone, Copy)]
pub struct ConvertContext<'a> {
    pub source: &'a PublicationSource,
    /// When the feed snapshot was retrieved.
    pub fetched_at: DateTime<Utc>,
    /// When this run started processing items.
    pub ingested_at: DateTime<Utc>,
}

/// Metadata recorded as TOML front matter at the top of every document.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleMeta {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub word_count: u32,
    pub read_time_minutes: u32,
    pub fetched_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

/// A feed item rendered to a markdown document, ready for the store.
#[derive(Debug, Clone)]
pub struct ConvertedArticle {
    pub publication_slug: String,
    /// Filename-safe slug derived from the title.
    pub slug: String,
    pub meta: ArticleMeta,
    /// Markdown body without front matter. Enrichment works on this.
    pub body: String,
    /// The complete document as written to disk.
    pub document: String,
}

/// Renders one feed item to a markdown document. Pure: the same item and
/// context always produce the same document.
///
/// The body is converted from the item's markup with `htmd`; when that
/// fails the stripped plain text is used instead. Word count and read time
/// are measured on the stripped text, matching the analysis metrics.
/// An author configured on the source overrides whatever the item carries.
///
/// # Errors
///
/// [`ConvertError::EmptyContent`] when there is no body text left after
/// conversion.
pub fn convert(item: &FeedItem, ctx: &ConvertContext<'_>) -> Result<ConvertedArticle, ConvertError> {
    let body = to_markdown(&item.content);
    if body.is_empty() {
        return Err(ConvertError::EmptyContent);
    }

    let plain = strip_markup(&item.content);
    let words = word_count(&plain);

    let meta = ArticleMeta {
        title: item.title.clone(),
        url: item.url.clone(),
        published: item.published,
        author: ctx.source.author.clone().or_else(|| item.author.clone()),
        tags: item.tags.clone(),
        word_count: words,
        read_time_minutes: read_time_minutes(words),
        fetched_at: ctx.fetched_at,
        ingested_at: ctx.ingested_at,
    };

    let front = toml::to_string(&meta)?;
    let document = format!("+++\n{front}+++\n\n{body}\n");

    Ok(ConvertedArticle {
        publication_slug: ctx.source.slug.clone(),
        slug: slugify(&item.title),
        meta,
        body,
        document,
    })
}

/// HTML to markdown, falling back to stripped plain text when the markup
/// cannot be parsed.
fn to_markdown(content: &str) -> String {
    htmd::convert(content)
        .unwrap_or_else(|_| strip_markup(content).into_owned())
        .trim()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::feed::MediaKind;

    fn source() -> PublicationSource {
        PublicationSource {
            name: "Example Letters".to_string(),
            slug: "example-letters".to_string(),
            feed_url: "https://example-letters.substack.com/feed".to_string(),
            author: None,
        }
    }

    fn item(content: &str) -> FeedItem {
        FeedItem {
            guid: "guid-1".to_string(),
            title: "A Modest Post".to_string(),
            url: "https://example-letters.substack.com/p/a-modest-post".to_string(),
            published: Some(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()),
            author: Some("Item Author".to_string()),
            content: content.to_string(),
            summary: None,
            image: None,
            media: MediaKind::Text,
            tags: vec!["essays".to_string()],
        }
    }

    fn ctx(source: &PublicationSource) -> ConvertContext<'_> {
        ConvertContext {
            source,
            fetched_at: Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).unwrap(),
            ingested_at: Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 5).unwrap(),
        }
    }

    // ========================================================================
    // Markdown Conversion
    // ========================================================================

    #[test]
    fn test_converts_html_to_markdown() {
        let src = source();
        let article = convert(
            &item("<h1>Heading</h1><p>Hello <strong>world</strong></p>"),
            &ctx(&src),
        )
        .unwrap();

        assert!(article.body.contains("# Heading"));
        assert!(article.body.contains("**world**"));
        assert!(!article.body.contains('<'));
    }

    #[test]
    fn test_plain_text_passes_through() {
        let src = source();
        let article = convert(&item("Just some plain words."), &ctx(&src)).unwrap();
        assert_eq!(article.body, "Just some plain words.");
    }

    #[test]
    fn test_empty_content_is_an_error() {
        let src = source();
        let err = convert(&item("   "), &ctx(&src)).unwrap_err();
        assert!(matches!(err, ConvertError::EmptyContent));
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    #[test]
    fn test_item_author_used_when_source_has_none() {
        let src = source();
        let article = convert(&item("<p>body</p>"), &ctx(&src)).unwrap();
        assert_eq!(article.meta.author.as_deref(), Some("Item Author"));
    }

    #[test]
    fn test_source_author_overrides_item_author() {
        let mut src = source();
        src.author = Some("Configured Author".to_string());
        let article = convert(&item("<p>body</p>"), &ctx(&src)).unwrap();
        assert_eq!(article.meta.author.as_deref(), Some("Configured Author"));
    }

    #[test]
    fn test_word_count_measured_on_stripped_text() {
        let src = source();
        let article = convert(
            &item("<p>one two three</p><p>four five</p>"),
            &ctx(&src),
        )
        .unwrap();

        assert_eq!(article.meta.word_count, 5);
        assert_eq!(article.meta.read_time_minutes, 1);
    }

    #[test]
    fn test_read_time_rounds_up() {
        let body = format!("<p>{}</p>", "word ".repeat(401));
        let src = source();
        let article = convert(&item(&body), &ctx(&src)).unwrap();
        assert_eq!(article.meta.read_time_minutes, 3);
    }

    #[test]
    fn test_slugs_derived_from_source_and_title() {
        let src = source();
        let article = convert(&item("<p>body</p>"), &ctx(&src)).unwrap();
        assert_eq!(article.publication_slug, "example-letters");
        assert_eq!(article.slug, "a-modest-post");
    }

    // ========================================================================
    // Document Rendering
    // ========================================================================

    #[test]
    fn test_document_has_front_matter_fences() {
        let src = source();
        let article = convert(&item("<p>Hello</p>"), &ctx(&src)).unwrap();

        assert!(article.document.starts_with("+++\n"));
        let after_open = &article.document[4..];
        let close = after_open.find("+++\n").unwrap();
        let front = &after_open[..close];

        assert!(front.contains("title = \"A Modest Post\""));
        assert!(front.contains(
            "url = \"https://example-letters.substack.com/p/a-modest-post\""
        ));
        assert!(front.contains("word_count = 1"));
        assert!(front.contains("published = \"2024-03-05T12:00:00Z\""));
        assert!(front.contains("tags = [\"essays\"]"));
        assert!(article.document.ends_with("Hello\n"));
    }

    #[test]
    fn test_front_matter_omits_absent_fields() {
        let src = source();
        let mut it = item("<p>Hello</p>");
        it.published = None;
        it.author = None;
        it.tags = Vec::new();

        let article = convert(&it, &ctx(&src)).unwrap();
        assert!(!article.document.contains("published"));
        assert!(!article.document.contains("author"));
        assert!(!article.document.contains("tags"));
    }
}
