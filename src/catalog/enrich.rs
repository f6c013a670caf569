use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use super::db::Catalog;
use super::types::CatalogError;
use crate::content::ConvertedArticle;

/// Enrichment failures. Reported in the run's non-fatal channel; the
/// article itself is already stored when enrichment runs.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Post-store hook invoked once for each newly cataloged article.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Returns how many records the pass added.
    async fn enrich(
        &self,
        catalog: &Catalog,
        article_id: i64,
        article: &ConvertedArticle,
    ) -> Result<usize, EnrichError>;
}

/// Records the absolute links an article's markdown body references, so
/// the catalog can answer "who cites whom" later.
#[derive(Debug, Default)]
pub struct LinkEnricher;

#[async_trait]
impl Enricher for LinkEnricher {
    async fn enrich(
        &self,
        catalog: &Catalog,
        article_id: i64,
        article: &ConvertedArticle,
    ) -> Result<usize, EnrichError> {
        let links = extract_links(&article.body);
        if links.is_empty() {
            return Ok(0);
        }

        let added = catalog.add_article_links(article_id, &links).await?;
        tracing::debug!(article_id = article_id, added = added, "Recorded article links");
        Ok(added)
    }
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Inline links/images `](https://…)` and autolinks `<https://…>`
    PATTERN.get_or_init(|| {
        Regex::new(r"\]\((https?://[^)\s]+)\)|<(https?://[^>\s]+)>").unwrap()
    })
}

/// Absolute link targets in document order, first occurrence only.
/// Relative links are skipped; they cannot be resolved without the page.
fn extract_links(body: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for captures in link_pattern().captures_iter(body) {
        let Some(url) = captures.get(1).or_else(|| captures.get(2)) else {
            continue;
        };
        let url = url.as_str().to_string();
        if !links.contains(&url) {
            links.push(url);
        }
    }
    links
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::catalog::types::{NewArticle, NewPublication};
    use crate::content::ArticleMeta;

    // ========================================================================
    // Link Extraction
    // ========================================================================

    #[test]
    fn test_extracts_inline_links() {
        let links = extract_links("See [the report](https://example.com/report) for details.");
        assert_eq!(links, vec!["https://example.com/report"]);
    }

    #[test]
    fn test_extracts_autolinks() {
        let links = extract_links("Raw: <https://example.com/raw>");
        assert_eq!(links, vec!["https://example.com/raw"]);
    }

    #[test]
    fn test_skips_relative_links() {
        let links = extract_links("[local](/p/other-post) and [anchor](#section)");
        assert!(links.is_empty());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let body = "[a](https://example.com/a) then [again](https://example.com/a) \
                    then [b](https://example.com/b)";
        let links = extract_links(body);
        assert_eq!(links, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_images_count_as_links() {
        let links = extract_links("![chart](https://example.com/chart.png)");
        assert_eq!(links, vec!["https://example.com/chart.png"]);
    }

    // ========================================================================
    // Enrichment
    // ========================================================================

    fn converted(body: &str) -> ConvertedArticle {
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).unwrap();
        ConvertedArticle {
            publication_slug: "letters".to_string(),
            slug: "first".to_string(),
            meta: ArticleMeta {
                title: "First".to_string(),
                url: "https://letters.substack.com/p/first".to_string(),
                published: None,
                author: None,
                tags: Vec::new(),
                word_count: 10,
                read_time_minutes: 1,
                fetched_at: now,
                ingested_at: now,
            },
            body: body.to_string(),
            document: String::new(),
        }
    }

    async fn cataloged_article_id(catalog: &Catalog) -> i64 {
        let publication = catalog
            .create_publication(&NewPublication {
                slug: "letters".to_string(),
                name: "Letters".to_string(),
                feed_url: "https://letters.substack.com/feed".to_string(),
                url: None,
                author: None,
            })
            .await
            .unwrap();
        catalog
            .create_article(&NewArticle {
                publication_id: publication.id,
                slug: "first".to_string(),
                title: "First".to_string(),
                url: "https://letters.substack.com/p/first".to_string(),
                published: None,
                author: None,
                word_count: 10,
                read_time_minutes: 1,
                stored_path: "library/letters/first.md".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_link_enricher_records_links_once() {
        let catalog = Catalog::open(":memory:").await.unwrap();
        let article_id = cataloged_article_id(&catalog).await;
        let article = converted(
            "Cites [a](https://example.com/a) and [b](https://example.com/b).",
        );

        let enricher = LinkEnricher;
        assert_eq!(
            enricher.enrich(&catalog, article_id, &article).await.unwrap(),
            2
        );
        assert_eq!(
            enricher.enrich(&catalog, article_id, &article).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_linkless_body_adds_nothing() {
        let catalog = Catalog::open(":memory:").await.unwrap();
        let article_id = cataloged_article_id(&catalog).await;
        let article = converted("No links here at all.");

        let enricher = LinkEnricher;
        assert_eq!(
            enricher.enrich(&catalog, article_id, &article).await.unwrap(),
            0
        );
        assert!(catalog.article_links(article_id).await.unwrap().is_empty());
    }
}
