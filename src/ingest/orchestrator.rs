use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::report::{BatchReport, IngestionReport, ItemError, ItemOutcome, Phase};
use crate::catalog::{Catalog, CatalogError, Enricher, LinkEnricher, NewArticle, NewPublication};
use crate::content::{convert, ConvertContext, ConvertedArticle, LibraryStore, StoredArticle};
use crate::feed::{FeedClient, FeedItem, FetchError, MediaKind, PublicationSource};
use crate::util::slugify;

/// Knobs for an ingestion run. Merged once from config and CLI flags; the
/// orchestrator never consults anything else at runtime.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Pause between sources in a batch. The feed client separately spaces
    /// its own requests.
    pub request_delay: Duration,
    /// Cap on items considered per source, in feed order.
    pub max_articles: Option<usize>,
    /// Items published strictly before this are skipped. Undated items are
    /// never date-filtered.
    pub since: Option<DateTime<Utc>>,
    /// Report what would be stored without touching storage.
    pub dry_run: bool,
    /// Skip items classified as audio or video.
    pub text_only: bool,
    /// Minimum estimated read time in minutes; 0 disables the filter.
    pub min_read_time: u32,
    /// Log every skip at info level instead of debug.
    pub verbose: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(1000),
            max_articles: None,
            since: None,
            dry_run: false,
            text_only: true,
            min_read_time: 2,
            verbose: false,
        }
    }
}

/// Walks feed items through the filter/convert/persist pipeline and
/// accounts for every outcome.
pub struct Ingestor {
    client: Arc<FeedClient>,
    store: LibraryStore,
    catalog: Option<Catalog>,
    enricher: Arc<dyn Enricher>,
    options: IngestOptions,
}

impl Ingestor {
    pub fn new(client: Arc<FeedClient>, store: LibraryStore, options: IngestOptions) -> Self {
        Self {
            client,
            store,
            catalog: None,
            enricher: Arc::new(LinkEnricher),
            options,
        }
    }

    /// Attach a catalog. Stored articles are indexed in it and newly
    /// created records go through the enricher.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the default [`LinkEnricher`].
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    /// Ingest one source. Never fails outright: every problem lands in the
    /// returned report.
    pub async fn ingest_source(&self, source: &PublicationSource) -> IngestionReport {
        let started = std::time::Instant::now();
        let mut report = IngestionReport::new(source.slug.clone());

        tracing::info!(slug = %source.slug, feed_url = %source.feed_url, "Ingesting source");

        let fetched = match self.client.fetch(&source.feed_url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let phase = match e {
                    FetchError::Parse(_) => Phase::Parse,
                    _ => Phase::Fetch,
                };
                tracing::warn!(slug = %source.slug, error = %e, "Feed unavailable");
                report.fail_source(ItemError {
                    phase,
                    title: source.name.clone(),
                    url: Some(source.feed_url.clone()),
                    message: e.to_string(),
                });
                report.duration = started.elapsed();
                return report;
            }
        };

        let ctx = ConvertContext {
            source,
            fetched_at: fetched.fetched_at,
            ingested_at: Utc::now(),
        };
        let site_url = fetched.feed.link.as_deref();

        let limit = self.options.max_articles.unwrap_or(usize::MAX);
        for item in fetched.feed.items.iter().take(limit) {
            let outcome = self
                .process_item(item, &ctx, site_url, &mut report.non_fatal)
                .await;
            self.log_outcome(&source.slug, &outcome);
            report.record(outcome);
        }

        report.duration = started.elapsed();
        tracing::info!(
            slug = %source.slug,
            processed = report.processed,
            stored = report.stored,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Source done"
        );
        report
    }

    /// Ingest sources strictly in order, pausing `request_delay` between
    /// consecutive sources and never after the last.
    pub async fn ingest_batch(&self, sources: &[PublicationSource]) -> BatchReport {
        let started = std::time::Instant::now();
        let mut reports = Vec::with_capacity(sources.len());

        for (index, source) in sources.iter().enumerate() {
            if index > 0 && !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }
            reports.push(self.ingest_source(source).await);
        }

        BatchReport {
            reports,
            duration: started.elapsed(),
        }
    }

    /// The per-item pipeline. Filters run in a fixed order and the first
    /// match wins; conversion and store failures are terminal for the item
    /// only.
    async fn process_item(
        &self,
        item: &FeedItem,
        ctx: &ConvertContext<'_>,
        site_url: Option<&str>,
        non_fatal: &mut Vec<String>,
    ) -> ItemOutcome {
        let source = ctx.source;
        let article_slug = slugify(&item.title);

        // 1. Existence check before anything else, so re-runs are idempotent
        if self.store.article_exists(&source.slug, &article_slug) {
            return ItemOutcome::Skipped {
                title: item.title.clone(),
                reason: "already exists".to_string(),
            };
        }

        // 2. Media-type filter
        if self.options.text_only && item.media != MediaKind::Text {
            return ItemOutcome::Skipped {
                title: item.title.clone(),
                reason: format!("{} content", item.media.as_str()),
            };
        }

        // 3. Date filter
        if let (Some(since), Some(published)) = (self.options.since, item.published) {
            if published < since {
                return ItemOutcome::Skipped {
                    title: item.title.clone(),
                    reason: format!("published before {}", since.format("%Y-%m-%d")),
                };
            }
        }

        // 4. Conversion
        let article = match convert(item, ctx) {
            Ok(article) => article,
            Err(e) => {
                return ItemOutcome::Errored(ItemError {
                    phase: Phase::Convert,
                    title: item.title.clone(),
                    url: Some(item.url.clone()),
                    message: e.to_string(),
                })
            }
        };

        // 5. Minimum-length filter
        let minimum = self.options.min_read_time;
        if minimum > 0 && article.meta.read_time_minutes < minimum {
            return ItemOutcome::Skipped {
                title: item.title.clone(),
                reason: format!(
                    "read time {} min below minimum {} min",
                    article.meta.read_time_minutes, minimum
                ),
            };
        }

        // 6. Dry-run short-circuit
        if self.options.dry_run {
            return ItemOutcome::Skipped {
                title: item.title.clone(),
                reason: "dry run: would be stored".to_string(),
            };
        }

        // 7. Persist
        let stored = match self.store.store(&article) {
            Ok(stored) => stored,
            Err(e) => {
                return ItemOutcome::Errored(ItemError {
                    phase: Phase::Store,
                    title: item.title.clone(),
                    url: Some(item.url.clone()),
                    message: e.to_string(),
                })
            }
        };

        // 8 + 9. Catalog upsert and enrichment: the document is on disk, so
        // nothing past this point can fail the item
        if let Some(catalog) = &self.catalog {
            match self
                .catalog_article(catalog, source, site_url, &article, &stored)
                .await
            {
                Ok(Some(article_id)) => {
                    match self.enricher.enrich(catalog, article_id, &article).await {
                        Ok(added) => {
                            tracing::debug!(title = %item.title, added = added, "Enriched article");
                        }
                        Err(e) => {
                            tracing::warn!(title = %item.title, error = %e, "Enrichment failed");
                            non_fatal.push(format!("enrich {}: {e}", item.title));
                        }
                    }
                }
                Ok(None) => {} // already cataloged under this URL
                Err(e) => {
                    tracing::warn!(title = %item.title, error = %e, "Catalog update failed");
                    non_fatal.push(format!("catalog {}: {e}", item.title));
                }
            }
        }

        ItemOutcome::Stored {
            title: item.title.clone(),
            path: stored.path,
            word_count: stored.word_count,
            read_time_minutes: stored.read_time_minutes,
        }
    }

    /// Index a stored article, creating the publication row on first use.
    /// Returns the article id when a new record was created, `None` when
    /// the URL was already cataloged.
    async fn catalog_article(
        &self,
        catalog: &Catalog,
        source: &PublicationSource,
        site_url: Option<&str>,
        article: &ConvertedArticle,
        stored: &StoredArticle,
    ) -> Result<Option<i64>, CatalogError> {
        let publication = match catalog.publication_by_slug(&source.slug).await? {
            Some(publication) => publication,
            None => {
                catalog
                    .create_publication(&NewPublication {
                        slug: source.slug.clone(),
                        name: source.name.clone(),
                        feed_url: source.feed_url.clone(),
                        url: site_url.map(str::to_string),
                        author: source.author.clone(),
                    })
                    .await?
            }
        };

        if catalog.article_by_url(&article.meta.url).await?.is_some() {
            return Ok(None);
        }

        let record = catalog
            .create_article(&NewArticle {
                publication_id: publication.id,
                slug: article.slug.clone(),
                title: article.meta.title.clone(),
                url: article.meta.url.clone(),
                published: article.meta.published.map(|d| d.timestamp()),
                author: article.meta.author.clone(),
                word_count: article.meta.word_count,
                read_time_minutes: article.meta.read_time_minutes,
                stored_path: stored.path.display().to_string(),
            })
            .await?;

        Ok(Some(record.id))
    }

    fn log_outcome(&self, slug: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Skipped { title, reason } => {
                if self.options.verbose {
                    tracing::info!(slug = %slug, title = %title, reason = %reason, "Skipped item");
                } else {
                    tracing::debug!(slug = %slug, title = %title, reason = %reason, "Skipped item");
                }
            }
            ItemOutcome::Errored(error) => {
                tracing::warn!(
                    slug = %slug,
                    title = %error.title,
                    phase = %error.phase,
                    error = %error.message,
                    "Item failed"
                );
            }
            ItemOutcome::Stored { title, path, .. } => {
                tracing::info!(slug = %slug, title = %title, path = %path.display(), "Stored article");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
