use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::metrics::{activity_metrics, content_metrics, ActivityMetrics, ContentMetrics};
use super::score::{score, ScoreBreakdown};
use super::topics::{detect_topics, topic_haystack};
use crate::feed::{Feed, FeedClient, FetchError};
use crate::util::{validate_input, InputError, SourceInput};

/// Errors from a single publication analysis. Validation failures surface
/// before any network access; fetch failures are propagated as-is.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Validation(#[from] InputError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// One full scoring run for a publication. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct PublicationAnalysis {
    pub name: String,
    pub slug: String,
    pub feed_url: String,
    /// Canonical site link, when the feed declares one.
    pub url: Option<String>,
    pub author: Option<String>,
    /// Detected topics in registry order.
    pub topics: Vec<String>,
    /// Sum of the four breakdown sub-scores, `0..=100`.
    pub quality_score: u8,
    pub breakdown: ScoreBreakdown,
    pub activity: ActivityMetrics,
    pub content: ContentMetrics,
    pub analyzed_at: DateTime<Utc>,
}

/// Progress event sent before each publication in a batch is analyzed.
#[derive(Debug, Clone)]
pub struct AnalyzeProgress {
    pub index: usize,
    pub total: usize,
    pub slug: String,
}

/// Outcome of a batch analysis: successful analyses in input order, plus
/// the inputs that failed paired with their errors.
#[derive(Debug)]
pub struct BatchAnalysis {
    pub results: Vec<PublicationAnalysis>,
    pub errors: Vec<(String, AnalyzeError)>,
}

/// Scores publications from their feed history.
pub struct Analyzer {
    client: Arc<FeedClient>,
}

impl Analyzer {
    /// The client is shared with the rest of the run so every fetch goes
    /// through one rate-limit gate.
    pub fn new(client: Arc<FeedClient>) -> Self {
        Self { client }
    }

    /// Analyzes one publication identified by a slug or feed URL.
    ///
    /// # Errors
    ///
    /// [`AnalyzeError::Validation`] if the input fails the identifier
    /// rules; [`AnalyzeError::Fetch`] if the feed cannot be retrieved or
    /// parsed.
    pub async fn analyze(&self, input: &str) -> Result<PublicationAnalysis, AnalyzeError> {
        let validated = validate_input(input)?;
        let (slug, feed_url) = normalize(validated);

        tracing::info!(slug = %slug, feed_url = %feed_url, "Analyzing publication");
        let fetched = self.client.fetch(&feed_url).await?;

        Ok(analyze_feed(&fetched.feed, slug, feed_url, Utc::now()))
    }

    /// Analyzes a list of publications strictly in order, continuing past
    /// individual failures.
    ///
    /// When a progress channel is supplied, one [`AnalyzeProgress`] event
    /// is sent before each input is processed; send failures are ignored
    /// (a dropped receiver must not stop the batch).
    pub async fn analyze_many(
        &self,
        inputs: &[String],
        progress: Option<mpsc::Sender<AnalyzeProgress>>,
    ) -> BatchAnalysis {
        let total = inputs.len();
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            let slug = validate_input(input)
                .map(|v| normalize(v).0)
                .unwrap_or_else(|_| input.clone());
            if let Some(tx) = &progress {
                let _ = tx
                    .send(AnalyzeProgress {
                        index,
                        total,
                        slug,
                    })
                    .await;
            }

            match self.analyze(input).await {
                Ok(analysis) => results.push(analysis),
                Err(e) => {
                    tracing::warn!(input = %input, error = %e, "Analysis failed, continuing batch");
                    errors.push((input.clone(), e));
                }
            }
        }

        BatchAnalysis { results, errors }
    }
}

/// Scores an already-fetched feed. Pure: all inputs are explicit, so the
/// same feed and clock always produce the identical analysis.
pub fn analyze_feed(
    feed: &Feed,
    slug: String,
    feed_url: String,
    now: DateTime<Utc>,
) -> PublicationAnalysis {
    let activity = activity_metrics(feed, now);
    let content = content_metrics(feed);
    let breakdown = score(&activity, &content);
    let topics = detect_topics(&topic_haystack(feed));

    tracing::debug!(
        slug = %slug,
        quality_score = breakdown.total(),
        topics = topics.len(),
        "Publication scored"
    );

    PublicationAnalysis {
        name: feed.title.clone(),
        slug,
        feed_url,
        url: feed.link.clone(),
        author: feed.author.clone(),
        topics,
        quality_score: breakdown.total(),
        breakdown,
        activity,
        content,
        analyzed_at: now,
    }
}

/// Expands a validated identifier to `(slug, feed_url)`. Bare slugs are
/// assumed to name a substack; URLs keep themselves and derive their slug
/// from the first hostname label.
fn normalize(input: SourceInput<'_>) -> (String, String) {
    match input {
        SourceInput::Slug(slug) => (
            slug.to_string(),
            format!("https://{slug}.substack.com/feed"),
        ),
        SourceInput::FeedUrl(url) => (extract_slug(url), url.to_string()),
    }
}

fn subdomain_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://([A-Za-z0-9][A-Za-z0-9-]*)\.").unwrap())
}

/// The first hostname label of a feed URL, or the raw URL string when no
/// label can be extracted.
fn extract_slug(url: &str) -> String {
    subdomain_pattern()
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| url.to_string())
}
