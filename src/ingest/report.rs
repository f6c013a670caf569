use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage an item error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetch,
    Parse,
    Convert,
    Store,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Fetch => "fetch",
            Phase::Parse => "parse",
            Phase::Convert => "convert",
            Phase::Store => "store",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal, phase-tagged failure for one item (or for the whole source
/// when the feed itself cannot be fetched or parsed).
#[derive(Debug, Clone)]
pub struct ItemError {
    pub phase: Phase,
    pub title: String,
    pub url: Option<String>,
    pub message: String,
}

/// What happened to one feed item. Skips are correct filter behavior, not
/// failures; every skip carries a human-readable reason.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Skipped {
        title: String,
        reason: String,
    },
    Errored(ItemError),
    Stored {
        title: String,
        path: PathBuf,
        word_count: u32,
        read_time_minutes: u32,
    },
}

/// Accounting for one source's run.
///
/// For item outcomes, `processed == skipped + stored` plus the item errors.
/// A source-level fetch or parse failure adds one error without counting
/// any items as processed.
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub slug: String,
    pub processed: usize,
    pub skipped: usize,
    pub stored: usize,
    pub errors: Vec<ItemError>,
    /// Catalog and enrichment problems: logged, reported, never fatal.
    pub non_fatal: Vec<String>,
    /// Per-item outcomes in feed order.
    pub outcomes: Vec<ItemOutcome>,
    pub duration: Duration,
}

impl IngestionReport {
    pub fn new(slug: String) -> Self {
        Self {
            slug,
            ..Self::default()
        }
    }

    /// Record one item outcome, keeping the counters consistent.
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        match &outcome {
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Stored { .. } => self.stored += 1,
            ItemOutcome::Errored(error) => self.errors.push(error.clone()),
        }
        self.outcomes.push(outcome);
    }

    /// Record a failure that prevented any item from being seen.
    pub fn fail_source(&mut self, error: ItemError) {
        self.errors.push(error);
    }

    /// Skips and zero stores never make a run unsuccessful.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Accounting for a whole run across sources.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<IngestionReport>,
    pub duration: Duration,
}

impl BatchReport {
    pub fn total_processed(&self) -> usize {
        self.reports.iter().map(|r| r.processed).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }

    pub fn total_stored(&self) -> usize {
        self.reports.iter().map(|r| r.stored).sum()
    }

    /// Every error across all sources, in source order.
    pub fn all_errors(&self) -> impl Iterator<Item = &ItemError> {
        self.reports.iter().flat_map(|r| r.errors.iter())
    }

    pub fn all_non_fatal(&self) -> impl Iterator<Item = &str> {
        self.reports
            .iter()
            .flat_map(|r| r.non_fatal.iter().map(String::as_str))
    }

    pub fn success(&self) -> bool {
        self.reports.iter().all(IngestionReport::success)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped(title: &str) -> ItemOutcome {
        ItemOutcome::Skipped {
            title: title.to_string(),
            reason: "already exists".to_string(),
        }
    }

    fn stored(title: &str) -> ItemOutcome {
        ItemOutcome::Stored {
            title: title.to_string(),
            path: PathBuf::from(format!("library/pub/{title}.md")),
            word_count: 500,
            read_time_minutes: 3,
        }
    }

    fn errored(title: &str, phase: Phase) -> ItemOutcome {
        ItemOutcome::Errored(ItemError {
            phase,
            title: title.to_string(),
            url: None,
            message: "boom".to_string(),
        })
    }

    #[test]
    fn test_counters_track_outcomes() {
        let mut report = IngestionReport::new("pub".to_string());
        report.record(skipped("a"));
        report.record(stored("b"));
        report.record(errored("c", Phase::Store));
        report.record(stored("d"));

        assert_eq!(report.processed, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.stored, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.processed, report.skipped + report.stored + report.errors.len());
        assert_eq!(report.outcomes.len(), 4);
    }

    #[test]
    fn test_skips_do_not_fail_a_run() {
        let mut report = IngestionReport::new("pub".to_string());
        report.record(skipped("a"));
        report.record(skipped("b"));
        assert!(report.success());
        assert_eq!(report.stored, 0);
    }

    #[test]
    fn test_any_error_fails_the_run() {
        let mut report = IngestionReport::new("pub".to_string());
        report.record(stored("a"));
        report.record(errored("b", Phase::Convert));
        assert!(!report.success());
    }

    #[test]
    fn test_source_failure_leaves_counters_at_zero() {
        let mut report = IngestionReport::new("pub".to_string());
        report.fail_source(ItemError {
            phase: Phase::Fetch,
            title: "pub".to_string(),
            url: Some("https://pub.substack.com/feed".to_string()),
            message: "HTTP 404".to_string(),
        });

        assert_eq!(report.processed, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.success());
    }

    #[test]
    fn test_batch_sums_and_concatenates() {
        let mut first = IngestionReport::new("a".to_string());
        first.record(stored("one"));
        first.record(skipped("two"));
        first.non_fatal.push("catalog: locked".to_string());

        let mut second = IngestionReport::new("b".to_string());
        second.record(errored("three", Phase::Store));

        let batch = BatchReport {
            reports: vec![first, second],
            duration: Duration::from_secs(1),
        };

        assert_eq!(batch.total_processed(), 3);
        assert_eq!(batch.total_stored(), 1);
        assert_eq!(batch.total_skipped(), 1);
        assert_eq!(batch.all_errors().count(), 1);
        assert_eq!(batch.all_non_fatal().count(), 1);
        assert!(!batch.success());
    }

    #[test]
    fn test_empty_batch_is_successful() {
        let batch = BatchReport::default();
        assert!(batch.success());
        assert_eq!(batch.total_processed(), 0);
    }
}
