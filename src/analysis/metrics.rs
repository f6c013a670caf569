use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::Feed;
use crate::util::{read_time_minutes, strip_markup, word_count};

/// Read time at or above which an item counts as long-form.
const LONG_FORM_MINUTES: u32 = 10;

/// Indicator strings marking quantitative/analytical writing. Matched
/// case-insensitively as substrings of the stripped body text.
const DATA_KEYWORDS: [&str; 12] = [
    "chart",
    "graph",
    "data",
    "statistic",
    "percent",
    "%",
    "analysis",
    "research",
    "study",
    "survey",
    "table",
    "figure",
];

/// Posting-cadence metrics derived from item timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityMetrics {
    pub total_posts: u32,
    pub posts_last_30_days: u32,
    pub posts_last_7_days: u32,
    pub most_recent_post: Option<DateTime<Utc>>,
    /// Mean gap in days between consecutive dated posts. `None` when fewer
    /// than two posts carry timestamps, since no gap exists to measure.
    pub avg_days_between_posts: Option<f64>,
}

/// Word-count and read-time metrics derived from item bodies.
///
/// All fields are exactly zero for a feed with no items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentMetrics {
    pub avg_word_count: f64,
    pub min_word_count: u32,
    pub max_word_count: u32,
    pub avg_read_time_minutes: f64,
    /// Items with an estimated read time of at least 10 minutes.
    pub long_form_count: u32,
    pub long_form_percent: f64,
    /// Items whose body text contains at least one data indicator keyword.
    pub data_rich_count: u32,
}

impl ContentMetrics {
    fn zero() -> Self {
        Self {
            avg_word_count: 0.0,
            min_word_count: 0,
            max_word_count: 0,
            avg_read_time_minutes: 0.0,
            long_form_count: 0,
            long_form_percent: 0.0,
            data_rich_count: 0,
        }
    }
}

/// Computes activity metrics for a feed as of `now`.
///
/// Undated items count toward the total but are excluded from window
/// counts and gap averaging; a feed is not penalized for one item with a
/// broken date, nor credited activity it cannot prove.
pub fn activity_metrics(feed: &Feed, now: DateTime<Utc>) -> ActivityMetrics {
    let mut timestamps: Vec<DateTime<Utc>> =
        feed.items.iter().filter_map(|item| item.published).collect();
    timestamps.sort_unstable_by(|a, b| b.cmp(a));

    let cutoff_30 = now - chrono::Duration::days(30);
    let cutoff_7 = now - chrono::Duration::days(7);
    let posts_last_30_days = timestamps.iter().filter(|t| **t >= cutoff_30).count() as u32;
    let posts_last_7_days = timestamps.iter().filter(|t| **t >= cutoff_7).count() as u32;

    let avg_days_between_posts = if timestamps.len() < 2 {
        None
    } else {
        let total_days: f64 = timestamps
            .windows(2)
            .map(|pair| (pair[0] - pair[1]).num_seconds() as f64 / 86_400.0)
            .sum();
        Some(total_days / (timestamps.len() - 1) as f64)
    };

    ActivityMetrics {
        total_posts: feed.items.len() as u32,
        posts_last_30_days,
        posts_last_7_days,
        most_recent_post: timestamps.first().copied(),
        avg_days_between_posts,
    }
}

/// Computes content metrics over a feed's item bodies.
pub fn content_metrics(feed: &Feed) -> ContentMetrics {
    if feed.items.is_empty() {
        return ContentMetrics::zero();
    }

    let total = feed.items.len() as u32;
    let mut word_sum: u64 = 0;
    let mut read_time_sum: u64 = 0;
    let mut min_words = u32::MAX;
    let mut max_words = 0;
    let mut long_form_count = 0;
    let mut data_rich_count = 0;

    for item in &feed.items {
        let text = strip_markup(&item.content);
        let words = word_count(&text);
        let read_time = read_time_minutes(words);

        word_sum += u64::from(words);
        read_time_sum += u64::from(read_time);
        min_words = min_words.min(words);
        max_words = max_words.max(words);
        if read_time >= LONG_FORM_MINUTES {
            long_form_count += 1;
        }
        if is_data_rich(&text) {
            data_rich_count += 1;
        }
    }

    ContentMetrics {
        avg_word_count: word_sum as f64 / f64::from(total),
        min_word_count: min_words,
        max_word_count: max_words,
        avg_read_time_minutes: read_time_sum as f64 / f64::from(total),
        long_form_count,
        long_form_percent: f64::from(long_form_count) / f64::from(total) * 100.0,
        data_rich_count,
    }
}

/// True when the (already stripped) body text contains any data indicator
/// keyword, case-insensitively.
pub fn is_data_rich(text: &str) -> bool {
    let lower = text.to_lowercase();
    DATA_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}
