use serde::Serialize;

use super::metrics::{ActivityMetrics, ContentMetrics};

/// The four quality sub-scores, each in `0..=25`.
///
/// Every sub-score comes off a fixed threshold ladder; values between
/// rungs are never interpolated, so two publications on the same rung
/// score identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub activity: u8,
    pub length: u8,
    pub depth: u8,
    pub consistency: u8,
}

impl ScoreBreakdown {
    /// The overall quality score in `0..=100`.
    pub fn total(&self) -> u8 {
        self.activity + self.length + self.depth + self.consistency
    }
}

/// Scores a publication from its derived metrics.
pub fn score(activity: &ActivityMetrics, content: &ContentMetrics) -> ScoreBreakdown {
    ScoreBreakdown {
        activity: activity_score(activity.posts_last_30_days),
        length: length_score(content.avg_read_time_minutes),
        depth: depth_score(
            content.data_rich_count,
            content.avg_word_count,
            activity.total_posts,
        ),
        consistency: consistency_score(activity.avg_days_between_posts),
    }
}

/// More than twice-weekly posting earns full marks; total silence earns
/// none.
fn activity_score(posts_last_30_days: u32) -> u8 {
    match posts_last_30_days {
        n if n >= 8 => 25,
        n if n >= 4 => 20,
        n if n >= 2 => 15,
        n if n >= 1 => 10,
        _ => 0,
    }
}

fn length_score(avg_read_time_minutes: f64) -> u8 {
    if avg_read_time_minutes >= 15.0 {
        25
    } else if avg_read_time_minutes >= 10.0 {
        22
    } else if avg_read_time_minutes >= 7.0 {
        18
    } else if avg_read_time_minutes >= 5.0 {
        12
    } else if avg_read_time_minutes >= 3.0 {
        6
    } else {
        0
    }
}

/// Share of posts carrying data indicators, as a percentage of all posts.
/// Only evaluated when at least one data-rich post and some parseable
/// content exist; otherwise the publication has shown no depth to score.
///
/// The denominator is deliberately all posts, not just posts with
/// parseable content, matching the established scoring behavior even
/// though it can understate depth for feeds with many empty stubs.
fn depth_score(data_rich_count: u32, avg_word_count: f64, total_posts: u32) -> u8 {
    if data_rich_count == 0 || avg_word_count <= 0.0 {
        return 0;
    }

    let ratio = f64::from(data_rich_count) / f64::from(total_posts.max(1)) * 100.0;
    if ratio >= 50.0 {
        25
    } else if ratio >= 30.0 {
        20
    } else if ratio >= 15.0 {
        15
    } else if ratio > 0.0 {
        10
    } else {
        0
    }
}

/// Ascending ladder over the mean day-gap: tighter cadence scores higher.
/// A publication with fewer than two dated posts has no cadence at all and
/// scores zero, below even the sparsest measured cadence.
fn consistency_score(avg_days_between_posts: Option<f64>) -> u8 {
    let Some(days) = avg_days_between_posts else {
        return 0;
    };

    if days <= 3.0 {
        25
    } else if days <= 7.0 {
        20
    } else if days <= 14.0 {
        15
    } else if days <= 30.0 {
        10
    } else {
        5
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    // ========================================================================
    // Ladder boundaries
    // ========================================================================

    #[test]
    fn test_activity_ladder() {
        assert_eq!(activity_score(12), 25);
        assert_eq!(activity_score(8), 25);
        assert_eq!(activity_score(7), 20);
        assert_eq!(activity_score(4), 20);
        assert_eq!(activity_score(3), 15);
        assert_eq!(activity_score(2), 15);
        assert_eq!(activity_score(1), 10);
        assert_eq!(activity_score(0), 0);
    }

    #[test]
    fn test_length_ladder() {
        assert_eq!(length_score(20.0), 25);
        assert_eq!(length_score(15.0), 25);
        assert_eq!(length_score(14.9), 22);
        assert_eq!(length_score(10.0), 22);
        assert_eq!(length_score(7.0), 18);
        assert_eq!(length_score(5.0), 12);
        assert_eq!(length_score(3.0), 6);
        assert_eq!(length_score(2.9), 0);
        assert_eq!(length_score(0.0), 0);
    }

    #[test]
    fn test_depth_gates() {
        // No data-rich posts: gate closed regardless of word counts
        assert_eq!(depth_score(0, 500.0, 10), 0);
        // No parseable content: gate closed regardless of keyword hits
        assert_eq!(depth_score(3, 0.0, 10), 0);
    }

    #[test]
    fn test_depth_ladder() {
        // 5 of 10 posts = 50%
        assert_eq!(depth_score(5, 100.0, 10), 25);
        // 3 of 10 = 30%
        assert_eq!(depth_score(3, 100.0, 10), 20);
        // 15 of 100 = 15%
        assert_eq!(depth_score(15, 100.0, 100), 15);
        // 1 of 100 = 1%: above zero earns the floor rung
        assert_eq!(depth_score(1, 100.0, 100), 10);
    }

    #[test]
    fn test_depth_zero_total_posts_does_not_divide_by_zero() {
        // Degenerate input; the max(1) denominator turns 1/0 into 100%
        assert_eq!(depth_score(1, 100.0, 0), 25);
    }

    #[test]
    fn test_consistency_ladder() {
        assert_eq!(consistency_score(None), 0);
        assert_eq!(consistency_score(Some(1.0)), 25);
        assert_eq!(consistency_score(Some(3.0)), 25);
        assert_eq!(consistency_score(Some(3.1)), 20);
        assert_eq!(consistency_score(Some(7.0)), 20);
        assert_eq!(consistency_score(Some(14.0)), 15);
        assert_eq!(consistency_score(Some(30.0)), 10);
        assert_eq!(consistency_score(Some(31.0)), 5);
        assert_eq!(consistency_score(Some(365.0)), 5);
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let breakdown = ScoreBreakdown {
            activity: 25,
            length: 22,
            depth: 15,
            consistency: 20,
        };
        assert_eq!(breakdown.total(), 82);
    }

    proptest! {
        // Whatever the metrics, each sub-score stays within 0..=25 and the
        // total is their exact sum in 0..=100
        #[test]
        fn prop_scores_stay_bounded(
            posts_30 in 0u32..1000,
            avg_read in 0.0f64..10_000.0,
            data_rich in 0u32..1000,
            avg_words in 0.0f64..1_000_000.0,
            total in 0u32..1000,
            gap in proptest::option::of(0.0f64..10_000.0),
        ) {
            let activity = activity_score(posts_30);
            let length = length_score(avg_read);
            let depth = depth_score(data_rich, avg_words, total);
            let consistency = consistency_score(gap);

            prop_assert!(activity <= 25);
            prop_assert!(length <= 25);
            prop_assert!(depth <= 25);
            prop_assert!(consistency <= 25);

            let breakdown = ScoreBreakdown { activity, length, depth, consistency };
            let total_score = breakdown.total();
            prop_assert!(total_score <= 100);
            prop_assert_eq!(
                total_score,
                activity + length + depth + consistency
            );
        }
    }
}
