//! Publication quality analysis.
//!
//! Scores a publication from its feed history alone. The pipeline is
//! deterministic: the same feed snapshot and clock always produce the
//! same [`PublicationAnalysis`].
//!
//! - **Metrics**: posting activity and content statistics
//! - **Topics**: keyword-based subject detection
//! - **Score**: the four-component 0-100 quality score
//! - **Engine**: input validation, fetching, and batch runs
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use glean::analysis::Analyzer;
//! use glean::feed::{FeedClient, FeedClientConfig};
//!
//! let client = Arc::new(FeedClient::new(FeedClientConfig::default())?);
//! let analyzer = Analyzer::new(client);
//! let analysis = analyzer.analyze("acx").await?;
//! println!("{}: {}/100", analysis.name, analysis.quality_score);
//! ```

mod engine;
mod metrics;
mod score;
mod topics;

pub use engine::{
    analyze_feed, AnalyzeError, AnalyzeProgress, Analyzer, BatchAnalysis, PublicationAnalysis,
};
pub use metrics::{activity_metrics, content_metrics, ActivityMetrics, ContentMetrics};
pub use score::{score, ScoreBreakdown};
pub use topics::{detect_topics, topic_haystack, Topic, TOPIC_REGISTRY};
