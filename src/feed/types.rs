use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media classification of a feed item, derived from enclosure MIME types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Audio,
    Video,
}

impl MediaKind {
    /// Classifies a MIME type string. Anything that is not audio or video
    /// counts as text; a feed item with no enclosures is text by default.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("audio/") {
            MediaKind::Audio
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Text => "text",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// One syndicated post. Immutable once parsed out of a feed document.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// Stable identifier: the feed's own id when present, otherwise a hash
    /// of url/title/published.
    pub guid: String,
    pub title: String,
    /// Canonical link to the post.
    pub url: String,
    pub published: Option<DateTime<Utc>>,
    pub author: Option<String>,
    /// Raw body markup (full content when the feed carries it, otherwise
    /// the summary).
    pub content: String,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub media: MediaKind,
    /// Category terms as the feed declares them.
    pub tags: Vec<String>,
}

/// A publication's feed: metadata plus its items in document order (feeds
/// are not guaranteed to be chronological).
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub description: Option<String>,
    /// Canonical site link, when the feed declares one.
    pub link: Option<String>,
    pub feed_url: String,
    pub author: Option<String>,
    pub items: Vec<FeedItem>,
}

/// An ingestion target as configured by the user. Read-only to the
/// pipeline; `slug` names the publication's directory in the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationSource {
    pub name: String,
    pub slug: String,
    pub feed_url: String,
    /// Overrides per-item author attribution when set.
    #[serde(default)]
    pub author: Option<String>,
}
