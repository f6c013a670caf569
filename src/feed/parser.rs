use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::model::MediaObject;
use feed_rs::parser;
use sha2::{Digest, Sha256};

use crate::feed::types::{Feed, FeedItem, MediaKind};
use crate::util::strip_markup;

/// Outcome of parsing one feed document.
pub struct ParseResult {
    pub feed: Feed,
    /// Items dropped because they carried no link at all.
    pub skipped: usize,
}

/// Parses RSS/Atom bytes into the normalized [`Feed`] shape.
///
/// Titles and the feed description are entity-decoded and stripped of
/// markup here, since they feed directly into slugs and stored metadata.
/// Item bodies are kept as raw markup for the converter. Items without a
/// link cannot be stored or deduplicated, so they are dropped and counted
/// in [`ParseResult::skipped`].
pub fn parse_feed(bytes: &[u8], feed_url: &str) -> Result<ParseResult> {
    let parsed = parser::parse(bytes)?;

    let title = parsed
        .title
        .map(|t| strip_markup(&t.content).into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    let description = parsed
        .description
        .map(|t| strip_markup(&t.content).into_owned());
    let link = parsed.links.first().map(|l| l.href.clone());
    let author = parsed.authors.first().map(|p| p.name.clone());

    let mut items = Vec::with_capacity(parsed.entries.len());
    let mut skipped = 0;

    for entry in parsed.entries {
        let Some(url) = entry.links.first().map(|l| l.href.clone()) else {
            skipped += 1;
            continue;
        };

        let media = classify_media(&entry.media);
        let image = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .next()
            .map(|t| t.image.uri.clone());
        let published = entry.published.or(entry.updated);
        let author = entry.authors.first().map(|p| p.name.clone());
        let tags: Vec<String> = entry.categories.into_iter().map(|c| c.term).collect();

        let title = entry
            .title
            .map(|t| strip_markup(&t.content).into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        let summary = entry.summary.map(|t| t.content);
        let content = entry
            .content
            .and_then(|c| c.body)
            .or_else(|| summary.clone())
            .unwrap_or_default();

        let existing_id = if entry.id.is_empty() {
            None
        } else {
            Some(entry.id.as_str())
        };
        let guid = generate_guid(existing_id, &url, &title, published);

        items.push(FeedItem {
            guid,
            title,
            url,
            published,
            author,
            content,
            summary,
            image,
            media,
            tags,
        });
    }

    Ok(ParseResult {
        feed: Feed {
            title,
            description,
            link,
            feed_url: feed_url.to_string(),
            author,
            items,
        },
        skipped,
    })
}

/// Audio beats video beats text: a post that ships any audio enclosure is
/// a podcast episode no matter what else rides along.
fn classify_media(media: &[MediaObject]) -> MediaKind {
    let mut kind = MediaKind::Text;
    for object in media {
        for content in &object.content {
            let Some(mime) = content.content_type.as_ref() else {
                continue;
            };
            match MediaKind::from_mime(&mime.to_string()) {
                MediaKind::Audio => return MediaKind::Audio,
                MediaKind::Video => kind = MediaKind::Video,
                MediaKind::Text => {}
            }
        }
    }
    kind
}

fn generate_guid(
    existing: Option<&str>,
    url: &str,
    title: &str,
    published: Option<DateTime<Utc>>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        url,
        title,
        published.map(|p| p.timestamp().to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
