use crate::feed::Feed;
use crate::util::strip_markup;

/// Item titles sampled into the topic haystack.
const TITLE_SAMPLE: usize = 10;
/// Item bodies sampled into the topic haystack.
const BODY_SAMPLE: usize = 5;
/// Characters taken from the front of each sampled body.
const BODY_PREFIX_CHARS: usize = 1000;
/// Distinct keyword hits required before a topic is attributed.
const MIN_KEYWORD_HITS: usize = 2;

/// One entry in the topic registry: a display name plus the keyword stems
/// that vote for it.
pub struct Topic {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// The fixed topic registry. Output order of detection always follows
/// this order, regardless of which topic matched more keywords.
///
/// Keywords are lower-case stems matched by substring, so "econom" covers
/// economy, economic, and economics. Stems are chosen long enough not to
/// hide inside unrelated words.
pub const TOPIC_REGISTRY: &[Topic] = &[
    Topic {
        name: "economics",
        keywords: &["econom", "inflation", "gdp", "monetary", "fiscal", "recession"],
    },
    Topic {
        name: "finance",
        keywords: &["financ", "invest", "market", "stock", "valuation", "portfolio", "dividend"],
    },
    Topic {
        name: "technology",
        keywords: &["technolog", "software", "startup", "engineering", "hardware", "silicon valley"],
    },
    Topic {
        name: "ai",
        keywords: &["artificial intelligence", "machine learning", "neural", "llm", "deep learning", "transformer"],
    },
    Topic {
        name: "science",
        keywords: &["scien", "physics", "biology", "chemistry", "experiment", "laboratory"],
    },
    Topic {
        name: "history",
        keywords: &["histor", "century", "ancient", "empire", "medieval", "revolution"],
    },
    Topic {
        name: "politics",
        keywords: &["politic", "election", "policy", "congress", "senate", "democracy"],
    },
    Topic {
        name: "health",
        keywords: &["health", "medic", "disease", "clinical", "patient", "nutrition"],
    },
    Topic {
        name: "climate",
        keywords: &["climate", "carbon", "emission", "warming", "renewable", "sustainab"],
    },
    Topic {
        name: "philosophy",
        keywords: &["philosoph", "ethic", "moral", "epistem", "metaphys", "rationalis"],
    },
];

/// Assembles the text a publication is topic-classified on: feed title and
/// description, the first 10 item titles, and the first 1000 characters of
/// each of the first 5 item bodies (stripped of markup), all lower-cased.
pub fn topic_haystack(feed: &Feed) -> String {
    let mut haystack = String::new();
    haystack.push_str(&feed.title);
    haystack.push(' ');
    if let Some(description) = &feed.description {
        haystack.push_str(description);
        haystack.push(' ');
    }

    for item in feed.items.iter().take(TITLE_SAMPLE) {
        haystack.push_str(&item.title);
        haystack.push(' ');
    }

    for item in feed.items.iter().take(BODY_SAMPLE) {
        let text = strip_markup(&item.content);
        let prefix: String = text.chars().take(BODY_PREFIX_CHARS).collect();
        haystack.push_str(&prefix);
        haystack.push(' ');
    }

    haystack.to_lowercase()
}

/// Detects topics in an already lower-cased haystack.
///
/// A topic is attributed when at least two of its keywords appear as
/// substrings. Results follow registry order.
pub fn detect_topics(haystack: &str) -> Vec<String> {
    TOPIC_REGISTRY
        .iter()
        .filter(|topic| {
            let hits = topic
                .keywords
                .iter()
                .filter(|keyword| haystack.contains(*keyword))
                .count();
            hits >= MIN_KEYWORD_HITS
        })
        .map(|topic| topic.name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedItem, MediaKind};

    fn item(title: &str, content: &str) -> FeedItem {
        FeedItem {
            guid: title.to_string(),
            title: title.to_string(),
            url: format!("https://example.com/p/{title}"),
            published: None,
            author: None,
            content: content.to_string(),
            summary: None,
            image: None,
            media: MediaKind::Text,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        let topics = detect_topics("we discuss inflation every week");
        assert!(topics.is_empty());
    }

    #[test]
    fn test_two_keywords_attribute_topic() {
        let topics = detect_topics("inflation is eating gdp growth");
        assert_eq!(topics, vec!["economics"]);
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        // "inflation" three times is still one distinct keyword
        let topics = detect_topics("inflation inflation inflation");
        assert!(topics.is_empty());
    }

    #[test]
    fn test_output_follows_registry_order() {
        // Philosophy keywords appear first in the text, economics second;
        // output order is the registry's, not the text's
        let haystack = "an ethics of moral action under inflation and recession";
        let topics = detect_topics(haystack);
        assert_eq!(topics, vec!["economics", "philosophy"]);
    }

    #[test]
    fn test_stem_matching() {
        let topics = detect_topics("economic commentary on economists and fiscal policy");
        // "econom" hits twice-as-substring but counts once; "fiscal" is the second vote
        assert_eq!(topics, vec!["economics"]);
    }

    #[test]
    fn test_haystack_includes_title_description_and_items() {
        let feed = Feed {
            title: "The Climate Letter".to_string(),
            description: Some("Carbon notes".to_string()),
            link: None,
            feed_url: "https://example.com/feed".to_string(),
            author: None,
            items: vec![item("Emissions this week", "<p>On renewable buildout.</p>")],
        };

        let haystack = topic_haystack(&feed);
        assert!(haystack.contains("the climate letter"));
        assert!(haystack.contains("carbon notes"));
        assert!(haystack.contains("emissions this week"));
        assert!(haystack.contains("on renewable buildout."));

        let topics = detect_topics(&haystack);
        assert_eq!(topics, vec!["climate"]);
    }

    #[test]
    fn test_haystack_samples_are_bounded() {
        let mut items = Vec::new();
        for i in 0..20 {
            items.push(item(&format!("title-{i}"), &format!("body-{i}")));
        }
        let feed = Feed {
            title: "T".to_string(),
            description: None,
            link: None,
            feed_url: "https://example.com/feed".to_string(),
            author: None,
            items,
        };

        let haystack = topic_haystack(&feed);
        // Titles past the tenth and bodies past the fifth are not sampled
        assert!(haystack.contains("title-9"));
        assert!(!haystack.contains("title-10"));
        assert!(haystack.contains("body-4"));
        assert!(!haystack.contains("body-5"));
    }

    #[test]
    fn test_body_prefix_is_capped() {
        let long_body = format!("{} philosophy epistemology", "x".repeat(2000));
        let feed = Feed {
            title: "T".to_string(),
            description: None,
            link: None,
            feed_url: "https://example.com/feed".to_string(),
            author: None,
            items: vec![item("a", &long_body)],
        };

        // The philosophy keywords sit past the 1000-char cutoff
        let topics = detect_topics(&topic_haystack(&feed));
        assert!(topics.is_empty());
    }
}
