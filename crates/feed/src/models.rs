// ABOUTME: Normalized feed, item and enclosure models shared by the RSS and Atom parsers.
// ABOUTME: Timestamps use DateTime<Utc> with UNSET_TIMESTAMP standing in for "no date found".

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::html_utils::strip_html;

/// Title given to a feed whose document does not provide one.
pub const UNKNOWN_FEED_TITLE: &str = "Unknown Podcast";

/// Timestamp used when a date is missing or cannot be parsed.
pub const UNSET_TIMESTAMP: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// A single downloadable media reference attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEnclosure {
    pub url: String,
    pub mime_type: Option<String>,
    /// Size in bytes; 0 when the source omits it or reports a negative value.
    pub file_size: u64,
    pub duration: Duration,
    pub keywords: Option<String>,
}

/// One entry or episode within a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub stripped_description: String,
    pub author: Option<String>,
    pub comments: Option<String>,
    pub link: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub license_uri: Option<String>,
    pub enclosure: Option<FeedEnclosure>,
    /// URL of the feed this item was enumerated for. Lookup only, the item does not own it.
    pub feed_url: Option<String>,
}

impl Default for FeedItem {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            stripped_description: String::new(),
            author: None,
            comments: None,
            link: None,
            pub_date: UNSET_TIMESTAMP,
            modified: UNSET_TIMESTAMP,
            license_uri: None,
            enclosure: None,
            feed_url: None,
        }
    }
}

impl FeedItem {
    /// Recomputes the plain-text variant of the description.
    pub fn update_stripped_description(&mut self) {
        self.stripped_description = strip_html(&self.description);
    }
}

/// A subscribed syndication source and its channel-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub copyright: Option<String>,
    pub image_url: Option<String>,
    pub language: Option<String>,
    pub link: Option<String>,
    pub keywords: Option<String>,
    pub category: Option<String>,
    pub last_build_date: DateTime<Utc>,
    pub pub_date: DateTime<Utc>,
}

impl Default for Feed {
    fn default() -> Self {
        Self::new("")
    }
}

impl Feed {
    /// Creates an empty feed for `url`. The title stays empty until a parser fills it in.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            description: None,
            copyright: None,
            image_url: None,
            language: None,
            link: None,
            keywords: None,
            category: None,
            last_build_date: UNSET_TIMESTAMP,
            pub_date: UNSET_TIMESTAMP,
        }
    }

    /// True when the title should be (re)read from the document on the next update.
    pub fn needs_title(&self) -> bool {
        self.title.trim().is_empty() || self.title == UNKNOWN_FEED_TITLE
    }
}
