// ABOUTME: Core feed parsing library for feedcast.
// ABOUTME: RSS/Atom detection, namespace-aware XML lookup, enclosure selection and date/duration normalization.

pub mod duration_parse;
pub mod enclosure;
pub mod error;
pub mod html_utils;
pub mod models;
pub mod parser;
pub mod query;
pub mod time_parse;
pub mod xml;

pub use duration_parse::{parse_itunes_duration, parse_seconds};
pub use enclosure::{parse_enclosure, select_media_content};
pub use error::FeedError;
pub use html_utils::{decode_entities, remove_newlines, strip_html};
pub use models::{Feed, FeedEnclosure, FeedItem, UNKNOWN_FEED_TITLE, UNSET_TIMESTAMP};
pub use parser::{
    parse_feed, AtomParser, FeedFormat, FeedItems, FeedParser, FormatParser, ParsedFeed, RssParser,
};
pub use query::Namespaces;
pub use time_parse::{parse_fallback, parse_feed_date, parse_rfc822};
pub use xml::{strip_control_chars, Node, XmlDocument};
