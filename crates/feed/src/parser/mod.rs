// ABOUTME: Format-agnostic parsing contract, lazy item iterator and the RSS/Atom dispatcher.
// ABOUTME: FeedParser::select tries Atom then RSS; parse_feed wraps selection, feed creation and item collection.

pub mod atom;
pub mod rss;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::html_utils::remove_newlines;
use crate::models::{Feed, FeedItem, UNKNOWN_FEED_TITLE};
use crate::query::Namespaces;
use crate::xml::{Node, XmlDocument};

pub use atom::AtomParser;
pub use rss::RssParser;

/// Which schema a parser reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Atom,
}

/// The capability every concrete format parser provides.
///
/// A parser owns one immutable [`XmlDocument`] and maps its schema onto the
/// shared [`Feed`] and [`FeedItem`] models.
pub trait FormatParser {
    fn format(&self) -> FeedFormat;

    /// Source URL, used for log context only.
    fn url(&self) -> &str;

    fn document(&self) -> &XmlDocument;

    fn namespaces(&self) -> &Namespaces;

    /// Structural check that the document is in this parser's format.
    fn can_parse(&self) -> bool;

    /// Computes the refreshed channel-level fields for `feed`.
    /// Called on a copy; see [`update_feed`](Self::update_feed).
    fn read_feed(&self, feed: &mut Feed) -> Result<(), FeedError>;

    /// Path selecting every item node.
    fn item_path(&self) -> &'static str;

    /// Builds one item from its node.
    fn parse_item(&self, node: Node<'_>) -> Result<FeedItem, FeedError>;

    /// Refreshes `feed` in place from the document.
    ///
    /// Either every field is updated or, on error, `feed` is left exactly as
    /// it was and the error is logged and returned.
    fn update_feed(&self, feed: &mut Feed) -> Result<(), FeedError> {
        let mut updated = feed.clone();
        match self.read_feed(&mut updated) {
            Ok(()) => {
                *feed = updated;
                Ok(())
            }
            Err(err) => {
                warn!(url = %self.url(), format = ?self.format(), error = %err, "failed to read feed channel");
                Err(err)
            }
        }
    }

    /// Builds a new feed for this parser's source URL.
    fn create_feed(&self) -> Result<Feed, FeedError> {
        let mut feed = Feed::new(self.url());
        self.update_feed(&mut feed)?;
        Ok(feed)
    }

    /// Lazily parses every item in document order.
    ///
    /// Items that fail to parse are logged and skipped. Each call scans the
    /// document again; the returned iterator is single-pass.
    fn feed_items<'a>(&'a self, feed: &Feed) -> FeedItems<'a>
    where
        Self: Sized,
    {
        FeedItems::new(self, feed)
    }
}

/// Iterator returned by [`FormatParser::feed_items`].
pub struct FeedItems<'a> {
    parser: &'a dyn FormatParser,
    nodes: std::vec::IntoIter<Node<'a>>,
    feed_url: String,
}

impl<'a> FeedItems<'a> {
    fn new(parser: &'a dyn FormatParser, feed: &Feed) -> Self {
        let path = parser.item_path();
        let nodes = match parser.namespaces().select(parser.document().document_node(), path) {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(url = %parser.url(), path, error = %err, "unable to select feed items");
                Vec::new()
            }
        };

        Self {
            parser,
            nodes: nodes.into_iter(),
            feed_url: feed.url.clone(),
        }
    }
}

impl Iterator for FeedItems<'_> {
    type Item = FeedItem;

    fn next(&mut self) -> Option<FeedItem> {
        for node in self.nodes.by_ref() {
            match self.parser.parse_item(node) {
                Ok(mut item) => {
                    item.feed_url = Some(self.feed_url.clone());
                    return Some(item);
                }
                Err(err) => {
                    warn!(url = %self.parser.url(), format = ?self.parser.format(), error = %err, "skipping feed item");
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.nodes.len()))
    }
}

/// A parser for one of the supported formats.
#[derive(Debug, Clone)]
pub enum FeedParser {
    Atom(AtomParser),
    Rss(RssParser),
}

impl FeedParser {
    /// Finds the parser for `xml`, trying Atom before RSS.
    ///
    /// Returns `None` when the text is not XML even after recovery, or when
    /// no format recognizes it.
    pub fn select(url: &str, xml: &str) -> Option<Self> {
        match XmlDocument::load(xml) {
            Ok(document) => Self::select_document(url, document),
            Err(err) => {
                debug!(url, error = %err, "feed text is not a usable XML document");
                None
            }
        }
    }

    /// Same as [`select`](Self::select) for an already parsed document.
    pub fn select_document(url: &str, document: XmlDocument) -> Option<Self> {
        let atom = AtomParser::from_document(url, document);
        if atom.can_parse() {
            return Some(FeedParser::Atom(atom));
        }
        debug!(url, "document is not Atom");

        let rss = RssParser::from_document(url, atom.into_document());
        if rss.can_parse() {
            return Some(FeedParser::Rss(rss));
        }
        debug!(url, "document is not RSS");

        None
    }

    fn inner(&self) -> &dyn FormatParser {
        match self {
            FeedParser::Atom(p) => p,
            FeedParser::Rss(p) => p,
        }
    }

    pub fn format(&self) -> FeedFormat {
        self.inner().format()
    }

    pub fn url(&self) -> &str {
        self.inner().url()
    }

    pub fn can_parse(&self) -> bool {
        self.inner().can_parse()
    }

    pub fn create_feed(&self) -> Result<Feed, FeedError> {
        self.inner().create_feed()
    }

    pub fn update_feed(&self, feed: &mut Feed) -> Result<(), FeedError> {
        self.inner().update_feed(feed)
    }

    pub fn feed_items<'a>(&'a self, feed: &Feed) -> FeedItems<'a> {
        FeedItems::new(self.inner(), feed)
    }
}

/// A feed together with its items, as produced by [`parse_feed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub feed: Feed,
    pub items: Vec<FeedItem>,
}

/// Detects the format of `xml`, creates the feed and collects its items.
///
/// Unlike [`FeedParser::select`], unusable XML is reported as
/// [`FeedError::MalformedDocument`] rather than folded into "no parser".
pub fn parse_feed(url: &str, xml: &str) -> Result<ParsedFeed, FeedError> {
    let document = XmlDocument::load(xml)?;
    let parser = FeedParser::select_document(url, document).ok_or(FeedError::UnrecognizedFormat)?;
    let feed = parser.create_feed()?;
    let items = parser.feed_items(&feed).collect();

    Ok(ParsedFeed {
        format: parser.format(),
        feed,
        items,
    })
}

/// Applies the title rule shared by both formats: the document title is only
/// consulted while the current one is blank or the sentinel, and an absent
/// document title leaves the sentinel.
pub(crate) fn refresh_title(feed: &mut Feed, document_title: Option<String>) {
    if !feed.needs_title() {
        return;
    }
    feed.title = document_title
        .map(|t| remove_newlines(&t))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_FEED_TITLE.to_string());
}

/// Newline-stripped text at `path`, `None` when missing or empty.
pub(crate) fn clean_text(ns: &Namespaces, ctx: Node<'_>, path: &str) -> Result<Option<String>, FeedError> {
    Ok(ns
        .non_empty_text(ctx, path)?
        .map(|t| remove_newlines(&t))
        .filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_title_keeps_real_title() {
        let mut feed = Feed::new("u");
        feed.title = "Existing".to_string();
        refresh_title(&mut feed, Some("Other".to_string()));
        assert_eq!(feed.title, "Existing");
    }

    #[test]
    fn refresh_title_replaces_sentinel() {
        let mut feed = Feed::new("u");
        feed.title = UNKNOWN_FEED_TITLE.to_string();
        refresh_title(&mut feed, Some("Found\nIt".to_string()));
        assert_eq!(feed.title, "FoundIt");
    }

    #[test]
    fn refresh_title_falls_back_to_sentinel() {
        for source in [None, Some(String::new()), Some("\n".to_string())] {
            let mut feed = Feed::new("u");
            refresh_title(&mut feed, source);
            assert_eq!(feed.title, UNKNOWN_FEED_TITLE);
        }
    }

    /// Writes some fields, then fails partway through the channel.
    struct HalfReadParser {
        document: XmlDocument,
        namespaces: Namespaces,
    }

    impl FormatParser for HalfReadParser {
        fn format(&self) -> FeedFormat {
            FeedFormat::Rss
        }

        fn url(&self) -> &str {
            "u"
        }

        fn document(&self) -> &XmlDocument {
            &self.document
        }

        fn namespaces(&self) -> &Namespaces {
            &self.namespaces
        }

        fn can_parse(&self) -> bool {
            true
        }

        fn read_feed(&self, feed: &mut Feed) -> Result<(), FeedError> {
            feed.title = "Half".to_string();
            feed.language = Some("xx".to_string());
            let root = self.document.document_node();
            feed.description = clean_text(&self.namespaces, root, "/rss/channel/bogus:description")?;
            Ok(())
        }

        fn item_path(&self) -> &'static str {
            "//item"
        }

        fn parse_item(&self, _node: Node<'_>) -> Result<FeedItem, FeedError> {
            Err(FeedError::invalid_item("unused"))
        }
    }

    #[test]
    fn failed_update_leaves_feed_untouched() {
        let parser = HalfReadParser {
            document: XmlDocument::parse("<rss><channel><title>T</title></channel></rss>").unwrap(),
            namespaces: Namespaces::rss(),
        };
        let mut feed = Feed::new("u");
        feed.title = UNKNOWN_FEED_TITLE.to_string();
        feed.copyright = Some("kept".to_string());
        let before = feed.clone();

        let err = parser.update_feed(&mut feed).unwrap_err();
        assert!(matches!(err, FeedError::InvalidQuery { .. }));
        assert_eq!(feed, before);
        assert!(parser.create_feed().is_err());
    }

    #[test]
    fn select_rejects_non_xml() {
        assert!(FeedParser::select("u", "this is not xml").is_none());
        assert!(FeedParser::select("u", "").is_none());
    }

    #[test]
    fn select_rejects_unknown_xml() {
        assert!(FeedParser::select("u", "<opml><head><title>x</title></head></opml>").is_none());
    }

    #[test]
    fn parse_feed_reports_malformed_document() {
        let err = parse_feed("u", "<rss><channel>").unwrap_err();
        assert!(matches!(err, FeedError::MalformedDocument(_)));
    }

    #[test]
    fn parse_feed_reports_unrecognized_format() {
        let err = parse_feed("u", "<html><title>x</title></html>").unwrap_err();
        assert_eq!(err, FeedError::UnrecognizedFormat);
    }
}
