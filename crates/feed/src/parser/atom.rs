// ABOUTME: Atom parser tuned for video-style feeds that carry their media in a Media RSS group.
// ABOUTME: Item title, description and enclosure come from media:group rather than atom:content/summary.

use crate::enclosure::select_media_content;
use crate::error::FeedError;
use crate::models::{Feed, FeedItem};
use crate::parser::{clean_text, refresh_title, FeedFormat, FormatParser};
use crate::query::Namespaces;
use crate::time_parse::parse_feed_date;
use crate::xml::{Node, XmlDocument};

/// Parser for Atom documents.
///
/// Channel fields are read loosely from the first matching element anywhere
/// in the document. Entries without a `media:group` title or description are
/// not surfaced, so plain blog-style Atom feeds yield no items.
#[derive(Debug, Clone)]
pub struct AtomParser {
    url: String,
    document: XmlDocument,
    namespaces: Namespaces,
}

impl AtomParser {
    /// Parses `xml`, recovering from stray control characters when needed.
    pub fn new(url: &str, xml: &str) -> Result<Self, FeedError> {
        Ok(Self::from_document(url, XmlDocument::load(xml)?))
    }

    /// Wraps a document the caller already parsed.
    pub fn from_document(url: &str, document: XmlDocument) -> Self {
        Self {
            url: url.to_string(),
            document,
            namespaces: Namespaces::atom(),
        }
    }

    pub fn into_document(self) -> XmlDocument {
        self.document
    }
}

impl FormatParser for AtomParser {
    fn format(&self) -> FeedFormat {
        FeedFormat::Atom
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn document(&self) -> &XmlDocument {
        &self.document
    }

    fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    fn can_parse(&self) -> bool {
        let root = self.document.document_node();
        let ns = &self.namespaces;
        matches!(ns.select_single(root, "/atom:feed"), Ok(Some(_)))
            && matches!(ns.select_single(root, "//atom:title"), Ok(Some(_)))
    }

    fn read_feed(&self, feed: &mut Feed) -> Result<(), FeedError> {
        let ns = &self.namespaces;
        let doc = self.document.document_node();

        refresh_title(feed, ns.text(doc, "//atom:title")?);

        let published = parse_feed_date(&ns.text(doc, "//atom:published")?.unwrap_or_default());

        feed.description = clean_text(ns, doc, "//atom:title")?;
        feed.copyright = None;
        feed.last_build_date = published;
        feed.link = clean_text(ns, doc, "//atom:author/atom:uri")?;
        feed.pub_date = published;
        feed.keywords = feed.description.clone();

        Ok(())
    }

    fn item_path(&self) -> &'static str {
        "//atom:entry"
    }

    fn parse_item(&self, node: Node<'_>) -> Result<FeedItem, FeedError> {
        let ns = &self.namespaces;

        let mut item = FeedItem {
            title: clean_text(ns, node, "media:group/media:title")?.unwrap_or_default(),
            description: clean_text(ns, node, "media:group/media:description")?.unwrap_or_default(),
            ..Default::default()
        };
        if item.title.is_empty() && item.description.is_empty() {
            return Err(FeedError::invalid_item(
                "Atom entry has neither media:title nor media:description",
            ));
        }
        item.update_stripped_description();

        item.author = clean_text(ns, node, "atom:author/atom:name")?;
        item.link = match clean_text(ns, node, "atom:link")? {
            Some(text) => Some(text),
            None => clean_text(ns, node, "atom:link/@href")?,
        };
        item.pub_date = parse_feed_date(&ns.text(node, "atom:published")?.unwrap_or_default());
        item.modified = parse_feed_date(&ns.text(node, "atom:updated")?.unwrap_or_default());

        item.enclosure = match ns.select_single(node, "media:group")? {
            Some(group) => select_media_content(ns, group, node)?,
            None => None,
        };

        Ok(item)
    }
}
