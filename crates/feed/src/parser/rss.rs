// ABOUTME: RSS 2.0 parser with iTunes, Creative Commons, Media RSS and DC Terms extensions.
// ABOUTME: Maps /rss/channel and //item nodes onto Feed and FeedItem.

use crate::enclosure::{parse_enclosure, select_media_content};
use crate::error::FeedError;
use crate::models::{Feed, FeedItem};
use crate::parser::{clean_text, refresh_title, FeedFormat, FormatParser};
use crate::query::Namespaces;
use crate::time_parse::parse_feed_date;
use crate::xml::{Node, XmlDocument};

/// Parser for RSS 2.0 documents.
#[derive(Debug, Clone)]
pub struct RssParser {
    url: String,
    document: XmlDocument,
    namespaces: Namespaces,
}

impl RssParser {
    /// Parses `xml`, recovering from stray control characters when needed.
    pub fn new(url: &str, xml: &str) -> Result<Self, FeedError> {
        Ok(Self::from_document(url, XmlDocument::load(xml)?))
    }

    /// Wraps a document the caller already parsed.
    pub fn from_document(url: &str, document: XmlDocument) -> Self {
        Self {
            url: url.to_string(),
            document,
            namespaces: Namespaces::rss(),
        }
    }

    pub fn into_document(self) -> XmlDocument {
        self.document
    }

    fn channel_date(&self, path: &str) -> Result<chrono::DateTime<chrono::Utc>, FeedError> {
        let text = self.namespaces.text(self.document.document_node(), path)?;
        Ok(parse_feed_date(text.as_deref().unwrap_or_default()))
    }
}

impl FormatParser for RssParser {
    fn format(&self) -> FeedFormat {
        FeedFormat::Rss
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
        matches!(ns.select_single(root, "/rss"), Ok(Some(_)))
            && matches!(ns.select_single(root, "/rss/channel/title"), Ok(Some(_)))
    }

    fn read_feed(&self, feed: &mut Feed) -> Result<(), FeedError> {
        let ns = &self.namespaces;
        let doc = self.document.document_node();

        refresh_title(feed, ns.text(doc, "/rss/channel/title")?);

        feed.description = clean_text(ns, doc, "/rss/channel/description")?;
        feed.copyright = clean_text(ns, doc, "/rss/channel/copyright")?;
        feed.image_url = match clean_text(ns, doc, "/rss/channel/itunes:image/@href")? {
            Some(href) => Some(href),
            None => clean_text(ns, doc, "/rss/channel/image/url")?,
        };
        feed.language = clean_text(ns, doc, "/rss/channel/language")?;
        feed.last_build_date = self.channel_date("/rss/channel/lastBuildDate")?;
        feed.link = clean_text(ns, doc, "/rss/channel/link")?;
        feed.pub_date = self.channel_date("/rss/channel/pubDate")?;
        feed.keywords = clean_text(ns, doc, "/rss/channel/itunes:keywords")?;
        feed.category = clean_text(ns, doc, "/rss/channel/itunes:category/@text")?;

        Ok(())
    }

    fn item_path(&self) -> &'static str {
        "//item"
    }

    fn parse_item(&self, node: Node<'_>) -> Result<FeedItem, FeedError> {
        let ns = &self.namespaces;

        let mut item = FeedItem {
            title: clean_text(ns, node, "title")?.unwrap_or_default(),
            description: clean_text(ns, node, "description")?.unwrap_or_default(),
            ..Default::default()
        };
        if item.title.is_empty() && item.description.is_empty() {
            return Err(FeedError::invalid_item("RSS item has neither title nor description"));
        }
        item.update_stripped_description();

        item.author = clean_text(ns, node, "author")?;
        item.comments = clean_text(ns, node, "comments")?;
        item.link = clean_text(ns, node, "link")?;
        item.pub_date = parse_feed_date(&ns.text(node, "pubDate")?.unwrap_or_default());
        item.modified = parse_feed_date(&ns.text(node, "dcterms:modified")?.unwrap_or_default());
        item.license_uri = clean_text(ns, node, "creativeCommons:license")?;

        item.enclosure = match parse_enclosure(ns, node)? {
            Some(enclosure) => Some(enclosure),
            None => match select_media_content(ns, node, node)? {
                Some(enclosure) => Some(enclosure),
                None => match ns.select_single(node, "media:group")? {
                    Some(group) => select_media_content(ns, group, node)?,
                    None => None,
                },
            },
        };

        Ok(item)
    }
}
