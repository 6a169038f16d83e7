// ABOUTME: Namespace-aware node lookup over XmlDocument using a small XPath subset.
// ABOUTME: Supports /abs, //anywhere and relative child paths with an optional trailing @attribute.

use crate::error::FeedError;
use crate::xml::{Node, NodeId};

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
pub const YOUTUBE_NS: &str = "http://www.youtube.com/xml/schemas/2015";
pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const CREATIVE_COMMONS_NS: &str = "http://backend.userland.com/creativeCommonsRssModule";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";

/// Prefix bindings used to resolve qualified names in lookup paths.
///
/// Prefixes here are independent of the ones a document declares: a path
/// step `itunes:image` matches any element in the iTunes namespace, whatever
/// prefix the publisher chose. Unprefixed steps match elements in no namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    bindings: Vec<(&'static str, &'static str)>,
}

impl Namespaces {
    pub fn new(bindings: &[(&'static str, &'static str)]) -> Self {
        Self {
            bindings: bindings.to_vec(),
        }
    }

    /// Bindings used by the RSS parser.
    pub fn rss() -> Self {
        Self::new(&[
            ("itunes", ITUNES_NS),
            ("creativeCommons", CREATIVE_COMMONS_NS),
            ("media", MEDIA_NS),
            ("dcterms", DCTERMS_NS),
        ])
    }

    /// Bindings used by the Atom parser.
    pub fn atom() -> Self {
        Self::new(&[("media", MEDIA_NS), ("yt", YOUTUBE_NS), ("atom", ATOM_NS)])
    }

    pub fn resolve(&self, prefix: &str) -> Option<&'static str> {
        self.bindings
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| *uri)
    }

    /// Every element matching `path` from `ctx`, in document order.
    pub fn select<'a>(&self, ctx: Node<'a>, path: &str) -> Result<Vec<Node<'a>>, FeedError> {
        let query = Query::compile(path, self)?;
        if query.attribute.is_some() {
            return Err(FeedError::query(path, "attribute paths select no elements"));
        }
        Ok(query.elements(ctx))
    }

    /// The first element matching `path`, if any.
    pub fn select_single<'a>(&self, ctx: Node<'a>, path: &str) -> Result<Option<Node<'a>>, FeedError> {
        Ok(self.select(ctx, path)?.into_iter().next())
    }

    /// True when `path` matches anything from `ctx`.
    pub fn exists(&self, ctx: Node<'_>, path: &str) -> Result<bool, FeedError> {
        Ok(self.text(ctx, path)?.is_some())
    }

    /// Trimmed text of the first node matching `path`: the attribute value
    /// for `.../@name` paths, the element's inner text otherwise.
    /// `None` when nothing matches; `Some("")` for a present but empty node.
    pub fn text(&self, ctx: Node<'_>, path: &str) -> Result<Option<String>, FeedError> {
        let query = Query::compile(path, self)?;
        Ok(query.first_text(ctx).map(|s| s.trim().to_string()))
    }

    /// Like [`text`](Self::text) but treats empty values as missing.
    pub fn non_empty_text(&self, ctx: Node<'_>, path: &str) -> Result<Option<String>, FeedError> {
        Ok(self.text(ctx, path)?.filter(|s| !s.is_empty()))
    }

    /// Integer value at `path`; missing or unparsable values read as 0.
    pub fn int(&self, ctx: Node<'_>, path: &str) -> Result<i64, FeedError> {
        Ok(self
            .text(ctx, path)?
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Relative,
    Root,
    Anywhere,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Name<'p> {
    namespace: Option<&'static str>,
    local: &'p str,
}

#[derive(Debug)]
struct Query<'p> {
    anchor: Anchor,
    steps: Vec<Name<'p>>,
    attribute: Option<Name<'p>>,
}

impl<'p> Query<'p> {
    fn compile(path: &'p str, namespaces: &Namespaces) -> Result<Self, FeedError> {
        let (anchor, rest) = if let Some(rest) = path.strip_prefix("//") {
            (Anchor::Anywhere, rest)
        } else if let Some(rest) = path.strip_prefix('/') {
            (Anchor::Root, rest)
        } else {
            (Anchor::Relative, path)
        };

        let mut parts: Vec<&str> = rest.split('/').collect();
        let attribute = match parts.last().copied().and_then(|last| last.strip_prefix('@')) {
            // A lone "@name" applies to the context node itself.
            Some(attr) => {
                parts.pop();
                Some(resolve_name(path, attr, namespaces)?)
            }
            None => None,
        };

        let steps = parts
            .into_iter()
            .map(|step| resolve_name(path, step, namespaces))
            .collect::<Result<Vec<_>, _>>()?;

        if steps.is_empty() && anchor != Anchor::Relative {
            return Err(FeedError::query(path, "absolute path without steps"));
        }

        Ok(Self {
            anchor,
            steps,
            attribute,
        })
    }

    fn elements<'a>(&self, ctx: Node<'a>) -> Vec<Node<'a>> {
        let doc = ctx.document();
        let mut steps = self.steps.iter();

        let mut current: Vec<NodeId> = match self.anchor {
            Anchor::Relative => vec![ctx.id()],
            Anchor::Root => vec![doc.document_node().id()],
            Anchor::Anywhere => match steps.next() {
                Some(first) => doc
                    .document_node()
                    .descendant_elements()
                    .filter(|n| first.matches(n))
                    .map(|n| n.id())
                    .collect(),
                None => Vec::new(),
            },
        };

        for step in steps {
            let mut next: Vec<NodeId> = current
                .iter()
                .flat_map(|&id| doc.node(id).child_elements())
                .filter(|n| step.matches(n))
                .map(|n| n.id())
                .collect();
            // Nested context nodes can interleave their children.
            next.sort_unstable();
            next.dedup();
            current = next;
        }

        current.into_iter().map(|id| doc.node(id)).collect()
    }

    fn first_text(&self, ctx: Node<'_>) -> Option<String> {
        let elements = self.elements(ctx);
        match &self.attribute {
            Some(attr) => elements
                .iter()
                .find_map(|n| n.attribute(attr.namespace, attr.local))
                .map(str::to_string),
            None => elements.first().map(|n| n.inner_text()),
        }
    }
}

impl Name<'_> {
    fn matches(&self, node: &Node<'_>) -> bool {
        node.has_name(self.namespace, self.local)
    }
}

fn resolve_name<'p>(path: &str, qname: &'p str, namespaces: &Namespaces) -> Result<Name<'p>, FeedError> {
    let (prefix, local) = match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    };

    if local.is_empty() || local.contains('@') {
        return Err(FeedError::query(path, format!("invalid step `{qname}`")));
    }

    let namespace = match prefix {
        Some(prefix) => Some(
            namespaces
                .resolve(prefix)
                .ok_or_else(|| FeedError::query(path, format!("unbound prefix `{prefix}`")))?,
        ),
        None => None,
    };

    Ok(Name { namespace, local })
}
