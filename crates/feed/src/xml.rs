// ABOUTME: Owned, namespace-resolved XML element tree built from quick-xml events.
// ABOUTME: Strict well-formedness checks plus the control-character recovery path used by feed parsers.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use tracing::debug;

use crate::error::FeedError;

/// Index of a node inside an [`XmlDocument`]. Ids follow document order.
pub type NodeId = usize;

const DOCUMENT_NODE: NodeId = 0;

/// An attribute with its resolved namespace URI (unprefixed attributes have none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlElement {
    namespace: Option<String>,
    local_name: String,
    attributes: Vec<XmlAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Document,
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable parsed XML document.
///
/// Nodes live in a flat arena in document order; index 0 is the document node
/// whose only element child is the root element. Comments, processing
/// instructions and the DOCTYPE are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    nodes: Vec<NodeData>,
}

impl XmlDocument {
    /// Parses `text` strictly.
    ///
    /// Only the predefined entities and character references are expanded.
    /// DOCTYPE declarations are skipped without reading their entity
    /// definitions, so references to declared or external entities fail the
    /// parse instead of being resolved.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let mut reader = NsReader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut nodes = vec![NodeData {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
        }];
        let mut stack: Vec<NodeId> = Vec::new();
        let mut has_root = false;

        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(FeedError::malformed)?;
            let namespace = owned_namespace(resolved)?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    if stack.is_empty() {
                        if has_root {
                            return Err(FeedError::malformed("multiple root elements"));
                        }
                        has_root = true;
                    }

                    let element = XmlElement {
                        namespace,
                        local_name: utf8(e.local_name().into_inner())?.to_string(),
                        attributes: read_attributes(&reader, e)?,
                    };
                    let parent = stack.last().copied().unwrap_or(DOCUMENT_NODE);
                    let id = push_node(&mut nodes, parent, NodeKind::Element(element));

                    if matches!(event, Event::Start(_)) {
                        stack.push(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(FeedError::malformed)?;
                    append_text(&mut nodes, &stack, text)?;
                }
                Event::CData(e) => {
                    let text = utf8(&e)?;
                    append_text(&mut nodes, &stack, Cow::Borrowed(text))?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, DOCTYPE.
                _ => {}
            }
        }

        if let Some(&open) = stack.last() {
            let name = match &nodes[open].kind {
                NodeKind::Element(el) => el.local_name.clone(),
                _ => String::new(),
            };
            return Err(FeedError::malformed(format!("unclosed element <{name}>")));
        }
        if !has_root {
            return Err(FeedError::malformed("no root element"));
        }

        Ok(Self { nodes })
    }

    /// Builds a document the way feed parsers do: leading whitespace and any
    /// byte-order mark are trimmed, and when the strict parse fails the text
    /// is retried once with control characters (other than `\n`) removed.
    ///
    /// When nothing could be stripped, or the retry fails too, the original
    /// parse error is returned.
    pub fn load(text: &str) -> Result<Self, FeedError> {
        let text = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');

        let err = match Self::parse(text) {
            Ok(doc) => return Ok(doc),
            Err(err) => err,
        };

        let Some(cleaned) = strip_control_chars(text) else {
            return Err(err);
        };

        debug!(error = %err, "strict XML parse failed, retrying without control characters");
        Self::parse(&cleaned).map_err(|retry_err| {
            debug!(error = %retry_err, "XML parse failed after stripping control characters");
            err
        })
    }

    /// The document node.
    pub fn document_node(&self) -> Node<'_> {
        Node {
            doc: self,
            id: DOCUMENT_NODE,
        }
    }

    /// The single root element.
    pub fn root(&self) -> Option<Node<'_>> {
        self.document_node().child_elements().next()
    }

    pub(crate) fn node(&self, id: NodeId) -> Node<'_> {
        Node { doc: self, id }
    }
}

/// Removes every Unicode control character except `\n`.
/// Returns `None` when the text contains nothing to strip.
pub fn strip_control_chars(text: &str) -> Option<String> {
    let is_stripped = |c: char| c.is_control() && c != '\n';
    if !text.chars().any(is_stripped) {
        return None;
    }
    Some(text.chars().filter(|&c| !is_stripped(c)).collect())
}

/// A borrowed handle to one node of an [`XmlDocument`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    doc: &'a XmlDocument,
    id: NodeId,
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The document this node belongs to.
    pub fn document(&self) -> &'a XmlDocument {
        self.doc
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data().kind, NodeKind::Element(_))
    }

    /// Local name of an element, `None` for text and document nodes.
    pub fn local_name(&self) -> Option<&'a str> {
        self.element().map(|el| el.local_name.as_str())
    }

    /// Namespace URI of an element.
    pub fn namespace(&self) -> Option<&'a str> {
        self.element().and_then(|el| el.namespace.as_deref())
    }

    /// True when this is an element named `local_name` in namespace `namespace`.
    pub fn has_name(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.element()
            .is_some_and(|el| el.local_name == local_name && el.namespace.as_deref() == namespace)
    }

    pub fn attributes(&self) -> &'a [XmlAttribute] {
        self.element().map(|el| el.attributes.as_slice()).unwrap_or(&[])
    }

    /// Value of the attribute `local_name` in namespace `namespace`.
    pub fn attribute(&self, namespace: Option<&str>, local_name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.local_name == local_name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.doc.node(id))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        self.data()
            .children
            .iter()
            .map(move |&id| doc.node(id))
            .filter(|n| n.is_element())
    }

    /// All element descendants in document order, excluding this node.
    pub fn descendant_elements(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        let mut stack: Vec<NodeId> = self.data().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                let node = doc.node(id);
                stack.extend(node.data().children.iter().rev().copied());
                if node.is_element() {
                    return Some(node);
                }
            }
            None
        })
    }

    /// Concatenated text of every descendant text node, in document order.
    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        // Explicit stack: nesting depth is attacker controlled.
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            let data = &self.doc.nodes[id];
            match &data.kind {
                NodeKind::Text(text) => out.push_str(text),
                _ => stack.extend(data.children.iter().rev().copied()),
            }
        }
        out
    }

    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id]
    }

    fn element(&self) -> Option<&'a XmlElement> {
        match &self.data().kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }
}

fn push_node(nodes: &mut Vec<NodeData>, parent: NodeId, kind: NodeKind) -> NodeId {
    let id = nodes.len();
    nodes.push(NodeData {
        kind,
        parent: Some(parent),
        children: Vec::new(),
    });
    nodes[parent].children.push(id);
    id
}

fn append_text(nodes: &mut Vec<NodeData>, stack: &[NodeId], text: Cow<'_, str>) -> Result<(), FeedError> {
    check_chars(&text)?;

    let Some(&parent) = stack.last() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(FeedError::malformed("text outside the root element"));
    };

    // Adjacent text and CDATA sections merge into one node.
    if let Some(&last) = nodes[parent].children.last() {
        if let NodeKind::Text(existing) = &mut nodes[last].kind {
            existing.push_str(&text);
            return Ok(());
        }
    }
    push_node(nodes, parent, NodeKind::Text(text.into_owned()));
    Ok(())
}

fn read_attributes(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Vec<XmlAttribute>, FeedError> {
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(FeedError::malformed)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = owned_namespace(resolved)?;
        let local_name = utf8(local.into_inner())?.to_string();
        let value = attr.unescape_value().map_err(FeedError::malformed)?;
        check_chars(&value)?;

        attributes.push(XmlAttribute {
            namespace,
            local_name,
            value: value.into_owned(),
        });
    }

    Ok(attributes)
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, FeedError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.into_inner())?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(FeedError::malformed(format!(
            "undeclared namespace prefix `{}`",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, FeedError> {
    std::str::from_utf8(bytes).map_err(FeedError::malformed)
}

/// Rejects characters outside the XML 1.0 `Char` production.
fn check_chars(text: &str) -> Result<(), FeedError> {
    match text.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(FeedError::malformed(format!(
            "illegal character U+{:04X}",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
