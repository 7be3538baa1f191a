//! In-memory element tree.

use std::fmt::Write;

use crate::Dom;
use crate::selector::{Selector, Subject};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Tag of the synthetic root node.
const ROOT_TAG: &str = "#document";

/// Handle to an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Child {
    Element(NodeId),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<Child>,
}

/// Arena-backed element tree.
///
/// Node `0` is a synthetic root that never matches selectors, mirroring the
/// browser's `document` node. Elements are never removed, so a [`NodeId`]
/// stays valid for the lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            elements: vec![Element {
                tag: ROOT_TAG.to_owned(),
                attributes: Vec::new(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The synthetic root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new element to `parent` and return its handle.
    ///
    /// Tag names are stored lowercase.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        let id = NodeId(self.elements.len());
        self.elements.push(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.element_mut(parent).children.push(Child::Element(id));
        id
    }

    /// Append text to `parent`, merging with a preceding text run.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = &mut self.element_mut(parent).children;
        if let Some(Child::Text(last)) = children.last_mut() {
            last.push_str(text);
        } else {
            children.push(Child::Text(text.to_owned()));
        }
    }

    /// Set (or replace) an attribute value.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let attributes = &mut self.element_mut(node).attributes;
        if let Some(entry) = attributes.iter_mut().find(|(k, _)| k == name) {
            value.clone_into(&mut entry.1);
        } else {
            attributes.push((name.to_owned(), value.to_owned()));
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.element_mut(node).attributes.retain(|(k, _)| k != name);
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        &self.element(node).tag
    }

    /// Parent element, or `None` for the root.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).parent
    }

    /// Child elements in document order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.element(node).children.iter().filter_map(|c| match c {
            Child::Element(id) => Some(*id),
            Child::Text(_) => None,
        })
    }

    /// Descendant elements of `node` in document order, excluding `node`.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let start = stack.len();
            stack.extend(self.children(id));
            stack[start..].reverse();
        }
        out
    }

    /// Element with the given `id` attribute, first in document order.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    /// Class tokens of an element.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> Vec<&str> {
        self.attr(node, "class")
            .map(|c| c.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    /// Serialize the subtree below the root as HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.element(self.root()).children {
            self.write_child(&mut out, child);
        }
        out
    }

    fn write_child(&self, out: &mut String, child: &Child) {
        match child {
            Child::Text(text) => out.push_str(&escape_text(text)),
            Child::Element(id) => {
                let element = self.element(*id);
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{}\"", escape_attribute(value));
                    }
                }
                if VOID_ELEMENTS.contains(&element.tag.as_str()) && element.children.is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for grandchild in &element.children {
                    self.write_child(out, grandchild);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn element(&self, node: NodeId) -> &Element {
        &self.elements[node.0]
    }

    fn element_mut(&mut self, node: NodeId) -> &mut Element {
        &mut self.elements[node.0]
    }

    fn subject(&self, node: NodeId) -> ElementRef<'_> {
        ElementRef { doc: self, node }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        for child in &self.element(node).children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Element(id) => self.collect_text(*id, out),
            }
        }
    }
}

/// Borrowed element view for selector matching.
struct ElementRef<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl Subject for ElementRef<'_> {
    fn tag(&self) -> &str {
        self.doc.tag(self.node)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.doc.attr(self.node, name)
    }

    fn parent(&self) -> Option<Self> {
        self.doc
            .parent(self.node)
            .filter(|&p| p != self.doc.root())
            .map(|node| ElementRef {
                doc: self.doc,
                node,
            })
    }
}

impl Dom for Document {
    type Node = NodeId;

    fn query_all(&self, scope: &NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(*scope)
            .into_iter()
            .filter(|&n| selector.matches(&self.subject(n)))
            .collect()
    }

    fn closest(&self, node: &NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(*node).filter(|&n| n != self.root());
        while let Some(n) = current {
            if selector.matches(&self.subject(n)) {
                return Some(n);
            }
            current = self.parent(n).filter(|&p| p != self.root());
        }
        None
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attr(*node, name).map(str::to_owned)
    }

    fn text_content(&self, node: &NodeId) -> String {
        let mut out = String::new();
        self.collect_text(*node, &mut out);
        out
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.classes(*node).contains(&class)
    }

    fn set_class(&mut self, node: &NodeId, class: &str, enabled: bool) {
        let mut tokens: Vec<String> = self
            .classes(*node)
            .into_iter()
            .map(str::to_owned)
            .collect();
        let present = tokens.iter().any(|t| t == class);
        match (present, enabled) {
            (false, true) => tokens.push(class.to_owned()),
            (true, false) => tokens.retain(|t| t != class),
            _ => return,
        }
        self.set_attribute(*node, "class", &tokens.join(" "));
    }

    fn is_hidden(&self, node: &NodeId) -> bool {
        self.attr(*node, "hidden").is_some()
    }

    fn set_hidden(&mut self, node: &NodeId, hidden: bool) {
        if hidden {
            self.set_attribute(*node, "hidden", "");
        } else {
            self.remove_attribute(*node, "hidden");
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
