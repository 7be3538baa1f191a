//! DOM capability trait.

use std::fmt;

use crate::Selector;

/// Operations page behaviors need from a document.
///
/// Query semantics follow the browser: [`query_all`](Dom::query_all) returns
/// descendants of `scope` (never `scope` itself) in document order, and
/// [`closest`](Dom::closest) starts at the node itself and walks up.
pub trait Dom {
    /// Handle to an element.
    type Node: Clone + PartialEq + fmt::Debug;

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: &Self::Node, selector: &Selector) -> Vec<Self::Node>;

    /// First descendant of `scope` matching `selector`.
    fn query_first(&self, scope: &Self::Node, selector: &Selector) -> Option<Self::Node> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Nearest inclusive ancestor of `node` matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &Selector) -> Option<Self::Node>;

    /// Attribute value, if present.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Concatenated text of the node and its descendants.
    fn text_content(&self, node: &Self::Node) -> String;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Add (`enabled`) or remove a class token.
    fn set_class(&mut self, node: &Self::Node, class: &str, enabled: bool);

    fn is_hidden(&self, node: &Self::Node) -> bool;

    fn set_hidden(&mut self, node: &Self::Node, hidden: bool);
}
