//! [`Dom`] over the live browser document.

use rw_dom::{Dom, Selector};
use wasm_bindgen::JsCast;
use web_sys::Element;

/// Browser DOM backend.
///
/// Selectors are rendered back to CSS and evaluated by the browser. DOM
/// exceptions are logged and treated as "no match".
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDom;

impl Dom for WebDom {
    type Node = Element;

    fn query_all(&self, scope: &Element, selector: &Selector) -> Vec<Element> {
        let css = selector.to_string();
        let list = match scope.query_selector_all(&css) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(selector = %css, error = ?e, "querySelectorAll failed");
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn query_first(&self, scope: &Element, selector: &Selector) -> Option<Element> {
        scope.query_selector(&selector.to_string()).ok().flatten()
    }

    fn closest(&self, node: &Element, selector: &Selector) -> Option<Element> {
        node.closest(&selector.to_string()).ok().flatten()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn text_content(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn set_class(&mut self, node: &Element, class: &str, enabled: bool) {
        if let Err(e) = node.class_list().toggle_with_force(class, enabled) {
            tracing::warn!(class, error = ?e, "Failed to toggle class");
        }
    }

    fn is_hidden(&self, node: &Element) -> bool {
        node.has_attribute("hidden")
    }

    fn set_hidden(&mut self, node: &Element, hidden: bool) {
        let result = if hidden {
            node.set_attribute("hidden", "")
        } else {
            node.remove_attribute("hidden")
        };
        if let Err(e) = result {
            tracing::warn!(hidden, error = ?e, "Failed to set hidden attribute");
        }
    }
}
