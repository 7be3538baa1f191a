//! Element tree, selectors and DOM capability trait for RW page behaviors.
//!
//! Page behaviors never touch a concrete DOM. They are written against the
//! [`Dom`] trait, which exposes the handful of operations they need:
//! selector queries, attribute and text access, class toggles and visibility.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Dom`] trait implemented by every backend
//! - [`Selector`] parser for the CSS subset used in configuration
//! - [`Document`] in-memory element tree implementing [`Dom`], used by tests
//!   and the `rw-page` CLI
//! - [`Document::parse`] XHTML loader built on `quick-xml`
//!
//! The browser backend lives in `rw-behaviors-web` and renders selectors back
//! to CSS via their [`Display`](std::fmt::Display) implementation.
//!
//! # Example
//!
//! ```
//! use rw_dom::{Document, Dom, Selector};
//!
//! let mut doc = Document::parse(r#"<div class="tabs"><button data-tab="a">A</button></div>"#)?;
//! let selector: Selector = "button[data-tab]".parse()?;
//! let buttons = doc.query_all(&doc.root(), &selector);
//! doc.set_class(&buttons[0], "active", true);
//! assert!(doc.has_class(&buttons[0], "active"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod document;
mod dom;
mod parser;
mod selector;

pub use document::{Document, NodeId};
pub use dom::Dom;
pub use parser::ParseError;
pub use selector::{Selector, SelectorError};
