//! Interactive behaviors for RW documentation pages.
//!
//! Three independent behaviors bind to a rendered page:
//!
//! - [`TabController`]: mutually exclusive panes per tab group
//! - [`ScrollSpy`]: highlights the navigation link of the section in view
//! - [`CopyControls`]: copies code blocks to the clipboard with transient
//!   feedback
//!
//! Each behavior keeps explicit state and renders it through the [`Dom`]
//! capability, so the same logic runs against the in-memory
//! [`rw_dom::Document`] and a browser DOM.
//!
//! # Quick Start
//!
//! ```
//! use rw_behaviors::{MemoryClipboard, Page, SyntheticObserver};
//! use rw_config::Config;
//! use rw_dom::{Document, Dom, Selector};
//! use std::time::Duration;
//!
//! let html = r#"<div class="code-block"><code>SELECT 1;</code>
//! <button class="copy-button">Copy</button></div>"#;
//! let doc = Document::parse(html).unwrap();
//! let root = doc.root();
//! let mut page = Page::initialize(doc, &root, &Config::default(), SyntheticObserver::new).unwrap();
//!
//! let button = page.dom().query_first(&root, &Selector::parse(".copy-button").unwrap()).unwrap();
//! let clipboard = MemoryClipboard::new();
//! # tokio_test::block_on(async {
//! page.click(&button, &clipboard, Duration::ZERO).await;
//! # });
//! assert_eq!(clipboard.contents().as_deref(), Some("SELECT 1;"));
//! ```
//!
//! [`Dom`]: rw_dom::Dom

mod clipboard;
mod copy;
mod error;
mod page;
mod scroll_spy;
mod tabs;

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard};
pub use copy::{CopyControls, CopyOutcome, CopyRequest, CopyState, RevertTicket};
pub use error::BehaviorError;
pub use page::{ClickOutcome, CopySummary, Page, PageSummary, ScrollSpySummary, TabGroupSummary};
pub use scroll_spy::{ScrollSpy, SpyState, SyntheticObserver, VisibilityEntry, VisibilityObserver};
pub use tabs::{TabController, TabGroup, TabState};
