//! Browser bindings for RW page behaviors.
//!
//! Compiled to WebAssembly and loaded by rendered documentation pages:
//!
//! ```js
//! import init, { initialize } from "./rw_behaviors_web.js";
//!
//! await init();
//! const behaviors = initialize(document.documentElement, null);
//! // later, e.g. on client-side navigation
//! behaviors.dispose();
//! ```
//!
//! One delegated click listener on the root drives tabs and copy buttons.
//! Sections are watched by an `IntersectionObserver`, and copy feedback is
//! reverted by `setTimeout`. Clipboard failures go to `tracing` and the
//! browser console.

mod clipboard;
mod dom;
mod observer;

use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use rw_behaviors::{Clipboard, CopyOutcome, CopyRequest, Page, RevertTicket, VisibilityEntry};
use rw_config::Config;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, MouseEvent};

pub use clipboard::BrowserClipboard;
pub use dom::WebDom;
pub use observer::IntersectionVisibility;

type WebPage = Page<WebDom, IntersectionVisibility>;
type ClickListener = Closure<dyn FnMut(MouseEvent)>;

/// Handle owning every binding on a page.
///
/// Dropping the handle (or calling `dispose`) removes the click listener and
/// disconnects the observer.
#[wasm_bindgen]
pub struct PageBehaviors {
    page: Rc<RefCell<WebPage>>,
    root: Element,
    listener: Option<ClickListener>,
}

/// Bind all behaviors below `root` (the document element by default).
///
/// `config` is optional `rw-page.toml` content.
#[wasm_bindgen]
pub fn initialize(
    root: Option<Element>,
    config: Option<String>,
) -> Result<PageBehaviors, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let root = match root {
        Some(root) => root,
        None => window
            .document()
            .and_then(|document| document.document_element())
            .ok_or_else(|| JsValue::from_str("document has no root element"))?,
    };
    let config = match config {
        Some(content) => Config::from_toml(&content).map_err(to_js)?,
        None => Config::default(),
    };

    // The observer exists before the page it reports to.
    let slot: Rc<OnceCell<Weak<RefCell<WebPage>>>> = Rc::default();
    let sink = {
        let slot = Rc::clone(&slot);
        move |batch: &[VisibilityEntry<Element>]| {
            let Some(page) = slot.get().and_then(Weak::upgrade) else {
                return;
            };
            match page.try_borrow_mut() {
                Ok(mut page) => page.visibility_changed(batch),
                Err(_) => tracing::debug!("Page busy, dropping visibility batch"),
            }
        }
    };
    let page = Page::initialize(WebDom, &root, &config, |threshold| {
        IntersectionVisibility::new(threshold, sink)
    })
    .map_err(to_js)?;
    let page = Rc::new(RefCell::new(page));
    if slot.set(Rc::downgrade(&page)).is_err() {
        tracing::debug!("Visibility sink already bound");
    }

    let clipboard = Rc::new(BrowserClipboard::from_window(&window));
    let listener = click_listener(Rc::downgrade(&page), clipboard);
    root.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;

    Ok(PageBehaviors {
        page,
        root,
        listener: Some(listener),
    })
}

#[wasm_bindgen]
impl PageBehaviors {
    /// Remove the click listener and disconnect the observer.
    pub fn dispose(&mut self) {
        if let Some(listener) = self.listener.take()
            && let Err(e) = self
                .root
                .remove_event_listener_with_callback("click", listener.as_ref().unchecked_ref())
        {
            tracing::warn!(error = ?e, "Failed to remove click listener");
        }
        match self.page.try_borrow_mut() {
            Ok(mut page) => page.dispose(),
            Err(_) => tracing::warn!("Page busy, dispose skipped"),
        }
    }

    /// Discovery warnings as an array of strings.
    pub fn warnings(&self) -> Result<js_sys::Array, JsValue> {
        let page = self.page.try_borrow().map_err(to_js)?;
        Ok(page.warnings().map(JsValue::from_str).collect())
    }

    /// Snapshot of every binding as JSON.
    #[wasm_bindgen(js_name = summaryJson)]
    pub fn summary_json(&self) -> Result<String, JsValue> {
        let page = self.page.try_borrow().map_err(to_js)?;
        serde_json::to_string(&page.summary()).map_err(to_js)
    }
}

impl Drop for PageBehaviors {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn click_listener(
    page: Weak<RefCell<WebPage>>,
    clipboard: Rc<BrowserClipboard>,
) -> ClickListener {
    Closure::new(move |event: MouseEvent| {
        let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };
        let Some(shared) = page.upgrade() else {
            return;
        };
        let Ok(mut current) = shared.try_borrow_mut() else {
            tracing::debug!("Page busy, dropping click");
            return;
        };
        let (_, request) = current.begin_click(&target, page_time());
        drop(current);

        if let Some(request) = request {
            spawn_local(copy_and_finish(Weak::clone(&page), Rc::clone(&clipboard), request));
        }
    })
}

/// Write to the clipboard without holding the page, then apply the result.
async fn copy_and_finish(
    page: Weak<RefCell<WebPage>>,
    clipboard: Rc<BrowserClipboard>,
    request: CopyRequest<Element>,
) {
    let result = clipboard.write_text(&request.text).await;
    if let Err(e) = &result {
        web_sys::console::warn_1(&JsValue::from_str(&format!("Failed to copy code: {e}")));
    }

    let Some(shared) = page.upgrade() else {
        return;
    };
    let Ok(mut current) = shared.try_borrow_mut() else {
        tracing::warn!("Page busy, copy result dropped");
        return;
    };
    if let CopyOutcome::Copied { ticket, delay, .. } =
        current.finish_copy(&request, result, page_time())
    {
        schedule_revert(page, ticket, delay);
    }
}

fn schedule_revert(page: Weak<RefCell<WebPage>>, ticket: RevertTicket, delay: Duration) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(move || {
        let Some(shared) = page.upgrade() else {
            return;
        };
        if let Ok(mut current) = shared.try_borrow_mut() {
            current.fire_revert(ticket);
        }
    });
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        timeout_millis(delay),
    ) {
        tracing::warn!(error = ?e, "Failed to schedule copy revert");
    }
}

/// `performance.now()` as page time.
fn page_time() -> Duration {
    web_sys::window()
        .and_then(|window| window.performance())
        .and_then(|performance| Duration::try_from_secs_f64(performance.now() / 1000.0).ok())
        .unwrap_or_default()
}

fn timeout_millis(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis()).unwrap_or(i32::MAX)
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
