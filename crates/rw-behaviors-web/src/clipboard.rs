//! `navigator.clipboard` backend.

use js_sys::Reflect;
use rw_behaviors::{Clipboard, ClipboardError};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Window;

/// Async Clipboard API of the current window.
///
/// `navigator.clipboard` is missing in insecure contexts; every write then
/// fails with [`ClipboardError::Unavailable`].
pub struct BrowserClipboard {
    clipboard: Option<web_sys::Clipboard>,
}

impl BrowserClipboard {
    pub fn from_window(window: &Window) -> Self {
        let navigator = window.navigator();
        let present = Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .is_ok_and(|value| !value.is_undefined() && !value.is_null());
        if !present {
            tracing::debug!("navigator.clipboard is not available");
        }
        Self::new(present.then(|| navigator.clipboard()))
    }

    /// Wrap a clipboard handle; `None` makes every write unavailable.
    pub fn new(clipboard: Option<web_sys::Clipboard>) -> Self {
        Self { clipboard }
    }
}

impl Clipboard for BrowserClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = self.clipboard.as_ref().ok_or(ClipboardError::Unavailable)?;
        JsFuture::from(clipboard.write_text(text))
            .await
            .map(|_| ())
            .map_err(|e| ClipboardError::Rejected(describe(&e)))
    }
}

/// Human-readable form of a rejected promise value.
fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_without_clipboard_is_unavailable() {
        let clipboard = BrowserClipboard::new(None);
        let result = tokio_test::block_on(clipboard.write_text("SELECT 1;"));
        assert_eq!(result, Err(ClipboardError::Unavailable));
    }
}
