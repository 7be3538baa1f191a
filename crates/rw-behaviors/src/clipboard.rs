//! Clipboard capability.

use std::cell::RefCell;
use std::future::Future;

/// Clipboard write failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    /// The host refused the write (e.g., permission denied).
    #[error("clipboard write rejected: {0}")]
    Rejected(String),
    /// No clipboard is available in this environment.
    #[error("clipboard unavailable")]
    Unavailable,
}

/// Asynchronous text clipboard.
pub trait Clipboard {
    /// Write `text` to the clipboard.
    fn write_text(&self, text: &str) -> impl Future<Output = Result<(), ClipboardError>>;
}

/// In-memory clipboard for tests and simulation.
///
/// Records every accepted write. A rejecting clipboard records nothing and
/// fails every write with the configured reason.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    writes: RefCell<Vec<String>>,
    reject: Option<String>,
}

impl MemoryClipboard {
    /// Create a clipboard that accepts every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clipboard that rejects every write.
    #[must_use]
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            writes: RefCell::new(Vec::new()),
            reject: Some(reason.into()),
        }
    }

    /// Accepted writes, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    /// Most recent accepted write.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.writes.borrow().last().cloned()
    }
}

impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if let Some(reason) = &self.reject {
            return Err(ClipboardError::Rejected(reason.clone()));
        }
        self.writes.borrow_mut().push(text.to_owned());
        Ok(())
    }
}
