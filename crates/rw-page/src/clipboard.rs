//! Clipboard backends selectable from the command line.

use std::cell::RefCell;

use clap::ValueEnum;
use rw_behaviors::{Clipboard, ClipboardError, MemoryClipboard};

use crate::error::CliError;

/// `--clipboard` choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum ClipboardMode {
    /// Record writes in memory.
    #[default]
    Memory,
    /// Reject every write, as a browser without permission would.
    Deny,
    /// Write to the system clipboard.
    System,
}

/// Clipboard used while replaying a script.
pub(crate) enum ScriptClipboard {
    Memory(MemoryClipboard),
    System {
        clipboard: RefCell<arboard::Clipboard>,
        writes: RefCell<Vec<String>>,
    },
}

impl ScriptClipboard {
    /// Open the clipboard for `mode`.
    pub(crate) fn open(mode: ClipboardMode) -> Result<Self, CliError> {
        Ok(match mode {
            ClipboardMode::Memory => Self::Memory(MemoryClipboard::new()),
            ClipboardMode::Deny => Self::Memory(MemoryClipboard::rejecting("permission denied")),
            ClipboardMode::System => Self::System {
                clipboard: RefCell::new(arboard::Clipboard::new()?),
                writes: RefCell::new(Vec::new()),
            },
        })
    }

    /// Accepted writes, oldest first.
    pub(crate) fn writes(&self) -> Vec<String> {
        match self {
            Self::Memory(memory) => memory.writes(),
            Self::System { writes, .. } => writes.borrow().clone(),
        }
    }
}

impl Clipboard for ScriptClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        match self {
            Self::Memory(memory) => memory.write_text(text).await,
            Self::System { clipboard, writes } => {
                clipboard
                    .borrow_mut()
                    .set_text(text.to_owned())
                    .map_err(|e| ClipboardError::Rejected(e.to_string()))?;
                writes.borrow_mut().push(text.to_owned());
                Ok(())
            }
        }
    }
}
