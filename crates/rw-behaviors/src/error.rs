//! Error types for page behaviors.

use rw_dom::{Selector, SelectorError};

/// Error while setting up behaviors.
///
/// Runtime event handling never fails; only configuration problems surface
/// here, before any binding is created.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    /// A configured selector could not be parsed.
    #[error("invalid selector in {field}: {source}")]
    Selector {
        /// Config field path (e.g., "`tabs.trigger`").
        field: &'static str,
        /// Parse failure.
        #[source]
        source: SelectorError,
    },
}

/// Compile a configured selector, naming the field on failure.
pub(crate) fn compile(value: &str, field: &'static str) -> Result<Selector, BehaviorError> {
    Selector::parse(value).map_err(|source| BehaviorError::Selector { field, source })
}
