use cartflow_core_types::ElementHandle;
use thiserror::Error;

/// Failures surfaced by a page probe. `NotFound` and `Detached` are the
/// two the upper layers care about distinguishing: the first means the
/// marker was never there, the second that the page replaced the node
/// after it was harvested.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("element not found: {0}")]
    NotFound(ElementHandle),

    #[error("element detached from document: {0}")]
    Detached(ElementHandle),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl AdapterError {
    pub fn is_stale(&self) -> bool {
        matches!(self, AdapterError::Detached(_) | AdapterError::NotFound(_))
    }
}
