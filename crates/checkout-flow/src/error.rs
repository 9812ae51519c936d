use cartflow_core_types::RunPhase;
use page_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    /// The same stage failed the same way too many times in a row.
    #[error("stuck loop: {state} kept failing with {failure:?}")]
    StuckLoop { state: String, failure: String },

    /// Iteration budget exhausted without reaching a terminal state.
    #[error("no terminal state after {0} iterations")]
    IterationLimit(u32),

    /// The site demanded a sign-in and no credentials were provided.
    #[error("checkout requires an account password")]
    CredentialRequired,

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A product-stage step that cannot be skipped failed.
    #[error("product setup failed: {0}")]
    ProductSetup(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Perceiver(#[from] page_perceiver::PerceiverError),

    #[error(transparent)]
    Locator(#[from] element_locator::LocatorError),

    #[error(transparent)]
    Dismiss(#[from] overlay_dismiss::DismissError),
}

impl FlowError {
    /// The phase a failure should be attributed to when it carries one
    /// intrinsically.
    pub fn default_phase(&self) -> Option<RunPhase> {
        match self {
            FlowError::ProductSetup(_) => Some(RunPhase::Product),
            FlowError::Navigation(_) => Some(RunPhase::CartNavigation),
            _ => None,
        }
    }
}
