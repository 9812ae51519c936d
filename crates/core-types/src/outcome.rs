use serde::{Deserialize, Serialize};

/// Uniform result of any page-facing component operation. A failed click or
/// fill is a value, not a panic and not a propagated driver exception; the
/// flow controller decides what a failure means for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The text of whatever element the operation acted on, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            matched_text: None,
        }
    }

    pub fn ok_with(matched_text: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            matched_text: Some(matched_text.into()),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            matched_text: None,
        }
    }

    pub fn fail_on(error: impl Into<String>, matched_text: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            matched_text: Some(matched_text.into()),
        }
    }
}
