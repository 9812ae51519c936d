use cartflow_core_types::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Tunables for the flow controller. Defaults are what field testing
/// settled on; none of them are site-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Hard cap on checkout loop iterations.
    pub max_iterations: u32,
    /// Consecutive identical failures before declaring a stuck loop.
    pub stuck_threshold: u32,
    /// Pause after navigations and clicks, letting the page settle
    /// before the next harvest.
    pub settle_ms: u64,
    /// The shipping verification pass must confirm at least this many
    /// address fields, or the stage is treated as failed.
    pub min_address_fields: u32,
    pub retry: RetryPolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 24,
            stuck_threshold: 3,
            settle_ms: 800,
            min_address_fields: 2,
            retry: RetryPolicy::default(),
        }
    }
}
