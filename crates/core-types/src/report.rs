use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one end-to-end checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Coarse progress marker for the run report: which major phase the run
/// ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Product page handling: variants, quantity, add to cart.
    Product,
    /// Getting from the product/cart context onto the checkout page.
    CartNavigation,
    /// The checkout form loop itself.
    Checkout,
    Unknown,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Product => "product",
            RunPhase::CartNavigation => "cart_navigation",
            RunPhase::Checkout => "checkout",
            RunPhase::Unknown => "unknown",
        }
    }
}

/// Final report for one run, serialized as the CLI's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: RunId,
    pub success: bool,
    pub phase: RunPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn success(phase: RunPhase, final_url: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: RunId::generate(),
            success: true,
            phase,
            step: None,
            error: None,
            final_url,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        phase: RunPhase,
        step: impl Into<String>,
        error: impl Into<String>,
        final_url: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: RunId::generate(),
            success: false,
            phase,
            step: Some(step.into()),
            error: Some(error.into()),
            final_url,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_serialize_snake_case() {
        let json = serde_json::to_string(&RunPhase::CartNavigation).expect("serialize");
        assert_eq!(json, r#""cart_navigation""#);
    }

    #[test]
    fn failure_report_carries_step_and_error() {
        let report = RunReport::failure(
            RunPhase::Checkout,
            "contact_fill",
            "stuck loop detected",
            Some("https://shop.test/checkout".into()),
            Utc::now(),
        );
        assert!(!report.success);
        assert_eq!(report.step.as_deref(), Some("contact_fill"));
        assert!(report.finished_at >= report.started_at);
    }
}
