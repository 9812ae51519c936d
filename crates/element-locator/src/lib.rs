//! Element locator: resolves "the checkout button" or "the city field"
//! against whatever the page currently renders, with no site-specific
//! selectors. Scoring and field-ladder logic are pure functions in
//! [`scoring`] and [`fields`]; [`Locator`] adds the harvest-and-retry
//! loop on top.

mod fields;
mod scoring;

pub use fields::match_field;
pub use scoring::{best_button, score_button};

use cartflow_core_types::{FieldKind, MatchResult, RetryPolicy};
use page_adapter::{AdapterError, DomProbe};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

pub struct Locator {
    probe: Arc<dyn DomProbe>,
    retry: RetryPolicy,
}

impl Locator {
    pub fn new(probe: Arc<dyn DomProbe>, retry: RetryPolicy) -> Self {
        Self { probe, retry }
    }

    /// Re-harvest and score until something matches or attempts run out.
    /// `NotFound` after the last attempt is a value, not an error; slow
    /// pages get the retry delays to finish rendering.
    pub async fn find_button(&self, keywords: &[&str]) -> Result<MatchResult, LocatorError> {
        let mut attempt = 1;
        loop {
            let buttons = self.probe.harvest_buttons().await?;
            let result = best_button(&buttons, keywords);
            if let MatchResult::Found { ref matched_text, score, .. } = result {
                debug!(%matched_text, score, "button resolved");
                return Ok(result);
            }
            if !self.retry.has_attempts_left(attempt) {
                debug!(?keywords, "no button matched");
                return Ok(MatchResult::NotFound);
            }
            tokio::time::sleep(self.retry.delay_for(attempt)).await;
            attempt += 1;
        }
    }

    /// Single-shot button resolution against an existing harvest.
    pub async fn find_button_now(&self, keywords: &[&str]) -> Result<MatchResult, LocatorError> {
        let buttons = self.probe.harvest_buttons().await?;
        Ok(best_button(&buttons, keywords))
    }

    pub async fn find_field(
        &self,
        kind: FieldKind,
        include_filled: bool,
    ) -> Result<MatchResult, LocatorError> {
        let mut attempt = 1;
        loop {
            let fields = self.probe.harvest_fields().await?;
            let result = match_field(&fields, kind, include_filled);
            if result.is_found() {
                debug!(kind = %kind, "field resolved");
                return Ok(result);
            }
            if !self.retry.has_attempts_left(attempt) {
                return Ok(MatchResult::NotFound);
            }
            tokio::time::sleep(self.retry.delay_for(attempt)).await;
            attempt += 1;
        }
    }

    /// Single-shot field resolution; no retry delays. Used where absence
    /// is an expected outcome (optional fields, duplicate confirm fields).
    pub async fn find_field_now(
        &self,
        kind: FieldKind,
        include_filled: bool,
    ) -> Result<MatchResult, LocatorError> {
        let fields = self.probe.harvest_fields().await?;
        Ok(match_field(&fields, kind, include_filled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflow_core_types::RetryPolicy;
    use page_adapter::fake::{FakeButton, FakeDom, FakePage};

    fn no_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1.0,
            cap_ms: 0,
        }
    }

    #[tokio::test]
    async fn locator_finds_button_through_probe() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default()
                .with_button(FakeButton::new("wish", "Add to Wishlist"))
                .with_button(FakeButton::new("bag", "Add to Bag")),
        ));
        let locator = Locator::new(dom, no_retry());
        let result = locator
            .find_button(&["add to cart", "add to bag"])
            .await
            .expect("harvest");
        assert_eq!(result.handle().map(|h| h.0.as_str()), Some("bag"));
    }

    #[tokio::test]
    async fn locator_reports_not_found_as_a_value() {
        let dom = Arc::new(FakeDom::new("u", FakePage::default()));
        let locator = Locator::new(dom, no_retry());
        let result = locator.find_button(&["checkout"]).await.expect("harvest");
        assert_eq!(result, MatchResult::NotFound);
    }
}
