//! Field filler: writes values into located fields and refuses to call a
//! fill done until the field actually reads the value back. Escalates
//! through three fill modes, handles native and custom dropdowns, and
//! picks the cheapest shipping rate.

mod verify;

pub use verify::{parse_price, values_match};

use cartflow_core_types::{ActionOutcome, ElementHandle, FieldKind, RetryPolicy};
use cartflow_keywords::{country_candidates, normalize, state_abbreviation};
use page_adapter::{AdapterError, DomProbe, FillMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const FILL_CASCADE: [FillMode; 3] = [FillMode::Type, FillMode::Force, FillMode::Inject];
const STABILIZE_MS: u64 = 300;

pub struct Filler {
    probe: Arc<dyn DomProbe>,
    retry: RetryPolicy,
}

impl Filler {
    pub fn new(probe: Arc<dyn DomProbe>, retry: RetryPolicy) -> Self {
        Self { probe, retry }
    }

    /// Fill one field through the mode cascade. Success means the
    /// read-back verified, never merely that a write was attempted.
    pub async fn fill(&self, handle: &ElementHandle, value: &str, kind: FieldKind) -> ActionOutcome {
        let mut failure = format!("fill cascade exhausted for {value:?}");
        for (i, mode) in FILL_CASCADE.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.retry.delay_for(1)).await;
            }
            match self.probe.fill_text(handle, value, *mode).await {
                Ok(()) => {}
                Err(err) if err.is_stale() => {
                    // Give a re-rendering form a moment, then let the
                    // caller re-locate; this handle is dead.
                    tokio::time::sleep(Duration::from_millis(STABILIZE_MS)).await;
                    if !self.is_attached_quiet(handle).await {
                        return ActionOutcome::fail(format!("element detached: {handle}"));
                    }
                    continue;
                }
                Err(err) => {
                    // A broken write path still leaves the blunter modes
                    // worth trying.
                    warn!(%handle, kind = %kind, mode = ?mode, error = %err, "fill mode errored");
                    failure = err.to_string();
                    continue;
                }
            }

            if let Err(err) = self.probe.blur(handle).await {
                if !err.is_stale() {
                    return ActionOutcome::fail(err.to_string());
                }
            }

            match self.probe.read_value(handle).await {
                Ok(actual) => {
                    if values_match(value, &actual, kind) {
                        debug!(%handle, kind = %kind, mode = ?mode, "fill verified");
                        return ActionOutcome::ok_with(actual);
                    }
                    warn!(%handle, kind = %kind, mode = ?mode, %actual, "fill did not verify");
                    failure = format!(
                        "value mismatch after fill cascade: wanted {value:?}, field shows {actual:?}"
                    );
                }
                Err(err) if err.is_stale() => {
                    return ActionOutcome::fail(format!("element detached: {handle}"))
                }
                Err(err) => return ActionOutcome::fail(err.to_string()),
            }
        }
        ActionOutcome::fail(failure)
    }

    /// Fill an address line, then commit the first autocomplete
    /// suggestion when one opens. The suggestion click is best-effort;
    /// the typed value already verified.
    pub async fn fill_with_suggestion(
        &self,
        handle: &ElementHandle,
        value: &str,
        kind: FieldKind,
    ) -> ActionOutcome {
        let outcome = self.fill(handle, value, kind).await;
        if !outcome.success {
            return outcome;
        }
        match self.probe.click_first_suggestion().await {
            Ok(true) => debug!(%handle, "accepted address suggestion"),
            Ok(false) => {}
            Err(err) => warn!(%handle, error = %err, "suggestion click failed"),
        }
        outcome
    }

    /// Select a dropdown value, trying progressively looser renderings:
    /// exact option value, exact label, geographic abbreviation or alias,
    /// then normalized containment. Falls back to clicking through a
    /// custom (non-`<select>`) dropdown when the element has no options.
    pub async fn select_dropdown(
        &self,
        handle: &ElementHandle,
        value: &str,
        kind: FieldKind,
    ) -> ActionOutcome {
        let candidates = selection_candidates(value, kind);

        let options = match self.probe.select_options(handle).await {
            Ok(options) => options,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };

        if options.is_empty() {
            return self.select_custom(handle, &candidates).await;
        }

        // Exact option-value match first ("TX"), then exact label
        // ("Texas"), then containment.
        for candidate in &candidates {
            for option in &options {
                if option.value.eq_ignore_ascii_case(candidate) {
                    return self.commit_option(handle, &option.value, &option.text).await;
                }
            }
        }
        for candidate in &candidates {
            for option in &options {
                if normalize(&option.text) == normalize(candidate) {
                    return self.commit_option(handle, &option.value, &option.text).await;
                }
            }
        }
        for candidate in &candidates {
            let needle = normalize(candidate);
            if needle.len() < 3 {
                continue;
            }
            for option in &options {
                if normalize(&option.text).contains(&needle) {
                    return self.commit_option(handle, &option.value, &option.text).await;
                }
            }
        }

        ActionOutcome::fail(format!(
            "no option matched {value:?} among {} choices",
            options.len()
        ))
    }

    async fn commit_option(
        &self,
        handle: &ElementHandle,
        option_value: &str,
        option_text: &str,
    ) -> ActionOutcome {
        match self.probe.select_option(handle, option_value).await {
            Ok(true) => {
                debug!(%handle, option = option_text, "dropdown selected");
                ActionOutcome::ok_with(option_text)
            }
            Ok(false) => ActionOutcome::fail(format!(
                "select rejected option value {option_value:?}"
            )),
            Err(err) => ActionOutcome::fail(err.to_string()),
        }
    }

    async fn select_custom(&self, handle: &ElementHandle, candidates: &[String]) -> ActionOutcome {
        if let Err(err) = self.probe.click(handle).await {
            return ActionOutcome::fail(err.to_string());
        }
        tokio::time::sleep(Duration::from_millis(STABILIZE_MS)).await;
        for candidate in candidates {
            match self.probe.pick_visible_option(candidate).await {
                Ok(true) => return ActionOutcome::ok_with(candidate.clone()),
                Ok(false) => {}
                Err(err) => return ActionOutcome::fail(err.to_string()),
            }
        }
        ActionOutcome::fail("no visible option matched in custom dropdown")
    }

    /// Choose the cheapest visible shipping rate. Absence of any rate
    /// group is not a failure; plenty of checkouts have exactly one
    /// implied rate.
    pub async fn select_cheapest_shipping(&self) -> ActionOutcome {
        let options = match self.probe.shipping_options().await {
            Ok(options) => options,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };
        if options.is_empty() {
            return ActionOutcome::ok();
        }

        let cheapest = options
            .iter()
            .min_by(|a, b| {
                let pa = parse_price(&a.price_text).unwrap_or(f64::MAX);
                let pb = parse_price(&b.price_text).unwrap_or(f64::MAX);
                pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();

        match cheapest {
            Some(option) => {
                if option.checked {
                    return ActionOutcome::ok_with(option.label);
                }
                match self.probe.click(&option.handle).await {
                    Ok(()) => ActionOutcome::ok_with(option.label),
                    Err(err) => ActionOutcome::fail(err.to_string()),
                }
            }
            None => ActionOutcome::ok(),
        }
    }

    async fn is_attached_quiet(&self, handle: &ElementHandle) -> bool {
        matches!(self.probe.is_attached(handle).await, Ok(true))
    }
}

/// The renderings worth trying for a dropdown value, most specific
/// first. Provinces add the USPS abbreviation; countries add their
/// common aliases and codes.
fn selection_candidates(value: &str, kind: FieldKind) -> Vec<String> {
    match kind {
        FieldKind::Province => {
            let mut candidates = vec![value.trim().to_string()];
            if let Some(abbrev) = state_abbreviation(value) {
                candidates.push(abbrev.to_string());
            }
            candidates
        }
        FieldKind::Country => country_candidates(value),
        _ => vec![value.trim().to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::fake::{FakeDom, FakeField, FakePage};

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            multiplier: 1.0,
            cap_ms: 1,
        }
    }

    #[tokio::test]
    async fn fill_round_trip_verifies() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(FakeField::new("email", "email")),
        ));
        let filler = Filler::new(dom.clone(), quick_retry());
        let outcome = filler
            .fill(&ElementHandle("email".into()), "jo@example.com", FieldKind::Email)
            .await;
        assert!(outcome.success, "outcome: {outcome:?}");
        assert_eq!(dom.field_value("email").as_deref(), Some("jo@example.com"));
    }

    #[tokio::test]
    async fn cascade_escalates_when_typing_is_swallowed() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(
                FakeField::new("addr", "address1").rejecting(&[FillMode::Type]),
            ),
        ));
        let filler = Filler::new(dom.clone(), quick_retry());
        let outcome = filler
            .fill(&ElementHandle("addr".into()), "1 Main St", FieldKind::AddressLine1)
            .await;
        assert!(outcome.success);
        let log = dom.action_log();
        assert!(log.contains(&"fill:addr:Type".to_string()));
        assert!(log.contains(&"fill:addr:Force".to_string()));
    }

    #[tokio::test]
    async fn cascade_survives_an_erroring_write_path() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(
                FakeField::new("city", "city").erroring(&[FillMode::Type, FillMode::Force]),
            ),
        ));
        let filler = Filler::new(dom.clone(), quick_retry());
        let outcome = filler
            .fill(&ElementHandle("city".into()), "Austin", FieldKind::City)
            .await;
        assert!(outcome.success, "outcome: {outcome:?}");
        assert_eq!(dom.field_value("city").as_deref(), Some("Austin"));
        assert!(dom.action_log().contains(&"fill:city:Inject".to_string()));
    }

    #[tokio::test]
    async fn cascade_reports_the_write_error_when_every_mode_breaks() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(
                FakeField::new("city", "city")
                    .erroring(&[FillMode::Type, FillMode::Force, FillMode::Inject]),
            ),
        ));
        let filler = Filler::new(dom, quick_retry());
        let outcome = filler
            .fill(&ElementHandle("city".into()), "Austin", FieldKind::City)
            .await;
        assert!(!outcome.success);
        assert!(outcome
            .error
            .as_deref()
            .map(|e| e.contains("blocked"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn missing_element_fails_cleanly() {
        let dom = Arc::new(FakeDom::new("u", FakePage::default()));
        let filler = Filler::new(dom, quick_retry());
        let outcome = filler
            .fill(&ElementHandle("ghost".into()), "x", FieldKind::City)
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().map(|e| e.contains("detached")).unwrap_or(false));
    }

    #[tokio::test]
    async fn texas_selects_tx_option() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(FakeField::select(
                "state",
                "state",
                vec![("AL", "Alabama"), ("TX", "Texas"), ("UT", "Utah")],
            )),
        ));
        let filler = Filler::new(dom.clone(), quick_retry());
        let outcome = filler
            .select_dropdown(&ElementHandle("state".into()), "Texas", FieldKind::Province)
            .await;
        assert!(outcome.success, "outcome: {outcome:?}");
        assert_eq!(dom.field_value("state").as_deref(), Some("TX"));
    }

    #[tokio::test]
    async fn country_alias_selects_code_option() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(FakeField::select(
                "country",
                "country",
                vec![("CA", "Canada"), ("US", "United States"), ("GB", "United Kingdom")],
            )),
        ));
        let filler = Filler::new(dom.clone(), quick_retry());
        let outcome = filler
            .select_dropdown(&ElementHandle("country".into()), "USA", FieldKind::Country)
            .await;
        assert!(outcome.success, "outcome: {outcome:?}");
        assert_eq!(dom.field_value("country").as_deref(), Some("US"));
    }

    #[tokio::test]
    async fn cheapest_shipping_wins() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default()
                .with_radio("exp", "Express", "Express (1-2 days) $19.99")
                .with_radio("std", "Standard", "Standard (5-7 days) $4.99")
                .with_radio("eco", "Economy", "Economy (7-10 days) $6.50"),
        ));
        let filler = Filler::new(dom.clone(), quick_retry());
        let outcome = filler.select_cheapest_shipping().await;
        assert!(outcome.success);
        assert_eq!(outcome.matched_text.as_deref(), Some("Standard"));
        assert_eq!(dom.checked_radio().as_deref(), Some("std"));
    }

    #[tokio::test]
    async fn no_shipping_options_is_fine() {
        let dom = Arc::new(FakeDom::new("u", FakePage::default()));
        let filler = Filler::new(dom, quick_retry());
        assert!(filler.select_cheapest_shipping().await.success);
    }
}
