//! Stage handlers for the checkout loop. Each handler does everything it
//! can for its stage, reports progress or a reason it could not, and
//! leaves retry/escalation policy to the controller.

use crate::{CheckoutController, FlowError};
use cartflow_core_types::{ActionOutcome, FieldKind, MatchResult};
use cartflow_keywords::{
    CHECKOUT_BUTTON_TERMS, CONTINUE_TO_PAYMENT_TERMS, CONTINUE_TO_SHIPPING_TERMS,
    GUEST_CHECKOUT_TERMS,
};
use page_perceiver::{has_card_fields, PageObservation};
use tracing::{debug, info, warn};

/// Handler verdict. `Failed` is recoverable; hard aborts use `FlowError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StageOutcome {
    Progressed,
    Failed(String),
}

/// What a validated click observed.
pub(crate) enum ClickValidation {
    /// The page visibly changed (URL or control census).
    Changed(String),
    /// Clicked, but nothing observable happened.
    NoChange(String),
    NotFound,
}

impl CheckoutController {
    /// Contact stage: guest checkout, the password side-channel, email
    /// (critical), names, phone, confirm-duplicates, then continue.
    pub(crate) async fn contact_stage(
        &self,
        observation: &PageObservation,
    ) -> Result<StageOutcome, FlowError> {
        // Prefer a guest path whenever the page offers one.
        if let MatchResult::Found { handle, matched_text, .. } =
            self.locator.find_button_now(GUEST_CHECKOUT_TERMS).await?
        {
            if self.probe.click(&handle).await.is_ok() {
                info!(%matched_text, "selected guest checkout");
                self.settle().await;
            }
        }

        // A visible password input means this checkout wants an account.
        if observation
            .fields
            .iter()
            .any(|f| f.visible && f.input_type == "password")
        {
            let Some(password) = self.credentials.request_password(&observation.url).await else {
                return Err(FlowError::CredentialRequired);
            };
            match self.locator.find_field_now(FieldKind::Password, false).await? {
                MatchResult::Found { handle, .. } => {
                    let outcome = self.filler.fill(&handle, &password, FieldKind::Password).await;
                    if !outcome.success {
                        return Ok(StageOutcome::Failed(describe(
                            "password fill",
                            &outcome,
                        )));
                    }
                }
                MatchResult::NotFound => {
                    return Ok(StageOutcome::Failed("password field not locatable".into()))
                }
            }
        }

        // Email is the one field this stage cannot do without.
        let email = self.customer.contact.email.clone();
        match self.fill_kind(FieldKind::Email, &email).await? {
            FillStatus::Filled | FillStatus::AlreadyDone => {}
            FillStatus::Missing => {
                return Ok(StageOutcome::Failed("email field not found".into()))
            }
            FillStatus::Failed(outcome) => {
                return Ok(StageOutcome::Failed(describe("email fill", &outcome)))
            }
        }

        // Names and phone are best-effort; plenty of contact steps ask
        // only for an email.
        let first = self.customer.contact.first_name.clone();
        let last = self.customer.contact.last_name.clone();
        for (kind, value) in [
            (FieldKind::FirstName, first),
            (FieldKind::LastName, last),
        ] {
            if value.is_empty() {
                continue;
            }
            if let FillStatus::Failed(outcome) = self.fill_kind(kind, &value).await? {
                return Ok(StageOutcome::Failed(describe(kind.as_str(), &outcome)));
            }
        }
        if let Some(phone) = self.customer.contact.phone.clone() {
            if let FillStatus::Failed(outcome) = self.fill_kind(FieldKind::Phone, &phone).await? {
                warn!(error = ?outcome.error, "phone fill failed, continuing");
            }
        }

        // Confirm-duplicate fields ("confirm email", "re-enter phone")
        // are vetoed out of the primary slots on purpose; fill them here
        // with the same values.
        self.fill_confirm_duplicates(&email).await?;

        // Move on. A missing continue button on a single-page checkout
        // just means the address form is already in front of us.
        match self.click_validated(CONTINUE_TO_SHIPPING_TERMS).await? {
            ClickValidation::Changed(text) => {
                info!(button = %text, "continued past contact stage");
                Ok(StageOutcome::Progressed)
            }
            ClickValidation::NoChange(text) => Ok(StageOutcome::Failed(format!(
                "clicking {text:?} changed nothing"
            ))),
            ClickValidation::NotFound => {
                if observation.fields.iter().any(|f| {
                    f.visible && element_locator::match_field(
                        std::slice::from_ref(f),
                        FieldKind::AddressLine1,
                        true,
                    )
                    .is_found()
                }) {
                    Ok(StageOutcome::Progressed)
                } else {
                    Ok(StageOutcome::Failed("continue button not found".into()))
                }
            }
        }
    }

    /// Shipping stage: the full address, a verification pass, cheapest
    /// shipping rate, then continue toward payment.
    pub(crate) async fn shipping_stage(
        &self,
        observation: &PageObservation,
    ) -> Result<StageOutcome, FlowError> {
        let address = self.customer.shipping_address.clone();

        // Street address first, with the autocomplete suggestion commit.
        match self.locator.find_field_now(FieldKind::AddressLine1, false).await? {
            MatchResult::Found { handle, .. } => {
                let outcome = self
                    .filler
                    .fill_with_suggestion(&handle, &address.address_line1, FieldKind::AddressLine1)
                    .await;
                if !outcome.success {
                    return Ok(StageOutcome::Failed(describe("address fill", &outcome)));
                }
            }
            MatchResult::NotFound => {
                // Nothing to fill: on a pure payment page the address
                // form is simply gone.
                if !has_card_fields(&observation.fields) {
                    return Ok(StageOutcome::Failed("address field not found".into()));
                }
            }
        }

        if let Some(line2) = address.address_line2.as_deref() {
            if let FillStatus::Failed(outcome) =
                self.fill_kind(FieldKind::AddressLine2, line2).await?
            {
                warn!(error = ?outcome.error, "address line 2 fill failed, continuing");
            }
        }

        for (kind, value) in [
            (FieldKind::City, address.city.as_str()),
            (FieldKind::PostalCode, address.postal_code.as_str()),
        ] {
            match self.fill_kind(kind, value).await? {
                FillStatus::Failed(outcome) => {
                    return Ok(StageOutcome::Failed(describe(kind.as_str(), &outcome)))
                }
                _ => {}
            }
        }

        for (kind, value) in [
            (FieldKind::Province, address.province.as_str()),
            (FieldKind::Country, address.country.as_str()),
        ] {
            if let Some(outcome) = self.fill_or_select(kind, value).await? {
                if !outcome.success {
                    return Ok(StageOutcome::Failed(describe(kind.as_str(), &outcome)));
                }
            }
        }

        if let Some(phone) = self.customer.contact.phone.clone() {
            if let FillStatus::Failed(outcome) = self.fill_kind(FieldKind::Phone, &phone).await? {
                warn!(error = ?outcome.error, "shipping phone fill failed, continuing");
            }
        }

        // Re-read everything once and patch whatever the page mangled.
        let verified = self.verify_address_pass().await?;
        if verified < self.cfg.min_address_fields {
            return Ok(StageOutcome::Failed(format!(
                "address verification confirmed only {verified} fields"
            )));
        }

        let shipping = self.filler.select_cheapest_shipping().await;
        if let Some(label) = &shipping.matched_text {
            info!(rate = %label, "shipping method selected");
        }

        match self.click_validated(CONTINUE_TO_PAYMENT_TERMS).await? {
            ClickValidation::Changed(text) => {
                info!(button = %text, "continued toward payment");
                Ok(StageOutcome::Progressed)
            }
            ClickValidation::NoChange(text) => Ok(StageOutcome::Failed(format!(
                "clicking {text:?} changed nothing"
            ))),
            ClickValidation::NotFound => {
                // Single-page checkouts render card fields alongside the
                // address; that already is the payment stage.
                if has_card_fields(&observation.fields) {
                    Ok(StageOutcome::Progressed)
                } else {
                    Ok(StageOutcome::Failed("payment continue button not found".into()))
                }
            }
        }
    }

    /// Cart page inside the loop: push through to checkout.
    pub(crate) async fn cart_stage(
        &self,
        _observation: &PageObservation,
    ) -> Result<StageOutcome, FlowError> {
        match self.click_validated(CHECKOUT_BUTTON_TERMS).await? {
            ClickValidation::Changed(text) => {
                info!(button = %text, "moved from cart to checkout");
                Ok(StageOutcome::Progressed)
            }
            ClickValidation::NoChange(text) => Ok(StageOutcome::Failed(format!(
                "clicking {text:?} changed nothing"
            ))),
            ClickValidation::NotFound => {
                Ok(StageOutcome::Failed("checkout button not found in cart".into()))
            }
        }
    }

    /// Fill "confirm your email/phone" duplicates with the value already
    /// entered in the primary field.
    async fn fill_confirm_duplicates(&self, email: &str) -> Result<(), FlowError> {
        let phone = self.customer.contact.phone.clone();
        let fields = self.probe.harvest_fields().await?;
        for info in &fields {
            if !info.visible || info.is_filled() || info.is_select() {
                continue;
            }
            let attrs = format!(
                "{} {} {} {} {}",
                info.id, info.name, info.label, info.placeholder, info.data_testid
            );
            if !cartflow_keywords::normalized_contains(&attrs, "confirm")
                && !cartflow_keywords::normalized_contains(&attrs, "reenter")
            {
                continue;
            }
            let (value, kind) = if cartflow_keywords::normalized_contains(&attrs, "email") {
                (email.to_string(), FieldKind::Email)
            } else if cartflow_keywords::normalized_contains(&attrs, "phone") {
                match &phone {
                    Some(p) => (p.clone(), FieldKind::Phone),
                    None => continue,
                }
            } else {
                continue;
            };
            let outcome = self.filler.fill(&info.handle, &value, kind).await;
            if outcome.success {
                debug!(field = %info.handle, "filled confirmation duplicate");
            }
        }
        Ok(())
    }

    /// Re-read the address form and re-apply any value the page dropped
    /// or reformatted. Returns how many fields verified.
    async fn verify_address_pass(&self) -> Result<u32, FlowError> {
        let address = self.customer.shipping_address.clone();
        let phone = self.customer.contact.phone.clone().unwrap_or_default();
        let expectations: Vec<(FieldKind, String)> = vec![
            (FieldKind::AddressLine1, address.address_line1),
            (FieldKind::City, address.city),
            (FieldKind::Province, address.province),
            (FieldKind::PostalCode, address.postal_code),
            (FieldKind::Country, address.country),
            (FieldKind::Phone, phone),
        ];

        let fields = self.probe.harvest_fields().await?;
        let mut verified = 0u32;
        for (kind, expected) in expectations {
            if expected.is_empty() {
                continue;
            }
            let MatchResult::Found { handle, .. } =
                element_locator::match_field(&fields, kind, true)
            else {
                continue;
            };
            let Ok(actual) = self.probe.read_value(&handle).await else {
                continue;
            };
            if field_filler::values_match(&expected, &actual, kind) {
                verified += 1;
                continue;
            }
            debug!(kind = %kind, %actual, "verification mismatch, re-applying");
            let outcome = match fields.iter().find(|f| f.handle == handle) {
                Some(info) if info.is_select() => {
                    self.filler.select_dropdown(&handle, &expected, kind).await
                }
                _ => self.filler.fill(&handle, &expected, kind).await,
            };
            if outcome.success {
                verified += 1;
            }
        }
        Ok(verified)
    }

    /// Fill a semantic slot if an unfilled field for it exists.
    pub(crate) async fn fill_kind(
        &self,
        kind: FieldKind,
        value: &str,
    ) -> Result<FillStatus, FlowError> {
        match self.locator.find_field_now(kind, false).await? {
            MatchResult::Found { handle, .. } => {
                let outcome = self.filler.fill(&handle, value, kind).await;
                if outcome.success {
                    Ok(FillStatus::Filled)
                } else {
                    Ok(FillStatus::Failed(outcome))
                }
            }
            MatchResult::NotFound => {
                // Either genuinely absent, or present and already holding
                // a value; both are fine to leave alone.
                match self.locator.find_field_now(kind, true).await? {
                    MatchResult::Found { .. } => Ok(FillStatus::AlreadyDone),
                    MatchResult::NotFound => Ok(FillStatus::Missing),
                }
            }
        }
    }

    /// Province/country slots may be a text input, a native select, or a
    /// custom dropdown; dispatch on what the page actually has. `None`
    /// means the slot does not exist on this form.
    async fn fill_or_select(
        &self,
        kind: FieldKind,
        value: &str,
    ) -> Result<Option<ActionOutcome>, FlowError> {
        let fields = self.probe.harvest_fields().await?;
        let MatchResult::Found { handle, .. } =
            element_locator::match_field(&fields, kind, true)
        else {
            return Ok(None);
        };
        let Some(info) = fields.iter().find(|f| f.handle == handle) else {
            return Ok(None);
        };
        if field_filler::values_match(value, &info.current_value, kind) {
            return Ok(Some(ActionOutcome::ok_with(info.current_value.clone())));
        }
        let outcome = if info.is_select() {
            self.filler.select_dropdown(&handle, value, kind).await
        } else {
            self.filler.fill(&handle, value, kind).await
        };
        Ok(Some(outcome))
    }

    /// Click a ladder-matched button and verify the page reacted: a URL
    /// change or a change in the visible control census counts, nothing
    /// else does.
    pub(crate) async fn click_validated(
        &self,
        terms: &[&str],
    ) -> Result<ClickValidation, FlowError> {
        let before_url = self.probe.current_url().await?;
        let before_census = self.probe.harvest_buttons().await?.len();

        let found = self.locator.find_button_now(terms).await?;
        let MatchResult::Found { handle, matched_text, .. } = found else {
            return Ok(ClickValidation::NotFound);
        };
        match self.probe.click(&handle).await {
            Ok(()) => {}
            Err(err) if err.is_stale() => return Ok(ClickValidation::NotFound),
            Err(err) => return Err(err.into()),
        }
        self.settle().await;

        let after_url = self.probe.current_url().await?;
        let after_census = self.probe.harvest_buttons().await?.len();
        if after_url != before_url || after_census != before_census {
            Ok(ClickValidation::Changed(matched_text))
        } else {
            Ok(ClickValidation::NoChange(matched_text))
        }
    }
}

#[derive(Debug)]
pub(crate) enum FillStatus {
    Filled,
    /// The slot exists but already holds a value.
    AlreadyDone,
    /// No field for this slot on the page.
    Missing,
    Failed(ActionOutcome),
}

fn describe(what: &str, outcome: &ActionOutcome) -> String {
    format!(
        "{what} failed: {}",
        outcome.error.as_deref().unwrap_or("unknown error")
    )
}
