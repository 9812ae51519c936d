//! Product stage: variants, quantity, add to cart, and the badge check
//! that proves the cart actually changed.

use crate::{CheckoutController, FlowError};
use cartflow_core_types::{FieldKind, MatchResult, Task};
use cartflow_keywords::ADD_TO_CART_TERMS;
use tracing::{debug, info, warn};

impl CheckoutController {
    /// Set up one product: open its page, pick the requested variants,
    /// adjust the quantity, and add it to the cart.
    pub(crate) async fn run_product_task(&self, task: &Task) -> Result<(), FlowError> {
        let badge_before = {
            self.probe
                .navigate(&task.url)
                .await
                .map_err(|err| FlowError::Navigation(format!("{}: {err}", task.url)))?;
            self.settle().await;
            let cleared = self.dismisser.dismiss().await?;
            if cleared > 0 {
                debug!(cleared, "dismissed obstructions on product page");
                self.settle().await;
            }
            self.probe.cart_badge_count().await.ok().flatten()
        };

        // Variants are picked by their value text ("Blue", "Medium");
        // each requested option must land or the wrong item ships.
        for (option, value) in &task.selected_variant {
            match self.locator.find_button(&[value.as_str()]).await? {
                MatchResult::Found { handle, matched_text, .. } => {
                    self.probe
                        .click(&handle)
                        .await
                        .map_err(|err| FlowError::ProductSetup(format!(
                            "could not select {option} {value:?}: {err}"
                        )))?;
                    info!(%option, variant = %matched_text, "variant selected");
                    self.settle().await;
                }
                MatchResult::NotFound => {
                    return Err(FlowError::ProductSetup(format!(
                        "no control found for {option} {value:?}"
                    )));
                }
            }
        }

        if task.quantity > 1 {
            self.set_quantity(task.quantity).await?;
        }

        // Add to cart, then confirm via the badge when the site has one.
        // A badge that did not move gets exactly one more click.
        self.click_add_to_cart().await?;
        if let Ok(Some(after)) = self.probe.cart_badge_count().await {
            let before = badge_before.unwrap_or(0);
            if after <= before {
                warn!(before, after, "cart badge did not grow, clicking again");
                self.settle().await;
                self.click_add_to_cart().await?;
            }
        }
        self.settle().await;
        Ok(())
    }

    async fn set_quantity(&self, quantity: u32) -> Result<(), FlowError> {
        match self.locator.find_field_now(FieldKind::Quantity, true).await? {
            MatchResult::Found { handle, .. } => {
                let outcome = self
                    .filler
                    .fill(&handle, &quantity.to_string(), FieldKind::Quantity)
                    .await;
                if !outcome.success {
                    warn!(error = ?outcome.error, "quantity fill failed, keeping 1");
                }
            }
            MatchResult::NotFound => {
                debug!(quantity, "no quantity field on product page");
            }
        }
        Ok(())
    }

    async fn click_add_to_cart(&self) -> Result<(), FlowError> {
        match self.locator.find_button(ADD_TO_CART_TERMS).await? {
            MatchResult::Found { handle, matched_text, .. } => {
                self.probe.click(&handle).await.map_err(|err| {
                    FlowError::ProductSetup(format!("add to cart click failed: {err}"))
                })?;
                info!(button = %matched_text, "added to cart");
                self.settle().await;
                Ok(())
            }
            MatchResult::NotFound => Err(FlowError::ProductSetup(
                "no add-to-cart button found".into(),
            )),
        }
    }
}
