//! Getting from "item in cart" to the checkout form. Sites disagree on
//! how this works, so strategies are tried in order of directness.

use crate::stages::ClickValidation;
use crate::{CheckoutController, FlowError};
use cartflow_keywords::{CART_URL_PATHS, CHECKOUT_BUTTON_TERMS, VIEW_CART_TERMS};
use tracing::{debug, info, warn};
use url::Url;

impl CheckoutController {
    /// Drive the browser onto a checkout page. Strategies, in order:
    /// a visible checkout button (mini-cart drawers included), opening
    /// the cart first and checking out from there, and finally walking
    /// the well-known cart URL paths directly.
    pub(crate) async fn reach_checkout(&self) -> Result<(), FlowError> {
        let cleared = self.dismisser.dismiss().await?;
        if cleared > 0 {
            self.settle().await;
        }

        // Many sites pop a mini-cart drawer right after add-to-cart with
        // a checkout button already in it.
        if let ClickValidation::Changed(text) =
            self.click_validated(CHECKOUT_BUTTON_TERMS).await?
        {
            if self.confirm_checkout_reached().await? {
                info!(button = %text, "reached checkout directly");
                return Ok(());
            }
        }

        // Open the cart, then check out from the cart page.
        if let ClickValidation::Changed(text) = self.click_validated(VIEW_CART_TERMS).await? {
            debug!(button = %text, "opened cart");
            if let ClickValidation::Changed(checkout) =
                self.click_validated(CHECKOUT_BUTTON_TERMS).await?
            {
                if self.confirm_checkout_reached().await? {
                    info!(button = %checkout, "reached checkout via cart page");
                    return Ok(());
                }
            }
        }

        // Last resort: navigate to the cart by URL and try the button
        // once more from there.
        if self.navigate_to_cart().await? {
            if let ClickValidation::Changed(text) =
                self.click_validated(CHECKOUT_BUTTON_TERMS).await?
            {
                if self.confirm_checkout_reached().await? {
                    info!(button = %text, "reached checkout via direct cart url");
                    return Ok(());
                }
            }
        }

        Err(FlowError::Navigation("could not reach checkout".into()))
    }

    /// Did the last click actually land us on a checkout page?
    async fn confirm_checkout_reached(&self) -> Result<bool, FlowError> {
        let observation = self.perceiver.observe().await?;
        Ok(observation.state.is_checkout())
    }

    /// Walk the conventional cart paths on the current origin until one
    /// renders a cart page.
    async fn navigate_to_cart(&self) -> Result<bool, FlowError> {
        let current = self.probe.current_url().await?;
        let Ok(base) = Url::parse(&current) else {
            return Ok(false);
        };
        for path in CART_URL_PATHS {
            let Ok(target) = base.join(path) else {
                continue;
            };
            if self.probe.navigate(target.as_str()).await.is_err() {
                warn!(url = %target, "cart path navigation failed");
                continue;
            }
            self.settle().await;
            let observation = self.perceiver.observe().await?;
            if matches!(
                observation.state,
                page_perceiver::PageState::Cart
            ) || observation.state.is_checkout()
            {
                debug!(url = %observation.url, "direct cart navigation landed");
                return Ok(true);
            }
        }
        Ok(false)
    }
}
