//! Page perception: one harvest pass bundled into a [`PageObservation`]
//! plus a pure classifier that names where in the purchase journey the
//! page sits.

mod classify;

pub use classify::{classify, has_card_fields, PageState};

use cartflow_core_types::{ButtonInfo, FieldInfo};
use page_adapter::{AdapterError, DomProbe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Everything the flow controller knows about the current page. Built
/// fresh every loop iteration; never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageObservation {
    pub url: String,
    pub body_excerpt: String,
    pub buttons: Vec<ButtonInfo>,
    pub fields: Vec<FieldInfo>,
    /// Independent of `state`: an overlay can block any page state.
    pub has_blocking_overlay: bool,
    pub state: PageState,
}

#[derive(Debug, Error)]
pub enum PerceiverError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

pub struct Perceiver {
    probe: Arc<dyn DomProbe>,
}

impl Perceiver {
    pub fn new(probe: Arc<dyn DomProbe>) -> Self {
        Self { probe }
    }

    pub async fn observe(&self) -> Result<PageObservation, PerceiverError> {
        let url = self.probe.current_url().await?;
        let body_excerpt = self.probe.body_text().await?;
        let buttons = self.probe.harvest_buttons().await?;
        let fields = self.probe.harvest_fields().await?;
        let has_blocking_overlay = self.probe.has_blocking_overlay().await?;
        let state = classify(&url, &body_excerpt, &buttons, &fields);
        debug!(%url, state = state.as_str(), overlay = has_blocking_overlay, "observed page");
        Ok(PageObservation {
            url,
            body_excerpt,
            buttons,
            fields,
            has_blocking_overlay,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::fake::{FakeButton, FakeDom, FakeField, FakePage};

    #[tokio::test]
    async fn observation_reflects_page_and_overlay() {
        let dom = Arc::new(FakeDom::new(
            "https://shop.test/product/1",
            FakePage::default()
                .with_body("A very nice widget")
                .with_button(FakeButton::new("atc", "Add to Cart"))
                .with_field(FakeField::new("qty", "quantity"))
                .with_overlay(1),
        ));
        let perceiver = Perceiver::new(dom);
        let obs = perceiver.observe().await.expect("observe");
        assert_eq!(obs.state, PageState::Product);
        assert!(obs.has_blocking_overlay);
        assert_eq!(obs.buttons.len(), 1);
        assert_eq!(obs.fields.len(), 1);
    }
}
