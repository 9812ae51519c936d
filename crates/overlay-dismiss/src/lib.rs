//! Popup dismissal: an ordered sweep that clears cookie walls, modal
//! close buttons, stray overlay nodes, and leftover scroll locks. The
//! sweep only removes things; on a clean page it is a no-op, so calling
//! it repeatedly is always safe.

use cartflow_core_types::ButtonInfo;
use cartflow_keywords::{
    normalize, normalized_contains, CLOSE_CONTROL_TERMS, COOKIE_ACCEPT_TERMS,
    PRIMARY_ACTION_TERMS,
};
use page_adapter::{AdapterError, DomProbe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DismissError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

pub struct Dismisser {
    probe: Arc<dyn DomProbe>,
}

/// Would clicking this control accept a cookie/consent banner? Requires
/// both an acceptance term and banner context so an "Accept" button in
/// page content is left alone.
fn is_cookie_accept(info: &ButtonInfo) -> bool {
    if !info.visible {
        return false;
    }
    let text = normalize(&info.text);
    let aria = normalize(&info.aria_label);
    let hit = COOKIE_ACCEPT_TERMS
        .iter()
        .any(|term| text == *term || aria == *term || text.starts_with(term));
    if !hit {
        return false;
    }
    let context = format!("{} {}", info.classes, info.id);
    info.in_overlay
        || normalized_contains(&context, "cookie")
        || normalized_contains(&context, "consent")
        || normalized_contains(&context, "gdpr")
        || normalized_contains(&context, "banner")
}

/// Would clicking this control close a popup? Primary actions are never
/// eligible, whatever their class names say.
fn is_close_control(info: &ButtonInfo) -> bool {
    if !info.visible {
        return false;
    }
    let haystack = format!(
        "{} {} {}",
        info.text, info.aria_label, info.classes
    );
    if PRIMARY_ACTION_TERMS
        .iter()
        .any(|term| normalized_contains(&haystack, term))
    {
        return false;
    }
    let text = normalize(&info.text);
    let aria = normalize(&info.aria_label);
    if CLOSE_CONTROL_TERMS
        .iter()
        .any(|term| text == normalize(term) || aria == normalize(term))
    {
        return true;
    }
    let structure = format!("{} {}", info.classes, info.id);
    (normalized_contains(&structure, "close") || normalized_contains(&structure, "dismiss"))
        && info.in_overlay
}

impl Dismisser {
    pub fn new(probe: Arc<dyn DomProbe>) -> Self {
        Self { probe }
    }

    /// Run the full sweep and return how many things were dismissed.
    pub async fn dismiss(&self) -> Result<u32, DismissError> {
        let mut dismissed = 0u32;

        // Cookie banners first: accepting one often unblocks the page in
        // a single click.
        let buttons = self.probe.harvest_buttons().await?;
        for info in buttons.iter().filter(|b| is_cookie_accept(b)) {
            if self.click_ignoring_stale(info).await? {
                debug!(text = %info.text, "accepted consent banner");
                dismissed += 1;
            }
        }

        // Close controls, against a fresh harvest since the banner click
        // may have rewritten the page.
        let buttons = self.probe.harvest_buttons().await?;
        for info in buttons.iter().filter(|b| is_close_control(b)) {
            if self.click_ignoring_stale(info).await? {
                debug!(text = %info.text, classes = %info.classes, "clicked close control");
                dismissed += 1;
            }
        }

        // Whatever survived gets removed forcibly.
        dismissed += self.probe.remove_overlay_nodes().await?;

        self.probe.press_escape().await?;
        self.probe.press_escape().await?;
        self.probe.clear_scroll_locks().await?;

        if dismissed > 0 {
            info!(dismissed, "popup sweep cleared obstructions");
        }
        Ok(dismissed)
    }

    /// Earlier clicks in a sweep routinely detach later candidates; a
    /// stale handle here just means the popup is already gone.
    async fn click_ignoring_stale(&self, info: &ButtonInfo) -> Result<bool, DismissError> {
        match self.probe.click(&info.handle).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_stale() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
