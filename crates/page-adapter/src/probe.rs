use crate::AdapterError;
use async_trait::async_trait;
use cartflow_core_types::{ButtonInfo, ElementHandle, FieldInfo, RadioOption, SelectOption};
use serde::{Deserialize, Serialize};

/// How a text value is written into a field. The filler escalates through
/// these in order when verification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Character-by-character keyboard input; fires the full key event
    /// stream and any site-side masking/validation.
    Type,
    /// Direct value assignment through the native setter plus synthetic
    /// input/change events.
    Force,
    /// Value assignment plus the wider event volley (keydown included)
    /// for frameworks that ignore plain input events.
    Inject,
}

/// Semantic capability surface over one live page.
///
/// Handles returned by the harvest methods refer to marker attributes
/// stamped onto the elements during that harvest; they stay valid until
/// the page mutates or navigates and must not be cached across actions.
#[async_trait]
pub trait DomProbe: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    /// Visible body text, truncated. Used for page-state classification
    /// only, never for element matching.
    async fn body_text(&self) -> Result<String, AdapterError>;

    /// Tag and describe every clickable control on the page.
    async fn harvest_buttons(&self) -> Result<Vec<ButtonInfo>, AdapterError>;

    /// Tag and describe every form field (inputs, selects, textareas).
    async fn harvest_fields(&self) -> Result<Vec<FieldInfo>, AdapterError>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), AdapterError>;

    async fn fill_text(
        &self,
        handle: &ElementHandle,
        value: &str,
        mode: FillMode,
    ) -> Result<(), AdapterError>;

    async fn read_value(&self, handle: &ElementHandle) -> Result<String, AdapterError>;

    async fn blur(&self, handle: &ElementHandle) -> Result<(), AdapterError>;

    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, AdapterError>;

    /// Options of a native select, in document order.
    async fn select_options(&self, handle: &ElementHandle) -> Result<Vec<SelectOption>, AdapterError>;

    /// Set a native select to the option with exactly this `value`
    /// attribute. Returns false when the select rejected it.
    async fn select_option(&self, handle: &ElementHandle, value: &str)
        -> Result<bool, AdapterError>;

    /// Custom (non-`<select>`) dropdown fallback: click whichever visible
    /// option-like node matches the text. Returns false when none did.
    async fn pick_visible_option(&self, text: &str) -> Result<bool, AdapterError>;

    /// Click the first entry of an open autocomplete suggestion list, if
    /// one is showing.
    async fn click_first_suggestion(&self) -> Result<bool, AdapterError>;

    /// Radio choices that look like shipping/delivery rates.
    async fn shipping_options(&self) -> Result<Vec<RadioOption>, AdapterError>;

    /// True when a high-z-index element is covering enough of the
    /// viewport to block interaction.
    async fn has_blocking_overlay(&self) -> Result<bool, AdapterError>;

    /// Forcibly delete overlay/backdrop nodes. Returns how many were
    /// removed; zero on an already-clean page.
    async fn remove_overlay_nodes(&self) -> Result<u32, AdapterError>;

    /// Undo body scroll locks left behind by dismissed modals.
    async fn clear_scroll_locks(&self) -> Result<(), AdapterError>;

    async fn press_escape(&self) -> Result<(), AdapterError>;

    async fn scroll_by(&self, dy: i64) -> Result<(), AdapterError>;

    /// Numeric cart badge, when the page renders one.
    async fn cart_badge_count(&self) -> Result<Option<u32>, AdapterError>;

    async fn screenshot_jpeg(&self) -> Result<Vec<u8>, AdapterError>;
}
