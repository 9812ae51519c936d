//! In-memory page model implementing [`DomProbe`], used by unit and
//! integration tests instead of a live browser. A `FakeDom` holds a set
//! of pages keyed by URL; clicks can navigate between them, mutate the
//! current page, or do nothing, which is enough to script multi-step
//! checkout journeys.

use crate::{AdapterError, DomProbe, FillMode};
use async_trait::async_trait;
use cartflow_core_types::{ButtonInfo, ElementHandle, FieldInfo, RadioOption, SelectOption};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// What happens when a scripted button is clicked.
#[derive(Debug, Clone)]
pub enum ClickEffect {
    None,
    /// Navigate to another registered page.
    GoTo(String),
    /// Bump the cart badge on the current page.
    AddToCart,
    /// Reveal more buttons on the current page (drawer/mini-cart open).
    ShowButtons(Vec<FakeButton>),
    /// Clear the blocking overlay on the current page.
    DismissOverlay,
    /// Write a value into a field on the current page.
    SetFieldValue { handle: String, value: String },
    /// Remove the clicked button from the page (dismissed banner).
    RemoveSelf,
}

#[derive(Debug, Clone)]
pub struct FakeButton {
    pub info: ButtonInfo,
    pub effect: ClickEffect,
}

impl FakeButton {
    pub fn new(handle: &str, text: &str) -> Self {
        Self {
            info: ButtonInfo {
                handle: ElementHandle(handle.to_string()),
                tag: "button".to_string(),
                text: text.to_string(),
                visible: true,
                ..ButtonInfo::default()
            },
            effect: ClickEffect::None,
        }
    }

    pub fn with_effect(mut self, effect: ClickEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_classes(mut self, classes: &str) -> Self {
        self.info.classes = classes.to_string();
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.info.id = id.to_string();
        self
    }

    pub fn in_overlay(mut self) -> Self {
        self.info.in_overlay = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.info.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.info.visible = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeField {
    pub info: FieldInfo,
    /// Fill modes this field silently swallows, for exercising the
    /// fill cascade.
    pub rejects: Vec<FillMode>,
    /// Fill modes that error outright instead of being swallowed.
    pub errors: Vec<FillMode>,
    pub options: Vec<SelectOption>,
}

impl FakeField {
    pub fn new(handle: &str, name: &str) -> Self {
        Self {
            info: FieldInfo {
                handle: ElementHandle(handle.to_string()),
                tag: "input".to_string(),
                input_type: "text".to_string(),
                name: name.to_string(),
                visible: true,
                ..FieldInfo::default()
            },
            rejects: Vec::new(),
            errors: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn select(handle: &str, name: &str, options: Vec<(&str, &str)>) -> Self {
        let mut field = Self::new(handle, name);
        field.info.tag = "select".to_string();
        field.info.input_type = String::new();
        field.options = options
            .into_iter()
            .map(|(value, text)| SelectOption {
                value: value.to_string(),
                text: text.to_string(),
            })
            .collect();
        field
    }

    pub fn with_input_type(mut self, input_type: &str) -> Self {
        self.info.input_type = input_type.to_string();
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.info.id = id.to_string();
        self
    }

    pub fn with_autocomplete(mut self, token: &str) -> Self {
        self.info.autocomplete = token.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.info.label = label.to_string();
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.info.placeholder = placeholder.to_string();
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.info.current_value = value.to_string();
        self
    }

    pub fn rejecting(mut self, modes: &[FillMode]) -> Self {
        self.rejects = modes.to_vec();
        self
    }

    pub fn erroring(mut self, modes: &[FillMode]) -> Self {
        self.errors = modes.to_vec();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub body_text: String,
    pub buttons: Vec<FakeButton>,
    pub fields: Vec<FakeField>,
    pub radios: Vec<RadioOption>,
    pub cart_badge: Option<u32>,
    pub blocking_overlay: bool,
    pub overlay_nodes: u32,
    pub scroll_locked: bool,
    pub suggestion_open: bool,
    pub custom_options: Vec<String>,
}

impl FakePage {
    pub fn with_body(mut self, text: &str) -> Self {
        self.body_text = text.to_string();
        self
    }

    pub fn with_button(mut self, button: FakeButton) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn with_field(mut self, field: FakeField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_radio(mut self, handle: &str, label: &str, price_text: &str) -> Self {
        self.radios.push(RadioOption {
            handle: ElementHandle(handle.to_string()),
            label: label.to_string(),
            price_text: price_text.to_string(),
            checked: false,
        });
        self
    }

    pub fn with_overlay(mut self, nodes: u32) -> Self {
        self.blocking_overlay = true;
        self.overlay_nodes = nodes;
        self.scroll_locked = true;
        self
    }

    pub fn with_badge(mut self, count: u32) -> Self {
        self.cart_badge = Some(count);
        self
    }
}

struct FakeState {
    current_url: String,
    pages: HashMap<String, FakePage>,
    log: Vec<String>,
}

/// The fake browser. Cheap to clone handles around via `Arc`.
pub struct FakeDom {
    state: Mutex<FakeState>,
}

impl FakeDom {
    pub fn new(start_url: &str, start_page: FakePage) -> Self {
        let mut pages = HashMap::new();
        pages.insert(start_url.to_string(), start_page);
        Self {
            state: Mutex::new(FakeState {
                current_url: start_url.to_string(),
                pages,
                log: Vec::new(),
            }),
        }
    }

    pub fn add_page(&self, url: &str, page: FakePage) {
        if let Ok(mut state) = self.state.lock() {
            state.pages.insert(url.to_string(), page);
        }
    }

    /// Everything the probe was asked to do, in order.
    pub fn action_log(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    /// Current value of a field on the current page, for assertions.
    pub fn field_value(&self, handle: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        let page = state.pages.get(&state.current_url)?;
        page.fields
            .iter()
            .find(|f| f.info.handle.0 == handle)
            .map(|f| f.info.current_value.clone())
    }

    pub fn checked_radio(&self) -> Option<String> {
        let state = self.state.lock().ok()?;
        let page = state.pages.get(&state.current_url)?;
        page.radios
            .iter()
            .find(|r| r.checked)
            .map(|r| r.handle.0.clone())
    }

    fn locked(&self) -> Result<MutexGuard<'_, FakeState>, AdapterError> {
        self.state
            .lock()
            .map_err(|_| AdapterError::Protocol("fake dom lock poisoned".to_string()))
    }
}

fn loose_match(text: &str, wanted: &str) -> bool {
    let norm = |s: &str| {
        s.to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
    };
    let a = norm(text);
    let b = norm(wanted);
    !b.is_empty() && (a == b || a.contains(&b))
}

impl FakeState {
    fn page(&self) -> Result<&FakePage, AdapterError> {
        self.pages
            .get(&self.current_url)
            .ok_or_else(|| AdapterError::Navigation(format!("no page at {}", self.current_url)))
    }

    fn page_mut(&mut self) -> Result<&mut FakePage, AdapterError> {
        let url = self.current_url.clone();
        self.pages
            .get_mut(&url)
            .ok_or_else(|| AdapterError::Navigation(format!("no page at {url}")))
    }

    fn apply_effect(
        &mut self,
        handle: &ElementHandle,
        effect: ClickEffect,
    ) -> Result<(), AdapterError> {
        match effect {
            ClickEffect::None => Ok(()),
            ClickEffect::GoTo(url) => {
                if !self.pages.contains_key(&url) {
                    return Err(AdapterError::Navigation(format!("no page at {url}")));
                }
                self.current_url = url;
                Ok(())
            }
            ClickEffect::AddToCart => {
                let page = self.page_mut()?;
                page.cart_badge = Some(page.cart_badge.unwrap_or(0) + 1);
                Ok(())
            }
            ClickEffect::ShowButtons(buttons) => {
                self.page_mut()?.buttons.extend(buttons);
                Ok(())
            }
            ClickEffect::DismissOverlay => {
                let page = self.page_mut()?;
                page.blocking_overlay = false;
                page.overlay_nodes = 0;
                Ok(())
            }
            ClickEffect::SetFieldValue { handle, value } => {
                let page = self.page_mut()?;
                if let Some(field) = page.fields.iter_mut().find(|f| f.info.handle.0 == handle) {
                    field.info.current_value = value;
                }
                Ok(())
            }
            ClickEffect::RemoveSelf => {
                self.page_mut()?.buttons.retain(|b| b.info.handle != *handle);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DomProbe for FakeDom {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("navigate:{url}"));
        if !state.pages.contains_key(url) {
            return Err(AdapterError::Navigation(format!("no page at {url}")));
        }
        state.current_url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.locked()?.current_url.clone())
    }

    async fn body_text(&self) -> Result<String, AdapterError> {
        let state = self.locked()?;
        Ok(state.page()?.body_text.clone())
    }

    async fn harvest_buttons(&self) -> Result<Vec<ButtonInfo>, AdapterError> {
        let state = self.locked()?;
        Ok(state.page()?.buttons.iter().map(|b| b.info.clone()).collect())
    }

    async fn harvest_fields(&self) -> Result<Vec<FieldInfo>, AdapterError> {
        let state = self.locked()?;
        Ok(state.page()?.fields.iter().map(|f| f.info.clone()).collect())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("click:{handle}"));
        let effect = {
            let page = state.page()?;
            if let Some(button) = page.buttons.iter().find(|b| b.info.handle == *handle) {
                button.effect.clone()
            } else if page.radios.iter().any(|r| r.handle == *handle) {
                let page = state.page_mut()?;
                for radio in page.radios.iter_mut() {
                    radio.checked = radio.handle == *handle;
                }
                return Ok(());
            } else {
                return Err(AdapterError::NotFound(handle.clone()));
            }
        };
        state.apply_effect(handle, effect)
    }

    async fn fill_text(
        &self,
        handle: &ElementHandle,
        value: &str,
        mode: FillMode,
    ) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("fill:{handle}:{mode:?}"));
        let page = state.page_mut()?;
        let field = page
            .fields
            .iter_mut()
            .find(|f| f.info.handle == *handle)
            .ok_or_else(|| AdapterError::NotFound(handle.clone()))?;
        if field.errors.contains(&mode) {
            return Err(AdapterError::Script(format!("{mode:?} write blocked on {handle}")));
        }
        if !field.rejects.contains(&mode) {
            field.info.current_value = value.to_string();
        }
        Ok(())
    }

    async fn read_value(&self, handle: &ElementHandle) -> Result<String, AdapterError> {
        let state = self.locked()?;
        let page = state.page()?;
        page.fields
            .iter()
            .find(|f| f.info.handle == *handle)
            .map(|f| f.info.current_value.clone())
            .ok_or_else(|| AdapterError::Detached(handle.clone()))
    }

    async fn blur(&self, handle: &ElementHandle) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("blur:{handle}"));
        Ok(())
    }

    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, AdapterError> {
        let state = self.locked()?;
        let page = state.page()?;
        Ok(page.fields.iter().any(|f| f.info.handle == *handle)
            || page.buttons.iter().any(|b| b.info.handle == *handle))
    }

    async fn select_options(
        &self,
        handle: &ElementHandle,
    ) -> Result<Vec<SelectOption>, AdapterError> {
        let state = self.locked()?;
        let page = state.page()?;
        page.fields
            .iter()
            .find(|f| f.info.handle == *handle)
            .map(|f| f.options.clone())
            .ok_or_else(|| AdapterError::NotFound(handle.clone()))
    }

    async fn select_option(
        &self,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<bool, AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("select:{handle}:{value}"));
        let page = state.page_mut()?;
        let field = page
            .fields
            .iter_mut()
            .find(|f| f.info.handle == *handle)
            .ok_or_else(|| AdapterError::NotFound(handle.clone()))?;
        if field.options.iter().any(|o| o.value == value) {
            field.info.current_value = value.to_string();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn pick_visible_option(&self, text: &str) -> Result<bool, AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("pick_option:{text}"));
        let page = state.page()?;
        Ok(page.custom_options.iter().any(|o| loose_match(o, text)))
    }

    async fn click_first_suggestion(&self) -> Result<bool, AdapterError> {
        let mut state = self.locked()?;
        state.log.push("first_suggestion".to_string());
        Ok(state.page()?.suggestion_open)
    }

    async fn shipping_options(&self) -> Result<Vec<RadioOption>, AdapterError> {
        let state = self.locked()?;
        Ok(state.page()?.radios.clone())
    }

    async fn has_blocking_overlay(&self) -> Result<bool, AdapterError> {
        let state = self.locked()?;
        Ok(state.page()?.blocking_overlay)
    }

    async fn remove_overlay_nodes(&self) -> Result<u32, AdapterError> {
        let mut state = self.locked()?;
        state.log.push("remove_overlays".to_string());
        let page = state.page_mut()?;
        let removed = page.overlay_nodes;
        page.overlay_nodes = 0;
        page.blocking_overlay = false;
        Ok(removed)
    }

    async fn clear_scroll_locks(&self) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push("clear_scroll_locks".to_string());
        state.page_mut()?.scroll_locked = false;
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push("escape".to_string());
        Ok(())
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), AdapterError> {
        let mut state = self.locked()?;
        state.log.push(format!("scroll:{dy}"));
        Ok(())
    }

    async fn cart_badge_count(&self) -> Result<Option<u32>, AdapterError> {
        let state = self.locked()?;
        Ok(state.page()?.cart_badge)
    }

    async fn screenshot_jpeg(&self) -> Result<Vec<u8>, AdapterError> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn click_navigates_between_pages() {
        let dom = FakeDom::new(
            "https://shop.test/p/1",
            FakePage::default().with_button(
                FakeButton::new("go", "Checkout")
                    .with_effect(ClickEffect::GoTo("https://shop.test/checkout".into())),
            ),
        );
        dom.add_page("https://shop.test/checkout", FakePage::default());

        dom.click(&ElementHandle("go".into())).await.expect("click");
        assert_eq!(
            dom.current_url().await.expect("url"),
            "https://shop.test/checkout"
        );
    }

    #[tokio::test]
    async fn fill_respects_rejected_modes() {
        let dom = FakeDom::new(
            "u",
            FakePage::default()
                .with_field(FakeField::new("f1", "email").rejecting(&[FillMode::Type])),
        );
        let handle = ElementHandle("f1".into());
        dom.fill_text(&handle, "a@b.c", FillMode::Type).await.expect("fill");
        assert_eq!(dom.read_value(&handle).await.expect("read"), "");
        dom.fill_text(&handle, "a@b.c", FillMode::Force).await.expect("fill");
        assert_eq!(dom.read_value(&handle).await.expect("read"), "a@b.c");
    }

    #[tokio::test]
    async fn clicked_button_can_remove_itself() {
        let dom = FakeDom::new(
            "u",
            FakePage::default().with_button(
                FakeButton::new("banner", "Got it").with_effect(ClickEffect::RemoveSelf),
            ),
        );
        let handle = ElementHandle("banner".into());
        dom.click(&handle).await.expect("click");
        assert!(dom.harvest_buttons().await.expect("harvest").is_empty());
        assert!(matches!(
            dom.click(&handle).await,
            Err(AdapterError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn overlay_removal_is_idempotent() {
        let dom = FakeDom::new("u", FakePage::default().with_overlay(2));
        assert_eq!(dom.remove_overlay_nodes().await.expect("sweep"), 2);
        assert_eq!(dom.remove_overlay_nodes().await.expect("sweep"), 0);
        assert!(!dom.has_blocking_overlay().await.expect("check"));
    }
}
