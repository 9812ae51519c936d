//! DevTools-protocol implementation of [`DomProbe`]. All DOM inspection
//! goes through `Runtime.evaluate` with the snippets in [`crate::js`];
//! only keyboard input and screenshots use typed CDP commands.

use crate::{js, AdapterError, DomProbe, FillMode};
use async_trait::async_trait;
use cartflow_core_types::{ButtonInfo, ElementHandle, FieldInfo, RadioOption, SelectOption};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

pub struct CdpProbe {
    page: Page,
}

impl CdpProbe {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, AdapterError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| AdapterError::Script(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| AdapterError::Script(e.to_string()))
    }

    /// Run an element-addressed script that returns `true` when the
    /// marker resolved, mapping `false` to `NotFound`.
    async fn eval_on_element(
        &self,
        handle: &ElementHandle,
        script: String,
    ) -> Result<(), AdapterError> {
        let found: bool = self.eval(script).await?;
        if found {
            Ok(())
        } else {
            Err(AdapterError::NotFound(handle.clone()))
        }
    }

    async fn dispatch_key(
        &self,
        kind: DispatchKeyEventType,
        key: Option<&str>,
        text: Option<&str>,
    ) -> Result<(), AdapterError> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind);
        if let Some(key) = key {
            builder = builder.key(key);
        }
        if let Some(text) = text {
            builder = builder.text(text);
        }
        let params = builder.build().map_err(AdapterError::Protocol)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| AdapterError::Protocol(e.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), AdapterError> {
        for ch in text.chars() {
            self.dispatch_key(DispatchKeyEventType::Char, None, Some(&ch.to_string()))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DomProbe for CdpProbe {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| AdapterError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| AdapterError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        self.page
            .url()
            .await
            .map_err(|e| AdapterError::Protocol(e.to_string()))?
            .ok_or_else(|| AdapterError::Protocol("page reported no url".to_string()))
    }

    async fn body_text(&self) -> Result<String, AdapterError> {
        self.eval(js::BODY_TEXT.to_string()).await
    }

    async fn harvest_buttons(&self) -> Result<Vec<ButtonInfo>, AdapterError> {
        let buttons: Vec<ButtonInfo> = self.eval(js::HARVEST_BUTTONS.to_string()).await?;
        trace!(count = buttons.len(), "harvested buttons");
        Ok(buttons)
    }

    async fn harvest_fields(&self) -> Result<Vec<FieldInfo>, AdapterError> {
        let fields: Vec<FieldInfo> = self.eval(js::HARVEST_FIELDS.to_string()).await?;
        trace!(count = fields.len(), "harvested fields");
        Ok(fields)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AdapterError> {
        self.eval_on_element(handle, js::click(&handle.0)).await
    }

    async fn fill_text(
        &self,
        handle: &ElementHandle,
        value: &str,
        mode: FillMode,
    ) -> Result<(), AdapterError> {
        match mode {
            FillMode::Type => {
                self.eval_on_element(handle, js::focus_and_clear(&handle.0))
                    .await?;
                self.type_text(value).await?;
                self.eval_on_element(handle, js::dispatch_input_events(&handle.0))
                    .await
            }
            FillMode::Force => {
                self.eval_on_element(handle, js::set_value(&handle.0, value, false))
                    .await
            }
            FillMode::Inject => {
                self.eval_on_element(handle, js::set_value(&handle.0, value, true))
                    .await
            }
        }
    }

    async fn read_value(&self, handle: &ElementHandle) -> Result<String, AdapterError> {
        let value: Option<String> = self.eval(js::read_value(&handle.0)).await?;
        value.ok_or_else(|| AdapterError::Detached(handle.clone()))
    }

    async fn blur(&self, handle: &ElementHandle) -> Result<(), AdapterError> {
        self.eval_on_element(handle, js::blur(&handle.0)).await
    }

    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, AdapterError> {
        self.eval(js::is_attached(&handle.0)).await
    }

    async fn select_options(
        &self,
        handle: &ElementHandle,
    ) -> Result<Vec<SelectOption>, AdapterError> {
        self.eval(js::select_options(&handle.0)).await
    }

    async fn select_option(
        &self,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<bool, AdapterError> {
        self.eval(js::select_option(&handle.0, value)).await
    }

    async fn pick_visible_option(&self, text: &str) -> Result<bool, AdapterError> {
        self.eval(js::pick_visible_option(text)).await
    }

    async fn click_first_suggestion(&self) -> Result<bool, AdapterError> {
        self.eval(js::CLICK_FIRST_SUGGESTION.to_string()).await
    }

    async fn shipping_options(&self) -> Result<Vec<RadioOption>, AdapterError> {
        self.eval(js::SHIPPING_OPTIONS.to_string()).await
    }

    async fn has_blocking_overlay(&self) -> Result<bool, AdapterError> {
        self.eval(js::HAS_BLOCKING_OVERLAY.to_string()).await
    }

    async fn remove_overlay_nodes(&self) -> Result<u32, AdapterError> {
        let removed: u32 = self.eval(js::REMOVE_OVERLAY_NODES.to_string()).await?;
        if removed > 0 {
            debug!(removed, "removed overlay nodes");
        }
        Ok(removed)
    }

    async fn clear_scroll_locks(&self) -> Result<(), AdapterError> {
        let _: bool = self.eval(js::CLEAR_SCROLL_LOCKS.to_string()).await?;
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), AdapterError> {
        self.dispatch_key(DispatchKeyEventType::KeyDown, Some("Escape"), None)
            .await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, Some("Escape"), None)
            .await
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), AdapterError> {
        let _: bool = self.eval(js::scroll_by(dy)).await?;
        Ok(())
    }

    async fn cart_badge_count(&self) -> Result<Option<u32>, AdapterError> {
        self.eval(js::CART_BADGE_COUNT.to_string()).await
    }

    async fn screenshot_jpeg(&self) -> Result<Vec<u8>, AdapterError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(60)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| AdapterError::Protocol(e.to_string()))
    }
}
