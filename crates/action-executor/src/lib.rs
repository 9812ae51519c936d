//! Action executor: the single gateway through which externally supplied
//! plans (recovery plans in particular) touch the page. Every operation
//! is named, parameters are plain JSON, and `{{customer.…}}` placeholders
//! are substituted here so raw profile data never travels through a plan.

mod substitute;

pub use substitute::substitute_placeholders;

use cartflow_core_types::{ActionOutcome, Customer, FieldKind, MatchResult};
use element_locator::Locator;
use field_filler::Filler;
use overlay_dismiss::Dismisser;
use page_adapter::DomProbe;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_WAIT_MS: u64 = 10_000;
const DEFAULT_SCROLL: i64 = 600;

/// The closed set of operations a plan may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    PressKey,
    ClickElement,
    FillField,
    SelectDropdown,
    SelectShippingMethod,
    Wait,
    Scroll,
    Screenshot,
    DismissPopups,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::PressKey => "press_key",
            ToolName::ClickElement => "click_element",
            ToolName::FillField => "fill_field",
            ToolName::SelectDropdown => "select_dropdown",
            ToolName::SelectShippingMethod => "select_shipping_method",
            ToolName::Wait => "wait",
            ToolName::Scroll => "scroll",
            ToolName::Screenshot => "screenshot",
            ToolName::DismissPopups => "dismiss_popups",
        }
    }
}

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "press_key" => Ok(ToolName::PressKey),
            "click_element" => Ok(ToolName::ClickElement),
            "fill_field" => Ok(ToolName::FillField),
            "select_dropdown" => Ok(ToolName::SelectDropdown),
            "select_shipping_method" => Ok(ToolName::SelectShippingMethod),
            "wait" => Ok(ToolName::Wait),
            "scroll" => Ok(ToolName::Scroll),
            "screenshot" => Ok(ToolName::Screenshot),
            "dismiss_popups" => Ok(ToolName::DismissPopups),
            other => Err(UnknownTool(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

/// One requested operation: a tool plus its JSON parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: ToolName,
    #[serde(default)]
    pub params: Value,
}

pub struct Executor {
    probe: Arc<dyn DomProbe>,
    locator: Arc<Locator>,
    filler: Arc<Filler>,
    dismisser: Arc<Dismisser>,
    customer: Customer,
    artifacts_dir: Option<PathBuf>,
}

impl Executor {
    pub fn new(
        probe: Arc<dyn DomProbe>,
        locator: Arc<Locator>,
        filler: Arc<Filler>,
        dismisser: Arc<Dismisser>,
        customer: Customer,
        artifacts_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            probe,
            locator,
            filler,
            dismisser,
            customer,
            artifacts_dir,
        }
    }

    /// Execute one call. Failures come back as outcomes; the only panics
    /// here would be bugs.
    pub async fn execute(&self, call: &ToolCall) -> ActionOutcome {
        let params = match substitute_placeholders(&call.params, &self.customer) {
            Ok(params) => params,
            Err(err) => return ActionOutcome::fail(err),
        };
        debug!(tool = call.tool.as_str(), "executing tool call");
        match call.tool {
            ToolName::PressKey => self.press_key(&params).await,
            ToolName::ClickElement => self.click_element(&params).await,
            ToolName::FillField => self.fill_field(&params).await,
            ToolName::SelectDropdown => self.select_dropdown(&params).await,
            ToolName::SelectShippingMethod => self.filler.select_cheapest_shipping().await,
            ToolName::Wait => self.wait(&params).await,
            ToolName::Scroll => self.scroll(&params).await,
            ToolName::Screenshot => self.screenshot().await,
            ToolName::DismissPopups => match self.dismisser.dismiss().await {
                Ok(count) => ActionOutcome::ok_with(count.to_string()),
                Err(err) => ActionOutcome::fail(err.to_string()),
            },
        }
    }

    async fn press_key(&self, params: &Value) -> ActionOutcome {
        let key = params.get("key").and_then(Value::as_str).unwrap_or("Escape");
        if key.eq_ignore_ascii_case("escape") || key.eq_ignore_ascii_case("esc") {
            match self.probe.press_escape().await {
                Ok(()) => ActionOutcome::ok(),
                Err(err) => ActionOutcome::fail(err.to_string()),
            }
        } else {
            ActionOutcome::fail(format!("unsupported key: {key}"))
        }
    }

    async fn click_element(&self, params: &Value) -> ActionOutcome {
        let keywords = extract_keywords(params);
        if keywords.is_empty() {
            return ActionOutcome::fail("click_element needs `text` or `keywords`");
        }
        let refs: Vec<&str> = keywords.iter().map(String::as_str).collect();
        let found = match self.locator.find_button(&refs).await {
            Ok(result) => result,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };
        match found {
            MatchResult::Found { handle, matched_text, .. } => {
                match self.probe.click(&handle).await {
                    Ok(()) => {
                        info!(%matched_text, "clicked element");
                        ActionOutcome::ok_with(matched_text)
                    }
                    Err(err) => ActionOutcome::fail_on(err.to_string(), matched_text),
                }
            }
            MatchResult::NotFound => {
                ActionOutcome::fail(format!("no element matched {keywords:?}"))
            }
        }
    }

    async fn fill_field(&self, params: &Value) -> ActionOutcome {
        let (kind, value) = match field_params(params) {
            Ok(pair) => pair,
            Err(err) => return ActionOutcome::fail(err),
        };
        let found = match self.locator.find_field(kind, false).await {
            Ok(result) => result,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };
        match found {
            MatchResult::Found { handle, .. } => {
                if kind == FieldKind::AddressLine1 {
                    self.filler.fill_with_suggestion(&handle, &value, kind).await
                } else {
                    self.filler.fill(&handle, &value, kind).await
                }
            }
            MatchResult::NotFound => {
                ActionOutcome::fail(format!("no field matched kind {kind}"))
            }
        }
    }

    async fn select_dropdown(&self, params: &Value) -> ActionOutcome {
        let (kind, value) = match field_params(params) {
            Ok(pair) => pair,
            Err(err) => return ActionOutcome::fail(err),
        };
        // Selects usually carry a default value, so filled fields stay
        // eligible here.
        let found = match self.locator.find_field(kind, true).await {
            Ok(result) => result,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };
        match found {
            MatchResult::Found { handle, .. } => {
                self.filler.select_dropdown(&handle, &value, kind).await
            }
            MatchResult::NotFound => {
                ActionOutcome::fail(format!("no dropdown matched kind {kind}"))
            }
        }
    }

    async fn wait(&self, params: &Value) -> ActionOutcome {
        let ms = params
            .get("ms")
            .and_then(Value::as_u64)
            .unwrap_or(1_000)
            .min(MAX_WAIT_MS);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        ActionOutcome::ok()
    }

    async fn scroll(&self, params: &Value) -> ActionOutcome {
        let dy = params.get("dy").and_then(Value::as_i64).unwrap_or(DEFAULT_SCROLL);
        match self.probe.scroll_by(dy).await {
            Ok(()) => ActionOutcome::ok(),
            Err(err) => ActionOutcome::fail(err.to_string()),
        }
    }

    async fn screenshot(&self) -> ActionOutcome {
        let bytes = match self.probe.screenshot_jpeg().await {
            Ok(bytes) => bytes,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };
        let Some(dir) = &self.artifacts_dir else {
            return ActionOutcome::ok_with(format!("{} bytes (not persisted)", bytes.len()));
        };
        let name = format!("page-{}.jpg", chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f"));
        let path = dir.join(name);
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => ActionOutcome::ok_with(path.display().to_string()),
            Err(err) => {
                warn!(error = %err, "could not persist screenshot");
                ActionOutcome::fail(err.to_string())
            }
        }
    }
}

fn extract_keywords(params: &Value) -> Vec<String> {
    if let Some(list) = params.get("keywords").and_then(Value::as_array) {
        return list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    params
        .get("text")
        .and_then(Value::as_str)
        .map(|t| vec![t.to_string()])
        .unwrap_or_default()
}

fn field_params(params: &Value) -> Result<(FieldKind, String), String> {
    let kind_token = params
        .get("field_type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing `field_type`".to_string())?;
    let kind = kind_token
        .parse::<FieldKind>()
        .map_err(|err| err.to_string())?;
    let value = params
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing `value`".to_string())?
        .to_string();
    Ok((kind, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflow_core_types::{Contact, RetryPolicy, ShippingAddress};
    use page_adapter::fake::{FakeButton, FakeDom, FakeField, FakePage};
    use serde_json::json;

    fn customer() -> Customer {
        Customer {
            contact: Contact {
                email: "jo@example.com".into(),
                first_name: "Jo".into(),
                last_name: "Doe".into(),
                phone: None,
            },
            shipping_address: ShippingAddress {
                address_line1: "1 Main St".into(),
                address_line2: None,
                city: "Austin".into(),
                province: "Texas".into(),
                postal_code: "78701".into(),
                country: "United States".into(),
            },
        }
    }

    fn executor_for(dom: Arc<FakeDom>) -> Executor {
        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1.0,
            cap_ms: 0,
        };
        Executor::new(
            dom.clone(),
            Arc::new(Locator::new(dom.clone(), retry)),
            Arc::new(Filler::new(dom.clone(), retry)),
            Arc::new(Dismisser::new(dom)),
            customer(),
            None,
        )
    }

    #[tokio::test]
    async fn fill_field_resolves_placeholder_and_kind() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_field(FakeField::new("em", "email")),
        ));
        let executor = executor_for(dom.clone());
        let outcome = executor
            .execute(&ToolCall {
                tool: ToolName::FillField,
                params: json!({"field_type": "email", "value": "{{customer.contact.email}}"}),
            })
            .await;
        assert!(outcome.success, "outcome: {outcome:?}");
        assert_eq!(dom.field_value("em").as_deref(), Some("jo@example.com"));
    }

    #[tokio::test]
    async fn click_element_reports_matched_text() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_button(FakeButton::new("go", "Proceed to Checkout")),
        ));
        let executor = executor_for(dom);
        let outcome = executor
            .execute(&ToolCall {
                tool: ToolName::ClickElement,
                params: json!({"keywords": ["checkout"]}),
            })
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.matched_text.as_deref(), Some("Proceed to Checkout"));
    }

    #[tokio::test]
    async fn unknown_field_type_fails_cleanly() {
        let dom = Arc::new(FakeDom::new("u", FakePage::default()));
        let executor = executor_for(dom);
        let outcome = executor
            .execute(&ToolCall {
                tool: ToolName::FillField,
                params: json!({"field_type": "card_number", "value": "4111"}),
            })
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn wait_is_capped() {
        let dom = Arc::new(FakeDom::new("u", FakePage::default()));
        let executor = executor_for(dom);
        let started = std::time::Instant::now();
        let outcome = executor
            .execute(&ToolCall {
                tool: ToolName::Wait,
                params: json!({"ms": 600_000}),
            })
            .await;
        assert!(outcome.success);
        assert!(started.elapsed() <= Duration::from_secs(30));
    }
}
