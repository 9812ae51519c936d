//! Model fallback bridge. When rule-based handling fails, the bridge
//! asks a completion service for a short structured plan and runs it
//! through the action executor. Plans below the confidence floor are
//! discarded; the model never touches the page directly.

mod prompt;

pub use prompt::{recovery_prompt, strip_code_fences};

use action_executor::{Executor, ToolCall, ToolName};
use cartflow_core_types::ActionOutcome;
use page_adapter::DomProbe;
use page_perceiver::PageObservation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.5;
const MAX_PLAN_ACTIONS: usize = 6;
const COMPLETION_MAX_TOKENS: u32 = 1_024;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("malformed completion response: {0}")]
    BadResponse(String),
}

/// The one seam to a completion provider. The production client lives in
/// the CLI crate; tests script this trait directly.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        image_jpeg: Option<&[u8]>,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("unusable recovery plan: {0}")]
    BadPlan(String),
}

/// One step of a recovery plan as the model emits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub tool: String,
    #[serde(default)]
    pub params: Value,
    /// Convenience slot: models often put the field type beside the
    /// params instead of inside them.
    #[serde(default)]
    pub field_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RecoveryPlan {
    #[serde(default)]
    reasoning: String,
    confidence: f64,
    #[serde(default)]
    actions: Vec<PlannedAction>,
}

/// What came of one escalation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// Plan executed; `completed` of `total` steps succeeded.
    Executed {
        completed: usize,
        total: usize,
        last_error: Option<String>,
    },
    /// The model was not confident enough to act on.
    LowConfidence { confidence: f64 },
    /// A confident reply with nothing to do.
    NoPlan,
}

impl RecoveryOutcome {
    /// Did the escalation actually change anything on the page?
    pub fn made_progress(&self) -> bool {
        matches!(self, RecoveryOutcome::Executed { completed, .. } if *completed > 0)
    }
}

pub struct FallbackBridge {
    llm: Arc<dyn LlmClient>,
    executor: Arc<Executor>,
    probe: Arc<dyn DomProbe>,
    confidence_floor: f64,
}

impl FallbackBridge {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<Executor>,
        probe: Arc<dyn DomProbe>,
        confidence_floor: f64,
    ) -> Self {
        Self {
            llm,
            executor,
            probe,
            confidence_floor,
        }
    }

    /// Ask for and run one recovery plan.
    pub async fn recover(
        &self,
        observation: &PageObservation,
        failure: &str,
    ) -> Result<RecoveryOutcome, BridgeError> {
        let prompt = recovery_prompt(observation, failure);
        let screenshot = match self.probe.screenshot_jpeg().await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(error = %err, "proceeding without screenshot");
                None
            }
        };

        let raw = self
            .llm
            .complete(&prompt, screenshot.as_deref(), COMPLETION_MAX_TOKENS)
            .await?;
        let plan = parse_plan(&raw)?;
        debug!(
            confidence = plan.confidence,
            steps = plan.actions.len(),
            reasoning = %plan.reasoning,
            "received recovery plan"
        );

        if plan.confidence < self.confidence_floor {
            info!(
                confidence = plan.confidence,
                floor = self.confidence_floor,
                "recovery plan below confidence floor, discarding"
            );
            return Ok(RecoveryOutcome::LowConfidence {
                confidence: plan.confidence,
            });
        }
        if plan.actions.is_empty() {
            return Ok(RecoveryOutcome::NoPlan);
        }

        let total = plan.actions.len().min(MAX_PLAN_ACTIONS);
        let mut completed = 0usize;
        let mut last_error = None;
        for action in plan.actions.into_iter().take(MAX_PLAN_ACTIONS) {
            let outcome = self.run_action(action).await;
            if outcome.success {
                completed += 1;
            } else {
                last_error = outcome.error;
                break;
            }
        }
        Ok(RecoveryOutcome::Executed {
            completed,
            total,
            last_error,
        })
    }

    async fn run_action(&self, action: PlannedAction) -> ActionOutcome {
        let tool = match ToolName::from_str(&action.tool) {
            Ok(tool) => tool,
            Err(err) => return ActionOutcome::fail(err.to_string()),
        };
        let mut params = action.params;
        // Hoist a top-level field_type into the params where the
        // executor expects it.
        if let Some(field_type) = action.field_type {
            if params.get("field_type").is_none() {
                if let Value::Object(ref mut map) = params {
                    map.insert("field_type".to_string(), Value::String(field_type));
                } else if params.is_null() {
                    params = serde_json::json!({ "field_type": field_type });
                }
            }
        }
        self.executor.execute(&ToolCall { tool, params }).await
    }
}

fn parse_plan(raw: &str) -> Result<RecoveryPlan, BridgeError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str::<RecoveryPlan>(cleaned)
        .map_err(|err| BridgeError::BadPlan(format!("{err}: {cleaned:.120}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflow_core_types::{Customer, RetryPolicy};
    use element_locator::Locator;
    use field_filler::Filler;
    use overlay_dismiss::Dismisser;
    use page_adapter::fake::{FakeButton, FakeDom, FakePage};
    use page_perceiver::PageState;
    use std::sync::Mutex;

    struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().map(String::from).collect()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _prompt: &str,
            _image: Option<&[u8]>,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            self.replies
                .lock()
                .expect("lock")
                .pop()
                .ok_or_else(|| LlmError::Request("script exhausted".into()))
        }
    }

    fn observation() -> PageObservation {
        PageObservation {
            url: "https://shop.test/checkout".into(),
            body_excerpt: String::new(),
            buttons: vec![],
            fields: vec![],
            has_blocking_overlay: false,
            state: PageState::CheckoutUnknown,
        }
    }

    fn bridge_for(dom: Arc<FakeDom>, llm: Arc<dyn LlmClient>, floor: f64) -> FallbackBridge {
        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1.0,
            cap_ms: 0,
        };
        let executor = Arc::new(Executor::new(
            dom.clone(),
            Arc::new(Locator::new(dom.clone(), retry)),
            Arc::new(Filler::new(dom.clone(), retry)),
            Arc::new(Dismisser::new(dom.clone())),
            Customer::default(),
            None,
        ));
        FallbackBridge::new(llm, executor, dom, floor)
    }

    #[tokio::test]
    async fn low_confidence_plan_is_discarded() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_button(FakeButton::new("go", "Continue")),
        ));
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"{"reasoning": "guessing", "confidence": 0.2, "actions": [{"tool": "click_element", "params": {"keywords": ["continue"]}}]}"#,
        ]));
        let bridge = bridge_for(dom.clone(), llm, DEFAULT_CONFIDENCE_FLOOR);
        let outcome = bridge.recover(&observation(), "stuck").await.expect("recover");
        assert_eq!(outcome, RecoveryOutcome::LowConfidence { confidence: 0.2 });
        assert!(!dom.action_log().iter().any(|l| l.starts_with("click:")));
    }

    #[tokio::test]
    async fn confident_plan_executes_through_registry() {
        let dom = Arc::new(FakeDom::new(
            "u",
            FakePage::default().with_button(FakeButton::new("go", "Continue to shipping")),
        ));
        let llm = Arc::new(ScriptedLlm::new(vec![
            "```json\n{\"reasoning\": \"the continue button is present\", \"confidence\": 0.9, \"actions\": [{\"tool\": \"click_element\", \"params\": {\"keywords\": [\"continue\"]}}]}\n```",
        ]));
        let bridge = bridge_for(dom.clone(), llm, DEFAULT_CONFIDENCE_FLOOR);
        let outcome = bridge.recover(&observation(), "stuck").await.expect("recover");
        assert!(outcome.made_progress(), "outcome: {outcome:?}");
        assert!(dom.action_log().iter().any(|l| l == "click:go"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_a_bad_plan() {
        let dom = Arc::new(FakeDom::new("u", FakePage::default()));
        let llm = Arc::new(ScriptedLlm::new(vec!["I would suggest clicking around."]));
        let bridge = bridge_for(dom, llm, DEFAULT_CONFIDENCE_FLOOR);
        let result = bridge.recover(&observation(), "stuck").await;
        assert!(matches!(result, Err(BridgeError::BadPlan(_))));
    }
}
