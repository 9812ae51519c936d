use crate::stages::StageOutcome;
use crate::{CredentialPrompt, FlowConfig, FlowError};
use cartflow_core_types::{Customer, RunPhase, RunReport, Task};
use chrono::Utc;
use element_locator::Locator;
use field_filler::Filler;
use llm_bridge::FallbackBridge;
use overlay_dismiss::Dismisser;
use page_adapter::DomProbe;
use page_perceiver::{PageState, Perceiver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives one full purchase attempt. All page access goes through the
/// probe; the bridge, when present, is consulted only after rule-based
/// handling has failed.
pub struct CheckoutController {
    pub(crate) probe: Arc<dyn DomProbe>,
    pub(crate) perceiver: Perceiver,
    pub(crate) locator: Arc<Locator>,
    pub(crate) filler: Arc<Filler>,
    pub(crate) dismisser: Arc<Dismisser>,
    pub(crate) bridge: Option<Arc<FallbackBridge>>,
    pub(crate) credentials: Arc<dyn CredentialPrompt>,
    pub(crate) customer: Customer,
    pub(crate) cfg: FlowConfig,
}

/// Progress flags carried across checkout-loop iterations. Reaching the
/// payment page only ends the run once both stages have been completed
/// in this run; landing there cold is not success.
#[derive(Debug, Default, Clone, Copy)]
struct StageHistory {
    contact_done: bool,
    shipping_done: bool,
}

impl CheckoutController {
    pub fn new(
        probe: Arc<dyn DomProbe>,
        bridge: Option<Arc<FallbackBridge>>,
        credentials: Arc<dyn CredentialPrompt>,
        customer: Customer,
        cfg: FlowConfig,
    ) -> Self {
        Self {
            perceiver: Perceiver::new(probe.clone()),
            locator: Arc::new(Locator::new(probe.clone(), cfg.retry)),
            filler: Arc::new(Filler::new(probe.clone(), cfg.retry)),
            dismisser: Arc::new(Dismisser::new(probe.clone())),
            probe,
            bridge,
            credentials,
            customer,
            cfg,
        }
    }

    /// Run the whole journey for a set of tasks and report how it went.
    /// This never returns an `Err`: every failure mode is folded into
    /// the report.
    pub async fn run(&self, tasks: &[Task]) -> RunReport {
        let started = Utc::now();

        if !self.customer.contact_ready() {
            return RunReport::failure(
                RunPhase::Unknown,
                "validate",
                "customer contact profile is incomplete (email and a name are required)",
                None,
                started,
            );
        }
        if !self.customer.address_ready() {
            return RunReport::failure(
                RunPhase::Unknown,
                "validate",
                "customer shipping address is incomplete",
                None,
                started,
            );
        }
        if tasks.is_empty() {
            return RunReport::failure(RunPhase::Unknown, "validate", "no tasks", None, started);
        }

        for task in tasks {
            info!(url = %task.url, quantity = task.quantity, "starting product task");
            if let Err(err) = self.run_product_task(task).await {
                return self.failure_report(RunPhase::Product, "product_setup", err, started).await;
            }
        }

        if let Err(err) = self.reach_checkout().await {
            return self
                .failure_report(RunPhase::CartNavigation, "reach_checkout", err, started)
                .await;
        }

        match self.checkout_loop().await {
            Ok(final_url) => RunReport::success(RunPhase::Checkout, Some(final_url), started),
            Err(err) => {
                self.failure_report(RunPhase::Checkout, "checkout_loop", err, started)
                    .await
            }
        }
    }

    /// The staged form loop: observe, clear obstructions, terminate or
    /// dispatch, escalate on failure, and never spin forever.
    async fn checkout_loop(&self) -> Result<String, FlowError> {
        let mut history = StageHistory::default();
        let mut consecutive_failures = 0u32;
        let mut last_signature = String::new();

        for iteration in 0..self.cfg.max_iterations {
            let observation = self.perceiver.observe().await?;
            debug!(
                iteration,
                state = observation.state.as_str(),
                url = %observation.url,
                "checkout loop tick"
            );

            if observation.has_blocking_overlay {
                self.dismisser.dismiss().await?;
                self.settle().await;
                continue;
            }

            match observation.state {
                PageState::OrderConfirmation => {
                    info!(url = %observation.url, "order confirmation reached");
                    return Ok(observation.url);
                }
                PageState::CheckoutPayment if history.contact_done && history.shipping_done => {
                    // Terminal by design: card entry is out of scope.
                    info!(url = %observation.url, "payment page reached with stages complete");
                    return Ok(observation.url);
                }
                _ => {}
            }

            let outcome = match observation.state {
                PageState::CheckoutContact => self.contact_stage(&observation).await?,
                PageState::CheckoutShipping | PageState::CheckoutPayment => {
                    self.shipping_stage(&observation).await?
                }
                PageState::Cart => self.cart_stage(&observation).await?,
                PageState::Product => match self.reach_checkout().await {
                    Ok(()) => StageOutcome::Progressed,
                    Err(FlowError::Navigation(reason)) => StageOutcome::Failed(reason),
                    Err(other) => return Err(other),
                },
                PageState::CheckoutUnknown | PageState::Unknown => {
                    StageOutcome::Failed(format!("unrecognized page: {}", observation.url))
                }
                PageState::OrderConfirmation => return Ok(observation.url),
            };

            match outcome {
                StageOutcome::Progressed => {
                    match observation.state {
                        PageState::CheckoutContact => history.contact_done = true,
                        PageState::CheckoutShipping | PageState::CheckoutPayment => {
                            history.shipping_done = true
                        }
                        _ => {}
                    }
                    consecutive_failures = 0;
                    last_signature.clear();
                    self.settle().await;
                }
                StageOutcome::Failed(reason) => {
                    warn!(
                        state = observation.state.as_str(),
                        %reason,
                        "stage failed, escalating"
                    );
                    if self.escalate(&observation, &reason).await {
                        consecutive_failures = 0;
                        last_signature.clear();
                        self.settle().await;
                        continue;
                    }

                    let signature = format!("{}|{reason}", observation.state.as_str());
                    if signature == last_signature {
                        consecutive_failures += 1;
                    } else {
                        consecutive_failures = 1;
                        last_signature = signature;
                    }
                    if consecutive_failures >= self.cfg.stuck_threshold {
                        return Err(FlowError::StuckLoop {
                            state: observation.state.as_str().to_string(),
                            failure: reason,
                        });
                    }
                    self.settle().await;
                }
            }
        }

        Err(FlowError::IterationLimit(self.cfg.max_iterations))
    }

    /// Hand a failure to the bridge. True means the plan visibly did
    /// something and the loop should re-observe rather than count the
    /// failure.
    async fn escalate(
        &self,
        observation: &page_perceiver::PageObservation,
        reason: &str,
    ) -> bool {
        let Some(bridge) = &self.bridge else {
            return false;
        };
        match bridge.recover(observation, reason).await {
            Ok(outcome) if outcome.made_progress() => {
                info!("recovery plan made progress");
                true
            }
            Ok(outcome) => {
                debug!(?outcome, "recovery did not help");
                false
            }
            Err(err) => {
                warn!(error = %err, "recovery attempt failed");
                false
            }
        }
    }

    async fn failure_report(
        &self,
        phase: RunPhase,
        step: &str,
        err: FlowError,
        started: chrono::DateTime<Utc>,
    ) -> RunReport {
        let phase = err.default_phase().unwrap_or(phase);
        let final_url = self.probe.current_url().await.ok();
        RunReport::failure(phase, step, err.to_string(), final_url, started)
    }

    pub(crate) async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(self.cfg.settle_ms)).await;
    }
}
