//! Assembles the component stack over a live browser and drives one run.

use crate::config::CartflowConfig;
use crate::llm::OpenAiClient;
use action_executor::Executor;
use anyhow::Context;
use async_trait::async_trait;
use cartflow_core_types::{CheckoutRequest, RunReport};
use checkout_flow::{CheckoutController, CredentialPrompt};
use chromiumoxide::Browser;
use element_locator::Locator;
use field_filler::Filler;
use futures::StreamExt;
use llm_bridge::FallbackBridge;
use overlay_dismiss::Dismisser;
use page_adapter::{CdpProbe, DomProbe};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// Asks the operator for a password on the terminal. An empty line
/// declines, which aborts the run rather than guessing credentials.
pub struct StdinPrompt;

#[async_trait]
impl CredentialPrompt for StdinPrompt {
    async fn request_password(&self, context: &str) -> Option<String> {
        let context = context.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("Password required for {context} (empty to abort): ");
            std::io::stderr().flush().ok();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok()?;
            Some(line.trim_end_matches(['\r', '\n']).to_string())
        })
        .await
        .ok()
        .flatten()?;
        if answer.is_empty() {
            None
        } else {
            Some(answer)
        }
    }
}

/// Connect to the configured browser and run the whole request. The
/// report is always produced; connection problems are the only errors.
pub async fn run_checkout(
    config: &CartflowConfig,
    request: CheckoutRequest,
) -> anyhow::Result<RunReport> {
    let (browser, mut handler) = Browser::connect(&config.cdp_url)
        .await
        .with_context(|| format!("connecting to browser at {}", config.cdp_url))?;
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    let page = match browser.pages().await?.into_iter().next() {
        Some(page) => page,
        None => browser
            .new_page("about:blank")
            .await
            .context("opening a page")?,
    };
    let probe: Arc<dyn DomProbe> = Arc::new(CdpProbe::new(page));

    let retry = config.flow.retry;
    let locator = Arc::new(Locator::new(probe.clone(), retry));
    let filler = Arc::new(Filler::new(probe.clone(), retry));
    let dismisser = Arc::new(Dismisser::new(probe.clone()));

    let bridge = match &config.llm.api_key {
        Some(_) => {
            let llm = Arc::new(OpenAiClient::new(&config.llm)?);
            let executor = Arc::new(Executor::new(
                probe.clone(),
                locator.clone(),
                filler.clone(),
                dismisser.clone(),
                request.customer.clone(),
                config.artifacts_dir.clone(),
            ));
            info!(model = %config.llm.model, "fallback bridge enabled");
            Some(Arc::new(FallbackBridge::new(
                llm,
                executor,
                probe.clone(),
                config.llm.confidence_floor,
            )))
        }
        None => {
            warn!("no completion API key configured, running rule-based only");
            None
        }
    };

    let controller = CheckoutController::new(
        probe,
        bridge,
        Arc::new(StdinPrompt),
        request.customer,
        config.flow.clone(),
    );
    let report = controller.run(&request.tasks).await;

    handler_task.abort();
    Ok(report)
}
