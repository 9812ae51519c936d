//! Runtime configuration: defaults, an optional JSON config file, and
//! `CARTFLOW_*` environment overrides, applied in that order.

use anyhow::Context;
use checkout_flow::FlowConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CDP_URL: &str = "ws://127.0.0.1:9222";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Completion-service settings. Leaving `api_key` unset disables the
/// fallback bridge entirely; the rule-based flow still runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Recovery plans below this confidence are discarded.
    pub confidence_floor: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            timeout_secs: 60,
            confidence_floor: llm_bridge::DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartflowConfig {
    /// WebSocket endpoint of a running Chrome with remote debugging on.
    pub cdp_url: String,
    /// Where screenshots requested by recovery plans land. Unset means
    /// screenshots are taken but not persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    pub llm: LlmSettings,
    pub flow: FlowConfig,
}

impl Default for CartflowConfig {
    fn default() -> Self {
        Self {
            cdp_url: DEFAULT_CDP_URL.to_string(),
            artifacts_dir: None,
            llm: LlmSettings::default(),
            flow: FlowConfig::default(),
        }
    }
}

impl CartflowConfig {
    /// Defaults, then the config file (when given), then the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CARTFLOW_CDP_URL") {
            self.cdp_url = url;
        }
        if let Ok(dir) = std::env::var("CARTFLOW_ARTIFACTS_DIR") {
            self.artifacts_dir = Some(PathBuf::from(dir));
        }
        if let Ok(key) = std::env::var("CARTFLOW_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        } else if self.llm.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(base) = std::env::var("CARTFLOW_LLM_API_BASE") {
            self.llm.api_base = base;
        }
        if let Ok(model) = std::env::var("CARTFLOW_LLM_MODEL") {
            self.llm.model = model;
        }
    }
}
