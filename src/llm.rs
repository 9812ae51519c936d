//! OpenAI-compatible chat-completions client behind the
//! [`llm_bridge::LlmClient`] seam. Screenshots travel as base64 data
//! URLs in a multimodal user message.

use crate::config::LlmSettings;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use llm_bridge::{LlmClient, LlmError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Request("no API key configured".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| LlmError::Request(format!("building HTTP client: {err}")))?;
        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    fn user_content(prompt: &str, image_jpeg: Option<&[u8]>) -> Value {
        match image_jpeg {
            Some(bytes) => json!([
                {"type": "text", "text": prompt},
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", Base64.encode(bytes))
                    }
                }
            ]),
            None => json!(prompt),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        image_jpeg: Option<&[u8]>,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "user", "content": Self::user_content(prompt, image_jpeg)}
            ],
        });

        debug!(model = %self.model, with_image = image_jpeg.is_some(), "completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(LlmError::Request(format!("{status}: {text}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::BadResponse(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::BadResponse("completion had no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_becomes_a_data_url_part() {
        let content = OpenAiClient::user_content("look at this", Some(&[0xFF, 0xD8]));
        let parts = content.as_array().expect("multimodal content");
        assert_eq!(parts.len(), 2);
        let url = parts[1]["image_url"]["url"].as_str().expect("url");
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn plain_prompt_stays_a_string() {
        let content = OpenAiClient::user_content("just text", None);
        assert_eq!(content.as_str(), Some("just text"));
    }

    #[test]
    fn missing_key_is_rejected_up_front() {
        let settings = LlmSettings::default();
        assert!(OpenAiClient::new(&settings).is_err());
    }
}
