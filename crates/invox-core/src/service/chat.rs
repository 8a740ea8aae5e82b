//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ServiceError;
use crate::models::config::ServiceConfig;

use super::{render_template, ServiceResponse, Stage, TextGenerationClient, Variables};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Posts rendered prompts to `{base_url}/chat/completions`.
///
/// Responses come back as [`ServiceResponse::Structured`] state: the input
/// variables plus `<STAGE>_output` holding the completion text.
pub struct ChatCompletionsClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key_env: String,
    temperature: f64,
    max_input_chars: usize,
}

impl ChatCompletionsClient {
    /// Build a client with the configured request timeout.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            max_input_chars: config.max_input_chars,
        })
    }

    fn api_key(&self) -> Result<String, ServiceError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingCredentials(self.api_key_env.clone()))
    }

    fn complete(&self, prompt: String) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ServiceError::EmptyResponse)
    }
}

impl TextGenerationClient for ChatCompletionsClient {
    fn run(
        &self,
        stage: Stage,
        template: &str,
        variables: &Variables,
    ) -> Result<ServiceResponse, ServiceError> {
        let bounded: Variables = variables
            .iter()
            .map(|(k, v)| (k.clone(), truncate_chars(v, self.max_input_chars).to_string()))
            .collect();

        let prompt = render_template(template, &bounded);
        debug!(stage = %stage, model = %self.model, prompt_chars = prompt.len(), "Calling text-generation service");

        let output = self.complete(prompt)?;

        let mut state: Map<String, Value> = variables
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        state.insert(stage.output_key(), Value::String(output));
        Ok(ServiceResponse::Structured(state))
    }
}

/// Longest prefix of `s` with at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("zażółć", 3), "zaż");
    }

    #[test]
    fn test_missing_credentials() {
        let config = ServiceConfig {
            api_key_env: "INVOX_TEST_UNSET_API_KEY".to_string(),
            ..Default::default()
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();

        let result = client.run(Stage::Clean, "{ocr_text}", &Variables::new());

        assert!(matches!(
            result,
            Err(ServiceError::MissingCredentials(ref name)) if name == "INVOX_TEST_UNSET_API_KEY"
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ServiceConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..Default::default()
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434/v1");
    }
}
