//! Description generation.
//!
//! Thin client for an OpenAI-compatible chat-completions endpoint. The
//! engine treats it as an opaque text service: one prompt in, one short
//! description out, and any failure surfaces as an external error that is
//! never retried here.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;

use crate::error::DomainError;

const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct DescriptionGenerator {
  client: reqwest::Client,
  api_key: String,
  model: String,
  base_url: String,
}

impl DescriptionGenerator {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_key: api_key.into(),
      model: DEFAULT_MODEL.to_string(),
      base_url: BASE_URL.to_string(),
    }
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  /// Point the client at a different endpoint, e.g. a stub in tests.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  #[instrument(skip(self))]
  pub async fn generate(&self, title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
      return Err(DomainError::MissingField("title"));
    }

    let request = ChatRequest {
      model: self.model.clone(),
      messages: vec![ChatMessage {
        role: "user".to_string(),
        content: build_prompt(title),
      }],
    };

    let response = self
      .client
      .post(&self.base_url)
      .timeout(REQUEST_TIMEOUT)
      .header("Authorization", format!("Bearer {}", self.api_key))
      .json(&request)
      .send()
      .await
      .map_err(|err| DomainError::External(format!("request failed: {err}")))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
      return Err(DomainError::External(format!("status {status}: {detail}")));
    }

    let parsed: ChatResponse = response
      .json()
      .await
      .map_err(|err| DomainError::External(format!("unreadable response: {err}")))?;
    let description = parsed
      .choices
      .into_iter()
      .next()
      .map(|choice| choice.message.content)
      .ok_or_else(|| DomainError::External("response carried no choices".to_string()))?;
    info!(chars = description.len(), "generated listing description");
    Ok(description)
  }
}

fn build_prompt(title: &str) -> String {
  format!("I want to sell a {title}. What should I write in the description with in 50 words?")
}

#[derive(Debug, Serialize)]
struct ChatRequest {
  model: String,
  messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
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
  message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
  content: String,
}

#[cfg(test)]
mod tests {
  use super::DescriptionGenerator;
  use super::build_prompt;
  use crate::error::DomainError;

  #[test]
  fn prompt_embeds_the_title() {
    let prompt = build_prompt("vintage lamp");
    assert!(prompt.starts_with("I want to sell a vintage lamp."));
    assert!(prompt.contains("50 words"));
  }

  #[tokio::test]
  async fn blank_titles_are_rejected_before_any_request() {
    let generator = DescriptionGenerator::new("test-key");
    let err = generator.generate("   ").await.unwrap_err();
    assert!(matches!(err, DomainError::MissingField("title")));
  }
}
