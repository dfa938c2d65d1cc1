//! Narrow interface to the LLM provider
//!
//! The core treats the model as a black box: text in, text out. Anything
//! smarter (intent JSON, relevance verdicts) is layered on top by callers,
//! so a failed or empty completion is always a recoverable error value.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Errors from the LLM provider boundary
#[derive(Error, Debug)]
pub enum LlmError {
	#[error("LLM request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("LLM endpoint returned status {0}")]
	Status(u16),

	#[error("LLM returned an empty response")]
	EmptyResponse,

	#[error("invalid LLM response: {0}")]
	InvalidResponse(String),
}

/// Single text-completion call
#[async_trait]
pub trait LlmClient: Send + Sync {
	async fn generate(
		&self,
		prompt: &str,
		system: Option<&str>,
		temperature: f32,
	) -> Result<String, LlmError>;
}

/// Strip a markdown code fence wrapper from model output
///
/// Models routinely wrap JSON in ```json fences even when told not to;
/// stripping happens before any parse attempt.
pub fn strip_code_fences(text: &str) -> &str {
	let trimmed = text.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner
		.strip_prefix("json")
		.or_else(|| inner.strip_prefix("JSON"))
		.unwrap_or(inner);
	inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Chat-completions HTTP client for an OpenAI-compatible endpoint
#[derive(Debug)]
pub struct HttpLlmClient {
	client: reqwest::Client,
	endpoint: String,
	model: String,
	api_key: Option<String>,
}

impl HttpLlmClient {
	pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			endpoint: endpoint.into(),
			model: model.into(),
			api_key: None,
		}
	}

	pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());
		self
	}
}

#[async_trait]
impl LlmClient for HttpLlmClient {
	async fn generate(
		&self,
		prompt: &str,
		system: Option<&str>,
		temperature: f32,
	) -> Result<String, LlmError> {
		let mut messages = Vec::new();
		if let Some(system) = system {
			messages.push(json!({"role": "system", "content": system}));
		}
		messages.push(json!({"role": "user", "content": prompt}));

		let body = json!({
			"model": self.model,
			"messages": messages,
			"temperature": temperature,
		});

		debug!("LLM completion request to {} (model {})", self.endpoint, self.model);

		let mut request = self.client.post(&self.endpoint).json(&body);
		if let Some(key) = &self.api_key {
			request = request.bearer_auth(key);
		}

		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(LlmError::Status(status.as_u16()));
		}

		let body: serde_json::Value = response
			.json()
			.await
			.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

		let content = body
			.get("choices")
			.and_then(|c| c.get(0))
			.and_then(|c| c.get("message"))
			.and_then(|m| m.get("content"))
			.and_then(|c| c.as_str())
			.unwrap_or_default();

		if content.trim().is_empty() {
			return Err(LlmError::EmptyResponse);
		}

		Ok(content.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_strip_plain_text_untouched() {
		assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
	}

	#[test]
	fn test_strip_json_fence() {
		let fenced = "```json\n{\"a\": 1}\n```";
		assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
	}

	#[test]
	fn test_strip_bare_fence() {
		let fenced = "```\n[1, 2]\n```";
		assert_eq!(strip_code_fences(fenced), "[1, 2]");
	}

	#[test]
	fn test_strip_handles_surrounding_whitespace() {
		let fenced = "  ```JSON\n{}\n```  ";
		assert_eq!(strip_code_fences(fenced), "{}");
	}
}
