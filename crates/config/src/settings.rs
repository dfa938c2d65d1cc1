//! Configuration settings structures

use crate::configurable_value::ConfigurableValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	/// Per-marketplace configuration, keyed by marketplace code
	pub marketplaces: HashMap<String, MarketplaceSettings>,
	pub llm: LlmSettings,
	pub orchestrator: OrchestratorSettings,
	pub logging: LoggingSettings,
}

/// Individual marketplace configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MarketplaceSettings {
	pub enabled: bool,
	pub client_id: Option<ConfigurableValue>,
	pub client_secret: Option<ConfigurableValue>,
	/// Override for the provider's API base URL (tests, sandboxes)
	pub base_url: Option<String>,
}

impl Default for MarketplaceSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			client_id: None,
			client_secret: None,
			base_url: None,
		}
	}
}

/// LLM provider configuration for intent extraction and relevance filtering
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LlmSettings {
	pub enabled: bool,
	pub endpoint: String,
	pub model: String,
	pub api_key: Option<ConfigurableValue>,
}

impl Default for LlmSettings {
	fn default() -> Self {
		Self {
			enabled: false,
			endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
			model: "gpt-4o-mini".to_string(),
			api_key: None,
		}
	}
}

/// Orchestrator tunables
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OrchestratorSettings {
	/// Per-marketplace search deadline in milliseconds
	pub per_marketplace_timeout_ms: u64,
	/// Over-fetch factor applied to the user's result limit
	pub overfetch_multiplier: usize,
}

impl Default for OrchestratorSettings {
	fn default() -> Self {
		Self {
			per_marketplace_timeout_ms: 30_000,
			overfetch_multiplier: 3,
		}
	}
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
		}
	}
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

/// Errors from validating loaded settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
	#[error("marketplace '{0}' has a client_id but no client_secret")]
	IncompleteCredentials(String),

	#[error("orchestrator overfetch_multiplier must be at least 1")]
	InvalidOverfetchMultiplier,

	#[error("llm is enabled but no endpoint is configured")]
	MissingLlmEndpoint,
}

impl Settings {
	/// Check cross-field consistency after deserialization
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		for (code, marketplace) in &self.marketplaces {
			if marketplace.client_id.is_some() && marketplace.client_secret.is_none() {
				return Err(ConfigValidationError::IncompleteCredentials(code.clone()));
			}
		}
		if self.orchestrator.overfetch_multiplier == 0 {
			return Err(ConfigValidationError::InvalidOverfetchMultiplier);
		}
		if self.llm.enabled && self.llm.endpoint.trim().is_empty() {
			return Err(ConfigValidationError::MissingLlmEndpoint);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		assert!(Settings::default().validate().is_ok());
	}

	#[test]
	fn test_incomplete_credentials_rejected() {
		let mut settings = Settings::default();
		settings.marketplaces.insert(
			"ebay".to_string(),
			MarketplaceSettings {
				client_id: Some(ConfigurableValue::from_plain("id")),
				..Default::default()
			},
		);
		assert!(matches!(
			settings.validate().unwrap_err(),
			ConfigValidationError::IncompleteCredentials(code) if code == "ebay"
		));
	}

	#[test]
	fn test_zero_overfetch_rejected() {
		let mut settings = Settings::default();
		settings.orchestrator.overfetch_multiplier = 0;
		assert!(matches!(
			settings.validate().unwrap_err(),
			ConfigValidationError::InvalidOverfetchMultiplier
		));
	}
}
