//! Shopsearch Library
//!
//! A multi-marketplace product search aggregator: one query fans out to
//! eBay and the regional MercadoLibre sites, and the results come back
//! merged, relevance-filtered, consistently sorted and optionally annotated
//! with import tax estimates.

// Core domain types - the most commonly used types
pub use shopsearch_types::{
	chrono,
	AggregatedResult,
	Condition,
	CountryTaxRate,
	EnrichedProduct,
	ErrorCode,
	// Adapter trait and errors
	MarketplaceAdapter,
	MarketplaceError,
	MarketplaceResult,
	MarketplaceSearchResult,
	ProductResult,
	// Primary domain entities
	SearchIntent,
	SearchParams,
	SearchParamsError,
	SearchRequest,
	SearchResult,
	SecretString,
	SortOrder,
	TaxBreakdown,
};

// Service layer
pub use shopsearch_service::{
	ChatError, ChatReply, ChatService, ChatTurn, ExtractedIntent, HttpLlmClient, IntentError,
	IntentExtractor, LlmClient, LlmError, OrchestratorConfig, OrchestratorError, RelevanceFilter,
	SearchOrchestrator, StaticTaxRateTable, TaxCalculator, TaxError, TaxRateSource, TaxRequest,
};

// Adapters
pub use shopsearch_adapters::{EbayAdapter, MarketplaceFactory, MeliSite, MercadoLibreAdapter};

// Config
pub use shopsearch_config::{load_config, log_service_info, log_service_shutdown, Settings};

// Module aliases for library consumers that want the full surface
pub mod models {
	pub use shopsearch_types::*;
}

pub mod adapters {
	pub use shopsearch_adapters::*;
}

pub mod service {
	pub use shopsearch_service::*;
}

pub mod config {
	pub use shopsearch_config::*;
}

pub mod mocks;

use std::sync::Arc;
use tracing::info;

// Re-export external dependencies for downstream use
pub use async_trait;
pub use reqwest;
pub use serde_json;

use shopsearch_config::{ConfigurableValueError, LogFormat, MarketplaceSettings};

/// Errors raised while assembling the aggregator from settings
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
	#[error("unknown marketplace code '{0}' in configuration")]
	UnknownMarketplace(String),

	#[error("marketplace '{code}' credentials: {source}")]
	Credentials {
		code: String,
		#[source]
		source: ConfigurableValueError,
	},

	#[error("marketplace '{0}' requires client credentials")]
	MissingCredentials(String),

	#[error("chat requires an LLM client; none was configured")]
	MissingLlmClient,

	#[error(transparent)]
	Registration(#[from] MarketplaceError),
}

/// Builder pattern for configuring the aggregator
///
/// Wires settings, marketplace adapters and the optional LLM client into a
/// ready [`SearchOrchestrator`] or [`ChatService`].
pub struct ShopsearchBuilder {
	settings: Settings,
	factory: MarketplaceFactory,
	llm: Option<Arc<dyn LlmClient>>,
}

impl ShopsearchBuilder {
	/// Empty builder with default settings; adapters are added explicitly
	pub fn new() -> Self {
		Self {
			settings: Settings::default(),
			factory: MarketplaceFactory::new(),
			llm: None,
		}
	}

	/// Build from loaded settings, constructing every enabled marketplace
	/// adapter the configuration names
	pub fn from_config(settings: Settings) -> Result<Self, BuilderError> {
		let mut builder = Self::new();

		for (code, marketplace) in &settings.marketplaces {
			if !marketplace.enabled {
				info!("marketplace '{}' is disabled, skipping", code);
				continue;
			}
			let adapter = build_adapter(code, marketplace)?;
			builder.factory.register(code.clone(), adapter)?;
		}

		if settings.llm.enabled {
			let mut client = HttpLlmClient::new(&settings.llm.endpoint, &settings.llm.model);
			if let Some(key) = &settings.llm.api_key {
				let key = key.resolve().map_err(|source| BuilderError::Credentials {
					code: "llm".to_string(),
					source,
				})?;
				client = client.with_api_key(key);
			}
			builder.llm = Some(Arc::new(client));
		}

		builder.settings = settings;
		Ok(builder)
	}

	/// Register an adapter under a marketplace code
	pub fn with_adapter(
		mut self,
		code: impl Into<String>,
		adapter: Arc<dyn MarketplaceAdapter>,
	) -> Result<Self, BuilderError> {
		self.factory.register(code, adapter)?;
		Ok(self)
	}

	pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
		self.llm = Some(llm);
		self
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Codes of the marketplaces registered so far
	pub fn registered_marketplaces(&self) -> Vec<String> {
		self.factory.registered_codes()
	}

	/// Assemble the search orchestrator
	pub fn build(self) -> SearchOrchestrator {
		let relevance = match &self.llm {
			Some(llm) => RelevanceFilter::with_llm(Arc::clone(llm)),
			None => RelevanceFilter::heuristic_only(),
		};

		let config = OrchestratorConfig {
			per_marketplace_timeout_ms: self.settings.orchestrator.per_marketplace_timeout_ms,
			overfetch_multiplier: self.settings.orchestrator.overfetch_multiplier,
		};

		info!(
			"aggregator configured with {} marketplace(s), llm {}",
			self.factory.registered_codes().len(),
			if self.llm.is_some() { "enabled" } else { "disabled" }
		);

		SearchOrchestrator::new(Arc::new(self.factory))
			.with_relevance_filter(relevance)
			.with_tax_calculator(TaxCalculator::new())
			.with_config(config)
	}

	/// Assemble the conversational service; requires an LLM client for
	/// intent extraction
	pub fn build_chat(self) -> Result<ChatService, BuilderError> {
		let llm = self.llm.clone().ok_or(BuilderError::MissingLlmClient)?;
		let extractor = IntentExtractor::new(llm);
		Ok(ChatService::new(extractor, self.build()))
	}

	/// Initialize tracing from the builder's logging settings
	///
	/// `RUST_LOG` wins over the configured level when set.
	pub fn init_tracing(&self) {
		let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.settings.logging.level));

		match self.settings.logging.format {
			LogFormat::Json => {
				tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
			},
			LogFormat::Pretty => {
				tracing_subscriber::fmt().pretty().with_env_filter(env_filter).init();
			},
			LogFormat::Compact => {
				tracing_subscriber::fmt().compact().with_env_filter(env_filter).init();
			},
		}
	}
}

impl Default for ShopsearchBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn build_adapter(
	code: &str,
	settings: &MarketplaceSettings,
) -> Result<Arc<dyn MarketplaceAdapter>, BuilderError> {
	let resolve = |value: &shopsearch_config::ConfigurableValue| {
		value.resolve().map_err(|source| BuilderError::Credentials {
			code: code.to_string(),
			source,
		})
	};

	if code == shopsearch_adapters::ebay::EBAY_MARKETPLACE_CODE {
		let (Some(client_id), Some(client_secret)) =
			(&settings.client_id, &settings.client_secret)
		else {
			return Err(BuilderError::MissingCredentials(code.to_string()));
		};
		let adapter = match &settings.base_url {
			Some(base_url) => EbayAdapter::with_base_url(
				resolve(client_id)?,
				resolve(client_secret)?,
				base_url,
				shopsearch_adapters::ebay::EBAY_TOKEN_URL,
			),
			None => EbayAdapter::new(resolve(client_id)?, resolve(client_secret)?),
		};
		return Ok(Arc::new(adapter));
	}

	if let Some(site) = MeliSite::from_marketplace_code(code) {
		let adapter = match (&settings.client_id, &settings.client_secret) {
			(Some(client_id), Some(client_secret)) => MercadoLibreAdapter::with_credentials(
				site,
				resolve(client_id)?,
				resolve(client_secret)?,
			),
			// The public site search works unauthenticated
			_ => MercadoLibreAdapter::new(site),
		};
		return Ok(Arc::new(adapter));
	}

	Err(BuilderError::UnknownMarketplace(code.to_string()))
}

#[cfg(test)]
mod tests {
	use tracing_subscriber::EnvFilter;

	// Builds a subscriber for every configured log format without
	// installing it; json needs its own tracing-subscriber feature
	#[test]
	fn test_every_log_format_builds_a_subscriber() {
		let _ = tracing_subscriber::fmt()
			.json()
			.with_env_filter(EnvFilter::new("info"))
			.finish();
		let _ = tracing_subscriber::fmt()
			.pretty()
			.with_env_filter(EnvFilter::new("info"))
			.finish();
		let _ = tracing_subscriber::fmt()
			.compact()
			.with_env_filter(EnvFilter::new("info"))
			.finish();
	}

	#[test]
	fn test_serde_json_reexport_is_usable() {
		let value: crate::serde_json::Value =
			crate::serde_json::from_str(r#"{"ok": true}"#).unwrap();
		assert_eq!(value["ok"], true);
	}
}
