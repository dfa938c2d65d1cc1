//! Mock adapters and LLM clients for examples and testing
//!
//! Deterministic in-process stand-ins for the real marketplace and LLM
//! integrations: canned products, configurable failures and delays, no
//! network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use shopsearch_service::{LlmClient, LlmError};
use shopsearch_types::{
	MarketplaceAdapter, MarketplaceError, MarketplaceResult, ProductResult, SearchParams,
	SearchResult,
};

/// How a [`MockMarketplaceAdapter`] answers a search
#[derive(Debug, Clone)]
enum MockBehavior {
	Products(Vec<ProductResult>),
	Error(String),
}

/// In-memory marketplace adapter
#[derive(Debug)]
pub struct MockMarketplaceAdapter {
	code: String,
	name: String,
	behavior: MockBehavior,
	delay: Option<Duration>,
	search_calls: AtomicUsize,
	close_calls: AtomicUsize,
}

impl MockMarketplaceAdapter {
	/// Adapter that answers every search with the given products
	pub fn with_products(code: impl Into<String>, products: Vec<ProductResult>) -> Self {
		let code = code.into();
		Self {
			name: format!("Mock {}", code),
			code,
			behavior: MockBehavior::Products(products),
			delay: None,
			search_calls: AtomicUsize::new(0),
			close_calls: AtomicUsize::new(0),
		}
	}

	/// Adapter that fails every search
	pub fn failing(code: impl Into<String>, message: impl Into<String>) -> Self {
		let code = code.into();
		Self {
			name: format!("Mock {}", code),
			code,
			behavior: MockBehavior::Error(message.into()),
			delay: None,
			search_calls: AtomicUsize::new(0),
			close_calls: AtomicUsize::new(0),
		}
	}

	/// Delay every search, for timeout testing
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn search_calls(&self) -> usize {
		self.search_calls.load(Ordering::SeqCst)
	}

	pub fn close_calls(&self) -> usize {
		self.close_calls.load(Ordering::SeqCst)
	}

	/// Convenience product for building test fixtures
	pub fn product(
		id: &str,
		marketplace: &str,
		title: &str,
		price: Decimal,
	) -> ProductResult {
		ProductResult::new(
			id,
			marketplace,
			title,
			price,
			"USD",
			format!("https://example.com/{}/{}", marketplace, id),
		)
	}
}

#[async_trait]
impl MarketplaceAdapter for MockMarketplaceAdapter {
	fn marketplace_code(&self) -> &str {
		&self.code
	}

	fn marketplace_name(&self) -> &str {
		&self.name
	}

	async fn search(&self, params: &SearchParams) -> MarketplaceResult<SearchResult> {
		self.search_calls.fetch_add(1, Ordering::SeqCst);
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		match &self.behavior {
			MockBehavior::Products(products) => {
				let page: Vec<ProductResult> =
					products.iter().take(params.limit).cloned().collect();
				let total = products.len() as u64;
				let has_more = (page.len() as u64) < total;
				Ok(SearchResult::new(page, total, has_more, &self.code))
			},
			MockBehavior::Error(message) => {
				Err(MarketplaceError::service_unavailable(&self.code, message))
			},
		}
	}

	async fn get_product(&self, product_id: &str) -> MarketplaceResult<ProductResult> {
		match &self.behavior {
			MockBehavior::Products(products) => products
				.iter()
				.find(|p| p.id == product_id)
				.cloned()
				.ok_or_else(|| MarketplaceError::not_found(&self.code, product_id)),
			MockBehavior::Error(message) => {
				Err(MarketplaceError::service_unavailable(&self.code, message))
			},
		}
	}

	async fn health_check(&self) -> bool {
		matches!(self.behavior, MockBehavior::Products(_))
	}

	async fn close(&self) -> MarketplaceResult<()> {
		self.close_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

/// LLM client returning canned responses in order, then repeating the last
#[derive(Debug)]
pub struct MockLlmClient {
	responses: Vec<Result<String, String>>,
	calls: AtomicUsize,
}

impl MockLlmClient {
	pub fn with_response(response: impl Into<String>) -> Self {
		Self {
			responses: vec![Ok(response.into())],
			calls: AtomicUsize::new(0),
		}
	}

	pub fn with_responses(responses: Vec<Result<String, String>>) -> Self {
		Self {
			responses,
			calls: AtomicUsize::new(0),
		}
	}

	pub fn failing(message: impl Into<String>) -> Self {
		Self {
			responses: vec![Err(message.into())],
			calls: AtomicUsize::new(0),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn into_arc(self) -> Arc<dyn LlmClient> {
		Arc::new(self)
	}
}

#[async_trait]
impl LlmClient for MockLlmClient {
	async fn generate(
		&self,
		_prompt: &str,
		_system: Option<&str>,
		_temperature: f32,
	) -> Result<String, LlmError> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		if self.responses.is_empty() {
			return Err(LlmError::EmptyResponse);
		}
		let index = call.min(self.responses.len() - 1);
		match &self.responses[index] {
			Ok(response) => Ok(response.clone()),
			Err(message) => Err(LlmError::InvalidResponse(message.clone())),
		}
	}
}
