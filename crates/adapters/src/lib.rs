//! Shopsearch Adapters
//!
//! Marketplace-specific adapters for the shopsearch aggregator, plus the
//! registry that resolves marketplace codes to adapter instances.

pub mod ebay;
pub mod http;
pub mod mercadolibre;
pub(crate) mod parse;

pub use ebay::EbayAdapter;
pub use http::{OAuthCredentials, OAuthHttpClient, HttpClientConfig};
pub use mercadolibre::{MeliSite, MercadoLibreAdapter};
pub use shopsearch_types::{MarketplaceAdapter, MarketplaceError, MarketplaceResult};

use std::collections::HashMap;
use std::sync::Arc;

/// Registry mapping marketplace code to adapter instance
///
/// Purely an in-memory lookup layer; an unknown code becomes a typed
/// not-found failure rather than a panic or an exception-style error path.
#[derive(Debug, Default)]
pub struct MarketplaceFactory {
	adapters: HashMap<String, Arc<dyn MarketplaceAdapter>>,
}

impl MarketplaceFactory {
	pub fn new() -> Self {
		Self {
			adapters: HashMap::new(),
		}
	}

	/// Register an adapter under a marketplace code; empty codes are rejected
	pub fn register(
		&mut self,
		code: impl Into<String>,
		adapter: Arc<dyn MarketplaceAdapter>,
	) -> MarketplaceResult<()> {
		let code = code.into();
		if code.trim().is_empty() {
			return Err(MarketplaceError::invalid_request(
				"factory",
				"marketplace code must not be empty",
			));
		}
		self.adapters.insert(code, adapter);
		Ok(())
	}

	/// Remove an adapter; returns whether the code was registered
	pub fn unregister(&mut self, code: &str) -> bool {
		self.adapters.remove(code).is_some()
	}

	/// Resolve a single code to its adapter
	pub fn get_adapter(&self, code: &str) -> MarketplaceResult<Arc<dyn MarketplaceAdapter>> {
		self.adapters.get(code).cloned().ok_or_else(|| {
			MarketplaceError::not_found(code, format!("no adapter registered for '{}'", code))
		})
	}

	/// Resolve many codes at once; unknown codes yield Failure entries
	/// instead of aborting the lookup
	pub fn get_adapters(
		&self,
		codes: &[String],
	) -> HashMap<String, MarketplaceResult<Arc<dyn MarketplaceAdapter>>> {
		codes
			.iter()
			.map(|code| (code.clone(), self.get_adapter(code)))
			.collect()
	}

	pub fn get_all_adapters(&self) -> Vec<Arc<dyn MarketplaceAdapter>> {
		self.adapters.values().cloned().collect()
	}

	pub fn is_registered(&self, code: &str) -> bool {
		self.adapters.contains_key(code)
	}

	pub fn registered_codes(&self) -> Vec<String> {
		let mut codes: Vec<String> = self.adapters.keys().cloned().collect();
		codes.sort();
		codes
	}

	pub fn clear(&mut self) {
		self.adapters.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use shopsearch_types::{ProductResult, SearchParams, SearchResult};

	#[derive(Debug)]
	struct StubAdapter {
		code: &'static str,
	}

	#[async_trait]
	impl MarketplaceAdapter for StubAdapter {
		fn marketplace_code(&self) -> &str {
			self.code
		}

		fn marketplace_name(&self) -> &str {
			"Stub"
		}

		async fn search(&self, _params: &SearchParams) -> MarketplaceResult<SearchResult> {
			Ok(SearchResult::new(vec![], 0, false, self.code))
		}

		async fn get_product(&self, product_id: &str) -> MarketplaceResult<ProductResult> {
			Err(MarketplaceError::not_found(self.code, product_id))
		}

		async fn health_check(&self) -> bool {
			true
		}

		async fn close(&self) -> MarketplaceResult<()> {
			Ok(())
		}
	}

	fn stub(code: &'static str) -> Arc<dyn MarketplaceAdapter> {
		Arc::new(StubAdapter { code })
	}

	#[test]
	fn test_register_and_resolve() {
		let mut factory = MarketplaceFactory::new();
		factory.register("ebay", stub("ebay")).unwrap();

		assert!(factory.is_registered("ebay"));
		assert_eq!(factory.get_adapter("ebay").unwrap().marketplace_code(), "ebay");
	}

	#[test]
	fn test_register_empty_code_rejected() {
		let mut factory = MarketplaceFactory::new();
		let err = factory.register("  ", stub("ebay")).unwrap_err();
		assert_eq!(err.code, shopsearch_types::ErrorCode::InvalidRequest);
	}

	#[test]
	fn test_unknown_code_is_typed_failure() {
		let factory = MarketplaceFactory::new();
		let err = factory.get_adapter("nope").unwrap_err();
		assert_eq!(err.code, shopsearch_types::ErrorCode::NotFound);
		assert_eq!(err.marketplace, "nope");
	}

	#[test]
	fn test_bulk_resolution_never_errors() {
		let mut factory = MarketplaceFactory::new();
		factory.register("ebay", stub("ebay")).unwrap();

		let results = factory.get_adapters(&["ebay".to_string(), "ghost".to_string()]);
		assert_eq!(results.len(), 2);
		assert!(results["ebay"].is_ok());
		assert!(results["ghost"].is_err());
	}

	#[test]
	fn test_unregister_and_clear() {
		let mut factory = MarketplaceFactory::new();
		factory.register("ebay", stub("ebay")).unwrap();
		factory.register("meli_ar", stub("meli_ar")).unwrap();

		assert_eq!(factory.registered_codes(), vec!["ebay", "meli_ar"]);
		assert!(factory.unregister("ebay"));
		assert!(!factory.unregister("ebay"));

		factory.clear();
		assert!(factory.registered_codes().is_empty());
		assert_eq!(factory.get_all_adapters().len(), 0);
	}
}
