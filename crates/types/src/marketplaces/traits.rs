//! Core adapter trait implemented once per marketplace provider

use async_trait::async_trait;
use std::fmt::Debug;

use super::MarketplaceResult;
use crate::products::{ProductResult, SearchResult};
use crate::search::SearchParams;

/// Contract every marketplace adapter implements
///
/// An adapter normalizes one provider's HTTP API into the common
/// search/get-product/healthcheck shape. Implementations own their HTTP
/// client and OAuth token lifecycle; all expected failures are returned as
/// [`MarketplaceError`](super::MarketplaceError) values.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync + Debug {
	/// Stable code identifying this marketplace (e.g. "ebay", "meli_cl")
	fn marketplace_code(&self) -> &str;

	/// Human-readable marketplace name
	fn marketplace_name(&self) -> &str;

	/// Execute a product search against the provider
	async fn search(&self, params: &SearchParams) -> MarketplaceResult<SearchResult>;

	/// Fetch a single product by provider item id
	async fn get_product(&self, product_id: &str) -> MarketplaceResult<ProductResult>;

	/// Cheap reachability probe; failures report `false` rather than erroring
	async fn health_check(&self) -> bool;

	/// Release the adapter's HTTP transport; must be idempotent
	async fn close(&self) -> MarketplaceResult<()>;
}
