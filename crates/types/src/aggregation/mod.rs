//! Aggregation models produced by the search orchestrator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::products::{ProductResult, SearchResult};
use crate::search::SortOrder;
use crate::taxes::TaxBreakdown;

/// A product annotated with marketplace origin and ranking metadata
///
/// Deliberately mutable: the orchestrator sets `price_rank`,
/// `is_best_price` and `tax_info` in later passes over the same objects,
/// all within the lifetime of one `search()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedProduct {
	pub product: ProductResult,
	pub marketplace_code: String,
	pub marketplace_name: String,
	pub is_best_price: bool,
	/// 1-based position by ascending comparable price
	pub price_rank: Option<usize>,
	pub tax_info: Option<TaxBreakdown>,
}

impl EnrichedProduct {
	pub fn new(
		product: ProductResult,
		marketplace_code: impl Into<String>,
		marketplace_name: impl Into<String>,
	) -> Self {
		Self {
			product,
			marketplace_code: marketplace_code.into(),
			marketplace_name: marketplace_name.into(),
			is_best_price: false,
			price_rank: None,
			tax_info: None,
		}
	}

	/// Price used for cross-product comparison: the tax-inclusive landed
	/// cost when a breakdown was computed, otherwise price plus shipping
	pub fn comparable_price(&self) -> Decimal {
		match &self.tax_info {
			Some(tax) => tax.total_cost,
			None => self.product.total_price(),
		}
	}
}

/// Outcome of querying one marketplace during a fan-out
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketplaceSearchResult {
	pub products: Vec<EnrichedProduct>,
	pub total_count: u64,
	pub has_more: bool,
	pub error: Option<String>,
}

impl MarketplaceSearchResult {
	/// Build a successful per-marketplace result from an adapter response
	pub fn from_search(result: SearchResult, marketplace_name: &str) -> Self {
		let marketplace_code = result.marketplace.clone();
		let products = result
			.products
			.into_iter()
			.map(|p| EnrichedProduct::new(p, marketplace_code.clone(), marketplace_name))
			.collect();
		Self {
			products,
			total_count: result.total_count,
			has_more: result.has_more,
			error: None,
		}
	}

	/// Build a failed per-marketplace result carrying only an error string
	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			products: Vec::new(),
			total_count: 0,
			has_more: false,
			error: Some(error.into()),
		}
	}

	pub fn is_success(&self) -> bool {
		self.error.is_none()
	}
}

/// Final orchestrator output for one search call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
	/// Sorted, filtered and limited products across all marketplaces
	pub products: Vec<EnrichedProduct>,
	/// Per-marketplace outcomes, keyed by marketplace code
	pub marketplace_results: HashMap<String, MarketplaceSearchResult>,
	/// Total matching products after relevance filtering
	pub total_count: u64,
	pub sort_order: SortOrder,
	pub query: String,
	pub has_more: bool,
}

impl AggregatedResult {
	/// Number of marketplaces that answered without error
	pub fn successful_marketplaces(&self) -> usize {
		self.marketplace_results
			.values()
			.filter(|r| r.is_success())
			.count()
	}

	/// Codes of marketplaces whose search failed
	pub fn failed_marketplaces(&self) -> Vec<String> {
		let mut codes: Vec<String> = self
			.marketplace_results
			.iter()
			.filter(|(_, r)| !r.is_success())
			.map(|(code, _)| code.clone())
			.collect();
		codes.sort();
		codes
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn enriched(price: Decimal) -> EnrichedProduct {
		let product = ProductResult::new("1", "ebay", "item", price, "USD", "https://e/1");
		EnrichedProduct::new(product, "ebay", "eBay")
	}

	#[test]
	fn test_comparable_price_without_tax_info() {
		let mut p = enriched(dec!(100));
		p.product.shipping_cost = Some(dec!(10));
		assert_eq!(p.comparable_price(), dec!(110));
	}

	#[test]
	fn test_comparable_price_prefers_tax_total() {
		let mut p = enriched(dec!(100));
		p.tax_info = Some(TaxBreakdown::zero(
			dec!(100),
			dec!(10),
			"CL",
			"Chile",
			"below de minimis",
		));
		assert_eq!(p.comparable_price(), dec!(110));
		p.tax_info.as_mut().unwrap().total_cost = dec!(138.04);
		assert_eq!(p.comparable_price(), dec!(138.04));
	}

	#[test]
	fn test_marketplace_result_success_flag() {
		let ok = MarketplaceSearchResult::from_search(
			SearchResult::new(vec![], 0, false, "ebay"),
			"eBay",
		);
		assert!(ok.is_success());

		let failed = MarketplaceSearchResult::failed("timed out");
		assert!(!failed.is_success());
		assert_eq!(failed.error.as_deref(), Some("timed out"));
	}

	#[test]
	fn test_aggregated_result_marketplace_accounting() {
		let mut marketplace_results = HashMap::new();
		marketplace_results.insert(
			"ebay".to_string(),
			MarketplaceSearchResult::from_search(SearchResult::new(vec![], 3, false, "ebay"), "eBay"),
		);
		marketplace_results.insert(
			"meli_ar".to_string(),
			MarketplaceSearchResult::failed("http 503"),
		);

		let result = AggregatedResult {
			products: vec![],
			marketplace_results,
			total_count: 3,
			sort_order: SortOrder::Relevance,
			query: "q".to_string(),
			has_more: false,
		};

		assert_eq!(result.successful_marketplaces(), 1);
		assert_eq!(result.failed_marketplaces(), vec!["meli_ar".to_string()]);
	}
}
