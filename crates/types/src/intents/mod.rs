//! Structured search intent extracted from free-text user messages

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::products::Condition;
use crate::search::SortOrder;

/// Default number of results presented per search turn
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Structured search intent
///
/// Produced by the intent extraction step from a user's message (and prior
/// turns for refinements). `sort_criteria` is ordered with the primary key
/// first; lower-priority entries act as tie-breakers in the orchestrator's
/// stable multi-key sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIntent {
	/// Expanded query sent to providers
	pub query: String,
	/// The user's text, verbatim
	pub original_query: String,
	pub sort_order: Option<SortOrder>,
	pub min_price: Option<Decimal>,
	pub max_price: Option<Decimal>,
	pub require_free_shipping: bool,
	/// Minimum acceptable seller rating on the normalized 0-5 scale
	pub min_seller_rating: Option<f64>,
	pub condition: Option<Condition>,
	pub destination_country: Option<String>,
	pub estimate_import_taxes: bool,
	pub limit: usize,
	/// Stopword-free keywords used by the relevance filter
	pub keywords: Vec<String>,
	/// Ordered sort keys, primary first
	pub sort_criteria: Vec<SortOrder>,
}

impl SearchIntent {
	pub fn new(query: impl Into<String>, original_query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			original_query: original_query.into(),
			sort_order: None,
			min_price: None,
			max_price: None,
			require_free_shipping: false,
			min_seller_rating: None,
			condition: None,
			destination_country: None,
			estimate_import_taxes: false,
			limit: DEFAULT_RESULT_LIMIT,
			keywords: Vec::new(),
			sort_criteria: Vec::new(),
		}
	}

	/// Effective sort criteria: the explicit tuple when present, otherwise
	/// the single requested sort order, otherwise relevance
	pub fn effective_sort_criteria(&self) -> Vec<SortOrder> {
		if !self.sort_criteria.is_empty() {
			return self.sort_criteria.clone();
		}
		vec![self.sort_order.unwrap_or_default()]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_effective_sort_criteria_defaults_to_relevance() {
		let intent = SearchIntent::new("q", "q");
		assert_eq!(intent.effective_sort_criteria(), vec![SortOrder::Relevance]);
	}

	#[test]
	fn test_effective_sort_criteria_uses_single_sort_order() {
		let mut intent = SearchIntent::new("q", "q");
		intent.sort_order = Some(SortOrder::PriceAsc);
		assert_eq!(intent.effective_sort_criteria(), vec![SortOrder::PriceAsc]);
	}

	#[test]
	fn test_effective_sort_criteria_prefers_tuple() {
		let mut intent = SearchIntent::new("q", "q");
		intent.sort_order = Some(SortOrder::Newest);
		intent.sort_criteria = vec![SortOrder::PriceAsc, SortOrder::BestSeller];
		assert_eq!(
			intent.effective_sort_criteria(),
			vec![SortOrder::PriceAsc, SortOrder::BestSeller]
		);
	}
}
