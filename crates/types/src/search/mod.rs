//! Search request models and validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intents::SearchIntent;

/// Maximum number of results a single provider call may request
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Abstract sort order, mapped by each adapter to its provider-native token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	#[default]
	Relevance,
	PriceAsc,
	PriceDesc,
	Newest,
	BestSeller,
}

/// Validation errors raised when constructing [`SearchParams`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchParamsError {
	#[error("query must not be empty")]
	EmptyQuery,

	#[error("limit must be between 1 and {max}, got {got}", max = MAX_SEARCH_LIMIT)]
	InvalidLimit { got: usize },

	#[error("{field} must not be negative: {value}")]
	NegativePrice { field: &'static str, value: Decimal },

	#[error("min_price {min} must not exceed max_price {max}")]
	InvalidPriceRange { min: Decimal, max: Decimal },
}

/// Provider-facing search parameters
///
/// Validated at construction; an invalid combination is rejected immediately
/// instead of surfacing as a provider error later in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
	pub query: String,
	pub sort: SortOrder,
	pub min_price: Option<Decimal>,
	pub max_price: Option<Decimal>,
	pub limit: usize,
	pub offset: usize,
	pub category_id: Option<String>,
}

impl SearchParams {
	/// Create validated search parameters
	pub fn new(query: impl Into<String>, limit: usize) -> Result<Self, SearchParamsError> {
		let params = Self {
			query: query.into(),
			sort: SortOrder::Relevance,
			min_price: None,
			max_price: None,
			limit,
			offset: 0,
			category_id: None,
		};
		params.validate()?;
		Ok(params)
	}

	pub fn with_sort(mut self, sort: SortOrder) -> Self {
		self.sort = sort;
		self
	}

	pub fn with_offset(mut self, offset: usize) -> Self {
		self.offset = offset;
		self
	}

	pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
		self.category_id = Some(category_id.into());
		self
	}

	/// Set the price range, re-validating the combination
	pub fn with_price_range(
		mut self,
		min_price: Option<Decimal>,
		max_price: Option<Decimal>,
	) -> Result<Self, SearchParamsError> {
		self.min_price = min_price;
		self.max_price = max_price;
		self.validate()?;
		Ok(self)
	}

	fn validate(&self) -> Result<(), SearchParamsError> {
		if self.query.trim().is_empty() {
			return Err(SearchParamsError::EmptyQuery);
		}
		if self.limit == 0 || self.limit > MAX_SEARCH_LIMIT {
			return Err(SearchParamsError::InvalidLimit { got: self.limit });
		}
		if let Some(min) = self.min_price {
			if min.is_sign_negative() {
				return Err(SearchParamsError::NegativePrice {
					field: "min_price",
					value: min,
				});
			}
		}
		if let Some(max) = self.max_price {
			if max.is_sign_negative() {
				return Err(SearchParamsError::NegativePrice {
					field: "max_price",
					value: max,
				});
			}
		}
		if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
			if min > max {
				return Err(SearchParamsError::InvalidPriceRange { min, max });
			}
		}
		Ok(())
	}
}

/// Orchestrator-facing search request
///
/// Carries the extracted intent plus the marketplaces the caller wants
/// queried. The destination country, when present, enables import-tax
/// annotation of the aggregated results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub intent: SearchIntent,
	pub marketplace_codes: Vec<String>,
	pub user_id: Option<String>,
	pub destination_country: Option<String>,
}

impl SearchRequest {
	pub fn new(intent: SearchIntent, marketplace_codes: Vec<String>) -> Self {
		Self {
			intent,
			marketplace_codes,
			user_id: None,
			destination_country: None,
		}
	}

	pub fn with_destination(mut self, country: impl Into<String>) -> Self {
		self.destination_country = Some(country.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_valid_params() {
		let params = SearchParams::new("nintendo switch", 20).unwrap();
		assert_eq!(params.limit, 20);
		assert_eq!(params.offset, 0);
		assert_eq!(params.sort, SortOrder::Relevance);
	}

	#[test]
	fn test_empty_query_rejected() {
		assert_eq!(
			SearchParams::new("   ", 10).unwrap_err(),
			SearchParamsError::EmptyQuery
		);
	}

	#[test]
	fn test_limit_bounds() {
		assert!(matches!(
			SearchParams::new("x", 0).unwrap_err(),
			SearchParamsError::InvalidLimit { got: 0 }
		));
		assert!(matches!(
			SearchParams::new("x", 101).unwrap_err(),
			SearchParamsError::InvalidLimit { got: 101 }
		));
		assert!(SearchParams::new("x", 100).is_ok());
		assert!(SearchParams::new("x", 1).is_ok());
	}

	#[test]
	fn test_negative_prices_rejected() {
		let err = SearchParams::new("x", 10)
			.unwrap()
			.with_price_range(Some(dec!(-1)), None)
			.unwrap_err();
		assert!(matches!(err, SearchParamsError::NegativePrice { field: "min_price", .. }));

		let err = SearchParams::new("x", 10)
			.unwrap()
			.with_price_range(None, Some(dec!(-0.01)))
			.unwrap_err();
		assert!(matches!(err, SearchParamsError::NegativePrice { field: "max_price", .. }));
	}

	#[test]
	fn test_inverted_price_range_rejected() {
		let err = SearchParams::new("x", 10)
			.unwrap()
			.with_price_range(Some(dec!(50)), Some(dec!(10)))
			.unwrap_err();
		assert!(matches!(err, SearchParamsError::InvalidPriceRange { .. }));
	}

	#[test]
	fn test_valid_price_range() {
		let params = SearchParams::new("x", 10)
			.unwrap()
			.with_price_range(Some(dec!(10)), Some(dec!(50)))
			.unwrap();
		assert_eq!(params.min_price, Some(dec!(10)));
		assert_eq!(params.max_price, Some(dec!(50)));
	}
}
