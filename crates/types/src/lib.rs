//! Shopsearch Types
//!
//! Shared models and traits for the shopsearch marketplace aggregator.
//! This crate contains all domain models organized by business entity.

pub mod aggregation;
pub mod intents;
pub mod marketplaces;
pub mod models;
pub mod products;
pub mod search;
pub mod taxes;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

// Re-export commonly used types for convenience
pub use search::{SearchParams, SearchParamsError, SearchRequest, SortOrder, MAX_SEARCH_LIMIT};

pub use products::{Condition, ProductResult, SearchResult};

pub use marketplaces::{
	ErrorCode, MarketplaceAdapter, MarketplaceError, MarketplaceResult,
};

pub use intents::{SearchIntent, DEFAULT_RESULT_LIMIT};

pub use aggregation::{AggregatedResult, EnrichedProduct, MarketplaceSearchResult};

pub use taxes::{CountryTaxRate, TaxBreakdown};

pub use models::SecretString;
