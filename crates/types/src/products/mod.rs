//! Normalized product models shared by every marketplace adapter

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalized item condition
///
/// Providers use heterogeneous vocabularies ("Pre-owned",
/// "Certified - Refurbished", "reconditioned", ...); adapters map them onto
/// this three-value enum, defaulting to `New` for unknown values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
	#[default]
	New,
	Used,
	Refurbished,
}

/// A single normalized search result item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResult {
	pub id: String,
	pub marketplace: String,
	pub title: String,
	pub price: Decimal,
	pub currency: String,
	pub url: String,
	pub image_url: Option<String>,
	pub seller_name: Option<String>,
	/// Normalized seller rating on a 0-5 scale
	pub seller_rating: Option<f64>,
	pub condition: Option<Condition>,
	pub shipping_cost: Option<Decimal>,
	pub free_shipping: bool,
	pub available_quantity: Option<u64>,
}

impl ProductResult {
	pub fn new(
		id: impl Into<String>,
		marketplace: impl Into<String>,
		title: impl Into<String>,
		price: Decimal,
		currency: impl Into<String>,
		url: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			marketplace: marketplace.into(),
			title: title.into(),
			price,
			currency: currency.into(),
			url: url.into(),
			image_url: None,
			seller_name: None,
			seller_rating: None,
			condition: None,
			shipping_cost: None,
			free_shipping: false,
			available_quantity: None,
		}
	}

	/// Item price plus shipping, when shipping is known and not free
	pub fn total_price(&self) -> Decimal {
		match (self.free_shipping, self.shipping_cost) {
			(false, Some(shipping)) => self.price + shipping,
			_ => self.price,
		}
	}
}

/// Per-adapter search outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
	pub products: Vec<ProductResult>,
	pub total_count: u64,
	pub has_more: bool,
	pub marketplace: String,
}

impl SearchResult {
	pub fn new(products: Vec<ProductResult>, total_count: u64, has_more: bool, marketplace: impl Into<String>) -> Self {
		Self {
			products,
			total_count,
			has_more,
			marketplace: marketplace.into(),
		}
	}
}
