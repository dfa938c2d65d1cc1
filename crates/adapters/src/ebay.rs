//! eBay Browse API adapter
//!
//! Normalizes eBay's item summary search into the common marketplace
//! contract. Requires OAuth2 client-credentials; eBay tokens are scoped to
//! the public buy.browse scope.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use shopsearch_types::{
	Condition, MarketplaceAdapter, MarketplaceError, MarketplaceResult, ProductResult,
	SearchParams, SearchResult, SortOrder,
};

use crate::http::{HttpClientConfig, OAuthCredentials, OAuthHttpClient};
use crate::parse::{decimal_from_value, f64_from_value, str_field};

pub const EBAY_MARKETPLACE_CODE: &str = "ebay";
pub const EBAY_DEFAULT_BASE_URL: &str = "https://api.ebay.com/buy/browse/v1";
pub const EBAY_TOKEN_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";
const EBAY_BROWSE_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Provider token eBay uses for its default relevance ordering
const EBAY_DEFAULT_SORT: &str = "BEST_MATCH";

/// eBay marketplace adapter
#[derive(Debug)]
pub struct EbayAdapter {
	http: OAuthHttpClient,
}

impl EbayAdapter {
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self::with_base_url(client_id, client_secret, EBAY_DEFAULT_BASE_URL, EBAY_TOKEN_URL)
	}

	/// Point the adapter at a non-default host, e.g. the sandbox environment
	pub fn with_base_url(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		base_url: impl Into<String>,
		token_url: impl Into<String>,
	) -> Self {
		let config = HttpClientConfig::new(EBAY_MARKETPLACE_CODE, base_url).with_credentials(
			OAuthCredentials {
				token_url: token_url.into(),
				client_id: client_id.into(),
				client_secret: client_secret.into().into(),
				scope: Some(EBAY_BROWSE_SCOPE.to_string()),
			},
		);
		Self {
			http: OAuthHttpClient::new(config),
		}
	}

	/// Map the abstract sort order onto eBay's sort token
	///
	/// Total over [`SortOrder`]: values eBay has no native ordering for fall
	/// back to best match.
	pub fn provider_sort(sort: SortOrder) -> &'static str {
		match sort {
			SortOrder::PriceAsc => "price",
			SortOrder::PriceDesc => "-price",
			SortOrder::Newest => "newlyListed",
			SortOrder::Relevance | SortOrder::BestSeller => EBAY_DEFAULT_SORT,
		}
	}

	fn build_query(params: &SearchParams) -> Vec<(&'static str, String)> {
		let mut query = vec![
			("q", params.query.clone()),
			("limit", params.limit.to_string()),
			("offset", params.offset.to_string()),
		];

		let sort = Self::provider_sort(params.sort);
		if sort != EBAY_DEFAULT_SORT {
			query.push(("sort", sort.to_string()));
		}

		if let Some(filter) = Self::price_filter(params) {
			query.push(("filter", filter));
		}
		if let Some(category_id) = &params.category_id {
			query.push(("category_ids", category_id.clone()));
		}

		query
	}

	/// eBay price filter syntax: `price:[10..50],priceCurrency:USD`
	fn price_filter(params: &SearchParams) -> Option<String> {
		let range = match (params.min_price, params.max_price) {
			(Some(min), Some(max)) => format!("[{}..{}]", min, max),
			(Some(min), None) => format!("[{}..]", min),
			(None, Some(max)) => format!("[..{}]", max),
			(None, None) => return None,
		};
		Some(format!("price:{},priceCurrency:USD", range))
	}

	/// Normalize eBay's condition vocabulary
	pub fn normalize_condition(raw: &str) -> Condition {
		match raw.to_uppercase().as_str() {
			"USED" | "PRE-OWNED" | "VERY GOOD" | "GOOD" | "ACCEPTABLE" => Condition::Used,
			"REFURBISHED"
			| "CERTIFIED - REFURBISHED"
			| "SELLER REFURBISHED"
			| "EXCELLENT - REFURBISHED"
			| "VERY GOOD - REFURBISHED"
			| "GOOD - REFURBISHED" => Condition::Refurbished,
			// "NEW", "NEW WITH DEFECTS", open-box variants and anything
			// unrecognized default to new
			_ => Condition::New,
		}
	}

	/// Normalize feedback percentage (0-100) onto the common 0-5 scale
	pub fn normalize_rating(feedback_percentage: f64) -> f64 {
		(feedback_percentage / 100.0 * 5.0).clamp(0.0, 5.0)
	}

	/// Parse one item summary; item-level problems abort only this item
	fn parse_item(&self, item: &Value) -> Result<ProductResult, String> {
		let id = str_field(item, "itemId").ok_or("missing itemId")?;
		let title = str_field(item, "title").ok_or("missing title")?;
		let price_obj = item.get("price").ok_or("missing price")?;
		let price = price_obj
			.get("value")
			.and_then(decimal_from_value)
			.ok_or("unparseable price value")?;
		let currency = str_field(price_obj, "currency").unwrap_or("USD");
		let url = str_field(item, "itemWebUrl").ok_or("missing itemWebUrl")?;

		let mut product = ProductResult::new(id, EBAY_MARKETPLACE_CODE, title, price, currency, url);

		product.image_url = item
			.get("image")
			.and_then(|img| str_field(img, "imageUrl"))
			.map(String::from);

		if let Some(seller) = item.get("seller") {
			product.seller_name = str_field(seller, "username").map(String::from);
			product.seller_rating = seller
				.get("feedbackPercentage")
				.and_then(f64_from_value)
				.map(Self::normalize_rating);
		}

		product.condition = str_field(item, "condition").map(Self::normalize_condition);

		if let Some(option) = item
			.get("shippingOptions")
			.and_then(Value::as_array)
			.and_then(|opts| opts.first())
		{
			product.free_shipping =
				str_field(option, "shippingCostType").is_some_and(|t| t.eq_ignore_ascii_case("FREE"));
			product.shipping_cost = option
				.get("shippingCost")
				.and_then(|c| c.get("value"))
				.and_then(decimal_from_value);
		}

		product.available_quantity = item
			.get("estimatedAvailabilities")
			.and_then(Value::as_array)
			.and_then(|a| a.first())
			.and_then(|a| a.get("estimatedAvailableQuantity"))
			.and_then(Value::as_u64);

		Ok(product)
	}

	fn parse_search_response(
		&self,
		body: &Value,
		params: &SearchParams,
	) -> MarketplaceResult<SearchResult> {
		if !body.is_object() {
			return Err(MarketplaceError::parse(
				EBAY_MARKETPLACE_CODE,
				"search response is not a JSON object",
			));
		}

		let total = body.get("total").and_then(Value::as_u64).ok_or_else(|| {
			MarketplaceError::parse(EBAY_MARKETPLACE_CODE, "search response missing 'total'")
		})?;

		// eBay omits itemSummaries entirely for zero-hit searches
		let raw_items = body
			.get("itemSummaries")
			.and_then(Value::as_array)
			.cloned()
			.unwrap_or_default();

		let mut products = Vec::with_capacity(raw_items.len());
		for item in &raw_items {
			match self.parse_item(item) {
				Ok(product) => products.push(product),
				Err(reason) => {
					warn!("skipping unparseable eBay item: {}", reason);
				},
			}
		}

		let has_more = ((params.offset + params.limit) as u64) < total;

		Ok(SearchResult::new(products, total, has_more, EBAY_MARKETPLACE_CODE))
	}
}

#[async_trait]
impl MarketplaceAdapter for EbayAdapter {
	fn marketplace_code(&self) -> &str {
		EBAY_MARKETPLACE_CODE
	}

	fn marketplace_name(&self) -> &str {
		"eBay"
	}

	async fn search(&self, params: &SearchParams) -> MarketplaceResult<SearchResult> {
		debug!("eBay search: '{}' (limit {}, offset {})", params.query, params.limit, params.offset);

		let query = Self::build_query(params);
		let body = self.http.get_json("item_summary/search", &query).await?;
		self.parse_search_response(&body, params)
	}

	async fn get_product(&self, product_id: &str) -> MarketplaceResult<ProductResult> {
		let path = format!("item/{}", product_id);
		let body = self.http.get_json(&path, &[]).await?;
		self.parse_item(&body).map_err(|reason| {
			MarketplaceError::parse(
				EBAY_MARKETPLACE_CODE,
				format!("item {} unparseable: {}", product_id, reason),
			)
		})
	}

	async fn health_check(&self) -> bool {
		let probe = [("q", "test".to_string()), ("limit", "1".to_string())];
		match self.http.get_json("item_summary/search", &probe).await {
			Ok(_) => true,
			Err(e) => {
				warn!("eBay health check failed: {}", e);
				false
			},
		}
	}

	async fn close(&self) -> MarketplaceResult<()> {
		self.http.close();
		Ok(())
	}
}
