//! MercadoLibre adapter, parameterized per regional site
//!
//! One adapter type covers the Argentina/Brazil/Chile/Mexico sites; the site
//! selects the endpoint path, marketplace code and display name. The public
//! site search endpoint works unauthenticated, but OAuth credentials can be
//! attached for higher rate limits.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use shopsearch_types::{
	Condition, MarketplaceAdapter, MarketplaceError, MarketplaceResult, ProductResult,
	SearchParams, SearchResult, SortOrder,
};

use crate::http::{HttpClientConfig, OAuthCredentials, OAuthHttpClient};
use crate::parse::{decimal_from_value, f64_from_value, str_field};

pub const MELI_DEFAULT_BASE_URL: &str = "https://api.mercadolibre.com";
pub const MELI_TOKEN_URL: &str = "https://api.mercadolibre.com/oauth/token";

/// Regional MercadoLibre site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeliSite {
	Argentina,
	Brazil,
	Chile,
	Mexico,
}

impl MeliSite {
	/// Provider site id used in API paths
	pub fn site_id(&self) -> &'static str {
		match self {
			Self::Argentina => "MLA",
			Self::Brazil => "MLB",
			Self::Chile => "MLC",
			Self::Mexico => "MLM",
		}
	}

	/// Marketplace code used across the aggregator
	pub fn marketplace_code(&self) -> &'static str {
		match self {
			Self::Argentina => "meli_ar",
			Self::Brazil => "meli_br",
			Self::Chile => "meli_cl",
			Self::Mexico => "meli_mx",
		}
	}

	pub fn marketplace_name(&self) -> &'static str {
		match self {
			Self::Argentina => "MercadoLibre Argentina",
			Self::Brazil => "Mercado Livre Brasil",
			Self::Chile => "MercadoLibre Chile",
			Self::Mexico => "MercadoLibre México",
		}
	}

	/// Inverse of [`marketplace_code`](Self::marketplace_code)
	pub fn from_marketplace_code(code: &str) -> Option<Self> {
		match code {
			"meli_ar" => Some(Self::Argentina),
			"meli_br" => Some(Self::Brazil),
			"meli_cl" => Some(Self::Chile),
			"meli_mx" => Some(Self::Mexico),
			_ => None,
		}
	}
}

/// MercadoLibre marketplace adapter
#[derive(Debug)]
pub struct MercadoLibreAdapter {
	site: MeliSite,
	http: OAuthHttpClient,
}

impl MercadoLibreAdapter {
	/// Unauthenticated adapter against the public search endpoints
	pub fn new(site: MeliSite) -> Self {
		Self::with_config(site, HttpClientConfig::new(site.marketplace_code(), MELI_DEFAULT_BASE_URL))
	}

	/// Authenticated adapter using OAuth2 client credentials
	pub fn with_credentials(
		site: MeliSite,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		let config = HttpClientConfig::new(site.marketplace_code(), MELI_DEFAULT_BASE_URL)
			.with_credentials(OAuthCredentials {
				token_url: MELI_TOKEN_URL.to_string(),
				client_id: client_id.into(),
				client_secret: client_secret.into().into(),
				scope: None,
			});
		Self::with_config(site, config)
	}

	pub fn with_config(site: MeliSite, config: HttpClientConfig) -> Self {
		Self {
			site,
			http: OAuthHttpClient::new(config),
		}
	}

	/// Map the abstract sort order onto MercadoLibre's sort token
	///
	/// Total over [`SortOrder`]; orderings the provider cannot express fall
	/// back to relevance.
	pub fn provider_sort(sort: SortOrder) -> &'static str {
		match sort {
			SortOrder::PriceAsc => "price_asc",
			SortOrder::PriceDesc => "price_desc",
			SortOrder::Relevance | SortOrder::Newest | SortOrder::BestSeller => "relevance",
		}
	}

	fn build_query(params: &SearchParams) -> Vec<(&'static str, String)> {
		let mut query = vec![
			("q", params.query.clone()),
			("limit", params.limit.to_string()),
			("offset", params.offset.to_string()),
		];

		let sort = Self::provider_sort(params.sort);
		if sort != "relevance" {
			query.push(("sort", sort.to_string()));
		}

		if let Some(range) = Self::price_filter(params) {
			query.push(("price", range));
		}
		if let Some(category_id) = &params.category_id {
			query.push(("category", category_id.clone()));
		}

		query
	}

	/// MercadoLibre price filter syntax: `10-50`, `10-*`, `*-50`
	fn price_filter(params: &SearchParams) -> Option<String> {
		match (params.min_price, params.max_price) {
			(Some(min), Some(max)) => Some(format!("{}-{}", min, max)),
			(Some(min), None) => Some(format!("{}-*", min)),
			(None, Some(max)) => Some(format!("*-{}", max)),
			(None, None) => None,
		}
	}

	/// Normalize MercadoLibre's condition vocabulary
	pub fn normalize_condition(raw: &str) -> Condition {
		match raw.to_lowercase().as_str() {
			"used" | "usado" => Condition::Used,
			"refurbished" | "reconditioned" | "reacondicionado" => Condition::Refurbished,
			_ => Condition::New,
		}
	}

	/// Normalize a positive-transaction ratio (0-1) onto the 0-5 scale
	pub fn normalize_rating(positive_ratio: f64) -> f64 {
		(positive_ratio * 5.0).clamp(0.0, 5.0)
	}

	fn parse_item(&self, item: &Value) -> Result<ProductResult, String> {
		let id = str_field(item, "id").ok_or("missing id")?;
		let title = str_field(item, "title").ok_or("missing title")?;
		let price = item
			.get("price")
			.and_then(decimal_from_value)
			.ok_or("unparseable price")?;
		let currency = str_field(item, "currency_id").unwrap_or("USD");
		let url = str_field(item, "permalink").ok_or("missing permalink")?;

		let mut product = ProductResult::new(
			id,
			self.site.marketplace_code(),
			title,
			price,
			currency,
			url,
		);

		product.image_url = str_field(item, "thumbnail").map(String::from);
		product.condition = str_field(item, "condition").map(Self::normalize_condition);
		product.free_shipping = item
			.get("shipping")
			.and_then(|s| s.get("free_shipping"))
			.and_then(Value::as_bool)
			.unwrap_or(false);
		product.available_quantity = item.get("available_quantity").and_then(Value::as_u64);

		if let Some(seller) = item.get("seller") {
			product.seller_name = str_field(seller, "nickname").map(String::from);
			product.seller_rating = seller
				.get("seller_reputation")
				.and_then(|r| r.get("transactions"))
				.and_then(|t| t.get("ratings"))
				.and_then(|r| r.get("positive"))
				.and_then(f64_from_value)
				.map(Self::normalize_rating);
		}

		Ok(product)
	}

	fn parse_search_response(
		&self,
		body: &Value,
		params: &SearchParams,
	) -> MarketplaceResult<SearchResult> {
		let code = self.site.marketplace_code();

		let paging = body.get("paging").ok_or_else(|| {
			MarketplaceError::parse(code, "search response missing 'paging'")
		})?;
		let total = paging.get("total").and_then(Value::as_u64).ok_or_else(|| {
			MarketplaceError::parse(code, "paging metadata missing 'total'")
		})?;
		let raw_items = body.get("results").and_then(Value::as_array).ok_or_else(|| {
			MarketplaceError::parse(code, "search response missing 'results'")
		})?;

		let mut products = Vec::with_capacity(raw_items.len());
		for item in raw_items {
			match self.parse_item(item) {
				Ok(product) => products.push(product),
				Err(reason) => {
					warn!("skipping unparseable {} item: {}", code, reason);
				},
			}
		}

		let has_more = ((params.offset + params.limit) as u64) < total;

		Ok(SearchResult::new(products, total, has_more, code))
	}
}

#[async_trait]
impl MarketplaceAdapter for MercadoLibreAdapter {
	fn marketplace_code(&self) -> &str {
		self.site.marketplace_code()
	}

	fn marketplace_name(&self) -> &str {
		self.site.marketplace_name()
	}

	async fn search(&self, params: &SearchParams) -> MarketplaceResult<SearchResult> {
		debug!(
			"{} search: '{}' (limit {}, offset {})",
			self.site.marketplace_code(),
			params.query,
			params.limit,
			params.offset
		);

		let path = format!("sites/{}/search", self.site.site_id());
		let query = Self::build_query(params);
		let body = self.http.get_json(&path, &query).await?;
		self.parse_search_response(&body, params)
	}

	async fn get_product(&self, product_id: &str) -> MarketplaceResult<ProductResult> {
		let path = format!("items/{}", product_id);
		let body = self.http.get_json(&path, &[]).await?;
		self.parse_item(&body).map_err(|reason| {
			MarketplaceError::parse(
				self.site.marketplace_code(),
				format!("item {} unparseable: {}", product_id, reason),
			)
		})
	}

	async fn health_check(&self) -> bool {
		let path = format!("sites/{}/search", self.site.site_id());
		let probe = [("q", "test".to_string()), ("limit", "1".to_string())];
		match self.http.get_json(&path, &probe).await {
			Ok(_) => true,
			Err(e) => {
				warn!("{} health check failed: {}", self.site.marketplace_code(), e);
				false
			},
		}
	}

	async fn close(&self) -> MarketplaceResult<()> {
		self.http.close();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;
	use serde_json::json;

	fn adapter() -> MercadoLibreAdapter {
		MercadoLibreAdapter::new(MeliSite::Chile)
	}

	fn sample_item() -> Value {
		json!({
			"id": "MLC12345",
			"title": "Notebook Lenovo IdeaPad 3",
			"price": 349990,
			"currency_id": "CLP",
			"permalink": "https://articulo.mercadolibre.cl/MLC12345",
			"thumbnail": "https://http2.mlstatic.com/MLC12345.jpg",
			"condition": "new",
			"available_quantity": 7,
			"shipping": {"free_shipping": true},
			"seller": {
				"nickname": "TECNOSTORE",
				"seller_reputation": {
					"transactions": {"ratings": {"positive": 0.97}}
				}
			}
		})
	}

	#[test]
	fn test_site_identifiers() {
		assert_eq!(MeliSite::Argentina.site_id(), "MLA");
		assert_eq!(MeliSite::Brazil.site_id(), "MLB");
		assert_eq!(MeliSite::Chile.site_id(), "MLC");
		assert_eq!(MeliSite::Mexico.site_id(), "MLM");
		assert_eq!(MeliSite::Chile.marketplace_code(), "meli_cl");
	}

	#[test]
	fn test_sort_mapping_is_total() {
		assert_eq!(MercadoLibreAdapter::provider_sort(SortOrder::PriceAsc), "price_asc");
		assert_eq!(MercadoLibreAdapter::provider_sort(SortOrder::PriceDesc), "price_desc");
		// Orderings the provider cannot express fall back to relevance
		assert_eq!(MercadoLibreAdapter::provider_sort(SortOrder::Relevance), "relevance");
		assert_eq!(MercadoLibreAdapter::provider_sort(SortOrder::Newest), "relevance");
		assert_eq!(MercadoLibreAdapter::provider_sort(SortOrder::BestSeller), "relevance");
	}

	#[test]
	fn test_price_filter_variants() {
		let base = SearchParams::new("x", 10).unwrap();
		assert_eq!(MercadoLibreAdapter::price_filter(&base), None);

		let both = base
			.clone()
			.with_price_range(Some(dec!(10)), Some(dec!(50)))
			.unwrap();
		assert_eq!(MercadoLibreAdapter::price_filter(&both).unwrap(), "10-50");

		let min_only = base.clone().with_price_range(Some(dec!(10)), None).unwrap();
		assert_eq!(MercadoLibreAdapter::price_filter(&min_only).unwrap(), "10-*");

		let max_only = base.with_price_range(None, Some(dec!(50))).unwrap();
		assert_eq!(MercadoLibreAdapter::price_filter(&max_only).unwrap(), "*-50");
	}

	#[test]
	fn test_condition_normalization() {
		assert_eq!(MercadoLibreAdapter::normalize_condition("new"), Condition::New);
		assert_eq!(MercadoLibreAdapter::normalize_condition("used"), Condition::Used);
		assert_eq!(MercadoLibreAdapter::normalize_condition("usado"), Condition::Used);
		assert_eq!(
			MercadoLibreAdapter::normalize_condition("reacondicionado"),
			Condition::Refurbished
		);
		assert_eq!(MercadoLibreAdapter::normalize_condition("???"), Condition::New);
	}

	#[test]
	fn test_rating_normalization_from_ratio() {
		assert!((MercadoLibreAdapter::normalize_rating(0.97) - 4.85).abs() < 1e-9);
		assert_eq!(MercadoLibreAdapter::normalize_rating(1.0), 5.0);
		assert_eq!(MercadoLibreAdapter::normalize_rating(0.0), 0.0);
		assert_eq!(MercadoLibreAdapter::normalize_rating(1.4), 5.0);
	}

	#[test]
	fn test_parse_item() {
		let product = adapter().parse_item(&sample_item()).unwrap();
		assert_eq!(product.id, "MLC12345");
		assert_eq!(product.marketplace, "meli_cl");
		assert_eq!(product.price, dec!(349990));
		assert_eq!(product.currency, "CLP");
		assert!(product.free_shipping);
		assert_eq!(product.available_quantity, Some(7));
		assert_eq!(product.seller_name.as_deref(), Some("TECNOSTORE"));
		assert!((product.seller_rating.unwrap() - 4.85).abs() < 1e-9);
	}

	#[test]
	fn test_bad_item_is_skipped_not_fatal() {
		let params = SearchParams::new("notebook", 10).unwrap();
		let body = json!({
			"paging": {"total": 2, "offset": 0, "limit": 10},
			"results": [sample_item(), {"id": "MLC999", "title": "no price"}]
		});

		let result = adapter().parse_search_response(&body, &params).unwrap();
		assert_eq!(result.products.len(), 1);
		assert_eq!(result.total_count, 2);
		assert!(!result.has_more);
	}

	#[test]
	fn test_missing_paging_is_structural_error() {
		let params = SearchParams::new("notebook", 10).unwrap();
		let body = json!({"results": []});
		let err = adapter().parse_search_response(&body, &params).unwrap_err();
		assert_eq!(err.code, shopsearch_types::ErrorCode::Parse);
	}

	#[test]
	fn test_has_more_from_paging_total() {
		let params = SearchParams::new("notebook", 10).unwrap();
		let body = json!({
			"paging": {"total": 50, "offset": 0, "limit": 10},
			"results": []
		});
		assert!(adapter().parse_search_response(&body, &params).unwrap().has_more);
	}
}
