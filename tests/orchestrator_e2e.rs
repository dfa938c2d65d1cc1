//! End-to-end orchestrator tests over mock marketplace adapters

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use shopsearch::mocks::MockMarketplaceAdapter;
use shopsearch::{
	Condition, MarketplaceFactory, OrchestratorConfig, OrchestratorError, ProductResult,
	SearchIntent, SearchOrchestrator, SearchRequest, SortOrder,
};

fn widget(id: &str, marketplace: &str, price: rust_decimal::Decimal) -> ProductResult {
	MockMarketplaceAdapter::product(id, marketplace, &format!("Gaming Widget Pro {}", id), price)
}

fn orchestrator(adapters: Vec<(&str, MockMarketplaceAdapter)>) -> SearchOrchestrator {
	let mut factory = MarketplaceFactory::new();
	for (code, adapter) in adapters {
		factory.register(code, Arc::new(adapter)).unwrap();
	}
	SearchOrchestrator::new(Arc::new(factory))
}

fn request(codes: &[&str]) -> SearchRequest {
	let intent = SearchIntent::new("gaming widget", "I want a gaming widget");
	SearchRequest::new(intent, codes.iter().map(|c| c.to_string()).collect())
}

#[tokio::test]
async fn partial_failure_still_returns_results() {
	let orchestrator = orchestrator(vec![
		(
			"ebay",
			MockMarketplaceAdapter::with_products("ebay", vec![widget("a", "ebay", dec!(50))]),
		),
		(
			"meli_cl",
			MockMarketplaceAdapter::failing("meli_cl", "upstream 503"),
		),
	]);

	let result = orchestrator.search(&request(&["ebay", "meli_cl"])).await.unwrap();

	assert_eq!(result.products.len(), 1);
	assert_eq!(result.successful_marketplaces(), 1);
	assert_eq!(result.failed_marketplaces(), vec!["meli_cl".to_string()]);
	assert!(result.marketplace_results["meli_cl"]
		.error
		.as_deref()
		.unwrap()
		.contains("upstream 503"));
}

#[tokio::test]
async fn all_marketplaces_failing_is_not_an_error() {
	let orchestrator = orchestrator(vec![
		("ebay", MockMarketplaceAdapter::failing("ebay", "down")),
		("meli_cl", MockMarketplaceAdapter::failing("meli_cl", "down")),
	]);

	let result = orchestrator.search(&request(&["ebay", "meli_cl"])).await.unwrap();

	assert!(result.products.is_empty());
	assert_eq!(result.successful_marketplaces(), 0);
	assert_eq!(result.failed_marketplaces().len(), 2);
}

#[tokio::test]
async fn empty_marketplace_list_is_rejected() {
	let orchestrator = orchestrator(vec![]);
	let err = orchestrator.search(&request(&[])).await.unwrap_err();
	assert!(matches!(err, OrchestratorError::NoMarketplacesSpecified));
}

#[tokio::test]
async fn unknown_codes_are_skipped_unless_all_unknown() {
	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products("ebay", vec![widget("a", "ebay", dec!(50))]),
	)]);

	// One known code: the unknown one is skipped
	let result = orchestrator.search(&request(&["ebay", "ghost"])).await.unwrap();
	assert_eq!(result.products.len(), 1);
	assert!(!result.marketplace_results.contains_key("ghost"));

	// No known codes at all: the request fails
	let err = orchestrator.search(&request(&["ghost"])).await.unwrap_err();
	assert!(matches!(err, OrchestratorError::NoValidAdapters { .. }));
}

#[tokio::test]
async fn slow_marketplace_is_timed_out_in_isolation() {
	let orchestrator = orchestrator(vec![
		(
			"ebay",
			MockMarketplaceAdapter::with_products("ebay", vec![widget("a", "ebay", dec!(50))]),
		),
		(
			"meli_cl",
			MockMarketplaceAdapter::with_products("meli_cl", vec![widget("b", "meli_cl", dec!(40))])
				.with_delay(Duration::from_millis(500)),
		),
	])
	.with_config(OrchestratorConfig {
		per_marketplace_timeout_ms: 50,
		..Default::default()
	});

	let result = orchestrator.search(&request(&["ebay", "meli_cl"])).await.unwrap();

	assert_eq!(result.products.len(), 1);
	assert_eq!(result.products[0].marketplace_code, "ebay");
	assert!(result.marketplace_results["meli_cl"]
		.error
		.as_deref()
		.unwrap()
		.contains("timed out"));
}

#[tokio::test]
async fn multi_criteria_sort_breaks_price_ties_by_rating() {
	let mut expensive = widget("a", "ebay", dec!(500));
	expensive.seller_rating = Some(5.0);
	let mut cheap_low_rated = widget("b", "ebay", dec!(100));
	cheap_low_rated.seller_rating = Some(3.0);
	let mut cheap_high_rated = widget("c", "ebay", dec!(100));
	cheap_high_rated.seller_rating = Some(5.0);

	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products(
			"ebay",
			vec![expensive, cheap_low_rated, cheap_high_rated],
		),
	)]);

	let mut request = request(&["ebay"]);
	request.intent.sort_criteria = vec![SortOrder::PriceAsc, SortOrder::BestSeller];

	let result = orchestrator.search(&request).await.unwrap();
	let ids: Vec<&str> = result.products.iter().map(|p| p.product.id.as_str()).collect();
	assert_eq!(ids, vec!["c", "b", "a"]);
	// The reported sort order is the primary criterion that was applied
	assert_eq!(result.sort_order, SortOrder::PriceAsc);
}

#[tokio::test]
async fn condition_requirement_drops_known_mismatches() {
	let mut brand_new = widget("a", "ebay", dec!(50));
	brand_new.condition = Some(Condition::New);
	let mut used = widget("b", "ebay", dec!(40));
	used.condition = Some(Condition::Used);
	let unreported = widget("c", "ebay", dec!(45));

	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products("ebay", vec![brand_new, used, unreported]),
	)]);

	let mut request = request(&["ebay"]);
	request.intent.condition = Some(Condition::New);

	let result = orchestrator.search(&request).await.unwrap();
	let ids: Vec<&str> = result.products.iter().map(|p| p.product.id.as_str()).collect();
	// The used item goes; the item with no reported condition stays
	assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn default_relevance_sort_interleaves_marketplaces() {
	let orchestrator = orchestrator(vec![
		(
			"ebay",
			MockMarketplaceAdapter::with_products(
				"ebay",
				vec![widget("a1", "ebay", dec!(10)), widget("a2", "ebay", dec!(20))],
			),
		),
		(
			"meli_cl",
			MockMarketplaceAdapter::with_products("meli_cl", vec![widget("b1", "meli_cl", dec!(30))]),
		),
	]);

	let result = orchestrator.search(&request(&["ebay", "meli_cl"])).await.unwrap();
	let ids: Vec<&str> = result.products.iter().map(|p| p.product.id.as_str()).collect();
	assert_eq!(ids, vec!["a1", "b1", "a2"]);
	assert_eq!(result.sort_order, SortOrder::Relevance);
}

#[tokio::test]
async fn results_are_limited_with_has_more() {
	let products: Vec<ProductResult> = (0..30)
		.map(|i| widget(&format!("p{}", i), "ebay", dec!(20)))
		.collect();
	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products("ebay", products),
	)]);

	let mut request = request(&["ebay"]);
	request.intent.limit = 5;

	let result = orchestrator.search(&request).await.unwrap();
	assert_eq!(result.products.len(), 5);
	assert!(result.has_more);
	assert!(result.total_count > 5);
}

#[tokio::test]
async fn minimum_seller_rating_drops_unknown_ratings() {
	let mut rated = widget("a", "ebay", dec!(50));
	rated.seller_rating = Some(4.8);
	let unrated = widget("b", "ebay", dec!(40));

	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products("ebay", vec![rated, unrated]),
	)]);

	let mut request = request(&["ebay"]);
	request.intent.min_seller_rating = Some(4.5);

	let result = orchestrator.search(&request).await.unwrap();
	assert_eq!(result.products.len(), 1);
	assert_eq!(result.products[0].product.id, "a");
}

#[tokio::test]
async fn free_shipping_requirement_filters_results() {
	let mut free = widget("a", "ebay", dec!(50));
	free.free_shipping = true;
	let mut paid = widget("b", "ebay", dec!(40));
	paid.shipping_cost = Some(dec!(15));

	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products("ebay", vec![free, paid]),
	)]);

	let mut request = request(&["ebay"]);
	request.intent.require_free_shipping = true;

	let result = orchestrator.search(&request).await.unwrap();
	assert_eq!(result.products.len(), 1);
	assert_eq!(result.products[0].product.id, "a");
}

#[tokio::test]
async fn destination_country_annotates_taxes_and_best_price() {
	let orchestrator = orchestrator(vec![(
		"ebay",
		MockMarketplaceAdapter::with_products(
			"ebay",
			vec![widget("a", "ebay", dec!(100)), widget("b", "ebay", dec!(200))],
		),
	)]);

	let request = request(&["ebay"]).with_destination("CL");
	let result = orchestrator.search(&request).await.unwrap();

	let a = result.products.iter().find(|p| p.product.id == "a").unwrap();
	let tax = a.tax_info.as_ref().unwrap();
	// 6% duty on 100, then 19% VAT on 100 + 0 shipping + 6 duty
	assert_eq!(tax.customs_duty, dec!(6.00));
	assert_eq!(tax.vat, dec!(20.14));
	assert_eq!(tax.total_cost, dec!(126.14));

	assert!(a.is_best_price);
	assert_eq!(a.price_rank, Some(1));
	let b = result.products.iter().find(|p| p.product.id == "b").unwrap();
	assert!(!b.is_best_price);
	assert_eq!(b.price_rank, Some(2));
}

#[tokio::test]
async fn exactly_one_best_price_across_marketplaces() {
	let orchestrator = orchestrator(vec![
		(
			"ebay",
			MockMarketplaceAdapter::with_products("ebay", vec![widget("a", "ebay", dec!(55))]),
		),
		(
			"meli_cl",
			MockMarketplaceAdapter::with_products("meli_cl", vec![widget("b", "meli_cl", dec!(45))]),
		),
	]);

	let result = orchestrator.search(&request(&["ebay", "meli_cl"])).await.unwrap();

	let best: Vec<&str> = result
		.products
		.iter()
		.filter(|p| p.is_best_price)
		.map(|p| p.product.id.as_str())
		.collect();
	assert_eq!(best, vec!["b"]);

	let mut ranks: Vec<usize> = result.products.iter().filter_map(|p| p.price_rank).collect();
	ranks.sort_unstable();
	assert_eq!(ranks, vec![1, 2]);
}

#[tokio::test]
async fn close_shuts_down_every_adapter() {
	let ebay = Arc::new(MockMarketplaceAdapter::with_products("ebay", vec![]));
	let meli = Arc::new(MockMarketplaceAdapter::with_products("meli_cl", vec![]));

	let mut factory = MarketplaceFactory::new();
	factory.register("ebay", ebay.clone()).unwrap();
	factory.register("meli_cl", meli.clone()).unwrap();
	let orchestrator = SearchOrchestrator::new(Arc::new(factory));

	orchestrator.close().await;
	assert_eq!(ebay.close_calls(), 1);
	assert_eq!(meli.close_calls(), 1);
}
