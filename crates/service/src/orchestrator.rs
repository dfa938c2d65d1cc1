//! Search orchestrator: parallel fan-out across marketplaces with
//! aggregation, relevance filtering, multi-key sorting and tax annotation
//!
//! One slow or failing marketplace never takes down a search: every adapter
//! call runs in its own task under its own timeout, and failures are carried
//! in the per-marketplace result map instead of aborting the whole request.

use futures::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use shopsearch_adapters::MarketplaceFactory;
use shopsearch_types::{
	AggregatedResult, EnrichedProduct, MarketplaceAdapter, MarketplaceSearchResult, SearchIntent,
	SearchParams, SearchParamsError, SearchRequest, SortOrder, MAX_SEARCH_LIMIT,
};

use crate::relevance::RelevanceFilter;
use crate::taxes::{TaxCalculator, TaxRequest};

/// Default per-marketplace search deadline
pub const DEFAULT_MARKETPLACE_TIMEOUT_MS: u64 = 30_000;

/// Default over-fetch factor applied before filtering and re-sorting
pub const DEFAULT_OVERFETCH_MULTIPLIER: usize = 3;

#[derive(Error, Debug)]
pub enum OrchestratorError {
	#[error("no marketplaces specified")]
	NoMarketplacesSpecified,

	#[error("none of the requested marketplaces are registered: {requested:?}")]
	NoValidAdapters { requested: Vec<String> },

	#[error(transparent)]
	InvalidParams(#[from] SearchParamsError),
}

/// Orchestrator tunables
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
	pub per_marketplace_timeout_ms: u64,
	/// Results requested from each provider, as a multiple of the user's
	/// limit, so filtering and cross-marketplace sorting have material
	pub overfetch_multiplier: usize,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			per_marketplace_timeout_ms: DEFAULT_MARKETPLACE_TIMEOUT_MS,
			overfetch_multiplier: DEFAULT_OVERFETCH_MULTIPLIER,
		}
	}
}

/// Multi-marketplace search orchestrator
pub struct SearchOrchestrator {
	factory: Arc<MarketplaceFactory>,
	relevance: RelevanceFilter,
	taxes: TaxCalculator,
	config: OrchestratorConfig,
}

impl SearchOrchestrator {
	pub fn new(factory: Arc<MarketplaceFactory>) -> Self {
		Self {
			factory,
			relevance: RelevanceFilter::heuristic_only(),
			taxes: TaxCalculator::new(),
			config: OrchestratorConfig::default(),
		}
	}

	pub fn with_relevance_filter(mut self, relevance: RelevanceFilter) -> Self {
		self.relevance = relevance;
		self
	}

	pub fn with_tax_calculator(mut self, taxes: TaxCalculator) -> Self {
		self.taxes = taxes;
		self
	}

	pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
		self.config = config;
		self
	}

	/// Run one search across the requested marketplaces
	pub async fn search(
		&self,
		request: &SearchRequest,
	) -> Result<AggregatedResult, OrchestratorError> {
		if request.marketplace_codes.is_empty() {
			return Err(OrchestratorError::NoMarketplacesSpecified);
		}

		let intent = &request.intent;
		let params = self.build_params(intent)?;

		// Unknown codes are skipped with a warning; the request only fails
		// when nothing at all can be queried.
		let mut adapters: Vec<(String, Arc<dyn MarketplaceAdapter>)> = Vec::new();
		for code in &request.marketplace_codes {
			match self.factory.get_adapter(code) {
				Ok(adapter) => adapters.push((code.clone(), adapter)),
				Err(e) => warn!("skipping marketplace '{}': {}", code, e),
			}
		}
		if adapters.is_empty() {
			return Err(OrchestratorError::NoValidAdapters {
				requested: request.marketplace_codes.clone(),
			});
		}

		info!(
			"searching {} marketplaces for '{}' (limit {})",
			adapters.len(),
			intent.query,
			intent.limit
		);

		let outcomes = self.fan_out(&adapters, &params).await;

		let mut marketplace_results = std::collections::HashMap::new();
		let mut products: Vec<EnrichedProduct> = Vec::new();
		let mut has_more = false;
		for (code, mut outcome) in outcomes {
			if outcome.is_success() {
				has_more |= outcome.has_more;
				products.append(&mut outcome.products);
			}
			marketplace_results.insert(code, outcome);
		}

		let products = self
			.relevance
			.filter(&intent.query, &intent.original_query, products)
			.await;

		// Unknown seller ratings fail a minimum-rating requirement
		let products: Vec<EnrichedProduct> = match intent.min_seller_rating {
			Some(min) => products
				.into_iter()
				.filter(|p| p.product.seller_rating.is_some_and(|r| r >= min))
				.collect(),
			None => products,
		};

		// A known mismatched condition is dropped; unreported conditions pass
		let products: Vec<EnrichedProduct> = match intent.condition {
			Some(wanted) => products
				.into_iter()
				.filter(|p| p.product.condition.map_or(true, |c| c == wanted))
				.collect(),
			None => products,
		};

		let mut products: Vec<EnrichedProduct> = match intent.require_free_shipping {
			true => products.into_iter().filter(|p| p.product.free_shipping).collect(),
			false => products,
		};

		let criteria = intent.effective_sort_criteria();
		apply_sort_criteria(&mut products, &criteria);

		let total_count = products.len() as u64;
		if products.len() > intent.limit {
			has_more = true;
			products.truncate(intent.limit);
		}

		let destination = request
			.destination_country
			.as_deref()
			.or(intent.destination_country.as_deref());
		if let Some(country) = destination {
			self.annotate_taxes(&mut products, country);
		}

		rank_by_price(&mut products, destination.is_some());

		Ok(AggregatedResult {
			products,
			marketplace_results,
			total_count,
			// The primary criterion actually applied, not the raw request field
			sort_order: criteria[0],
			query: intent.query.clone(),
			has_more,
		})
	}

	/// Close every registered adapter, logging failures
	pub async fn close(&self) {
		for adapter in self.factory.get_all_adapters() {
			if let Err(e) = adapter.close().await {
				warn!("failed to close adapter '{}': {}", adapter.marketplace_code(), e);
			}
		}
	}

	fn build_params(&self, intent: &SearchIntent) -> Result<SearchParams, SearchParamsError> {
		// Over-fetch so the relevance filter and cross-marketplace sort have
		// more than one page's worth of candidates to work with. Providers
		// always get a relevance sort; the requested ordering is applied
		// after aggregation where it can span marketplaces.
		let fetch_limit = (intent.limit * self.config.overfetch_multiplier.max(1))
			.clamp(1, MAX_SEARCH_LIMIT);
		SearchParams::new(intent.query.clone(), fetch_limit)?
			.with_price_range(intent.min_price, intent.max_price)
	}

	async fn fan_out(
		&self,
		adapters: &[(String, Arc<dyn MarketplaceAdapter>)],
		params: &SearchParams,
	) -> Vec<(String, MarketplaceSearchResult)> {
		let deadline = Duration::from_millis(self.config.per_marketplace_timeout_ms);

		let tasks: Vec<_> = adapters
			.iter()
			.map(|(code, adapter)| {
				let code = code.clone();
				let adapter = Arc::clone(adapter);
				let params = params.clone();
				tokio::spawn(async move {
					let name = adapter.marketplace_name().to_string();
					let outcome = match timeout(deadline, adapter.search(&params)).await {
						Ok(Ok(result)) => {
							debug!("{}: {} products", code, result.products.len());
							MarketplaceSearchResult::from_search(result, &name)
						},
						Ok(Err(e)) => {
							warn!("{}: search failed: {}", code, e);
							MarketplaceSearchResult::failed(e.to_string())
						},
						Err(_) => {
							warn!("{}: search timed out after {:?}", code, deadline);
							MarketplaceSearchResult::failed(format!(
								"timed out after {}ms",
								deadline.as_millis()
							))
						},
					};
					(code, outcome)
				})
			})
			.collect();

		// Zip against the request order so a panicked task still yields a
		// failure entry for its marketplace.
		join_all(tasks)
			.await
			.into_iter()
			.zip(adapters.iter())
			.map(|(joined, (code, _))| match joined {
				Ok(outcome) => outcome,
				Err(e) => {
					warn!("{}: search task panicked: {}", code, e);
					(
						code.clone(),
						MarketplaceSearchResult::failed("internal search task failure"),
					)
				},
			})
			.collect()
	}

	fn annotate_taxes(&self, products: &mut [EnrichedProduct], country: &str) {
		for product in products.iter_mut() {
			let shipping = match (product.product.free_shipping, product.product.shipping_cost) {
				(false, Some(cost)) => cost,
				_ => rust_decimal::Decimal::ZERO,
			};
			let request = TaxRequest::new(
				product.product.price,
				shipping,
				product.product.currency.clone(),
				country,
			);
			match self.taxes.calculate(&request) {
				Ok(breakdown) => product.tax_info = Some(breakdown),
				Err(e) => {
					warn!(
						"tax estimate failed for product '{}': {}",
						product.product.id, e
					);
				},
			}
		}
	}
}

/// Apply an ordered list of sort keys as one stable multi-key sort
///
/// Keys are applied in reverse so the first criterion ends up primary:
/// sorting stably by the tie-breaker first, then by the primary key,
/// preserves the tie-breaker's order among equal primary keys.
pub fn apply_sort_criteria(products: &mut Vec<EnrichedProduct>, criteria: &[SortOrder]) {
	for criterion in criteria.iter().rev() {
		match criterion {
			SortOrder::PriceAsc => {
				products.sort_by(|a, b| a.product.price.cmp(&b.product.price));
			},
			SortOrder::PriceDesc => {
				products.sort_by(|a, b| b.product.price.cmp(&a.product.price));
			},
			SortOrder::BestSeller => {
				products.sort_by(|a, b| {
					let ra = a.product.seller_rating.unwrap_or(0.0);
					let rb = b.product.seller_rating.unwrap_or(0.0);
					rb.partial_cmp(&ra).unwrap_or(Ordering::Equal)
				});
			},
			// Providers already return their newest-first ordering when
			// asked; no cross-marketplace timestamp exists to re-sort by.
			SortOrder::Newest => {},
			SortOrder::Relevance => {
				let interleaved = interleave_by_marketplace(std::mem::take(products));
				*products = interleaved;
			},
		}
	}
}

/// Round-robin products across marketplaces, preserving each marketplace's
/// internal order and the order marketplaces first appear in
pub fn interleave_by_marketplace(products: Vec<EnrichedProduct>) -> Vec<EnrichedProduct> {
	let mut group_order: Vec<String> = Vec::new();
	let mut groups: std::collections::HashMap<String, std::collections::VecDeque<EnrichedProduct>> =
		std::collections::HashMap::new();
	for product in products {
		if !groups.contains_key(&product.marketplace_code) {
			group_order.push(product.marketplace_code.clone());
		}
		groups
			.entry(product.marketplace_code.clone())
			.or_default()
			.push_back(product);
	}

	let mut out = Vec::new();
	loop {
		let mut emitted = false;
		for code in &group_order {
			if let Some(product) = groups.get_mut(code).and_then(|q| q.pop_front()) {
				out.push(product);
				emitted = true;
			}
		}
		if !emitted {
			break;
		}
	}
	out
}

/// Assign 1-based price ranks by ascending comparable price and flag the
/// best-priced product
///
/// When taxes were requested and at least one product carries a breakdown,
/// products without one keep their rank but are not eligible for the
/// best-price flag: an untaxed sticker price cannot win against landed
/// costs it was never compared on.
pub fn rank_by_price(products: &mut [EnrichedProduct], taxes_requested: bool) {
	if products.is_empty() {
		return;
	}

	let any_taxed = products.iter().any(|p| p.tax_info.is_some());
	let require_tax_info = taxes_requested && any_taxed;

	let mut order: Vec<usize> = (0..products.len()).collect();
	order.sort_by(|&a, &b| {
		products[a]
			.comparable_price()
			.cmp(&products[b].comparable_price())
	});

	let mut best_assigned = false;
	for (rank, idx) in order.iter().enumerate() {
		products[*idx].price_rank = Some(rank + 1);
		products[*idx].is_best_price = false;
		if !best_assigned && (!require_tax_info || products[*idx].tax_info.is_some()) {
			products[*idx].is_best_price = true;
			best_assigned = true;
		}
	}
}
