//! Relevance filtering: drops virtual and off-topic items from raw results
//!
//! Two-tier strategy: an LLM-backed classifier is tried first; any failure
//! (transport, empty output, unparseable verdicts) falls back to a
//! deterministic rule-based classifier so a search never fails because the
//! model did.

use async_trait::async_trait;
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use shopsearch_types::EnrichedProduct;

use crate::llm::{strip_code_fences, LlmClient, LlmError};

/// Below this many confident matches the LLM verdicts are considered too
/// aggressive and the filter relaxes to physical-only
const MIN_CONFIDENT_MATCHES: usize = 5;

/// Safety valve size when filtering would otherwise empty the result set
const UNFILTERED_FALLBACK_COUNT: usize = 5;

/// Minimum rule-based score for an item to survive filtering
const KEEP_SCORE_THRESHOLD: f64 = 0.5;

#[derive(Error, Debug)]
pub enum RelevanceError {
	#[error(transparent)]
	Llm(#[from] LlmError),

	#[error("unparseable classification output: {0}")]
	InvalidResponse(String),
}

/// Narrow classification interface
///
/// Returns the indices (into `candidates`) of items judged relevant.
#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
	async fn classify(
		&self,
		query: &str,
		original_query: &str,
		candidates: &[EnrichedProduct],
	) -> Result<Vec<usize>, RelevanceError>;
}

/// Per-item verdict expected from the model
#[derive(Debug, Deserialize)]
struct ItemVerdict {
	/// 1-based position in the prompt's numbered list
	index: usize,
	physical: bool,
	matches: bool,
}

/// LLM-backed classifier
pub struct LlmRelevanceClassifier {
	llm: Arc<dyn LlmClient>,
}

impl LlmRelevanceClassifier {
	pub fn new(llm: Arc<dyn LlmClient>) -> Self {
		Self { llm }
	}

	fn build_prompt(query: &str, original_query: &str, candidates: &[EnrichedProduct]) -> String {
		let mut prompt = format!(
			"A user is shopping for: \"{}\" (their words: \"{}\").\n\
			 Classify every listing below. For each, decide:\n\
			 - physical: is this a physical good (not a gift card, account, digital code or service)?\n\
			 - matches: is it the product the user asked for (not an accessory or unrelated item)?\n\
			 Respond with only a JSON array of objects: \
			 [{{\"index\": 1, \"physical\": true, \"matches\": true}}, ...]\n\nListings:\n",
			query, original_query
		);
		for (i, item) in candidates.iter().enumerate() {
			prompt.push_str(&format!(
				"{}. {} - {} {}\n",
				i + 1,
				item.product.title,
				item.product.price,
				item.product.currency
			));
		}
		prompt
	}
}

#[async_trait]
impl RelevanceClassifier for LlmRelevanceClassifier {
	async fn classify(
		&self,
		query: &str,
		original_query: &str,
		candidates: &[EnrichedProduct],
	) -> Result<Vec<usize>, RelevanceError> {
		let prompt = Self::build_prompt(query, original_query, candidates);
		let response = self
			.llm
			.generate(&prompt, Some("You classify e-commerce listings. Reply with JSON only."), 0.0)
			.await?;

		let verdicts: Vec<ItemVerdict> = serde_json::from_str(strip_code_fences(&response))
			.map_err(|e| RelevanceError::InvalidResponse(e.to_string()))?;

		let mut physical = Vec::new();
		let mut matching = Vec::new();
		for verdict in &verdicts {
			// Indices outside the candidate range are hallucinated; drop them
			let Some(idx) = verdict.index.checked_sub(1).filter(|i| *i < candidates.len()) else {
				continue;
			};
			if verdict.physical {
				physical.push(idx);
				if verdict.matches {
					matching.push(idx);
				}
			}
		}

		// Too few confident matches while more physical items exist: the
		// match verdicts are likely over-strict, relax to physical-only.
		if matching.len() < MIN_CONFIDENT_MATCHES && physical.len() > matching.len() {
			debug!(
				"relaxing relevance filter to physical-only ({} matches, {} physical)",
				matching.len(),
				physical.len()
			);
			return Ok(physical);
		}

		Ok(matching)
	}
}

lazy_static! {
	static ref STOPWORDS: HashSet<&'static str> = [
		// English
		"a", "an", "and", "the", "for", "with", "of", "in", "on", "to", "new",
		"best", "cheap", "buy", "price", "under", "over",
		// Spanish
		"un", "una", "el", "la", "los", "las", "de", "del", "para", "con",
		"en", "y", "nuevo", "nueva", "barato", "comprar",
	]
	.into_iter()
	.collect();
}

/// Tokenize a query into lowercase keywords with stopwords removed
pub fn extract_keywords(text: &str) -> Vec<String> {
	text.to_lowercase()
		.split(|c: char| !c.is_alphanumeric())
		.filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
		.map(String::from)
		.collect()
}

/// A detected product category with its pricing and brand expectations
struct CategoryProfile {
	name: &'static str,
	keywords: &'static [&'static str],
	/// Listings priced far below this are usually accessories or scams
	min_expected_price: Decimal,
	brands: &'static [&'static str],
}

lazy_static! {
	static ref CATEGORIES: Vec<CategoryProfile> = vec![
		CategoryProfile {
			name: "console",
			keywords: &["console", "consola", "playstation", "ps5", "ps4", "xbox", "nintendo", "switch"],
			min_expected_price: dec!(80),
			brands: &["sony", "playstation", "ps5", "ps4", "microsoft", "xbox", "nintendo", "switch"],
		},
		CategoryProfile {
			name: "laptop",
			keywords: &["laptop", "notebook", "macbook", "ultrabook", "chromebook"],
			min_expected_price: dec!(150),
			brands: &["lenovo", "hp", "dell", "asus", "acer", "apple", "macbook", "msi", "samsung"],
		},
		CategoryProfile {
			name: "phone",
			keywords: &["phone", "iphone", "smartphone", "celular", "galaxy"],
			min_expected_price: dec!(50),
			brands: &["apple", "iphone", "samsung", "galaxy", "xiaomi", "motorola", "pixel", "huawei"],
		},
		CategoryProfile {
			name: "tablet",
			keywords: &["tablet", "ipad"],
			min_expected_price: dec!(60),
			brands: &["apple", "ipad", "samsung", "lenovo", "xiaomi", "amazon"],
		},
		CategoryProfile {
			name: "tv",
			keywords: &["tv", "television", "televisor", "oled", "qled"],
			min_expected_price: dec!(100),
			brands: &["samsung", "lg", "sony", "tcl", "hisense", "philips"],
		},
		CategoryProfile {
			name: "camera",
			keywords: &["camera", "camara", "dslr", "mirrorless", "gopro"],
			min_expected_price: dec!(60),
			brands: &["canon", "nikon", "sony", "fujifilm", "gopro", "panasonic"],
		},
		CategoryProfile {
			name: "headphones",
			keywords: &["headphones", "earbuds", "airpods", "auriculares", "headset", "audifonos"],
			min_expected_price: dec!(15),
			brands: &["sony", "bose", "apple", "airpods", "jbl", "sennheiser", "beats"],
		},
		CategoryProfile {
			name: "watch",
			keywords: &["watch", "smartwatch", "reloj"],
			min_expected_price: dec!(20),
			brands: &["apple", "garmin", "samsung", "casio", "fitbit", "amazfit"],
		},
		CategoryProfile {
			name: "gaming",
			keywords: &["gaming", "gamer", "controller", "gamepad", "gpu", "graphics"],
			min_expected_price: dec!(30),
			brands: &[],
		},
	];
	static ref GENERAL_CATEGORY: CategoryProfile = CategoryProfile {
		name: "general",
		keywords: &[],
		min_expected_price: dec!(5),
		brands: &[],
	};
}

/// Deterministic rule-based classifier used when the LLM path fails
#[derive(Debug, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
	pub fn new() -> Self {
		Self
	}

	fn detect_category(query_keywords: &[String]) -> &'static CategoryProfile {
		for category in CATEGORIES.iter() {
			if query_keywords
				.iter()
				.any(|kw| category.keywords.contains(&kw.as_str()))
			{
				return category;
			}
		}
		&GENERAL_CATEGORY
	}

	/// Score one listing against the query; 0-1, higher is more relevant
	fn score(item: &EnrichedProduct, query_keywords: &[String], category: &CategoryProfile) -> f64 {
		let mut score: f64 = 1.0;
		let title = item.product.title.to_lowercase();
		let title_words: HashSet<String> = extract_keywords(&title).into_iter().collect();

		// Price far below the category's expected floor is the strongest
		// off-topic signal (cases, stickers, digital codes).
		let expected = category.min_expected_price;
		if item.product.price < expected * dec!(0.25) {
			score -= 0.6;
		} else if item.product.price < expected * dec!(0.5) {
			score -= 0.3;
		}

		// Term overlap between query keywords and title words
		if !query_keywords.is_empty() {
			let hits = query_keywords
				.iter()
				.filter(|kw| title_words.contains(*kw) || title.contains(kw.as_str()))
				.count();
			let overlap = hits as f64 / query_keywords.len() as f64;
			if overlap < 0.2 {
				score -= 0.5;
			} else if overlap < 0.5 {
				score -= 0.25;
			}
		}

		// Category-specific brand/keyword check: a listing in a branded
		// category that mentions neither a brand nor a category keyword is
		// suspect.
		if !category.brands.is_empty() {
			let mentions_category = category
				.brands
				.iter()
				.chain(category.keywords.iter())
				.any(|b| title.contains(b));
			if !mentions_category {
				score -= 0.4;
			}
		}

		score.clamp(0.0, 1.0)
	}
}

#[async_trait]
impl RelevanceClassifier for HeuristicClassifier {
	async fn classify(
		&self,
		query: &str,
		_original_query: &str,
		candidates: &[EnrichedProduct],
	) -> Result<Vec<usize>, RelevanceError> {
		let query_keywords = extract_keywords(query);
		let category = Self::detect_category(&query_keywords);
		debug!("heuristic relevance filter using category '{}'", category.name);

		Ok(candidates
			.iter()
			.enumerate()
			.filter(|(_, item)| {
				Self::score(item, &query_keywords, category) >= KEEP_SCORE_THRESHOLD
			})
			.map(|(i, _)| i)
			.collect())
	}
}

/// Two-tier relevance filter front-end
pub struct RelevanceFilter {
	primary: Option<Arc<dyn RelevanceClassifier>>,
	fallback: HeuristicClassifier,
}

impl RelevanceFilter {
	/// Heuristic-only filter (no LLM configured)
	pub fn heuristic_only() -> Self {
		Self {
			primary: None,
			fallback: HeuristicClassifier::new(),
		}
	}

	/// LLM-first filter with rule-based fallback
	pub fn with_llm(llm: Arc<dyn LlmClient>) -> Self {
		Self {
			primary: Some(Arc::new(LlmRelevanceClassifier::new(llm))),
			fallback: HeuristicClassifier::new(),
		}
	}

	pub fn with_classifier(classifier: Arc<dyn RelevanceClassifier>) -> Self {
		Self {
			primary: Some(classifier),
			fallback: HeuristicClassifier::new(),
		}
	}

	/// Filter the aggregated products down to relevant physical goods
	pub async fn filter(
		&self,
		query: &str,
		original_query: &str,
		products: Vec<EnrichedProduct>,
	) -> Vec<EnrichedProduct> {
		if products.is_empty() {
			return products;
		}

		if let Some(primary) = &self.primary {
			match primary.classify(query, original_query, &products).await {
				Ok(kept) => return select_indices(products, &kept),
				Err(e) => {
					warn!("AI relevance classification failed, using rule-based fallback: {}", e);
				},
			}
		}

		let kept = self
			.fallback
			.classify(query, original_query, &products)
			.await
			.unwrap_or_default();

		if kept.is_empty() {
			// Availability over precision: never hide every result behind
			// the filter.
			warn!("relevance filter removed all {} items, returning first {} unfiltered",
				products.len(), UNFILTERED_FALLBACK_COUNT);
			let mut products = products;
			products.truncate(UNFILTERED_FALLBACK_COUNT);
			return products;
		}

		select_indices(products, &kept)
	}
}

fn select_indices(products: Vec<EnrichedProduct>, kept: &[usize]) -> Vec<EnrichedProduct> {
	let kept: HashSet<usize> = kept.iter().copied().collect();
	products
		.into_iter()
		.enumerate()
		.filter(|(i, _)| kept.contains(i))
		.map(|(_, p)| p)
		.collect()
}
