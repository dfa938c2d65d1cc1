//! Intent extraction: free-text user messages into structured search intents
//!
//! The LLM is asked for a strict JSON object; its output is fence-stripped,
//! deserialized with lenient defaults and then normalized (keywords, limit
//! clamping, tax flag derivation) before it reaches the orchestrator.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use shopsearch_types::{Condition, SearchIntent, SortOrder, DEFAULT_RESULT_LIMIT, MAX_SEARCH_LIMIT};

use crate::llm::{strip_code_fences, LlmClient, LlmError};
use crate::relevance::extract_keywords;

#[derive(Error, Debug)]
pub enum IntentError {
	#[error(transparent)]
	Llm(#[from] LlmError),

	#[error("unparseable intent output: {0}")]
	InvalidResponse(String),
}

/// What kind of turn the user's message is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
	/// A fresh product search
	Search,
	/// A refinement of the previous search ("cheaper", "only new ones")
	Refine,
	/// Anything that is not a shopping request
	General,
}

const SYSTEM_PROMPT: &str = "\
You turn shopping messages into structured search intents. \
Respond with only a JSON object, no prose, with these fields:\n\
  kind: \"search\" | \"refine\" | \"general\"\n\
  query: expanded English search query (omit for general)\n\
  sort_order: \"relevance\" | \"price_asc\" | \"price_desc\" | \"newest\" | \"best_seller\" (optional)\n\
  sort_criteria: ordered array of sort_order values, primary first (optional)\n\
  min_price, max_price: numbers (optional)\n\
  require_free_shipping: boolean (optional)\n\
  min_seller_rating: number 0-5 (optional)\n\
  condition: \"new\" | \"used\" | \"refurbished\" (optional)\n\
  destination_country: ISO 3166-1 alpha-2 code if the user mentions where \
they are or where it ships (optional)\n\
  limit: number of results wanted (optional)\n\
For refinements, merge the constraints from the conversation so the intent \
stands alone.";

/// Intent JSON as the model emits it, everything optional
#[derive(Debug, Deserialize)]
struct RawIntent {
	kind: IntentKind,
	#[serde(default)]
	query: Option<String>,
	#[serde(default)]
	sort_order: Option<SortOrder>,
	#[serde(default)]
	sort_criteria: Vec<SortOrder>,
	#[serde(default)]
	min_price: Option<Decimal>,
	#[serde(default)]
	max_price: Option<Decimal>,
	#[serde(default)]
	require_free_shipping: bool,
	#[serde(default)]
	min_seller_rating: Option<f64>,
	#[serde(default)]
	condition: Option<Condition>,
	#[serde(default)]
	destination_country: Option<String>,
	#[serde(default)]
	limit: Option<usize>,
}

/// Outcome of extracting intent from one message
#[derive(Debug)]
pub enum ExtractedIntent {
	Search(SearchIntent),
	General,
}

/// LLM-backed intent extractor
pub struct IntentExtractor {
	llm: Arc<dyn LlmClient>,
}

impl IntentExtractor {
	pub fn new(llm: Arc<dyn LlmClient>) -> Self {
		Self { llm }
	}

	/// Extract a structured intent from the user's message
	///
	/// `history` is prior turns, oldest first, used to resolve refinements.
	pub async fn extract(
		&self,
		message: &str,
		history: &[String],
	) -> Result<ExtractedIntent, IntentError> {
		let prompt = Self::build_prompt(message, history);
		let response = self.llm.generate(&prompt, Some(SYSTEM_PROMPT), 0.0).await?;

		let raw: RawIntent = serde_json::from_str(strip_code_fences(&response))
			.map_err(|e| IntentError::InvalidResponse(e.to_string()))?;

		if raw.kind == IntentKind::General {
			return Ok(ExtractedIntent::General);
		}

		let query = raw
			.query
			.filter(|q| !q.trim().is_empty())
			.unwrap_or_else(|| message.to_string());

		debug!("extracted {:?} intent with query '{}'", raw.kind, query);

		let mut intent = SearchIntent::new(query, message);
		intent.sort_order = raw.sort_order;
		intent.sort_criteria = raw.sort_criteria;
		intent.min_price = raw.min_price;
		intent.max_price = raw.max_price;
		intent.require_free_shipping = raw.require_free_shipping;
		intent.min_seller_rating = raw.min_seller_rating;
		intent.condition = raw.condition;
		intent.destination_country = raw
			.destination_country
			.map(|c| c.trim().to_uppercase())
			.filter(|c| c.len() == 2);
		intent.estimate_import_taxes = intent.destination_country.is_some();
		intent.limit = raw
			.limit
			.unwrap_or(DEFAULT_RESULT_LIMIT)
			.clamp(1, MAX_SEARCH_LIMIT);
		intent.keywords = extract_keywords(&intent.query);

		Ok(ExtractedIntent::Search(intent))
	}

	fn build_prompt(message: &str, history: &[String]) -> String {
		if history.is_empty() {
			return format!("User message: {}", message);
		}
		let mut prompt = String::from("Conversation so far:\n");
		for turn in history {
			prompt.push_str(turn);
			prompt.push('\n');
		}
		prompt.push_str(&format!("\nLatest user message: {}", message));
		prompt
	}
}
