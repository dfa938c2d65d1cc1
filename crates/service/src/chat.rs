//! Conversational front-end: turns chat messages into orchestrated searches
//!
//! Each turn is intent-extracted; search and refinement intents are executed
//! against the orchestrator, everything else gets a plain text reply.

use thiserror::Error;
use tracing::info;

use shopsearch_types::{AggregatedResult, SearchRequest};

use crate::intent::{ExtractedIntent, IntentError, IntentExtractor};
use crate::orchestrator::{OrchestratorError, SearchOrchestrator};

#[derive(Error, Debug)]
pub enum ChatError {
	#[error("intent extraction failed: {0}")]
	Intent(#[from] IntentError),

	#[error("search failed: {0}")]
	Search(#[from] OrchestratorError),
}

/// One user turn
#[derive(Debug, Clone)]
pub struct ChatTurn {
	pub content: String,
	/// Marketplaces to query for this user
	pub marketplace_codes: Vec<String>,
	pub destination_country: Option<String>,
	/// Prior turns, oldest first, for refinement resolution
	pub history: Vec<String>,
	pub user_id: Option<String>,
}

impl ChatTurn {
	pub fn new(content: impl Into<String>, marketplace_codes: Vec<String>) -> Self {
		Self {
			content: content.into(),
			marketplace_codes,
			destination_country: None,
			history: Vec::new(),
			user_id: None,
		}
	}

	pub fn with_destination(mut self, country: impl Into<String>) -> Self {
		self.destination_country = Some(country.into());
		self
	}

	pub fn with_history(mut self, history: Vec<String>) -> Self {
		self.history = history;
		self
	}
}

/// Reply to one turn
#[derive(Debug)]
pub enum ChatReply {
	/// The turn was a search; here are the aggregated results
	Results(AggregatedResult),
	/// The turn was not a shopping request
	Message(String),
}

/// Chat dispatcher wiring intent extraction to the orchestrator
pub struct ChatService {
	extractor: IntentExtractor,
	orchestrator: SearchOrchestrator,
}

impl ChatService {
	pub fn new(extractor: IntentExtractor, orchestrator: SearchOrchestrator) -> Self {
		Self {
			extractor,
			orchestrator,
		}
	}

	pub async fn handle(&self, turn: ChatTurn) -> Result<ChatReply, ChatError> {
		let extracted = self.extractor.extract(&turn.content, &turn.history).await?;

		let intent = match extracted {
			ExtractedIntent::Search(intent) => intent,
			ExtractedIntent::General => {
				return Ok(ChatReply::Message(
					"I can help you find and compare products across marketplaces. \
					 Tell me what you're shopping for."
						.to_string(),
				));
			},
		};

		info!(
			"chat turn resolved to search '{}' across {:?}",
			intent.query, turn.marketplace_codes
		);

		// The turn's explicit destination wins over anything inferred from
		// the message text.
		let mut request = SearchRequest::new(intent, turn.marketplace_codes);
		request.user_id = turn.user_id;
		if let Some(country) = turn.destination_country {
			request = request.with_destination(country);
		}

		let results = self.orchestrator.search(&request).await?;
		Ok(ChatReply::Results(results))
	}
}
