//! Shopsearch Service
//!
//! Core logic for multi-marketplace search orchestration: fan-out,
//! aggregation, relevance filtering, tax estimation and intent extraction.

pub mod chat;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod relevance;
pub mod taxes;

pub use chat::{ChatError, ChatReply, ChatService, ChatTurn};
pub use intent::{ExtractedIntent, IntentError, IntentExtractor, IntentKind};
pub use llm::{HttpLlmClient, LlmClient, LlmError};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, SearchOrchestrator};
pub use relevance::{
	HeuristicClassifier, LlmRelevanceClassifier, RelevanceClassifier, RelevanceError,
	RelevanceFilter,
};
pub use taxes::{StaticTaxRateTable, TaxCalculator, TaxError, TaxRateSource, TaxRequest};
