//! Error types for marketplace operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backoff window reported for rate limited calls when the provider
/// omits a Retry-After header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Classification of marketplace failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
	#[default]
	Unknown,
	RateLimit,
	Authentication,
	Network,
	Parse,
	NotFound,
	InvalidRequest,
	ServiceUnavailable,
}

/// Result alias for marketplace operations
pub type MarketplaceResult<T> = Result<T, MarketplaceError>;

/// Tagged failure returned by adapters and their HTTP clients
///
/// Expected failure paths (network, parse, auth) travel as values, never as
/// panics; the orchestrator converts them into per-marketplace error strings
/// without aborting the surrounding search.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("[{marketplace}] {code:?}: {message}")]
pub struct MarketplaceError {
	pub code: ErrorCode,
	pub marketplace: String,
	pub message: String,
	pub details: Option<serde_json::Value>,
	/// Suggested backoff in seconds, populated for rate limit errors
	pub retry_after: Option<u64>,
}

impl MarketplaceError {
	pub fn new(code: ErrorCode, marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			code,
			marketplace: marketplace.into(),
			message: message.into(),
			details: None,
			retry_after: None,
		}
	}

	pub fn unknown(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::Unknown, marketplace, message)
	}

	pub fn rate_limit(marketplace: impl Into<String>, retry_after: Option<u64>) -> Self {
		let retry_after = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
		let mut err = Self::new(
			ErrorCode::RateLimit,
			marketplace,
			format!("rate limit exceeded, retry after {}s", retry_after),
		);
		err.retry_after = Some(retry_after);
		err
	}

	pub fn authentication(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::Authentication, marketplace, message)
	}

	pub fn network(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::Network, marketplace, message)
	}

	pub fn parse(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::Parse, marketplace, message)
	}

	pub fn not_found(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::NotFound, marketplace, message)
	}

	pub fn invalid_request(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidRequest, marketplace, message)
	}

	pub fn service_unavailable(marketplace: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorCode::ServiceUnavailable, marketplace, message)
	}

	pub fn with_details(mut self, details: serde_json::Value) -> Self {
		self.details = Some(details);
		self
	}

	/// Whether a caller-level retry policy may reasonably retry this failure
	pub fn is_retryable(&self) -> bool {
		matches!(
			self.code,
			ErrorCode::RateLimit | ErrorCode::Network | ErrorCode::ServiceUnavailable
		)
	}
}
