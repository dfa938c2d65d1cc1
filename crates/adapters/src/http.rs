//! Provider HTTP client with OAuth2 client-credentials token management
//!
//! Each adapter owns one `OAuthHttpClient`. The underlying transport is
//! lazily created and recreated after `close()`; the cached access token is
//! treated as expired 60 seconds early to avoid races at the expiry boundary.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use shopsearch_types::{MarketplaceError, MarketplaceResult, SecretString};

/// Safety buffer subtracted from token lifetimes
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth2 client-credentials settings for one provider
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
	pub token_url: String,
	pub client_id: String,
	pub client_secret: SecretString,
	pub scope: Option<String>,
}

/// Configuration for a provider HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
	/// Marketplace code stamped onto every error this client produces
	pub marketplace_code: String,
	pub base_url: String,
	/// Absent for providers whose read endpoints are public
	pub credentials: Option<OAuthCredentials>,
	pub timeout_ms: u64,
}

impl HttpClientConfig {
	pub fn new(marketplace_code: impl Into<String>, base_url: impl Into<String>) -> Self {
		Self {
			marketplace_code: marketplace_code.into(),
			base_url: base_url.into(),
			credentials: None,
			timeout_ms: 10_000,
		}
	}

	pub fn with_credentials(mut self, credentials: OAuthCredentials) -> Self {
		self.credentials = Some(credentials);
		self
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
	access_token: SecretString,
	expires_at: DateTime<Utc>,
}

impl CachedToken {
	fn is_valid(&self) -> bool {
		Utc::now() < self.expires_at - ChronoDuration::seconds(TOKEN_EXPIRY_BUFFER_SECS)
	}
}

/// HTTP client owned by one marketplace adapter
#[derive(Debug)]
pub struct OAuthHttpClient {
	config: HttpClientConfig,
	transport: Mutex<Option<Arc<Client>>>,
	token: Mutex<Option<CachedToken>>,
}

impl OAuthHttpClient {
	pub fn new(config: HttpClientConfig) -> Self {
		Self {
			config,
			transport: Mutex::new(None),
			token: Mutex::new(None),
		}
	}

	pub fn marketplace_code(&self) -> &str {
		&self.config.marketplace_code
	}

	/// Get the lazily-created transport, rebuilding it after a `close()`
	fn transport(&self) -> MarketplaceResult<Arc<Client>> {
		let mut guard = self
			.transport
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		if let Some(client) = guard.as_ref() {
			return Ok(client.clone());
		}

		let client = Client::builder()
			.timeout(Duration::from_millis(self.config.timeout_ms))
			.build()
			.map_err(|e| {
				MarketplaceError::network(
					&self.config.marketplace_code,
					format!("failed to build HTTP transport: {}", e),
				)
			})?;
		let client = Arc::new(client);
		*guard = Some(client.clone());
		Ok(client)
	}

	/// Release the transport; safe to call repeatedly
	pub fn close(&self) {
		let mut guard = self
			.transport
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		if guard.take().is_some() {
			debug!("closed HTTP transport for {}", self.config.marketplace_code);
		}
	}

	fn cached_token(&self) -> Option<SecretString> {
		let guard = self
			.token
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		guard
			.as_ref()
			.filter(|t| t.is_valid())
			.map(|t| t.access_token.clone())
	}

	fn invalidate_token(&self) {
		let mut guard = self
			.token
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		if guard.take().is_some() {
			debug!(
				"invalidated cached token for {}, next call re-authenticates",
				self.config.marketplace_code
			);
		}
	}

	fn store_token(&self, token: CachedToken) {
		let mut guard = self
			.token
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		*guard = Some(token);
	}

	/// Fetch a fresh token from the provider's OAuth2 token endpoint
	async fn fetch_token(&self, credentials: &OAuthCredentials) -> MarketplaceResult<SecretString> {
		let code = &self.config.marketplace_code;
		let client = self.transport()?;

		let mut form = vec![("grant_type", "client_credentials".to_string())];
		if let Some(scope) = &credentials.scope {
			form.push(("scope", scope.clone()));
		}

		debug!("fetching OAuth token for {} from {}", code, credentials.token_url);

		let response = client
			.post(&credentials.token_url)
			.basic_auth(
				&credentials.client_id,
				Some(credentials.client_secret.expose_secret()),
			)
			.form(&form)
			.send()
			.await
			.map_err(|e| map_transport_error(code, e))?;

		let status = response.status();
		if status == StatusCode::UNAUTHORIZED {
			return Err(MarketplaceError::authentication(
				code,
				"token endpoint rejected client credentials",
			));
		}
		if !status.is_success() {
			return Err(MarketplaceError::network(
				code,
				format!("token endpoint returned status {}", status),
			));
		}

		let token: TokenResponse = response.json().await.map_err(|e| {
			MarketplaceError::parse(code, format!("invalid token response: {}", e))
		})?;

		let cached = CachedToken {
			access_token: SecretString::from(token.access_token),
			expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
		};
		let access_token = cached.access_token.clone();
		self.store_token(cached);

		debug!("cached OAuth token for {} ({}s lifetime)", code, token.expires_in);
		Ok(access_token)
	}

	/// Return a valid bearer token, re-authenticating when needed
	///
	/// Concurrent callers under token expiry may each trigger a refresh;
	/// duplicate refreshes are idempotent from the provider's perspective.
	async fn ensure_token(&self) -> MarketplaceResult<Option<SecretString>> {
		let Some(credentials) = self.config.credentials.clone() else {
			return Ok(None);
		};
		if let Some(token) = self.cached_token() {
			return Ok(Some(token));
		}
		Ok(Some(self.fetch_token(&credentials).await?))
	}

	fn build_url(&self, path: &str) -> MarketplaceResult<Url> {
		let code = &self.config.marketplace_code;
		let mut base = Url::parse(&self.config.base_url).map_err(|e| {
			MarketplaceError::parse(code, format!("invalid base URL '{}': {}", self.config.base_url, e))
		})?;

		// Treat the base URL as a directory so joins keep its path segments
		if !base.path().ends_with('/') {
			base.set_path(&format!("{}/", base.path()));
		}

		base.join(path.trim_start_matches('/')).map_err(|e| {
			MarketplaceError::parse(code, format!("failed to join URL path '{}': {}", path, e))
		})
	}

	/// Authenticated GET returning the parsed JSON body
	pub async fn get_json(
		&self,
		path: &str,
		query: &[(&str, String)],
	) -> MarketplaceResult<serde_json::Value> {
		let code = self.config.marketplace_code.clone();
		let url = self.build_url(path)?;
		let token = self.ensure_token().await?;
		let client = self.transport()?;

		let mut request = client.get(url).query(query);
		if let Some(token) = &token {
			request = request.bearer_auth(token.expose_secret());
		}

		let response = request
			.send()
			.await
			.map_err(|e| map_transport_error(&code, e))?;

		let status = response.status();
		if status == StatusCode::UNAUTHORIZED {
			// A stale token is the common cause; drop it so the next call
			// re-authenticates.
			self.invalidate_token();
		}
		if let Some(err) = map_error_status(&code, status.as_u16(), retry_after_header(&response)) {
			warn!("{} request failed: {}", code, err);
			return Err(err);
		}

		response
			.json::<serde_json::Value>()
			.await
			.map_err(|e| MarketplaceError::parse(&code, format!("invalid JSON body: {}", e)))
	}
}

/// Map a non-success HTTP status to the marketplace error taxonomy
///
/// Returns `None` for success statuses. Pure so it can be tested without a
/// live endpoint.
pub fn map_error_status(
	marketplace: &str,
	status: u16,
	retry_after: Option<u64>,
) -> Option<MarketplaceError> {
	match status {
		200..=299 => None,
		401 => Some(MarketplaceError::authentication(
			marketplace,
			"request rejected with 401 Unauthorized",
		)),
		404 => Some(MarketplaceError::not_found(marketplace, "resource not found")),
		429 => Some(MarketplaceError::rate_limit(marketplace, retry_after)),
		400 | 422 => Some(MarketplaceError::invalid_request(
			marketplace,
			format!("provider rejected the request with status {}", status),
		)),
		500..=599 => Some(MarketplaceError::service_unavailable(
			marketplace,
			format!("provider returned status {}", status),
		)),
		_ => Some(MarketplaceError::unknown(
			marketplace,
			format!("unexpected status {}", status),
		)),
	}
}

/// Parse the Retry-After header as delay seconds
fn retry_after_header(response: &Response) -> Option<u64> {
	response
		.headers()
		.get(reqwest::header::RETRY_AFTER)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Timeouts and connection failures both surface as network errors
fn map_transport_error(marketplace: &str, error: reqwest::Error) -> MarketplaceError {
	if error.is_timeout() {
		MarketplaceError::network(marketplace, "request timed out")
	} else if error.is_connect() {
		MarketplaceError::network(marketplace, format!("connection failed: {}", error))
	} else if error.is_decode() {
		MarketplaceError::parse(marketplace, format!("response decode failed: {}", error))
	} else {
		MarketplaceError::network(marketplace, error.to_string())
	}
}
