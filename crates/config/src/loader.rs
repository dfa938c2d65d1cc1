//! Configuration loading utilities

use crate::settings::{ConfigValidationError, Settings};
use config::{Config, Environment, File};

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
	#[error("failed to load configuration: {0}")]
	Load(#[from] config::ConfigError),

	#[error("invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load settings from the config file plus environment overrides
///
/// Sources, later wins: `config/config.{toml,json,yaml}` (optional), the
/// file named by `CONFIG_PATH` (optional), then `SHOPSEARCH__`-prefixed
/// environment variables with `__` as the nesting separator
/// (e.g. `SHOPSEARCH__ORCHESTRATOR__PER_MARKETPLACE_TIMEOUT_MS=5000`).
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	let mut builder = Config::builder().add_source(File::with_name("config/config").required(false));

	if let Ok(path) = std::env::var("CONFIG_PATH") {
		builder = builder.add_source(File::with_name(&path).required(false));
	}

	let raw = builder
		.add_source(Environment::with_prefix("SHOPSEARCH").separator("__"))
		.build()?;

	let settings: Settings = raw.try_deserialize()?;
	settings.validate()?;
	Ok(settings)
}
