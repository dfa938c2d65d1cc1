//! Shopsearch Configuration
//!
//! Configuration loading and startup utilities for the shopsearch
//! marketplace aggregator.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, ConfigLoadError};
pub use settings::{
	ConfigValidationError, LlmSettings, LogFormat, LoggingSettings, MarketplaceSettings,
	OrchestratorSettings, Settings,
};
pub use startup_logger::{log_service_info, log_service_shutdown};
