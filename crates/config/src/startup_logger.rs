//! Service startup logging
//!
//! Logs service, build and environment details once at startup so a log
//! capture is self-describing.

use std::env;
use tracing::info;

/// Logs service information at startup
pub fn log_service_info() {
	let service_name = "shopsearch";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Shopsearch Service Starting ===");
	info!("Service: {} v{}", service_name, service_version);
	info!("Platform: {} / {}", env::consts::OS, env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("Working directory: {}", cwd.display());
	}
	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("Log filter: {}", rust_log);
	}
	if let Ok(config_path) = env::var("CONFIG_PATH") {
		info!("Config path: {}", config_path);
	}

	info!(
		"Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs service shutdown information
pub fn log_service_shutdown() {
	info!(
		"Shopsearch service shutting down at {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}
