//! Marketplace error taxonomy and the adapter contract

pub mod errors;
pub mod traits;

pub use errors::{ErrorCode, MarketplaceError, MarketplaceResult};
pub use traits::MarketplaceAdapter;
