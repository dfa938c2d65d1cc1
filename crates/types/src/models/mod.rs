//! Shared utility models used across the domain crates

pub mod secret_string;

pub use secret_string::SecretString;
