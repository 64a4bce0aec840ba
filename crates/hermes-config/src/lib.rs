//! Typed configuration for Hermes.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("warm-up mode: {}", config.provider.warmup);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [provider]
//! warmup = "background"        # or "disabled"
//! negotiation_load = "warm"    # or "refresh"
//! warmup_thread_name = "hermes-warmup"
//!
//! [telemetry]
//! service_name = "orders-api"
//!
//! [telemetry.metrics]
//! enabled = true
//! duration_buckets = [0.0001, 0.001, 0.01, 0.1, 1.0]
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `HERMES__PROVIDER__WARMUP=disabled`
//! - `HERMES__PROVIDER__NEGOTIATION_LOAD=refresh`
//! - `HERMES__TELEMETRY__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
