//! # Liquidity Configuration
//!
//! Layered configuration for the liquidity keeper: built-in defaults, a TOML file,
//! per-environment overrides and `LIQUIDITY_*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use liquidity_config::LiquidityConfig;
//!
//! let config = LiquidityConfig::load(None, Some("testnet"))?;
//! let params = config.params()?;
//! assert!(params.unit_batch_height > 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod liquidity_config;

// Re-export commonly used types
pub use liquidity_config::{load_config, CoinConfig, KeeperConfig, LiquidityConfig, ParamsConfig};
