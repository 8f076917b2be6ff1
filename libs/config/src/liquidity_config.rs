//! Liquidity Configuration Module
//!
//! Loads keeper and module-parameter configuration in layers:
//!
//! 1. built-in defaults (the module's default parameters)
//! 2. a TOML file (`config/liquidity.toml` unless a path is given)
//! 3. an optional per-environment file (`config/environments/<env>.toml`)
//! 4. `LIQUIDITY_*` environment variables
//!
//! The result converts into a validated [`types::Params`] snapshot.

use crate::defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_INVARIANT_CHECKS, DEFAULT_LOG_LEVEL, ENVIRONMENTS_DIR,
    ENV_PREFIX, ENV_SEPARATOR,
};
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::params::{
    DEFAULT_INIT_POOL_COIN_MINT_AMOUNT, DEFAULT_MIN_INIT_DEPOSIT_AMOUNT,
    DEFAULT_POOL_CREATION_FEE_AMOUNT, DEFAULT_POOL_CREATION_FEE_DENOM, DEFAULT_UNIT_BATCH_HEIGHT,
};
use types::{Coin, Coins, Params, PoolType};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Module parameters
    pub params: ParamsConfig,

    /// Keeper runtime settings
    pub keeper: KeeperConfig,
}

/// Module parameters as they appear in configuration files
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ParamsConfig {
    pub min_init_deposit_amount: u64,
    pub init_pool_coin_mint_amount: u64,
    /// 0 disables the reserve cap
    pub max_reserve_coin_amount: u64,
    pub pool_creation_fee: Vec<CoinConfig>,
    pub swap_fee_rate: Decimal,
    pub withdraw_fee_rate: Decimal,
    pub max_order_amount_ratio: Decimal,
    pub unit_batch_height: u32,
    pub circuit_breaker_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoinConfig {
    pub denom: String,
    pub amount: u64,
}

/// Keeper runtime settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct KeeperConfig {
    /// Run the batch invariant checks after every settlement step
    pub invariant_checks: bool,
    /// `tracing` filter directive, e.g. `info` or `liquidity=debug`
    pub log_level: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            min_init_deposit_amount: DEFAULT_MIN_INIT_DEPOSIT_AMOUNT as u64,
            init_pool_coin_mint_amount: DEFAULT_INIT_POOL_COIN_MINT_AMOUNT as u64,
            max_reserve_coin_amount: 0,
            pool_creation_fee: vec![CoinConfig {
                denom: DEFAULT_POOL_CREATION_FEE_DENOM.to_string(),
                amount: DEFAULT_POOL_CREATION_FEE_AMOUNT as u64,
            }],
            swap_fee_rate: dec!(0.003),
            withdraw_fee_rate: Decimal::ZERO,
            max_order_amount_ratio: dec!(0.1),
            unit_batch_height: DEFAULT_UNIT_BATCH_HEIGHT,
            circuit_breaker_enabled: false,
        }
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            invariant_checks: DEFAULT_INVARIANT_CHECKS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ParamsConfig {
    /// Convert into module parameters and validate them
    pub fn to_params(&self) -> Result<Params> {
        let pool_creation_fee = Coins::new(
            self.pool_creation_fee
                .iter()
                .map(|c| Coin::new(c.denom.clone(), u128::from(c.amount))),
        )
        .context("Invalid pool creation fee")?;

        let params = Params {
            pool_types: vec![PoolType::standard()],
            min_init_deposit_amount: u128::from(self.min_init_deposit_amount),
            init_pool_coin_mint_amount: u128::from(self.init_pool_coin_mint_amount),
            max_reserve_coin_amount: u128::from(self.max_reserve_coin_amount),
            pool_creation_fee,
            swap_fee_rate: self.swap_fee_rate,
            withdraw_fee_rate: self.withdraw_fee_rate,
            max_order_amount_ratio: self.max_order_amount_ratio,
            unit_batch_height: self.unit_batch_height,
            circuit_breaker_enabled: self.circuit_breaker_enabled,
        };
        params.validate().context("Invalid liquidity parameters")?;
        Ok(params)
    }
}

impl LiquidityConfig {
    /// Load configuration from files with environment overrides
    pub fn load(path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        Self::load_with_env(path, environment, None)
    }

    /// Same as [`load`](Self::load), with environment variables taken from `env_vars`
    /// instead of the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        environment: Option<&str>,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let defaults = Config::try_from(&LiquidityConfig::default())
            .context("Failed to build configuration defaults")?;
        let mut builder = Config::builder().add_source(defaults);

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false)),
        };

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = PathBuf::from(ENVIRONMENTS_DIR).join(format!("{env}.toml"));
            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (LIQUIDITY_ prefix)
        let mut env_source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .try_parsing(true);
        if env_vars.is_some() {
            env_source = env_source.source(env_vars);
        }
        builder = builder.add_source(env_source);

        let config: LiquidityConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        debug!(?config, "liquidity configuration loaded");
        Ok(config)
    }

    /// Validated module parameters
    pub fn params(&self) -> Result<Params> {
        self.params.to_params()
    }

    /// Default configuration rendered as TOML, suitable as a starting file
    pub fn render_default_toml() -> Result<String> {
        toml::to_string_pretty(&LiquidityConfig::default())
            .context("Failed to render default configuration")
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(environment: Option<&str>) -> Result<LiquidityConfig> {
    LiquidityConfig::load(None, environment)
}
