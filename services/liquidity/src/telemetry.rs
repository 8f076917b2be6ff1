//! Tracing setup for hosts embedding the keeper

use anyhow::{anyhow, Result};
use liquidity_config::KeeperConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `config.log_level`. Fails if a global subscriber is
/// already set.
pub fn init_tracing(config: &KeeperConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow!("invalid log level {:?}: {e}", config.log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow!("tracing already initialized: {e}"))
}
