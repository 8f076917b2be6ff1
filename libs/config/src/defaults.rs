//! Configuration defaults
//!
//! Keeper-side defaults live here; module parameter defaults come from
//! `types::params` so both layers agree on the same values.

/// Configuration file read when no explicit path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/liquidity.toml";

/// Directory holding per-environment override files (`<env>.toml`)
pub const ENVIRONMENTS_DIR: &str = "config/environments";

/// Environment variables starting with this prefix override file values.
///
/// Nested keys are separated by a double underscore, e.g.
/// `LIQUIDITY_PARAMS__SWAP_FEE_RATE=0.002`.
pub const ENV_PREFIX: &str = "LIQUIDITY";
pub const ENV_SEPARATOR: &str = "__";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Batch invariant checks are on unless a deployment turns them off
pub const DEFAULT_INVARIANT_CHECKS: bool = true;
