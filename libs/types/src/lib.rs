//! # Liquidity Types Library
//!
//! Domain types for the batched AMM liquidity module: coins, pools, batch headers,
//! queued request states, parameters and the genesis document.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: Coin amounts are `u128` integers; prices and rates are
//!   18-place [`rust_decimal::Decimal`] values with checked arithmetic
//! - **Deterministic Identity**: Reserve accounts and pool coin denoms are pure
//!   functions of `(reserve denoms, pool type)`
//! - **Canonical Encoding**: Ordered collections only, so serialized state is stable
//!   across replicas and export/import cycles
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{offer_coin_fee, Coin, Params, Pool};
//!
//! let pool = Pool::new("uusd", "uatom", 1);
//! assert_eq!(pool.reserve_coin_denoms, vec!["uatom", "uusd"]);
//!
//! let params = Params::default();
//! let fee = offer_coin_fee(&Coin::new("uatom", 10_000), params.swap_fee_rate).unwrap();
//! assert_eq!(fee.amount, 15);
//! ```
//!
//! ## Integration Points
//!
//! - **`amm`**: order book construction and clearing consume [`SwapMsgState`]
//! - **`liquidity`** (keeper): persists every type here through the store codec
//! - **`liquidity-config`**: builds [`Params`] from layered configuration

pub mod coin;
pub mod common;
pub mod genesis;
pub mod keys;
pub mod msgs;
pub mod params;
pub mod pool;

pub use coin::{Coin, Coins};
pub use common::errors::{BankError, LiquidityError, Result};
pub use common::fixed_point::{
    amount_to_dec, check_overflow, check_overflow_amount, error_rate, DecimalMath, DECIMAL_PRECISION,
};
pub use common::identifiers::{
    alphabetical_denom_pair, pool_coin_denom, pool_name, pool_reserve_account,
    reserve_account_from_pool_coin_denom, Address, POOL_COIN_DENOM_PREFIX,
};
pub use genesis::{GenesisState, PoolRecord};
pub use msgs::{
    offer_coin_fee, BatchMsgState, DepositMsgState, LiquidityMsg, MsgCreatePool,
    MsgDepositWithinBatch, MsgSwapWithinBatch, MsgWithdrawWithinBatch, SwapMsgState,
    WithdrawMsgState,
};
pub use params::Params;
pub use pool::{Pool, PoolBatch, PoolMetadata, PoolType};
