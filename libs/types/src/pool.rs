//! Pool, pool type and batch header records

use crate::coin::{Coin, Coins};
use crate::common::errors::{LiquidityError, Result};
use crate::common::identifiers::{
    alphabetical_denom_pair, pool_coin_denom, pool_name, pool_reserve_account, Address,
};
use serde::{Deserialize, Serialize};

/// Lower bound on reserve coins per pool
pub const MIN_RESERVE_COIN_NUM: u32 = 2;
/// Upper bound on reserve coins per pool
pub const MAX_RESERVE_COIN_NUM: u32 = 2;

/// Family of pools sharing a pricing function and reserve-count bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolType {
    pub id: u32,
    pub name: String,
    pub min_reserve_coin_num: u32,
    pub max_reserve_coin_num: u32,
    pub description: String,
}

impl PoolType {
    /// The only supported type: X/Y constant-product pricing with two reserve coins
    pub fn standard() -> Self {
        Self {
            id: 1,
            name: "StandardLiquidityPool".to_string(),
            min_reserve_coin_num: MIN_RESERVE_COIN_NUM,
            max_reserve_coin_num: MAX_RESERVE_COIN_NUM,
            description: "Standard liquidity pool with pool price function X/Y, ESPM constraint, \
                          and two kinds of reserve coins"
                .to_string(),
        }
    }

    pub fn accepts_reserve_count(&self, count: usize) -> bool {
        let count = count as u32;
        self.min_reserve_coin_num <= count && count <= self.max_reserve_coin_num
    }
}

/// A liquidity pool. Everything except `id` is derived from the identity tuple
/// `(reserve_coin_denoms, type_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: u64,
    pub type_id: u32,
    pub reserve_coin_denoms: Vec<String>,
    pub reserve_account: Address,
    pub pool_coin_denom: String,
}

impl Pool {
    /// Build the pool record for a denom pair; `id` is assigned by the registry
    pub fn new(denom_a: &str, denom_b: &str, type_id: u32) -> Self {
        let (a, b) = alphabetical_denom_pair(denom_a, denom_b);
        let denoms = vec![a.to_string(), b.to_string()];
        let name = pool_name(&denoms, type_id);
        Self {
            id: 0,
            type_id,
            reserve_account: pool_reserve_account(&name),
            pool_coin_denom: pool_coin_denom(&name),
            reserve_coin_denoms: denoms,
        }
    }

    pub fn name(&self) -> String {
        pool_name(&self.reserve_coin_denoms, self.type_id)
    }

    /// Canonical `(X, Y)` denoms
    pub fn denom_x(&self) -> &str {
        self.reserve_coin_denoms.first().map(String::as_str).unwrap_or_default()
    }

    pub fn denom_y(&self) -> &str {
        self.reserve_coin_denoms.get(1).map(String::as_str).unwrap_or_default()
    }

    /// True if `a`/`b` (any order) is this pool's reserve pair
    pub fn matches_pair(&self, a: &str, b: &str) -> bool {
        let (a, b) = alphabetical_denom_pair(a, b);
        a == self.denom_x() && b == self.denom_y()
    }

    /// Structural checks: identity fields must be recomputable from the tuple
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(LiquidityError::PoolNotExists);
        }
        if self.type_id == 0 {
            return Err(LiquidityError::PoolTypeNotExists);
        }
        let count = self.reserve_coin_denoms.len() as u32;
        if !(MIN_RESERVE_COIN_NUM..=MAX_RESERVE_COIN_NUM).contains(&count) {
            return Err(LiquidityError::NumOfReserveCoin);
        }
        let (a, b) = alphabetical_denom_pair(self.denom_x(), self.denom_y());
        if a != self.denom_x() || b != self.denom_y() {
            return Err(LiquidityError::BadOrderingReserveCoin);
        }
        if a == b {
            return Err(LiquidityError::EqualDenom);
        }
        let name = self.name();
        if self.reserve_account != pool_reserve_account(&name) {
            return Err(LiquidityError::InvalidAddress);
        }
        if self.pool_coin_denom != pool_coin_denom(&name) {
            return Err(LiquidityError::BadPoolCoinDenom);
        }
        Ok(())
    }
}

/// Header of the batch currently collecting requests for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBatch {
    pub pool_id: u64,
    pub index: u64,
    pub begin_height: i64,
    pub deposit_msg_index: u64,
    pub withdraw_msg_index: u64,
    pub swap_msg_index: u64,
    pub executed: bool,
}

impl PoolBatch {
    pub fn new(pool_id: u64, index: u64) -> Self {
        Self {
            pool_id,
            index,
            begin_height: 0,
            deposit_msg_index: 1,
            withdraw_msg_index: 1,
            swap_msg_index: 1,
            executed: false,
        }
    }
}

/// Ledger-derived view of a pool at export time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    pub pool_id: u64,
    pub pool_coin_total_supply: Coin,
    pub reserve_coins: Coins,
}
