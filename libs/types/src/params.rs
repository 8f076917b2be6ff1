//! Module parameters
//!
//! Read-only from the core's perspective: the host (or `liquidity-config`) builds a
//! [`Params`] snapshot, validates it once, and hands it to the keeper.

use crate::coin::{Coin, Coins};
use crate::common::errors::{LiquidityError, Result};
use crate::pool::{PoolType, MAX_RESERVE_COIN_NUM, MIN_RESERVE_COIN_NUM};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const DEFAULT_UNIT_BATCH_HEIGHT: u32 = 1;
pub const DEFAULT_POOL_TYPE_ID: u32 = 1;
pub const DEFAULT_SWAP_TYPE_ID: u32 = 1;
pub const DEFAULT_MIN_INIT_DEPOSIT_AMOUNT: u128 = 1_000_000;
pub const DEFAULT_INIT_POOL_COIN_MINT_AMOUNT: u128 = 1_000_000;
pub const DEFAULT_POOL_CREATION_FEE_DENOM: &str = "stake";
pub const DEFAULT_POOL_CREATION_FEE_AMOUNT: u128 = 40_000_000;

/// Smallest accepted swap offer
pub const MIN_OFFER_COIN_AMOUNT: u128 = 100;

/// Expiry span used for swaps submitted through the message entry point: the
/// order lives until the next settlement instant
pub const CANCEL_ORDER_LIFE_SPAN: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub pool_types: Vec<PoolType>,
    pub min_init_deposit_amount: u128,
    pub init_pool_coin_mint_amount: u128,
    /// Cap on the sum of a pool's reserve amounts; 0 disables the cap
    pub max_reserve_coin_amount: u128,
    pub pool_creation_fee: Coins,
    pub swap_fee_rate: Decimal,
    pub withdraw_fee_rate: Decimal,
    pub max_order_amount_ratio: Decimal,
    pub unit_batch_height: u32,
    pub circuit_breaker_enabled: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            pool_types: vec![PoolType::standard()],
            min_init_deposit_amount: DEFAULT_MIN_INIT_DEPOSIT_AMOUNT,
            init_pool_coin_mint_amount: DEFAULT_INIT_POOL_COIN_MINT_AMOUNT,
            max_reserve_coin_amount: 0,
            pool_creation_fee: Coins::from_coin(Coin::new(
                DEFAULT_POOL_CREATION_FEE_DENOM,
                DEFAULT_POOL_CREATION_FEE_AMOUNT,
            )),
            swap_fee_rate: dec!(0.003),
            withdraw_fee_rate: Decimal::ZERO,
            max_order_amount_ratio: dec!(0.1),
            unit_batch_height: DEFAULT_UNIT_BATCH_HEIGHT,
            circuit_breaker_enabled: false,
        }
    }
}

fn invalid(reason: impl Into<String>) -> LiquidityError {
    LiquidityError::InvalidParams {
        reason: reason.into(),
    }
}

fn validate_rate(name: &str, rate: Decimal) -> Result<()> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(invalid(format!("{name} must not be negative: {rate}")));
    }
    if rate > Decimal::ONE {
        return Err(invalid(format!("{name} too large: {rate}")));
    }
    Ok(())
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        self.validate_pool_types()?;

        if self.min_init_deposit_amount == 0 {
            return Err(invalid("minimum initial deposit amount must be positive"));
        }
        if self.init_pool_coin_mint_amount < DEFAULT_INIT_POOL_COIN_MINT_AMOUNT {
            return Err(invalid(format!(
                "initial pool coin mint amount must be greater than or equal to {}: {}",
                DEFAULT_INIT_POOL_COIN_MINT_AMOUNT, self.init_pool_coin_mint_amount
            )));
        }

        validate_rate("swap fee rate", self.swap_fee_rate)?;
        validate_rate("withdraw fee rate", self.withdraw_fee_rate)?;
        validate_rate("max order amount ratio", self.max_order_amount_ratio)?;

        if self.pool_creation_fee.is_empty() {
            return Err(invalid("pool creation fee must not be empty"));
        }
        self.pool_creation_fee
            .validate()
            .map_err(|e| invalid(format!("pool creation fee: {e}")))?;

        if self.unit_batch_height == 0 {
            return Err(invalid("unit batch height must be positive"));
        }
        Ok(())
    }

    fn validate_pool_types(&self) -> Result<()> {
        if self.pool_types.is_empty() {
            return Err(invalid("pool types must not be empty"));
        }
        for (i, pt) in self.pool_types.iter().enumerate() {
            if pt.id as usize != i + 1 {
                return Err(invalid("pool type ids must be sorted"));
            }
            if pt.max_reserve_coin_num > MAX_RESERVE_COIN_NUM
                || pt.min_reserve_coin_num < MIN_RESERVE_COIN_NUM
                || pt.min_reserve_coin_num > pt.max_reserve_coin_num
            {
                return Err(invalid(
                    "min, max reserve coin num value of pool types are out of bounds",
                ));
            }
        }
        if self.pool_types.len() > 1 || self.pool_types[0] != PoolType::standard() {
            return Err(invalid("the only supported pool type is 1"));
        }
        Ok(())
    }

    /// Look up a pool type by id; ids are positions + 1
    pub fn pool_type(&self, id: u32) -> Result<&PoolType> {
        let idx = (id as usize)
            .checked_sub(1)
            .ok_or(LiquidityError::PoolTypeNotExists)?;
        match self.pool_types.get(idx) {
            Some(pt) if pt.id == id => Ok(pt),
            _ => Err(LiquidityError::PoolTypeNotExists),
        }
    }

    /// `ExceededReserveCoinLimit` if the summed amounts pass the configured cap
    pub fn check_reserve_coin_limit(&self, coins: &Coins) -> Result<()> {
        if self.max_reserve_coin_amount == 0 {
            return Ok(());
        }
        if coins.total_amount()? > self.max_reserve_coin_amount {
            return Err(LiquidityError::ExceededReserveCoinLimit);
        }
        Ok(())
    }

    /// Expiry span for an order queued at `height`: `span`, or the distance to the
    /// next settlement instant when `span` is 0
    pub fn order_expiry_span(&self, height: i64, span: i64) -> i64 {
        if span != 0 {
            return span;
        }
        let unit = i64::from(self.unit_batch_height.max(1));
        (unit - height.rem_euclid(unit)) % unit
    }
}
