//! Requests and their queued states
//!
//! Each request type has a `validate_basic` shape check that needs no state. Accepted
//! deposit/withdraw/swap requests are wrapped in a `*MsgState` record and queued in
//! the pool's batch until settlement.
//!
//! ## Message flow
//!
//! ```text
//! LiquidityMsg ──validate_basic──► keeper queue op ──escrow──► *MsgState (queued)
//!                                                                   │
//!                  begin_block purge ◄── to_be_deleted ◄── end_block settlement
//! ```

use crate::coin::{Coin, Coins};
use crate::common::errors::{LiquidityError, Result};
use crate::common::fixed_point::{amount_to_dec, DecimalMath};
use crate::common::identifiers::Address;
use crate::keys::{
    DEPOSIT_MSG_STATE_KEY_PREFIX, SWAP_MSG_STATE_KEY_PREFIX, WITHDRAW_MSG_STATE_KEY_PREFIX,
};
use crate::params::MIN_OFFER_COIN_AMOUNT;
use crate::pool::{MAX_RESERVE_COIN_NUM, MIN_RESERVE_COIN_NUM};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

fn check_reserve_count(coins: &[Coin]) -> Result<()> {
    let n = coins.len() as u32;
    if !(MIN_RESERVE_COIN_NUM..=MAX_RESERVE_COIN_NUM).contains(&n) {
        return Err(LiquidityError::NumOfReserveCoin);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreatePool {
    pub pool_creator: Address,
    pub pool_type_id: u32,
    /// Kept in submission order so the canonical-order check sees what was sent
    pub deposit_coins: Vec<Coin>,
}

impl MsgCreatePool {
    pub fn validate_basic(&self) -> Result<()> {
        if self.pool_type_id < 1 {
            return Err(LiquidityError::BadPoolTypeId);
        }
        for coin in &self.deposit_coins {
            coin.validate()?;
            if !coin.is_positive() {
                return Err(LiquidityError::BadDepositCoinsAmount);
            }
        }
        check_reserve_count(&self.deposit_coins)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDepositWithinBatch {
    pub depositor: Address,
    pub pool_id: u64,
    pub deposit_coins: Vec<Coin>,
}

impl MsgDepositWithinBatch {
    pub fn validate_basic(&self) -> Result<()> {
        for coin in &self.deposit_coins {
            coin.validate()?;
            if !coin.is_positive() {
                return Err(LiquidityError::BadDepositCoinsAmount);
            }
        }
        check_reserve_count(&self.deposit_coins)
    }

    /// Deposit coins in canonical form
    pub fn coins(&self) -> Result<Coins> {
        Coins::new(self.deposit_coins.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdrawWithinBatch {
    pub withdrawer: Address,
    pub pool_id: u64,
    pub pool_coin: Coin,
}

impl MsgWithdrawWithinBatch {
    pub fn validate_basic(&self) -> Result<()> {
        self.pool_coin.validate()?;
        if !self.pool_coin.is_positive() {
            return Err(LiquidityError::BadPoolCoinAmount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSwapWithinBatch {
    pub swap_requester: Address,
    pub pool_id: u64,
    pub swap_type_id: u32,
    pub offer_coin: Coin,
    pub demand_coin_denom: String,
    /// Half the swap fee, reserved up front alongside the offer
    pub offer_coin_fee: Coin,
    /// Limit price in units of X per Y
    pub order_price: Decimal,
}

impl MsgSwapWithinBatch {
    pub fn validate_basic(&self) -> Result<()> {
        self.offer_coin.validate()?;
        Coin::validate_denom(&self.demand_coin_denom)?;
        if !self.offer_coin.is_positive() {
            return Err(LiquidityError::BadOfferCoinAmount);
        }
        if self.order_price <= Decimal::ZERO {
            return Err(LiquidityError::BadOrderPrice);
        }
        if self.offer_coin.amount < MIN_OFFER_COIN_AMOUNT {
            return Err(LiquidityError::LessThanMinOfferAmount);
        }
        Ok(())
    }
}

/// Fee reserved with a swap offer: `ceil(offer × swap_fee_rate / 2)` in the offer denom
pub fn offer_coin_fee(offer_coin: &Coin, swap_fee_rate: Decimal) -> Result<Coin> {
    if swap_fee_rate.is_zero() {
        return Ok(Coin::zero(offer_coin.denom.clone()));
    }
    let half_rate = swap_fee_rate.try_quo(Decimal::TWO)?;
    let amount = amount_to_dec(offer_coin.amount)?
        .try_mul(half_rate)?
        .ceil_amount()?;
    Ok(Coin::new(offer_coin.denom.clone(), amount))
}

/// Every request the module accepts, dispatched by the keeper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityMsg {
    CreatePool(MsgCreatePool),
    DepositWithinBatch(MsgDepositWithinBatch),
    WithdrawWithinBatch(MsgWithdrawWithinBatch),
    SwapWithinBatch(MsgSwapWithinBatch),
}

impl LiquidityMsg {
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Self::CreatePool(m) => m.validate_basic(),
            Self::DepositWithinBatch(m) => m.validate_basic(),
            Self::WithdrawWithinBatch(m) => m.validate_basic(),
            Self::SwapWithinBatch(m) => m.validate_basic(),
        }
    }

    pub fn signer(&self) -> Address {
        match self {
            Self::CreatePool(m) => m.pool_creator,
            Self::DepositWithinBatch(m) => m.depositor,
            Self::WithdrawWithinBatch(m) => m.withdrawer,
            Self::SwapWithinBatch(m) => m.swap_requester,
        }
    }

    /// Withdrawals stay open while the circuit breaker is engaged
    pub fn blocked_by_circuit_breaker(&self) -> bool {
        !matches!(self, Self::WithdrawWithinBatch(_))
    }
}

/// Lifecycle flags and store placement shared by the three queue record types
pub trait BatchMsgState: Clone + Serialize + DeserializeOwned {
    /// Store key prefix of this queue
    const KEY_PREFIX: u8;

    fn pool_id(&self) -> u64;
    fn msg_index(&self) -> u64;
    fn executed(&self) -> bool;
    fn succeeded(&self) -> bool;
    fn to_be_deleted(&self) -> bool;
    fn set_executed(&mut self, value: bool);
    fn set_succeeded(&mut self, value: bool);
    fn set_to_be_deleted(&mut self, value: bool);

    /// Not yet attempted in the current interval
    fn is_pending(&self) -> bool {
        !self.executed() && !self.succeeded() && !self.to_be_deleted()
    }

    /// Clear execution flags so the record joins the next interval
    fn reset_for_next_batch(&mut self) {
        self.set_executed(false);
        self.set_succeeded(false);
    }
}

macro_rules! impl_batch_msg_state {
    ($ty:ty, $prefix:expr) => {
        impl BatchMsgState for $ty {
            const KEY_PREFIX: u8 = $prefix;

            fn pool_id(&self) -> u64 {
                self.msg.pool_id
            }
            fn msg_index(&self) -> u64 {
                self.msg_index
            }
            fn executed(&self) -> bool {
                self.executed
            }
            fn succeeded(&self) -> bool {
                self.succeeded
            }
            fn to_be_deleted(&self) -> bool {
                self.to_be_deleted
            }
            fn set_executed(&mut self, value: bool) {
                self.executed = value;
            }
            fn set_succeeded(&mut self, value: bool) {
                self.succeeded = value;
            }
            fn set_to_be_deleted(&mut self, value: bool) {
                self.to_be_deleted = value;
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMsgState {
    pub msg_height: i64,
    pub msg_index: u64,
    pub executed: bool,
    pub succeeded: bool,
    pub to_be_deleted: bool,
    pub msg: MsgDepositWithinBatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawMsgState {
    pub msg_height: i64,
    pub msg_index: u64,
    pub executed: bool,
    pub succeeded: bool,
    pub to_be_deleted: bool,
    pub msg: MsgWithdrawWithinBatch,
}

/// Queued swap. `remaining_offer_coin` and `reserved_offer_coin_fee` shrink across
/// intervals as partial fills land; `exchanged_offer_coin` grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMsgState {
    pub msg_height: i64,
    pub msg_index: u64,
    pub executed: bool,
    pub succeeded: bool,
    pub to_be_deleted: bool,
    pub order_expiry_height: i64,
    pub exchanged_offer_coin: Coin,
    pub remaining_offer_coin: Coin,
    pub reserved_offer_coin_fee: Coin,
    pub msg: MsgSwapWithinBatch,
}

impl SwapMsgState {
    pub fn new(msg: MsgSwapWithinBatch, msg_index: u64, height: i64, expiry_span: i64) -> Self {
        Self {
            msg_height: height,
            msg_index,
            executed: false,
            succeeded: false,
            to_be_deleted: false,
            order_expiry_height: height + expiry_span,
            exchanged_offer_coin: Coin::zero(msg.offer_coin.denom.clone()),
            remaining_offer_coin: msg.offer_coin.clone(),
            reserved_offer_coin_fee: msg.offer_coin_fee.clone(),
            msg,
        }
    }

    /// Everything still held in escrow for this order: the unexchanged part of the
    /// offer plus the unspent fee. Equals remaining + reserved fee except after a
    /// full fill that left a single unit behind.
    pub fn refundable_amount(&self) -> Result<u128> {
        self.msg
            .offer_coin
            .amount
            .checked_sub(self.exchanged_offer_coin.amount)
            .and_then(|unexchanged| unexchanged.checked_add(self.reserved_offer_coin_fee.amount))
            .ok_or(LiquidityError::OverflowAmount)
    }
}

impl_batch_msg_state!(DepositMsgState, DEPOSIT_MSG_STATE_KEY_PREFIX);
impl_batch_msg_state!(WithdrawMsgState, WITHDRAW_MSG_STATE_KEY_PREFIX);
impl_batch_msg_state!(SwapMsgState, SWAP_MSG_STATE_KEY_PREFIX);
