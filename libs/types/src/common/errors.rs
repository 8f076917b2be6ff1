//! Error types for the liquidity module
//!
//! Three families of failure flow through these types:
//!
//! - **Rejections**: a request that violates a policy or shape rule is refused
//!   before any state is touched (bad denom pair, circuit breaker, order ratio).
//! - **Settlement failures**: an escrowed request that cannot be honored when its
//!   batch settles. The coordinator refunds it and marks it for deletion.
//! - **Invariant violations**: [`LiquidityError::InvariantBroken`] means the ledger
//!   may already be wrong. It is the only fatal kind; the host decides whether to
//!   halt or alert.

use thiserror::Error;

/// Errors raised by the ledger primitives (balances, supply, multi-send)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient funds: {address} holds {available}{denom}, needs {needed}{denom}")]
    InsufficientFunds {
        address: String,
        denom: String,
        available: u128,
        needed: u128,
    },

    #[error("multi-send inputs and outputs do not balance for denom {denom}")]
    UnbalancedTransfer { denom: String },

    #[error("supply of {denom} cannot cover burn of {amount}")]
    SupplyUnderflow { denom: String, amount: u128 },

    #[error("amount overflow for denom {denom}")]
    Overflow { denom: String },
}

/// Errors produced by the liquidity pool, batch and swap logic
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LiquidityError {
    // --- pool and pool type -------------------------------------------------
    #[error("pool not exists")]
    PoolNotExists,

    #[error("pool type not exists")]
    PoolTypeNotExists,

    #[error("invalid pool type id")]
    BadPoolTypeId,

    #[error("reserve coin denoms must be distinct")]
    EqualDenom,

    #[error("invalid denom")]
    InvalidDenom,

    #[error("invalid address")]
    InvalidAddress,

    #[error("invalid number of reserve coins")]
    NumOfReserveCoin,

    #[error("invalid number of pool coins")]
    NumOfPoolCoin,

    #[error("pool is depleted")]
    DepletedPool,

    #[error("pool already exists")]
    PoolAlreadyExists,

    #[error("pool batch not exists")]
    PoolBatchNotExists,

    #[error("reserve coins are not sorted alphabetically")]
    BadOrderingReserveCoin,

    #[error("reserve coin denoms do not match the pool")]
    NotMatchedReserveCoin,

    #[error("invalid pool coin denom")]
    BadPoolCoinDenom,

    // --- amounts --------------------------------------------------------------
    #[error("invalid pool coin amount")]
    BadPoolCoinAmount,

    #[error("invalid deposit coin amounts")]
    BadDepositCoinsAmount,

    #[error("invalid offer coin amount")]
    BadOfferCoinAmount,

    #[error("offer coin fee does not match the current swap fee rate")]
    BadOfferCoinFee,

    #[error("order price must be positive")]
    BadOrderPrice,

    #[error("deposit coin is less than the minimum initial deposit amount")]
    LessThanMinInitDeposit,

    #[error("offer coin amount is less than the minimum offer amount")]
    LessThanMinOfferAmount,

    #[error("offer amount exceeds the maximum orderable amount")]
    ExceededMaxOrderable,

    #[error("total reserve coin amount exceeds the reserve coin limit")]
    ExceededReserveCoinLimit,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("insufficient balance to pay the pool creation fee")]
    InsufficientPoolCreationFee,

    #[error("amount overflow")]
    OverflowAmount,

    #[error("pool coin truncated, no accepted coin, refund")]
    NoAcceptedCoin,

    // --- batch lifecycle -----------------------------------------------------
    #[error("batch message index is not consistent with the batch")]
    BadBatchMsgIndex,

    #[error("cannot process already executed batch msg")]
    AlreadyProcessed,

    #[error("cannot refund not executed or already succeeded msg")]
    NotRefundable,

    #[error("batch is not executed")]
    BatchNotExecuted,

    #[error("order book is invalid after matching")]
    OrderBookInvalidity,

    #[error("circuit breaker is enabled")]
    CircuitBreakerEnabled,

    // --- configuration and genesis --------------------------------------------
    #[error("invalid params: {reason}")]
    InvalidParams { reason: String },

    #[error("invalid genesis: {reason}")]
    InvalidGenesis { reason: String },

    // --- collaborators ------------------------------------------------------
    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("store codec error: {0}")]
    Codec(String),

    // --- fatal ----------------------------------------------------------------
    #[error("invariant broken: {reason}")]
    InvariantBroken { reason: String },
}

impl LiquidityError {
    /// Build the fatal invariant error
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantBroken {
            reason: reason.into(),
        }
    }

    /// True for errors that signal a corrupted ledger rather than a bad request
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantBroken { .. })
    }
}

impl From<bincode::Error> for LiquidityError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<serde_json::Error> for LiquidityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

pub type Result<T, E = LiquidityError> = std::result::Result<T, E>;
