//! # Liquidity AMM Library - Batch Matching Engine
//!
//! ## Purpose
//!
//! Pure calculation layer for batched liquidity pools. Given a pool's reserves and
//! the swaps queued during one batch interval, finds the single uniform clearing
//! price, allocates fills best-price first, and updates the swap records. Also
//! carries the share math used when deposits and withdrawals settle.
//!
//! Nothing here touches balances or storage: every function takes plain values or
//! slices of message states and returns results or fallible errors. The keeper moves
//! coins based on what this crate decides.
//!
//! ## Integration Points
//!
//! - **Input**: reserve amounts and `SwapMsgState` slices from the batch ledger
//! - **Output**: [`BatchResult`], per-order [`MatchResult`]s, pool deltas, and
//!   [`DepositAllocation`] / [`WithdrawAllocation`] splits
//! - **Errors**: `types::LiquidityError`; broken internal consistency surfaces as
//!   `InvariantBroken`, arithmetic overflow as `OverflowAmount`
//!
//! ## Architecture Role
//!
//! ```text
//!   swap states ──► OrderBook::from_states ──► OrderBook::match_orders(x, y)
//!                                                    │ BatchResult
//!                                                    ▼
//!                   find_order_match (X→Y, Y→X) ──► update_swap_msg_states
//!                                                    │ pool deltas
//!                                                    ▼
//!                   validate_state_and_expire_orders, OrderBook::validate
//! ```
//!
//! ## Precision
//!
//! Prices and intermediate amounts are `Decimal` at 18 fractional digits; coin
//! amounts are `u128`. Amounts taken from orders round up, amounts paid out are
//! truncated, so a batch never pays out more than it takes in.

pub mod allocation;
pub mod clearing;
pub mod order_book;
pub mod pool_share;

pub use allocation::{
    check_swap_price, count_fractional_matched_msgs, count_not_matched_msgs, find_order_match,
    sort_by_priority, update_swap_msg_states, validate_state_and_expire_orders, MatchResult,
    OrderMatch,
};
pub use clearing::{BatchResult, MatchType};
pub use order_book::{BookSides, Order, OrderBook, OrderDirection, PriceDirection};
pub use pool_share::{DepositAllocation, PoolShareMath, WithdrawAllocation};

// Re-export Decimal for convenience
pub use rust_decimal::Decimal;
