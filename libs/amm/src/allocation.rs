//! Fill allocation at the clearing price
//!
//! Once the clearing search fixes a swap price and the executable amount on each
//! side, orders are filled best-price first. Levels that fit entirely inside the
//! executable amount fill in full; the marginal level fills pro rata, every order
//! on it at the same ratio.
//!
//! Amounts are rounded so the ledger never pays out more than it holds:
//! transacted amounts round up (the order gives slightly more), demand amounts are
//! truncated later when coins actually move.

use crate::order_book::OrderDirection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::{amount_to_dec, DecimalMath, LiquidityError, Result, SwapMsgState};

/// Fill of one queued swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub direction: OrderDirection,
    /// Position of the swap in the state slice the match ran over
    pub slot: usize,
    pub msg_index: u64,
    pub order_price: Decimal,
    pub offer_coin_amt: Decimal,
    pub transacted_coin_amt: Decimal,
    pub exchanged_demand_coin_amt: Decimal,
    pub offer_coin_fee_amt: Decimal,
    pub exchanged_coin_fee_amt: Decimal,
}

/// Fills on one side plus what they do to the pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderMatch {
    pub results: Vec<MatchResult>,
    pub pool_x_delta: Decimal,
    pub pool_y_delta: Decimal,
}

/// Best price first: X→Y by descending limit, Y→X by ascending. Stable, so
/// equal prices keep queue order.
pub fn sort_by_priority(direction: OrderDirection, states: &[SwapMsgState], slots: &mut [usize]) {
    match direction {
        OrderDirection::XtoY => slots.sort_by(|a, b| {
            states[*b]
                .msg
                .order_price
                .cmp(&states[*a].msg.order_price)
        }),
        OrderDirection::YtoX => slots.sort_by(|a, b| {
            states[*a]
                .msg
                .order_price
                .cmp(&states[*b].msg.order_price)
        }),
    }
}

/// Allocate `executable_amt` of offer across one side of the book.
///
/// `slots` index into `states` and are re-sorted by priority in place.
pub fn find_order_match(
    direction: OrderDirection,
    states: &[SwapMsgState],
    slots: &mut [usize],
    executable_amt: Decimal,
    swap_price: Decimal,
) -> Result<OrderMatch> {
    let mut matched = OrderMatch::default();
    if executable_amt.is_zero() {
        return Ok(matched);
    }
    sort_by_priority(direction, states, slots);

    let mut level_amt: u128 = 0;
    let mut accum_amt: u128 = 0;
    let mut level: Vec<usize> = Vec::new();

    for (i, &slot) in slots.iter().enumerate() {
        let state = &states[slot];
        let price = state.msg.order_price;
        let crosses = match direction {
            OrderDirection::XtoY => price >= swap_price,
            OrderDirection::YtoX => price <= swap_price,
        };
        if !crosses {
            break;
        }

        level_amt = level_amt
            .checked_add(state.remaining_offer_coin.amount)
            .ok_or(LiquidityError::OverflowAmount)?;
        level.push(slot);

        let level_ends = slots
            .get(i + 1)
            .map_or(true, |next| states[*next].msg.order_price != price);
        if !level_ends {
            continue;
        }

        if level_amt > 0 {
            let level_dec = amount_to_dec(level_amt)?;
            let accum_dec = amount_to_dec(accum_amt)?;
            let ratio = if accum_dec.try_add(level_dec)? >= executable_amt {
                executable_amt.try_sub(accum_dec)?.try_quo(level_dec)?
            } else {
                Decimal::ONE
            };
            if ratio > Decimal::ONE {
                return Err(LiquidityError::invariant(format!(
                    "fractional match ratio {ratio} above one"
                )));
            }
            // Better-priced levels already used up the executable amount
            if ratio <= Decimal::ZERO {
                break;
            }

            for &filled in &level {
                let result = allocate(direction, &states[filled], filled, ratio, swap_price)?;
                match direction {
                    OrderDirection::XtoY => {
                        matched.pool_x_delta =
                            matched.pool_x_delta.try_add(result.transacted_coin_amt)?;
                        matched.pool_y_delta = matched
                            .pool_y_delta
                            .try_sub(result.exchanged_demand_coin_amt)?;
                    }
                    OrderDirection::YtoX => {
                        matched.pool_x_delta = matched
                            .pool_x_delta
                            .try_sub(result.exchanged_demand_coin_amt)?;
                        matched.pool_y_delta =
                            matched.pool_y_delta.try_add(result.transacted_coin_amt)?;
                    }
                }
                matched.results.push(result);
            }
            accum_amt = accum_amt
                .checked_add(level_amt)
                .ok_or(LiquidityError::OverflowAmount)?;
        }

        level_amt = 0;
        level.clear();
    }
    Ok(matched)
}

fn allocate(
    direction: OrderDirection,
    state: &SwapMsgState,
    slot: usize,
    ratio: Decimal,
    swap_price: Decimal,
) -> Result<MatchResult> {
    let offer = amount_to_dec(state.remaining_offer_coin.amount)?;
    let reserved_fee = amount_to_dec(state.reserved_offer_coin_fee.amount)?;
    let transacted = offer.try_mul(ratio)?.ceil();
    // Nearly full fills take the whole reserved fee so no fee dust stays behind
    let fee = if offer.try_sub(transacted)? <= Decimal::ONE {
        reserved_fee
    } else {
        reserved_fee.try_mul(ratio)?
    };
    let (exchanged, exchanged_fee) = match direction {
        OrderDirection::XtoY => (transacted.try_quo(swap_price)?, fee.try_quo(swap_price)?),
        OrderDirection::YtoX => (transacted.try_mul(swap_price)?, fee.try_mul(swap_price)?),
    };

    if transacted > offer {
        return Err(LiquidityError::invariant(format!(
            "transacted {transacted} exceeds offer {offer} for msg {}",
            state.msg_index
        )));
    }
    if fee > offer && fee > Decimal::ONE {
        return Err(LiquidityError::invariant(format!(
            "offer fee {fee} exceeds offer {offer} for msg {}",
            state.msg_index
        )));
    }

    Ok(MatchResult {
        direction,
        slot,
        msg_index: state.msg_index,
        order_price: state.msg.order_price,
        offer_coin_amt: offer,
        transacted_coin_amt: transacted,
        exchanged_demand_coin_amt: exchanged,
        offer_coin_fee_amt: fee,
        exchanged_coin_fee_amt: exchanged_fee,
    })
}

/// Apply fills to the swap states and return the resulting pool deltas `(x, y)`.
///
/// An order left with at most one unit is treated as fully filled: its remainder
/// is zeroed and the record is marked for deletion. The unit stays accounted for as
/// `offer − exchanged` and goes back to the requester when the record leaves.
pub fn update_swap_msg_states(
    states: &mut [SwapMsgState],
    results: &[MatchResult],
) -> Result<(Decimal, Decimal)> {
    let mut pool_x_delta = Decimal::ZERO;
    let mut pool_y_delta = Decimal::ZERO;

    for m in results {
        match m.direction {
            OrderDirection::XtoY => {
                pool_x_delta = pool_x_delta.try_add(m.transacted_coin_amt)?;
                pool_y_delta = pool_y_delta.try_sub(m.exchanged_demand_coin_amt)?;
            }
            OrderDirection::YtoX => {
                pool_x_delta = pool_x_delta.try_sub(m.exchanged_demand_coin_amt)?;
                pool_y_delta = pool_y_delta.try_add(m.transacted_coin_amt)?;
            }
        }

        let state = states
            .get_mut(m.slot)
            .filter(|s| s.msg_index == m.msg_index)
            .ok_or_else(|| {
                LiquidityError::invariant(format!("match result for msg {} lost its state", m.msg_index))
            })?;

        let transacted = m.transacted_coin_amt.truncate_amount()?;
        let fee = m.offer_coin_fee_amt.truncate_amount()?;
        let full_fill =
            amount_to_dec(state.remaining_offer_coin.amount)?.try_sub(m.transacted_coin_amt)? <= Decimal::ONE;

        state.exchanged_offer_coin.amount = state
            .exchanged_offer_coin
            .amount
            .checked_add(transacted)
            .ok_or(LiquidityError::OverflowAmount)?;
        state.remaining_offer_coin.amount = state
            .remaining_offer_coin
            .amount
            .checked_sub(transacted)
            .ok_or_else(|| negative_after_update(m.msg_index))?;
        state.reserved_offer_coin_fee.amount = state
            .reserved_offer_coin_fee
            .amount
            .checked_sub(fee)
            .ok_or_else(|| negative_after_update(m.msg_index))?;

        if full_fill {
            state.remaining_offer_coin.amount = 0;
            if state.exchanged_offer_coin.amount > state.msg.offer_coin.amount
                || state.reserved_offer_coin_fee.amount > 1
            {
                return Err(LiquidityError::invariant(format!(
                    "invalid state after full fill of msg {}",
                    m.msg_index
                )));
            }
            state.succeeded = true;
            state.to_be_deleted = true;
        } else {
            state.succeeded = true;
            state.to_be_deleted = false;
        }
    }
    Ok((pool_x_delta, pool_y_delta))
}

fn negative_after_update(msg_index: u64) -> LiquidityError {
    LiquidityError::invariant(format!("negative coin amount after update of msg {msg_index}"))
}

/// Consistency check over executed swaps; with `expire_this_height`, orders whose
/// expiry is `height` are marked for deletion.
pub fn validate_state_and_expire_orders(
    states: &mut [SwapMsgState],
    height: i64,
    expire_this_height: bool,
) -> Result<()> {
    for state in states.iter_mut() {
        if !state.executed {
            return Err(LiquidityError::invariant(format!(
                "swap msg {} not executed",
                state.msg_index
            )));
        }
        if state.remaining_offer_coin.is_zero() {
            if !state.succeeded || !state.to_be_deleted {
                return Err(LiquidityError::invariant(format!(
                    "broken state consistency for filled swap msg {}",
                    state.msg_index
                )));
            }
            continue;
        }
        if height > state.order_expiry_height {
            if state.succeeded || !state.to_be_deleted {
                return Err(LiquidityError::invariant(format!(
                    "broken state consistency for expired swap msg {}",
                    state.msg_index
                )));
            }
            continue;
        }
        if expire_this_height && height == state.order_expiry_height {
            state.to_be_deleted = true;
        }
    }
    Ok(())
}

/// Every fill must convert at the clearing price within one unit of rounding
pub fn check_swap_price(
    x_to_y: &[MatchResult],
    y_to_x: &[MatchResult],
    swap_price: Decimal,
) -> Result<bool> {
    if x_to_y.is_empty() && y_to_x.is_empty() {
        return Ok(true);
    }
    for m in x_to_y {
        let expected = m.transacted_coin_amt.try_quo(swap_price)?;
        if expected.try_sub(m.exchanged_demand_coin_amt)?.abs() > Decimal::ONE {
            return Ok(false);
        }
    }
    for m in y_to_x {
        let expected = m.transacted_coin_amt.try_mul(swap_price)?;
        if expected.try_sub(m.exchanged_demand_coin_amt)?.abs() > Decimal::ONE {
            return Ok(false);
        }
    }
    Ok(!swap_price.is_zero())
}

/// Executed swaps that found no fill
pub fn count_not_matched_msgs<'a>(states: impl IntoIterator<Item = &'a SwapMsgState>) -> usize {
    states
        .into_iter()
        .filter(|s| s.executed && !s.succeeded)
        .count()
}

/// Executed swaps that were partly filled and stay queued
pub fn count_fractional_matched_msgs<'a>(
    states: impl IntoIterator<Item = &'a SwapMsgState>,
) -> usize {
    states
        .into_iter()
        .filter(|s| s.executed && s.succeeded && !s.to_be_deleted)
        .count()
}
