//! Batch invariant checks
//!
//! Post-conditions over settlement and matching results. Each check returns
//! [`LiquidityError::InvariantBroken`] instead of panicking; the keeper runs them
//! when `invariant_checks` is on and the host decides what a broken ledger means.
//!
//! Ratio checks only apply once every amount involved reaches
//! [`COIN_AMOUNT_THRESHOLD`]: below that a single unit of truncation already moves a
//! ratio past [`ERROR_RATE_THRESHOLD`].

use amm::{count_not_matched_msgs, BatchResult, MatchResult, PriceDirection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use types::{
    amount_to_dec, error_rate, Coin, Coins, DecimalMath, DepositMsgState, LiquidityError, Result,
    SwapMsgState, WithdrawMsgState,
};

/// Largest tolerated relative drift of a ratio
pub const ERROR_RATE_THRESHOLD: Decimal = dec!(0.05);

/// Amounts below this are exempt from ratio checks
pub const COIN_AMOUNT_THRESHOLD: u128 = 20;

fn broken(reason: impl Into<String>) -> Result<()> {
    Err(LiquidityError::invariant(reason))
}

fn all_above_threshold(amounts: &[u128]) -> bool {
    amounts.iter().all(|a| *a >= COIN_AMOUNT_THRESHOLD)
}

fn ratio(a: u128, b: u128) -> Result<Decimal> {
    amount_to_dec(a)?.try_quo(amount_to_dec(b)?)
}

/// `|actual - expected| / actual`, for integer amounts
fn amount_drift(actual: u128, expected: u128) -> Result<Decimal> {
    ratio(actual.abs_diff(expected), actual)
}

fn sub(a: u128, b: u128, what: &str) -> Result<u128> {
    a.checked_sub(b)
        .ok_or_else(|| LiquidityError::invariant(format!("negative {what}")))
}

/// Escrow must cover every request still queued, across all pools
pub fn check_escrow_amount(
    escrow: &Coins,
    swaps: &[SwapMsgState],
    deposits: &[DepositMsgState],
    withdrawals: &[WithdrawMsgState],
) -> Result<()> {
    let mut outstanding = Coins::empty();
    for swap in swaps.iter().filter(|s| !s.to_be_deleted) {
        let held = swap.msg.offer_coin.denom.clone();
        outstanding.add_coin(&Coin::new(held, swap.refundable_amount()?))?;
    }
    for deposit in deposits.iter().filter(|d| !d.to_be_deleted) {
        for coin in &deposit.msg.deposit_coins {
            outstanding.add_coin(coin)?;
        }
    }
    for withdrawal in withdrawals.iter().filter(|w| !w.to_be_deleted) {
        outstanding.add_coin(&withdrawal.msg.pool_coin)?;
    }
    if !escrow.is_all_gte(&outstanding) {
        return broken(format!(
            "batch escrow amount {escrow} below outstanding {outstanding}"
        ));
    }
    Ok(())
}

/// Minted shares must match the accepted deposit ratio
pub fn check_minting_pool_coins(
    supply: u128,
    minted: u128,
    deposit: [u128; 2],
    last_reserve: [u128; 2],
    refunded: [u128; 2],
) -> Result<()> {
    let accepted_a = sub(deposit[0], refunded[0], "accepted deposit")?;
    let accepted_b = sub(deposit[1], refunded[1], "accepted deposit")?;

    let pool_coin_ratio = ratio(minted, supply)?;
    let deposit_a_ratio = ratio(accepted_a, last_reserve[0])?;
    let deposit_b_ratio = ratio(accepted_b, last_reserve[1])?;

    if all_above_threshold(&[
        accepted_a,
        accepted_b,
        last_reserve[0],
        last_reserve[1],
        minted,
        supply,
    ]) && (error_rate(deposit_a_ratio, pool_coin_ratio)? > ERROR_RATE_THRESHOLD
        || error_rate(deposit_b_ratio, pool_coin_ratio)? > ERROR_RATE_THRESHOLD)
    {
        return broken("incorrect ratio of pool coins");
    }

    if minted >= COIN_AMOUNT_THRESHOLD {
        let supply_dec = amount_to_dec(supply)?;
        let expected_a = deposit_a_ratio.try_mul(supply_dec)?.truncate_amount()?;
        let expected_b = deposit_b_ratio.try_mul(supply_dec)?.truncate_amount()?;
        if amount_drift(minted, expected_a)? > ERROR_RATE_THRESHOLD
            || amount_drift(minted, expected_b)? > ERROR_RATE_THRESHOLD
        {
            return broken("incorrect amount of pool coins");
        }
    }
    Ok(())
}

/// Reserves grow by exactly the accepted deposit, at the pool's ratio
pub fn check_deposit(
    last_reserve: [u128; 2],
    deposit: [u128; 2],
    after_reserve: [u128; 2],
    refunded: [u128; 2],
) -> Result<()> {
    let accepted_a = sub(deposit[0], refunded[0], "accepted deposit")?;
    let accepted_b = sub(deposit[1], refunded[1], "accepted deposit")?;

    if Some(after_reserve[0]) != last_reserve[0].checked_add(accepted_a)
        || Some(after_reserve[1]) != last_reserve[1].checked_add(accepted_b)
    {
        return broken("incorrect deposit amounts");
    }

    if all_above_threshold(&[accepted_a, accepted_b, last_reserve[0], last_reserve[1]]) {
        let last_ratio = ratio(last_reserve[0], last_reserve[1])?;
        if error_rate(last_ratio, ratio(accepted_a, accepted_b)?)? > ERROR_RATE_THRESHOLD {
            return broken("incorrect deposit ratio");
        }
        if error_rate(last_ratio, ratio(after_reserve[0], after_reserve[1])?)?
            > ERROR_RATE_THRESHOLD
        {
            return broken("incorrect pool price ratio after deposit");
        }
    }
    Ok(())
}

/// Burned shares must pay for at least what left the reserves, fee included
pub fn check_burning_pool_coins(
    burned: u128,
    withdrawn: [u128; 2],
    reserve: [u128; 2],
    last_supply: u128,
    fees: [u128; 2],
) -> Result<()> {
    let burn_ratio = ratio(burned, last_supply)?;
    if burn_ratio == Decimal::ONE {
        return Ok(());
    }

    let mut expected_burns = [0u128; 2];
    for i in 0..2 {
        let gross = withdrawn[i]
            .checked_add(fees[i])
            .ok_or(LiquidityError::OverflowAmount)?;
        let withdraw_ratio = ratio(gross, reserve[i])?;
        if withdraw_ratio > burn_ratio {
            return broken("incorrect ratio of burning pool coins");
        }
        expected_burns[i] = amount_to_dec(last_supply)?
            .try_mul_truncate(withdraw_ratio)?
            .truncate_amount()?;
    }

    if burned >= COIN_AMOUNT_THRESHOLD
        && (amount_drift(burned, expected_burns[0])? > ERROR_RATE_THRESHOLD
            || amount_drift(burned, expected_burns[1])? > ERROR_RATE_THRESHOLD)
    {
        return broken("incorrect amount of burning pool coins");
    }
    Ok(())
}

/// Reserves and supply shrink by exactly what was withdrawn and burned
pub fn check_withdraw_reserve_coins(
    withdrawn: [u128; 2],
    reserve: [u128; 2],
    after_reserve: [u128; 2],
    after_supply: u128,
    last_supply: u128,
    burned: u128,
) -> Result<()> {
    for i in 0..2 {
        if Some(after_reserve[i]) != reserve[i].checked_sub(withdrawn[i]) {
            return broken(format!("incorrect withdraw amount of reserve coin {i}"));
        }
    }
    if Some(after_supply) != last_supply.checked_sub(burned) {
        return broken("incorrect pool coin total supply after withdraw");
    }
    Ok(())
}

/// Payout stays within one unit of the exact pro-rata amount net of fee
pub fn check_withdraw_amount(
    withdrawn: [u128; 2],
    reserve: [u128; 2],
    burned: u128,
    supply: u128,
    withdraw_fee_rate: Decimal,
) -> Result<()> {
    if burned == supply {
        return Ok(());
    }
    let share = ratio(burned, supply)?.try_mul(Decimal::ONE.try_sub(withdraw_fee_rate)?)?;
    for i in 0..2 {
        let ideal = amount_to_dec(reserve[i])?.try_mul(share)?;
        if ideal.try_sub(amount_to_dec(withdrawn[i])?)?.abs() >= Decimal::ONE {
            return broken(format!(
                "withdraw amount {} differs too much from {ideal}",
                withdrawn[i]
            ));
        }
    }
    Ok(())
}

/// A withdrawal that leaves both reserves non-empty keeps the pool price
pub fn check_immutable_pool_price_after_withdraw(
    reserve: [u128; 2],
    withdrawn: [u128; 2],
    after_reserve: [u128; 2],
) -> Result<()> {
    if after_reserve.contains(&0) {
        return Ok(());
    }
    let left_a = sub(reserve[0], withdrawn[0], "reserve after withdraw")?;
    let left_b = sub(reserve[1], withdrawn[1], "reserve after withdraw")?;
    if all_above_threshold(&[left_a, left_b, withdrawn[0], withdrawn[1]])
        && error_rate(
            ratio(left_a, left_b)?,
            ratio(after_reserve[0], after_reserve[1])?,
        )? > ERROR_RATE_THRESHOLD
    {
        return broken("incorrect pool price ratio after withdraw");
    }
    Ok(())
}

/// Every swap on a side either has a fill or is counted as not matched
pub fn check_swap_matching(
    states: &[SwapMsgState],
    x_to_y: &[usize],
    y_to_x: &[usize],
    matched_x_to_y: &[MatchResult],
    matched_y_to_x: &[MatchResult],
) -> Result<()> {
    let sides = [(x_to_y, matched_x_to_y, "X to Y"), (y_to_x, matched_y_to_x, "Y to X")];
    for (slots, matched, side) in sides {
        let not_matched = slots.len().checked_sub(matched.len());
        let counted = count_not_matched_msgs(slots.iter().filter_map(|slot| states.get(*slot)));
        if not_matched != Some(counted) {
            return broken(format!("invalid {side} match length"));
        }
    }
    Ok(())
}

/// Fills and pool deltas must net to zero and convert at the clearing price
pub fn check_swap_prices(
    matched_x_to_y: &[MatchResult],
    matched_y_to_x: &[MatchResult],
    pool_x_delta: Decimal,
    pool_y_delta: Decimal,
    result: &BatchResult,
) -> Result<()> {
    let mut net_x = Decimal::ZERO;
    let mut net_y = Decimal::ZERO;
    for m in matched_x_to_y {
        net_x = net_x.try_sub(m.transacted_coin_amt)?;
        net_y = net_y.try_add(m.exchanged_demand_coin_amt)?;
    }
    for m in matched_y_to_x {
        net_y = net_y.try_sub(m.transacted_coin_amt)?;
        net_x = net_x.try_add(m.exchanged_demand_coin_amt)?;
    }
    net_x = net_x.try_add(pool_x_delta)?;
    net_y = net_y.try_add(pool_y_delta)?;

    if !net_x.is_zero() && !net_y.is_zero() {
        return broken(format!("invalid swap price: unbalanced by {net_x}"));
    }
    if !amm::check_swap_price(matched_x_to_y, matched_y_to_x, result.swap_price)? {
        return broken("invalid swap price");
    }
    Ok(())
}

/// The clearing price moves the way the batch said it would (bounds inclusive)
pub fn check_swap_price_direction(current_price: Decimal, result: &BatchResult) -> Result<()> {
    let consistent = match result.price_direction {
        PriceDirection::Increasing => result.swap_price >= current_price,
        PriceDirection::Decreasing => result.swap_price <= current_price,
        PriceDirection::Staying => result.swap_price == current_price,
    };
    if !consistent {
        return broken(format!(
            "incorrect price direction {:?}: swap price {} from {current_price}",
            result.price_direction, result.swap_price
        ));
    }
    Ok(())
}

/// Match results and the states they point at agree
pub fn check_swap_msg_states(
    matched_x_to_y: &[MatchResult],
    matched_y_to_x: &[MatchResult],
    match_map: &BTreeMap<u64, MatchResult>,
    states: &[SwapMsgState],
) -> Result<()> {
    if matched_x_to_y.len() + matched_y_to_x.len() != match_map.len() {
        return broken("invalid length of match result");
    }
    for (msg_index, m) in match_map {
        if *msg_index != m.msg_index {
            return broken("broken match map consistency");
        }
        match states.get(m.slot) {
            Some(state) if state.msg_index == m.msg_index => {}
            _ => return broken(format!("match for msg {msg_index} lost its state")),
        }
    }
    Ok(())
}

/// Matched orders crossed the clearing price; unmatched ones did not
pub fn check_swap_orders_execution_state(
    match_map: &BTreeMap<u64, MatchResult>,
    states: &[SwapMsgState],
    result: &BatchResult,
    denom_x: &str,
) -> Result<()> {
    for state in states {
        let buys = state.msg.offer_coin.denom == denom_x;
        let price = state.msg.order_price;
        if match_map.contains_key(&state.msg_index) {
            if !state.executed || !state.succeeded {
                return broken(format!("swap msg {} matched but not succeeded", state.msg_index));
            }
            let executable = if buys {
                price >= result.swap_price
            } else {
                price <= result.swap_price
            };
            if !executable {
                return broken(format!("swap msg {} executed but unexecutable", state.msg_index));
            }
        } else {
            if state.executed && state.succeeded {
                return broken(format!("swap msg {} not matched but succeeded", state.msg_index));
            }
            let unexecutable = if buys {
                price <= result.swap_price
            } else {
                price >= result.swap_price
            };
            if !unexecutable {
                return broken(format!("swap msg {} unexecuted but executable", state.msg_index));
            }
        }
    }
    Ok(())
}
