//! State validators shared by scenarios and property tests
//!
//! Each validator inspects the keeper from the outside, through its public
//! accessors, and reports a [`ValidationResult`] instead of panicking so one run
//! can surface every broken property at once.

use crate::framework::{ValidationResult, ValidationSeverity};
use anyhow::Result;
use liquidity::{invariants, BankKeeper, Keeper, MemBank, MemStore};
use types::{BatchMsgState, Coin, Coins, DepositMsgState, SwapMsgState, WithdrawMsgState};

type MemKeeper = Keeper<MemStore, MemBank>;

/// Coins the escrow owes back to queued requests that have not settled
pub fn outstanding_escrow(keeper: &MemKeeper) -> Result<Coins> {
    let mut outstanding = Coins::empty();
    for swap in keeper.all_msg_states::<SwapMsgState>()? {
        if !swap.to_be_deleted {
            let denom = swap.msg.offer_coin.denom.clone();
            outstanding.add_coin(&Coin::new(denom, swap.refundable_amount()?))?;
        }
    }
    for deposit in keeper.all_msg_states::<DepositMsgState>()? {
        if !deposit.to_be_deleted {
            for coin in &deposit.msg.deposit_coins {
                outstanding.add_coin(coin)?;
            }
        }
    }
    for withdrawal in keeper.all_msg_states::<WithdrawMsgState>()? {
        if !withdrawal.to_be_deleted {
            outstanding.add_coin(&withdrawal.msg.pool_coin)?;
        }
    }
    Ok(outstanding)
}

/// Escrow covers every live request; holding more than that is only a warning
pub fn validate_escrow(keeper: &MemKeeper) -> Result<Vec<ValidationResult>> {
    let escrow = keeper.escrow_balance();
    let covered = invariants::check_escrow_amount(
        &escrow,
        &keeper.all_msg_states::<SwapMsgState>()?,
        &keeper.all_msg_states::<DepositMsgState>()?,
        &keeper.all_msg_states::<WithdrawMsgState>()?,
    );
    let outstanding = outstanding_escrow(keeper)?;

    Ok(vec![
        match covered {
            Ok(()) => ValidationResult::pass("escrow_coverage", format!("escrow {escrow}")),
            Err(err) => ValidationResult::fail("escrow_coverage", err.to_string())
                .with_severity(ValidationSeverity::Critical),
        },
        ValidationResult::check(
            "escrow_exact",
            escrow == outstanding,
            format!("escrow {escrow}, outstanding {outstanding}"),
        )
        .with_severity(ValidationSeverity::Warning),
    ])
}

/// Account balances add up to the recorded supply of every denom, and each
/// pool's share supply is what the bank reports for its share denom
pub fn validate_supply(keeper: &MemKeeper) -> Result<Vec<ValidationResult>> {
    let bank = keeper.bank();
    let mut summed = Coins::empty();
    for (_, held) in bank.accounts() {
        summed = summed.checked_add(held)?;
    }
    let mut results = vec![ValidationResult::expect_eq(
        "balances_match_supply",
        bank.total_supply().to_string(),
        summed.to_string(),
    )];

    for pool in keeper.pools()? {
        let metadata = keeper.pool_metadata(&pool)?;
        results.push(ValidationResult::expect_eq(
            "pool_coin_supply",
            bank.supply(&pool.pool_coin_denom),
            metadata.pool_coin_total_supply.amount,
        ));
        let depleted = keeper.is_depleted_pool(&pool);
        let [x, y] = keeper.reserve_amounts(&pool);
        results.push(ValidationResult::check(
            "live_pool_reserves",
            depleted || (x > 0 && y > 0),
            format!("pool {} reserves [{x}, {y}]", pool.id),
        ));
    }
    Ok(results)
}

fn validate_indices<M: BatchMsgState + 'static>(
    keeper: &MemKeeper,
    queue: &str,
    pool_id: u64,
    next_index: u64,
) -> Result<ValidationResult> {
    let indices: Vec<u64> = keeper
        .msg_states::<M>(pool_id)?
        .iter()
        .map(BatchMsgState::msg_index)
        .collect();
    let ascending = indices.windows(2).all(|w| w[0] < w[1]);
    let below_next = indices.iter().all(|&i| i >= 1 && i < next_index);
    Ok(ValidationResult::check(
        "batch_msg_indices",
        ascending && below_next,
        format!("pool {pool_id} {queue} indices {indices:?}, next {next_index}"),
    ))
}

/// Stored records sit below their queue's next index, strictly ascending
pub fn validate_batches(keeper: &MemKeeper) -> Result<Vec<ValidationResult>> {
    let mut results = Vec::new();
    for batch in keeper.pool_batches()? {
        results.push(ValidationResult::check(
            "batch_index",
            batch.index >= 1,
            format!("pool {} batch {}", batch.pool_id, batch.index),
        ));
        results.push(validate_indices::<DepositMsgState>(
            keeper,
            "deposit",
            batch.pool_id,
            batch.deposit_msg_index,
        )?);
        results.push(validate_indices::<WithdrawMsgState>(
            keeper,
            "withdraw",
            batch.pool_id,
            batch.withdraw_msg_index,
        )?);
        results.push(validate_indices::<SwapMsgState>(
            keeper,
            "swap",
            batch.pool_id,
            batch.swap_msg_index,
        )?);
    }
    Ok(results)
}

pub fn validate_all(keeper: &MemKeeper) -> Result<Vec<ValidationResult>> {
    let mut results = validate_escrow(keeper)?;
    results.extend(validate_supply(keeper)?);
    results.extend(validate_batches(keeper)?);
    Ok(results)
}
