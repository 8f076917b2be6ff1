//! Swap queueing and batch execution
//!
//! Orders are escrowed (offer plus reserved half fee) when queued. At the batch's
//! settlement instant every pending order of the pool is cleared at one uniform
//! price against the pool reserves:
//!
//! ```text
//!   pending swaps ─► drop expired / no longer valid ─► OrderBook::match_orders
//!        │                                                   │
//!        │                 NoMatch / recoverable failure      │ BatchResult
//!        ▼                                                   ▼
//!   refund all ◄──────────────────────────── find_order_match ─► update states
//!                                                            │
//!                                                            ▼
//!                                         one TransferBatch: fills, fees, refunds
//! ```
//!
//! Nothing moves until the whole batch is decided; the transfers go out as a single
//! multi-send.

use crate::escrow::TransferBatch;
use crate::invariants;
use crate::keeper::{Keeper, ESCROW_ACCOUNT};
use crate::traits::{BankKeeper, KvStore};
use amm::{
    find_order_match, update_swap_msg_states, validate_state_and_expire_orders, BookSides,
    MatchResult, OrderBook, OrderDirection,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use types::{
    amount_to_dec, check_overflow, offer_coin_fee, Coin, Coins, DecimalMath, LiquidityError,
    MsgSwapWithinBatch, Pool, PoolBatch, Result, SwapMsgState,
};

fn push_refund(transfers: &mut TransferBatch, state: &SwapMsgState) -> Result<()> {
    transfers.push(
        *ESCROW_ACCOUNT,
        state.msg.swap_requester,
        Coin::new(state.msg.offer_coin.denom.clone(), state.refundable_amount()?),
    );
    Ok(())
}

fn expiry_consistent(state: &SwapMsgState, height: i64) -> bool {
    if !state.remaining_offer_coin.is_positive() {
        return true;
    }
    let expires_now = state.order_expiry_height == height;
    if state.to_be_deleted {
        expires_now
    } else {
        state.order_expiry_height > height
    }
}

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    /// Stateful swap checks against the pool's current reserves and fee rate
    pub fn validate_msg_swap_within_batch(&self, msg: &MsgSwapWithinBatch, pool: &Pool) -> Result<()> {
        if !pool.matches_pair(&msg.offer_coin.denom, &msg.demand_coin_denom) {
            return Err(LiquidityError::NotMatchedReserveCoin);
        }

        let reserve = self.bank.balance(&pool.reserve_account, &msg.offer_coin.denom);
        let max_orderable = amount_to_dec(reserve)?
            .try_mul_truncate(self.params.max_order_amount_ratio)?
            .truncate_amount()?;
        if msg.offer_coin.amount > max_orderable {
            return Err(LiquidityError::ExceededMaxOrderable);
        }

        if msg.offer_coin_fee.denom != msg.offer_coin.denom {
            return Err(LiquidityError::BadOfferCoinFee);
        }
        check_overflow(amount_to_dec(msg.offer_coin.amount)?, msg.order_price)?;
        if msg.offer_coin_fee != offer_coin_fee(&msg.offer_coin, self.params.swap_fee_rate)? {
            return Err(LiquidityError::BadOfferCoinFee);
        }
        Ok(())
    }

    /// Escrow a swap order and queue it in the pool's current batch.
    ///
    /// `order_expiry_span` of 0 lets the order live until the next settlement
    /// instant.
    pub fn swap_within_batch(
        &mut self,
        msg: &MsgSwapWithinBatch,
        order_expiry_span: i64,
        height: i64,
    ) -> Result<SwapMsgState> {
        let pool = self.require_pool(msg.pool_id)?;
        if self.is_depleted_pool(&pool) {
            return Err(LiquidityError::DepletedPool);
        }
        self.validate_msg_swap_within_batch(msg, &pool)?;

        let mut batch = self.require_pool_batch(msg.pool_id)?;
        if batch.begin_height == 0 {
            batch.begin_height = height;
        }

        let span = self.params.order_expiry_span(height, order_expiry_span);
        let state = SwapMsgState::new(msg.clone(), batch.swap_msg_index, height, span);
        let held = Coins::new([msg.offer_coin.clone(), msg.offer_coin_fee.clone()])?;
        self.hold_escrow(&msg.swap_requester, &held)?;

        batch.swap_msg_index += 1;
        self.set_pool_batch(&batch)?;
        self.set_msg_state(&state)?;
        Ok(state)
    }

    /// Clear every pending swap of the batch's pool. Returns how many records were
    /// executed.
    pub fn swap_execution(&mut self, batch: &PoolBatch, height: i64) -> Result<u64> {
        let states = self.not_processed_msg_states::<SwapMsgState>(batch.pool_id)?;
        if states.is_empty() {
            return Ok(0);
        }
        let executed = states.len() as u64;

        let pool = match self.pool(batch.pool_id)? {
            Some(pool) if !self.is_depleted_pool(&pool) => pool,
            _ => {
                warn!(
                    pool_id = batch.pool_id,
                    batch_index = batch.index,
                    pending = states.len(),
                    "swaps queued against a missing or depleted pool, refunding"
                );
                self.refund_swaps(states)?;
                return Ok(executed);
            }
        };

        let mut live = Vec::with_capacity(states.len());
        let mut dropped = Vec::new();
        for mut state in states {
            state.executed = true;
            if height > state.order_expiry_height
                || self.validate_msg_swap_within_batch(&state.msg, &pool).is_err()
            {
                state.to_be_deleted = true;
                dropped.push(state);
            } else {
                live.push(state);
            }
        }
        validate_state_and_expire_orders(&mut live, height, false)?;

        let before_matching = live.clone();
        let match_map = match self.match_swaps(&pool, batch, &mut live, height) {
            Ok(map) => map,
            Err(err) if !err.is_fatal() => {
                warn!(
                    pool_id = pool.id,
                    batch_index = batch.index,
                    error = %err,
                    "swap matching failed, refunding batch"
                );
                live = before_matching.clone();
                None
            }
            Err(err) => return Err(err),
        };

        let mut transfers = TransferBatch::new();
        for state in &dropped {
            push_refund(&mut transfers, state)?;
        }
        match match_map {
            Some(map) => self.transact_and_refund(&pool, &mut live, &map, height, &mut transfers)?,
            None => {
                for state in live.iter_mut() {
                    push_refund(&mut transfers, state)?;
                    state.succeeded = false;
                    state.to_be_deleted = true;
                }
            }
        }
        if let Err(err) = self.execute_transfers(&transfers) {
            if err.is_fatal() {
                return Err(err);
            }
            // nothing moved; hand every order its escrow back
            warn!(
                pool_id = pool.id,
                batch_index = batch.index,
                error = %err,
                "swap settlement transfers failed, refunding batch"
            );
            self.refund_swaps(dropped.into_iter().chain(before_matching).collect())?;
            return Ok(executed);
        }
        self.set_msg_states(&dropped)?;
        self.set_msg_states(&live)?;

        debug!(
            pool_id = pool.id,
            batch_index = batch.index,
            executed,
            dropped = dropped.len(),
            transfers = transfers.len(),
            "swap batch settled"
        );
        Ok(executed)
    }

    /// Return every listed order's escrow and close the records
    pub fn refund_swaps(&mut self, mut states: Vec<SwapMsgState>) -> Result<()> {
        let mut transfers = TransferBatch::new();
        for state in states.iter_mut() {
            push_refund(&mut transfers, state)?;
            state.executed = true;
            state.succeeded = false;
            state.to_be_deleted = true;
        }
        self.execute_transfers(&transfers)?;
        self.set_msg_states(&states)
    }

    /// Run the clearing search and fill allocation over `states`.
    ///
    /// `None` means nothing crossed and the whole batch is refunded. States are
    /// updated in place; on error the caller discards them.
    fn match_swaps(
        &self,
        pool: &Pool,
        batch: &PoolBatch,
        states: &mut [SwapMsgState],
        height: i64,
    ) -> Result<Option<BTreeMap<u64, MatchResult>>> {
        let [reserve_x, reserve_y] = self.reserve_amounts(pool);
        let x = amount_to_dec(reserve_x)?;
        let y = amount_to_dec(reserve_y)?;
        let current_price = x.try_quo(y)?;
        let (denom_x, denom_y) = (pool.denom_x(), pool.denom_y());

        let BookSides {
            book,
            mut x_to_y,
            mut y_to_x,
        } = OrderBook::from_states(states, denom_x, denom_y, false)?;
        let result = match book.match_orders(x, y)? {
            Some(result) if result.is_match() && !result.swap_price.is_zero() => result,
            _ => {
                debug!(pool_id = pool.id, batch_index = batch.index, %current_price, "no match");
                return Ok(None);
            }
        };

        let xy = find_order_match(
            OrderDirection::XtoY,
            states,
            &mut x_to_y,
            result.ex,
            result.swap_price,
        )?;
        let yx = find_order_match(
            OrderDirection::YtoX,
            states,
            &mut y_to_x,
            result.ey,
            result.swap_price,
        )?;
        let pool_x_delta = xy.pool_x_delta.try_add(yx.pool_x_delta)?;
        let pool_y_delta = xy.pool_y_delta.try_add(yx.pool_y_delta)?;

        let matched: Vec<MatchResult> = xy.results.iter().chain(&yx.results).cloned().collect();
        let (dx, dy) = update_swap_msg_states(states, &matched)?;
        let last_price = x.try_add(dx)?.try_quo(y.try_add(dy)?)?;

        if self.invariant_checks {
            invariants::check_swap_matching(states, &x_to_y, &y_to_x, &xy.results, &yx.results)?;
            invariants::check_swap_prices(
                &xy.results,
                &yx.results,
                pool_x_delta,
                pool_y_delta,
                &result,
            )?;
        }

        validate_state_and_expire_orders(states, height, false)?;
        let resting = OrderBook::from_states(states, denom_x, denom_y, true)?;
        if !resting.book.validate(last_price)? {
            return Err(LiquidityError::OrderBookInvalidity);
        }
        validate_state_and_expire_orders(states, height, true)?;

        let mut match_map = BTreeMap::new();
        for m in matched {
            let msg_index = m.msg_index;
            if match_map.insert(msg_index, m).is_some() {
                return Err(LiquidityError::invariant(format!(
                    "duplicate match for swap msg {msg_index}"
                )));
            }
        }

        if self.invariant_checks {
            invariants::check_swap_price_direction(current_price, &result)?;
            invariants::check_swap_msg_states(&xy.results, &yx.results, &match_map, states)?;
            invariants::check_swap_orders_execution_state(&match_map, states, &result, denom_x)?;
        }

        debug!(
            pool_id = pool.id,
            batch_index = batch.index,
            match_type = ?result.match_type,
            direction = ?result.price_direction,
            swap_price = %result.swap_price,
            %current_price,
            %last_price,
            matched_x_to_y = xy.results.len(),
            matched_y_to_x = yx.results.len(),
            "batch cleared"
        );
        Ok(Some(match_map))
    }

    /// Queue fill, fee and refund transfers for the matched batch
    fn transact_and_refund(
        &self,
        pool: &Pool,
        states: &mut [SwapMsgState],
        match_map: &BTreeMap<u64, MatchResult>,
        height: i64,
        transfers: &mut TransferBatch,
    ) -> Result<()> {
        for state in states.iter_mut() {
            if state.msg.pool_id != pool.id {
                return Err(LiquidityError::invariant("broken msg pool consistency"));
            }
            if !state.executed && state.succeeded {
                return Err(LiquidityError::invariant(format!(
                    "swap msg {} succeeded without being executed",
                    state.msg_index
                )));
            }
            if !expiry_consistent(state, height) {
                return Err(LiquidityError::invariant(format!(
                    "expiry and deletion flags of swap msg {} disagree",
                    state.msg_index
                )));
            }

            let requester = state.msg.swap_requester;
            let offer_denom = state.msg.offer_coin.denom.clone();
            match match_map.get(&state.msg_index) {
                Some(m) => {
                    let transacted = m.transacted_coin_amt.truncate_amount()?;
                    let received = m
                        .exchanged_demand_coin_amt
                        .try_sub(m.exchanged_coin_fee_amt)?
                        .truncate_amount()?;
                    let fee = m.offer_coin_fee_amt.truncate_amount()?;

                    transfers.push(
                        *ESCROW_ACCOUNT,
                        pool.reserve_account,
                        Coin::new(offer_denom.clone(), transacted),
                    );
                    transfers.push(
                        pool.reserve_account,
                        requester,
                        Coin::new(state.msg.demand_coin_denom.clone(), received),
                    );
                    transfers.push(
                        *ESCROW_ACCOUNT,
                        pool.reserve_account,
                        Coin::new(offer_denom, fee),
                    );
                    if state.to_be_deleted {
                        push_refund(transfers, state)?;
                    }
                    state.succeeded = true;
                    debug!(
                        pool_id = pool.id,
                        msg_index = state.msg_index,
                        transacted,
                        received,
                        fee,
                        remaining = state.remaining_offer_coin.amount,
                        "swap filled"
                    );
                }
                None => {
                    if state.to_be_deleted {
                        push_refund(transfers, state)?;
                    }
                    state.succeeded = false;
                }
            }
        }
        Ok(())
    }
}
