//! Deposit and withdrawal settlement
//!
//! Queueing validates the request against the pool, moves the coins into escrow and
//! appends a record to the pool's batch. Settlement runs at the batch's settlement
//! instant: deposits mint shares at the reserve ratio and refund what the truncated
//! share amount does not pay for; withdrawals burn escrowed shares and pay out the
//! pro-rata reserves net of the withdraw fee.

use crate::escrow::TransferBatch;
use crate::invariants;
use crate::keeper::{Keeper, ESCROW_ACCOUNT};
use crate::traits::{BankKeeper, KvStore};
use amm::PoolShareMath;
use tracing::debug;
use types::{
    BatchMsgState, Coin, Coins, DepositMsgState, LiquidityError, MsgDepositWithinBatch,
    MsgWithdrawWithinBatch, Pool, PoolBatch, Result, WithdrawMsgState,
};

fn ordered_amounts(pool: &Pool, coins: &Coins) -> [u128; 2] {
    [coins.amount_of(pool.denom_x()), coins.amount_of(pool.denom_y())]
}

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    /// Stateful deposit checks; returns the pool
    pub fn validate_msg_deposit_within_batch(&self, msg: &MsgDepositWithinBatch) -> Result<Pool> {
        let pool = self.require_pool(msg.pool_id)?;
        if msg.deposit_coins.len() != pool.reserve_coin_denoms.len() {
            return Err(LiquidityError::NumOfReserveCoin);
        }
        let deposit = msg.coins()?;
        if deposit.len() != 2
            || !pool.matches_pair(&msg.deposit_coins[0].denom, &msg.deposit_coins[1].denom)
        {
            return Err(LiquidityError::NotMatchedReserveCoin);
        }
        let after = self.reserve_coins(&pool)?.checked_add(&deposit)?;
        self.params.check_reserve_coin_limit(&after)?;
        Ok(pool)
    }

    /// Stateful withdrawal checks; returns the pool
    pub fn validate_msg_withdraw_within_batch(&self, msg: &MsgWithdrawWithinBatch) -> Result<Pool> {
        let pool = self.require_pool(msg.pool_id)?;
        if msg.pool_coin.denom != pool.pool_coin_denom {
            return Err(LiquidityError::BadPoolCoinDenom);
        }
        if self.is_depleted_pool(&pool) {
            return Err(LiquidityError::DepletedPool);
        }
        if msg.pool_coin.amount > self.pool_coin_total_supply(&pool) {
            return Err(LiquidityError::BadPoolCoinAmount);
        }
        Ok(pool)
    }

    /// Escrow a deposit and queue it in the pool's current batch
    pub fn deposit_within_batch(
        &mut self,
        msg: &MsgDepositWithinBatch,
        height: i64,
    ) -> Result<DepositMsgState> {
        self.validate_msg_deposit_within_batch(msg)?;
        let mut batch = self.require_pool_batch(msg.pool_id)?;
        if batch.begin_height == 0 {
            batch.begin_height = height;
        }

        let state = DepositMsgState {
            msg_height: height,
            msg_index: batch.deposit_msg_index,
            executed: false,
            succeeded: false,
            to_be_deleted: false,
            msg: msg.clone(),
        };
        self.hold_escrow(&msg.depositor, &msg.coins()?)?;

        batch.deposit_msg_index += 1;
        self.set_pool_batch(&batch)?;
        self.set_msg_state(&state)?;
        Ok(state)
    }

    /// Escrow pool coins and queue the withdrawal in the pool's current batch
    pub fn withdraw_within_batch(
        &mut self,
        msg: &MsgWithdrawWithinBatch,
        height: i64,
    ) -> Result<WithdrawMsgState> {
        self.validate_msg_withdraw_within_batch(msg)?;
        let mut batch = self.require_pool_batch(msg.pool_id)?;
        if batch.begin_height == 0 {
            batch.begin_height = height;
        }

        let state = WithdrawMsgState {
            msg_height: height,
            msg_index: batch.withdraw_msg_index,
            executed: false,
            succeeded: false,
            to_be_deleted: false,
            msg: msg.clone(),
        };
        self.hold_escrow(&msg.withdrawer, &Coins::from_coin(msg.pool_coin.clone()))?;

        batch.withdraw_msg_index += 1;
        self.set_pool_batch(&batch)?;
        self.set_msg_state(&state)?;
        Ok(state)
    }

    /// Settle one queued deposit.
    ///
    /// The record is marked executed and persisted before anything else, so a
    /// failure leaves it refundable. Into a depleted pool the whole deposit goes to
    /// the reserves and the fixed initial share amount is minted.
    pub fn execute_deposit(&mut self, state: &mut DepositMsgState, batch: &PoolBatch) -> Result<()> {
        if !state.is_pending() {
            return Err(LiquidityError::AlreadyProcessed);
        }
        state.executed = true;
        self.set_msg_state(state)?;

        let pool = self.validate_msg_deposit_within_batch(&state.msg)?;
        let deposit = state.msg.coins()?;
        let depositor = state.msg.depositor;

        if self.is_depleted_pool(&pool) {
            let stray = self.reserve_coins(&pool)?;
            for coin in &deposit {
                let total = coin
                    .amount
                    .checked_add(stray.amount_of(&coin.denom))
                    .ok_or(LiquidityError::OverflowAmount)?;
                if total < self.params.min_init_deposit_amount {
                    return Err(LiquidityError::LessThanMinInitDeposit);
                }
            }
            let pool_coin =
                self.mint_and_send_pool_coin(&pool, &ESCROW_ACCOUNT, &depositor, &deposit)?;
            state.succeeded = true;
            state.to_be_deleted = true;
            self.set_msg_state(state)?;
            debug!(
                pool_id = pool.id,
                batch_index = batch.index,
                msg_index = state.msg_index,
                %deposit,
                %pool_coin,
                "depleted pool reinitialized"
            );
            return Ok(());
        }

        let supply = self.pool_coin_total_supply(&pool);
        let last_reserve = self.reserve_amounts(&pool);
        let offered = ordered_amounts(&pool, &deposit);
        let allocation = PoolShareMath::deposit(supply, last_reserve, offered)?;

        let pool_coin = Coin::new(pool.pool_coin_denom.clone(), allocation.mint_amount);
        let minted = Coins::from_coin(pool_coin.clone());
        self.bank.mint(&ESCROW_ACCOUNT, &minted)?;

        let denoms = [pool.denom_x(), pool.denom_y()];
        let mut transfers = TransferBatch::new();
        for (i, denom) in denoms.iter().enumerate() {
            transfers.push(
                *ESCROW_ACCOUNT,
                depositor,
                Coin::new(*denom, allocation.refunded[i]),
            );
            transfers.push(
                *ESCROW_ACCOUNT,
                pool.reserve_account,
                Coin::new(*denom, allocation.accepted[i]),
            );
        }
        transfers.push(*ESCROW_ACCOUNT, depositor, pool_coin.clone());
        if let Err(err) = self.execute_transfers(&transfers) {
            self.bank.burn(&ESCROW_ACCOUNT, &minted)?;
            return Err(err);
        }

        state.succeeded = true;
        state.to_be_deleted = true;
        self.set_msg_state(state)?;

        let after_reserve = self.reserve_amounts(&pool);
        if self.invariant_checks {
            invariants::check_minting_pool_coins(
                supply,
                allocation.mint_amount,
                offered,
                last_reserve,
                allocation.refunded,
            )?;
            invariants::check_deposit(last_reserve, offered, after_reserve, allocation.refunded)?;
        }
        debug!(
            pool_id = pool.id,
            batch_index = batch.index,
            msg_index = state.msg_index,
            %pool_coin,
            accepted_x = allocation.accepted[0],
            accepted_y = allocation.accepted[1],
            refunded_x = allocation.refunded[0],
            refunded_y = allocation.refunded[1],
            reserve_ratio = %PoolShareMath::reserve_ratio(after_reserve[0], after_reserve[1])?,
            "deposit settled"
        );
        Ok(())
    }

    /// Settle one queued withdrawal: pay out reserves, burn the escrowed shares
    pub fn execute_withdrawal(
        &mut self,
        state: &mut WithdrawMsgState,
        batch: &PoolBatch,
    ) -> Result<()> {
        if !state.is_pending() {
            return Err(LiquidityError::AlreadyProcessed);
        }
        state.executed = true;
        self.set_msg_state(state)?;

        let pool = self.validate_msg_withdraw_within_batch(&state.msg)?;
        let withdrawer = state.msg.withdrawer;
        let burned = state.msg.pool_coin.amount;
        let last_supply = self.pool_coin_total_supply(&pool);
        let reserve = self.reserve_amounts(&pool);

        let allocation =
            PoolShareMath::withdraw(last_supply, reserve, burned, self.params.withdraw_fee_rate)?;

        let mut transfers = TransferBatch::new();
        transfers.push(
            pool.reserve_account,
            withdrawer,
            Coin::new(pool.denom_x(), allocation.withdrawn[0]),
        );
        transfers.push(
            pool.reserve_account,
            withdrawer,
            Coin::new(pool.denom_y(), allocation.withdrawn[1]),
        );
        self.execute_transfers(&transfers)?;
        self.bank
            .burn(&ESCROW_ACCOUNT, &Coins::from_coin(state.msg.pool_coin.clone()))?;

        state.succeeded = true;
        state.to_be_deleted = true;
        self.set_msg_state(state)?;

        let after_reserve = self.reserve_amounts(&pool);
        if self.invariant_checks {
            let after_supply = self.pool_coin_total_supply(&pool);
            invariants::check_burning_pool_coins(
                burned,
                allocation.withdrawn,
                reserve,
                last_supply,
                allocation.fees,
            )?;
            invariants::check_withdraw_reserve_coins(
                allocation.withdrawn,
                reserve,
                after_reserve,
                after_supply,
                last_supply,
                burned,
            )?;
            invariants::check_withdraw_amount(
                allocation.withdrawn,
                reserve,
                burned,
                last_supply,
                self.params.withdraw_fee_rate,
            )?;
            invariants::check_immutable_pool_price_after_withdraw(
                reserve,
                allocation.withdrawn,
                after_reserve,
            )?;
        }
        debug!(
            pool_id = pool.id,
            batch_index = batch.index,
            msg_index = state.msg_index,
            burned,
            withdrawn_x = allocation.withdrawn[0],
            withdrawn_y = allocation.withdrawn[1],
            fee_x = allocation.fees[0],
            fee_y = allocation.fees[1],
            reserve_ratio = %PoolShareMath::reserve_ratio(after_reserve[0], after_reserve[1])?,
            "withdrawal settled"
        );
        Ok(())
    }

    /// Return a failed deposit's escrow and mark it for deletion
    pub fn refund_deposit(&mut self, state: &DepositMsgState) -> Result<()> {
        let mut stored = self
            .msg_state::<DepositMsgState>(state.msg.pool_id, state.msg_index)?
            .unwrap_or_else(|| state.clone());
        if !stored.executed || stored.succeeded {
            return Err(LiquidityError::NotRefundable);
        }
        self.release_escrow(&stored.msg.depositor, &stored.msg.coins()?)?;
        stored.to_be_deleted = true;
        self.set_msg_state(&stored)
    }

    /// Return a failed withdrawal's pool coins and mark it for deletion
    pub fn refund_withdrawal(&mut self, state: &WithdrawMsgState) -> Result<()> {
        let mut stored = self
            .msg_state::<WithdrawMsgState>(state.msg.pool_id, state.msg_index)?
            .unwrap_or_else(|| state.clone());
        if !stored.executed || stored.succeeded {
            return Err(LiquidityError::NotRefundable);
        }
        self.release_escrow(
            &stored.msg.withdrawer,
            &Coins::from_coin(stored.msg.pool_coin.clone()),
        )?;
        stored.to_be_deleted = true;
        self.set_msg_state(&stored)
    }
}
