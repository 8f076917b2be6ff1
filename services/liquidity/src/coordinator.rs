//! Batch Coordinator
//!
//! Drives every pool's batch through its per-block lifecycle:
//!
//! - **Begin of block**: batches settled in the previous block are closed. Records
//!   that stay queued (partial fills, orders not yet expired) are reset so they join
//!   the next interval, finished records are purged, and the batch opens its next
//!   interval at the current height.
//! - **End of block**: at every settlement instant (`height % unit_batch_height == 0`)
//!   each open batch executes swaps, then deposits, then withdrawals. A deposit or
//!   withdrawal that fails is refunded and logged; only broken invariants abort the
//!   block.

use crate::invariants;
use crate::keeper::Keeper;
use crate::traits::{BankKeeper, KvStore};
use tracing::{debug, error, info};
use types::{BatchMsgState, DepositMsgState, Result, SwapMsgState, WithdrawMsgState};

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    /// Begin-of-block step
    pub fn begin_block(&mut self, height: i64) -> Result<()> {
        self.delete_and_init_pool_batches(height)
    }

    /// End-of-block step
    pub fn end_block(&mut self, height: i64) -> Result<()> {
        self.execute_pool_batches(height)
    }

    /// Close every executed batch: reset what stays queued, purge what is done, and
    /// open the next interval
    pub fn delete_and_init_pool_batches(&mut self, height: i64) -> Result<()> {
        for mut batch in self.pool_batches()? {
            if !batch.executed {
                continue;
            }
            let pool_id = batch.pool_id;

            let mut deposits = self.remaining_msg_states::<DepositMsgState>(pool_id)?;
            deposits.iter_mut().for_each(BatchMsgState::reset_for_next_batch);
            self.set_msg_states(&deposits)?;

            let mut withdrawals = self.remaining_msg_states::<WithdrawMsgState>(pool_id)?;
            withdrawals.iter_mut().for_each(BatchMsgState::reset_for_next_batch);
            self.set_msg_states(&withdrawals)?;

            let mut swaps = self.remaining_msg_states::<SwapMsgState>(pool_id)?;
            let mut expired = Vec::new();
            for swap in swaps.iter_mut() {
                if height > swap.order_expiry_height {
                    expired.push(swap.clone());
                } else {
                    swap.reset_for_next_batch();
                }
            }
            swaps.retain(|swap| height <= swap.order_expiry_height);
            self.set_msg_states(&swaps)?;
            if !expired.is_empty() {
                debug!(pool_id, expired = expired.len(), "refunding expired swaps");
                self.refund_swaps(expired)?;
            }

            let purged = self.delete_all_ready_msg_states::<DepositMsgState>(pool_id)?
                + self.delete_all_ready_msg_states::<WithdrawMsgState>(pool_id)?
                + self.delete_all_ready_msg_states::<SwapMsgState>(pool_id)?;
            debug!(pool_id, batch_index = batch.index, purged, "purged settled records");

            self.init_next_pool_batch(&mut batch, height)?;
        }
        Ok(())
    }

    /// Settle every open batch if `height` is a settlement instant
    pub fn execute_pool_batches(&mut self, height: i64) -> Result<()> {
        let unit = i64::from(self.params.unit_batch_height.max(1));
        if height.rem_euclid(unit) != 0 {
            return Ok(());
        }

        for mut batch in self.pool_batches()? {
            if batch.executed {
                continue;
            }

            let mut executed = self.swap_execution(&batch, height)?;

            for mut deposit in self.not_processed_msg_states::<DepositMsgState>(batch.pool_id)? {
                executed += 1;
                if let Err(err) = self.execute_deposit(&mut deposit, &batch) {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    error!(
                        pool_id = batch.pool_id,
                        msg_index = deposit.msg_index,
                        error = %err,
                        "deposit failed"
                    );
                    self.refund_deposit(&deposit)?;
                }
            }

            for mut withdrawal in
                self.not_processed_msg_states::<WithdrawMsgState>(batch.pool_id)?
            {
                executed += 1;
                if let Err(err) = self.execute_withdrawal(&mut withdrawal, &batch) {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    error!(
                        pool_id = batch.pool_id,
                        msg_index = withdrawal.msg_index,
                        error = %err,
                        "withdraw failed"
                    );
                    self.refund_withdrawal(&withdrawal)?;
                }
            }

            if executed > 0 {
                batch.executed = true;
                self.set_pool_batch(&batch)?;
                info!(
                    pool_id = batch.pool_id,
                    batch_index = batch.index,
                    height,
                    executed,
                    "pool batch executed"
                );
            }
        }

        if self.invariant_checks {
            invariants::check_escrow_amount(
                &self.escrow_balance(),
                &self.all_msg_states::<SwapMsgState>()?,
                &self.all_msg_states::<DepositMsgState>()?,
                &self.all_msg_states::<WithdrawMsgState>()?,
            )?;
        }
        Ok(())
    }
}
