//! Batch ledger
//!
//! Batch headers plus the three request queues of every pool. Queue records are
//! keyed by `(queue prefix, pool id, msg index)` so a prefix scan walks one pool's
//! queue in submission order. All queue accessors are generic over
//! [`BatchMsgState`], one code path for deposits, withdrawals and swaps.

use crate::keeper::Keeper;
use crate::store::{iter_decoded, load, load_all, save};
use crate::traits::{BankKeeper, KvStore};
use tracing::info;
use types::keys::{msg_state_key, msg_states_prefix, pool_batch_key, POOL_BATCH_KEY_PREFIX};
use types::{BatchMsgState, LiquidityError, PoolBatch, Result};

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    pub fn pool_batch(&self, pool_id: u64) -> Result<Option<PoolBatch>> {
        load(&self.store, &pool_batch_key(pool_id))
    }

    pub fn require_pool_batch(&self, pool_id: u64) -> Result<PoolBatch> {
        self.pool_batch(pool_id)?
            .ok_or(LiquidityError::PoolBatchNotExists)
    }

    pub fn set_pool_batch(&mut self, batch: &PoolBatch) -> Result<()> {
        save(&mut self.store, &pool_batch_key(batch.pool_id), batch)
    }

    /// Administrative removal; afterwards every batch operation on the pool fails
    /// with `PoolBatchNotExists`
    pub fn delete_pool_batch(&mut self, pool_id: u64) {
        self.store.delete(&pool_batch_key(pool_id));
    }

    /// Every batch header, in pool id order
    pub fn pool_batches(&self) -> Result<Vec<PoolBatch>> {
        load_all(&self.store, &[POOL_BATCH_KEY_PREFIX])
    }

    pub fn msg_state<M: BatchMsgState>(&self, pool_id: u64, msg_index: u64) -> Result<Option<M>> {
        load(&self.store, &msg_state_key(M::KEY_PREFIX, pool_id, msg_index))
    }

    pub fn set_msg_state<M: BatchMsgState>(&mut self, state: &M) -> Result<()> {
        let key = msg_state_key(M::KEY_PREFIX, state.pool_id(), state.msg_index());
        save(&mut self.store, &key, state)
    }

    pub fn set_msg_states<M: BatchMsgState>(&mut self, states: &[M]) -> Result<()> {
        for state in states {
            self.set_msg_state(state)?;
        }
        Ok(())
    }

    pub fn delete_msg_state<M: BatchMsgState>(&mut self, pool_id: u64, msg_index: u64) {
        self.store
            .delete(&msg_state_key(M::KEY_PREFIX, pool_id, msg_index));
    }

    /// Lazy walk over one pool's queue in msg index order
    pub fn iter_msg_states<M: BatchMsgState + 'static>(
        &self,
        pool_id: u64,
    ) -> impl Iterator<Item = Result<M>> + '_ {
        iter_decoded(&self.store, &msg_states_prefix(M::KEY_PREFIX, pool_id))
    }

    pub fn msg_states<M: BatchMsgState + 'static>(&self, pool_id: u64) -> Result<Vec<M>> {
        self.iter_msg_states(pool_id).collect()
    }

    fn msg_states_where<M, F>(&self, pool_id: u64, keep: F) -> Result<Vec<M>>
    where
        M: BatchMsgState + 'static,
        F: Fn(&M) -> bool,
    {
        self.iter_msg_states(pool_id)
            .filter(|state| state.as_ref().map_or(true, &keep))
            .collect()
    }

    pub fn not_to_be_deleted_msg_states<M: BatchMsgState + 'static>(
        &self,
        pool_id: u64,
    ) -> Result<Vec<M>> {
        self.msg_states_where(pool_id, |s: &M| !s.to_be_deleted())
    }

    /// Executed but still queued: partial fills and not-yet-expired orders
    pub fn remaining_msg_states<M: BatchMsgState + 'static>(&self, pool_id: u64) -> Result<Vec<M>> {
        self.msg_states_where(pool_id, |s: &M| s.executed() && !s.to_be_deleted())
    }

    /// Not yet attempted in the current interval
    pub fn not_processed_msg_states<M: BatchMsgState + 'static>(
        &self,
        pool_id: u64,
    ) -> Result<Vec<M>> {
        self.msg_states_where(pool_id, |s: &M| s.is_pending())
    }

    /// One queue across every pool
    pub fn all_msg_states<M: BatchMsgState>(&self) -> Result<Vec<M>> {
        load_all(&self.store, &[M::KEY_PREFIX])
    }

    /// Purge records marked `to_be_deleted`; returns how many went
    pub fn delete_all_ready_msg_states<M: BatchMsgState + 'static>(
        &mut self,
        pool_id: u64,
    ) -> Result<usize> {
        let ready = self.msg_states_where(pool_id, |s: &M| s.to_be_deleted())?;
        for state in &ready {
            self.delete_msg_state::<M>(pool_id, state.msg_index());
        }
        Ok(ready.len())
    }

    /// Open the next interval: bump the index, restart at `height`
    pub fn init_next_pool_batch(&mut self, batch: &mut PoolBatch, height: i64) -> Result<()> {
        if !batch.executed {
            return Err(LiquidityError::BatchNotExecuted);
        }
        batch.index += 1;
        batch.begin_height = height;
        batch.executed = false;
        self.set_pool_batch(batch)?;
        info!(
            pool_id = batch.pool_id,
            batch_index = batch.index,
            height,
            "pool batch reinitialized"
        );
        Ok(())
    }
}
