//! Genesis import and export
//!
//! Import rebuilds the keyed store from a [`GenesisState`] and checks every pool
//! record against the balances the host already holds. Export walks the store in
//! key order, so exporting right after an import reproduces the document byte for
//! byte.

use crate::keeper::Keeper;
use crate::traits::{BankKeeper, KvStore};
use tracing::info;
use types::{
    DepositMsgState, GenesisState, LiquidityError, PoolRecord, Result, SwapMsgState,
    WithdrawMsgState,
};

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    /// Load parameters and pool records at `height`.
    ///
    /// Pools keep their ids; the id counter resumes after the largest one. Every
    /// record is checked before anything is written, so a rejected document leaves
    /// the store untouched.
    pub fn init_genesis(&mut self, genesis: &GenesisState, height: i64) -> Result<()> {
        let next_pool_id = self.check_genesis(genesis)?;
        for record in &genesis.pool_records {
            if self.pool(record.pool.id)?.is_some() {
                return Err(LiquidityError::PoolAlreadyExists);
            }
        }

        self.set_params(genesis.params.clone())?;
        for record in &genesis.pool_records {
            self.set_pool(&record.pool)?;

            let mut batch = record.pool_batch.clone();
            if batch.begin_height > height {
                batch.begin_height = 0;
            }
            self.set_pool_batch(&batch)?;
            self.set_msg_states(&record.deposit_msg_states)?;
            self.set_msg_states(&record.withdraw_msg_states)?;
            self.set_msg_states(&record.swap_msg_states)?;
        }
        if let Some(next) = next_pool_id {
            self.set_next_pool_id(next)?;
        }

        info!(
            pools = genesis.pool_records.len(),
            height, "liquidity genesis imported"
        );
        Ok(())
    }

    /// Check a genesis document against the bank ledger without touching the
    /// store. Returns the pool id counter the import resumes from, if any pool is
    /// listed.
    pub fn check_genesis(&self, genesis: &GenesisState) -> Result<Option<u64>> {
        genesis.validate()?;
        let next_pool_id = match genesis.pool_records.last() {
            Some(record) => Some(
                record
                    .pool
                    .id
                    .checked_add(1)
                    .ok_or(LiquidityError::OverflowAmount)?,
            ),
            None => None,
        };
        for record in &genesis.pool_records {
            self.check_record_ledger(record)?;
        }
        Ok(next_pool_id)
    }

    fn check_record_ledger(&self, record: &PoolRecord) -> Result<()> {
        let metadata = self.pool_metadata(&record.pool)?;
        if metadata.reserve_coins != record.pool_metadata.reserve_coins {
            return Err(LiquidityError::NumOfReserveCoin);
        }
        if metadata.pool_coin_total_supply != record.pool_metadata.pool_coin_total_supply {
            return Err(LiquidityError::BadPoolCoinAmount);
        }
        Ok(())
    }

    /// Check a pool record against the stored pool and the bank ledger
    pub fn validate_pool_record(&self, record: &PoolRecord) -> Result<()> {
        record.validate()?;
        let pool = self.require_pool(record.pool.id)?;
        if self.pool_batch(pool.id)?.is_none() {
            return Err(LiquidityError::PoolBatchNotExists);
        }

        self.check_record_ledger(record)
    }

    /// Snapshot of parameters and every pool record, pools in id order
    pub fn export_genesis(&self) -> Result<GenesisState> {
        let mut pool_records = Vec::new();
        for pool in self.pools()? {
            let pool_batch = self.require_pool_batch(pool.id)?;
            pool_records.push(PoolRecord {
                pool_metadata: self.pool_metadata(&pool)?,
                pool_batch,
                deposit_msg_states: self.msg_states::<DepositMsgState>(pool.id)?,
                withdraw_msg_states: self.msg_states::<WithdrawMsgState>(pool.id)?,
                swap_msg_states: self.msg_states::<SwapMsgState>(pool.id)?,
                pool,
            });
        }
        Ok(GenesisState::new(self.params.clone(), pool_records))
    }
}
