//! Genesis document: parameters plus one record per pool
//!
//! Export followed by import must reproduce the same document byte for byte, so
//! every collection here is an ordered `Vec` (pools by id, queues by msg index).

use crate::common::errors::{LiquidityError, Result};
use crate::msgs::{BatchMsgState, DepositMsgState, SwapMsgState, WithdrawMsgState};
use crate::params::Params;
use crate::pool::{Pool, PoolBatch, PoolMetadata};
use serde::{Deserialize, Serialize};

/// Everything stored for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub pool: Pool,
    pub pool_metadata: PoolMetadata,
    pub pool_batch: PoolBatch,
    pub deposit_msg_states: Vec<DepositMsgState>,
    pub withdraw_msg_states: Vec<WithdrawMsgState>,
    pub swap_msg_states: Vec<SwapMsgState>,
}

/// Queued indices are unique, ascending and below the batch's next index.
///
/// Filled records are purged while older orders stay queued, so gaps below the
/// next index are expected.
fn check_msg_indices<M: BatchMsgState>(states: &[M], pool_id: u64, next_index: u64) -> Result<()> {
    let mut previous = 0;
    for state in states {
        if state.pool_id() != pool_id {
            return Err(LiquidityError::InvalidGenesis {
                reason: format!(
                    "msg {} belongs to pool {}, not {pool_id}",
                    state.msg_index(),
                    state.pool_id()
                ),
            });
        }
        let index = state.msg_index();
        if index <= previous || index >= next_index {
            return Err(LiquidityError::BadBatchMsgIndex);
        }
        previous = index;
    }
    Ok(())
}

impl PoolRecord {
    /// Record-local consistency; ledger-backed checks happen on import
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        if self.pool_batch.pool_id != self.pool.id || self.pool_metadata.pool_id != self.pool.id {
            return Err(LiquidityError::PoolBatchNotExists);
        }
        if self.pool_metadata.pool_coin_total_supply.denom != self.pool.pool_coin_denom {
            return Err(LiquidityError::BadPoolCoinDenom);
        }
        let (id, batch) = (self.pool.id, &self.pool_batch);
        check_msg_indices(&self.deposit_msg_states, id, batch.deposit_msg_index)?;
        check_msg_indices(&self.withdraw_msg_states, id, batch.withdraw_msg_index)?;
        check_msg_indices(&self.swap_msg_states, id, batch.swap_msg_index)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GenesisState {
    pub params: Params,
    pub pool_records: Vec<PoolRecord>,
}

impl GenesisState {
    pub fn new(params: Params, pool_records: Vec<PoolRecord>) -> Self {
        Self {
            params,
            pool_records,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        let mut last_id = 0;
        for record in &self.pool_records {
            record.validate()?;
            if record.pool.id <= last_id {
                return Err(LiquidityError::InvalidGenesis {
                    reason: format!("pool ids must be unique and ascending, got {}", record.pool.id),
                });
            }
            last_id = record.pool.id;
        }
        Ok(())
    }

    /// Canonical JSON rendering used for byte-level comparison of exports
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
