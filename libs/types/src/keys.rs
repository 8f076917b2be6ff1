//! Store key layout
//!
//! ```text
//! 0x01                              → next pool id (u64)
//! 0x11 | pool_id(8B BE)             → Pool
//! 0x12 | len | reserve_acc          → pool_id index
//! 0x22 | pool_id(8B BE)             → PoolBatch
//! 0x31 | pool_id(8B BE) | idx(8B BE) → DepositMsgState
//! 0x32 | pool_id(8B BE) | idx(8B BE) → WithdrawMsgState
//! 0x33 | pool_id(8B BE) | idx(8B BE) → SwapMsgState
//! ```
//!
//! Big-endian ids keep prefix scans in ascending id / message-index order.

use crate::common::identifiers::Address;

pub const MODULE_NAME: &str = "liquidity";

pub const GLOBAL_POOL_ID_KEY: &[u8] = &[0x01];
pub const POOL_KEY_PREFIX: u8 = 0x11;
pub const POOL_BY_RESERVE_ACC_INDEX_KEY_PREFIX: u8 = 0x12;
pub const POOL_BATCH_KEY_PREFIX: u8 = 0x22;
pub const DEPOSIT_MSG_STATE_KEY_PREFIX: u8 = 0x31;
pub const WITHDRAW_MSG_STATE_KEY_PREFIX: u8 = 0x32;
pub const SWAP_MSG_STATE_KEY_PREFIX: u8 = 0x33;

fn prefixed_id(prefix: u8, id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(prefix);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub fn pool_key(pool_id: u64) -> Vec<u8> {
    prefixed_id(POOL_KEY_PREFIX, pool_id)
}

pub fn pool_by_reserve_acc_index_key(reserve_acc: &Address) -> Vec<u8> {
    let bytes = reserve_acc.as_bytes();
    let mut key = Vec::with_capacity(2 + bytes.len());
    key.push(POOL_BY_RESERVE_ACC_INDEX_KEY_PREFIX);
    key.push(bytes.len() as u8);
    key.extend_from_slice(bytes);
    key
}

pub fn pool_batch_key(pool_id: u64) -> Vec<u8> {
    prefixed_id(POOL_BATCH_KEY_PREFIX, pool_id)
}

/// Prefix covering every message state of one queue of one pool
pub fn msg_states_prefix(queue_prefix: u8, pool_id: u64) -> Vec<u8> {
    prefixed_id(queue_prefix, pool_id)
}

pub fn msg_state_key(queue_prefix: u8, pool_id: u64, msg_index: u64) -> Vec<u8> {
    let mut key = msg_states_prefix(queue_prefix, pool_id);
    key.extend_from_slice(&msg_index.to_be_bytes());
    key
}
