//! Block-driven state machine
//!
//! [`LiquidityApp`] is the surface a host drives: one `BeginBlock`, any number of
//! delivered messages, one `EndBlock` per height. Replaying the same event sequence
//! from the same snapshot always yields the same state.

use crate::keeper::Keeper;
use crate::store::delete_prefix;
use crate::traits::{BankKeeper, KvStore, Stateful};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use types::keys::{
    DEPOSIT_MSG_STATE_KEY_PREFIX, GLOBAL_POOL_ID_KEY, POOL_BATCH_KEY_PREFIX,
    POOL_BY_RESERVE_ACC_INDEX_KEY_PREFIX, POOL_KEY_PREFIX, SWAP_MSG_STATE_KEY_PREFIX,
    WITHDRAW_MSG_STATE_KEY_PREFIX,
};
use types::params::CANCEL_ORDER_LIFE_SPAN;
use types::{
    DepositMsgState, GenesisState, LiquidityError, LiquidityMsg, Pool, SwapMsgState,
    WithdrawMsgState,
};

/// One step of the host's block lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockEvent {
    BeginBlock(i64),
    Deliver(LiquidityMsg),
    EndBlock,
}

/// What a delivered message produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgResponse {
    PoolCreated(Pool),
    DepositQueued(DepositMsgState),
    WithdrawQueued(WithdrawMsgState),
    SwapQueued(SwapMsgState),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Liquidity(#[from] LiquidityError),

    #[error("snapshot codec error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("block height went backwards: at {current}, asked for {requested}")]
    HeightRegression { current: i64, requested: i64 },
}

#[derive(Serialize, Deserialize)]
struct AppSnapshot<B> {
    height: i64,
    genesis: GenesisState,
    bank: B,
}

/// Keeper plus the current block height
pub struct LiquidityApp<S, B> {
    keeper: Keeper<S, B>,
    height: i64,
}

impl<S: KvStore, B: BankKeeper> LiquidityApp<S, B> {
    pub fn new(keeper: Keeper<S, B>) -> Self {
        Self { keeper, height: 0 }
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn keeper(&self) -> &Keeper<S, B> {
        &self.keeper
    }

    pub fn keeper_mut(&mut self) -> &mut Keeper<S, B> {
        &mut self.keeper
    }

    pub fn begin_block(&mut self, height: i64) -> Result<(), AppError> {
        if height < self.height {
            return Err(AppError::HeightRegression {
                current: self.height,
                requested: height,
            });
        }
        self.height = height;
        self.keeper.begin_block(height)?;
        Ok(())
    }

    pub fn end_block(&mut self) -> Result<(), AppError> {
        self.keeper.end_block(self.height)?;
        Ok(())
    }

    /// Validate and route one message at the current height
    pub fn deliver(&mut self, msg: &LiquidityMsg) -> Result<MsgResponse, LiquidityError> {
        msg.validate_basic()?;
        if self.keeper.params().circuit_breaker_enabled && msg.blocked_by_circuit_breaker() {
            return Err(LiquidityError::CircuitBreakerEnabled);
        }

        let height = self.height;
        let response = match msg {
            LiquidityMsg::CreatePool(m) => {
                MsgResponse::PoolCreated(self.keeper.create_pool(m, height)?)
            }
            LiquidityMsg::DepositWithinBatch(m) => {
                MsgResponse::DepositQueued(self.keeper.deposit_within_batch(m, height)?)
            }
            LiquidityMsg::WithdrawWithinBatch(m) => {
                MsgResponse::WithdrawQueued(self.keeper.withdraw_within_batch(m, height)?)
            }
            LiquidityMsg::SwapWithinBatch(m) => MsgResponse::SwapQueued(
                self.keeper
                    .swap_within_batch(m, CANCEL_ORDER_LIFE_SPAN, height)?,
            ),
        };
        Ok(response)
    }
}

impl<S, B> Stateful for LiquidityApp<S, B>
where
    S: KvStore,
    B: BankKeeper + Clone + Serialize + DeserializeOwned,
{
    type Event = BlockEvent;
    type Error = AppError;

    /// Rejected messages are logged and dropped, as a host drops a failed
    /// transaction; block steps propagate their errors
    fn apply_event(&mut self, event: Self::Event) -> Result<(), Self::Error> {
        match event {
            BlockEvent::BeginBlock(height) => self.begin_block(height),
            BlockEvent::Deliver(msg) => {
                if let Err(err) = self.deliver(&msg) {
                    if err.is_fatal() {
                        return Err(err.into());
                    }
                    warn!(height = self.height, signer = %msg.signer(), error = %err, "message rejected");
                }
                Ok(())
            }
            BlockEvent::EndBlock => self.end_block(),
        }
    }

    fn snapshot(&self) -> Result<Vec<u8>, Self::Error> {
        let snapshot = AppSnapshot {
            height: self.height,
            genesis: self.keeper.export_genesis()?,
            bank: self.keeper.bank().clone(),
        };
        Ok(bincode::serialize(&snapshot)?)
    }

    fn restore(&mut self, snapshot: &[u8]) -> Result<(), Self::Error> {
        let snapshot: AppSnapshot<B> = bincode::deserialize(snapshot)?;

        let previous_bank = std::mem::replace(self.keeper.bank_mut(), snapshot.bank);
        if let Err(err) = self.keeper.check_genesis(&snapshot.genesis) {
            *self.keeper.bank_mut() = previous_bank;
            return Err(err.into());
        }

        let store = self.keeper.store_mut();
        let mut cleared = 0;
        for prefix in [
            POOL_KEY_PREFIX,
            POOL_BY_RESERVE_ACC_INDEX_KEY_PREFIX,
            POOL_BATCH_KEY_PREFIX,
            DEPOSIT_MSG_STATE_KEY_PREFIX,
            WITHDRAW_MSG_STATE_KEY_PREFIX,
            SWAP_MSG_STATE_KEY_PREFIX,
        ] {
            cleared += delete_prefix(store, &[prefix]);
        }
        cleared += delete_prefix(store, GLOBAL_POOL_ID_KEY);

        self.keeper.init_genesis(&snapshot.genesis, snapshot.height)?;
        self.height = snapshot.height;
        debug!(height = self.height, cleared, "state restored from snapshot");
        Ok(())
    }
}
