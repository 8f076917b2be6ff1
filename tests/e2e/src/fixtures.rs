//! Test fixtures: an in-memory app plus shortcuts for building messages

use crate::framework::TestMetrics;
use anyhow::{anyhow, Context, Result};
use liquidity::{BankKeeper, Keeper, LiquidityApp, MemBank, MemStore, MsgResponse};
use rust_decimal::Decimal;
use types::{
    offer_coin_fee, Address, Coin, Coins, LiquidityError, LiquidityMsg, MsgCreatePool,
    MsgDepositWithinBatch, MsgSwapWithinBatch, MsgWithdrawWithinBatch, Params, Pool,
    SwapMsgState,
};

pub const DENOM_X: &str = "uatom";
pub const DENOM_Y: &str = "uusd";
pub const FEE_DENOM: &str = "stake";

/// Canonical coin bundle from `(denom, amount)` pairs
pub fn coins(items: &[(&str, u128)]) -> Result<Coins> {
    Ok(Coins::new(items.iter().map(|(d, a)| Coin::new(*d, *a)))?)
}

/// Deterministic user account, distinct from module accounts
pub fn account(name: &str) -> Address {
    Address::from_hash(format!("user/{name}").as_bytes())
}

/// An app over the in-memory store and bank, tallying what it was asked to do
pub struct Harness {
    app: LiquidityApp<MemStore, MemBank>,
    metrics: TestMetrics,
}

impl Harness {
    pub fn new(params: Params, invariant_checks: bool) -> Result<Self> {
        let keeper = Keeper::new(MemStore::new(), MemBank::new(), params)
            .context("keeper params")?
            .with_invariant_checks(invariant_checks);
        Ok(Self {
            app: LiquidityApp::new(keeper),
            metrics: TestMetrics::default(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(Params::default(), true)
    }

    pub fn app(&self) -> &LiquidityApp<MemStore, MemBank> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut LiquidityApp<MemStore, MemBank> {
        &mut self.app
    }

    pub fn keeper(&self) -> &Keeper<MemStore, MemBank> {
        self.app.keeper()
    }

    pub fn height(&self) -> i64 {
        self.app.height()
    }

    pub fn metrics(&self) -> &TestMetrics {
        &self.metrics
    }

    pub fn fund(&mut self, to: &Address, items: &[(&str, u128)]) -> Result<()> {
        let amount = coins(items)?;
        self.app.keeper_mut().bank_mut().fund(to, &amount)?;
        Ok(())
    }

    pub fn balance(&self, owner: &Address, denom: &str) -> u128 {
        self.keeper().bank().balance(owner, denom)
    }

    pub fn begin(&mut self, height: i64) -> Result<()> {
        self.app.begin_block(height)?;
        self.metrics.blocks_processed += 1;
        Ok(())
    }

    pub fn end(&mut self) -> Result<()> {
        let before = self.executed_batches()?;
        self.app.end_block()?;
        let after = self.executed_batches()?;
        self.metrics.batches_executed += after.saturating_sub(before);
        Ok(())
    }

    fn executed_batches(&self) -> Result<u64> {
        Ok(self
            .keeper()
            .pool_batches()?
            .iter()
            .filter(|batch| batch.executed)
            .count() as u64)
    }

    pub fn deliver(&mut self, msg: &LiquidityMsg) -> Result<MsgResponse, LiquidityError> {
        let response = self.app.deliver(msg);
        match response {
            Ok(_) => self.metrics.messages_delivered += 1,
            Err(_) => self.metrics.messages_rejected += 1,
        }
        response
    }

    /// One full block: begin, deliver every message, end. Rejected messages are
    /// counted, not raised.
    pub fn run_block(&mut self, height: i64, msgs: &[LiquidityMsg]) -> Result<()> {
        self.begin(height)?;
        for msg in msgs {
            if let Err(err) = self.deliver(msg) {
                if err.is_fatal() {
                    return Err(err.into());
                }
            }
        }
        self.end()
    }

    pub fn create_pool(&mut self, creator: &Address, x: u128, y: u128) -> Result<Pool> {
        match self.deliver(&create_pool_msg(creator, x, y))? {
            MsgResponse::PoolCreated(pool) => Ok(pool),
            other => Err(anyhow!("unexpected response {other:?}")),
        }
    }

    /// Queue a swap with an explicit lifetime, bypassing the message path that
    /// always uses the default span
    pub fn queue_swap(&mut self, msg: &MsgSwapWithinBatch, expiry_span: i64) -> Result<SwapMsgState> {
        msg.validate_basic()?;
        let height = self.app.height();
        let state = self
            .app
            .keeper_mut()
            .swap_within_batch(msg, expiry_span, height)?;
        self.metrics.messages_delivered += 1;
        Ok(state)
    }

    /// Swap offering `offer` in the pool's other denom, fee at the current rate
    pub fn swap_msg(
        &self,
        requester: &Address,
        pool: &Pool,
        offer: Coin,
        order_price: Decimal,
    ) -> Result<MsgSwapWithinBatch> {
        swap_msg(
            requester,
            pool,
            offer,
            order_price,
            self.keeper().params().swap_fee_rate,
        )
    }
}

pub fn swap_msg(
    requester: &Address,
    pool: &Pool,
    offer: Coin,
    order_price: Decimal,
    swap_fee_rate: Decimal,
) -> Result<MsgSwapWithinBatch> {
    let demand = if offer.denom == pool.denom_x() {
        pool.denom_y()
    } else {
        pool.denom_x()
    };
    Ok(MsgSwapWithinBatch {
        swap_requester: *requester,
        pool_id: pool.id,
        swap_type_id: 1,
        offer_coin_fee: offer_coin_fee(&offer, swap_fee_rate)?,
        offer_coin: offer,
        demand_coin_denom: demand.to_string(),
        order_price,
    })
}

pub fn create_pool_msg(creator: &Address, x: u128, y: u128) -> LiquidityMsg {
    LiquidityMsg::CreatePool(MsgCreatePool {
        pool_creator: *creator,
        pool_type_id: 1,
        deposit_coins: vec![Coin::new(DENOM_X, x), Coin::new(DENOM_Y, y)],
    })
}

pub fn deposit_msg(depositor: &Address, pool: &Pool, x: u128, y: u128) -> LiquidityMsg {
    LiquidityMsg::DepositWithinBatch(MsgDepositWithinBatch {
        depositor: *depositor,
        pool_id: pool.id,
        deposit_coins: vec![Coin::new(DENOM_X, x), Coin::new(DENOM_Y, y)],
    })
}

pub fn withdraw_msg(withdrawer: &Address, pool: &Pool, amount: u128) -> LiquidityMsg {
    LiquidityMsg::WithdrawWithinBatch(MsgWithdrawWithinBatch {
        withdrawer: *withdrawer,
        pool_id: pool.id,
        pool_coin: Coin::new(pool.pool_coin_denom.clone(), amount),
    })
}
