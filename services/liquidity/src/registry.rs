//! Pool registry: pool records, the reserve-account index and pool creation

use crate::keeper::{Keeper, COMMUNITY_POOL_ACCOUNT, ESCROW_ACCOUNT};
use crate::store::{iter_decoded, load, load_all, save};
use crate::traits::{BankKeeper, KvStore};
use tracing::{debug, info};
use types::keys::{
    pool_by_reserve_acc_index_key, pool_key, GLOBAL_POOL_ID_KEY, POOL_KEY_PREFIX,
};
use types::{
    reserve_account_from_pool_coin_denom, Address, Coin, Coins, LiquidityError, MsgCreatePool,
    Pool, PoolBatch, PoolMetadata, Result,
};

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    /// Id the next created pool will get; starts at 1
    pub fn next_pool_id(&self) -> Result<u64> {
        Ok(load::<_, u64>(&self.store, GLOBAL_POOL_ID_KEY)?.unwrap_or(1))
    }

    pub(crate) fn set_next_pool_id(&mut self, id: u64) -> Result<()> {
        save(&mut self.store, GLOBAL_POOL_ID_KEY, &id)
    }

    /// Hand out the next pool id and advance the counter
    pub fn next_pool_id_with_update(&mut self) -> Result<u64> {
        let id = self.next_pool_id()?;
        let next = id.checked_add(1).ok_or(LiquidityError::OverflowAmount)?;
        self.set_next_pool_id(next)?;
        Ok(id)
    }

    pub fn pool(&self, pool_id: u64) -> Result<Option<Pool>> {
        load(&self.store, &pool_key(pool_id))
    }

    pub fn require_pool(&self, pool_id: u64) -> Result<Pool> {
        self.pool(pool_id)?.ok_or(LiquidityError::PoolNotExists)
    }

    /// Store the pool and its reserve-account index entry
    pub fn set_pool(&mut self, pool: &Pool) -> Result<()> {
        save(&mut self.store, &pool_key(pool.id), pool)?;
        save(
            &mut self.store,
            &pool_by_reserve_acc_index_key(&pool.reserve_account),
            &pool.id,
        )
    }

    /// Assign the next id to `pool` and store it
    pub fn set_pool_atomic(&mut self, mut pool: Pool) -> Result<Pool> {
        pool.id = self.next_pool_id_with_update()?;
        self.set_pool(&pool)?;
        Ok(pool)
    }

    /// Administrative removal of a pool and its index entry; the batch and queues are
    /// left alone
    pub fn delete_pool(&mut self, pool: &Pool) {
        self.store.delete(&pool_key(pool.id));
        self.store
            .delete(&pool_by_reserve_acc_index_key(&pool.reserve_account));
    }

    /// Lazily decode every pool in id order
    pub fn iter_pools(&self) -> impl Iterator<Item = Result<Pool>> + '_ {
        iter_decoded(&self.store, &[POOL_KEY_PREFIX])
    }

    pub fn pools(&self) -> Result<Vec<Pool>> {
        load_all(&self.store, &[POOL_KEY_PREFIX])
    }

    pub fn pool_by_reserve_account(&self, reserve_account: &Address) -> Result<Option<Pool>> {
        match load::<_, u64>(&self.store, &pool_by_reserve_acc_index_key(reserve_account))? {
            Some(id) => self.pool(id),
            None => Ok(None),
        }
    }

    /// Reserve balances as `[X, Y]`
    pub fn reserve_amounts(&self, pool: &Pool) -> [u128; 2] {
        [
            self.bank.balance(&pool.reserve_account, pool.denom_x()),
            self.bank.balance(&pool.reserve_account, pool.denom_y()),
        ]
    }

    /// Reserve balances in the pool's reserve denoms only
    pub fn reserve_coins(&self, pool: &Pool) -> Result<Coins> {
        let [x, y] = self.reserve_amounts(pool);
        Coins::new([Coin::new(pool.denom_x(), x), Coin::new(pool.denom_y(), y)])
    }

    pub fn pool_coin_total_supply(&self, pool: &Pool) -> u128 {
        self.bank.supply(&pool.pool_coin_denom)
    }

    pub fn pool_coin_total(&self, pool: &Pool) -> Coin {
        Coin::new(pool.pool_coin_denom.clone(), self.pool_coin_total_supply(pool))
    }

    /// No shares outstanding, or either reserve empty
    pub fn is_depleted_pool(&self, pool: &Pool) -> bool {
        self.pool_coin_total_supply(pool) == 0 || self.reserve_amounts(pool).contains(&0)
    }

    pub fn pool_metadata(&self, pool: &Pool) -> Result<PoolMetadata> {
        Ok(PoolMetadata {
            pool_id: pool.id,
            pool_coin_total_supply: self.pool_coin_total(pool),
            reserve_coins: self.reserve_coins(pool)?,
        })
    }

    /// True if `denom` is the share denom of a registered pool
    pub fn is_pool_coin_denom(&self, denom: &str) -> Result<bool> {
        let Ok(reserve_account) = reserve_account_from_pool_coin_denom(denom) else {
            return Ok(false);
        };
        Ok(self
            .pool_by_reserve_account(&reserve_account)?
            .is_some_and(|pool| pool.pool_coin_denom == denom))
    }

    /// Stateful checks for pool creation; returns the unnumbered pool and the
    /// deposit in canonical form
    pub fn validate_msg_create_pool(&self, msg: &MsgCreatePool) -> Result<(Pool, Coins)> {
        let pool_type = self.params.pool_type(msg.pool_type_id)?;
        if !pool_type.accepts_reserve_count(msg.deposit_coins.len()) {
            return Err(LiquidityError::NumOfReserveCoin);
        }
        let (a, b) = (&msg.deposit_coins[0], &msg.deposit_coins[1]);
        if a.denom == b.denom {
            return Err(LiquidityError::EqualDenom);
        }
        let deposit = Coins::from_sorted(msg.deposit_coins.clone())?;
        self.params.check_reserve_coin_limit(&deposit)?;

        let pool = Pool::new(&a.denom, &b.denom, msg.pool_type_id);
        if self.pool_by_reserve_account(&pool.reserve_account)?.is_some() {
            return Err(LiquidityError::PoolAlreadyExists);
        }
        Ok((pool, deposit))
    }

    /// Create a pool from an initial two-coin deposit.
    ///
    /// The deposit moves straight to the reserve account (no escrow), the creator
    /// receives the fixed initial share amount, and the creation fee goes to the
    /// community pool.
    pub fn create_pool(&mut self, msg: &MsgCreatePool, height: i64) -> Result<Pool> {
        let (pool, deposit) = self.validate_msg_create_pool(msg)?;
        let creator = msg.pool_creator;

        if deposit
            .iter()
            .any(|coin| coin.amount < self.params.min_init_deposit_amount)
        {
            return Err(LiquidityError::LessThanMinInitDeposit);
        }
        let balances = self.bank.all_balances(&creator);
        if !balances.is_all_gte(&deposit) {
            return Err(LiquidityError::InsufficientBalance);
        }
        let fee = self.params.pool_creation_fee.clone();
        if !balances.is_all_gte(&deposit.checked_add(&fee)?) {
            return Err(LiquidityError::InsufficientPoolCreationFee);
        }

        let pool_coin = self.mint_and_send_pool_coin(&pool, &creator, &creator, &deposit)?;
        self.bank.send(&creator, &COMMUNITY_POOL_ACCOUNT, &fee)?;

        let pool = self.set_pool_atomic(pool)?;
        let mut batch = PoolBatch::new(pool.id, 1);
        batch.begin_height = height;
        self.set_pool_batch(&batch)?;

        info!(
            pool_id = pool.id,
            pool_name = %pool.name(),
            reserve_account = %pool.reserve_account,
            %deposit,
            %pool_coin,
            "pool created"
        );
        Ok(pool)
    }

    /// Mint the initial share amount and, atomically, move `deposit` from `source`
    /// into the reserve account while the shares go to `recipient`.
    ///
    /// Used at creation and when a depleted pool is reinitialized; the share amount
    /// is the configured constant, not a ratio.
    pub(crate) fn mint_and_send_pool_coin(
        &mut self,
        pool: &Pool,
        source: &Address,
        recipient: &Address,
        deposit: &Coins,
    ) -> Result<Coin> {
        let pool_coin = Coin::new(
            pool.pool_coin_denom.clone(),
            self.params.init_pool_coin_mint_amount,
        );
        let minted = Coins::from_coin(pool_coin.clone());
        self.bank.mint(&ESCROW_ACCOUNT, &minted)?;

        let inputs = [(*source, deposit.clone()), (*ESCROW_ACCOUNT, minted.clone())];
        let outputs = [
            (pool.reserve_account, deposit.clone()),
            (*recipient, minted.clone()),
        ];
        if let Err(err) = self.bank.multi_send(&inputs, &outputs) {
            self.bank.burn(&ESCROW_ACCOUNT, &minted)?;
            return Err(err.into());
        }
        debug!(pool_id = pool.id, %pool_coin, %recipient, "initial pool coin minted");
        Ok(pool_coin)
    }
}
