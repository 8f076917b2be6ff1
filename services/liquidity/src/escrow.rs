//! Escrow accounting
//!
//! Requests are paid into the shared escrow account when queued and paid out of it
//! when they settle or are refunded. Settlement payouts are gathered into a
//! [`TransferBatch`] and issued as one multi-send, so a batch either moves every
//! coin or none.

use crate::keeper::{Keeper, ESCROW_ACCOUNT};
use crate::traits::{BankKeeper, KvStore};
use types::{Address, BankError, Coin, Coins, LiquidityError, Result};

/// Paired debits and credits for one atomic multi-send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferBatch {
    inputs: Vec<(Address, Coins)>,
    outputs: Vec<(Address, Coins)>,
}

impl TransferBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `coin` from `from` to `to`; zero amounts are skipped
    pub fn push(&mut self, from: Address, to: Address, coin: Coin) {
        if coin.is_zero() {
            return;
        }
        let coins = Coins::from_coin(coin);
        self.inputs.push((from, coins.clone()));
        self.outputs.push((to, coins));
    }

    pub fn push_coins(&mut self, from: Address, to: Address, coins: &Coins) {
        if coins.is_empty() {
            return;
        }
        self.inputs.push((from, coins.clone()));
        self.outputs.push((to, coins.clone()));
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[(Address, Coins)] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[(Address, Coins)] {
        &self.outputs
    }
}

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    /// Move a requester's coins into escrow
    pub fn hold_escrow(&mut self, depositor: &Address, coins: &Coins) -> Result<()> {
        self.bank
            .send(depositor, &ESCROW_ACCOUNT, coins)
            .map_err(|err| match err {
                BankError::InsufficientFunds { .. } => LiquidityError::InsufficientBalance,
                other => other.into(),
            })
    }

    /// Return escrowed coins to `recipient`
    pub fn release_escrow(&mut self, recipient: &Address, coins: &Coins) -> Result<()> {
        self.bank.send(&ESCROW_ACCOUNT, recipient, coins)?;
        Ok(())
    }

    pub fn execute_transfers(&mut self, batch: &TransferBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.bank.multi_send(batch.inputs(), batch.outputs())?;
        Ok(())
    }

    pub fn escrow_balance(&self) -> Coins {
        self.bank.all_balances(&ESCROW_ACCOUNT)
    }
}
