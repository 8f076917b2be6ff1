//! In-memory bank ledger
//!
//! Stand-in for the host's bank module: per-account balances plus per-denom supply.
//! Every mutation either applies in full or leaves the ledger untouched.

use crate::traits::BankKeeper;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::{Address, BankError, Coin, Coins};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemBank {
    balances: BTreeMap<Address, Coins>,
    supply: Coins,
}

fn overflow(coin: &Coin) -> BankError {
    BankError::Overflow {
        denom: coin.denom.clone(),
    }
}

fn credit(balances: &mut BTreeMap<Address, Coins>, to: &Address, coins: &Coins) -> Result<(), BankError> {
    let held = balances.entry(*to).or_default();
    for coin in coins {
        held.add_coin(coin).map_err(|_| overflow(coin))?;
    }
    Ok(())
}

fn debit(balances: &mut BTreeMap<Address, Coins>, from: &Address, coins: &Coins) -> Result<(), BankError> {
    let held = balances.get(from).cloned().unwrap_or_default();
    for coin in coins {
        let available = held.amount_of(&coin.denom);
        if available < coin.amount {
            return Err(BankError::InsufficientFunds {
                address: from.to_string(),
                denom: coin.denom.clone(),
                available,
                needed: coin.amount,
            });
        }
    }
    // Every denom was checked above
    let left = held.checked_sub(coins).unwrap_or_default();
    if left.is_empty() {
        balances.remove(from);
    } else {
        balances.insert(*from, left);
    }
    Ok(())
}

impl MemBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint straight into an account; used to seed test and genesis balances
    pub fn fund(&mut self, to: &Address, coins: &Coins) -> Result<(), BankError> {
        self.mint(to, coins)
    }

    /// Accounts with a non-empty balance, in address order
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Coins)> {
        self.balances.iter()
    }

    pub fn total_supply(&self) -> &Coins {
        &self.supply
    }
}

impl BankKeeper for MemBank {
    fn balance(&self, address: &Address, denom: &str) -> u128 {
        self.balances
            .get(address)
            .map_or(0, |coins| coins.amount_of(denom))
    }

    fn all_balances(&self, address: &Address) -> Coins {
        self.balances.get(address).cloned().unwrap_or_default()
    }

    fn supply(&self, denom: &str) -> u128 {
        self.supply.amount_of(denom)
    }

    fn send(&mut self, from: &Address, to: &Address, coins: &Coins) -> Result<(), BankError> {
        self.multi_send(&[(*from, coins.clone())], &[(*to, coins.clone())])
    }

    fn multi_send(
        &mut self,
        inputs: &[(Address, Coins)],
        outputs: &[(Address, Coins)],
    ) -> Result<(), BankError> {
        let mut total_in = Coins::empty();
        let mut total_out = Coins::empty();
        for (_, coins) in inputs {
            for coin in coins {
                total_in.add_coin(coin).map_err(|_| overflow(coin))?;
            }
        }
        for (_, coins) in outputs {
            for coin in coins {
                total_out.add_coin(coin).map_err(|_| overflow(coin))?;
            }
        }
        if total_in != total_out {
            let denom = total_in
                .iter()
                .chain(total_out.iter())
                .find(|c| total_in.amount_of(&c.denom) != total_out.amount_of(&c.denom))
                .map(|c| c.denom.clone())
                .unwrap_or_default();
            return Err(BankError::UnbalancedTransfer { denom });
        }

        let mut next = self.balances.clone();
        for (from, coins) in inputs {
            debit(&mut next, from, coins)?;
        }
        for (to, coins) in outputs {
            credit(&mut next, to, coins)?;
        }
        next.retain(|_, coins| !coins.is_empty());
        self.balances = next;
        Ok(())
    }

    fn mint(&mut self, to: &Address, coins: &Coins) -> Result<(), BankError> {
        let mut supply = self.supply.clone();
        for coin in coins {
            supply.add_coin(coin).map_err(|_| overflow(coin))?;
        }
        let mut next = self.balances.clone();
        credit(&mut next, to, coins)?;
        next.retain(|_, coins| !coins.is_empty());
        self.balances = next;
        self.supply = supply;
        Ok(())
    }

    fn burn(&mut self, from: &Address, coins: &Coins) -> Result<(), BankError> {
        for coin in coins {
            if self.supply.amount_of(&coin.denom) < coin.amount {
                return Err(BankError::SupplyUnderflow {
                    denom: coin.denom.clone(),
                    amount: coin.amount,
                });
            }
        }
        let mut next = self.balances.clone();
        debit(&mut next, from, coins)?;
        self.supply = self.supply.checked_sub(coins).unwrap_or_default();
        self.balances = next;
        Ok(())
    }
}
