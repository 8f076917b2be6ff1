//! Coin amounts and sorted coin bundles
//!
//! [`Coins`] keeps the ledger's canonical form: sorted by denom, one entry per
//! denom, no zero amounts. Two bundles with the same holdings are therefore equal
//! and serialize to the same bytes.

use crate::common::errors::{LiquidityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single-denom amount
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Denoms are 3-128 chars, start with a letter, and contain only
    /// alphanumerics and `/:._-`
    pub fn validate_denom(denom: &str) -> Result<()> {
        let len_ok = (3..=128).contains(&denom.len());
        let starts_alpha = denom.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        let charset_ok = denom
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
        if len_ok && starts_alpha && charset_ok {
            Ok(())
        } else {
            Err(LiquidityError::InvalidDenom)
        }
    }

    pub fn validate(&self) -> Result<()> {
        Self::validate_denom(&self.denom)
    }

    pub fn checked_add(&self, amount: u128) -> Result<Coin> {
        let amount = self
            .amount
            .checked_add(amount)
            .ok_or(LiquidityError::OverflowAmount)?;
        Ok(Coin::new(self.denom.clone(), amount))
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sorted, deduplicated, zero-free set of coins
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Normalize arbitrary coins: sort, merge duplicates, drop zeros
    pub fn new(coins: impl IntoIterator<Item = Coin>) -> Result<Self> {
        let mut out = Coins::empty();
        for coin in coins {
            out.add_coin(&coin)?;
        }
        Ok(out)
    }

    pub fn from_coin(coin: Coin) -> Self {
        if coin.is_zero() {
            Self::empty()
        } else {
            Self(vec![coin])
        }
    }

    /// Keep the input order exactly, rejecting anything not already canonical.
    /// Used where the order of a request's coins is itself validated.
    pub fn from_sorted(coins: Vec<Coin>) -> Result<Self> {
        for pair in coins.windows(2) {
            if pair[0].denom >= pair[1].denom {
                return Err(LiquidityError::BadOrderingReserveCoin);
            }
        }
        if coins.iter().any(Coin::is_zero) {
            return Err(LiquidityError::BadDepositCoinsAmount);
        }
        Ok(Self(coins))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&Coin> {
        self.0.get(idx)
    }

    pub fn denoms(&self) -> Vec<String> {
        self.0.iter().map(|c| c.denom.clone()).collect()
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|idx| self.0[idx].amount)
            .unwrap_or(0)
    }

    pub fn total_amount(&self) -> Result<u128> {
        self.0.iter().try_fold(0u128, |acc, c| {
            acc.checked_add(c.amount).ok_or(LiquidityError::OverflowAmount)
        })
    }

    pub fn add_coin(&mut self, coin: &Coin) -> Result<()> {
        if coin.is_zero() {
            return Ok(());
        }
        match self.0.binary_search_by(|c| c.denom.cmp(&coin.denom)) {
            Ok(idx) => {
                self.0[idx].amount = self.0[idx]
                    .amount
                    .checked_add(coin.amount)
                    .ok_or(LiquidityError::OverflowAmount)?;
            }
            Err(idx) => self.0.insert(idx, coin.clone()),
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins> {
        let mut out = self.clone();
        for coin in other.iter() {
            out.add_coin(coin)?;
        }
        Ok(out)
    }

    /// Subtract `other`, failing with `InsufficientBalance` if any denom goes negative
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins> {
        let mut out = self.clone();
        for coin in other.iter() {
            let idx = out
                .0
                .binary_search_by(|c| c.denom.cmp(&coin.denom))
                .map_err(|_| LiquidityError::InsufficientBalance)?;
            let left = out.0[idx]
                .amount
                .checked_sub(coin.amount)
                .ok_or(LiquidityError::InsufficientBalance)?;
            if left == 0 {
                out.0.remove(idx);
            } else {
                out.0[idx].amount = left;
            }
        }
        Ok(out)
    }

    /// True if every denom in `other` is covered by `self`
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }

    pub fn validate(&self) -> Result<()> {
        for coin in self.iter() {
            coin.validate()?;
        }
        Ok(())
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
