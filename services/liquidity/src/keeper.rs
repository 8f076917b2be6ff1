//! Liquidity keeper
//!
//! Owns the module's view of the host: a keyed store handle, a bank handle and the
//! parameter snapshot. Every operation in the registry, ledger, escrow, settlement,
//! swap and coordinator modules is an `impl` block on [`Keeper`], so the whole
//! module state is passed explicitly rather than reached through globals.

use crate::traits::{BankKeeper, KvStore};
use liquidity_config::defaults::DEFAULT_INVARIANT_CHECKS;
use liquidity_config::LiquidityConfig;
use once_cell::sync::Lazy;
use types::keys::MODULE_NAME;
use types::{Address, Params, Result};

/// Shared escrow holding every queued deposit, withdrawal and swap offer
pub static ESCROW_ACCOUNT: Lazy<Address> = Lazy::new(|| Address::module(MODULE_NAME));

/// Fee sink for pool creation fees
pub static COMMUNITY_POOL_ACCOUNT: Lazy<Address> = Lazy::new(|| Address::module("distribution"));

pub struct Keeper<S, B> {
    pub(crate) store: S,
    pub(crate) bank: B,
    pub(crate) params: Params,
    pub(crate) invariant_checks: bool,
}

impl<S: KvStore, B: BankKeeper> Keeper<S, B> {
    pub fn new(store: S, bank: B, params: Params) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            bank,
            params,
            invariant_checks: DEFAULT_INVARIANT_CHECKS,
        })
    }

    /// Build from layered configuration
    pub fn with_config(store: S, bank: B, config: &LiquidityConfig) -> anyhow::Result<Self> {
        let params = config.params()?;
        Ok(Self::new(store, bank, params)?.with_invariant_checks(config.keeper.invariant_checks))
    }

    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.invariant_checks = enabled;
        self
    }

    pub fn invariant_checks(&self) -> bool {
        self.invariant_checks
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_parts(self) -> (S, B, Params) {
        (self.store, self.bank, self.params)
    }
}
