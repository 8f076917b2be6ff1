//! Collaborator Traits
//!
//! The keeper runs against a host that owns persistence and balances. These traits
//! are the seams: an ordered key-value store, a bank ledger, and the replayable
//! state machine interface the host drives once per block.

use types::{Address, BankError, Coins};

/// Ordered key-value store owned by the host
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// Entries whose key starts with `prefix`, in ascending key order.
    ///
    /// Lazy: callers that stop early never touch the rest of the range.
    fn prefix_iter<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (&'a [u8], &'a [u8])> + 'a>;
}

/// Balances and supply ledger owned by the host
pub trait BankKeeper {
    fn balance(&self, address: &Address, denom: &str) -> u128;

    fn all_balances(&self, address: &Address) -> Coins;

    /// Total supply of `denom` across all accounts
    fn supply(&self, denom: &str) -> u128;

    fn send(&mut self, from: &Address, to: &Address, coins: &Coins) -> Result<(), BankError>;

    /// Apply every debit and credit, or none of them.
    ///
    /// Inputs and outputs must balance per denom.
    fn multi_send(
        &mut self,
        inputs: &[(Address, Coins)],
        outputs: &[(Address, Coins)],
    ) -> Result<(), BankError>;

    /// Create `coins` in `to`, growing supply
    fn mint(&mut self, to: &Address, coins: &Coins) -> Result<(), BankError>;

    /// Destroy `coins` held by `from`, shrinking supply
    fn burn(&mut self, from: &Address, coins: &Coins) -> Result<(), BankError>;
}

/// Core trait for stateful components that can apply events
pub trait Stateful {
    /// Event type this component can handle
    type Event;

    /// Error type for failed operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply an event to update the state
    fn apply_event(&mut self, event: Self::Event) -> Result<(), Self::Error>;

    /// Create a snapshot of the current state
    fn snapshot(&self) -> Result<Vec<u8>, Self::Error>;

    /// Restore state from a snapshot
    fn restore(&mut self, snapshot: &[u8]) -> Result<(), Self::Error>;
}
