//! End-to-End Test Framework for the liquidity keeper
//!
//! Drives the keeper the way a host chain would: blocks of `BeginBlock`,
//! delivered messages and `EndBlock`, against the in-memory store and bank.
//! Scenarios check balances, escrow and batch bookkeeping after each step.

pub mod fixtures;
pub mod framework;
pub mod scenarios;
pub mod validation;

pub use fixtures::Harness;
pub use framework::{TestConfig, TestFramework, TestResult, TestScenario};
pub use scenarios::all_scenarios;
pub use validation::validate_all;
