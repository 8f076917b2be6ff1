//! End-to-end test scenarios
//!
//! Every scenario starts from an empty in-memory app, funds a few accounts and
//! drives whole blocks through it. Numbers below assume a 2:1 pool of
//! 2,000,000 uatom and 1,000,000 uusd, so one uusd trades for two uatom.

use crate::fixtures::{
    account, create_pool_msg, deposit_msg, swap_msg, withdraw_msg, Harness, DENOM_X, DENOM_Y,
    FEE_DENOM,
};
use crate::framework::{TestConfig, TestResult, TestScenario, ValidationResult};
use crate::validation::validate_all;
use anyhow::{anyhow, Context, Result};
use liquidity::{BlockEvent, Stateful};
use rust_decimal_macros::dec;
use types::{
    Address, Coin, GenesisState, LiquidityError, LiquidityMsg, Params, Pool, SwapMsgState,
};

const POOL_X: u128 = 2_000_000;
const POOL_Y: u128 = 1_000_000;
const USER_FUNDS: u128 = 10_000_000;

fn fund_user(harness: &mut Harness, who: &Address) -> Result<()> {
    harness.fund(
        who,
        &[
            (DENOM_X, USER_FUNDS),
            (DENOM_Y, USER_FUNDS),
            (FEE_DENOM, 100_000_000),
        ],
    )
}

/// Harness with one pool created by `creator` at height 1
fn seeded_pool(params: Params, config: &TestConfig) -> Result<(Harness, Pool, Address)> {
    let mut harness = Harness::new(params, config.invariant_checks)?;
    let creator = account("creator");
    fund_user(&mut harness, &creator)?;
    harness.begin(1)?;
    let pool = harness.create_pool(&creator, POOL_X, POOL_Y)?;
    harness.end()?;
    Ok((harness, pool, creator))
}

fn finish(name: &str, harness: &Harness, mut results: Vec<ValidationResult>) -> Result<TestResult> {
    results.extend(validate_all(harness.keeper())?);
    Ok(TestResult::from_validations(
        name,
        harness.metrics().clone(),
        results,
    ))
}

pub fn all_scenarios() -> Vec<Box<dyn TestScenario>> {
    vec![
        Box::new(DepositRefundScenario),
        Box::new(SwapExpiryScenario),
        Box::new(DepletedPoolScenario),
        Box::new(UnmatchedCarryOverScenario),
        Box::new(BatchIndexScenario),
        Box::new(GenesisRoundTripScenario),
        Box::new(DeterministicReplayScenario),
    ]
}

/// Deposit off the pool ratio: the scarce side is taken in full, the rest comes back
pub struct DepositRefundScenario;

impl TestScenario for DepositRefundScenario {
    fn name(&self) -> &str {
        "deposit_refund"
    }

    fn description(&self) -> &str {
        "an unbalanced deposit mints at the pool ratio and refunds the excess"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let (mut h, pool, _) = seeded_pool(Params::default(), config)?;
        let bob = account("bob");
        fund_user(&mut h, &bob)?;

        h.run_block(2, &[deposit_msg(&bob, &pool, 400_000, 100_000)])?;

        let results = vec![
            ValidationResult::expect_eq("minted", 100_000, h.balance(&bob, &pool.pool_coin_denom)),
            ValidationResult::expect_eq("refunded_x", USER_FUNDS - 200_000, h.balance(&bob, DENOM_X)),
            ValidationResult::expect_eq("spent_y", USER_FUNDS - 100_000, h.balance(&bob, DENOM_Y)),
            ValidationResult::expect_eq(
                "reserves",
                [POOL_X + 200_000, POOL_Y + 100_000],
                h.keeper().reserve_amounts(&pool),
            ),
            ValidationResult::check(
                "escrow_empty",
                h.keeper().escrow_balance().is_empty(),
                "escrow after settlement",
            ),
        ];
        finish(self.name(), &h, results)
    }
}

/// With a five-block interval, a swap queued mid-interval waits for the boundary
pub struct SwapExpiryScenario;

impl TestScenario for SwapExpiryScenario {
    fn name(&self) -> &str {
        "swap_expiry"
    }

    fn description(&self) -> &str {
        "an order held in escrow until the interval boundary, refunded, then purged"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let params = Params {
            unit_batch_height: 5,
            ..Params::default()
        };
        let (mut h, pool, _) = seeded_pool(params, config)?;
        let bob = account("bob");
        fund_user(&mut h, &bob)?;
        let mut results = Vec::new();

        // a buy below the pool price; nothing will cross it
        h.begin(2)?;
        let msg = h.swap_msg(&bob, &pool, Coin::new(DENOM_X, 10_000), dec!(1.8))?;
        let state = h.queue_swap(&msg, 0)?;
        results.push(ValidationResult::expect_eq("expiry_height", 5, state.order_expiry_height));
        h.end()?;

        for height in 3..=4 {
            h.begin(height)?;
            h.end()?;
            results.push(ValidationResult::expect_eq(
                "escrow_held",
                10_015,
                h.keeper().escrow_balance().amount_of(DENOM_X),
            ));
        }

        h.begin(5)?;
        h.end()?;
        let settled = h
            .keeper()
            .msg_state::<SwapMsgState>(pool.id, state.msg_index)?
            .ok_or_else(|| anyhow!("swap record missing at its expiry"))?;
        results.push(ValidationResult::check(
            "refunded_at_expiry",
            settled.executed && !settled.succeeded && settled.to_be_deleted,
            format!("{settled:?}"),
        ));
        results.push(ValidationResult::expect_eq("refund", USER_FUNDS, h.balance(&bob, DENOM_X)));

        h.begin(6)?;
        results.push(ValidationResult::check(
            "purged",
            h.keeper()
                .msg_state::<SwapMsgState>(pool.id, state.msg_index)?
                .is_none(),
            "record gone after the next begin block",
        ));
        let batch = h.keeper().require_pool_batch(pool.id)?;
        results.push(ValidationResult::expect_eq(
            "next_batch",
            (2, 6, false),
            (batch.index, batch.begin_height, batch.executed),
        ));
        finish(self.name(), &h, results)
    }
}

/// Withdrawing every share empties the pool; the next deposit starts it over
pub struct DepletedPoolScenario;

impl TestScenario for DepletedPoolScenario {
    fn name(&self) -> &str {
        "depleted_pool"
    }

    fn description(&self) -> &str {
        "full withdrawal depletes a pool, swaps are refused, a deposit reinitializes it"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let params = Params::default();
        let init_mint = params.init_pool_coin_mint_amount;
        let (mut h, pool, creator) = seeded_pool(params, config)?;
        let mut results = Vec::new();

        h.run_block(2, &[withdraw_msg(&creator, &pool, init_mint)])?;
        results.push(ValidationResult::check(
            "depleted",
            h.keeper().is_depleted_pool(&pool),
            "pool has no shares after the full withdrawal",
        ));
        results.push(ValidationResult::expect_eq("reserves_drained", [0, 0], h.keeper().reserve_amounts(&pool)));
        results.push(ValidationResult::expect_eq("creator_x", USER_FUNDS, h.balance(&creator, DENOM_X)));

        h.begin(3)?;
        let swap = h.swap_msg(&creator, &pool, Coin::new(DENOM_Y, 10_000), dec!(1.9))?;
        let refused = h.deliver(&LiquidityMsg::SwapWithinBatch(swap));
        results.push(ValidationResult::check(
            "swap_refused",
            matches!(refused, Err(LiquidityError::DepletedPool)),
            format!("{refused:?}"),
        ));
        h.deliver(&deposit_msg(&creator, &pool, 1_500_000, 1_500_000))
            .context("deposit into depleted pool")?;
        h.end()?;

        results.push(ValidationResult::expect_eq(
            "reinitialized_supply",
            init_mint,
            h.keeper().pool_coin_total_supply(&pool),
        ));
        results.push(ValidationResult::expect_eq(
            "reinitialized_reserves",
            [1_500_000, 1_500_000],
            h.keeper().reserve_amounts(&pool),
        ));
        finish(self.name(), &h, results)
    }
}

/// A long-lived order that does not cross stays queued after its batch settles
pub struct UnmatchedCarryOverScenario;

impl TestScenario for UnmatchedCarryOverScenario {
    fn name(&self) -> &str {
        "unmatched_carry_over"
    }

    fn description(&self) -> &str {
        "a resting buy survives a matched batch and is refunded when a later batch has no match"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let (mut h, pool, _) = seeded_pool(Params::default(), config)?;
        let bob = account("bob");
        let carol = account("carol");
        fund_user(&mut h, &bob)?;
        fund_user(&mut h, &carol)?;
        let mut results = Vec::new();

        h.begin(2)?;
        let buy = h.swap_msg(&bob, &pool, Coin::new(DENOM_X, 20_000), dec!(1.8))?;
        let resting = h.queue_swap(&buy, 3)?;
        let sell = h.swap_msg(&carol, &pool, Coin::new(DENOM_Y, 10_000), dec!(1.9))?;
        h.deliver(&LiquidityMsg::SwapWithinBatch(sell))?;
        h.end()?;

        let state = h
            .keeper()
            .msg_state::<SwapMsgState>(pool.id, resting.msg_index)?
            .ok_or_else(|| anyhow!("resting order missing"))?;
        results.push(ValidationResult::check(
            "resting_kept",
            state.executed && !state.succeeded && !state.to_be_deleted,
            format!("{state:?}"),
        ));
        results.push(ValidationResult::expect_eq(
            "resting_escrow",
            20_030,
            h.keeper().escrow_balance().amount_of(DENOM_X),
        ));
        let received = h.balance(&carol, DENOM_X) - USER_FUNDS;
        results.push(ValidationResult::check(
            "sell_filled",
            received > 19_000 && received < 20_000,
            format!("carol received {received} {DENOM_X}"),
        ));

        h.begin(3)?;
        let state = h
            .keeper()
            .msg_state::<SwapMsgState>(pool.id, resting.msg_index)?
            .ok_or_else(|| anyhow!("resting order missing after reset"))?;
        results.push(ValidationResult::check("reset", !state.executed, format!("{state:?}")));
        h.end()?;

        results.push(ValidationResult::expect_eq("refund", USER_FUNDS, h.balance(&bob, DENOM_X)));
        results.push(ValidationResult::check(
            "escrow_empty",
            h.keeper().escrow_balance().is_empty(),
            "escrow after the no-match batch",
        ));
        finish(self.name(), &h, results)
    }
}

/// Batch and record indices only ever move forward
pub struct BatchIndexScenario;

impl TestScenario for BatchIndexScenario {
    fn name(&self) -> &str {
        "batch_index"
    }

    fn description(&self) -> &str {
        "one settled batch per block, record indices continue across batches"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let (mut h, pool, _) = seeded_pool(Params::default(), config)?;
        let bob = account("bob");
        fund_user(&mut h, &bob)?;
        let mut results = Vec::new();

        for height in 2..=6 {
            h.run_block(height, &[deposit_msg(&bob, &pool, 100_000, 50_000)])?;
            let batch = h.keeper().require_pool_batch(pool.id)?;
            results.push(ValidationResult::expect_eq(
                "batch_after_block",
                (height as u64 - 1, true),
                (batch.index, batch.executed),
            ));
        }

        let batch = h.keeper().require_pool_batch(pool.id)?;
        results.push(ValidationResult::expect_eq("deposit_msg_index", 6, batch.deposit_msg_index));
        results.push(ValidationResult::expect_eq(
            "bob_shares",
            5 * 50_000,
            h.balance(&bob, &pool.pool_coin_denom),
        ));
        finish(self.name(), &h, results)
    }
}

/// Export mid-block, import into a fresh app, and both finish the block alike
pub struct GenesisRoundTripScenario;

impl TestScenario for GenesisRoundTripScenario {
    fn name(&self) -> &str {
        "genesis_round_trip"
    }

    fn description(&self) -> &str {
        "export to a file, import elsewhere, re-export byte for byte, settle identically"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let (mut h, pool, _) = seeded_pool(Params::default(), config)?;
        let bob = account("bob");
        fund_user(&mut h, &bob)?;

        h.begin(2)?;
        let buy = h.swap_msg(&bob, &pool, Coin::new(DENOM_X, 10_000), dec!(1.8))?;
        h.queue_swap(&buy, 4)?;
        h.deliver(&deposit_msg(&bob, &pool, 200_000, 100_000))?;

        let exported = h.keeper().export_genesis()?.to_canonical_json()?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genesis.json");
        std::fs::write(&path, &exported)?;
        let loaded = GenesisState::from_json(&std::fs::read(&path)?)?;

        let mut other = Harness::new(Params::default(), config.invariant_checks)?;
        other.begin(2)?;
        *other.app_mut().keeper_mut().bank_mut() = h.keeper().bank().clone();
        other.app_mut().keeper_mut().init_genesis(&loaded, 2)?;
        let reexported = other.keeper().export_genesis()?.to_canonical_json()?;

        let mut results = vec![ValidationResult::check(
            "byte_identical",
            exported == reexported,
            format!("{} bytes exported", exported.len()),
        )];

        h.end()?;
        other.end()?;
        results.push(ValidationResult::check(
            "same_settlement",
            h.app().snapshot()? == other.app().snapshot()?,
            "snapshots after settling the imported block",
        ));
        finish(self.name(), &h, results)
    }
}

/// The block lifecycle as a recorded event log
pub fn replay_events(creator: &Address, traders: &[Address]) -> Result<Vec<BlockEvent>> {
    // pool ids start at 1
    let pool = Pool {
        id: 1,
        ..Pool::new(DENOM_X, DENOM_Y, 1)
    };
    let fee_rate = Params::default().swap_fee_rate;
    let mut events = vec![
        BlockEvent::BeginBlock(1),
        BlockEvent::Deliver(create_pool_msg(creator, POOL_X, POOL_Y)),
        BlockEvent::EndBlock,
    ];

    for (i, trader) in traders.iter().enumerate() {
        let height = i as i64 + 2;
        let amount = 10_000 + 1_000 * i as u128;
        let sell = swap_msg(trader, &pool, Coin::new(DENOM_Y, amount), dec!(1.9), fee_rate)?;
        let buy = swap_msg(trader, &pool, Coin::new(DENOM_X, 2 * amount), dec!(2.1), fee_rate)?;
        events.push(BlockEvent::BeginBlock(height));
        events.push(BlockEvent::Deliver(deposit_msg(trader, &pool, 2 * amount, amount)));
        events.push(BlockEvent::Deliver(LiquidityMsg::SwapWithinBatch(sell)));
        events.push(BlockEvent::Deliver(LiquidityMsg::SwapWithinBatch(buy)));
        events.push(BlockEvent::EndBlock);
    }
    let height = traders.len() as i64 + 2;
    events.push(BlockEvent::BeginBlock(height));
    events.push(BlockEvent::Deliver(withdraw_msg(creator, &pool, 100_000)));
    events.push(BlockEvent::EndBlock);
    Ok(events)
}

/// Same events from the same state always give the same state
pub struct DeterministicReplayScenario;

impl DeterministicReplayScenario {
    fn fresh(config: &TestConfig, accounts: &[Address]) -> Result<Harness> {
        let mut h = Harness::new(Params::default(), config.invariant_checks)?;
        for who in accounts {
            fund_user(&mut h, who)?;
        }
        Ok(h)
    }
}

impl TestScenario for DeterministicReplayScenario {
    fn name(&self) -> &str {
        "deterministic_replay"
    }

    fn description(&self) -> &str {
        "two replays and a snapshot resume all end in the same state"
    }

    fn execute(&self, config: &TestConfig) -> Result<TestResult> {
        let creator = account("creator");
        let traders: Vec<Address> = ["bob", "carol", "dave"].iter().map(|n| account(n)).collect();
        let mut accounts = traders.clone();
        accounts.push(creator);
        let events = replay_events(&creator, &traders)?;
        // resume right after the pool's first settled block
        let split = 8;

        let mut first = Self::fresh(config, &accounts)?;
        let mut second = Self::fresh(config, &accounts)?;
        let mut midpoint = None;
        for (i, event) in events.iter().enumerate() {
            if i == split {
                midpoint = Some(first.app().snapshot()?);
            }
            first.app_mut().apply_event(event.clone())?;
            second.app_mut().apply_event(event.clone())?;
        }
        let midpoint = midpoint.ok_or_else(|| anyhow!("event log shorter than {split}"))?;

        let mut resumed = Self::fresh(config, &[])?;
        resumed.app_mut().restore(&midpoint)?;
        for event in &events[split..] {
            resumed.app_mut().apply_event(event.clone())?;
        }

        let end = first.app().snapshot()?;
        let results = vec![
            ValidationResult::check("replay", end == second.app().snapshot()?, "two full replays"),
            ValidationResult::check("resume", end == resumed.app().snapshot()?, "resumed from midpoint"),
            ValidationResult::check(
                "pool_exists",
                matches!(first.keeper().pools()?.as_slice(), [pool] if pool.id == 1),
                "one pool created by the log",
            ),
        ];
        finish(self.name(), &first, results)
    }
}
