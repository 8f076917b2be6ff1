//! Settlement properties over random single-block order flow
//!
//! Every case creates the same 2,000,000 uatom / 1,000,000 uusd pool, delivers a
//! handful of swaps priced around the pool price of 2 and settles one block with
//! invariant checks on.

use liquidity::{BankKeeper, MsgResponse};
use liquidity_e2e_tests::fixtures::{account, Harness, DENOM_X, DENOM_Y, FEE_DENOM};
use liquidity_e2e_tests::validate_all;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::{Address, Coin, LiquidityMsg, Pool};

const TRADER_FUNDS: u128 = 1_000_000;

#[derive(Debug, Clone)]
struct Order {
    /// Offer uusd for uatom; otherwise offer twice `amount` in uatom
    sell_y: bool,
    amount: u128,
    price: Decimal,
}

prop_compose! {
    /// Limit prices 1.90..=2.10 in steps of 0.01, skipping the pool price itself
    fn price()
        (tick in prop_oneof![0i64..10, 11i64..=20]) -> Decimal {
        dec!(1.90) + Decimal::new(tick, 2)
    }
}

prop_compose! {
    fn order()
        (sell_y in any::<bool>(), amount in 1_000u128..50_000u128, price in price()) -> Order {
        Order { sell_y, amount, price }
    }
}

prop_compose! {
    fn one_sided(sell_y: bool)
        (orders in prop::collection::vec(order(), 1..6)) -> Vec<Order> {
        orders.into_iter().map(|o| Order { sell_y, ..o }).collect()
    }
}

struct Settled {
    harness: Harness,
    pool: Pool,
    traders: Vec<Address>,
    supply_before: [u128; 2],
}

fn offer_of(order: &Order) -> Coin {
    if order.sell_y {
        Coin::new(DENOM_Y, order.amount)
    } else {
        Coin::new(DENOM_X, 2 * order.amount)
    }
}

/// Pool at height 1, the orders delivered and settled at height 2
fn settle(orders: &[Order]) -> Settled {
    let mut h = Harness::with_defaults().unwrap();
    let creator = account("creator");
    h.fund(
        &creator,
        &[(DENOM_X, 10_000_000), (DENOM_Y, 10_000_000), (FEE_DENOM, 40_000_000)],
    )
    .unwrap();
    h.begin(1).unwrap();
    let pool = h.create_pool(&creator, 2_000_000, 1_000_000).unwrap();
    h.end().unwrap();

    let traders: Vec<Address> = (0..orders.len())
        .map(|i| account(&format!("trader-{i}")))
        .collect();
    for trader in &traders {
        h.fund(trader, &[(DENOM_X, TRADER_FUNDS), (DENOM_Y, TRADER_FUNDS)])
            .unwrap();
    }
    let supply_before = [
        h.keeper().bank().supply(DENOM_X),
        h.keeper().bank().supply(DENOM_Y),
    ];

    h.begin(2).unwrap();
    for (trader, order) in traders.iter().zip(orders) {
        let msg = h.swap_msg(trader, &pool, offer_of(order), order.price).unwrap();
        let response = h.deliver(&LiquidityMsg::SwapWithinBatch(msg)).unwrap();
        assert!(matches!(response, MsgResponse::SwapQueued(_)));
    }
    h.end().unwrap();

    Settled {
        harness: h,
        pool,
        traders,
        supply_before,
    }
}

fn pool_price(s: &Settled) -> Decimal {
    let [x, y] = s.harness.keeper().reserve_amounts(&s.pool);
    Decimal::from(x as u64) / Decimal::from(y as u64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: once a block settles orders that expire in it, escrow holds
    /// nothing and every validator passes
    #[test]
    fn escrow_is_empty_after_settlement(orders in prop::collection::vec(order(), 1..8)) {
        let s = settle(&orders);
        prop_assert!(s.harness.keeper().escrow_balance().is_empty());
        for result in validate_all(s.harness.keeper()).unwrap() {
            prop_assert!(result.is_acceptable(), "{}: {}", result.validator, result.message);
        }
    }

    /// Property: swaps move coins around but never create or destroy them
    #[test]
    fn reserve_supply_is_conserved(orders in prop::collection::vec(order(), 1..8)) {
        let s = settle(&orders);
        let bank = s.harness.keeper().bank();
        prop_assert_eq!([bank.supply(DENOM_X), bank.supply(DENOM_Y)], s.supply_before);

        let held_by_traders_and_pool: u128 = s
            .traders
            .iter()
            .chain(std::iter::once(&s.pool.reserve_account))
            .map(|a| bank.balance(a, DENOM_X))
            .sum();
        let before = TRADER_FUNDS * s.traders.len() as u128 + 2_000_000;
        prop_assert_eq!(held_by_traders_and_pool, before);
    }

    /// Property: selling uusd into the pool never raises its uatom price, and no
    /// seller gets more than the pre-batch price would pay
    #[test]
    fn sells_push_price_down_without_overpaying(orders in one_sided(true)) {
        let s = settle(&orders);
        prop_assert!(pool_price(&s) <= dec!(2));
        for (trader, order) in s.traders.iter().zip(&orders) {
            let received = s.harness.balance(trader, DENOM_X) - TRADER_FUNDS;
            prop_assert!(received <= 2 * order.amount);
        }
    }

    /// Property: buying uusd from the pool never lowers its uatom price, and no
    /// buyer gets more than the pre-batch price would pay
    #[test]
    fn buys_push_price_up_without_overpaying(orders in one_sided(false)) {
        let s = settle(&orders);
        prop_assert!(pool_price(&s) >= dec!(2));
        for (trader, order) in s.traders.iter().zip(&orders) {
            let received = s.harness.balance(trader, DENOM_Y) - TRADER_FUNDS;
            prop_assert!(received <= order.amount);
        }
    }
}
