//! Price-level order book built from queued swaps
//!
//! Every swap queued against a pool is either an X→Y order (offers the pool's first
//! reserve denom) or a Y→X order (offers the second). Orders at the same limit price
//! collapse into one [`Order`] level; the book keeps levels ascending by price.
//!
//! ```text
//!   price  │ buy_offer_amt (X)  sell_offer_amt (Y)
//!   ───────┼─────────────────────────────────────
//!    0.95  │        0                 400          ← sells below p count toward "down"
//!    1.00  │      120                  80          ← at p
//!    1.05  │      300                   0          ← buys above p count toward "up"
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::{amount_to_dec, DecimalMath, LiquidityError, Result, SwapMsgState};

/// A resting buy may sit at most this far above the post-trade pool price
pub const MAX_BUY_PRICE_RATIO: Decimal = dec!(1.10);
/// A resting sell may sit at most this far below the post-trade pool price
pub const MIN_SELL_PRICE_RATIO: Decimal = dec!(0.90);
/// Sentinel used for the best sell price when the sell side is empty
const EMPTY_SELL_SIDE_PRICE: Decimal = dec!(1_000_000_000_000);

/// Side of a queued swap relative to the pool's (X, Y) ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Offers X, demands Y
    XtoY,
    /// Offers Y, demands X
    YtoX,
}

/// Aggregated demand at one limit price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub price: Decimal,
    /// X offered by X→Y swaps at this price
    pub buy_offer_amt: u128,
    /// Y offered by Y→X swaps at this price
    pub sell_offer_amt: u128,
    /// Message indexes of the swaps that make up this level
    pub msg_indexes: Vec<u64>,
}

impl Order {
    fn empty(price: Decimal) -> Self {
        Self {
            price,
            buy_offer_amt: 0,
            sell_offer_amt: 0,
            msg_indexes: Vec::new(),
        }
    }
}

/// Price levels sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    orders: Vec<Order>,
}

/// A book plus the positions of its swaps, split by side
///
/// `x_to_y` / `y_to_x` are slots into the state slice the book was built from, in
/// the order the states appear there.
#[derive(Debug, Clone, Default)]
pub struct BookSides {
    pub book: OrderBook,
    pub x_to_y: Vec<usize>,
    pub y_to_x: Vec<usize>,
}

impl OrderBook {
    /// Build the book from swap states.
    ///
    /// With `only_not_matched`, states already marked for deletion or with nothing
    /// left to offer are skipped; this is the view used for post-trade validation.
    pub fn from_states(
        states: &[SwapMsgState],
        denom_x: &str,
        denom_y: &str,
        only_not_matched: bool,
    ) -> Result<BookSides> {
        let mut levels: BTreeMap<Decimal, Order> = BTreeMap::new();
        let mut x_to_y = Vec::new();
        let mut y_to_x = Vec::new();

        for (slot, state) in states.iter().enumerate() {
            if only_not_matched && (state.to_be_deleted || state.remaining_offer_coin.is_zero()) {
                continue;
            }
            let price = state.msg.order_price;
            let remaining = state.remaining_offer_coin.amount;
            let level = levels.entry(price).or_insert_with(|| Order::empty(price));

            let offer_denom = state.msg.offer_coin.denom.as_str();
            if offer_denom == denom_x {
                x_to_y.push(slot);
                level.buy_offer_amt = level
                    .buy_offer_amt
                    .checked_add(remaining)
                    .ok_or(LiquidityError::OverflowAmount)?;
            } else if offer_denom == denom_y {
                y_to_x.push(slot);
                level.sell_offer_amt = level
                    .sell_offer_amt
                    .checked_add(remaining)
                    .ok_or(LiquidityError::OverflowAmount)?;
            } else {
                return Err(LiquidityError::InvalidDenom);
            }
            level.msg_indexes.push(state.msg_index);
        }

        Ok(BookSides {
            book: OrderBook {
                orders: levels.into_values().collect(),
            },
            x_to_y,
            y_to_x,
        })
    }

    pub fn from_orders(mut orders: Vec<Order>) -> Self {
        orders.sort_by(|a, b| a.price.cmp(&b.price));
        Self { orders }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Buy X offered at prices ≥ `price` and sell Y offered at prices ≤ `price`
    pub fn executable_amt(&self, price: Decimal) -> Result<(u128, u128)> {
        self.sum_sides(|p| p >= price, |p| p <= price)
    }

    /// Same as [`executable_amt`](Self::executable_amt) with strict bounds: the
    /// amounts a clearing at `price` is obliged to fill
    pub fn must_executable_amt(&self, price: Decimal) -> Result<(u128, u128)> {
        self.sum_sides(|p| p > price, |p| p < price)
    }

    fn sum_sides(
        &self,
        buy_in_range: impl Fn(Decimal) -> bool,
        sell_in_range: impl Fn(Decimal) -> bool,
    ) -> Result<(u128, u128)> {
        let mut buy = 0u128;
        let mut sell = 0u128;
        for order in &self.orders {
            if buy_in_range(order.price) {
                buy = buy
                    .checked_add(order.buy_offer_amt)
                    .ok_or(LiquidityError::OverflowAmount)?;
            }
            if sell_in_range(order.price) {
                sell = sell
                    .checked_add(order.sell_offer_amt)
                    .ok_or(LiquidityError::OverflowAmount)?;
            }
        }
        Ok((buy, sell))
    }

    /// Post-trade sanity check of the resting book against the pool price.
    ///
    /// Fails when the price is not positive, the best buy crosses the best sell, or
    /// either side rests outside the ±10% band around `current_price`.
    pub fn validate(&self, current_price: Decimal) -> Result<bool> {
        if current_price <= Decimal::ZERO {
            return Ok(false);
        }
        let mut max_buy_price = Decimal::ZERO;
        let mut min_sell_price = EMPTY_SELL_SIDE_PRICE;
        for order in &self.orders {
            if order.buy_offer_amt > 0 && order.price > max_buy_price {
                max_buy_price = order.price;
            }
            if order.sell_offer_amt > 0 && order.price < min_sell_price {
                min_sell_price = order.price;
            }
        }
        if max_buy_price > min_sell_price {
            return Ok(false);
        }
        if max_buy_price.try_quo(current_price)? > MAX_BUY_PRICE_RATIO {
            return Ok(false);
        }
        if min_sell_price.try_quo(current_price)? < MIN_SELL_PRICE_RATIO {
            return Ok(false);
        }
        Ok(true)
    }

    /// Net pressure on the pool price if the batch cleared at `current_price`
    pub fn price_direction(&self, current_price: Decimal) -> Result<PriceDirection> {
        let mut buy_over = Decimal::ZERO;
        let mut buy_at = Decimal::ZERO;
        let mut sell_under = Decimal::ZERO;
        let mut sell_at = Decimal::ZERO;

        for order in &self.orders {
            if order.price > current_price {
                buy_over = buy_over.try_add(amount_to_dec(order.buy_offer_amt)?)?;
            } else if order.price == current_price {
                buy_at = buy_at.try_add(amount_to_dec(order.buy_offer_amt)?)?;
                sell_at = sell_at.try_add(amount_to_dec(order.sell_offer_amt)?)?;
            } else {
                sell_under = sell_under.try_add(amount_to_dec(order.sell_offer_amt)?)?;
            }
        }

        if buy_over > current_price.try_mul(sell_under.try_add(sell_at)?)? {
            Ok(PriceDirection::Increasing)
        } else if current_price.try_mul(sell_under)? > buy_over.try_add(buy_at)? {
            Ok(PriceDirection::Decreasing)
        } else {
            Ok(PriceDirection::Staying)
        }
    }
}

/// Which way the clearing price moves away from the pool price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceDirection {
    Increasing,
    Decreasing,
    Staying,
}
