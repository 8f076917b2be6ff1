//! Uniform clearing-price search
//!
//! Given the pool reserves `(x, y)` and an [`OrderBook`], find the single swap price
//! at which the batch settles. The pool acts as a market maker on the side the book
//! pushes the price: it supplies Y while the price rises and X while it falls, up to
//! the point where its own marginal price meets the clearing price.
//!
//! ## Search
//!
//! ```text
//!   direction = book.price_direction(x / y)
//!   Staying     → clear at x / y against whatever crosses there
//!   Increasing  → walk levels ascending from x / y
//!   Decreasing  → walk levels descending from x / y
//!                 for each level: calculate_swap(level, previous level)
//!                 keep the scenario unless the pool leg overshoots by ≥ 1 unit
//!   pick        → first exact match that transacts, else the largest transact amount
//!                 among scenarios that fill every strictly-better order
//! ```
//!
//! Between two adjacent levels the clearing price is solved in closed form,
//! `P = (X + 2·EX) / (Y + 2·EY)`. When that price falls outside the interval the batch
//! clears fractionally at the level's own limit price.

use crate::order_book::{OrderBook, PriceDirection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{amount_to_dec, DecimalMath, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Every executable order is filled in full
    ExactMatch,
    /// Nothing crosses
    NoMatch,
    /// The marginal level is filled pro rata
    FractionalMatch,
}

/// Outcome of the clearing search for one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub match_type: MatchType,
    pub price_direction: PriceDirection,
    pub swap_price: Decimal,
    /// X that will change hands on the buy side
    pub ex: Decimal,
    /// Y that will change hands on the sell side
    pub ey: Decimal,
    pub original_ex: u128,
    pub original_ey: u128,
    /// X the pool contributes while the price falls
    pub pool_x: Decimal,
    /// Y the pool contributes while the price rises
    pub pool_y: Decimal,
    pub transact_amt: Decimal,
}

impl BatchResult {
    fn new(price_direction: PriceDirection, match_type: MatchType) -> Self {
        Self {
            match_type,
            price_direction,
            swap_price: Decimal::ZERO,
            ex: Decimal::ZERO,
            ey: Decimal::ZERO,
            original_ex: 0,
            original_ey: 0,
            pool_x: Decimal::ZERO,
            pool_y: Decimal::ZERO,
            transact_amt: Decimal::ZERO,
        }
    }

    fn set_executable(&mut self, (ex, ey): (u128, u128)) -> Result<()> {
        self.original_ex = ex;
        self.original_ey = ey;
        self.ex = amount_to_dec(ex)?;
        self.ey = amount_to_dec(ey)?;
        Ok(())
    }

    /// Whether any order can be filled at all
    pub fn is_match(&self) -> bool {
        self.match_type != MatchType::NoMatch
    }
}

/// (P·Y − X) / 2P: Y the pool sells to bring its price up to `price`
fn pool_y_at(price: Decimal, x: Decimal, y: Decimal) -> Result<Decimal> {
    price
        .try_mul(y)?
        .try_sub(x)?
        .try_quo(price.try_mul(dec!(2))?)
}

/// (X − P·Y) / 2: X the pool sells to bring its price down to `price`
fn pool_x_at(price: Decimal, x: Decimal, y: Decimal) -> Result<Decimal> {
    x.try_sub(price.try_mul(y)?)?.try_quo(dec!(2))
}

impl OrderBook {
    /// Clear the book against a pool holding `x` of X and `y` of Y.
    ///
    /// `None` means no candidate price satisfied the fill constraints; the batch
    /// settles nothing and every order is refunded.
    pub fn match_orders(&self, x: Decimal, y: Decimal) -> Result<Option<BatchResult>> {
        let current_price = x.try_quo(y)?;
        let direction = self.price_direction(current_price)?;
        debug!(%current_price, ?direction, levels = self.len(), "clearing batch");
        match direction {
            PriceDirection::Staying => Ok(Some(self.calculate_match_stay(current_price)?)),
            _ => self.calculate_match(direction, x, y),
        }
    }

    /// Clear at the pool price when the book is balanced there
    pub fn calculate_match_stay(&self, current_price: Decimal) -> Result<BatchResult> {
        let mut r = BatchResult::new(PriceDirection::Staying, MatchType::NoMatch);
        r.swap_price = current_price;
        r.set_executable(self.executable_amt(current_price)?)?;

        let s = current_price.try_mul(r.ey)?;
        if r.ex.is_zero() || r.ey.is_zero() {
            r.match_type = MatchType::NoMatch;
        } else if r.ex == s {
            r.match_type = MatchType::ExactMatch;
        } else {
            r.match_type = MatchType::FractionalMatch;
            if r.ex > s {
                r.ex = s;
            } else {
                r.ey = r.ex.try_quo(current_price)?;
            }
        }
        Ok(r)
    }

    /// Walk the levels on the side the price moves and pick the best scenario
    pub fn calculate_match(
        &self,
        direction: PriceDirection,
        x: Decimal,
        y: Decimal,
    ) -> Result<Option<BatchResult>> {
        let current_price = x.try_quo(y)?;
        let candidates: Vec<Decimal> = match direction {
            PriceDirection::Increasing => self
                .orders()
                .iter()
                .map(|o| o.price)
                .filter(|p| *p >= current_price)
                .collect(),
            PriceDirection::Decreasing => self
                .orders()
                .iter()
                .rev()
                .map(|o| o.price)
                .filter(|p| *p <= current_price)
                .collect(),
            PriceDirection::Staying => return Ok(Some(self.calculate_match_stay(current_price)?)),
        };

        let mut last_order_price = current_price;
        let mut scenarios = Vec::with_capacity(candidates.len());
        for order_price in candidates {
            let r = self.calculate_swap(direction, x, y, order_price, last_order_price)?;
            let overshoots = match direction {
                PriceDirection::Increasing => {
                    r.pool_y.try_sub(r.ex.try_quo(r.swap_price)?)? >= Decimal::ONE
                }
                _ => r.pool_x.try_sub(r.ey.try_mul(r.swap_price)?)? >= Decimal::ONE,
            };
            if overshoots {
                continue;
            }
            scenarios.push(r);
            last_order_price = order_price;
        }

        let mut best: Option<BatchResult> = None;
        for s in scenarios {
            let (must_x, must_y) = self.must_executable_amt(s.swap_price)?;
            if s.ex < amount_to_dec(must_x)? || s.ey < amount_to_dec(must_y)? {
                continue;
            }
            if s.match_type == MatchType::ExactMatch && s.transact_amt > Decimal::ZERO {
                best = Some(s);
                break;
            }
            let best_amt = best.as_ref().map_or(Decimal::ZERO, |b| b.transact_amt);
            if s.transact_amt > best_amt {
                best = Some(s);
            }
        }
        Ok(best)
    }

    /// Scenario for clearing between `last_order_price` and `order_price`
    pub fn calculate_swap(
        &self,
        direction: PriceDirection,
        x: Decimal,
        y: Decimal,
        order_price: Decimal,
        last_order_price: Decimal,
    ) -> Result<BatchResult> {
        let two = dec!(2);
        let mut r = BatchResult::new(direction, MatchType::NoMatch);
        let midpoint = last_order_price.try_add(order_price)?.try_quo(two)?;
        r.set_executable(self.executable_amt(midpoint)?)?;

        // P_s = (X + 2EX) / (Y + 2EY)
        r.swap_price = x
            .try_add(r.ex.try_mul(two)?)?
            .try_quo(y.try_add(r.ey.try_mul(two)?)?)?;

        let mut in_interval = false;
        match direction {
            PriceDirection::Increasing => {
                r.pool_y = pool_y_at(r.swap_price, x, y)?;
                in_interval = last_order_price < r.swap_price
                    && r.swap_price < order_price
                    && r.pool_y >= Decimal::ZERO;
            }
            PriceDirection::Decreasing => {
                r.pool_x = pool_x_at(r.swap_price, x, y)?;
                in_interval = order_price < r.swap_price
                    && r.swap_price < last_order_price
                    && r.pool_x >= Decimal::ZERO;
            }
            PriceDirection::Staying => {}
        }

        if in_interval {
            r.match_type = if r.ex.is_zero() && r.ey.is_zero() {
                MatchType::NoMatch
            } else {
                MatchType::ExactMatch
            };
        } else {
            // Clear at the level itself; ceil the executable legs so the pool side
            // absorbs the rounding
            r.set_executable(self.executable_amt(order_price)?)?;
            r.swap_price = order_price;
            match direction {
                PriceDirection::Increasing => {
                    r.pool_y = pool_y_at(r.swap_price, x, y)?;
                    r.ex = r.ex.min(r.ey.try_add(r.pool_y)?.try_mul(r.swap_price)?).ceil();
                    r.ey = r
                        .ey
                        .min(r.ex.try_quo(r.swap_price)?.try_sub(r.pool_y)?)
                        .max(Decimal::ZERO)
                        .ceil();
                }
                PriceDirection::Decreasing => {
                    r.pool_x = pool_x_at(r.swap_price, x, y)?;
                    r.ey = r.ey.min(r.ex.try_add(r.pool_x)?.try_quo(r.swap_price)?).ceil();
                    r.ex = r
                        .ex
                        .min(r.ey.try_mul(r.swap_price)?.try_sub(r.pool_x)?)
                        .max(Decimal::ZERO)
                        .ceil();
                }
                PriceDirection::Staying => {}
            }
            r.match_type = MatchType::FractionalMatch;
        }

        let current_price = x.try_quo(y)?;
        r.transact_amt = match direction {
            PriceDirection::Increasing => {
                if r.swap_price < current_price || r.pool_y < Decimal::ZERO {
                    Decimal::ZERO
                } else {
                    r.ex.min(r.ey.try_add(r.pool_y)?.try_mul(r.swap_price)?)
                }
            }
            PriceDirection::Decreasing => {
                if r.swap_price > current_price || r.pool_x < Decimal::ZERO {
                    Decimal::ZERO
                } else {
                    r.ey.min(r.ex.try_add(r.pool_x)?.try_quo(r.swap_price)?)
                }
            }
            PriceDirection::Staying => Decimal::ZERO,
        };
        Ok(r)
    }
}
