//! Fixed-point arithmetic for prices, ratios and coin amounts
//!
//! Coin amounts are `u128` integers. Prices and rates are [`Decimal`] values held to
//! [`DECIMAL_PRECISION`] fractional digits, the precision of the ledger's own decimal
//! type. Every multiply/divide goes through [`DecimalMath`] so that overflow turns
//! into [`LiquidityError::OverflowAmount`] instead of a panic.
//!
//! ## Rounding
//!
//! - `try_mul` / `try_quo` round half-to-even at 18 places (banker's rounding).
//! - `try_mul_truncate` / `try_quo_truncate` chop toward zero. Anything that decides
//!   how much the ledger pays out uses the truncating forms.

use crate::common::errors::{LiquidityError, Result};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits carried by every decimal result
pub const DECIMAL_PRECISION: u32 = 18;

/// Convert an integer coin amount into a decimal
pub fn amount_to_dec(amount: u128) -> Result<Decimal> {
    Decimal::from_u128(amount).ok_or(LiquidityError::OverflowAmount)
}

/// Checked decimal arithmetic with ledger rounding rules
pub trait DecimalMath: Sized {
    fn try_add(self, rhs: Decimal) -> Result<Decimal>;
    fn try_sub(self, rhs: Decimal) -> Result<Decimal>;
    /// Product rounded half-to-even at 18 places
    fn try_mul(self, rhs: Decimal) -> Result<Decimal>;
    /// Product truncated at 18 places
    fn try_mul_truncate(self, rhs: Decimal) -> Result<Decimal>;
    /// Quotient rounded half-to-even at 18 places
    fn try_quo(self, rhs: Decimal) -> Result<Decimal>;
    /// Quotient truncated at 18 places
    fn try_quo_truncate(self, rhs: Decimal) -> Result<Decimal>;
    /// Integer part as a coin amount; negative values are rejected
    fn truncate_amount(self) -> Result<u128>;
    /// Smallest integer amount not below the value
    fn ceil_amount(self) -> Result<u128>;
}

impl DecimalMath for Decimal {
    fn try_add(self, rhs: Decimal) -> Result<Decimal> {
        self.checked_add(rhs).ok_or(LiquidityError::OverflowAmount)
    }

    fn try_sub(self, rhs: Decimal) -> Result<Decimal> {
        self.checked_sub(rhs).ok_or(LiquidityError::OverflowAmount)
    }

    fn try_mul(self, rhs: Decimal) -> Result<Decimal> {
        self.checked_mul(rhs)
            .map(|v| v.round_dp(DECIMAL_PRECISION))
            .ok_or(LiquidityError::OverflowAmount)
    }

    fn try_mul_truncate(self, rhs: Decimal) -> Result<Decimal> {
        self.checked_mul(rhs)
            .map(|v| v.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::ToZero))
            .ok_or(LiquidityError::OverflowAmount)
    }

    fn try_quo(self, rhs: Decimal) -> Result<Decimal> {
        self.checked_div(rhs)
            .map(|v| v.round_dp(DECIMAL_PRECISION))
            .ok_or(LiquidityError::OverflowAmount)
    }

    fn try_quo_truncate(self, rhs: Decimal) -> Result<Decimal> {
        self.checked_div(rhs)
            .map(|v| v.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::ToZero))
            .ok_or(LiquidityError::OverflowAmount)
    }

    fn truncate_amount(self) -> Result<u128> {
        if self.is_sign_negative() && !self.is_zero() {
            return Err(LiquidityError::OverflowAmount);
        }
        self.trunc().to_u128().ok_or(LiquidityError::OverflowAmount)
    }

    fn ceil_amount(self) -> Result<u128> {
        if self.is_sign_negative() && !self.is_zero() {
            return Err(LiquidityError::OverflowAmount);
        }
        self.ceil().to_u128().ok_or(LiquidityError::OverflowAmount)
    }
}

/// Fails with `OverflowAmount` when `a * b` leaves the decimal domain
pub fn check_overflow(a: Decimal, b: Decimal) -> Result<()> {
    a.checked_mul(b)
        .map(|_| ())
        .ok_or(LiquidityError::OverflowAmount)
}

/// Fails with `OverflowAmount` when `a * b` leaves the integer domain
pub fn check_overflow_amount(a: u128, b: u128) -> Result<()> {
    a.checked_mul(b)
        .map(|_| ())
        .ok_or(LiquidityError::OverflowAmount)
}

/// Relative error `|actual - expected| / expected`, 1 when `expected` is zero
pub fn error_rate(expected: Decimal, actual: Decimal) -> Result<Decimal> {
    if expected.is_zero() {
        return Ok(Decimal::ONE);
    }
    Ok(actual.try_sub(expected)?.try_quo(expected)?.abs())
}
