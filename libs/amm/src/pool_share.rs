//! Pool share math for deposits and withdrawals
//!
//! Shares are minted at the pool's current reserve ratio and always rounded in the
//! pool's favour: the depositor gets the truncated share amount and only the coins
//! that share amount actually pays for are accepted, the rest goes back. Withdrawals
//! pay the truncated pro-rata reserve, minus the withdraw fee which stays in the pool.

use rust_decimal::Decimal;
use types::{amount_to_dec, check_overflow_amount, DecimalMath, LiquidityError, Result};

/// Split of a two-coin deposit into minted shares, accepted and refunded coins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositAllocation {
    pub mint_amount: u128,
    pub accepted: [u128; 2],
    pub refunded: [u128; 2],
}

/// Reserve coins paid out for burned shares, and the fee kept back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawAllocation {
    pub withdrawn: [u128; 2],
    pub fees: [u128; 2],
}

/// Stateless share calculations
pub struct PoolShareMath;

impl PoolShareMath {
    /// Shares for `deposits` into a live pool with `reserves` and `supply` shares
    /// outstanding. Both arrays are in reserve-denom order.
    pub fn deposit(
        supply: u128,
        reserves: [u128; 2],
        deposits: [u128; 2],
    ) -> Result<DepositAllocation> {
        if supply == 0 || reserves.contains(&0) {
            return Err(LiquidityError::DepletedPool);
        }
        check_overflow_amount(supply, deposits[0])?;
        check_overflow_amount(supply, deposits[1])?;

        // supply·d / r per side, truncated; the scarcer side bounds the mint
        let mint_amount = (0..2)
            .map(|i| supply * deposits[i] / reserves[i])
            .min()
            .unwrap_or(0);
        let mint_rate = amount_to_dec(mint_amount)?.try_quo_truncate(amount_to_dec(supply)?)?;

        let mut accepted = [0u128; 2];
        let mut refunded = [0u128; 2];
        for i in 0..2 {
            accepted[i] = amount_to_dec(reserves[i])?
                .try_mul(mint_rate)?
                .truncate_amount()?;
            refunded[i] = deposits[i].checked_sub(accepted[i]).ok_or_else(|| {
                LiquidityError::invariant(format!(
                    "accepted {} exceeds deposit {}",
                    accepted[i], deposits[i]
                ))
            })?;
        }

        if mint_amount == 0 || accepted == [0, 0] {
            return Err(LiquidityError::NoAcceptedCoin);
        }
        Ok(DepositAllocation {
            mint_amount,
            accepted,
            refunded,
        })
    }

    /// Reserve coins released for burning `amount` of `supply` shares.
    ///
    /// Burning the whole supply empties the pool without a fee.
    pub fn withdraw(
        supply: u128,
        reserves: [u128; 2],
        amount: u128,
        withdraw_fee_rate: Decimal,
    ) -> Result<WithdrawAllocation> {
        if amount == 0 || amount > supply {
            return Err(LiquidityError::BadPoolCoinAmount);
        }
        if amount == supply {
            return Ok(WithdrawAllocation {
                withdrawn: reserves,
                fees: [0, 0],
            });
        }

        let proportion = Decimal::ONE.try_sub(withdraw_fee_rate)?;
        let mut withdrawn = [0u128; 2];
        let mut fees = [0u128; 2];
        for i in 0..2 {
            check_overflow_amount(reserves[i], amount)?;
            let share = reserves[i] * amount;
            let gross = share / supply;
            let net = amount_to_dec(share)?
                .try_mul_truncate(proportion)?
                .truncate_amount()?
                / supply;
            withdrawn[i] = net;
            fees[i] = gross.saturating_sub(net);
        }

        if withdrawn.contains(&0) {
            return Err(LiquidityError::BadPoolCoinAmount);
        }
        Ok(WithdrawAllocation { withdrawn, fees })
    }

    /// Reserve ratio `a / b`, zero for an empty second reserve
    pub fn reserve_ratio(reserve_a: u128, reserve_b: u128) -> Result<Decimal> {
        if reserve_b == 0 {
            return Ok(Decimal::ZERO);
        }
        amount_to_dec(reserve_a)?.try_quo(amount_to_dec(reserve_b)?)
    }
}
