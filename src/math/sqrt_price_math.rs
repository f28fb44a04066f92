use crate::error::{MathError, PoolError};
use crate::math::math_helpers::{div_rounding_up, mul_div, mul_div_rounding_up};
use crate::{Q96, RESOLUTION, U160_MAX};
use alloy_primitives::{I256, U256};

/// Computes the sqrt price after adding (`add = true`) or removing
/// `amount` of token0 from the virtual reserves.
///
/// Always rounds up: for exact input the price must not move past the
/// true target, for exact output the pool must receive at least enough.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, PoolError> {
    if amount.is_zero() {
        return Ok(sqrt_price_x96);
    }
    let numerator1: U256 = U256::from(liquidity) << (RESOLUTION as usize);

    if add {
        let product = amount.wrapping_mul(sqrt_price_x96);
        if product.wrapping_div(amount) == sqrt_price_x96 {
            let denominator = numerator1.wrapping_add(product);
            if denominator >= numerator1 {
                return Ok(mul_div_rounding_up(numerator1, sqrt_price_x96, denominator)?);
            }
        }
        // Product overflowed 256 bits; divide through by the price first.
        Ok(div_rounding_up(
            numerator1,
            numerator1
                .checked_div(sqrt_price_x96)
                .ok_or(MathError::DivisionByZero)?
                .checked_add(amount)
                .ok_or(MathError::Overflow)?,
        ))
    } else {
        let product = amount.wrapping_mul(sqrt_price_x96);
        // Removing token0 pushes the price up; the virtual reserves must
        // cover the withdrawal.
        if product.wrapping_div(amount) != sqrt_price_x96 || numerator1 <= product {
            return Err(PoolError::InsufficientLiquidity);
        }
        let denominator = numerator1 - product;
        Ok(mul_div_rounding_up(numerator1, sqrt_price_x96, denominator)?)
    }
}

/// Computes the sqrt price after adding (`add = true`) or removing
/// `amount` of token1 from the virtual reserves.
///
/// Always rounds down, the counterpart of the token0 variant's round-up.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, PoolError> {
    let liquidity_u256 = U256::from(liquidity);

    if add {
        let quotient = if amount <= U160_MAX {
            (amount << (RESOLUTION as usize)).wrapping_div(liquidity_u256)
        } else {
            mul_div(amount, Q96, liquidity_u256)?
        };

        let next = sqrt_price_x96
            .checked_add(quotient)
            .ok_or(MathError::Overflow)?;
        if next > U160_MAX {
            return Err(MathError::Overflow.into());
        }
        Ok(next)
    } else {
        let quotient = if amount <= U160_MAX {
            div_rounding_up(amount << (RESOLUTION as usize), liquidity_u256)
        } else {
            mul_div_rounding_up(amount, Q96, liquidity_u256)?
        };

        if sqrt_price_x96 <= quotient {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(sqrt_price_x96 - quotient)
    }
}

/// Sqrt price after an exact input of `amount_in`, fee already deducted.
///
/// A zero-for-one swap consumes token0 and moves the price down;
/// one-for-zero consumes token1 and moves it up. The result never
/// overshoots the true price, so the pool can only round in its favor.
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, PoolError> {
    if sqrt_price_x96.is_zero() || liquidity == 0 {
        return Err(MathError::ZeroValue.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x96, liquidity, amount_in, true)
    }
}

/// Sqrt price after an exact output of `amount_out`.
///
/// Fails with `InsufficientLiquidity` when the requested output exceeds
/// the virtual reserves of the output token.
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, PoolError> {
    if sqrt_price_x96.is_zero() || liquidity == 0 {
        return Err(MathError::ZeroValue.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x96, liquidity, amount_out, false)
    }
}

/// Amount of token0 covering the range between two sqrt prices at the
/// given liquidity: `L * 2^96 * (sqrt_b - sqrt_a) / (sqrt_b * sqrt_a)`.
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, PoolError> {
    let (sqrt_lower, sqrt_upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    if sqrt_lower.is_zero() {
        return Err(MathError::ZeroValue.into());
    }

    let numerator1: U256 = U256::from(liquidity) << (RESOLUTION as usize);
    let numerator2 = sqrt_upper - sqrt_lower;

    if round_up {
        Ok(div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, sqrt_upper)?,
            sqrt_lower,
        ))
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_upper)?.wrapping_div(sqrt_lower))
    }
}

/// Amount of token1 covering the range between two sqrt prices at the
/// given liquidity: `L * (sqrt_b - sqrt_a) / 2^96`.
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, PoolError> {
    let (sqrt_lower, sqrt_upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };

    let numerator = sqrt_upper - sqrt_lower;
    if round_up {
        Ok(mul_div_rounding_up(U256::from(liquidity), numerator, Q96)?)
    } else {
        Ok(mul_div(U256::from(liquidity), numerator, Q96)?)
    }
}

/// Signed token0 delta for a liquidity change. Positive liquidity owes
/// tokens to the pool (rounded up), negative returns tokens to the
/// owner (rounded down).
pub fn get_amount_0_delta_signed(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, PoolError> {
    if liquidity < 0 {
        let amount = get_amount_0_delta(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?;
        Ok(-I256::from_raw(amount))
    } else {
        let amount = get_amount_0_delta(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity as u128, true)?;
        Ok(I256::from_raw(amount))
    }
}

/// Signed token1 delta for a liquidity change, with the same rounding
/// convention as [`get_amount_0_delta_signed`].
pub fn get_amount_1_delta_signed(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, PoolError> {
    if liquidity < 0 {
        let amount = get_amount_1_delta(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?;
        Ok(-I256::from_raw(amount))
    } else {
        let amount = get_amount_1_delta(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity as u128, true)?;
        Ok(I256::from_raw(amount))
    }
}
