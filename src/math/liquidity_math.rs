use crate::error::{MathError, PoolError};
use crate::math::math_helpers::mul_div;
use crate::Q96;
use alloy_primitives::U256;

/// Applies a signed liquidity delta to an unsigned liquidity amount.
///
/// `Underflow` when removing more than is present, `Overflow` when the
/// sum exceeds `u128::MAX`.
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        x.checked_sub(y.unsigned_abs())
            .ok_or(MathError::Underflow)
    } else {
        x.checked_add(y as u128).ok_or(MathError::Overflow)
    }
}

fn to_u128(x: U256) -> Result<u128, MathError> {
    if x > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(x.to::<u128>())
}

/// Largest liquidity fundable by `amount0` of token0 over the price
/// range: `L = amount0 * (sqrt_a * sqrt_b / 2^96) / (sqrt_b - sqrt_a)`.
pub fn get_liquidity_for_amount_0(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    amount_0: U256,
) -> Result<u128, PoolError> {
    let (sqrt_lower, sqrt_upper) = sort_ratios(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    let intermediate = mul_div(sqrt_lower, sqrt_upper, Q96)?;
    let liquidity = mul_div(amount_0, intermediate, sqrt_upper - sqrt_lower)?;
    Ok(to_u128(liquidity)?)
}

/// Largest liquidity fundable by `amount1` of token1 over the price
/// range: `L = amount1 * 2^96 / (sqrt_b - sqrt_a)`.
pub fn get_liquidity_for_amount_1(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    amount_1: U256,
) -> Result<u128, PoolError> {
    let (sqrt_lower, sqrt_upper) = sort_ratios(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    let liquidity = mul_div(amount_1, Q96, sqrt_upper - sqrt_lower)?;
    Ok(to_u128(liquidity)?)
}

/// Largest liquidity fundable by both token budgets at the current
/// price. Inside the range the binding constraint is whichever token
/// runs out first.
pub fn get_liquidity_for_amounts(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    amount_0: U256,
    amount_1: U256,
) -> Result<u128, PoolError> {
    let (sqrt_lower, sqrt_upper) = sort_ratios(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

    if sqrt_ratio_current_x96 <= sqrt_lower {
        get_liquidity_for_amount_0(sqrt_lower, sqrt_upper, amount_0)
    } else if sqrt_ratio_current_x96 < sqrt_upper {
        let liquidity_0 =
            get_liquidity_for_amount_0(sqrt_ratio_current_x96, sqrt_upper, amount_0)?;
        let liquidity_1 =
            get_liquidity_for_amount_1(sqrt_lower, sqrt_ratio_current_x96, amount_1)?;
        Ok(liquidity_0.min(liquidity_1))
    } else {
        get_liquidity_for_amount_1(sqrt_lower, sqrt_upper, amount_1)
    }
}

fn sort_ratios(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}
