use crate::error::MathError;
use crate::RESOLUTION;
use alloy_primitives::U256;

const U256_ONE: U256 = U256::ONE;
const U256_TWO: U256 = U256::from_limbs([2, 0, 0, 0]);
const U256_THREE: U256 = U256::from_limbs([3, 0, 0, 0]);

/// Computes `a * b / denominator` with full 512-bit intermediate
/// precision, rounding toward zero. Returns `Overflow` if the final
/// quotient does not fit in 256 bits and `DivisionByZero` for a zero
/// denominator.
///
/// The intermediate product is never truncated before the final
/// division; settlement math relies on this.
#[inline]
pub fn mul_div(a: U256, b: U256, mut denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    // 512-bit product as prod1 * 2^256 + prod0.
    let mm = a.mul_mod(b, U256::MAX);
    let mut prod0 = a.wrapping_mul(b);

    let (mut prod1, borrow) = mm.overflowing_sub(prod0);
    if borrow {
        prod1 = prod1.wrapping_sub(U256_ONE);
    }

    // Short circuit: the product fits in 256 bits.
    if prod1.is_zero() {
        return Ok(prod0.wrapping_div(denominator));
    }

    if denominator <= prod1 {
        return Err(MathError::Overflow);
    }

    // Subtract the remainder so [prod1 prod0] is an exact multiple of
    // the denominator.
    let remainder = a.mul_mod(b, denominator);
    let (prod0_adj, borrow) = prod0.overflowing_sub(remainder);
    prod0 = prod0_adj;
    if borrow {
        prod1 = prod1.wrapping_sub(U256_ONE);
    }

    // Factor powers of two out of the denominator.
    let twos = denominator & denominator.wrapping_neg();
    denominator = denominator.wrapping_div(twos);
    prod0 = prod0.wrapping_div(twos);

    // Shift the high bits of prod1 into prod0.
    let twos_complement = twos
        .wrapping_neg()
        .wrapping_div(twos)
        .wrapping_add(U256_ONE);
    prod0 |= prod1.wrapping_mul(twos_complement);

    // Modular inverse of the now-odd denominator via Newton iteration;
    // six rounds are enough for 2^256.
    let mut inv = U256_THREE.wrapping_mul(denominator) ^ U256_TWO;
    for _ in 0..6 {
        inv = inv.wrapping_mul(U256_TWO.wrapping_sub(denominator.wrapping_mul(inv)));
    }

    Ok(prod0.wrapping_mul(inv))
}

/// Like [`mul_div`], but rounds the quotient up when the division has a
/// non-zero remainder.
#[inline]
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    let mut result = mul_div(a, b, denominator)?;

    if a.mul_mod(b, denominator) > U256::ZERO {
        if result >= U256::MAX {
            return Err(MathError::Overflow);
        }
        result += U256::ONE;
    }
    Ok(result)
}

/// Divides `a` by `b`, rounding up on a non-zero remainder.
///
/// Panics on a zero divisor, mirroring primitive integer division;
/// callers must ensure `b != 0`.
#[inline]
pub fn div_rounding_up(a: U256, b: U256) -> U256 {
    let (quotient, remainder) = a.div_rem(b);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::ONE
    }
}

/// Converts a Q64.96 sqrt price to a floating decimal price.
///
/// Display only. Never use the result for settlement; it round-trips
/// through f64 and loses precision.
pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256) -> f64 {
    let mut value = 0f64;
    for (i, &limb) in sqrt_price_x96.as_limbs().iter().enumerate() {
        value += (limb as f64) * 2f64.powi(64 * i as i32);
    }
    let sqrt = value / 2f64.powi(RESOLUTION as i32);
    sqrt * sqrt
}

/// Converts a floating decimal price to an approximate Q64.96 sqrt
/// price.
///
/// Display and test-fixture use only; the engine's settlement paths
/// take exact Q64.96 values from [`tick_math`](crate::math::tick_math).
pub fn price_to_sqrt_price_x96(price: f64) -> U256 {
    debug_assert!(price > 0.0);
    let scaled = price.sqrt() * (1u128 << 64) as f64;
    U256::from(scaled as u128) << (RESOLUTION as usize - 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_simple_division() {
        let result = mul_div(U256::from(10u8), U256::from(20u8), U256::from(5u8)).unwrap();
        assert_eq!(result, U256::from(40u8));
    }

    #[test]
    fn mul_div_division_by_zero() {
        let result = mul_div(U256::from(10u8), U256::from(20u8), U256::ZERO);
        assert!(matches!(result, Err(MathError::DivisionByZero)));
    }

    #[test]
    fn mul_div_phantom_overflow() {
        // a * b overflows 256 bits but the quotient fits.
        let a = U256::MAX;
        let b = U256::MAX;
        let result = mul_div(a, b, U256::MAX).unwrap();
        assert_eq!(result, U256::MAX);
    }

    #[test]
    fn mul_div_result_overflow() {
        // (2^256 - 1) * 2 / 1 cannot fit in 256 bits.
        let result = mul_div(U256::MAX, U256::from(2u8), U256::ONE);
        assert!(matches!(result, Err(MathError::Overflow)));
    }

    #[test]
    fn mul_div_rounds_toward_zero() {
        // 7 * 10 / 8 = 8.75 -> 8
        let result = mul_div(U256::from(7u8), U256::from(10u8), U256::from(8u8)).unwrap();
        assert_eq!(result, U256::from(8u8));
    }

    #[test]
    fn mul_div_rounding_up_exact_division() {
        let result =
            mul_div_rounding_up(U256::from(20u8), U256::from(10u8), U256::from(5u8)).unwrap();
        assert_eq!(result, U256::from(40u8));
    }

    #[test]
    fn mul_div_rounding_up_non_exact() {
        // 7 * 10 / 3 = 23.33... -> 24
        let result =
            mul_div_rounding_up(U256::from(7u8), U256::from(10u8), U256::from(3u8)).unwrap();
        assert_eq!(result, U256::from(24u8));
    }

    #[test]
    fn mul_div_rounding_up_is_exactly_one_above_floor_on_remainder() {
        let down = mul_div(U256::from(7u8), U256::from(11u8), U256::from(13u8)).unwrap();
        let up = mul_div_rounding_up(U256::from(7u8), U256::from(11u8), U256::from(13u8)).unwrap();
        assert_eq!(up, down + U256::ONE);
    }

    #[test]
    fn mul_div_rounding_up_propagates_overflow() {
        let result = mul_div_rounding_up(U256::MAX, U256::from(2u8), U256::ONE);
        assert!(matches!(result, Err(MathError::Overflow)));
    }

    #[test]
    fn div_rounding_up_exact_and_non_exact() {
        assert_eq!(
            div_rounding_up(U256::from(10u8), U256::from(5u8)),
            U256::from(2u8)
        );
        assert_eq!(
            div_rounding_up(U256::from(10u8), U256::from(3u8)),
            U256::from(4u8)
        );
    }

    #[test]
    #[should_panic]
    fn div_rounding_up_zero_divisor_panics() {
        let _ = div_rounding_up(U256::from(10u8), U256::ZERO);
    }

    #[test]
    fn display_price_conversions_roundtrip_loosely() {
        let sqrt_price = price_to_sqrt_price_x96(5000.0);
        let price = sqrt_price_x96_to_price(sqrt_price);
        assert!((price - 5000.0).abs() < 0.01);
    }

    #[test]
    fn display_sqrt_price_close_to_golden_fixture() {
        use std::str::FromStr;
        // sqrt(5000) * 2^96 in Q64.96.
        let sqrt_price = price_to_sqrt_price_x96(5000.0);
        let fixture = U256::from_str("5602277097478614198912276234240").unwrap();
        let diff = sqrt_price.abs_diff(fixture);
        // f64 keeps roughly the first 15 significant digits.
        assert!(diff < fixture / U256::from(1_000_000_000_000u64));
    }
}
