use crate::error::PoolError;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta, get_amount_1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use crate::U256_E6;
use alloy_primitives::{I256, U256};

/// Computes one step of a swap: how far the price moves toward
/// `sqrt_ratio_target_x96` given the remaining order, and the amounts
/// and fee settled over that stretch.
///
/// `amount_remaining >= 0` is an exact-input order (fee taken from the
/// input), `< 0` an exact-output order. Returns
/// `(sqrt_ratio_next_x96, amount_in, amount_out, fee_amount)`.
///
/// `fee_pips` is in hundredths of a basis point, so 3000 = 0.30%.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<(U256, U256, U256, U256), PoolError> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = amount_remaining >= I256::ZERO;
    let fee = U256::from(fee_pips);

    let sqrt_ratio_next_x96: U256;
    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    if exact_in {
        let amount_remaining_abs = amount_remaining.into_raw();
        let amount_remaining_less_fee =
            mul_div(amount_remaining_abs, U256_E6 - fee, U256_E6)?;

        amount_in = if zero_for_one {
            get_amount_0_delta(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?
        } else {
            get_amount_1_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                true,
            )?
        };

        if amount_remaining_less_fee >= amount_in {
            sqrt_ratio_next_x96 = sqrt_ratio_target_x96;
        } else {
            sqrt_ratio_next_x96 = get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?;
        }
    } else {
        let amount_remaining_abs = (-amount_remaining).into_raw();

        amount_out = if zero_for_one {
            get_amount_1_delta(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?
        } else {
            get_amount_0_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                false,
            )?
        };

        if amount_remaining_abs >= amount_out {
            sqrt_ratio_next_x96 = sqrt_ratio_target_x96;
        } else {
            sqrt_ratio_next_x96 = get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_abs,
                zero_for_one,
            )?;
        }
    }

    let max = sqrt_ratio_target_x96 == sqrt_ratio_next_x96;

    if zero_for_one {
        if !(max && exact_in) {
            amount_in = get_amount_0_delta(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = get_amount_1_delta(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(max && exact_in) {
            amount_in = get_amount_1_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = get_amount_0_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                false,
            )?;
        }
    }

    // Exact output never sends back more than requested.
    if !exact_in && amount_out > (-amount_remaining).into_raw() {
        amount_out = (-amount_remaining).into_raw();
    }

    let fee_amount = if exact_in && sqrt_ratio_next_x96 != sqrt_ratio_target_x96 {
        // The target was not reached, so the whole remainder above the
        // settled input is the fee.
        amount_remaining.into_raw() - amount_in
    } else {
        mul_div_rounding_up(amount_in, fee, U256_E6 - fee)?
    };

    Ok((sqrt_ratio_next_x96, amount_in, amount_out, fee_amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    fn encode_1_1() -> U256 {
        crate::Q96
    }

    fn encode_101_100() -> U256 {
        // sqrt(1.01) * 2^96
        U256::from_str("79623317895830914510639640423").unwrap()
    }

    #[test]
    fn exact_input_capped_at_target_price() {
        let price = encode_1_1();
        let target = encode_101_100();
        let amount = I256::from_raw(U256::from(ONE_ETHER));

        let (next, amount_in, amount_out, fee) =
            compute_swap_step(price, target, 2 * ONE_ETHER, amount, 600).unwrap();

        assert_eq!(amount_in, U256::from_str("9975124224178055").unwrap());
        assert_eq!(fee, U256::from_str("5988667735148").unwrap());
        assert_eq!(amount_out, U256::from_str("9925619580021728").unwrap());
        assert!(amount_in + fee < amount.into_raw());
        assert_eq!(next, target);
    }

    #[test]
    fn exact_output_capped_at_target_price() {
        let price = encode_1_1();
        let target = encode_101_100();
        let amount = -I256::from_raw(U256::from(ONE_ETHER));

        let (next, amount_in, amount_out, fee) =
            compute_swap_step(price, target, 2 * ONE_ETHER, amount, 600).unwrap();

        assert_eq!(amount_in, U256::from_str("9975124224178055").unwrap());
        assert_eq!(fee, U256::from_str("5988667735148").unwrap());
        assert_eq!(amount_out, U256::from_str("9925619580021728").unwrap());
        assert!(amount_out < (-amount).into_raw());
        assert_eq!(next, target);
    }

    #[test]
    fn exact_input_fully_spent() {
        let price = encode_1_1();
        // Target well past where 1 token of input can reach.
        let target = U256::from_str("79623317895830914510639640423")
            .unwrap()
            .wrapping_mul(U256::from(1000u32))
            .wrapping_div(U256::from(100u32));
        let amount = I256::from_raw(U256::from(ONE_ETHER));

        let (next, amount_in, amount_out, fee) =
            compute_swap_step(price, target, 2 * ONE_ETHER, amount, 600).unwrap();

        assert_eq!(amount_in, U256::from_str("999400000000000000").unwrap());
        assert_eq!(fee, U256::from_str("600000000000000").unwrap());
        assert_eq!(amount_out, U256::from_str("666399946655997866").unwrap());
        // The full order is consumed when the target is out of reach.
        assert_eq!(amount_in + fee, amount.into_raw());
        assert!(next < target);
        assert_eq!(
            next,
            get_next_sqrt_price_from_input(
                price,
                2 * ONE_ETHER,
                U256::from_str("999400000000000000").unwrap(),
                false
            )
            .unwrap()
        );
    }

    #[test]
    fn exact_output_fully_received() {
        let price = encode_1_1();
        let target = U256::from_str("79623317895830914510639640423")
            .unwrap()
            .wrapping_mul(U256::from(10000u32))
            .wrapping_div(U256::from(100u32));
        let amount = -I256::from_raw(U256::from(ONE_ETHER));

        let (next, amount_in, amount_out, fee) =
            compute_swap_step(price, target, 2 * ONE_ETHER, amount, 600).unwrap();

        assert_eq!(amount_in, U256::from_str("2000000000000000000").unwrap());
        assert_eq!(fee, U256::from_str("1200720432259356").unwrap());
        assert_eq!(amount_out, (-amount).into_raw());
        assert!(next < target);
    }

    #[test]
    fn exact_output_never_exceeds_request() {
        // Entire output of the range capped to the one unit asked for.
        let price = U256::from_str("2413").unwrap();
        let target = U256::from_str("79887613182836312").unwrap();
        let liquidity = 1985041575832132834610021537970u128;

        let (next, amount_in, amount_out, fee) = compute_swap_step(
            price,
            target,
            liquidity,
            -I256::from_raw(U256::ONE),
            1,
        )
        .unwrap();

        assert_eq!(amount_out, U256::ONE);
        assert!(amount_in > U256::ZERO);
        assert!(fee > U256::ZERO);
        assert!(next > price);
        assert!(next < target);
    }

    #[test]
    fn zero_input_moves_nothing() {
        let price = encode_1_1();
        let (next, amount_in, amount_out, fee) =
            compute_swap_step(price, encode_101_100(), ONE_ETHER, I256::ZERO, 3000).unwrap();
        assert_eq!(next, price);
        assert_eq!(amount_in, U256::ZERO);
        assert_eq!(amount_out, U256::ZERO);
        assert_eq!(fee, U256::ZERO);
    }

    #[test]
    fn fee_is_taken_from_input_side() {
        let price = encode_1_1();
        let target = encode_101_100();
        let amount = I256::from_raw(U256::from(ONE_ETHER));

        // Zero fee: whole input converts.
        let (_, in_no_fee, out_no_fee, fee0) =
            compute_swap_step(price, target, 2 * ONE_ETHER, amount, 0).unwrap();
        assert_eq!(fee0, U256::ZERO);

        let (_, in_fee, out_fee, fee1) =
            compute_swap_step(price, target, 2 * ONE_ETHER, amount, 3000).unwrap();
        assert!(fee1 > U256::ZERO);
        assert!(in_fee <= in_no_fee);
        assert!(out_fee <= out_no_fee);
    }
}
