use crate::error::PoolError;
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{
    get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO,
    MIN_TICK,
};
use crate::pool::pool::Pool;
use crate::Q128;
use alloy_primitives::{I256, U256};
use tracing::{debug, trace};

/// Result of a swap or quote, from the pool's point of view: positive
/// amounts flow into the pool, negative amounts flow out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_0: I256,
    pub amount_1: I256,
    /// Price after the swap.
    pub sqrt_price_x96: U256,
    pub tick: i32,
    /// In-range liquidity after the swap.
    pub liquidity: u128,
}

/// Mutable scratch state threaded through the swap loop.
struct SwapState {
    amount_specified_remaining: I256,
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    /// Accumulator for the input token's fee growth.
    fee_growth_global_x128: U256,
    liquidity: u128,
}

/// Per-step scratch for one stretch between tick boundaries.
#[derive(Default)]
struct StepComputations {
    sqrt_price_start_x96: U256,
    tick_next: i32,
    initialized: bool,
    sqrt_price_next_x96: U256,
    amount_in: U256,
    amount_out: U256,
    fee_amount: U256,
}

/// An initialized tick the swap crossed, with the input-side fee growth
/// at the moment of crossing. Replayed against the tick registry when
/// the swap commits.
struct Crossing {
    tick: i32,
    fee_growth_global_x128: U256,
}

/// Everything a successful swap writes back, staged so that a failing
/// computation leaves the pool untouched.
struct SwapPlan {
    amount_0: I256,
    amount_1: I256,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    fee_growth_global_x128: U256,
    crossings: Vec<Crossing>,
}

impl Pool {
    /// Executes a swap against the pool.
    ///
    /// `amount_specified > 0` is an exact-input order of the input
    /// token, `< 0` an exact-output order of the output token.
    /// `sqrt_price_limit_x96` bounds how far the price may move; the
    /// swap fills as much as it can and stops there. A limit on the
    /// wrong side of the current price is `OutOfBounds`; a swap that
    /// cannot settle any amount at all is `PriceLimitReached`.
    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: U256,
    ) -> Result<SwapOutcome, PoolError> {
        let plan = self.compute_swap(zero_for_one, amount_specified, sqrt_price_limit_x96)?;

        for crossing in &plan.crossings {
            let (fee_growth_0, fee_growth_1) = if zero_for_one {
                (
                    crossing.fee_growth_global_x128,
                    self.fee_growth_global_1_x128,
                )
            } else {
                (
                    self.fee_growth_global_0_x128,
                    crossing.fee_growth_global_x128,
                )
            };
            self.ticks.cross(crossing.tick, fee_growth_0, fee_growth_1);
        }

        self.slot0.sqrt_price_x96 = plan.sqrt_price_x96;
        self.slot0.tick = plan.tick;
        self.liquidity = plan.liquidity;
        if zero_for_one {
            self.fee_growth_global_0_x128 = plan.fee_growth_global_x128;
        } else {
            self.fee_growth_global_1_x128 = plan.fee_growth_global_x128;
        }

        debug!(
            zero_for_one,
            amount_0 = %plan.amount_0,
            amount_1 = %plan.amount_1,
            tick = plan.tick,
            crossings = plan.crossings.len(),
            "swap"
        );

        Ok(SwapOutcome {
            amount_0: plan.amount_0,
            amount_1: plan.amount_1,
            sqrt_price_x96: plan.sqrt_price_x96,
            tick: plan.tick,
            liquidity: plan.liquidity,
        })
    }

    /// Simulates a swap without touching pool state. Same validation
    /// and results as [`swap`](Self::swap).
    pub fn quote(
        &self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: U256,
    ) -> Result<SwapOutcome, PoolError> {
        let plan = self.compute_swap(zero_for_one, amount_specified, sqrt_price_limit_x96)?;
        Ok(SwapOutcome {
            amount_0: plan.amount_0,
            amount_1: plan.amount_1,
            sqrt_price_x96: plan.sqrt_price_x96,
            tick: plan.tick,
            liquidity: plan.liquidity,
        })
    }

    /// Largest exact input the pool can absorb before the price reaches
    /// `sqrt_price_limit_x96`. Zero when no liquidity is in the way.
    pub fn max_input_amount(
        &self,
        zero_for_one: bool,
        sqrt_price_limit_x96: U256,
    ) -> Result<U256, PoolError> {
        match self.quote(zero_for_one, I256::MAX, sqrt_price_limit_x96) {
            Ok(outcome) => {
                let amount_in = if zero_for_one {
                    outcome.amount_0
                } else {
                    outcome.amount_1
                };
                Ok(amount_in.into_raw())
            }
            Err(PoolError::PriceLimitReached) => Ok(U256::ZERO),
            Err(e) => Err(e),
        }
    }

    fn compute_swap(
        &self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: U256,
    ) -> Result<SwapPlan, PoolError> {
        if amount_specified.is_zero() {
            return Err(PoolError::ZeroAmount);
        }

        if zero_for_one {
            if sqrt_price_limit_x96 >= self.slot0.sqrt_price_x96
                || sqrt_price_limit_x96 <= MIN_SQRT_RATIO
            {
                return Err(PoolError::OutOfBounds);
            }
        } else if sqrt_price_limit_x96 <= self.slot0.sqrt_price_x96
            || sqrt_price_limit_x96 >= MAX_SQRT_RATIO
        {
            return Err(PoolError::OutOfBounds);
        }

        let exact_input = amount_specified > I256::ZERO;

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: self.slot0.sqrt_price_x96,
            tick: self.slot0.tick,
            fee_growth_global_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
            liquidity: self.liquidity,
        };
        let mut crossings: Vec<Crossing> = Vec::new();

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..Default::default()
            };

            let (tick_next, initialized) = self.ticks.next_initialized_tick_within_one_word(
                state.tick,
                self.config.tick_spacing,
                zero_for_one,
            )?;
            step.tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);
            step.initialized = initialized;
            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            // Stop at the limit if it falls inside this stretch.
            let sqrt_price_target_x96 = if (zero_for_one
                && step.sqrt_price_next_x96 < sqrt_price_limit_x96)
                || (!zero_for_one && step.sqrt_price_next_x96 > sqrt_price_limit_x96)
            {
                sqrt_price_limit_x96
            } else {
                step.sqrt_price_next_x96
            };

            let (sqrt_price_next, amount_in, amount_out, fee_amount) = compute_swap_step(
                state.sqrt_price_x96,
                sqrt_price_target_x96,
                state.liquidity,
                state.amount_specified_remaining,
                self.config.fee,
            )?;
            state.sqrt_price_x96 = sqrt_price_next;
            step.amount_in = amount_in;
            step.amount_out = amount_out;
            step.fee_amount = fee_amount;

            if exact_input {
                state.amount_specified_remaining -=
                    I256::from_raw(step.amount_in + step.fee_amount);
                state.amount_calculated -= I256::from_raw(step.amount_out);
            } else {
                state.amount_specified_remaining += I256::from_raw(step.amount_out);
                state.amount_calculated += I256::from_raw(step.amount_in + step.fee_amount);
            }

            if state.liquidity > 0 {
                state.fee_growth_global_x128 = state.fee_growth_global_x128.wrapping_add(
                    mul_div(step.fee_amount, Q128, U256::from(state.liquidity))?,
                );
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    crossings.push(Crossing {
                        tick: step.tick_next,
                        fee_growth_global_x128: state.fee_growth_global_x128,
                    });

                    let mut liquidity_net = self.ticks.get(step.tick_next).liquidity_net;
                    // Crossing downward undoes what an upward crossing
                    // would apply.
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;

                    trace!(
                        tick = step.tick_next,
                        liquidity = state.liquidity,
                        "tick crossed"
                    );
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let (amount_0, amount_1) = if zero_for_one == exact_input {
            (
                amount_specified - state.amount_specified_remaining,
                state.amount_calculated,
            )
        } else {
            (
                state.amount_calculated,
                amount_specified - state.amount_specified_remaining,
            )
        };

        // Nothing settled at all: the order could make no progress
        // toward the limit.
        if amount_0.is_zero() && amount_1.is_zero() {
            return Err(PoolError::PriceLimitReached);
        }

        Ok(SwapPlan {
            amount_0,
            amount_1,
            sqrt_price_x96: state.sqrt_price_x96,
            tick: state.tick,
            liquidity: state.liquidity,
            fee_growth_global_x128: state.fee_growth_global_x128,
            crossings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    const L: u128 = 1_000_000_000_000_000;

    fn owner() -> Address {
        Address::with_last_byte(9)
    }

    fn pool_with_liquidity() -> Pool {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let mut pool = Pool::new(
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            3000,
            60,
            sqrt_price,
        )
        .unwrap();
        pool.mint(owner(), -6000, 6000, L).unwrap();
        pool
    }

    fn limit_down() -> U256 {
        MIN_SQRT_RATIO + U256::ONE
    }

    fn limit_up() -> U256 {
        MAX_SQRT_RATIO - U256::ONE
    }

    #[test]
    fn swap_rejects_zero_amount() {
        let mut pool = pool_with_liquidity();
        assert!(matches!(
            pool.swap(true, I256::ZERO, limit_down()),
            Err(PoolError::ZeroAmount)
        ));
    }

    #[test]
    fn swap_rejects_limit_on_wrong_side() {
        let mut pool = pool_with_liquidity();
        let price = pool.sqrt_price_x96();

        // Selling token0 moves the price down; a limit above is invalid.
        assert!(matches!(
            pool.swap(true, I256::from_raw(U256::from(1000u64)), price + U256::ONE),
            Err(PoolError::OutOfBounds)
        ));
        assert!(matches!(
            pool.swap(false, I256::from_raw(U256::from(1000u64)), price - U256::ONE),
            Err(PoolError::OutOfBounds)
        ));
        // Limits at or beyond the representable price range.
        assert!(matches!(
            pool.swap(true, I256::from_raw(U256::from(1000u64)), MIN_SQRT_RATIO),
            Err(PoolError::OutOfBounds)
        ));
        assert!(matches!(
            pool.swap(false, I256::from_raw(U256::from(1000u64)), MAX_SQRT_RATIO),
            Err(PoolError::OutOfBounds)
        ));
    }

    #[test]
    fn exact_input_zero_for_one_moves_price_down() {
        let mut pool = pool_with_liquidity();
        let price_before = pool.sqrt_price_x96();
        let tick_before = pool.tick();

        let amount_in = I256::from_raw(U256::from(1_000_000u64));
        let outcome = pool.swap(true, amount_in, limit_down()).unwrap();

        assert_eq!(outcome.amount_0, amount_in);
        assert!(outcome.amount_1 < I256::ZERO);
        assert!(outcome.sqrt_price_x96 < price_before);
        assert!(outcome.tick <= tick_before);
        assert_eq!(pool.sqrt_price_x96(), outcome.sqrt_price_x96);
        assert_eq!(pool.tick(), outcome.tick);
    }

    #[test]
    fn exact_input_one_for_zero_moves_price_up() {
        let mut pool = pool_with_liquidity();
        let price_before = pool.sqrt_price_x96();

        let amount_in = I256::from_raw(U256::from(1_000_000u64));
        let outcome = pool.swap(false, amount_in, limit_up()).unwrap();

        assert_eq!(outcome.amount_1, amount_in);
        assert!(outcome.amount_0 < I256::ZERO);
        assert!(outcome.sqrt_price_x96 > price_before);
    }

    #[test]
    fn exact_output_delivers_requested_amount() {
        let mut pool = pool_with_liquidity();
        let requested = U256::from(1_000_000u64);

        let outcome = pool
            .swap(true, -I256::from_raw(requested), limit_down())
            .unwrap();
        assert_eq!(outcome.amount_1, -I256::from_raw(requested));
        assert!(outcome.amount_0 > I256::ZERO);
        // Fees make the input strictly worse than the zero-fee price.
        assert!(outcome.amount_0 > -outcome.amount_1 * I256::from_raw(U256::from(997u64)) / I256::from_raw(U256::from(1000u64)));
    }

    #[test]
    fn swap_respects_price_limit_with_partial_fill() {
        let mut pool = pool_with_liquidity();
        // One tick-spacing below the current price.
        let limit = get_sqrt_ratio_at_tick(-60).unwrap();

        // Far more input than the stretch to the limit can absorb.
        let huge = I256::from_raw(U256::from(u128::MAX));
        let outcome = pool.swap(true, huge, limit).unwrap();

        assert_eq!(outcome.sqrt_price_x96, limit);
        assert!(outcome.amount_0 > I256::ZERO);
        assert!(outcome.amount_0 < huge);
        assert_eq!(pool.sqrt_price_x96(), limit);
    }

    #[test]
    fn swap_crosses_initialized_ticks_and_updates_liquidity() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let mut pool = Pool::new(
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            3000,
            60,
            sqrt_price,
        )
        .unwrap();

        let inner: u128 = 1_000_000_000_000;
        let outer: u128 = 3_000_000_000_000;
        pool.mint(owner(), -60, 60, inner).unwrap();
        pool.mint(owner(), -600, 600, outer).unwrap();
        assert_eq!(pool.liquidity(), inner + outer);

        // Push the price below -60, out of the inner range.
        let limit = get_sqrt_ratio_at_tick(-120).unwrap();
        let outcome = pool
            .swap(true, I256::from_raw(U256::from(u128::MAX)), limit)
            .unwrap();

        assert_eq!(outcome.sqrt_price_x96, limit);
        assert_eq!(pool.liquidity(), outer);
        assert!(pool.tick() < -60);

        // The crossed tick flipped its fee checkpoint.
        let crossed = pool.tick_info(-60);
        assert!(crossed.fee_growth_outside_0_x128 > U256::ZERO);
    }

    #[test]
    fn swap_on_empty_pool_cannot_settle() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let mut pool = Pool::new(
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            3000,
            60,
            sqrt_price,
        )
        .unwrap();

        let err = pool.swap(true, I256::from_raw(U256::from(1000u64)), limit_down());
        assert!(matches!(err, Err(PoolError::PriceLimitReached)));
    }

    #[test]
    fn quote_matches_swap_and_leaves_state_untouched() {
        let mut pool = pool_with_liquidity();
        let price_before = pool.sqrt_price_x96();
        let amount_in = I256::from_raw(U256::from(5_000_000u64));

        let quoted = pool.quote(true, amount_in, limit_down()).unwrap();
        assert_eq!(pool.sqrt_price_x96(), price_before);
        assert_eq!(pool.fee_growth_global_0_x128(), U256::ZERO);

        let executed = pool.swap(true, amount_in, limit_down()).unwrap();
        assert_eq!(quoted, executed);
    }

    #[test]
    fn fees_accrue_to_in_range_positions() {
        let mut pool = pool_with_liquidity();
        pool.swap(true, I256::from_raw(U256::from(10_000_000u64)), limit_down())
            .unwrap();
        assert!(pool.fee_growth_global_0_x128() > U256::ZERO);
        assert_eq!(pool.fee_growth_global_1_x128(), U256::ZERO);

        // Poke settles the accrued fees into the owed balance.
        pool.burn(owner(), -6000, 6000, 0).unwrap();
        let position = pool.position(owner(), -6000, 6000);
        assert!(position.tokens_owed_0 > 0);
        assert_eq!(position.tokens_owed_1, 0);

        let (collected_0, _) = pool
            .collect(owner(), -6000, 6000, u128::MAX, u128::MAX)
            .unwrap();
        assert_eq!(collected_0, position.tokens_owed_0);
    }

    #[test]
    fn fee_growth_is_monotonic_over_swaps() {
        let mut pool = pool_with_liquidity();
        let amount = I256::from_raw(U256::from(1_000_000u64));

        pool.swap(true, amount, limit_down()).unwrap();
        let first = pool.fee_growth_global_0_x128();
        pool.swap(true, amount, limit_down()).unwrap();
        let second = pool.fee_growth_global_0_x128();
        assert!(second > first);
    }

    #[test]
    fn round_trip_swap_costs_the_trader() {
        let mut pool = pool_with_liquidity();
        let amount_in = I256::from_raw(U256::from(10_000_000u64));

        let down = pool.swap(true, amount_in, limit_down()).unwrap();
        // Swap the received token1 back.
        let up = pool.swap(false, -down.amount_1, limit_up()).unwrap();

        // Fees and rounding guarantee a net loss in token0.
        assert!(-up.amount_0 < down.amount_0);
    }

    #[test]
    fn max_input_amount_matches_limited_swap() {
        let mut pool = pool_with_liquidity();
        let limit = get_sqrt_ratio_at_tick(-60).unwrap();

        let max_in = pool.max_input_amount(true, limit).unwrap();
        assert!(max_in > U256::ZERO);

        let outcome = pool.swap(true, I256::from_raw(max_in), limit).unwrap();
        assert_eq!(outcome.amount_0, I256::from_raw(max_in));
        assert_eq!(outcome.sqrt_price_x96, limit);
    }

    #[test]
    fn max_input_amount_is_zero_on_empty_pool() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let pool = Pool::new(
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            3000,
            60,
            sqrt_price,
        )
        .unwrap();
        assert_eq!(
            pool.max_input_amount(true, limit_down()).unwrap(),
            U256::ZERO
        );
    }
}
