use crate::error::{MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::tick_bitmap;
use crate::math::tick_math::{MAX_TICK, MIN_TICK};
use crate::FastMap;
use alloy_primitives::U256;

/// Per-tick accumulator state.
///
/// `liquidity_gross` counts every position referencing the tick,
/// `liquidity_net` is the amount added when the price crosses the tick
/// moving up (and removed moving down). The fee-growth-outside values
/// are relative checkpoints, meaningful only in differences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
}

/// Tightest per-tick liquidity cap such that the sum over all usable
/// ticks of a pool with this spacing cannot overflow `u128`.
pub fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}

/// Sparse store of initialized ticks plus the word bitmap used to find
/// them. Only ticks referenced by at least one position occupy memory.
#[derive(Debug, Default)]
pub struct TickRegistry {
    ticks: FastMap<i32, Tick>,
    bitmap: FastMap<i16, U256>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tick state, zeroed if the tick is uninitialized.
    pub fn get(&self, tick: i32) -> Tick {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    pub fn is_initialized(&self, tick: i32) -> bool {
        self.ticks
            .get(&tick)
            .map(|t| t.liquidity_gross > 0)
            .unwrap_or(false)
    }

    /// Number of initialized ticks currently stored.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Applies a liquidity delta to a tick boundary and reports whether
    /// the tick flipped between initialized and uninitialized.
    ///
    /// First-time initialization at or below the current tick seeds the
    /// fee-growth-outside checkpoints with the current globals, so fee
    /// differences start at zero for new ranges.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool, PoolError> {
        let mut info = self.get(tick);

        let liquidity_gross_before = info.liquidity_gross;
        let liquidity_gross_after =
            add_delta(liquidity_gross_before, liquidity_delta).map_err(|e| match e {
                MathError::Underflow => PoolError::InsufficientLiquidity,
                other => PoolError::Math(other),
            })?;

        if liquidity_gross_after > max_liquidity {
            return Err(PoolError::LiquidityOverflow);
        }

        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        if liquidity_gross_before == 0 && tick <= tick_current {
            info.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
            info.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
        }

        info.liquidity_gross = liquidity_gross_after;
        info.liquidity_net = if upper {
            info.liquidity_net
                .checked_sub(liquidity_delta)
                .ok_or(MathError::Overflow)?
        } else {
            info.liquidity_net
                .checked_add(liquidity_delta)
                .ok_or(MathError::Overflow)?
        };

        self.ticks.insert(tick, info);
        Ok(flipped)
    }

    /// Drops an uninitialized tick's storage.
    pub fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    /// Transitions a tick as the price crosses it, flipping its
    /// fee-growth-outside checkpoints to the other side. Returns the
    /// liquidity_net to apply in the up-crossing direction.
    pub fn cross(
        &mut self,
        tick: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> i128 {
        let info = self.ticks.entry(tick).or_default();
        info.fee_growth_outside_0_x128 =
            fee_growth_global_0_x128.wrapping_sub(info.fee_growth_outside_0_x128);
        info.fee_growth_outside_1_x128 =
            fee_growth_global_1_x128.wrapping_sub(info.fee_growth_outside_1_x128);
        info.liquidity_net
    }

    /// Fee growth per unit of liquidity accrued strictly inside
    /// `[tick_lower, tick_upper]` since pool inception.
    ///
    /// Computed as global minus growth below the range minus growth
    /// above it. Each term wraps modulo 2^256; only differences taken
    /// at two points in time are meaningful.
    pub fn fee_growth_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        tick_current: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> (U256, U256) {
        let lower = self.get(tick_lower);
        let upper = self.get(tick_upper);

        let (below_0, below_1) = if tick_current >= tick_lower {
            (
                lower.fee_growth_outside_0_x128,
                lower.fee_growth_outside_1_x128,
            )
        } else {
            (
                fee_growth_global_0_x128.wrapping_sub(lower.fee_growth_outside_0_x128),
                fee_growth_global_1_x128.wrapping_sub(lower.fee_growth_outside_1_x128),
            )
        };

        let (above_0, above_1) = if tick_current < tick_upper {
            (
                upper.fee_growth_outside_0_x128,
                upper.fee_growth_outside_1_x128,
            )
        } else {
            (
                fee_growth_global_0_x128.wrapping_sub(upper.fee_growth_outside_0_x128),
                fee_growth_global_1_x128.wrapping_sub(upper.fee_growth_outside_1_x128),
            )
        };

        (
            fee_growth_global_0_x128
                .wrapping_sub(below_0)
                .wrapping_sub(above_0),
            fee_growth_global_1_x128
                .wrapping_sub(below_1)
                .wrapping_sub(above_1),
        )
    }

    /// Toggles the tick's bit in the word bitmap.
    pub fn flip_in_bitmap(&mut self, tick: i32, tick_spacing: i32) -> Result<(), PoolError> {
        tick_bitmap::flip_tick(&mut self.bitmap, tick, tick_spacing)
    }

    /// Bitmap search within the word containing `tick`. See
    /// [`tick_bitmap::next_initialized_tick_within_one_word`].
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: i32,
        lte: bool,
    ) -> Result<(i32, bool), PoolError> {
        tick_bitmap::next_initialized_tick_within_one_word(&self.bitmap, tick, tick_spacing, lte)
    }
}
