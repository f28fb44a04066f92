use crate::error::{MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::sqrt_price_math::{get_amount_0_delta_signed, get_amount_1_delta_signed};
use crate::math::tick_math::{
    check_ticks, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, tick_spacing_for_fee,
    MAX_SQRT_RATIO, MIN_SQRT_RATIO,
};
use crate::pool::position::{Position, PositionKey, PositionLedger};
use crate::pool::tick::{max_liquidity_per_tick, Tick, TickRegistry};
use alloy_primitives::{Address, I256, U256};
use tracing::debug;

/// Immutable pool parameters fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub token_0: Address,
    pub token_1: Address,
    /// Swap fee in hundredths of a basis point (3000 = 0.30%).
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
}

/// The pool's current price point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    /// Largest tick whose sqrt ratio is at most `sqrt_price_x96`.
    pub tick: i32,
}

/// In-memory concentrated-liquidity pool.
///
/// Every mutating operation either fully commits or returns an error
/// with the pool untouched.
#[derive(Debug)]
pub struct Pool {
    pub(super) config: PoolConfig,
    pub(super) slot0: Slot0,
    /// Liquidity in range at the current tick.
    pub(super) liquidity: u128,
    pub(super) fee_growth_global_0_x128: U256,
    pub(super) fee_growth_global_1_x128: U256,
    pub(super) ticks: TickRegistry,
    pub(super) positions: PositionLedger,
}

impl Pool {
    /// Creates a pool at an initial sqrt price.
    ///
    /// `fee` must be one of the supported tiers and `tick_spacing` the
    /// spacing assigned to that tier. Tokens must be distinct and in
    /// canonical (ascending) order.
    pub fn new(
        token_0: Address,
        token_1: Address,
        fee: u32,
        tick_spacing: i32,
        sqrt_price_x96: U256,
    ) -> Result<Self, PoolError> {
        if token_0 >= token_1 {
            return Err(PoolError::OutOfBounds);
        }
        match tick_spacing_for_fee(fee) {
            Some(expected) if expected == tick_spacing => {}
            _ => return Err(PoolError::InvalidTick),
        }
        if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
            return Err(PoolError::OutOfBounds);
        }

        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;

        Ok(Self {
            config: PoolConfig {
                token_0,
                token_1,
                fee,
                tick_spacing,
                max_liquidity_per_tick: max_liquidity_per_tick(tick_spacing),
            },
            slot0: Slot0 {
                sqrt_price_x96,
                tick,
            },
            liquidity: 0,
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            ticks: TickRegistry::new(),
            positions: PositionLedger::new(),
        })
    }

    /// Convenience constructor that derives the spacing from the fee
    /// tier.
    pub fn with_fee_tier(
        token_0: Address,
        token_1: Address,
        fee: u32,
        sqrt_price_x96: U256,
    ) -> Result<Self, PoolError> {
        let tick_spacing = tick_spacing_for_fee(fee).ok_or(PoolError::InvalidTick)?;
        Self::new(token_0, token_1, fee, tick_spacing, sqrt_price_x96)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn token_0(&self) -> Address {
        self.config.token_0
    }

    pub fn token_1(&self) -> Address {
        self.config.token_1
    }

    pub fn fee(&self) -> u32 {
        self.config.fee
    }

    pub fn tick_spacing(&self) -> i32 {
        self.config.tick_spacing
    }

    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    pub fn sqrt_price_x96(&self) -> U256 {
        self.slot0.sqrt_price_x96
    }

    pub fn tick(&self) -> i32 {
        self.slot0.tick
    }

    /// Liquidity active at the current price.
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn fee_growth_global_0_x128(&self) -> U256 {
        self.fee_growth_global_0_x128
    }

    pub fn fee_growth_global_1_x128(&self) -> U256 {
        self.fee_growth_global_1_x128
    }

    /// Snapshot of a tick's state, zeroed if uninitialized.
    pub fn tick_info(&self, tick: i32) -> Tick {
        self.ticks.get(tick)
    }

    /// Snapshot of a position, zeroed if it does not exist.
    pub fn position(&self, owner: Address, tick_lower: i32, tick_upper: i32) -> Position {
        self.positions
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
    }

    /// Adds liquidity to a range and returns the token amounts owed to
    /// the pool, rounded up.
    pub fn mint(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(u128, u128), PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if amount > i128::MAX as u128 {
            return Err(PoolError::LiquidityOverflow);
        }

        let (amount_0, amount_1) =
            self.modify_position(owner, tick_lower, tick_upper, amount as i128)?;

        debug!(
            tick_lower,
            tick_upper,
            liquidity = amount,
            amount_0 = %amount_0,
            amount_1 = %amount_1,
            "mint"
        );
        Ok((
            amount_0.into_raw().to::<u128>(),
            amount_1.into_raw().to::<u128>(),
        ))
    }

    /// Removes liquidity from a range. The freed token amounts, rounded
    /// down, are credited to the position's owed balances for later
    /// [`collect`](Self::collect) and also returned.
    ///
    /// A zero amount is a poke: it settles accrued fees into the owed
    /// balances without changing liquidity.
    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(u128, u128), PoolError> {
        if amount > i128::MAX as u128 {
            return Err(PoolError::LiquidityOverflow);
        }

        let (amount_0, amount_1) =
            self.modify_position(owner, tick_lower, tick_upper, -(amount as i128))?;

        let amount_0 = (-amount_0).into_raw().to::<u128>();
        let amount_1 = (-amount_1).into_raw().to::<u128>();

        if amount_0 > 0 || amount_1 > 0 {
            let position = self
                .positions
                .entry(PositionKey::new(owner, tick_lower, tick_upper));
            position.tokens_owed_0 = position.tokens_owed_0.saturating_add(amount_0);
            position.tokens_owed_1 = position.tokens_owed_1.saturating_add(amount_1);
        }

        debug!(
            tick_lower,
            tick_upper,
            liquidity = amount,
            amount_0,
            amount_1,
            "burn"
        );
        Ok((amount_0, amount_1))
    }

    /// Pays out owed balances, capped at what the position has accrued.
    /// Returns the amounts actually transferred out.
    pub fn collect(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: u128,
        amount_1_requested: u128,
    ) -> Result<(u128, u128), PoolError> {
        check_ticks(tick_lower, tick_upper, self.config.tick_spacing)?;

        let position = self
            .positions
            .entry(PositionKey::new(owner, tick_lower, tick_upper));
        let (amount_0, amount_1) = position.collect(amount_0_requested, amount_1_requested);

        debug!(tick_lower, tick_upper, amount_0, amount_1, "collect");
        Ok((amount_0, amount_1))
    }

    /// Applies a signed liquidity change to `owner`'s position over
    /// `[tick_lower, tick_upper]` and returns the signed token deltas
    /// from the pool's point of view (positive owed to the pool).
    ///
    /// Validates everything up front so that the state mutations below
    /// cannot fail half-applied.
    fn modify_position(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(I256, I256), PoolError> {
        check_ticks(tick_lower, tick_upper, self.config.tick_spacing)?;

        let key = PositionKey::new(owner, tick_lower, tick_upper);
        let position_before = self.positions.get(&key);

        if liquidity_delta > 0 {
            let delta = liquidity_delta as u128;
            for tick in [tick_lower, tick_upper] {
                let gross = self.ticks.get(tick).liquidity_gross;
                if gross
                    .checked_add(delta)
                    .map(|after| after > self.config.max_liquidity_per_tick)
                    .unwrap_or(true)
                {
                    return Err(PoolError::LiquidityOverflow);
                }
            }
        } else if liquidity_delta < 0 {
            if position_before.liquidity < liquidity_delta.unsigned_abs() {
                return Err(PoolError::InsufficientLiquidity);
            }
        } else if position_before.liquidity == 0 {
            return Err(PoolError::InsufficientLiquidity);
        }

        // Token amounts depend only on the current price and the delta;
        // compute them before mutating anything.
        let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

        let (amount_0, amount_1, in_range) = if self.slot0.tick < tick_lower {
            // Entirely above the current price: only token0.
            (
                get_amount_0_delta_signed(sqrt_lower, sqrt_upper, liquidity_delta)?,
                I256::ZERO,
                false,
            )
        } else if self.slot0.tick < tick_upper {
            (
                get_amount_0_delta_signed(
                    self.slot0.sqrt_price_x96,
                    sqrt_upper,
                    liquidity_delta,
                )?,
                get_amount_1_delta_signed(
                    sqrt_lower,
                    self.slot0.sqrt_price_x96,
                    liquidity_delta,
                )?,
                true,
            )
        } else {
            // Entirely below the current price: only token1.
            (
                I256::ZERO,
                get_amount_1_delta_signed(sqrt_lower, sqrt_upper, liquidity_delta)?,
                false,
            )
        };

        // Callers narrow the amounts to u128; reject anything wider
        // before touching state.
        let bound = U256::from(u128::MAX);
        if amount_0.unsigned_abs() > bound || amount_1.unsigned_abs() > bound {
            return Err(MathError::Overflow.into());
        }

        let liquidity_after = if in_range {
            Some(add_delta(self.liquidity, liquidity_delta)?)
        } else {
            None
        };

        // Commit point. Nothing below returns an error path that can
        // leave partial state.
        let flipped_lower = self.ticks.update(
            tick_lower,
            self.slot0.tick,
            liquidity_delta,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
            false,
            self.config.max_liquidity_per_tick,
        )?;
        let flipped_upper = self.ticks.update(
            tick_upper,
            self.slot0.tick,
            liquidity_delta,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
            true,
            self.config.max_liquidity_per_tick,
        )?;

        if flipped_lower {
            self.ticks
                .flip_in_bitmap(tick_lower, self.config.tick_spacing)?;
        }
        if flipped_upper {
            self.ticks
                .flip_in_bitmap(tick_upper, self.config.tick_spacing)?;
        }

        let (fee_growth_inside_0, fee_growth_inside_1) = self.ticks.fee_growth_inside(
            tick_lower,
            tick_upper,
            self.slot0.tick,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        );

        self.positions.entry(key).update(
            liquidity_delta,
            fee_growth_inside_0,
            fee_growth_inside_1,
        )?;

        if liquidity_delta < 0 {
            if flipped_lower {
                self.ticks.clear(tick_lower);
            }
            if flipped_upper {
                self.ticks.clear(tick_upper);
            }
        }

        if let Some(liquidity) = liquidity_after {
            self.liquidity = liquidity;
        }

        Ok((amount_0, amount_1))
    }
}
