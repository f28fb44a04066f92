use crate::error::{MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use crate::{FastMap, Q128};
use alloy_primitives::{Address, U256};

/// Identity of a position: an owner plus its tick range. Re-minting
/// into the same range accrues onto the same position.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    pub fn new(owner: Address, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
        }
    }
}

/// Liquidity and fee state of one position.
///
/// `fee_growth_inside_*_last_x128` snapshot the in-range fee growth at
/// the last liquidity change or poke; fees earned since then are the
/// difference times the position's liquidity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

impl Position {
    /// Settles fees up to the given in-range growth and applies a
    /// liquidity delta.
    ///
    /// A zero delta is a poke and requires existing liquidity. Fee
    /// settlement happens before the delta so a full burn still credits
    /// everything earned.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), PoolError> {
        let liquidity_next = if liquidity_delta == 0 {
            if self.liquidity == 0 {
                return Err(PoolError::InsufficientLiquidity);
            }
            self.liquidity
        } else {
            add_delta(self.liquidity, liquidity_delta).map_err(|e| match e {
                MathError::Underflow => PoolError::InsufficientLiquidity,
                MathError::Overflow => PoolError::LiquidityOverflow,
                other => PoolError::Math(other),
            })?
        };

        // Growth deltas wrap modulo 2^256 by construction.
        let owed_0 = mul_div(
            fee_growth_inside_0_x128.wrapping_sub(self.fee_growth_inside_0_last_x128),
            U256::from(self.liquidity),
            Q128,
        )?;
        let owed_1 = mul_div(
            fee_growth_inside_1_x128.wrapping_sub(self.fee_growth_inside_1_last_x128),
            U256::from(self.liquidity),
            Q128,
        )?;

        self.liquidity = liquidity_next;
        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;

        // Saturate rather than wrap; owed fees beyond u128 must be
        // collected before they can be lost.
        self.tokens_owed_0 = self.tokens_owed_0.saturating_add(saturate_u128(owed_0));
        self.tokens_owed_1 = self.tokens_owed_1.saturating_add(saturate_u128(owed_1));

        Ok(())
    }

    /// Withdraws up to the requested amounts from the owed balances and
    /// returns what was actually taken.
    pub fn collect(&mut self, amount_0_requested: u128, amount_1_requested: u128) -> (u128, u128) {
        let amount_0 = amount_0_requested.min(self.tokens_owed_0);
        let amount_1 = amount_1_requested.min(self.tokens_owed_1);
        self.tokens_owed_0 -= amount_0;
        self.tokens_owed_1 -= amount_1;
        (amount_0, amount_1)
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed_0 == 0 && self.tokens_owed_1 == 0
    }
}

fn saturate_u128(x: U256) -> u128 {
    if x > U256::from(u128::MAX) {
        u128::MAX
    } else {
        x.to::<u128>()
    }
}

/// All positions of a pool, keyed by owner and range. Entries are never
/// physically removed; a fully-burned, fully-collected position simply
/// reads as zero.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: FastMap<PositionKey, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the position, zeroed if it does not exist.
    pub fn get(&self, key: &PositionKey) -> Position {
        self.positions.get(key).copied().unwrap_or_default()
    }

    /// Mutable access, creating a zero position on first touch.
    pub fn entry(&mut self, key: PositionKey) -> &mut Position {
        self.positions.entry(key).or_default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
