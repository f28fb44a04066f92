//! Thin orchestration layer over [`Pool`].
//!
//! The manager turns desired token budgets into liquidity, enforces
//! caller slippage bounds before any state changes, and settles token
//! movement through an [`AssetTransfer`] capability supplied by the
//! host. The pool itself never touches balances.

use crate::error::PoolError;
use crate::math::liquidity_math::get_liquidity_for_amounts;
use crate::math::math_helpers::mul_div;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::tick_math::{get_sqrt_ratio_at_tick, MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::pool::{Pool, SwapOutcome};
use crate::{U256_1, U256_E4};
use alloy_primitives::{Address, I256, U256};
use tracing::debug;

/// Token custody operations the host must provide. The engine calls
/// these to settle what its accounting has already decided; a transfer
/// error aborts the operation.
pub trait AssetTransfer {
    fn transfer_from(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), PoolError>;

    fn balance_of(&self, token: Address, account: Address) -> U256;
}

/// Owns a pool plus the custody account its reserves live in.
pub struct Manager<T: AssetTransfer> {
    pool: Pool,
    custody: Address,
    assets: T,
}

impl<T: AssetTransfer> Manager<T> {
    pub fn new(pool: Pool, custody: Address, assets: T) -> Self {
        Self {
            pool,
            custody,
            assets,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn assets(&self) -> &T {
        &self.assets
    }

    /// Adds liquidity funded by `payer`, sized from the desired token
    /// budgets at the current price.
    ///
    /// The position is credited to `recipient`. Fails with
    /// `SlippageViolation` before any state change if the amounts the
    /// pool would take fall below the caller's minimums, and with
    /// `InsufficientInputAmount` if `payer` cannot cover them.
    #[allow(clippy::too_many_arguments)]
    pub fn mint(
        &mut self,
        payer: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_desired: U256,
        amount_1_desired: U256,
        amount_0_min: U256,
        amount_1_min: U256,
    ) -> Result<(u128, U256, U256), PoolError> {
        let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

        let liquidity = get_liquidity_for_amounts(
            self.pool.sqrt_price_x96(),
            sqrt_lower,
            sqrt_upper,
            amount_0_desired,
            amount_1_desired,
        )?;
        if liquidity == 0 {
            return Err(PoolError::ZeroAmount);
        }

        // Predict what the pool will charge so slippage is rejected
        // before anything commits.
        let (amount_0, amount_1) =
            amounts_for_liquidity(&self.pool, tick_lower, tick_upper, liquidity)?;
        if amount_0 < amount_0_min || amount_1 < amount_1_min {
            return Err(PoolError::SlippageViolation);
        }
        self.check_balance(self.pool.token_0(), payer, amount_0)?;
        self.check_balance(self.pool.token_1(), payer, amount_1)?;

        let (minted_0, minted_1) = self.pool.mint(recipient, tick_lower, tick_upper, liquidity)?;

        self.assets.transfer_from(
            self.pool.token_0(),
            payer,
            self.custody,
            U256::from(minted_0),
        )?;
        self.assets.transfer_from(
            self.pool.token_1(),
            payer,
            self.custody,
            U256::from(minted_1),
        )?;

        debug!(tick_lower, tick_upper, liquidity, "position minted");
        Ok((liquidity, U256::from(minted_0), U256::from(minted_1)))
    }

    /// Removes liquidity from `owner`'s position, enforcing minimum
    /// amounts out. The freed tokens stay in the position's owed
    /// balances until [`collect`](Self::collect).
    #[allow(clippy::too_many_arguments)]
    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        amount_0_min: U256,
        amount_1_min: U256,
    ) -> Result<(U256, U256), PoolError> {
        let (amount_0, amount_1) = if liquidity > 0 {
            amounts_for_removal(&self.pool, tick_lower, tick_upper, liquidity)?
        } else {
            (U256::ZERO, U256::ZERO)
        };
        if amount_0 < amount_0_min || amount_1 < amount_1_min {
            return Err(PoolError::SlippageViolation);
        }

        let (burned_0, burned_1) = self.pool.burn(owner, tick_lower, tick_upper, liquidity)?;
        Ok((U256::from(burned_0), U256::from(burned_1)))
    }

    /// Pays out a position's owed balances to `recipient`.
    pub fn collect(
        &mut self,
        owner: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: u128,
        amount_1_requested: u128,
    ) -> Result<(u128, u128), PoolError> {
        let (amount_0, amount_1) = self.pool.collect(
            owner,
            tick_lower,
            tick_upper,
            amount_0_requested,
            amount_1_requested,
        )?;

        if amount_0 > 0 {
            self.assets.transfer_from(
                self.pool.token_0(),
                self.custody,
                recipient,
                U256::from(amount_0),
            )?;
        }
        if amount_1 > 0 {
            self.assets.transfer_from(
                self.pool.token_1(),
                self.custody,
                recipient,
                U256::from(amount_1),
            )?;
        }
        Ok((amount_0, amount_1))
    }

    /// Swaps an exact input for `payer`, sending the output to
    /// `recipient`.
    ///
    /// `sqrt_price_limit_x96 = None` derives the limit from
    /// `tolerance_bps` around the current price. `amount_out_min` is
    /// checked against a dry run before anything commits.
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_input(
        &mut self,
        payer: Address,
        recipient: Address,
        zero_for_one: bool,
        amount_in: U256,
        amount_out_min: U256,
        tolerance_bps: u32,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapOutcome, PoolError> {
        if amount_in > I256::MAX.into_raw() {
            return Err(PoolError::Math(crate::error::MathError::Overflow));
        }
        let limit = match sqrt_price_limit_x96 {
            Some(limit) => limit,
            None => calculate_sqrt_price_limit(
                self.pool.sqrt_price_x96(),
                tolerance_bps,
                zero_for_one,
            )?,
        };

        let amount_specified = I256::from_raw(amount_in);
        let quoted = self.pool.quote(zero_for_one, amount_specified, limit)?;

        let (amount_out, token_in, token_out) = if zero_for_one {
            (
                (-quoted.amount_1).into_raw(),
                self.pool.token_0(),
                self.pool.token_1(),
            )
        } else {
            (
                (-quoted.amount_0).into_raw(),
                self.pool.token_1(),
                self.pool.token_0(),
            )
        };
        if amount_out < amount_out_min {
            return Err(PoolError::SlippageViolation);
        }

        let amount_in_settled = if zero_for_one {
            quoted.amount_0.into_raw()
        } else {
            quoted.amount_1.into_raw()
        };
        self.check_balance(token_in, payer, amount_in_settled)?;

        let outcome = self.pool.swap(zero_for_one, amount_specified, limit)?;

        self.assets
            .transfer_from(token_in, payer, self.custody, amount_in_settled)?;
        self.assets
            .transfer_from(token_out, self.custody, recipient, amount_out)?;

        debug!(
            zero_for_one,
            %amount_in_settled,
            %amount_out,
            "swap settled"
        );
        Ok(outcome)
    }

    fn check_balance(
        &self,
        token: Address,
        account: Address,
        amount: U256,
    ) -> Result<(), PoolError> {
        if self.assets.balance_of(token, account) < amount {
            return Err(PoolError::InsufficientInputAmount);
        }
        Ok(())
    }
}

/// Price limit `tolerance_bps` basis points away from the current sqrt
/// price, clamped to the representable range.
pub fn calculate_sqrt_price_limit(
    sqrt_price_x96: U256,
    tolerance_bps: u32,
    zero_for_one: bool,
) -> Result<U256, PoolError> {
    let tolerance = mul_div(sqrt_price_x96, U256::from(tolerance_bps), U256_E4)?;
    if zero_for_one {
        let limit = sqrt_price_x96.saturating_sub(tolerance);
        Ok(limit.max(MIN_SQRT_RATIO + U256_1))
    } else {
        let limit = sqrt_price_x96.saturating_add(tolerance);
        Ok(limit.min(MAX_SQRT_RATIO - U256_1))
    }
}

/// Token amounts a mint of `liquidity` would charge, mirroring the
/// pool's own rounding (up, in the pool's favor).
fn amounts_for_liquidity(
    pool: &Pool,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> Result<(U256, U256), PoolError> {
    let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

    if pool.tick() < tick_lower {
        Ok((
            get_amount_0_delta(sqrt_lower, sqrt_upper, liquidity, true)?,
            U256::ZERO,
        ))
    } else if pool.tick() < tick_upper {
        Ok((
            get_amount_0_delta(pool.sqrt_price_x96(), sqrt_upper, liquidity, true)?,
            get_amount_1_delta(sqrt_lower, pool.sqrt_price_x96(), liquidity, true)?,
        ))
    } else {
        Ok((
            U256::ZERO,
            get_amount_1_delta(sqrt_lower, sqrt_upper, liquidity, true)?,
        ))
    }
}

/// Token amounts a burn of `liquidity` would free, rounded down.
fn amounts_for_removal(
    pool: &Pool,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> Result<(U256, U256), PoolError> {
    let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

    if pool.tick() < tick_lower {
        Ok((
            get_amount_0_delta(sqrt_lower, sqrt_upper, liquidity, false)?,
            U256::ZERO,
        ))
    } else if pool.tick() < tick_upper {
        Ok((
            get_amount_0_delta(pool.sqrt_price_x96(), sqrt_upper, liquidity, false)?,
            get_amount_1_delta(sqrt_lower, pool.sqrt_price_x96(), liquidity, false)?,
        ))
    } else {
        Ok((
            U256::ZERO,
            get_amount_1_delta(sqrt_lower, sqrt_upper, liquidity, false)?,
        ))
    }
}
