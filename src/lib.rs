//! Concentrated-liquidity AMM pricing and accounting engine.
//!
//! This crate implements the numerical core of a concentrated-liquidity
//! pool: Q64.96 square-root prices, exact tick <-> price conversion, a
//! sparse tick registry with bitmap search, per-range position and fee
//! accounting, and the step-wise swap loop that walks the price curve
//! across tick boundaries.
//!
//! It exposes:
//! - Low-level math primitives (`math::*`) for ticks, prices and bitmaps.
//! - A stateful in-memory [`Pool`] that executes mint/burn/collect/swap.
//! - A thin [`manager`] layer that turns desired token amounts into
//!   liquidity, enforces slippage minimums, and settles transfers through
//!   an asset-transfer capability supplied by the host.
//!
//! The engine never moves value itself; every operation returns exact
//! settled token deltas and either fully commits or fully rejects.
//!
//! # Example
//!
//! ```
//! use clmm_engine::{math::tick_math::get_sqrt_ratio_at_tick, Address, Pool};
//!
//! let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
//! let token0 = Address::with_last_byte(1);
//! let token1 = Address::with_last_byte(2);
//! let mut pool = Pool::new(token0, token1, 3000, 60, sqrt_price).unwrap();
//!
//! let owner = Address::with_last_byte(9);
//! let (amount0, amount1) = pool.mint(owner, -120, 120, 1_000_000_000).unwrap();
//! assert!(amount0 > 0 && amount1 > 0);
//! ```

pub use alloy_primitives::{Address, I256, U256};

pub mod error;
mod hash;
pub mod manager;
pub mod math;
pub mod pool;

pub use error::{MathError, PoolError};
pub use hash::FastMap;
pub use pool::{Pool, SwapOutcome};

pub(crate) const U256_1: U256 = U256::from_limbs([1, 0, 0, 0]);
pub(crate) const U256_E4: U256 = U256::from_limbs([10000, 0, 0, 0]);
pub(crate) const U256_E6: U256 = U256::from_limbs([1000000, 0, 0, 0]);

pub(crate) const U160_MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, 4294967295, 0]);

/// Number of fractional bits in the sqrt price representation.
pub const RESOLUTION: u8 = 96;
/// 2^96, the Q64.96 scaling factor.
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
/// 2^128, the scaling factor for fee-growth-per-unit-liquidity accumulators.
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);
