use thiserror::Error;

/// Failures in the raw fixed-point arithmetic layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("math error - overflow")]
    Overflow,
    #[error("math error - underflow")]
    Underflow,
    #[error("math error - division by zero")]
    DivisionByZero,
    #[error("bit math error - zero input value")]
    ZeroValue,
}

/// Failures surfaced by pool operations. Every operation is
/// all-or-nothing: an error means no state was mutated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Tick ordering or tick-spacing violation in a mint/burn range.
    #[error("invalid tick range or spacing")]
    InvalidTick,
    /// Tick or sqrt price outside the supported curve range.
    #[error("tick or sqrt price out of bounds")]
    OutOfBounds,
    /// A burn or position update would drive liquidity negative, or a
    /// swap requested more than the pool's virtual reserves.
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    /// Per-tick liquidity cap exceeded.
    #[error("liquidity overflow at tick")]
    LiquidityOverflow,
    /// The swap could make no progress before reaching the caller's
    /// price limit.
    #[error("price limit reached with zero progress")]
    PriceLimitReached,
    /// Settled amounts violate the caller-specified minimums. Raised by
    /// the manager layer, never by the core.
    #[error("slippage violation: settled amounts below minimums")]
    SlippageViolation,
    /// A swap or mint was requested with a zero amount.
    #[error("amount specified is zero")]
    ZeroAmount,
    /// The asset-transfer capability could not supply the input owed to
    /// the pool.
    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error(transparent)]
    Math(#[from] MathError),
}
