mod pool;
mod position;
mod swap;
mod tick;

pub use pool::{Pool, PoolConfig, Slot0};
pub use position::{Position, PositionKey, PositionLedger};
pub use swap::SwapOutcome;
pub use tick::{max_liquidity_per_tick, Tick, TickRegistry};
