pub mod extrinsics;
pub mod health;
pub mod metrics;
pub mod query;
pub mod ticks;
