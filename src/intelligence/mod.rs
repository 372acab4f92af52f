pub mod classifier;
pub mod portfolio;

pub use classifier::classify_call;
pub use portfolio::{calculate_portfolio, stake_value, StakePosition, ROOT_NETUID};
