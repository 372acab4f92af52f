use crate::models::{Balance, PortfolioBalance, RAO_PER_TAO};

/// The root subnet. Stake there is tracked separately from alpha stake.
pub const ROOT_NETUID: u16 = 0;

/// One stake entry of a coldkey: `stake` alpha units on subnet `netuid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakePosition {
    pub netuid: u16,
    pub stake: u64,
}

/// Convert a staked amount to rao at `price` (rao per 10^9 alpha units).
///
/// Truncating fixed-point division; the product is taken in u128 so large
/// positions cannot overflow before the divide.
pub fn stake_value(stake: u64, price: u64) -> u64 {
    let rao = u128::from(stake) * u128::from(price) / u128::from(RAO_PER_TAO);
    u64::try_from(rao).unwrap_or(u64::MAX)
}

/// Combine free balance and stake positions into a portfolio summary.
///
/// Each position is converted on its own, so rounding losses accumulate
/// rather than cancel.
pub fn calculate_portfolio<F>(free: Balance, stakes: &[StakePosition], price_of: F) -> PortfolioBalance
where
    F: Fn(u16) -> u64,
{
    let mut root: u64 = 0;
    let mut alpha: u64 = 0;

    for position in stakes {
        let value = stake_value(position.stake, price_of(position.netuid));
        if position.netuid == ROOT_NETUID {
            root = root.saturating_add(value);
        } else {
            alpha = alpha.saturating_add(value);
        }
    }

    let root = Balance::from_rao(root);
    let alpha = Balance::from_rao(alpha);

    PortfolioBalance {
        total: free + root + alpha,
        free,
        root,
        alpha,
    }
}
