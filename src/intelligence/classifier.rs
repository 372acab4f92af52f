use crate::models::TradeSignal;

/// Call function that opens or grows a position at a limit price.
pub const ADD_STAKE_LIMIT: &str = "add_stake_limit";

/// Call function that reduces or closes a position at a limit price.
pub const REMOVE_STAKE_LIMIT: &str = "remove_stake_limit";

/// Map a call-function name to the trade direction it signals.
///
/// Only the limit-order staking calls are trade signals; every other call
/// (plain `add_stake`, `transfer_allowed`, ...) returns `None`.
pub fn classify_call(call_function: &str) -> Option<TradeSignal> {
    match call_function {
        ADD_STAKE_LIMIT => Some(TradeSignal::Buy),
        REMOVE_STAKE_LIMIT => Some(TradeSignal::Sell),
        _ => None,
    }
}
