pub mod balance;
pub mod extrinsic;
pub mod tick;

pub use balance::{Balance, PortfolioBalance, RAO_PER_TAO};
pub use extrinsic::{ExtrinsicRecord, NewExtrinsic};
pub use tick::{NewTick, Tick};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TradeSignal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSignal {
    Buy,
    Sell,
}

impl TradeSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSignal::Buy => "BUY",
            TradeSignal::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
