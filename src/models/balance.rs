use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Number of rao in one TAO.
pub const RAO_PER_TAO: u64 = 1_000_000_000;

const TAO_SYMBOL: char = '\u{03C4}';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BalanceParseError {
    #[error("empty balance literal")]
    Empty,

    #[error("invalid balance literal: {0}")]
    Invalid(String),

    #[error("balance out of range: {0}")]
    Overflow(String),
}

/// An amount of TAO held in rao, the chain's base unit.
///
/// Displays (and serializes) as `τ1,234.567890000`; the same text parses back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Balance(u64);

impl Balance {
    pub const ZERO: Balance = Balance(0);

    pub const fn from_rao(rao: u64) -> Self {
        Balance(rao)
    }

    pub const fn rao(&self) -> u64 {
        self.0
    }

    pub fn as_tao(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), 9)
    }
}

impl Add for Balance {
    type Output = Balance;

    fn add(self, rhs: Balance) -> Balance {
        Balance(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / RAO_PER_TAO;
        let frac = self.0 % RAO_PER_TAO;
        write!(f, "{TAO_SYMBOL}{}.{frac:09}", group_thousands(whole))
    }
}

impl FromStr for Balance {
    type Err = BalanceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(TAO_SYMBOL).replace(',', "");
        if trimmed.is_empty() {
            return Err(BalanceParseError::Empty);
        }

        let (whole_str, frac_str) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed.as_str(), ""),
        };

        if frac_str.len() > 9
            || !whole_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(BalanceParseError::Invalid(s.to_string()));
        }

        let whole: u64 = if whole_str.is_empty() {
            0
        } else {
            whole_str
                .parse()
                .map_err(|_| BalanceParseError::Overflow(s.to_string()))?
        };
        let frac: u64 = if frac_str.is_empty() {
            0
        } else {
            format!("{frac_str:0<9}")
                .parse()
                .map_err(|_| BalanceParseError::Invalid(s.to_string()))?
        };

        whole
            .checked_mul(RAO_PER_TAO)
            .and_then(|r| r.checked_add(frac))
            .map(Balance)
            .ok_or_else(|| BalanceParseError::Overflow(s.to_string()))
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Portfolio summary of the tracked coldkey at one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioBalance {
    pub total: Balance,
    pub free: Balance,
    /// Stake on the root subnet (netuid 0), in TAO terms.
    pub root: Balance,
    /// Stake on all other subnets, converted to TAO at the subnet price.
    pub alpha: Balance,
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
