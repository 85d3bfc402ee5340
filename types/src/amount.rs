//! Token amount type.
//!
//! Amounts are base-unit integers (u128) carried as decimal strings on the
//! wire. They never pass through floating point; display scaling by the
//! configured decimals is a presentation concern handled elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a decimal amount string.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount string is empty")]
    Empty,
    #[error("amount contains a non-digit character: {0:?}")]
    NonDigit(char),
    #[error("amount exceeds the representable range")]
    Overflow,
}

/// A token amount in base units.
///
/// Internally stored as raw units (u128) for precision. Serialized as a
/// decimal string, matching the chain's integer-string convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl FromStr for TokenAmount {
    type Err = AmountParseError;

    /// Parse a base-unit decimal integer string. Signs, separators and
    /// fractional points are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(AmountParseError::NonDigit(bad));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| AmountParseError::Overflow)
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = AmountParseError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TokenAmount> for String {
    fn from(a: TokenAmount) -> String {
        a.0.to_string()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
