//! Platform credit balance.
//!
//! Credits are the platform's internal currency. Store creation is paid for
//! with credits, so the balance type refuses to go negative.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Fixed price of creating a store.
pub const STORE_CREATION_COST: Credits = Credits(50);

/// Errors produced by credit arithmetic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditsError {
    /// A negative amount was supplied where a balance is expected.
    #[error("credit amount cannot be negative (got {0})")]
    Negative(i64),
    /// The debit exceeds the balance.
    #[error("insufficient credits: need {required}, have {balance}")]
    Insufficient {
        /// Amount requested.
        required: i64,
        /// Balance at the time of the request.
        balance: i64,
    },
    /// The result would overflow.
    #[error("credit balance overflow")]
    Overflow,
}

/// A non-negative credit amount.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Credits(i64);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(0);

    /// Create a credit amount.
    ///
    /// # Errors
    ///
    /// Returns `CreditsError::Negative` for amounts below zero.
    pub const fn new(amount: i64) -> Result<Self, CreditsError> {
        if amount < 0 {
            return Err(CreditsError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Get the raw amount.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Whether this balance covers `cost`.
    #[must_use]
    pub const fn covers(self, cost: Self) -> bool {
        self.0 >= cost.0
    }

    /// How much is missing to cover `cost` (zero when covered).
    #[must_use]
    pub const fn shortfall(self, cost: Self) -> Self {
        if self.0 >= cost.0 {
            Self::ZERO
        } else {
            Self(cost.0 - self.0)
        }
    }

    /// Subtract `cost` from this balance.
    ///
    /// # Errors
    ///
    /// Returns `CreditsError::Insufficient` if the balance does not cover it.
    pub const fn debit(self, cost: Self) -> Result<Self, CreditsError> {
        if !self.covers(cost) {
            return Err(CreditsError::Insufficient {
                required: cost.0,
                balance: self.0,
            });
        }
        Ok(Self(self.0 - cost.0))
    }

    /// Add `amount` to this balance.
    ///
    /// # Errors
    ///
    /// Returns `CreditsError::Overflow` if the sum does not fit.
    pub const fn credit(self, amount: Self) -> Result<Self, CreditsError> {
        match self.0.checked_add(amount.0) {
            Some(sum) => Ok(Self(sum)),
            None => Err(CreditsError::Overflow),
        }
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Credits {
    type Error = CreditsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Credits> for i64 {
    fn from(credits: Credits) -> Self {
        credits.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Credits::new(-1), Err(CreditsError::Negative(-1)));
    }

    #[test]
    fn test_exact_balance_covers_cost() {
        let balance = Credits::new(50).unwrap();
        assert!(balance.covers(STORE_CREATION_COST));
        assert_eq!(balance.debit(STORE_CREATION_COST).unwrap(), Credits::ZERO);
    }

    #[test]
    fn test_shortfall() {
        let balance = Credits::new(49).unwrap();
        assert!(!balance.covers(STORE_CREATION_COST));
        assert_eq!(balance.shortfall(STORE_CREATION_COST).amount(), 1);
        assert_eq!(
            balance.debit(STORE_CREATION_COST),
            Err(CreditsError::Insufficient {
                required: 50,
                balance: 49
            })
        );
    }

    #[test]
    fn test_credit_overflow() {
        let max = Credits::new(i64::MAX).unwrap();
        assert_eq!(
            max.credit(Credits::new(1).unwrap()),
            Err(CreditsError::Overflow)
        );
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let parsed: Result<Credits, _> = serde_json::from_str("-5");
        assert!(parsed.is_err());
    }
}
