//! Money as integer cents.

use serde::{Deserialize, Serialize};

/// A currency amount in integer cents (centavos).
///
/// All arithmetic is exact; there is no floating point anywhere in the
/// billing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// The tolerance used when comparing a snapshotted price against the
    /// live price: differences of at most one cent are not reported as a
    /// price change.
    pub const PRICE_TOLERANCE: Money = Money(1);

    /// Creates an amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Zero amount.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a line quantity.
    pub const fn times(&self, quantity: u32) -> Money {
        Money(self.0 * quantity as i64)
    }

    /// Absolute difference between two amounts.
    pub const fn abs_diff(&self, other: Money) -> Money {
        Money((self.0 - other.0).abs())
    }

    /// Whether `other` diverges from `self` beyond [`Money::PRICE_TOLERANCE`].
    pub const fn diverges_from(&self, other: Money) -> bool {
        self.abs_diff(other).0 > Self::PRICE_TOLERANCE.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}R${}.{:02}", (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_cents() {
        assert_eq!(Money::from_cents(1234).to_string(), "R$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "R$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-R$12.34");
    }

    #[test]
    fn times_scales_by_quantity() {
        assert_eq!(Money::from_cents(1000).times(3), Money::from_cents(3000));
    }

    #[test]
    fn sum_over_iterator() {
        let total: Money = [100, 250, 50].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(400));
    }

    #[test]
    fn one_cent_drift_is_within_tolerance() {
        let snapshot = Money::from_cents(1000);
        assert!(!snapshot.diverges_from(Money::from_cents(1001)));
        assert!(!snapshot.diverges_from(Money::from_cents(999)));
        assert!(snapshot.diverges_from(Money::from_cents(1002)));
        assert!(snapshot.diverges_from(Money::from_cents(998)));
    }

    #[test]
    fn serialization_roundtrip() {
        let m = Money::from_cents(4990);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "4990");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
