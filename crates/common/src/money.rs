//! Fixed-point money.

use serde::{Deserialize, Serialize};

/// Money amount represented in integer paise.
///
/// All arithmetic and comparisons are exact, so due-amount and
/// payment-sufficiency checks never need a rounding epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in paise (e.g., 1000 = ₹10.00)
    paise: i64,
}

impl Money {
    /// Creates a new amount from paise.
    pub fn from_paise(paise: i64) -> Self {
        Self { paise }
    }

    /// Creates a new amount from a whole-rupee value.
    pub fn from_rupees(rupees: i64) -> Self {
        Self {
            paise: rupees * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { paise: 0 }
    }

    /// Returns the amount in paise.
    pub fn paise(&self) -> i64 {
        self.paise
    }

    /// Returns the rupee portion (whole number).
    pub fn rupees(&self) -> i64 {
        self.paise / 100
    }

    /// Returns the paise portion (remainder after rupees).
    pub fn paise_part(&self) -> i64 {
        self.paise.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.paise > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.paise == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.paise < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            paise: self.paise * quantity as i64,
        }
    }

    /// Returns the given fraction of this amount, in basis points,
    /// rounded half up. `percent_bps(500)` is 5%.
    pub fn percent_bps(&self, bps: u32) -> Money {
        let scaled = self.paise as i128 * bps as i128;
        let rounded = if scaled >= 0 {
            (scaled + 5_000) / 10_000
        } else {
            (scaled - 5_000) / 10_000
        };
        Money {
            paise: rounded as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.paise < 0 {
            write!(f, "-₹{}.{:02}", self.rupees().abs(), self.paise_part())
        } else {
            write!(f, "₹{}.{:02}", self.rupees(), self.paise_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            paise: self.paise + rhs.paise,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            paise: self.paise - rhs.paise,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.paise += rhs.paise;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.paise -= rhs.paise;
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
    fn from_paise() {
        let money = Money::from_paise(1234);
        assert_eq!(money.paise(), 1234);
        assert_eq!(money.rupees(), 12);
        assert_eq!(money.paise_part(), 34);
    }

    #[test]
    fn from_rupees() {
        let money = Money::from_rupees(50);
        assert_eq!(money.paise(), 5000);
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_paise(1234).to_string(), "₹12.34");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Money::from_paise(-1234).to_string(), "-₹12.34");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!(a.multiply(3).paise(), 3000);
    }

    #[test]
    fn percent_bps_exact() {
        // 5% of ₹300.00 is ₹15.00, no rounding needed
        assert_eq!(Money::from_rupees(300).percent_bps(500).paise(), 1500);
    }

    #[test]
    fn percent_bps_rounds_half_up() {
        // 5% of 30 paise = 1.5 paise, rounds to 2
        assert_eq!(Money::from_paise(30).percent_bps(500).paise(), 2);
        // 5% of 29 paise = 1.45 paise, rounds to 1
        assert_eq!(Money::from_paise(29).percent_bps(500).paise(), 1);
    }

    #[test]
    fn sum() {
        let total: Money = [100, 200, 300]
            .into_iter()
            .map(Money::from_paise)
            .sum();
        assert_eq!(total.paise(), 600);
    }

    #[test]
    fn comparison() {
        assert!(Money::from_paise(100).is_positive());
        assert!(Money::zero().is_zero());
        assert!(Money::from_paise(-1).is_negative());
        assert!(Money::from_paise(100) > Money::from_paise(99));
    }

    #[test]
    fn serialization_roundtrip() {
        let money = Money::from_paise(36500);
        let json = serde_json::to_string(&money).unwrap();
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(money, deserialized);
    }
}
