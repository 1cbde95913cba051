use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Signed US-dollar amount. Negative values are outflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn dollars(whole: i64) -> Self {
        Money(Decimal::from(whole))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Exact divisibility check; `step` of zero never divides.
    pub fn is_multiple_of(self, step: Money) -> bool {
        !step.is_zero() && self.0.checked_rem(step.0).is_some_and(|r| r.is_zero())
    }

    /// Dollar text without trailing zero cents: `$500`, `$12.5`, `-$40`.
    pub fn trimmed(self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{sign}${}", self.0.abs().normalize())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0.abs())
        }
    }
}

/// Saturates at the `Decimal` bounds instead of panicking.
impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_two_decimals() {
        assert_eq!(Money::from_cents(123456).to_string(), "$1234.56");
        assert_eq!(Money::dollars(500).to_string(), "$500.00");
        assert_eq!(Money::from_cents(-1200).to_string(), "-$12.00");
    }

    #[test]
    fn negative_zero_is_not_negative() {
        let m = Money::from_decimal(Decimal::from_str("-0.00").unwrap());
        assert!(!m.is_negative());
        assert_eq!(m.to_string(), "$0.00");
    }

    #[test]
    fn abs_drops_sign() {
        assert_eq!(Money::from_cents(-40001).abs(), Money::from_cents(40001));
    }

    #[test]
    fn multiple_of_is_exact() {
        assert!(Money::dollars(150).is_multiple_of(Money::dollars(50)));
        assert!(!Money::from_cents(15001).is_multiple_of(Money::dollars(50)));
        assert!(!Money::dollars(150).is_multiple_of(Money::zero()));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [Money::dollars(300), Money::dollars(300)].into_iter().sum();
        assert_eq!(total, Money::dollars(600));
    }

    #[test]
    fn sum_saturates_at_decimal_bounds() {
        let huge = Money::from_decimal(Decimal::from_str("40000000000000000000000000000.00").unwrap());
        let total: Money = [huge, huge, huge].into_iter().sum();
        assert_eq!(total.as_decimal(), Decimal::MAX);

        let low: Money = [Money::from_decimal(Decimal::MIN), Money::dollars(-1)].into_iter().sum();
        assert_eq!(low.as_decimal(), Decimal::MIN);
    }

    #[test]
    fn trimmed_drops_zero_cents() {
        assert_eq!(Money::dollars(500).trimmed(), "$500");
        assert_eq!(Money::from_cents(-15000).trimmed(), "-$150");
        assert_eq!(Money::from_cents(1250).trimmed(), "$12.5");
        assert_eq!(Money::zero().trimmed(), "$0");
    }
}
