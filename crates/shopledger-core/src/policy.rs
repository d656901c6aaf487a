//! # Loyalty Policy
//!
//! Accrual rate for customer loyalty points, configurable rather than
//! hard-coded.
//!
//! The default mirrors the common small-business scheme: one point per
//! 100.00 of invoice total, rounded down. Redemption is an explicit
//! operation on the customer repository; this module only computes accrual.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Default accrual unit: 10_000 cents (100.00) per point.
pub const DEFAULT_CENTS_PER_POINT: i64 = 10_000;

/// Loyalty point accrual policy.
///
/// ## Usage
/// ```rust
/// use shopledger_core::{LoyaltyPolicy, Money};
///
/// let policy = LoyaltyPolicy::default();
/// assert_eq!(policy.points_for(Money::from_cents(25_000)), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyPolicy {
    /// How many cents of invoice total earn one point.
    pub cents_per_point: i64,
}

impl LoyaltyPolicy {
    /// Creates a policy with a custom accrual unit.
    ///
    /// A non-positive unit disables accrual entirely.
    pub const fn new(cents_per_point: i64) -> Self {
        LoyaltyPolicy { cents_per_point }
    }

    /// Policy that never accrues points.
    pub const fn disabled() -> Self {
        LoyaltyPolicy { cents_per_point: 0 }
    }

    /// Points accrued for an invoice total: `floor(total / unit)`.
    pub fn points_for(&self, total: Money) -> i64 {
        if self.cents_per_point <= 0 || total.cents() <= 0 {
            return 0;
        }
        total.cents() / self.cents_per_point
    }
}

impl Default for LoyaltyPolicy {
    fn default() -> Self {
        LoyaltyPolicy {
            cents_per_point: DEFAULT_CENTS_PER_POINT,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accrual_floors() {
        let policy = LoyaltyPolicy::default();

        // 100.00 earns exactly one point
        assert_eq!(policy.points_for(Money::from_cents(10_000)), 1);
        // 99.99 earns nothing
        assert_eq!(policy.points_for(Money::from_cents(9_999)), 0);
        // 250.00 floors to 2
        assert_eq!(policy.points_for(Money::from_cents(25_000)), 2);
    }

    #[test]
    fn test_disabled_policy() {
        let policy = LoyaltyPolicy::disabled();
        assert_eq!(policy.points_for(Money::from_cents(1_000_000)), 0);
    }

    #[test]
    fn test_custom_unit() {
        // One point per 10.00
        let policy = LoyaltyPolicy::new(1_000);
        assert_eq!(policy.points_for(Money::from_cents(5_500)), 5);
    }

    #[test]
    fn test_non_positive_totals_accrue_nothing() {
        let policy = LoyaltyPolicy::default();
        assert_eq!(policy.points_for(Money::zero()), 0);
        assert_eq!(policy.points_for(Money::from_cents(-10_000)), 0);
    }
}
