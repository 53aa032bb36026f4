//! Affordability engine
//!
//! Borrowing capacity from income and current obligations, the largest loan a
//! capacity supports, and whether a desired loan fits it.

use crate::engine::amortization::{fixed_payment, MAX_TERM};
use crate::error::BotError;
use crate::models::{RiskTier, Verdict};
use crate::Result;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

/// Monthly payment assumed on revolving balances.
pub const REVOLVING_PAYMENT_RATE: Decimal = dec!(0.06);

/// Monthly room for a new credit payment. Negative when obligations exceed the budget.
pub fn monthly_capacity(
    net_income: Decimal,
    fixed_payments: Decimal,
    revolving_debt: Decimal,
    tier: RiskTier,
) -> Decimal {
    let budget = net_income * tier.factor();
    let revolving_payment = revolving_debt * REVOLVING_PAYMENT_RATE;
    (budget - fixed_payments - revolving_payment).round_dp(2)
}

/// Largest principal whose fixed payment equals `capacity`.
pub fn max_loan_amount(capacity: Decimal, rate: Decimal, periods: u32) -> Result<Decimal> {
    if rate <= Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The interest rate must be greater than zero.".to_string(),
        ));
    }
    if rate >= Decimal::ONE {
        return Err(BotError::InvalidInput(
            "The rate per period must be below 100% (write 0.025 for 2.5%).".to_string(),
        ));
    }
    if periods == 0 || periods > MAX_TERM {
        return Err(BotError::InvalidInput(format!(
            "The number of payments must be between 1 and {}.",
            MAX_TERM
        )));
    }

    let discount = (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .and_then(|growth| Decimal::ONE.checked_div(growth))
        .unwrap_or(Decimal::ZERO);
    let factor = (Decimal::ONE - discount) / rate;

    Ok((capacity * factor).round_dp(2))
}

/// Compare the payment of a desired loan with the capacity.
///
/// A rejection carries three ways to close the gap: lower fixed payments by the
/// gap, raise income by the gap over the risk factor, or pay down revolving
/// debt by the gap over the revolving payment rate.
pub fn affordability_check(
    desired_amount: Decimal,
    rate: Decimal,
    periods: u32,
    capacity: Decimal,
    risk_factor: Decimal,
) -> Result<Verdict> {
    if risk_factor <= Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The risk factor must be greater than zero.".to_string(),
        ));
    }

    let payment = fixed_payment(desired_amount, rate, periods)?;

    if payment <= capacity {
        return Ok(Verdict::Approved { payment, capacity });
    }

    let payment_gap = payment - capacity;
    Ok(Verdict::Rejected {
        payment,
        capacity,
        payment_gap: payment_gap.round_dp(2),
        income_increase_needed: (payment_gap / risk_factor).round_dp(2),
        revolving_reduction_needed: (payment_gap / REVOLVING_PAYMENT_RATE).round_dp(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn test_capacity_reference_profile() {
        let capacity = monthly_capacity(dec!(12500), dec!(1800), dec!(3000), RiskTier::Medium);
        assert_eq!(capacity, dec!(3645.00));
    }

    #[test]
    fn test_capacity_by_tier() {
        let low = monthly_capacity(dec!(10000), Decimal::ZERO, Decimal::ZERO, RiskTier::Low);
        let high = monthly_capacity(dec!(10000), Decimal::ZERO, Decimal::ZERO, RiskTier::High);
        assert_eq!(low, dec!(6000));
        assert_eq!(high, dec!(3000));
    }

    #[test]
    fn test_capacity_may_be_negative() {
        let capacity = monthly_capacity(dec!(5000), dec!(2000), dec!(10000), RiskTier::High);
        assert_eq!(capacity, dec!(-1100));
    }

    #[test]
    fn test_max_loan_amount() {
        let amount = max_loan_amount(dec!(3645.00), dec!(0.025), 24).unwrap();
        assert_eq!(amount, dec!(65190.77));
    }

    #[test]
    fn test_max_loan_requires_positive_rate() {
        assert!(matches!(
            max_loan_amount(dec!(3645), Decimal::ZERO, 24),
            Err(BotError::InvalidInput(_))
        ));
        assert!(matches!(
            max_loan_amount(dec!(3645), dec!(0.02), 0),
            Err(BotError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_affordable_loan_is_approved() {
        let verdict =
            affordability_check(dec!(50000), dec!(0.02), 24, dec!(3645), dec!(0.45)).unwrap();
        assert!(verdict.is_approved());
    }

    #[test]
    fn test_rejection_carries_remediation() {
        let verdict =
            affordability_check(dec!(100000), dec!(0.02), 24, dec!(3645), dec!(0.45)).unwrap();

        match verdict {
            Verdict::Rejected {
                payment,
                payment_gap,
                income_increase_needed,
                revolving_reduction_needed,
                ..
            } => {
                assert_eq!(payment, dec!(5287.11));
                assert_eq!(payment_gap, dec!(1642.11));
                assert_eq!(income_increase_needed, dec!(3649.13));
                assert_eq!(revolving_reduction_needed, dec!(27368.50));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_more_capacity_never_widens_gap(
            amount_units in 1_000u64..1_000_000,
            rate_bp in 0u32..500,
            periods in 1u32..240,
            capacity_units in 0u64..50_000,
            raise_units in 0u64..50_000,
        ) {
            let amount = Decimal::from(amount_units);
            let rate = Decimal::new(i64::from(rate_bp), 4);
            let capacity = Decimal::from(capacity_units);
            let raised = capacity + Decimal::from(raise_units);
            let factor = RiskTier::Medium.factor();

            let before = affordability_check(amount, rate, periods, capacity, factor).unwrap();
            let after = affordability_check(amount, rate, periods, raised, factor).unwrap();

            match (before, after) {
                (Verdict::Approved { .. }, after) => prop_assert!(after.is_approved()),
                (
                    Verdict::Rejected { payment_gap: gap_before, .. },
                    Verdict::Rejected { payment_gap: gap_after, .. },
                ) => prop_assert!(gap_after <= gap_before),
                (Verdict::Rejected { .. }, Verdict::Approved { .. }) => {}
            }
        }
    }
}
