//! Amortization engine
//!
//! Fixed-payment loans, extra principal payments and implied installment rates.
//! All arithmetic stays in full `Decimal` precision; results are rounded to
//! cents only when they leave this module.

use crate::error::BotError;
use crate::models::{ExtraPaymentSavings, InstallmentCost, LoanQuote};
use crate::Result;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use tracing::debug;

/// Longest schedule accepted, in periods.
pub const MAX_TERM: u32 = 1200;

/// Largest principal or price accepted.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

const SOLVER_INITIAL_RATE: Decimal = dec!(0.05);
const SOLVER_TOLERANCE: Decimal = dec!(0.0001);
const SOLVER_MAX_ITERATIONS: u32 = 100;
const SLOPE_STEP: Decimal = dec!(0.000001);

/// Closest the solver may get to a rate of -100% per period.
const SOLVER_RATE_FLOOR: Decimal = dec!(-0.99);
const SOLVER_RATE_CEILING: Decimal = dec!(100);

/// Payment that amortizes `principal` over `periods` at `rate`, unrounded.
///
/// Returns `None` only when the intermediate values leave `Decimal` range.
fn annuity(principal: Decimal, rate: Decimal, periods: u32) -> Option<Decimal> {
    let n = Decimal::from(periods);
    if rate.is_zero() {
        return principal.checked_div(n);
    }

    let discount = match (Decimal::ONE + rate).checked_powi(i64::from(periods)) {
        Some(growth) if growth.is_zero() => return None,
        Some(growth) => Decimal::ONE.checked_div(growth)?,
        // (1 + r)^-n vanishes
        None => Decimal::ZERO,
    };

    let denominator = Decimal::ONE.checked_sub(discount)?;
    if denominator.is_zero() {
        return principal.checked_div(n);
    }

    principal.checked_mul(rate)?.checked_div(denominator)
}

fn validate_loan(principal: Decimal, rate: Decimal, periods: u32) -> Result<()> {
    if principal <= Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The loan amount must be greater than zero.".to_string(),
        ));
    }
    if principal > MAX_AMOUNT {
        return Err(BotError::InvalidInput(
            "That amount is too large to calculate.".to_string(),
        ));
    }
    if periods == 0 {
        return Err(BotError::InvalidInput(
            "The number of payments must be greater than zero.".to_string(),
        ));
    }
    if periods > MAX_TERM {
        return Err(BotError::InvalidInput(format!(
            "The number of payments can be at most {}.",
            MAX_TERM
        )));
    }
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(BotError::InvalidInput(
            "The interest rate cannot be negative.".to_string(),
        ));
    }
    if rate >= Decimal::ONE {
        return Err(BotError::InvalidInput(
            "The rate per period must be below 100% (write 0.025 for 2.5%).".to_string(),
        ));
    }
    Ok(())
}

/// Unrounded fixed payment, for callers that keep computing with it.
pub fn annuity_payment(principal: Decimal, rate: Decimal, periods: u32) -> Result<Decimal> {
    validate_loan(principal, rate, periods)?;
    annuity(principal, rate, periods).ok_or_else(|| {
        BotError::InvalidInput("Those values are too large to calculate.".to_string())
    })
}

/// Fixed periodic payment, rounded to cents. A zero rate divides the principal evenly.
pub fn fixed_payment(principal: Decimal, rate: Decimal, periods: u32) -> Result<Decimal> {
    Ok(annuity_payment(principal, rate, periods)?.round_dp(2))
}

/// Payment, total paid and total interest of a fixed-payment loan.
///
/// Totals are the quoted (rounded) payment times the number of periods, so
/// the figures shown to the user multiply out exactly.
pub fn loan_quote(principal: Decimal, rate: Decimal, periods: u32) -> Result<LoanQuote> {
    let payment = fixed_payment(principal, rate, periods)?;
    let total_paid = payment * Decimal::from(periods);

    Ok(LoanQuote {
        payment,
        total_paid,
        total_interest: total_paid - principal,
    })
}

/// Simulate the schedule with `extra` added to principal from `start_period` on.
///
/// The schedule runs on the unrounded payment. The baseline total is the quoted
/// payment times `periods`, and the with-extra total is capped at it so the
/// cents lost when quoting the payment never show up as a negative saving.
pub fn extra_payment_savings(
    principal: Decimal,
    rate: Decimal,
    periods: u32,
    extra: Decimal,
    start_period: u32,
) -> Result<ExtraPaymentSavings> {
    let payment = annuity_payment(principal, rate, periods)?;

    if extra <= Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The extra payment must be greater than zero.".to_string(),
        ));
    }
    if extra > MAX_AMOUNT {
        return Err(BotError::InvalidInput(
            "That extra payment is too large to calculate.".to_string(),
        ));
    }
    if start_period == 0 || start_period > periods {
        return Err(BotError::InvalidInput(format!(
            "The starting period must be between 1 and {}.",
            periods
        )));
    }

    let (total_with_extra, periods_paid) =
        simulate_schedule(principal, rate, periods, payment, extra, start_period, periods + 1)?;

    let total_without_extra = payment.round_dp(2) * Decimal::from(periods);
    let total_with_extra = total_with_extra.round_dp(2).min(total_without_extra);

    debug!(
        periods,
        periods_paid,
        start_period,
        "Extra payment simulation finished"
    );

    Ok(ExtraPaymentSavings {
        total_without_extra,
        total_with_extra,
        total_saved: total_without_extra - total_with_extra,
        periods_saved: periods.saturating_sub(periods_paid),
        periods_paid,
    })
}

/// Walk the schedule period by period, returning the cash paid and the number
/// of periods it took.
///
/// A period is the last one when its principal portion covers the balance or
/// when it is the last scheduled period; that payment is the balance plus its
/// interest.
fn simulate_schedule(
    principal: Decimal,
    rate: Decimal,
    periods: u32,
    payment: Decimal,
    extra: Decimal,
    start_period: u32,
    max_iterations: u32,
) -> Result<(Decimal, u32)> {
    let mut balance = principal;
    let mut total_paid = Decimal::ZERO;

    for period in 1..=max_iterations {
        let interest = balance * rate;
        let mut principal_part = payment - interest;
        let mut outflow = payment;

        if period >= start_period {
            principal_part += extra;
            outflow += extra;
        }

        if principal_part >= balance || period >= periods {
            total_paid += balance + interest;
            return Ok((total_paid, period));
        }

        balance -= principal_part;
        total_paid += outflow;
    }

    Err(BotError::Simulation(format!(
        "schedule not settled after {} iterations",
        max_iterations
    )))
}

struct RateSolution {
    rate: Decimal,
    converged: bool,
    iterations: u32,
}

/// Refine a periodic rate until the annuity payment it implies matches `payment`.
///
/// Each step moves the rate by the payment discrepancy divided by the local
/// slope of the payment curve. Without convergence the closest estimate seen
/// is returned.
fn solve_periodic_rate(price: Decimal, payment: Decimal, periods: u32) -> RateSolution {
    let mut rate = SOLVER_INITIAL_RATE;
    let mut best_rate = rate;
    let mut best_gap: Option<Decimal> = None;
    let mut iterations = 0;

    while iterations < SOLVER_MAX_ITERATIONS {
        iterations += 1;

        let Some(implied) = annuity(price, rate, periods) else {
            break;
        };
        let gap = implied - payment;

        if best_gap.map_or(true, |best| gap.abs() < best) {
            best_gap = Some(gap.abs());
            best_rate = rate;
        }

        if gap.abs() < SOLVER_TOLERANCE {
            return RateSolution {
                rate,
                converged: true,
                iterations,
            };
        }

        let Some(bumped) = annuity(price, rate + SLOPE_STEP, periods) else {
            break;
        };
        let Some(slope) = (bumped - implied).checked_div(SLOPE_STEP) else {
            break;
        };
        if slope <= Decimal::ZERO {
            break;
        }
        let Some(correction) = gap.checked_div(slope) else {
            break;
        };

        let Some(next) = rate.checked_sub(correction) else {
            break;
        };
        rate = if next <= SOLVER_RATE_FLOOR {
            (rate + SOLVER_RATE_FLOOR) / dec!(2)
        } else if next >= SOLVER_RATE_CEILING {
            (rate + SOLVER_RATE_CEILING) / dec!(2)
        } else {
            next
        };
    }

    RateSolution {
        rate: best_rate,
        converged: false,
        iterations,
    }
}

/// Real cost of buying at `cash_price` with `num_payments` installments of `payment`.
pub fn implied_rate_and_cost(
    cash_price: Decimal,
    payment: Decimal,
    num_payments: u32,
    periods_per_year: u32,
) -> Result<InstallmentCost> {
    if cash_price <= Decimal::ZERO || payment <= Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The price and the installment must be greater than zero.".to_string(),
        ));
    }
    if cash_price > MAX_AMOUNT || payment > MAX_AMOUNT {
        return Err(BotError::InvalidInput(
            "That amount is too large to calculate.".to_string(),
        ));
    }
    if num_payments == 0 || periods_per_year == 0 {
        return Err(BotError::InvalidInput(
            "The number of payments must be greater than zero.".to_string(),
        ));
    }
    if num_payments > MAX_TERM {
        return Err(BotError::InvalidInput(format!(
            "The number of payments can be at most {}.",
            MAX_TERM
        )));
    }

    let total_paid = payment * Decimal::from(num_payments);
    let total_interest = total_paid - cash_price;

    let solution = solve_periodic_rate(cash_price, payment, num_payments);
    if !solution.converged {
        debug!(
            iterations = solution.iterations,
            "Rate solver stopped without converging, using best estimate"
        );
    }

    // None when compounding over a year leaves Decimal range
    let annual_rate_pct = (Decimal::ONE + solution.rate)
        .checked_powi(i64::from(periods_per_year))
        .and_then(|growth| (growth - Decimal::ONE).checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(2));
    if annual_rate_pct.is_none() {
        debug!(
            periodic_rate = %solution.rate,
            periods_per_year,
            "Annualized rate out of range"
        );
    }

    Ok(InstallmentCost {
        total_paid: total_paid.round_dp(2),
        total_interest: total_interest.round_dp(2),
        periodic_rate: solution.rate,
        periodic_rate_pct: (solution.rate * Decimal::ONE_HUNDRED).round_dp(2),
        annual_rate_pct,
        converged: solution.converged,
        iterations: solution.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn test_fixed_payment_reference_loan() {
        let payment = fixed_payment(dec!(100000), dec!(0.025), 12).unwrap();
        assert_eq!(payment, dec!(9748.71));
    }

    #[test]
    fn test_loan_quote_reference_loan() {
        let quote = loan_quote(dec!(100000), dec!(0.025), 12).unwrap();
        assert_eq!(quote.payment, dec!(9748.71));
        assert_eq!(quote.total_paid, dec!(116984.52));
        assert_eq!(quote.total_interest, dec!(16984.52));
        assert_eq!(quote.total_paid, quote.payment * Decimal::from(12));
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        assert_eq!(fixed_payment(dec!(1200), Decimal::ZERO, 12).unwrap(), dec!(100));
        let quote = loan_quote(dec!(1200), Decimal::ZERO, 12).unwrap();
        assert_eq!(quote.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_loans_rejected() {
        let cases = vec![
            (Decimal::ZERO, dec!(0.02), 12),
            (dec!(-5), dec!(0.02), 12),
            (dec!(1000), dec!(0.02), 0),
            (dec!(1000), dec!(-0.01), 12),
            (dec!(1000), dec!(1.5), 12),
            (dec!(1000), dec!(0.02), MAX_TERM + 1),
        ];

        for (principal, rate, periods) in cases {
            assert!(matches!(
                fixed_payment(principal, rate, periods),
                Err(BotError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_extra_payment_from_first_period_lowers_total() {
        let savings =
            extra_payment_savings(dec!(100000), dec!(0.025), 12, dec!(500), 1).unwrap();

        assert_eq!(savings.total_without_extra, dec!(116984.52));
        assert!(savings.total_with_extra < savings.total_without_extra);
        assert_close(savings.total_saved, dec!(897.74), dec!(0.05));
        assert_eq!(
            savings.total_saved,
            savings.total_without_extra - savings.total_with_extra
        );
    }

    #[test]
    fn test_large_extra_payment_shortens_schedule() {
        let savings =
            extra_payment_savings(dec!(100000), dec!(0.025), 12, dec!(5000), 4).unwrap();

        assert_eq!(savings.periods_paid, 9);
        assert_eq!(savings.periods_saved, 3);
        assert_close(savings.total_saved, dec!(3342.24), dec!(0.05));
    }

    #[test]
    fn test_extra_payment_covering_balance_settles_in_one_period() {
        let savings =
            extra_payment_savings(dec!(1000), dec!(0.01), 10, dec!(5000), 1).unwrap();

        assert_eq!(savings.periods_paid, 1);
        assert_eq!(savings.periods_saved, 9);
        assert_eq!(savings.total_with_extra, dec!(1010.00));
    }

    #[test]
    fn test_extra_payment_validation() {
        assert!(matches!(
            extra_payment_savings(dec!(1000), dec!(0.01), 10, Decimal::ZERO, 1),
            Err(BotError::InvalidInput(_))
        ));
        assert!(matches!(
            extra_payment_savings(dec!(1000), dec!(0.01), 10, dec!(50), 0),
            Err(BotError::InvalidInput(_))
        ));
        assert!(matches!(
            extra_payment_savings(dec!(1000), dec!(0.01), 10, dec!(50), 11),
            Err(BotError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_store_purchase_rate() {
        let cost = implied_rate_and_cost(dec!(1800), dec!(250), 10, 12).unwrap();

        assert!(cost.converged);
        assert_eq!(cost.total_paid, dec!(2500.00));
        assert_eq!(cost.total_interest, dec!(700.00));
        assert_eq!(cost.periodic_rate_pct, dec!(6.47));
        assert_eq!(cost.annual_rate_pct, Some(dec!(112.12)));
    }

    #[test]
    fn test_interest_free_purchase_has_zero_rate() {
        let cost = implied_rate_and_cost(dec!(1200), dec!(100), 12, 12).unwrap();

        assert!(cost.converged);
        assert_eq!(cost.total_interest, Decimal::ZERO);
        assert_eq!(cost.periodic_rate_pct, Decimal::ZERO);
        assert_eq!(cost.annual_rate_pct, Some(Decimal::ZERO));
    }

    #[test]
    fn test_weekly_purchase_annualizes_with_52_periods() {
        let cost = implied_rate_and_cost(dec!(5000), dec!(600), 52, 52).unwrap();

        assert!(cost.converged);
        assert_eq!(cost.periodic_rate_pct, dec!(11.97));
        assert!(cost.annual_rate_pct.unwrap() > dec!(10000));
    }

    #[test]
    fn test_extra_payment_in_last_period_never_shows_a_loss() {
        // The quoted payment is rounded down here, so the exact schedule costs
        // a few cents more than payment x periods.
        let savings =
            extra_payment_savings(dec!(100000), dec!(0.025), 12, dec!(1), 12).unwrap();

        assert_eq!(savings.total_saved, Decimal::ZERO);
        assert_eq!(savings.total_with_extra, savings.total_without_extra);
        assert_eq!(savings.periods_saved, 0);
    }

    #[test]
    fn test_schedule_that_cannot_settle_is_a_simulation_error() {
        let payment = annuity_payment(dec!(100000), dec!(0.025), 12).unwrap();
        let result = simulate_schedule(dec!(100000), dec!(0.025), 12, payment, dec!(500), 1, 6);

        assert!(matches!(result, Err(BotError::Simulation(_))));

        let (total, periods) =
            simulate_schedule(dec!(100000), dec!(0.025), 12, payment, dec!(500), 1, 13).unwrap();
        assert_eq!(periods, 12);
        assert!(total > dec!(100000));
    }

    #[test]
    fn test_unannualizable_rate_still_reports_cost() {
        // One weekly installment of 500 for a 100 price: 400% per period.
        let cost = implied_rate_and_cost(dec!(100), dec!(500), 1, 52).unwrap();

        assert!(cost.converged);
        assert_eq!(cost.total_paid, dec!(500));
        assert_eq!(cost.total_interest, dec!(400));
        assert_close(cost.periodic_rate_pct, dec!(400), dec!(0.01));
        assert_eq!(cost.annual_rate_pct, None);
    }

    #[test]
    fn test_installment_validation() {
        assert!(implied_rate_and_cost(Decimal::ZERO, dec!(100), 12, 12).is_err());
        assert!(implied_rate_and_cost(dec!(1000), Decimal::ZERO, 12, 12).is_err());
        assert!(implied_rate_and_cost(dec!(1000), dec!(100), 0, 12).is_err());
        assert!(implied_rate_and_cost(dec!(1000), dec!(100), 12, 0).is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_total_paid_covers_principal(
            principal_cents in 100_000u64..100_000_000,
            rate_bp in 1u32..2_000,
            periods in 1u32..360,
        ) {
            let principal = Decimal::new(principal_cents as i64, 2);
            let rate = Decimal::new(i64::from(rate_bp), 4);
            let payment = fixed_payment(principal, rate, periods).unwrap();
            prop_assert!(payment * Decimal::from(periods) >= principal);
        }

        #[test]
        fn prop_zero_rate_divides_evenly(
            installment_cents in 1u64..1_000_000,
            periods in 1u32..360,
        ) {
            let principal = Decimal::new((installment_cents * u64::from(periods)) as i64, 2);
            let payment = fixed_payment(principal, Decimal::ZERO, periods).unwrap();
            prop_assert!(payment == principal / Decimal::from(periods));
        }

        #[test]
        fn prop_extra_payments_never_cost_more(
            principal_units in 1_000u64..2_000_000,
            rate_bp in 1u32..500,
            periods in 2u32..240,
            extra_units in 1u64..5_000,
            start_seed in 0u32..1_000,
        ) {
            let start_period = 1 + start_seed % periods;
            let savings = extra_payment_savings(
                Decimal::from(principal_units),
                Decimal::new(i64::from(rate_bp), 4),
                periods,
                Decimal::from(extra_units),
                start_period,
            ).unwrap();

            prop_assert!(savings.total_saved >= Decimal::ZERO);
            prop_assert!(savings.periods_paid <= periods);
            prop_assert!(savings.periods_saved == periods - savings.periods_paid);
        }

        #[test]
        fn prop_implied_rate_round_trips(
            price_units in 100u64..100_000,
            rate_bp in 0u32..800,
            periods in 1u32..120,
        ) {
            let price = Decimal::from(price_units);
            let rate = Decimal::new(i64::from(rate_bp), 4);
            let payment = fixed_payment(price, rate, periods).unwrap();

            let cost = implied_rate_and_cost(price, payment, periods, 12).unwrap();
            prop_assert!(cost.converged);

            let reproduced = annuity(price, cost.periodic_rate, periods).unwrap();
            prop_assert!((reproduced - payment).abs() < SOLVER_TOLERANCE);
            let rounded = fixed_payment(price, cost.periodic_rate.max(Decimal::ZERO), periods);
            if let Ok(rounded) = rounded {
                prop_assert!((rounded - payment).abs() <= dec!(0.01));
            }
        }
    }
}
