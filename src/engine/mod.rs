//! Deterministic finance engines
//!
//! Pure functions over `Decimal`. The conversation layer calls these at the
//! terminal step of each flow; nothing here touches sessions or I/O.

pub mod affordability;
pub mod amortization;

pub use affordability::{affordability_check, max_loan_amount, monthly_capacity};
pub use amortization::{
    annuity_payment, extra_payment_savings, fixed_payment, implied_rate_and_cost, loan_quote,
    MAX_TERM,
};
