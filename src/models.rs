//! Core data models for the credit literacy bot

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

/// Self-reported risk profile used to scale borrowing capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Share of net income that may go to credit payments.
    pub fn factor(self) -> Decimal {
        match self {
            RiskTier::Low => dec!(0.60),
            RiskTier::Medium => dec!(0.45),
            RiskTier::High => dec!(0.30),
        }
    }

    /// Accepts the menu digit or the tier name.
    pub fn from_choice(text: &str) -> Option<Self> {
        match text {
            "1" | "low" | "bajo" => Some(RiskTier::Low),
            "2" | "medium" | "medio" => Some(RiskTier::Medium),
            "3" | "high" | "alto" => Some(RiskTier::High),
            _ => None,
        }
    }
}

/// How often installments are paid, used to annualize a periodic rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Monthly,
    Biweekly,
    Weekly,
}

impl PaymentFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::Biweekly => 24,
            PaymentFrequency::Weekly => 52,
        }
    }

    pub fn from_choice(text: &str) -> Option<Self> {
        match text {
            "1" | "monthly" | "mensual" => Some(PaymentFrequency::Monthly),
            "2" | "biweekly" | "quincenal" => Some(PaymentFrequency::Biweekly),
            "3" | "weekly" | "semanal" => Some(PaymentFrequency::Weekly),
            _ => None,
        }
    }
}

//
// ================= Captured answers =================
//

/// A loan described by the user: principal, per-period rate and number of periods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoanTerms {
    pub amount: Decimal,
    pub rate: Decimal,
    pub term: u32,
}

/// Result of the capacity step, carried into the follow-up choices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CapacityProfile {
    pub capacity: Decimal,
    pub tier: RiskTier,
}

//
// ================= Engine results =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoanQuote {
    pub payment: Decimal,
    pub total_paid: Decimal,
    pub total_interest: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExtraPaymentSavings {
    pub total_without_extra: Decimal,
    pub total_with_extra: Decimal,
    pub total_saved: Decimal,
    pub periods_saved: u32,
    pub periods_paid: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InstallmentCost {
    pub total_paid: Decimal,
    pub total_interest: Decimal,
    /// Unrounded periodic rate as a fraction
    pub periodic_rate: Decimal,
    pub periodic_rate_pct: Decimal,
    /// `None` when the rate compounds past what `Decimal` can hold
    pub annual_rate_pct: Option<Decimal>,
    pub converged: bool,
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Approved {
        payment: Decimal,
        capacity: Decimal,
    },
    Rejected {
        payment: Decimal,
        capacity: Decimal,
        payment_gap: Decimal,
        income_increase_needed: Decimal,
        revolving_reduction_needed: Decimal,
    },
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved { .. })
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentFrequency::Monthly => "monthly",
            PaymentFrequency::Biweekly => "biweekly",
            PaymentFrequency::Weekly => "weekly",
        };
        write!(f, "{}", s)
    }
}
