//! Conversation state machine
//!
//! `advance` is pure: it takes the current state and the raw message and
//! returns the next state, the reply and what happened. Every variant carries
//! exactly the answers captured so far, so a state can never be missing a slot
//! it needs.

use crate::conversation::keywords::{self, MenuOption};
use crate::conversation::replies;
use crate::engine::{self, amortization::MAX_AMOUNT, MAX_TERM};
use crate::error::BotError;
use crate::models::{CapacityProfile, LoanTerms, PaymentFrequency, RiskTier};
use crate::numeric;
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

//
// ================= States =================
//

/// What a captured loan is used for once amount, term and rate are known.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LoanPurpose {
    Simulate,
    ExtraSavings,
    ApprovalCheck(CapacityProfile),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LoanEntryStep {
    Amount,
    Term { amount: Decimal },
    Rate { amount: Decimal, term: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ExtraPaymentStep {
    Offer(LoanTerms),
    Amount(LoanTerms),
    StartPeriod { loan: LoanTerms, extra: Decimal },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum InstallmentStep {
    CashPrice,
    Payment {
        cash_price: Decimal,
    },
    Count {
        cash_price: Decimal,
        payment: Decimal,
    },
    Frequency {
        cash_price: Decimal,
        payment: Decimal,
        count: u32,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CapacityStep {
    Income,
    FixedPayments {
        income: Decimal,
    },
    RevolvingDebt {
        income: Decimal,
        fixed_payments: Decimal,
    },
    RiskTier {
        income: Decimal,
        fixed_payments: Decimal,
        revolving_debt: Decimal,
    },
    Choice(CapacityProfile),
    MaxLoanTerm(CapacityProfile),
    MaxLoanRate {
        profile: CapacityProfile,
        term: u32,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    LoanEntry {
        purpose: LoanPurpose,
        step: LoanEntryStep,
    },
    ExtraPayment(ExtraPaymentStep),
    Installment(InstallmentStep),
    Capacity(CapacityStep),
    CreditReportOffer,
}

/// Kind of answer a state waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Amount,
    Count,
    Rate,
    Choice,
    YesNo,
}

impl InputKind {
    fn lead(self) -> &'static str {
        match self {
            InputKind::Amount => replies::LEAD_AMOUNT,
            InputKind::Count => replies::LEAD_COUNT,
            InputKind::Rate => replies::LEAD_RATE,
            InputKind::Choice => replies::LEAD_CHOICE,
            InputKind::YesNo => replies::LEAD_YES_NO,
        }
    }
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// States where global keywords and menu titles are not honored.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            SessionState::Capacity(CapacityStep::RiskTier { .. })
                | SessionState::ExtraPayment(ExtraPaymentStep::StartPeriod { .. })
                | SessionState::Installment(InstallmentStep::Frequency { .. })
        )
    }

    /// Stable name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::LoanEntry { step, .. } => match step {
                LoanEntryStep::Amount => "loan.amount",
                LoanEntryStep::Term { .. } => "loan.term",
                LoanEntryStep::Rate { .. } => "loan.rate",
            },
            SessionState::ExtraPayment(step) => match step {
                ExtraPaymentStep::Offer(_) => "extra.offer",
                ExtraPaymentStep::Amount(_) => "extra.amount",
                ExtraPaymentStep::StartPeriod { .. } => "extra.start_period",
            },
            SessionState::Installment(step) => match step {
                InstallmentStep::CashPrice => "installment.cash_price",
                InstallmentStep::Payment { .. } => "installment.payment",
                InstallmentStep::Count { .. } => "installment.count",
                InstallmentStep::Frequency { .. } => "installment.frequency",
            },
            SessionState::Capacity(step) => match step {
                CapacityStep::Income => "capacity.income",
                CapacityStep::FixedPayments { .. } => "capacity.fixed_payments",
                CapacityStep::RevolvingDebt { .. } => "capacity.revolving_debt",
                CapacityStep::RiskTier { .. } => "capacity.risk_tier",
                CapacityStep::Choice(_) => "capacity.choice",
                CapacityStep::MaxLoanTerm(_) => "capacity.max_loan_term",
                CapacityStep::MaxLoanRate { .. } => "capacity.max_loan_rate",
            },
            SessionState::CreditReportOffer => "credit_report.offer",
        }
    }

    pub fn expects(&self) -> Option<InputKind> {
        let kind = match self {
            SessionState::Idle => return None,
            SessionState::LoanEntry { step, .. } => match step {
                LoanEntryStep::Amount => InputKind::Amount,
                LoanEntryStep::Term { .. } => InputKind::Count,
                LoanEntryStep::Rate { .. } => InputKind::Rate,
            },
            SessionState::ExtraPayment(step) => match step {
                ExtraPaymentStep::Offer(_) => InputKind::YesNo,
                ExtraPaymentStep::Amount(_) => InputKind::Amount,
                ExtraPaymentStep::StartPeriod { .. } => InputKind::Count,
            },
            SessionState::Installment(step) => match step {
                InstallmentStep::CashPrice
                | InstallmentStep::Payment { .. } => InputKind::Amount,
                InstallmentStep::Count { .. } => InputKind::Count,
                InstallmentStep::Frequency { .. } => InputKind::Choice,
            },
            SessionState::Capacity(step) => match step {
                CapacityStep::Income
                | CapacityStep::FixedPayments { .. }
                | CapacityStep::RevolvingDebt { .. } => InputKind::Amount,
                CapacityStep::RiskTier { .. } | CapacityStep::Choice(_) => InputKind::Choice,
                CapacityStep::MaxLoanTerm(_) => InputKind::Count,
                CapacityStep::MaxLoanRate { .. } => InputKind::Rate,
            },
            SessionState::CreditReportOffer => InputKind::YesNo,
        };
        Some(kind)
    }

    /// The question this state is waiting on.
    pub fn prompt(&self) -> String {
        match self {
            SessionState::Idle => "Type *menu* to see the available options.".to_string(),
            SessionState::LoanEntry { purpose, step } => match step {
                LoanEntryStep::Amount => match purpose {
                    LoanPurpose::ApprovalCheck(_) => {
                        "💰 What loan amount would you like to apply for? (e.g. 100000)".to_string()
                    }
                    _ => "💰 What is the loan amount? (e.g. 100000)".to_string(),
                },
                LoanEntryStep::Term { .. } => {
                    "📆 In how many periods (payments) would you pay it? (e.g. 12)".to_string()
                }
                LoanEntryStep::Rate { .. } => {
                    "📈 What is the interest rate per period? (e.g. 0.025 or 2.5%)".to_string()
                }
            },
            SessionState::ExtraPayment(step) => match step {
                ExtraPaymentStep::Offer(_) => {
                    "Would you like to see how much you'd save by paying extra to principal? (yes/no)"
                        .to_string()
                }
                ExtraPaymentStep::Amount(_) => {
                    "💵 How much extra would you pay each period? (e.g. 500)".to_string()
                }
                ExtraPaymentStep::StartPeriod { loan, .. } => format!(
                    "🗓️ From which period would you start paying extra? (1 to {})",
                    loan.term
                ),
            },
            SessionState::Installment(step) => match step {
                InstallmentStep::CashPrice => {
                    "💰 What is the cash price of the product? (e.g. 1800)".to_string()
                }
                InstallmentStep::Payment { .. } => {
                    "💳 How much is each installment? (e.g. 250)".to_string()
                }
                InstallmentStep::Count { .. } => {
                    "🔢 How many installments would you pay? (e.g. 10)".to_string()
                }
                InstallmentStep::Frequency { .. } => {
                    "📅 How often are the installments paid?\n1️⃣ Monthly\n2️⃣ Biweekly\n3️⃣ Weekly"
                        .to_string()
                }
            },
            SessionState::Capacity(step) => match step {
                CapacityStep::Income => {
                    "💵 What is your net monthly income? (e.g. 12500)".to_string()
                }
                CapacityStep::FixedPayments { .. } => {
                    "💳 How much do you pay each month on fixed credit payments \
                     (personal loans, car, mortgage)? Type 0 if none."
                        .to_string()
                }
                CapacityStep::RevolvingDebt { .. } => {
                    "🧾 What is the total balance of your revolving debt (credit cards)? \
                     Type 0 if none."
                        .to_string()
                }
                CapacityStep::RiskTier { .. } => {
                    "📊 How would you describe your credit profile?\n\
                     1️⃣ Low risk (stable income, always on time)\n\
                     2️⃣ Medium risk\n\
                     3️⃣ High risk (variable income or late payments)"
                        .to_string()
                }
                CapacityStep::Choice(_) => "What would you like to do now?\n\
                     1️⃣ See the maximum loan I could get\n\
                     2️⃣ Check whether I can afford a specific loan"
                    .to_string(),
                CapacityStep::MaxLoanTerm(_) => {
                    "📆 Over how many months would you pay the loan? (e.g. 24)".to_string()
                }
                CapacityStep::MaxLoanRate { .. } => {
                    "📈 What monthly interest rate do you expect? (e.g. 0.025 or 2.5%)".to_string()
                }
            },
            SessionState::CreditReportOffer => {
                "Would you like some tips to improve your credit history? (yes/no)".to_string()
            }
        }
    }
}

//
// ================= Transitions =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    MenuShown,
    FlowStarted,
    Advanced,
    Completed,
    Declined,
    StaticContent,
    Reprompted,
    NotUnderstood,
    CalculationFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionState,
    pub reply: String,
    pub event: FlowEvent,
}

impl Transition {
    fn new(next: SessionState, reply: impl Into<String>, event: FlowEvent) -> Self {
        Self {
            next,
            reply: reply.into(),
            event,
        }
    }

    /// Move to `next` and ask its question.
    fn ask(next: SessionState) -> Self {
        let reply = next.prompt();
        Self::new(next, reply, FlowEvent::Advanced)
    }

    fn finish(reply: impl Into<String>) -> Self {
        Self::new(SessionState::Idle, reply, FlowEvent::Completed)
    }
}

/// Compute the reply and next state for one inbound message.
pub fn advance(state: &SessionState, raw: &str) -> Transition {
    let text = keywords::normalize(raw);

    if keywords::is_global(&text) {
        if state.is_critical() {
            return recover(
                state,
                BotError::InvalidInput(
                    "Let's finish this step first, then you can type *menu*.".to_string(),
                ),
            );
        }
        return Transition::new(SessionState::Idle, replies::MAIN_MENU, FlowEvent::MenuShown);
    }

    if !state.is_critical() {
        if let Some(option) = MenuOption::recognize(&text, state.is_idle()) {
            return start(option);
        }
    }

    step(state, raw, &text).unwrap_or_else(|err| recover(state, err))
}

fn start(option: MenuOption) -> Transition {
    let (next, intro) = match option {
        MenuOption::SimulateLoan => (
            SessionState::LoanEntry {
                purpose: LoanPurpose::Simulate,
                step: LoanEntryStep::Amount,
            },
            replies::INTRO_SIMULATE.to_string(),
        ),
        MenuOption::ExtraPayments => (
            SessionState::LoanEntry {
                purpose: LoanPurpose::ExtraSavings,
                step: LoanEntryStep::Amount,
            },
            replies::INTRO_EXTRA_PAYMENTS.to_string(),
        ),
        MenuOption::StoreInstallments => (
            SessionState::Installment(InstallmentStep::CashPrice),
            replies::INTRO_INSTALLMENTS.to_string(),
        ),
        MenuOption::BorrowingCapacity => (
            SessionState::Capacity(CapacityStep::Income),
            replies::INTRO_CAPACITY.to_string(),
        ),
        MenuOption::CreditReport => (SessionState::CreditReportOffer, replies::credit_report()),
        MenuOption::PayoffTips => return static_content(replies::payoff_tips()),
        MenuOption::ExpensiveCredit => return static_content(replies::expensive_credit()),
        MenuOption::CommonMistakes => return static_content(replies::common_mistakes()),
    };

    let reply = format!("{}\n\n{}", intro, next.prompt());
    Transition::new(next, reply, FlowEvent::FlowStarted)
}

fn static_content(text: String) -> Transition {
    Transition::new(SessionState::Idle, text, FlowEvent::StaticContent)
}

fn step(state: &SessionState, raw: &str, text: &str) -> Result<Transition> {
    match *state {
        SessionState::Idle => idle(text),
        SessionState::LoanEntry { purpose, step } => loan_entry(purpose, step, raw),
        SessionState::ExtraPayment(step) => extra_payment(step, raw, text),
        SessionState::Installment(step) => installment(step, raw, text),
        SessionState::Capacity(step) => capacity(step, raw, text),
        SessionState::CreditReportOffer => {
            if keywords::is_affirmative(text) {
                Ok(Transition::finish(replies::score_tips()))
            } else if keywords::is_negative(text) {
                Ok(Transition::new(
                    SessionState::Idle,
                    replies::CREDIT_REPORT_DECLINED,
                    FlowEvent::Declined,
                ))
            } else {
                Err(BotError::UnknownInput(text.to_string()))
            }
        }
    }
}

fn idle(text: &str) -> Result<Transition> {
    let Some(command) = keywords::inline_simulation(text) else {
        return Err(BotError::UnknownInput(text.to_string()));
    };

    let quote = command.and_then(|loan| engine::loan_quote(loan.amount, loan.rate, loan.term));
    match quote {
        Ok(quote) => Ok(Transition::finish(replies::inline_quote(&quote))),
        Err(BotError::InvalidInput(reason)) => Ok(Transition::new(
            SessionState::Idle,
            format!("⚠️ {}\n\n{}", reason, replies::INLINE_USAGE),
            FlowEvent::NotUnderstood,
        )),
        Err(BotError::Parse(detail)) => {
            debug!(detail = %detail, "Inline simulation command not understood");
            Ok(Transition::new(
                SessionState::Idle,
                replies::INLINE_USAGE,
                FlowEvent::NotUnderstood,
            ))
        }
        Err(e) => Err(e),
    }
}

fn loan_entry(purpose: LoanPurpose, step: LoanEntryStep, raw: &str) -> Result<Transition> {
    let entry = |step| SessionState::LoanEntry { purpose, step };

    match step {
        LoanEntryStep::Amount => {
            let amount = positive_amount(raw)?;
            Ok(Transition::ask(entry(LoanEntryStep::Term { amount })))
        }
        LoanEntryStep::Term { amount } => {
            let term = period_count(raw)?;
            Ok(Transition::ask(entry(LoanEntryStep::Rate { amount, term })))
        }
        LoanEntryStep::Rate { amount, term } => {
            let rate = numeric::parse_rate(raw)?;
            finish_loan_entry(purpose, LoanTerms { amount, rate, term })
        }
    }
}

fn finish_loan_entry(purpose: LoanPurpose, loan: LoanTerms) -> Result<Transition> {
    match purpose {
        LoanPurpose::Simulate | LoanPurpose::ExtraSavings => {
            let quote = engine::loan_quote(loan.amount, loan.rate, loan.term)?;
            let next = if purpose == LoanPurpose::Simulate {
                SessionState::ExtraPayment(ExtraPaymentStep::Offer(loan))
            } else {
                SessionState::ExtraPayment(ExtraPaymentStep::Amount(loan))
            };
            let reply = format!("{}\n\n{}", replies::loan_quote(&quote), next.prompt());
            Ok(Transition::new(next, reply, FlowEvent::Advanced))
        }
        LoanPurpose::ApprovalCheck(profile) => {
            let verdict = engine::affordability_check(
                loan.amount,
                loan.rate,
                loan.term,
                profile.capacity,
                profile.tier.factor(),
            )?;
            Ok(Transition::finish(replies::verdict(&verdict)))
        }
    }
}

fn extra_payment(step: ExtraPaymentStep, raw: &str, text: &str) -> Result<Transition> {
    match step {
        ExtraPaymentStep::Offer(loan) => {
            if keywords::is_affirmative(text) {
                Ok(Transition::ask(SessionState::ExtraPayment(
                    ExtraPaymentStep::Amount(loan),
                )))
            } else if keywords::is_negative(text) {
                Ok(Transition::new(
                    SessionState::Idle,
                    replies::EXTRA_DECLINED,
                    FlowEvent::Declined,
                ))
            } else {
                Err(BotError::UnknownInput(text.to_string()))
            }
        }
        ExtraPaymentStep::Amount(loan) => {
            let extra = positive_amount(raw)?;
            Ok(Transition::ask(SessionState::ExtraPayment(
                ExtraPaymentStep::StartPeriod { loan, extra },
            )))
        }
        ExtraPaymentStep::StartPeriod { loan, extra } => {
            let start = numeric::parse_count(raw)?;
            let savings =
                engine::extra_payment_savings(loan.amount, loan.rate, loan.term, extra, start)?;
            Ok(Transition::finish(replies::extra_savings(extra, start, &savings)))
        }
    }
}

fn installment(step: InstallmentStep, raw: &str, text: &str) -> Result<Transition> {
    let next = match step {
        InstallmentStep::CashPrice => InstallmentStep::Payment {
            cash_price: positive_amount(raw)?,
        },
        InstallmentStep::Payment { cash_price } => InstallmentStep::Count {
            cash_price,
            payment: positive_amount(raw)?,
        },
        InstallmentStep::Count {
            cash_price,
            payment,
        } => InstallmentStep::Frequency {
            cash_price,
            payment,
            count: period_count(raw)?,
        },
        InstallmentStep::Frequency {
            cash_price,
            payment,
            count,
        } => {
            let frequency = PaymentFrequency::from_choice(text)
                .ok_or_else(|| BotError::UnknownInput(text.to_string()))?;
            let cost = engine::implied_rate_and_cost(
                cash_price,
                payment,
                count,
                frequency.periods_per_year(),
            )?;
            return Ok(Transition::finish(replies::installment_cost(
                cash_price, payment, count, frequency, &cost,
            )));
        }
    };

    Ok(Transition::ask(SessionState::Installment(next)))
}

fn capacity(step: CapacityStep, raw: &str, text: &str) -> Result<Transition> {
    let next = match step {
        CapacityStep::Income => CapacityStep::FixedPayments {
            income: positive_amount(raw)?,
        },
        CapacityStep::FixedPayments { income } => CapacityStep::RevolvingDebt {
            income,
            fixed_payments: non_negative_amount(raw)?,
        },
        CapacityStep::RevolvingDebt {
            income,
            fixed_payments,
        } => CapacityStep::RiskTier {
            income,
            fixed_payments,
            revolving_debt: non_negative_amount(raw)?,
        },
        CapacityStep::RiskTier {
            income,
            fixed_payments,
            revolving_debt,
        } => {
            let tier = RiskTier::from_choice(text)
                .ok_or_else(|| BotError::UnknownInput(text.to_string()))?;
            let capacity = engine::monthly_capacity(income, fixed_payments, revolving_debt, tier);
            let summary = replies::capacity_summary(capacity);

            if capacity <= Decimal::ZERO {
                return Ok(Transition::finish(format!(
                    "{}\n\nType *menu* to go back to the start.",
                    summary
                )));
            }

            let next = SessionState::Capacity(CapacityStep::Choice(CapacityProfile { capacity, tier }));
            let reply = format!("{}\n\n{}", summary, next.prompt());
            return Ok(Transition::new(next, reply, FlowEvent::Advanced));
        }
        CapacityStep::Choice(profile) => match text {
            "1" => CapacityStep::MaxLoanTerm(profile),
            "2" => {
                return Ok(Transition::ask(SessionState::LoanEntry {
                    purpose: LoanPurpose::ApprovalCheck(profile),
                    step: LoanEntryStep::Amount,
                }))
            }
            _ => return Err(BotError::UnknownInput(text.to_string())),
        },
        CapacityStep::MaxLoanTerm(profile) => CapacityStep::MaxLoanRate {
            profile,
            term: period_count(raw)?,
        },
        CapacityStep::MaxLoanRate { profile, term } => {
            let rate = numeric::parse_rate(raw)?;
            let amount = engine::max_loan_amount(profile.capacity, rate, term)?;
            return Ok(Transition::finish(replies::max_loan(profile.capacity, amount)));
        }
    };

    Ok(Transition::ask(SessionState::Capacity(next)))
}

/// Map a failed step to a reply. Only calculation failures leave the flow.
fn recover(state: &SessionState, err: BotError) -> Transition {
    if !err.is_recoverable() {
        debug!(state = state.label(), error = %err, "Calculation failed, leaving flow");
        return Transition::new(
            SessionState::Idle,
            replies::CALCULATION_FAILED,
            FlowEvent::CalculationFailed,
        );
    }

    let lead = state.expects().map(InputKind::lead).unwrap_or_default();
    let reason = match err {
        BotError::Parse(detail) => {
            debug!(state = state.label(), detail = %detail, "Answer did not parse");
            format!("⚠️ I couldn't read that value. {}", lead)
        }
        BotError::InvalidInput(reason) => format!("⚠️ {}", reason),
        _ if state.is_idle() => {
            return Transition::new(
                SessionState::Idle,
                replies::NOT_UNDERSTOOD,
                FlowEvent::NotUnderstood,
            )
        }
        _ => lead.to_string(),
    };

    reprompt(state, reason)
}

fn reprompt(state: &SessionState, reason: String) -> Transition {
    let reply = format!("{}\n\n{}", reason, state.prompt());
    Transition::new(*state, reply, FlowEvent::Reprompted)
}

//
// ================= Answer helpers =================
//

fn positive_amount(raw: &str) -> Result<Decimal> {
    let value = numeric::parse_amount(raw)?;
    if value <= Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The amount must be greater than zero.".to_string(),
        ));
    }
    within_limit(value)
}

fn non_negative_amount(raw: &str) -> Result<Decimal> {
    let value = numeric::parse_amount(raw)?;
    if value < Decimal::ZERO {
        return Err(BotError::InvalidInput(
            "The amount can't be negative. Type 0 if you have none.".to_string(),
        ));
    }
    within_limit(value)
}

fn within_limit(value: Decimal) -> Result<Decimal> {
    if value > MAX_AMOUNT {
        return Err(BotError::InvalidInput(
            "That amount is too large to calculate.".to_string(),
        ));
    }
    Ok(value)
}

fn period_count(raw: &str) -> Result<u32> {
    let count = numeric::parse_count(raw)?;
    if count == 0 || count > MAX_TERM {
        return Err(BotError::InvalidInput(format!(
            "The number of periods must be between 1 and {}.",
            MAX_TERM
        )));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Feed a sequence of messages from `state`, returning the last transition.
    fn run(mut state: SessionState, messages: &[&str]) -> Transition {
        let mut last = None;
        for message in messages {
            let transition = advance(&state, message);
            state = transition.next;
            last = Some(transition);
        }
        last.unwrap()
    }

    fn awaiting_term() -> SessionState {
        SessionState::LoanEntry {
            purpose: LoanPurpose::Simulate,
            step: LoanEntryStep::Term {
                amount: dec!(100000),
            },
        }
    }

    fn awaiting_risk_tier() -> SessionState {
        SessionState::Capacity(CapacityStep::RiskTier {
            income: dec!(12500),
            fixed_payments: dec!(1800),
            revolving_debt: dec!(3000),
        })
    }

    #[test]
    fn test_menu_keyword_resets_flow() {
        let t = advance(&awaiting_term(), "menu");

        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(t.event, FlowEvent::MenuShown);
        assert_eq!(t.reply, replies::MAIN_MENU);
    }

    #[test]
    fn test_menu_keyword_rejected_in_critical_state() {
        let state = awaiting_risk_tier();
        let t = advance(&state, "Menú");

        assert_eq!(t.next, state);
        assert_eq!(t.event, FlowEvent::Reprompted);
        assert!(t.reply.ends_with(&state.prompt()));
    }

    #[test]
    fn test_menu_titles_ignored_in_critical_state() {
        let state = awaiting_risk_tier();
        let t = advance(&state, "Simulate a loan");

        assert_eq!(t.next, state);
        assert_eq!(t.event, FlowEvent::Reprompted);
    }

    #[test]
    fn test_digit_starts_flow_only_when_idle() {
        let t = advance(&SessionState::Idle, "1");
        assert_eq!(t.event, FlowEvent::FlowStarted);
        assert!(matches!(
            t.next,
            SessionState::LoanEntry {
                purpose: LoanPurpose::Simulate,
                step: LoanEntryStep::Amount
            }
        ));

        // Inside a flow the same digit is an answer.
        let t = advance(&awaiting_term(), "1");
        assert_eq!(t.event, FlowEvent::Advanced);
        assert!(matches!(
            t.next,
            SessionState::LoanEntry {
                step: LoanEntryStep::Rate { term: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_menu_title_overwrites_unfinished_flow() {
        let t = advance(&awaiting_term(), "How much can I borrow?");

        assert_eq!(t.next, SessionState::Capacity(CapacityStep::Income));
        assert_eq!(t.event, FlowEvent::FlowStarted);
    }

    #[test]
    fn test_parse_failure_never_advances() {
        let state = awaiting_term();
        for answer in ["abc", "12.5", "", "1,000.5"] {
            let t = advance(&state, answer);
            assert_eq!(t.next, state, "answer {:?} should not advance", answer);
            assert_eq!(t.event, FlowEvent::Reprompted);
        }
    }

    #[test]
    fn test_invalid_input_shows_reason() {
        let t = advance(&awaiting_term(), "0");

        assert_eq!(t.next, awaiting_term());
        assert!(t.reply.contains("between 1 and 1200"));
    }

    #[test]
    fn test_idle_unknown_input() {
        let t = advance(&SessionState::Idle, "what's the weather");

        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(t.event, FlowEvent::NotUnderstood);
        assert_eq!(t.reply, replies::NOT_UNDERSTOOD);
    }

    #[test]
    fn test_simulate_loan_flow() {
        let t = run(SessionState::Idle, &["1", "100000", "12", "0.025"]);

        assert!(t.reply.contains("$9748.71"));
        assert!(t.reply.contains("$116984.52"));
        assert!(matches!(
            t.next,
            SessionState::ExtraPayment(ExtraPaymentStep::Offer(_))
        ));
    }

    #[test]
    fn test_simulate_then_extra_payments() {
        let t = run(
            SessionState::Idle,
            &["1", "100000", "12", "2.5%", "yes", "500"],
        );
        assert!(t.next.is_critical());

        let t = advance(&t.next, "1");
        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(t.event, FlowEvent::Completed);
        assert!(t.reply.contains("$116984.52"));
        assert!(t.reply.contains("You would pay"));
    }

    #[test]
    fn test_extra_payment_offer_declined() {
        let t = run(SessionState::Idle, &["1", "100000", "12", "0.025", "no"]);

        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(t.event, FlowEvent::Declined);
    }

    #[test]
    fn test_extra_payment_start_period_out_of_range() {
        let state = run(SessionState::Idle, &["2", "100000", "12", "0.025", "500"]).next;
        let t = advance(&state, "13");

        assert_eq!(t.next, state);
        assert!(t.reply.contains("between 1 and 12"));
    }

    #[test]
    fn test_installment_flow() {
        let t = run(SessionState::Idle, &["3", "1800", "250", "10", "1"]);

        assert_eq!(t.event, FlowEvent::Completed);
        assert!(t.reply.contains("$2500.00"));
        assert!(t.reply.contains("6.47%"));
    }

    #[test]
    fn test_installment_with_unannualizable_rate_completes() {
        let t = run(SessionState::Idle, &["3", "100", "500", "1", "3"]);

        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(t.event, FlowEvent::Completed);
        assert!(t.reply.contains("400.00%"));
        assert!(t.reply.contains("too high to express as a yearly rate"));
    }

    #[test]
    fn test_simulation_failure_leaves_flow() {
        let state = run(SessionState::Idle, &["2", "100000", "12", "0.025", "500"]).next;
        assert!(state.is_critical());

        let t = recover(
            &state,
            BotError::Simulation("schedule not settled after 13 iterations".to_string()),
        );

        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(t.event, FlowEvent::CalculationFailed);
        assert_eq!(t.reply, replies::CALCULATION_FAILED);
    }

    #[test]
    fn test_capacity_to_approval_check() {
        let t = run(SessionState::Idle, &["4", "12500", "1800", "3000", "2"]);
        assert!(t.reply.contains("$3645.00"));
        assert!(matches!(
            t.next,
            SessionState::Capacity(CapacityStep::Choice(_))
        ));

        let t = run(t.next, &["2", "100000", "24", "0.02"]);
        assert_eq!(t.next, SessionState::Idle);
        assert!(t.reply.contains("$5287.11"));
        assert!(t.reply.contains("$1642.11"));
    }

    #[test]
    fn test_capacity_to_max_loan() {
        let t = run(
            SessionState::Idle,
            &["4", "12500", "1800", "3000", "medium", "1", "24", "0.025"],
        );

        assert_eq!(t.event, FlowEvent::Completed);
        assert!(t.reply.contains("$65190.77"));
    }

    #[test]
    fn test_negative_capacity_ends_flow() {
        let t = run(SessionState::Idle, &["4", "1000", "1500", "0", "3"]);

        assert_eq!(t.next, SessionState::Idle);
        assert!(t.reply.contains("-$1200.00"));
    }

    #[test]
    fn test_static_content_stays_idle() {
        for option in ["5", "6", "7"] {
            let t = advance(&SessionState::Idle, option);
            assert_eq!(t.next, SessionState::Idle);
            assert_eq!(t.event, FlowEvent::StaticContent);
        }
    }

    #[test]
    fn test_credit_report_follow_up() {
        let t = advance(&SessionState::Idle, "8");
        assert_eq!(t.next, SessionState::CreditReportOffer);

        let t = advance(&t.next, "Sí");
        assert_eq!(t.reply, replies::score_tips());

        let t = advance(&SessionState::CreditReportOffer, "maybe");
        assert_eq!(t.next, SessionState::CreditReportOffer);
        assert_eq!(t.event, FlowEvent::Reprompted);
    }

    #[test]
    fn test_inline_simulation_command() {
        let t = advance(
            &SessionState::Idle,
            "simulate loan: amount=100000, term=12, rate=2.5%",
        );
        assert_eq!(t.event, FlowEvent::Completed);
        assert!(t.reply.contains("$9748.71"));

        let t = advance(&SessionState::Idle, "simulate loan: amount=100000");
        assert_eq!(t.event, FlowEvent::NotUnderstood);
        assert!(t.reply.contains("amount=100000, term=12"));
    }

    #[test]
    fn test_state_survives_serialization() {
        let state = run(SessionState::Idle, &["4", "12500", "1800", "3000", "2"]).next;
        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();

        assert_eq!(back, state);
    }
}
