//! Reply texts
//!
//! Static educational content plus formatters for engine results. Amounts are
//! rounded to cents here, at the output boundary.

use crate::models::{ExtraPaymentSavings, InstallmentCost, LoanQuote, PaymentFrequency, Verdict};
use rust_decimal::Decimal;

pub const MAIN_MENU: &str = "👋 Hi! I'm your virtual financial education assistant.\n\
I'm here to help you understand how credit works and make informed decisions 💳📊\n\n\
What would you like help with today?\n\
Type the number or the name of one of these options to start:\n\n\
1️⃣ Simulate a loan\n\
2️⃣ See how much I save with extra payments\n\
3️⃣ Calculate the real cost of fixed-installment store purchases\n\
4️⃣ How much can I borrow?\n\
5️⃣ Tips for paying off a loan without drowning\n\
6️⃣ How to spot an expensive loan\n\
7️⃣ Common mistakes when applying for credit\n\
8️⃣ Understanding your credit report";

pub const NOT_UNDERSTOOD: &str =
    "I didn't understand your request. Type *menu* to see the available options.";

pub const CALCULATION_FAILED: &str = "⚠️ I couldn't complete the calculation. \
Please check your data and try again.\nType *menu* to go back to the start.";

pub const INTERNAL_ERROR: &str =
    "⚠️ Something went wrong on our side. Please try again in a moment or type *menu*.";

pub const EXTRA_DECLINED: &str =
    "Ok, we're back at the start. Type *menu* if you'd like to see other options.";

pub const CREDIT_REPORT_DECLINED: &str = "Understood. Type *menu* for more options.";

pub const INLINE_USAGE: &str = "I couldn't read the loan details 😕\n\
Please write them like this:\n\
simulate loan: amount=100000, term=12, rate=2.5%";

//
// ================= Flow intros =================
//

pub const INTRO_SIMULATE: &str = "Perfect. Let's simulate your loan.";

pub const INTRO_EXTRA_PAYMENTS: &str = "Let's see how much you save by paying extra to principal. \
First I need the details of the loan.";

pub const INTRO_INSTALLMENTS: &str = "Let's calculate the real cost of a fixed-installment purchase.\n\
Please tell me the following:";

pub const INTRO_CAPACITY: &str =
    "Let's calculate how much you could borrow, based on your ability to pay.\n\nFirst I need to know:";

//
// ================= Re-prompt leads =================
//

pub const LEAD_AMOUNT: &str = "Please type only the number, without symbols or spaces.";
pub const LEAD_COUNT: &str = "Please type a whole number.";
pub const LEAD_RATE: &str =
    "Please type the rate as a decimal number (0.025 or 2.5% for 2.5% per period).";
pub const LEAD_CHOICE: &str = "Please type one of the numbers listed.";
pub const LEAD_YES_NO: &str = "Please answer only *yes* or *no*.";

//
// ================= Static content =================
//

const SEPARATOR: &str = "________________________________________";

pub fn payoff_tips() -> String {
    [
        "🟡 *Tips for paying off a loan without drowning*",
        "Paying off a loan doesn't have to feel like an endless burden. Some simple tips:",
        SEPARATOR,
        "✅ 1. Make early payments when you can\n   - Paying a little extra saves interest and shortens the term.",
        SEPARATOR,
        "✅ 2. Automate your payments\n   - You avoid late payments and fees.",
        SEPARATOR,
        "✅ 3. Check whether you can switch to a better loan\n   - Ask about refinancing or transferring the debt.",
        SEPARATOR,
        "✅ 4. Keep a monthly budget\n   - Knowing your income and expenses helps you never miss a payment.",
        SEPARATOR,
        "✅ 5. Prioritize the most expensive debts\n   - Focus first on the ones with the highest rate.",
        SEPARATOR,
        "Want to simulate how much you could save with extra payments? Type *2*.\nType *menu* to go back.",
    ]
    .join("\n")
}

pub fn expensive_credit() -> String {
    [
        "🟡 *How to spot an expensive loan*",
        SEPARATOR,
        "🔍 1. Total annual cost\n   - Includes the interest rate, fees and charges.",
        SEPARATOR,
        "🔍 2. Hidden fees\n   - Origination, account management, late payments, etc.",
        SEPARATOR,
        "🔍 3. Variable interest rate\n   - It can rise with inflation and make the loan more expensive.",
        SEPARATOR,
        "🔍 4. Very low payment with a long term\n   - You end up paying a lot in interest.",
        SEPARATOR,
        "Watch out! If you don't clearly understand the total you'll pay, that's a red flag.\n\
         Type *menu* to go back.",
    ]
    .join("\n")
}

pub fn common_mistakes() -> String {
    [
        "🟡 *Common mistakes when applying for credit*",
        SEPARATOR,
        "❌ 1. Not knowing the total you'll pay\n   - Don't look only at the monthly payment.",
        SEPARATOR,
        "❌ 2. Borrowing more than you need\n   - A larger amount means more interest.",
        SEPARATOR,
        "❌ 3. Taking the first offer without comparing\n   - Lenders differ enormously.",
        SEPARATOR,
        "❌ 4. Not reading the whole contract\n   - That's where fees and penalties are.",
        SEPARATOR,
        "❌ 5. Using credit without a repayment plan\n   - Make a budget before you take it.",
        SEPARATOR,
        "Would you like to plan your loan better? Type *menu*.",
    ]
    .join("\n")
}

pub fn credit_report() -> String {
    [
        "🟡 *Understanding your credit report*",
        "The credit bureau isn't an enemy; it's a record of how you handle credit.",
        SEPARATOR,
        "📊 What is a credit bureau?\n   - A company that keeps your payment history.",
        SEPARATOR,
        "💡 Having a history isn't bad.\n   - In fact, if you've never had credit, your score will be empty.",
        SEPARATOR,
        "📈 Your behavior builds a score.\n   - On-time payments help you.\n   - Frequent late payments hurt you.",
        SEPARATOR,
        "❗ Being in the bureau doesn't mean being blacklisted.\n   - Records last for years and aren't easily erased.",
        SEPARATOR,
    ]
    .join("\n")
}

pub fn score_tips() -> String {
    [
        "📂 *How to improve your credit history*",
        SEPARATOR,
        "🔹 1. Pay on time\n   - Even if it's the minimum, avoid being late.",
        SEPARATOR,
        "🔹 2. Use your cards in moderation\n   - Don't always max them out.",
        SEPARATOR,
        "🔹 3. Avoid opening many loans at once\n   - It looks like you urgently need money.",
        SEPARATOR,
        "🔹 4. Use some credit, even a small one\n   - No history means no score.",
        SEPARATOR,
        "🔹 5. Check your report at least once a year\n   - Bureaus offer a free annual report.",
        SEPARATOR,
        "Type *menu* to go back.",
    ]
    .join("\n")
}

//
// ================= Result formatters =================
//

/// `$1234.50`, with the sign in front of the currency symbol.
pub fn money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

pub fn percent(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

pub fn loan_quote(quote: &LoanQuote) -> String {
    format!(
        "✅ Your payment per period would be: {}\n\
         💰 You would pay a total of: {}\n\
         📉 Of which {} would be interest.",
        money(quote.payment),
        money(quote.total_paid),
        money(quote.total_interest),
    )
}

pub fn inline_quote(quote: &LoanQuote) -> String {
    format!("{}\n\nType *menu* to see more options.", loan_quote(quote))
}

pub fn extra_savings(extra: Decimal, start_period: u32, savings: &ExtraPaymentSavings) -> String {
    let sooner = if savings.periods_saved > 0 {
        format!(
            "✅ You would finish paying sooner (you skip {} payment{}!)\n",
            savings.periods_saved,
            if savings.periods_saved == 1 { "" } else { "s" }
        )
    } else {
        "✅ You would finish on the same schedule, with a smaller last payment.\n".to_string()
    };

    format!(
        "💸 Paying this loan without extra payments, you would pay {} in total.\n\n\
         But if you pay an extra {} per period starting at period {}...\n\
         {}\
         💰 You would pay {} in total\n\
         🧮 And you would save {} in interest\n\n\
         Type *menu* to go back to the start.",
        money(savings.total_without_extra),
        money(extra),
        start_period,
        sooner,
        money(savings.total_with_extra),
        money(savings.total_saved),
    )
}

pub fn installment_cost(
    cash_price: Decimal,
    payment: Decimal,
    count: u32,
    frequency: PaymentFrequency,
    cost: &InstallmentCost,
) -> String {
    let approximation = if cost.converged {
        ""
    } else {
        "\n(These rates are an approximation.)"
    };
    let annual_rate = match cost.annual_rate_pct {
        Some(pct) => percent(pct),
        None => "too high to express as a yearly rate".to_string(),
    };

    format!(
        "📊 Here are your results:\n\
         💰 Cash price: {}\n\
         📆 {} {} installments of {}.\n\n\
         💸 Total paid: {}\n\
         🧮 Interest paid: {}\n\
         📈 Rate per period: {}\n\
         📅 Equivalent annual rate (approximate): {}{}\n\n\
         Type *menu* to go back to the start.",
        money(cash_price),
        count,
        frequency,
        money(payment),
        money(cost.total_paid),
        money(cost.total_interest),
        percent(cost.periodic_rate_pct),
        annual_rate,
        approximation,
    )
}

pub fn capacity_summary(capacity: Decimal) -> String {
    if capacity > Decimal::ZERO {
        format!(
            "✅ Based on your data, you could pay up to {} per month on a new loan.",
            money(capacity)
        )
    } else {
        format!(
            "⚠️ Based on your data, your monthly capacity for a new loan is {}. \
             Your current obligations already use up your budget.",
            money(capacity)
        )
    }
}

pub fn max_loan(capacity: Decimal, amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        format!(
            "✅ With a payment capacity of {}, you could aim for a loan of up to approximately {}.\n\n\
             Want to go back to the menu? Type *menu*.",
            money(capacity),
            money(amount)
        )
    } else {
        format!(
            "⚠️ With a payment capacity of {}, there is no room for a new loan right now. \
             Reducing your current payments is the first step.\n\n\
             Want to go back to the menu? Type *menu*.",
            money(capacity)
        )
    }
}

pub fn verdict(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Approved { payment, capacity } => format!(
            "✅ Good news: you could afford this loan.\n\
             Your estimated payment would be {}, which is within your monthly capacity ({}).\n\n\
             Want to go back to the menu? Type *menu*.",
            money(*payment),
            money(*capacity)
        ),
        Verdict::Rejected {
            payment,
            capacity,
            payment_gap,
            income_increase_needed,
            revolving_reduction_needed,
        } => format!(
            "❌ Right now you couldn't afford this loan.\n\
             The estimated payment would be {}, but your maximum capacity is {}.\n\n\
             🔧 Some ways to make it work:\n\
             1. Reduce your fixed payments by at least {}.\n\
             2. Increase your monthly income by approximately {}.\n\
             3. Pay down your revolving debts (like cards) by at least {}.\n\n\
             Want to go back to the menu? Type *menu*.",
            money(*payment),
            money(*capacity),
            money(*payment_gap),
            money(*income_increase_needed),
            money(*revolving_reduction_needed)
        ),
    }
}
