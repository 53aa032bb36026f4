//! Keyword matching for chat input
//!
//! Fixed keyword lists only. Text is normalized once (lowercase, accents folded,
//! surrounding punctuation dropped) and compared against static tables.

use crate::error::BotError;
use crate::models::LoanTerms;
use crate::numeric;
use crate::Result;

/// Words that reset the conversation and show the main menu.
const GLOBAL_KEYWORDS: &[&str] = &["menu", "hola", "hi", "hello", "start", "inicio"];

const AFFIRMATIVE: &[&str] = &["yes", "y", "yeah", "yep", "sure", "si"];

const NEGATIVE: &[&str] = &["no", "n", "nope"];

/// Prefixes of the one-line loan simulation command.
const INLINE_SIMULATION_PREFIXES: &[&str] = &["simulate loan", "simulate a loan", "simular credito"];

/// Lowercase, fold Spanish accents, collapse whitespace and trim punctuation.
pub fn normalize(raw: &str) -> String {
    let folded: String = numeric::clean(raw)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' => 'a',
            'é' | 'è' => 'e',
            'í' | 'ì' => 'i',
            'ó' | 'ò' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other => other,
        })
        .collect();

    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, '!' | '?' | '.' | '¡' | '¿' | '*' | '"'))
        .trim()
        .to_string()
}

pub fn is_global(text: &str) -> bool {
    GLOBAL_KEYWORDS.contains(&text)
}

pub fn is_affirmative(text: &str) -> bool {
    AFFIRMATIVE.contains(&text)
}

pub fn is_negative(text: &str) -> bool {
    NEGATIVE.contains(&text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    SimulateLoan,
    ExtraPayments,
    StoreInstallments,
    BorrowingCapacity,
    PayoffTips,
    ExpensiveCredit,
    CommonMistakes,
    CreditReport,
}

impl MenuOption {
    const ALL: [MenuOption; 8] = [
        MenuOption::SimulateLoan,
        MenuOption::ExtraPayments,
        MenuOption::StoreInstallments,
        MenuOption::BorrowingCapacity,
        MenuOption::PayoffTips,
        MenuOption::ExpensiveCredit,
        MenuOption::CommonMistakes,
        MenuOption::CreditReport,
    ];

    fn digit(self) -> &'static str {
        match self {
            MenuOption::SimulateLoan => "1",
            MenuOption::ExtraPayments => "2",
            MenuOption::StoreInstallments => "3",
            MenuOption::BorrowingCapacity => "4",
            MenuOption::PayoffTips => "5",
            MenuOption::ExpensiveCredit => "6",
            MenuOption::CommonMistakes => "7",
            MenuOption::CreditReport => "8",
        }
    }

    /// Normalized titles as printed in the main menu.
    fn titles(self) -> &'static [&'static str] {
        match self {
            MenuOption::SimulateLoan => &["simulate a loan", "simulate loan"],
            MenuOption::ExtraPayments => &[
                "see how much i save with extra payments",
                "extra payments",
            ],
            MenuOption::StoreInstallments => &[
                "calculate the real cost of fixed-installment store purchases",
                "store installments",
            ],
            MenuOption::BorrowingCapacity => &["how much can i borrow"],
            MenuOption::PayoffTips => &[
                "tips for paying off a loan without drowning",
                "payoff tips",
            ],
            MenuOption::ExpensiveCredit => &["how to spot an expensive loan"],
            MenuOption::CommonMistakes => &["common mistakes when applying for credit"],
            MenuOption::CreditReport => &["understanding your credit report", "credit report"],
        }
    }

    /// Match a menu entry. Bare digits only count when no flow is active.
    pub fn recognize(text: &str, idle: bool) -> Option<Self> {
        Self::ALL.into_iter().find(|option| {
            (idle && text == option.digit()) || option.titles().contains(&text)
        })
    }
}

/// Parse `simulate loan: amount=100000, term=12, rate=2.5%` style commands.
///
/// Returns `None` when the text is not such a command. Fields are separated
/// by `,` or `;`; a piece without `=` continues the previous value so decimal
/// commas survive (`rate=2,5%`).
pub fn inline_simulation(text: &str) -> Option<Result<LoanTerms>> {
    let rest = INLINE_SIMULATION_PREFIXES
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))?;
    let rest = rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
    if rest.is_empty() {
        return None;
    }

    Some(parse_inline_fields(rest))
}

fn parse_inline_fields(fields: &str) -> Result<LoanTerms> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for piece in fields.split([',', ';']) {
        match piece.split_once('=') {
            Some((key, value)) => pairs.push((key.trim().to_string(), value.trim().to_string())),
            None => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push(',');
                    value.push_str(piece.trim());
                }
                None => {
                    return Err(BotError::Parse(format!("unexpected field '{}'", piece.trim())))
                }
            },
        }
    }

    Ok(LoanTerms {
        amount: numeric::parse_amount(field(&pairs, &["amount", "monto"])?)?,
        term: numeric::parse_count(field(&pairs, &["term", "plazo"])?)?,
        rate: numeric::parse_rate(field(&pairs, &["rate", "tasa"])?)?,
    })
}

fn field<'a>(pairs: &'a [(String, String)], names: &[&str]) -> Result<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| names.contains(&key.as_str()))
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| BotError::Parse(format!("missing field '{}'", names[0])))
}
