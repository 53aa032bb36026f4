//! Credit Literacy Bot
//!
//! A chat bot that walks users through financial-literacy flows:
//! - Loan simulation with fixed-payment amortization
//! - Savings from extra principal payments
//! - Real cost of fixed-installment store purchases
//! - Borrowing capacity, maximum loan and approval checks
//! - Static guidance on credit and credit reports
//!
//! MESSAGE LOOP:
//! WEBHOOK → SESSION → STATE MACHINE → ENGINE → REPLY

pub mod api;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod models;
pub mod numeric;
pub mod state;
pub mod whatsapp;

pub use error::Result;

// Re-export common types
pub use config::BotConfig;
pub use conversation::ConversationEngine;
pub use models::*;
