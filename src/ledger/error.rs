//! Ledger error taxonomy.
//!
//! Reward crediting is best-effort and never surfaces these to callers;
//! conversion and withdrawal are user-initiated money movement and do.

use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Wallet balance does not cover the requested amount
    InsufficientBalance,
    /// Withdrawal amount below the configured minimum
    BelowMinimum { minimum: Decimal },
    /// Withdrawal method does not settle the requested currency
    UnsupportedMethod,
    /// Non-positive amount where a positive one is required
    InvalidAmount,
    /// The payment gateway declined or failed the transfer
    TransferFailed(String),
    /// A durable store or directory call failed
    Store(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InsufficientBalance => write!(f, "insufficient balance"),
            LedgerError::BelowMinimum { minimum } => {
                write!(f, "amount below minimum withdrawal of {}", minimum)
            }
            LedgerError::UnsupportedMethod => {
                write!(f, "withdrawal method does not support this currency")
            }
            LedgerError::InvalidAmount => write!(f, "amount must be positive"),
            LedgerError::TransferFailed(msg) => write!(f, "gateway transfer failed: {}", msg),
            LedgerError::Store(msg) => write!(f, "store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<String> for LedgerError {
    fn from(msg: String) -> Self {
        LedgerError::Store(msg)
    }
}
