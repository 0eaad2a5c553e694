//! HTTP API endpoints for the SA ledger
//!
//! Exposes the reward, conversion, and withdrawal operations over the
//! JSON contract the platform's clients already speak.

pub mod ledger;

pub use ledger::{create_router as create_ledger_router, LedgerApiState};
