//! Core business rules for Hisab.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The database layer calls into it for every rule that does not need I/O.
//!
//! # Modules
//!
//! - `account` - Account kinds and per-company uniqueness rules
//! - `ledger` - Single-entry posting rules, reversals and running balances
//! - `billing` - Sale/purchase line and document totals
//! - `settlement` - Payment allocation and advance balance reconciliation
//! - `inventory` - Stock movement rules
//! - `numbering` - Per-company document numbers
//! - `error` - Rule violations shared by all of the above

pub mod account;
pub mod billing;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod numbering;
pub mod settlement;

pub use error::LedgerError;
