//! `SeaORM` entity definitions.
//!
//! One module per table, plus the Postgres enum mappings.

#![allow(missing_docs)]

pub mod sea_orm_active_enums;

pub mod account_transfers;
pub mod accounts;
pub mod companies;
pub mod customers;
pub mod expenses;
pub mod incomes;
pub mod money_receipt_allocations;
pub mod money_receipts;
pub mod number_sequences;
pub mod products;
pub mod purchase_items;
pub mod purchase_return_items;
pub mod purchase_returns;
pub mod purchases;
pub mod sale_items;
pub mod sale_return_items;
pub mod sale_returns;
pub mod sales;
pub mod supplier_payment_allocations;
pub mod supplier_payments;
pub mod suppliers;
pub mod transactions;
