//! `SeaORM` active enums mapped to Postgres enum types.
//!
//! Each enum converts to and from its `hisab_core` counterpart so business
//! rules never see database types.

use hisab_core::{account, billing, ledger};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `account_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_kind")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Bank account.
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Mobile wallet.
    #[sea_orm(string_value = "mobile")]
    Mobile,
    /// Cash drawer.
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Catch-all.
    #[sea_orm(string_value = "other")]
    Other,
}

impl From<account::AccountKind> for AccountKind {
    fn from(kind: account::AccountKind) -> Self {
        match kind {
            account::AccountKind::Bank => Self::Bank,
            account::AccountKind::Mobile => Self::Mobile,
            account::AccountKind::Cash => Self::Cash,
            account::AccountKind::Other => Self::Other,
        }
    }
}

impl From<AccountKind> for account::AccountKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Bank => Self::Bank,
            AccountKind::Mobile => Self::Mobile,
            AccountKind::Cash => Self::Cash,
            AccountKind::Other => Self::Other,
        }
    }
}

/// `transaction_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[sea_orm(string_value = "opening_balance")]
    OpeningBalance,
    #[sea_orm(string_value = "money_receipt")]
    MoneyReceipt,
    #[sea_orm(string_value = "supplier_payment")]
    SupplierPayment,
    #[sea_orm(string_value = "expense")]
    Expense,
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "sale_payment")]
    SalePayment,
    #[sea_orm(string_value = "purchase_payment")]
    PurchasePayment,
    #[sea_orm(string_value = "sale_refund")]
    SaleRefund,
    #[sea_orm(string_value = "purchase_refund")]
    PurchaseRefund,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "reversal")]
    Reversal,
}

impl From<ledger::TransactionKind> for TransactionKind {
    fn from(kind: ledger::TransactionKind) -> Self {
        use ledger::TransactionKind as K;
        match kind {
            K::OpeningBalance => Self::OpeningBalance,
            K::MoneyReceipt => Self::MoneyReceipt,
            K::SupplierPayment => Self::SupplierPayment,
            K::Expense => Self::Expense,
            K::Income => Self::Income,
            K::TransferIn => Self::TransferIn,
            K::TransferOut => Self::TransferOut,
            K::SalePayment => Self::SalePayment,
            K::PurchasePayment => Self::PurchasePayment,
            K::SaleRefund => Self::SaleRefund,
            K::PurchaseRefund => Self::PurchaseRefund,
            K::Adjustment => Self::Adjustment,
            K::Reversal => Self::Reversal,
        }
    }
}

impl From<TransactionKind> for ledger::TransactionKind {
    fn from(kind: TransactionKind) -> Self {
        use TransactionKind as K;
        match kind {
            K::OpeningBalance => Self::OpeningBalance,
            K::MoneyReceipt => Self::MoneyReceipt,
            K::SupplierPayment => Self::SupplierPayment,
            K::Expense => Self::Expense,
            K::Income => Self::Income,
            K::TransferIn => Self::TransferIn,
            K::TransferOut => Self::TransferOut,
            K::SalePayment => Self::SalePayment,
            K::PurchasePayment => Self::PurchasePayment,
            K::SaleRefund => Self::SaleRefund,
            K::PurchaseRefund => Self::PurchaseRefund,
            K::Adjustment => Self::Adjustment,
            K::Reversal => Self::Reversal,
        }
    }
}

/// `payment_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "due")]
    Due,
}

impl From<billing::PaymentStatus> for PaymentStatus {
    fn from(status: billing::PaymentStatus) -> Self {
        match status {
            billing::PaymentStatus::Paid => Self::Paid,
            billing::PaymentStatus::Partial => Self::Partial,
            billing::PaymentStatus::Due => Self::Due,
        }
    }
}
