//! Ledger error types for validation and state errors.
//!
//! Every rule the consistency engine enforces surfaces as one of these
//! variants, so the API can report a stable error code for it.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::account::AccountKind;

/// Errors raised by business rule checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Amount Errors ==========
    /// Amount must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount cannot be negative.
    #[error("Amount cannot be negative, got {0}")]
    NegativeAmount(Decimal),

    /// Entry must specify either debit or credit, not both.
    #[error("Entry must specify either debit or credit, not both")]
    InvalidEntrySide,

    // ========== Account Errors ==========
    /// Company already has its single account of this kind.
    #[error("Company already has a {0} account")]
    DuplicateSingletonAccount(AccountKind),

    /// Bank and mobile accounts need a number.
    #[error("A {0} account requires an account number")]
    AccountNumberRequired(AccountKind),

    /// Another account of the same kind already uses this number.
    #[error("A {kind} account with number '{number}' already exists")]
    DuplicateAccountNumber {
        /// Account kind.
        kind: AccountKind,
        /// The conflicting number.
        number: String,
    },

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(Uuid),

    /// Cash balance cannot go below zero.
    #[error("Insufficient balance in account {account_id}: available {available}, required {required}")]
    InsufficientBalance {
        /// Account being debited.
        account_id: Uuid,
        /// Balance before the posting.
        available: Decimal,
        /// Debit amount requested.
        required: Decimal,
    },

    /// Account still holds money.
    #[error("Account {0} has a non-zero balance and cannot be deactivated")]
    AccountHasBalance(Uuid),

    /// Transfer source and destination are the same account.
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    // ========== Reversal Errors ==========
    /// Transaction was already reversed.
    #[error("Transaction {0} has already been reversed")]
    AlreadyReversed(Uuid),

    /// A reversal cannot be reversed again.
    #[error("Transaction {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(Uuid),

    /// Transaction is owned by a business document.
    #[error("Transaction {0} belongs to a document; edit or delete the document instead")]
    OwnedByDocument(Uuid),

    // ========== Document Errors ==========
    /// Sale or purchase without line items.
    #[error("Document must contain at least one item")]
    EmptyDocument,

    /// Quantity must be positive.
    #[error("Quantity must be greater than zero, got {0}")]
    InvalidQuantity(Decimal),

    /// Discount larger than the amount it applies to.
    #[error("Discount {discount} exceeds total {total}")]
    DiscountExceedsTotal {
        /// Discount requested.
        discount: Decimal,
        /// Amount the discount applies to.
        total: Decimal,
    },

    /// Cash payment without a receiving/paying account.
    #[error("A payment requires an account")]
    PaymentAccountRequired,

    /// Walk-in documents have no party to carry a due.
    #[error("Documents without a customer or supplier must be fully paid, due {0}")]
    UnpaidWithoutParty(Decimal),

    /// Document has returns and cannot be deleted.
    #[error("Document {0} has returns and cannot be deleted")]
    HasReturns(Uuid),

    /// Referenced sale/purchase belongs to another party.
    #[error("Document {0} does not belong to this customer or supplier")]
    PartyMismatch(Uuid),

    // ========== Inventory Errors ==========
    /// Not enough stock for the movement.
    #[error("Insufficient stock for product {product_id}: available {available}, required {required}")]
    InsufficientStock {
        /// Product ID.
        product_id: Uuid,
        /// Stock on hand.
        available: Decimal,
        /// Quantity requested.
        required: Decimal,
    },

    /// Returned product was not on the original document.
    #[error("Product {0} is not part of the original document")]
    ProductNotOnDocument(Uuid),

    /// Return quantity exceeds what remains returnable.
    #[error("Cannot return {requested} of product {product_id}, only {returnable} returnable")]
    ReturnExceedsQuantity {
        /// Product ID.
        product_id: Uuid,
        /// Quantity still returnable.
        returnable: Decimal,
        /// Quantity requested.
        requested: Decimal,
    },

    // ========== Advance Errors ==========
    /// Party advance does not cover the requested usage.
    #[error("Insufficient advance balance: available {available}, required {required}")]
    InsufficientAdvance {
        /// Current advance balance.
        available: Decimal,
        /// Amount requested.
        required: Decimal,
    },

    /// Advance created by a payment was already spent.
    #[error("Advance already consumed: balance {available}, payment advance {required}")]
    AdvanceAlreadyConsumed {
        /// Current advance balance.
        available: Decimal,
        /// Advance the payment contributed.
        required: Decimal,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::InvalidEntrySide => "INVALID_ENTRY_SIDE",
            Self::DuplicateSingletonAccount(_) => "DUPLICATE_SINGLETON_ACCOUNT",
            Self::AccountNumberRequired(_) => "ACCOUNT_NUMBER_REQUIRED",
            Self::DuplicateAccountNumber { .. } => "DUPLICATE_ACCOUNT_NUMBER",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::AccountHasBalance(_) => "ACCOUNT_HAS_BALANCE",
            Self::SameAccountTransfer => "SAME_ACCOUNT_TRANSFER",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::OwnedByDocument(_) => "OWNED_BY_DOCUMENT",
            Self::EmptyDocument => "EMPTY_DOCUMENT",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::DiscountExceedsTotal { .. } => "DISCOUNT_EXCEEDS_TOTAL",
            Self::PaymentAccountRequired => "PAYMENT_ACCOUNT_REQUIRED",
            Self::UnpaidWithoutParty(_) => "UNPAID_WITHOUT_PARTY",
            Self::HasReturns(_) => "HAS_RETURNS",
            Self::PartyMismatch(_) => "PARTY_MISMATCH",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ProductNotOnDocument(_) => "PRODUCT_NOT_ON_DOCUMENT",
            Self::ReturnExceedsQuantity { .. } => "RETURN_EXCEEDS_QUANTITY",
            Self::InsufficientAdvance { .. } => "INSUFFICIENT_ADVANCE",
            Self::AdvanceAlreadyConsumed { .. } => "ADVANCE_ALREADY_CONSUMED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::NonPositiveAmount(_)
            | Self::NegativeAmount(_)
            | Self::InvalidEntrySide
            | Self::AccountNumberRequired(_)
            | Self::SameAccountTransfer
            | Self::EmptyDocument
            | Self::InvalidQuantity(_)
            | Self::DiscountExceedsTotal { .. }
            | Self::PaymentAccountRequired => 400,

            // 409 Conflict - uniqueness
            Self::DuplicateSingletonAccount(_) | Self::DuplicateAccountNumber { .. } => 409,

            // 422 Unprocessable - state does not allow the operation
            Self::AccountInactive(_)
            | Self::InsufficientBalance { .. }
            | Self::AccountHasBalance(_)
            | Self::AlreadyReversed(_)
            | Self::CannotReverseReversal(_)
            | Self::OwnedByDocument(_)
            | Self::UnpaidWithoutParty(_)
            | Self::HasReturns(_)
            | Self::PartyMismatch(_)
            | Self::InsufficientStock { .. }
            | Self::ProductNotOnDocument(_)
            | Self::ReturnExceedsQuantity { .. }
            | Self::InsufficientAdvance { .. }
            | Self::AdvanceAlreadyConsumed { .. } => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::NonPositiveAmount(dec!(0)).error_code(),
            "NON_POSITIVE_AMOUNT"
        );
        assert_eq!(
            LedgerError::DuplicateSingletonAccount(AccountKind::Cash).error_code(),
            "DUPLICATE_SINGLETON_ACCOUNT"
        );
        assert_eq!(
            LedgerError::InsufficientStock {
                product_id: Uuid::nil(),
                available: dec!(1),
                required: dec!(2),
            }
            .error_code(),
            "INSUFFICIENT_STOCK"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::InvalidEntrySide.http_status_code(), 400);
        assert_eq!(
            LedgerError::DuplicateSingletonAccount(AccountKind::Other).http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::AlreadyReversed(Uuid::nil()).http_status_code(),
            422
        );
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::InsufficientBalance {
            account_id: Uuid::nil(),
            available: dec!(50.00),
            required: dec!(100.00),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance in account 00000000-0000-0000-0000-000000000000: available 50.00, required 100.00"
        );
        assert_eq!(
            LedgerError::DuplicateSingletonAccount(AccountKind::Cash).to_string(),
            "Company already has a cash account"
        );
    }
}
