//! Single-entry posting rules.
//!
//! Every ledger row moves one account: a credit adds money to it, a debit
//! takes money out. Account balances are running totals updated on each
//! posting, and mistakes are corrected with compensating reversals rather
//! than by editing history.

use hisab_shared::types::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountKind;
use crate::error::LedgerError;

/// Why a ledger row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Balance carried in when an account is opened.
    OpeningBalance,
    /// Customer paid us.
    MoneyReceipt,
    /// We paid a supplier.
    SupplierPayment,
    /// Money spent.
    Expense,
    /// Money earned outside of sales.
    Income,
    /// Incoming leg of an account transfer.
    TransferIn,
    /// Outgoing leg of an account transfer.
    TransferOut,
    /// Cash collected on a sale invoice.
    SalePayment,
    /// Cash paid on a purchase bill.
    PurchasePayment,
    /// Cash returned to a customer.
    SaleRefund,
    /// Cash returned by a supplier.
    PurchaseRefund,
    /// Manual correction.
    Adjustment,
    /// Compensating entry for another transaction.
    Reversal,
}

impl TransactionKind {
    /// Whether the API may reverse a row of this kind directly.
    ///
    /// Only manual adjustments qualify. Every other row, opening balances
    /// included, belongs to a record and is reversed through it.
    #[must_use]
    pub const fn is_directly_reversible(self) -> bool {
        matches!(self, Self::Adjustment)
    }

    /// snake_case name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpeningBalance => "opening_balance",
            Self::MoneyReceipt => "money_receipt",
            Self::SupplierPayment => "supplier_payment",
            Self::Expense => "expense",
            Self::Income => "income",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::SalePayment => "sale_payment",
            Self::PurchasePayment => "purchase_payment",
            Self::SaleRefund => "sale_refund",
            Self::PurchaseRefund => "purchase_refund",
            Self::Adjustment => "adjustment",
            Self::Reversal => "reversal",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a posting relative to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    /// Money leaves the account.
    Debit,
    /// Money enters the account.
    Credit,
}

/// Validated debit/credit pair of a single ledger row.
///
/// Exactly one side is positive; the other is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    debit: Decimal,
    credit: Decimal,
}

impl Posting {
    /// Creates a posting on the given side.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` when the rounded amount is not positive.
    pub fn new(side: EntrySide, amount: Decimal) -> Result<Self, LedgerError> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        Ok(match side {
            EntrySide::Debit => Self {
                debit: amount,
                credit: Decimal::ZERO,
            },
            EntrySide::Credit => Self {
                debit: Decimal::ZERO,
                credit: amount,
            },
        })
    }

    /// Money out of the account.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` when the amount is not positive.
    pub fn debit(amount: Decimal) -> Result<Self, LedgerError> {
        Self::new(EntrySide::Debit, amount)
    }

    /// Money into the account.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` when the amount is not positive.
    pub fn credit(amount: Decimal) -> Result<Self, LedgerError> {
        Self::new(EntrySide::Credit, amount)
    }

    /// Builds a posting from raw debit and credit columns.
    ///
    /// # Errors
    ///
    /// - `NegativeAmount` if either side is negative
    /// - `InvalidEntrySide` unless exactly one side is positive
    pub fn from_parts(debit: Decimal, credit: Decimal) -> Result<Self, LedgerError> {
        if debit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(debit));
        }
        if credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(credit));
        }
        match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, false) => Self::debit(debit),
            (false, true) => Self::credit(credit),
            _ => Err(LedgerError::InvalidEntrySide),
        }
    }

    /// Debit column value.
    #[must_use]
    pub const fn debit_amount(&self) -> Decimal {
        self.debit
    }

    /// Credit column value.
    #[must_use]
    pub const fn credit_amount(&self) -> Decimal {
        self.credit
    }

    /// The side carrying the amount.
    #[must_use]
    pub fn side(&self) -> EntrySide {
        if self.debit > Decimal::ZERO {
            EntrySide::Debit
        } else {
            EntrySide::Credit
        }
    }

    /// The positive amount moved.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit.max(self.credit)
    }

    /// Signed effect on the account balance.
    #[must_use]
    pub fn balance_effect(&self) -> Decimal {
        self.credit - self.debit
    }

    /// The compensating posting: same amount, opposite side.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self {
            debit: self.credit,
            credit: self.debit,
        }
    }
}

/// Account state needed to apply a posting.
#[derive(Debug, Clone, Copy)]
pub struct AccountState {
    /// Account ID.
    pub id: Uuid,
    /// Account kind.
    pub kind: AccountKind,
    /// Whether the account accepts postings.
    pub is_active: bool,
    /// Balance before the posting.
    pub balance: Decimal,
}

/// Applies a posting to an account and returns the new balance.
///
/// # Errors
///
/// - `AccountInactive` when the account is deactivated
/// - `InsufficientBalance` when a cash account would go negative
pub fn apply_posting(account: &AccountState, posting: &Posting) -> Result<Decimal, LedgerError> {
    if !account.is_active {
        return Err(LedgerError::AccountInactive(account.id));
    }

    let balance_after = account.balance + posting.balance_effect();

    if balance_after < Decimal::ZERO
        && !account.kind.allows_overdraft()
        && posting.side() == EntrySide::Debit
    {
        return Err(LedgerError::InsufficientBalance {
            account_id: account.id,
            available: account.balance,
            required: posting.amount(),
        });
    }

    Ok(balance_after)
}

/// Applies a compensating posting.
///
/// Accepted on inactive accounts and may overdraw cash.
#[must_use]
pub fn apply_reversal(balance: Decimal, original: &Posting) -> Decimal {
    balance + original.reversed().balance_effect()
}

/// Reversal state of an existing ledger row.
#[derive(Debug, Clone, Copy)]
pub struct ReversalCandidate {
    /// Transaction ID.
    pub id: Uuid,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Whether a reversal was already posted for it.
    pub is_reversed: bool,
}

/// Checks that a transaction can be reversed.
///
/// `direct` is true when the request comes from the API rather than from a
/// document being edited or deleted.
///
/// # Errors
///
/// - `CannotReverseReversal` for a reversal row
/// - `AlreadyReversed` for a row reversed before
/// - `OwnedByDocument` for a direct request on a document row
pub fn ensure_reversible(candidate: &ReversalCandidate, direct: bool) -> Result<(), LedgerError> {
    if candidate.kind == TransactionKind::Reversal {
        return Err(LedgerError::CannotReverseReversal(candidate.id));
    }
    if candidate.is_reversed {
        return Err(LedgerError::AlreadyReversed(candidate.id));
    }
    if direct && !candidate.kind.is_directly_reversible() {
        return Err(LedgerError::OwnedByDocument(candidate.id));
    }
    Ok(())
}

/// Sums postings into a balance, starting from zero.
///
/// Used to audit the stored running balance of an account.
pub fn recompute_balance<'a>(postings: impl IntoIterator<Item = &'a Posting>) -> Decimal {
    postings.into_iter().map(Posting::balance_effect).sum()
}

/// Running balances after each posting, starting from `opening`.
#[must_use]
pub fn running_balances(opening: Decimal, postings: &[Posting]) -> Vec<Decimal> {
    postings
        .iter()
        .scan(opening, |balance, posting| {
            *balance += posting.balance_effect();
            Some(*balance)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn account(kind: AccountKind, balance: Decimal) -> AccountState {
        AccountState {
            id: Uuid::new_v4(),
            kind,
            is_active: true,
            balance,
        }
    }

    #[rstest]
    #[case(dec!(0), dec!(0))]
    #[case(dec!(5), dec!(5))]
    fn test_from_parts_requires_one_side(#[case] debit: Decimal, #[case] credit: Decimal) {
        assert_eq!(
            Posting::from_parts(debit, credit),
            Err(LedgerError::InvalidEntrySide)
        );
    }

    #[test]
    fn test_from_parts_rejects_negative() {
        assert_eq!(
            Posting::from_parts(dec!(-1), dec!(0)),
            Err(LedgerError::NegativeAmount(dec!(-1)))
        );
    }

    #[test]
    fn test_amount_rounded_before_validation() {
        assert_eq!(
            Posting::credit(dec!(0.004)),
            Err(LedgerError::NonPositiveAmount(dec!(0.00)))
        );
        let posting = Posting::debit(dec!(10.005)).unwrap();
        assert_eq!(posting.debit_amount(), dec!(10.01));
    }

    #[test]
    fn test_credit_increases_debit_decreases() {
        let acc = account(AccountKind::Bank, dec!(100));
        assert_eq!(
            apply_posting(&acc, &Posting::credit(dec!(50)).unwrap()),
            Ok(dec!(150))
        );
        assert_eq!(
            apply_posting(&acc, &Posting::debit(dec!(30)).unwrap()),
            Ok(dec!(70))
        );
    }

    #[test]
    fn test_cash_cannot_be_overdrawn() {
        let acc = account(AccountKind::Cash, dec!(20));
        let result = apply_posting(&acc, &Posting::debit(dec!(20.01)).unwrap());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { required, .. }) if required == dec!(20.01)
        ));
        assert_eq!(
            apply_posting(&acc, &Posting::debit(dec!(20)).unwrap()),
            Ok(dec!(0))
        );
    }

    #[test]
    fn test_bank_may_go_negative() {
        let acc = account(AccountKind::Bank, dec!(10));
        assert_eq!(
            apply_posting(&acc, &Posting::debit(dec!(25)).unwrap()),
            Ok(dec!(-15))
        );
    }

    #[test]
    fn test_inactive_account_rejected() {
        let mut acc = account(AccountKind::Bank, dec!(10));
        acc.is_active = false;
        assert_eq!(
            apply_posting(&acc, &Posting::credit(dec!(1)).unwrap()),
            Err(LedgerError::AccountInactive(acc.id))
        );
    }

    #[test]
    fn test_reversal_restores_balance() {
        let posting = Posting::credit(dec!(40)).unwrap();
        let after = apply_posting(&account(AccountKind::Cash, dec!(0)), &posting).unwrap();
        assert_eq!(apply_reversal(after, &posting), dec!(0));
        assert_eq!(posting.reversed().side(), EntrySide::Debit);
    }

    #[rstest]
    #[case(TransactionKind::Reversal, false, false, "CANNOT_REVERSE_REVERSAL")]
    #[case(TransactionKind::Adjustment, true, true, "ALREADY_REVERSED")]
    #[case(TransactionKind::Expense, false, true, "OWNED_BY_DOCUMENT")]
    #[case(TransactionKind::OpeningBalance, false, true, "OWNED_BY_DOCUMENT")]
    fn test_ensure_reversible_rejections(
        #[case] kind: TransactionKind,
        #[case] is_reversed: bool,
        #[case] direct: bool,
        #[case] code: &str,
    ) {
        let candidate = ReversalCandidate {
            id: Uuid::nil(),
            kind,
            is_reversed,
        };
        let err = ensure_reversible(&candidate, direct).unwrap_err();
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_document_rows_reversible_from_documents() {
        let candidate = ReversalCandidate {
            id: Uuid::nil(),
            kind: TransactionKind::Expense,
            is_reversed: false,
        };
        assert!(ensure_reversible(&candidate, false).is_ok());
    }

    fn posting_strategy() -> impl Strategy<Value = Posting> {
        (any::<bool>(), 1i64..1_000_000i64).prop_map(|(credit, cents)| {
            let amount = Decimal::new(cents, 2);
            if credit {
                Posting::credit(amount).unwrap()
            } else {
                Posting::debit(amount).unwrap()
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The stored running balance always equals the sum of the postings.
        #[test]
        fn prop_running_balance_matches_recompute(
            postings in prop::collection::vec(posting_strategy(), 1..50),
        ) {
            let mut balance = Decimal::ZERO;
            for posting in &postings {
                let acc = AccountState {
                    id: Uuid::nil(),
                    kind: AccountKind::Bank,
                    is_active: true,
                    balance,
                };
                balance = apply_posting(&acc, posting).unwrap();
            }
            prop_assert_eq!(balance, recompute_balance(&postings));
            let running = running_balances(Decimal::ZERO, &postings);
            prop_assert_eq!(running.last().copied(), Some(balance));
        }

        /// Posting then reversing any sequence leaves the balance unchanged.
        #[test]
        fn prop_reversals_cancel(
            opening in (0i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)),
            postings in prop::collection::vec(posting_strategy(), 1..20),
        ) {
            let mut balance = opening;
            for posting in &postings {
                balance += posting.balance_effect();
            }
            for posting in postings.iter().rev() {
                balance = apply_reversal(balance, posting);
            }
            prop_assert_eq!(balance, opening);
        }
    }
}
