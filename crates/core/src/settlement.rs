//! Payment allocation and party advance balances.
//!
//! A customer (or supplier) payment first settles open dues; whatever is left
//! becomes the party's advance. The advance is never stored as an independent
//! counter: it is recomputed from the documents that produce and consume it.
//!
//! ```text
//! advance = Σ payment.advance_amount
//!         + Σ_documents max(paid − (grand_total − returned), 0)
//!         − Σ_documents advance_used
//! ```

use chrono::NaiveDate;
use hisab_shared::types::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// An open sale or purchase that can absorb a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    /// Document ID.
    pub id: Uuid,
    /// Document date.
    pub date: NaiveDate,
    /// Document number, tie-breaker for same-day documents.
    pub number: String,
    /// Amount still due.
    pub due_amount: Decimal,
}

/// Part of a payment applied to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Document ID.
    pub document_id: Uuid,
    /// Amount applied.
    pub amount: Decimal,
}

/// How a payment splits between documents and advance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Amounts applied to documents, oldest first.
    pub allocations: Vec<Allocation>,
    /// Unallocated remainder kept as advance.
    pub advance_amount: Decimal,
}

impl AllocationPlan {
    /// Total applied to documents.
    #[must_use]
    pub fn allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }
}

fn positive_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

/// Spreads a payment across open documents, oldest first.
///
/// Documents are ordered by date, then number. Documents with nothing due
/// are skipped.
///
/// # Errors
///
/// Returns `NonPositiveAmount` for a non-positive payment.
pub fn allocate_fifo(amount: Decimal, open: &[OpenDocument]) -> Result<AllocationPlan, LedgerError> {
    let mut remaining = positive_amount(amount)?;

    let mut ordered: Vec<&OpenDocument> = open
        .iter()
        .filter(|d| d.due_amount > Decimal::ZERO)
        .collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.number.cmp(&b.number)));

    let mut allocations = Vec::new();
    for doc in ordered {
        if remaining.is_zero() {
            break;
        }
        let applied = remaining.min(doc.due_amount);
        allocations.push(Allocation {
            document_id: doc.id,
            amount: applied,
        });
        remaining -= applied;
    }

    Ok(AllocationPlan {
        allocations,
        advance_amount: remaining,
    })
}

/// Applies a payment to one specific document, up to its due.
///
/// # Errors
///
/// Returns `NonPositiveAmount` for a non-positive payment.
pub fn allocate_to_document(
    amount: Decimal,
    document: &OpenDocument,
) -> Result<AllocationPlan, LedgerError> {
    let amount = positive_amount(amount)?;
    let applied = amount.min(document.due_amount.max(Decimal::ZERO));

    let allocations = if applied > Decimal::ZERO {
        vec![Allocation {
            document_id: document.id,
            amount: applied,
        }]
    } else {
        Vec::new()
    };

    Ok(AllocationPlan {
        allocations,
        advance_amount: amount - applied,
    })
}

/// Settlement figures of one sale or purchase, as needed for advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentBalance {
    /// Grand total.
    pub grand_total: Decimal,
    /// Value of goods returned.
    pub returned_amount: Decimal,
    /// Everything applied: cash, advance and payment allocations.
    pub paid_amount: Decimal,
    /// Part of `paid_amount` drawn from the party advance.
    pub advance_used: Decimal,
}

impl DocumentBalance {
    /// Amount paid beyond what the party owes after returns.
    #[must_use]
    pub fn overpaid(&self) -> Decimal {
        let owed = (self.grand_total - self.returned_amount).max(Decimal::ZERO);
        (self.paid_amount - owed).max(Decimal::ZERO)
    }
}

/// Signed advance before clamping.
///
/// A negative value means advance was spent that no longer exists.
pub fn raw_advance<'a>(
    payment_advances: impl IntoIterator<Item = Decimal>,
    documents: impl IntoIterator<Item = &'a DocumentBalance>,
) -> Decimal {
    let from_payments: Decimal = payment_advances.into_iter().sum();
    let (overpaid, used) = documents
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(over, used), doc| {
            (over + doc.overpaid(), used + doc.advance_used)
        });

    from_payments + overpaid - used
}

/// Recomputes a party's advance from its payments and documents.
///
/// The result is clamped at zero.
pub fn compute_advance<'a>(
    payment_advances: impl IntoIterator<Item = Decimal>,
    documents: impl IntoIterator<Item = &'a DocumentBalance>,
) -> Decimal {
    raw_advance(payment_advances, documents).max(Decimal::ZERO)
}

/// Result of re-syncing a stored advance balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceSync {
    /// Stored value before the sync.
    pub old_balance: Decimal,
    /// Recomputed value.
    pub new_balance: Decimal,
}

impl AdvanceSync {
    /// Whether the stored value needs to be written back.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.old_balance != self.new_balance
    }
}

/// Validates an advance draw for a document and caps it at the due.
///
/// Returns the amount actually drawn.
///
/// # Errors
///
/// - `NegativeAmount` for a negative request
/// - `InsufficientAdvance` when the party advance is smaller than the request
pub fn draw_advance(
    requested: Decimal,
    available: Decimal,
    due: Decimal,
) -> Result<Decimal, LedgerError> {
    let requested = round_money(requested);
    if requested < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(requested));
    }
    if requested > available {
        return Err(LedgerError::InsufficientAdvance {
            available,
            required: requested,
        });
    }
    Ok(requested.min(due.max(Decimal::ZERO)))
}

/// Checks that a payment's advance has not been spent before removing it.
///
/// # Errors
///
/// Returns `AdvanceAlreadyConsumed` when the party advance is smaller than the
/// advance the payment contributed.
pub fn ensure_advance_unconsumed(
    current_advance: Decimal,
    payment_advance: Decimal,
) -> Result<(), LedgerError> {
    if payment_advance > current_advance {
        return Err(LedgerError::AdvanceAlreadyConsumed {
            available: current_advance,
            required: payment_advance,
        });
    }
    Ok(())
}

/// Cash refunded after a return: what was asked for, at most the overpayment.
///
/// # Errors
///
/// Returns `NegativeAmount` for a negative request.
pub fn refund_amount(requested: Decimal, overpaid: Decimal) -> Result<Decimal, LedgerError> {
    let requested = round_money(requested);
    if requested < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(requested));
    }
    Ok(requested.min(overpaid.max(Decimal::ZERO)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn open(day: u32, number: &str, due: Decimal) -> OpenDocument {
        OpenDocument {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            number: number.to_string(),
            due_amount: due,
        }
    }

    #[test]
    fn test_fifo_oldest_first() {
        let newer = open(5, "INV-000003", dec!(100));
        let older = open(2, "INV-000007", dec!(60));
        let plan = allocate_fifo(dec!(90), &[newer.clone(), older.clone()]).unwrap();

        assert_eq!(
            plan.allocations,
            vec![
                Allocation { document_id: older.id, amount: dec!(60) },
                Allocation { document_id: newer.id, amount: dec!(30) },
            ]
        );
        assert_eq!(plan.advance_amount, dec!(0));
    }

    #[test]
    fn test_fifo_same_day_orders_by_number() {
        let b = open(3, "INV-000002", dec!(10));
        let a = open(3, "INV-000001", dec!(10));
        let plan = allocate_fifo(dec!(10), &[b, a.clone()]).unwrap();
        assert_eq!(plan.allocations[0].document_id, a.id);
    }

    #[test]
    fn test_fifo_remainder_becomes_advance() {
        let plan = allocate_fifo(dec!(150), &[open(1, "INV-000001", dec!(100))]).unwrap();
        assert_eq!(plan.allocated(), dec!(100));
        assert_eq!(plan.advance_amount, dec!(50));
    }

    #[test]
    fn test_fifo_skips_settled_documents() {
        let plan = allocate_fifo(dec!(20), &[open(1, "INV-000001", dec!(0))]).unwrap();
        assert!(plan.allocations.is_empty());
        assert_eq!(plan.advance_amount, dec!(20));
    }

    #[test]
    fn test_fifo_rejects_zero() {
        assert_eq!(
            allocate_fifo(dec!(0), &[]),
            Err(LedgerError::NonPositiveAmount(dec!(0)))
        );
    }

    #[test]
    fn test_targeted_allocation_caps_at_due() {
        let doc = open(1, "INV-000001", dec!(40));
        let plan = allocate_to_document(dec!(100), &doc).unwrap();
        assert_eq!(plan.allocated(), dec!(40));
        assert_eq!(plan.advance_amount, dec!(60));
    }

    #[test]
    fn test_overpaid_after_return() {
        let doc = DocumentBalance {
            grand_total: dec!(100),
            returned_amount: dec!(30),
            paid_amount: dec!(100),
            advance_used: dec!(0),
        };
        assert_eq!(doc.overpaid(), dec!(30));
    }

    #[test]
    fn test_compute_advance() {
        let docs = [
            DocumentBalance {
                grand_total: dec!(100),
                returned_amount: dec!(20),
                paid_amount: dec!(100),
                advance_used: dec!(0),
            },
            DocumentBalance {
                grand_total: dec!(50),
                returned_amount: dec!(0),
                paid_amount: dec!(50),
                advance_used: dec!(45),
            },
        ];
        // 70 from receipts + 20 overpaid − 45 used
        assert_eq!(compute_advance([dec!(50), dec!(20)], &docs), dec!(45));
    }

    #[test]
    fn test_compute_advance_clamped() {
        let docs = [DocumentBalance {
            grand_total: dec!(10),
            paid_amount: dec!(10),
            advance_used: dec!(10),
            ..DocumentBalance::default()
        }];
        assert_eq!(compute_advance([], &docs), dec!(0));
        assert_eq!(raw_advance([], &docs), dec!(-10));
    }

    #[rstest]
    #[case(dec!(30), dec!(50), dec!(100), dec!(30))]
    #[case(dec!(50), dec!(50), dec!(20), dec!(20))]
    #[case(dec!(0), dec!(0), dec!(20), dec!(0))]
    fn test_draw_advance(
        #[case] requested: Decimal,
        #[case] available: Decimal,
        #[case] due: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(draw_advance(requested, available, due), Ok(expected));
    }

    #[test]
    fn test_draw_advance_insufficient() {
        assert_eq!(
            draw_advance(dec!(60), dec!(50), dec!(100)),
            Err(LedgerError::InsufficientAdvance {
                available: dec!(50),
                required: dec!(60),
            })
        );
    }

    #[test]
    fn test_ensure_advance_unconsumed() {
        assert!(ensure_advance_unconsumed(dec!(50), dec!(50)).is_ok());
        assert_eq!(
            ensure_advance_unconsumed(dec!(10), dec!(50)),
            Err(LedgerError::AdvanceAlreadyConsumed {
                available: dec!(10),
                required: dec!(50),
            })
        );
    }

    #[rstest]
    #[case(dec!(100), dec!(30), dec!(30))]
    #[case(dec!(10), dec!(30), dec!(10))]
    #[case(dec!(10), dec!(0), dec!(0))]
    fn test_refund_amount(#[case] requested: Decimal, #[case] overpaid: Decimal, #[case] expected: Decimal) {
        assert_eq!(refund_amount(requested, overpaid), Ok(expected));
    }

    #[test]
    fn test_advance_sync_changed() {
        let sync = AdvanceSync {
            old_balance: dec!(10),
            new_balance: dec!(10),
        };
        assert!(!sync.changed());
    }

    fn cents(min: i64, max: i64) -> impl Strategy<Value = Decimal> {
        (min..max).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// A payment is fully accounted for: allocated + advance = amount,
        /// and no document receives more than its due.
        #[test]
        fn prop_fifo_conserves_amount(
            amount in cents(1, 10_000_000),
            dues in prop::collection::vec((1u32..28, cents(0, 1_000_000)), 0..15),
        ) {
            let docs: Vec<OpenDocument> = dues
                .iter()
                .enumerate()
                .map(|(i, (day, due))| open(*day, &format!("INV-{i:06}"), *due))
                .collect();
            let plan = allocate_fifo(amount, &docs).unwrap();

            prop_assert_eq!(plan.allocated() + plan.advance_amount, amount);
            prop_assert!(plan.advance_amount >= Decimal::ZERO);
            for alloc in &plan.allocations {
                let doc = docs.iter().find(|d| d.id == alloc.document_id).unwrap();
                prop_assert!(alloc.amount > Decimal::ZERO);
                prop_assert!(alloc.amount <= doc.due_amount);
            }
            let total_due: Decimal = docs.iter().map(|d| d.due_amount).sum();
            if amount <= total_due {
                prop_assert!(plan.advance_amount.is_zero());
            }
        }

        /// Only the last allocated document may be partially settled.
        #[test]
        fn prop_fifo_fills_in_order(
            amount in cents(1, 1_000_000),
            dues in prop::collection::vec(cents(1, 100_000), 1..10),
        ) {
            let docs: Vec<OpenDocument> = dues
                .iter()
                .enumerate()
                .map(|(i, due)| open(1, &format!("INV-{i:06}"), *due))
                .collect();
            let plan = allocate_fifo(amount, &docs).unwrap();

            let count = plan.allocations.len();
            for (i, alloc) in plan.allocations.iter().enumerate() {
                prop_assert_eq!(alloc.document_id, docs[i].id);
                if i + 1 < count {
                    prop_assert_eq!(alloc.amount, docs[i].due_amount);
                }
            }
        }

        /// A drawn advance never exceeds the balance or the due.
        #[test]
        fn prop_draw_advance_bounded(
            requested in cents(0, 100_000),
            available in cents(0, 100_000),
            due in cents(0, 100_000),
        ) {
            match draw_advance(requested, available, due) {
                Ok(drawn) => {
                    prop_assert!(drawn <= available);
                    prop_assert!(drawn <= due);
                    prop_assert!(drawn <= requested);
                }
                Err(_) => prop_assert!(requested > available),
            }
        }
    }
}
