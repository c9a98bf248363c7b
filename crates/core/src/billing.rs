//! Sale and purchase totals.
//!
//! Documents never store totals that disagree with their lines: every line
//! insert, update or delete recomputes the header through [`compute_totals`].
//!
//! ```text
//! line_total  = round(quantity × unit_price) − line discount
//! gross_total = Σ line_total
//! net_total   = gross_total − discount_amount
//! grand_total = net_total + vat_amount + delivery_charge
//! due_amount  = max(grand_total − returned_amount − paid_amount, 0)
//! ```

use hisab_shared::types::{round_money, round_quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Settlement state of a sale or purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing left to pay.
    Paid,
    /// Some payment received, some due.
    Partial,
    /// Nothing paid yet.
    Due,
}

impl PaymentStatus {
    /// Lowercase name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Due => "due",
        }
    }
}

/// A validated document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    /// Quantity rounded to three places.
    pub quantity: Decimal,
    /// Unit price rounded to two places.
    pub unit_price: Decimal,
    /// Line discount rounded to two places.
    pub discount_amount: Decimal,
    /// Net line amount.
    pub line_total: Decimal,
}

/// Validates a line and computes its total.
///
/// # Errors
///
/// - `InvalidQuantity` for a non-positive quantity
/// - `NegativeAmount` for a negative price or discount
/// - `DiscountExceedsTotal` when the discount exceeds the line amount
pub fn price_line(
    quantity: Decimal,
    unit_price: Decimal,
    discount_amount: Decimal,
) -> Result<PricedLine, LedgerError> {
    let quantity = round_quantity(quantity);
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    let unit_price = round_money(unit_price);
    if unit_price < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(unit_price));
    }
    let discount_amount = round_money(discount_amount);
    if discount_amount < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(discount_amount));
    }

    let amount = round_money(quantity * unit_price);
    if discount_amount > amount {
        return Err(LedgerError::DiscountExceedsTotal {
            discount: discount_amount,
            total: amount,
        });
    }

    Ok(PricedLine {
        quantity,
        unit_price,
        discount_amount,
        line_total: amount - discount_amount,
    })
}

/// Header-level adjustments of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCharges {
    /// Discount on the whole document.
    pub discount_amount: Decimal,
    /// VAT added after discount.
    pub vat_amount: Decimal,
    /// Delivery or carriage charge.
    pub delivery_charge: Decimal,
}

impl DocumentCharges {
    /// Rounds all charges and rejects negatives.
    ///
    /// # Errors
    ///
    /// Returns `NegativeAmount` for any negative charge.
    pub fn normalized(self) -> Result<Self, LedgerError> {
        let round = |d: Decimal| {
            let d = round_money(d);
            if d < Decimal::ZERO {
                Err(LedgerError::NegativeAmount(d))
            } else {
                Ok(d)
            }
        };
        Ok(Self {
            discount_amount: round(self.discount_amount)?,
            vat_amount: round(self.vat_amount)?,
            delivery_charge: round(self.delivery_charge)?,
        })
    }
}

/// Money already settled against a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementState {
    /// Cash, advance and receipt allocations applied.
    pub paid_amount: Decimal,
    /// Value of goods returned.
    pub returned_amount: Decimal,
}

/// Derived header totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// Sum of line totals.
    pub gross_total: Decimal,
    /// Document discount.
    pub discount_amount: Decimal,
    /// VAT.
    pub vat_amount: Decimal,
    /// Delivery charge.
    pub delivery_charge: Decimal,
    /// Gross minus discount.
    pub net_total: Decimal,
    /// Net plus VAT and delivery.
    pub grand_total: Decimal,
    /// Amount still owed.
    pub due_amount: Decimal,
    /// Amount paid beyond what is owed.
    pub overpaid_amount: Decimal,
    /// Settlement state.
    pub payment_status: PaymentStatus,
}

/// Recomputes header totals from line totals, charges and settlement.
///
/// # Errors
///
/// - `NegativeAmount` for negative charges
/// - `DiscountExceedsTotal` when the document discount exceeds the gross total
pub fn compute_totals(
    line_totals: &[Decimal],
    charges: DocumentCharges,
    settlement: SettlementState,
) -> Result<DocumentTotals, LedgerError> {
    let charges = charges.normalized()?;
    let gross_total: Decimal = line_totals.iter().copied().sum();

    if charges.discount_amount > gross_total {
        return Err(LedgerError::DiscountExceedsTotal {
            discount: charges.discount_amount,
            total: gross_total,
        });
    }

    let net_total = gross_total - charges.discount_amount;
    let grand_total = net_total + charges.vat_amount + charges.delivery_charge;
    let owed = (grand_total - settlement.returned_amount).max(Decimal::ZERO);
    let due_amount = (owed - settlement.paid_amount).max(Decimal::ZERO);
    let overpaid_amount = (settlement.paid_amount - owed).max(Decimal::ZERO);

    let payment_status = if due_amount.is_zero() {
        PaymentStatus::Paid
    } else if settlement.paid_amount > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Due
    };

    Ok(DocumentTotals {
        gross_total,
        discount_amount: charges.discount_amount,
        vat_amount: charges.vat_amount,
        delivery_charge: charges.delivery_charge,
        net_total,
        grand_total,
        due_amount,
        overpaid_amount,
        payment_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn charges(discount: Decimal, vat: Decimal, delivery: Decimal) -> DocumentCharges {
        DocumentCharges {
            discount_amount: discount,
            vat_amount: vat,
            delivery_charge: delivery,
        }
    }

    fn settled(paid: Decimal, returned: Decimal) -> SettlementState {
        SettlementState {
            paid_amount: paid,
            returned_amount: returned,
        }
    }

    #[test]
    fn test_price_line() {
        let line = price_line(dec!(3), dec!(19.99), dec!(2)).unwrap();
        assert_eq!(line.line_total, dec!(57.97));
    }

    #[test]
    fn test_price_line_fractional_quantity_rounds_amount() {
        let line = price_line(dec!(0.333), dec!(10), dec!(0)).unwrap();
        assert_eq!(line.line_total, dec!(3.33));
    }

    #[rstest]
    #[case(dec!(0), dec!(10), dec!(0), "INVALID_QUANTITY")]
    #[case(dec!(1), dec!(-1), dec!(0), "NEGATIVE_AMOUNT")]
    #[case(dec!(1), dec!(10), dec!(10.01), "DISCOUNT_EXCEEDS_TOTAL")]
    fn test_price_line_rejects(
        #[case] qty: Decimal,
        #[case] price: Decimal,
        #[case] discount: Decimal,
        #[case] code: &str,
    ) {
        assert_eq!(price_line(qty, price, discount).unwrap_err().error_code(), code);
    }

    #[test]
    fn test_compute_totals_full_chain() {
        let totals = compute_totals(
            &[dec!(100), dec!(50)],
            charges(dec!(10), dec!(7), dec!(3)),
            settled(dec!(60), dec!(0)),
        )
        .unwrap();

        assert_eq!(totals.gross_total, dec!(150));
        assert_eq!(totals.net_total, dec!(140));
        assert_eq!(totals.grand_total, dec!(150));
        assert_eq!(totals.due_amount, dec!(90));
        assert_eq!(totals.overpaid_amount, dec!(0));
        assert_eq!(totals.payment_status, PaymentStatus::Partial);
    }

    #[rstest]
    #[case(dec!(0), dec!(0), PaymentStatus::Due)]
    #[case(dec!(40), dec!(0), PaymentStatus::Partial)]
    #[case(dec!(100), dec!(0), PaymentStatus::Paid)]
    #[case(dec!(70), dec!(30), PaymentStatus::Paid)]
    fn test_payment_status(
        #[case] paid: Decimal,
        #[case] returned: Decimal,
        #[case] expected: PaymentStatus,
    ) {
        let totals =
            compute_totals(&[dec!(100)], DocumentCharges::default(), settled(paid, returned))
                .unwrap();
        assert_eq!(totals.payment_status, expected);
    }

    #[test]
    fn test_return_creates_overpayment() {
        let totals = compute_totals(
            &[dec!(100)],
            DocumentCharges::default(),
            settled(dec!(100), dec!(25)),
        )
        .unwrap();
        assert_eq!(totals.due_amount, dec!(0));
        assert_eq!(totals.overpaid_amount, dec!(25));
    }

    #[test]
    fn test_discount_cannot_exceed_gross() {
        let result = compute_totals(
            &[dec!(10)],
            charges(dec!(11), dec!(0), dec!(0)),
            SettlementState::default(),
        );
        assert!(matches!(result, Err(LedgerError::DiscountExceedsTotal { .. })));
    }

    #[test]
    fn test_negative_charge_rejected() {
        let result = compute_totals(
            &[dec!(10)],
            charges(dec!(0), dec!(-1), dec!(0)),
            SettlementState::default(),
        );
        assert_eq!(result, Err(LedgerError::NegativeAmount(dec!(-1))));
    }

    fn cents(max: i64) -> impl Strategy<Value = Decimal> {
        (0..max).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// due and overpaid are never both positive, and
        /// paid − overpaid + due equals what is owed.
        #[test]
        fn prop_due_and_overpaid_partition(
            lines in prop::collection::vec(cents(100_000), 1..10),
            vat in cents(10_000),
            delivery in cents(10_000),
            paid in cents(2_000_000),
            returned in cents(500_000),
        ) {
            let totals = compute_totals(
                &lines,
                charges(Decimal::ZERO, vat, delivery),
                settled(paid, returned),
            ).unwrap();

            prop_assert!(totals.due_amount.is_zero() || totals.overpaid_amount.is_zero());
            let owed = (totals.grand_total - returned).max(Decimal::ZERO);
            prop_assert_eq!(paid - totals.overpaid_amount + totals.due_amount, owed);
            prop_assert!(totals.due_amount >= Decimal::ZERO);
        }

        /// grand_total is gross − discount + vat + delivery for any valid discount.
        #[test]
        fn prop_grand_total_identity(
            lines in prop::collection::vec(cents(100_000), 1..10),
            discount_pct in 0u32..=100,
            vat in cents(10_000),
            delivery in cents(10_000),
        ) {
            let gross: Decimal = lines.iter().copied().sum();
            let discount = round_money(gross * Decimal::from(discount_pct) / Decimal::from(100));
            prop_assume!(discount <= gross);
            let totals = compute_totals(
                &lines,
                charges(discount, vat, delivery),
                SettlementState::default(),
            ).unwrap();
            prop_assert_eq!(totals.grand_total, gross - discount + vat + delivery);
        }
    }
}
