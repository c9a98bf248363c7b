//! Stock movements and return limits.

use std::cmp::Ordering;
use std::collections::HashMap;

use hisab_shared::types::{round_money, round_quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Cause of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockMovement {
    /// Goods leave on a sale.
    Sale,
    /// Goods arrive on a purchase.
    Purchase,
    /// Customer brings goods back.
    SaleReturn,
    /// Goods go back to the supplier.
    PurchaseReturn,
}

impl StockMovement {
    /// Signed stock delta for `quantity` units.
    #[must_use]
    pub fn delta(self, quantity: Decimal) -> Decimal {
        match self {
            Self::Purchase | Self::SaleReturn => quantity,
            Self::Sale | Self::PurchaseReturn => -quantity,
        }
    }

    /// The movement that undoes this one.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Sale => Self::SaleReturn,
            Self::SaleReturn => Self::Sale,
            Self::Purchase => Self::PurchaseReturn,
            Self::PurchaseReturn => Self::Purchase,
        }
    }

    /// Net movement that resizes a line booked with `self` from `old` to
    /// `new` units, or `None` when the quantity is unchanged.
    ///
    /// Only the difference touches stock, so shrinking a purchase line
    /// after some of it was sold needs just the shrink to be on hand.
    #[must_use]
    pub fn requantify(self, old: Decimal, new: Decimal) -> Option<(Self, Decimal)> {
        match new.cmp(&old) {
            Ordering::Greater => Some((self, new - old)),
            Ordering::Less => Some((self.inverse(), old - new)),
            Ordering::Equal => None,
        }
    }
}

/// Applies a stock delta and returns the new quantity.
///
/// # Errors
///
/// Returns `InsufficientStock` when the result would be negative.
pub fn apply_stock(
    product_id: Uuid,
    current: Decimal,
    delta: Decimal,
) -> Result<Decimal, LedgerError> {
    let delta = round_quantity(delta);
    let next = current + delta;
    if next < Decimal::ZERO {
        return Err(LedgerError::InsufficientStock {
            product_id,
            available: current,
            required: -delta,
        });
    }
    Ok(next)
}

/// One line of a sale or purchase, aggregated per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLine {
    /// Product ID.
    pub product_id: Uuid,
    /// Quantity on the document.
    pub quantity: Decimal,
    /// Net line amount after line discount.
    pub line_total: Decimal,
}

/// What remains returnable for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Returnable {
    /// Quantity not yet returned.
    pub quantity: Decimal,
    /// Effective price per unit after line discounts.
    pub unit_price: Decimal,
}

/// Builds the per-product returnable quantities of a document.
///
/// `returned` lists quantities already returned by earlier returns.
#[must_use]
pub fn returnable_quantities(
    lines: &[DocumentLine],
    returned: &[(Uuid, Decimal)],
) -> HashMap<Uuid, Returnable> {
    let mut totals: HashMap<Uuid, (Decimal, Decimal)> = HashMap::new();
    for line in lines {
        let entry = totals.entry(line.product_id).or_default();
        entry.0 += line.quantity;
        entry.1 += line.line_total;
    }

    let mut out: HashMap<Uuid, Returnable> = totals
        .into_iter()
        .filter(|(_, (qty, _))| *qty > Decimal::ZERO)
        .map(|(id, (qty, total))| {
            (
                id,
                Returnable {
                    quantity: qty,
                    unit_price: round_money(total / qty),
                },
            )
        })
        .collect();

    for (product_id, qty) in returned {
        if let Some(r) = out.get_mut(product_id) {
            r.quantity = (r.quantity - *qty).max(Decimal::ZERO);
        }
    }
    out
}

/// A validated return line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnLine {
    /// Product ID.
    pub product_id: Uuid,
    /// Quantity returned.
    pub quantity: Decimal,
    /// Price credited per unit.
    pub unit_price: Decimal,
    /// Value credited.
    pub line_total: Decimal,
}

/// Validates requested return lines against what remains returnable.
///
/// Repeated products are checked on their combined quantity.
///
/// # Errors
///
/// - `EmptyDocument` for no lines
/// - `InvalidQuantity` for a non-positive quantity
/// - `ProductNotOnDocument` for a product the document does not carry
/// - `ReturnExceedsQuantity` when more is requested than remains
pub fn validate_return(
    returnable: &HashMap<Uuid, Returnable>,
    requested: &[(Uuid, Decimal)],
) -> Result<Vec<ReturnLine>, LedgerError> {
    if requested.is_empty() {
        return Err(LedgerError::EmptyDocument);
    }

    let mut used: HashMap<Uuid, Decimal> = HashMap::new();
    let mut lines = Vec::with_capacity(requested.len());

    for (product_id, quantity) in requested {
        let quantity = round_quantity(*quantity);
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        let available = returnable
            .get(product_id)
            .ok_or(LedgerError::ProductNotOnDocument(*product_id))?;

        let so_far = used.entry(*product_id).or_default();
        let remaining = available.quantity - *so_far;
        if quantity > remaining {
            return Err(LedgerError::ReturnExceedsQuantity {
                product_id: *product_id,
                returnable: remaining,
                requested: quantity,
            });
        }
        *so_far += quantity;

        lines.push(ReturnLine {
            product_id: *product_id,
            quantity,
            unit_price: available.unit_price,
            line_total: round_money(quantity * available.unit_price),
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(StockMovement::Sale, dec!(-2))]
    #[case(StockMovement::Purchase, dec!(2))]
    #[case(StockMovement::SaleReturn, dec!(2))]
    #[case(StockMovement::PurchaseReturn, dec!(-2))]
    fn test_movement_delta(#[case] movement: StockMovement, #[case] expected: Decimal) {
        assert_eq!(movement.delta(dec!(2)), expected);
        assert_eq!(movement.inverse().delta(dec!(2)), -expected);
    }

    #[rstest]
    #[case::grow_purchase(StockMovement::Purchase, dec!(10), dec!(12), Some((StockMovement::Purchase, dec!(2))))]
    #[case::shrink_purchase(StockMovement::Purchase, dec!(10), dec!(9), Some((StockMovement::PurchaseReturn, dec!(1))))]
    #[case::grow_sale(StockMovement::Sale, dec!(2), dec!(5), Some((StockMovement::Sale, dec!(3))))]
    #[case::shrink_sale(StockMovement::Sale, dec!(5), dec!(2), Some((StockMovement::SaleReturn, dec!(3))))]
    #[case::unchanged(StockMovement::Sale, dec!(4), dec!(4.000), None)]
    fn test_requantify(
        #[case] booked: StockMovement,
        #[case] old: Decimal,
        #[case] new: Decimal,
        #[case] expected: Option<(StockMovement, Decimal)>,
    ) {
        assert_eq!(booked.requantify(old, new), expected);
    }

    #[test]
    fn test_shrinking_purchase_line_needs_only_the_difference_on_hand() {
        let id = Uuid::new_v4();
        // 10 bought, 8 sold: 2 on hand, line cut to 9.
        let (movement, qty) = StockMovement::Purchase
            .requantify(dec!(10), dec!(9))
            .unwrap();
        assert_eq!(apply_stock(id, dec!(2), movement.delta(qty)), Ok(dec!(1)));
    }

    #[test]
    fn test_apply_stock_rejects_negative() {
        let id = Uuid::new_v4();
        assert_eq!(
            apply_stock(id, dec!(3), dec!(-5)),
            Err(LedgerError::InsufficientStock {
                product_id: id,
                available: dec!(3),
                required: dec!(5),
            })
        );
        assert_eq!(apply_stock(id, dec!(3), dec!(-3)), Ok(dec!(0)));
    }

    fn line(product_id: Uuid, quantity: Decimal, line_total: Decimal) -> DocumentLine {
        DocumentLine {
            product_id,
            quantity,
            line_total,
        }
    }

    #[test]
    fn test_returnable_aggregates_and_subtracts() {
        let p = Uuid::new_v4();
        let map = returnable_quantities(
            &[line(p, dec!(2), dec!(20)), line(p, dec!(3), dec!(30))],
            &[(p, dec!(1))],
        );
        assert_eq!(
            map[&p],
            Returnable {
                quantity: dec!(4),
                unit_price: dec!(10),
            }
        );
    }

    #[test]
    fn test_return_priced_after_line_discount() {
        let p = Uuid::new_v4();
        let map = returnable_quantities(&[line(p, dec!(4), dec!(90))], &[]);
        let lines = validate_return(&map, &[(p, dec!(2))]).unwrap();
        assert_eq!(lines[0].unit_price, dec!(22.50));
        assert_eq!(lines[0].line_total, dec!(45.00));
    }

    #[test]
    fn test_return_unknown_product() {
        let p = Uuid::new_v4();
        let other = Uuid::new_v4();
        let map = returnable_quantities(&[line(p, dec!(1), dec!(5))], &[]);
        assert_eq!(
            validate_return(&map, &[(other, dec!(1))]),
            Err(LedgerError::ProductNotOnDocument(other))
        );
    }

    #[test]
    fn test_return_repeated_product_combined() {
        let p = Uuid::new_v4();
        let map = returnable_quantities(&[line(p, dec!(3), dec!(30))], &[]);
        let result = validate_return(&map, &[(p, dec!(2)), (p, dec!(2))]);
        assert_eq!(
            result,
            Err(LedgerError::ReturnExceedsQuantity {
                product_id: p,
                returnable: dec!(1),
                requested: dec!(2),
            })
        );
    }

    #[test]
    fn test_return_empty_rejected() {
        assert_eq!(
            validate_return(&HashMap::new(), &[]),
            Err(LedgerError::EmptyDocument)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Successive returns can never exceed what was sold.
        #[test]
        fn prop_returns_bounded_by_sold(
            sold in 1i64..1000,
            requests in prop::collection::vec(1i64..300, 1..10),
        ) {
            let p = Uuid::new_v4();
            let lines = [line(p, Decimal::from(sold), Decimal::from(sold * 5))];
            let mut returned: Vec<(Uuid, Decimal)> = Vec::new();

            for qty in requests {
                let map = returnable_quantities(&lines, &returned);
                if let Ok(accepted) = validate_return(&map, &[(p, Decimal::from(qty))]) {
                    returned.extend(accepted.iter().map(|l| (l.product_id, l.quantity)));
                }
            }

            let total: Decimal = returned.iter().map(|(_, q)| *q).sum();
            prop_assert!(total <= Decimal::from(sold));
        }

        /// Stock never goes negative through `apply_stock`.
        #[test]
        fn prop_stock_never_negative(deltas in prop::collection::vec(-50i64..50, 1..40)) {
            let id = Uuid::nil();
            let mut stock = Decimal::ZERO;
            for d in deltas {
                if let Ok(next) = apply_stock(id, stock, Decimal::from(d)) {
                    stock = next;
                }
                prop_assert!(stock >= Decimal::ZERO);
            }
        }

        /// Resizing a line moves stock exactly as undoing and rebooking it would.
        #[test]
        fn prop_requantify_matches_undo_then_rebook(
            purchase in any::<bool>(),
            old in 0i64..500,
            new in 0i64..500,
        ) {
            let booked = if purchase { StockMovement::Purchase } else { StockMovement::Sale };
            let (old, new) = (Decimal::from(old), Decimal::from(new));
            let net = booked
                .requantify(old, new)
                .map_or(Decimal::ZERO, |(movement, qty)| movement.delta(qty));
            prop_assert_eq!(net, booked.inverse().delta(old) + booked.delta(new));
        }
    }
}
