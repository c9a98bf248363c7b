//! Rules shared by sales and purchases.
//!
//! Both documents carry the same header arithmetic and differ only in the
//! direction goods and money flow. [`Trade`] holds that direction, and
//! [`TradeDocument`] exposes the header fields the shared rules read.

use hisab_core::LedgerError;
use hisab_core::billing::{DocumentCharges, SettlementState};
use hisab_core::inventory::StockMovement;
use hisab_core::ledger::{EntrySide, TransactionKind};
use hisab_core::numbering::DocumentKind;
use hisab_core::settlement::{DocumentBalance, OpenDocument};
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use super::error::RepositoryError;
use super::product::move_stock;
use super::transaction::Source;
use crate::entities::{purchases, sales};

/// Which way goods and money flow on a trade document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trade {
    /// Goods out, money in.
    Sale,
    /// Goods in, money out.
    Purchase,
}

impl Trade {
    /// Stock movement of a booked line.
    pub(crate) const fn booking(self) -> StockMovement {
        match self {
            Self::Sale => StockMovement::Sale,
            Self::Purchase => StockMovement::Purchase,
        }
    }

    /// Stock movement of goods coming back on a return.
    pub(crate) const fn returning(self) -> StockMovement {
        self.booking().inverse()
    }

    /// Number sequence of the document.
    pub(crate) const fn numbering(self) -> DocumentKind {
        match self {
            Self::Sale => DocumentKind::Sale,
            Self::Purchase => DocumentKind::Purchase,
        }
    }

    /// Ledger kind and side of cash paid on the document.
    pub(crate) const fn payment(self) -> (TransactionKind, EntrySide) {
        match self {
            Self::Sale => (TransactionKind::SalePayment, EntrySide::Credit),
            Self::Purchase => (TransactionKind::PurchasePayment, EntrySide::Debit),
        }
    }

    /// Ledger kind and side of cash refunded on a return.
    pub(crate) const fn refund(self) -> (TransactionKind, EntrySide) {
        match self {
            Self::Sale => (TransactionKind::SaleRefund, EntrySide::Debit),
            Self::Purchase => (TransactionKind::PurchaseRefund, EntrySide::Credit),
        }
    }

    /// Owner tag of payment rows.
    pub(crate) const fn source(self) -> Source {
        match self {
            Self::Sale => Source::Sale,
            Self::Purchase => Source::Purchase,
        }
    }

    /// Owner tag of refund rows.
    pub(crate) const fn return_source(self) -> Source {
        match self {
            Self::Sale => Source::SaleReturn,
            Self::Purchase => Source::PurchaseReturn,
        }
    }
}

/// Header fields of a sale or purchase.
pub(crate) trait TradeDocument {
    /// Customer or supplier; `None` for walk-in documents.
    fn party_id(&self) -> Option<Uuid>;
    /// Current due.
    fn due_amount(&self) -> Decimal;
    /// Header-level charges.
    fn charges(&self) -> DocumentCharges;
    /// Paid and returned amounts.
    fn settlement(&self) -> SettlementState;
    /// Figures used for overpayment and advance.
    fn balance(&self) -> DocumentBalance;
    /// Allocation view of the document.
    fn open(&self) -> OpenDocument;
}

impl TradeDocument for sales::Model {
    fn party_id(&self) -> Option<Uuid> {
        self.customer_id
    }

    fn due_amount(&self) -> Decimal {
        self.due_amount
    }

    fn charges(&self) -> DocumentCharges {
        DocumentCharges {
            discount_amount: self.discount_amount,
            vat_amount: self.vat_amount,
            delivery_charge: self.delivery_charge,
        }
    }

    fn settlement(&self) -> SettlementState {
        SettlementState {
            paid_amount: self.paid_amount,
            returned_amount: self.returned_amount,
        }
    }

    fn balance(&self) -> DocumentBalance {
        DocumentBalance {
            grand_total: self.grand_total,
            returned_amount: self.returned_amount,
            paid_amount: self.paid_amount,
            advance_used: self.advance_used,
        }
    }

    fn open(&self) -> OpenDocument {
        OpenDocument {
            id: self.id,
            date: self.sale_date,
            number: self.invoice_number.clone(),
            due_amount: self.due_amount,
        }
    }
}

impl TradeDocument for purchases::Model {
    fn party_id(&self) -> Option<Uuid> {
        self.supplier_id
    }

    fn due_amount(&self) -> Decimal {
        self.due_amount
    }

    fn charges(&self) -> DocumentCharges {
        DocumentCharges {
            discount_amount: self.discount_amount,
            vat_amount: self.vat_amount,
            delivery_charge: self.delivery_charge,
        }
    }

    fn settlement(&self) -> SettlementState {
        SettlementState {
            paid_amount: self.paid_amount,
            returned_amount: self.returned_amount,
        }
    }

    fn balance(&self) -> DocumentBalance {
        DocumentBalance {
            grand_total: self.grand_total,
            returned_amount: self.returned_amount,
            paid_amount: self.paid_amount,
            advance_used: self.advance_used,
        }
    }

    fn open(&self) -> OpenDocument {
        OpenDocument {
            id: self.id,
            date: self.purchase_date,
            number: self.bill_number.clone(),
            due_amount: self.due_amount,
        }
    }
}

/// Walk-in documents have nobody to carry a due.
pub(crate) fn ensure_walk_in_settled<D: TradeDocument>(doc: &D) -> Result<(), LedgerError> {
    let due = doc.due_amount();
    if doc.party_id().is_none() && due > Decimal::ZERO {
        return Err(LedgerError::UnpaidWithoutParty(due));
    }
    Ok(())
}

/// Moves stock for a newly booked line.
pub(crate) async fn book_line<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    trade: Trade,
    product_id: Uuid,
    quantity: Decimal,
) -> Result<(), RepositoryError> {
    move_stock(conn, company_id, product_id, trade.booking(), quantity).await?;
    Ok(())
}

/// Undoes the stock of a line that is removed or goes back on a return.
pub(crate) async fn unbook_line<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    trade: Trade,
    product_id: Uuid,
    quantity: Decimal,
) -> Result<(), RepositoryError> {
    move_stock(conn, company_id, product_id, trade.returning(), quantity).await?;
    Ok(())
}

/// Moves only the net stock change of a line resized from `old` to `new`.
pub(crate) async fn rebook_line<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    trade: Trade,
    product_id: Uuid,
    old: Decimal,
    new: Decimal,
) -> Result<(), RepositoryError> {
    if let Some((movement, quantity)) = trade.booking().requantify(old, new) {
        move_stock(conn, company_id, product_id, movement, quantity).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_directions_mirror() {
        assert_eq!(Trade::Sale.booking().delta(dec!(1)), dec!(-1));
        assert_eq!(Trade::Purchase.booking().delta(dec!(1)), dec!(1));
        assert_eq!(Trade::Sale.returning(), StockMovement::SaleReturn);
        assert_eq!(Trade::Purchase.returning(), StockMovement::PurchaseReturn);

        for trade in [Trade::Sale, Trade::Purchase] {
            let (_, paid) = trade.payment();
            let (_, refunded) = trade.refund();
            assert_ne!(paid, refunded);
        }
    }
}
