//! Purchase returns: goods back to the supplier, the purchase's value reduced and any
//! overpayment refunded in cash or kept as supplier advance.

use chrono::{NaiveDate, Utc};
use hisab_core::LedgerError;
use hisab_core::inventory::{DocumentLine, returnable_quantities, validate_return};
use hisab_core::numbering::DocumentKind;
use hisab_core::settlement::refund_amount;
use hisab_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::document::{Trade, TradeDocument, unbook_line};
use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::purchase::{load_purchase_items, lock_purchase, resettle_purchase};
use super::sale_return::ReturnItemInput;
use super::supplier::sync_supplier_advance;
use super::transaction::{PostingRequest, post};
use crate::entities::{purchase_return_items, purchase_returns};

const TRADE: Trade = Trade::Purchase;

/// Input for creating a purchase return.
#[derive(Debug, Clone)]
pub struct CreatePurchaseReturnInput {
    /// Purchase the goods came from.
    pub purchase_id: Uuid,
    /// Return date.
    pub return_date: NaiveDate,
    /// Returned products.
    pub items: Vec<ReturnItemInput>,
    /// Cash to get back, capped at the overpayment.
    pub refund_amount: Decimal,
    /// Account receiving the refund.
    pub account_id: Option<Uuid>,
    /// Free text.
    pub note: Option<String>,
}

/// Filter options for listing purchase returns.
#[derive(Debug, Clone, Default)]
pub struct PurchaseReturnFilter {
    /// Filter by purchase.
    pub purchase_id: Option<Uuid>,
    /// Filter by supplier.
    pub supplier_id: Option<Uuid>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// A purchase return with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReturnWithItems {
    /// Header.
    #[serde(flatten)]
    pub purchase_return: purchase_returns::Model,
    /// Lines.
    pub items: Vec<purchase_return_items::Model>,
}

/// Quantities already returned against a purchase, per return line.
async fn returned_so_far<C: ConnectionTrait>(
    conn: &C,
    purchase_id: Uuid,
) -> Result<Vec<(Uuid, Decimal)>, RepositoryError> {
    let return_ids: Vec<Uuid> = purchase_returns::Entity::find()
        .select_only()
        .column(purchase_returns::Column::Id)
        .filter(purchase_returns::Column::PurchaseId.eq(purchase_id))
        .into_tuple()
        .all(conn)
        .await?;
    if return_ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(purchase_return_items::Entity::find()
        .select_only()
        .column(purchase_return_items::Column::ProductId)
        .column(purchase_return_items::Column::Quantity)
        .filter(purchase_return_items::Column::PurchaseReturnId.is_in(return_ids))
        .into_tuple()
        .all(conn)
        .await?)
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    return_id: Uuid,
) -> Result<Vec<purchase_return_items::Model>, RepositoryError> {
    Ok(purchase_return_items::Entity::find()
        .filter(purchase_return_items::Column::PurchaseReturnId.eq(return_id))
        .all(conn)
        .await?)
}

/// Purchase return repository.
#[derive(Debug, Clone)]
pub struct PurchaseReturnRepository {
    db: DatabaseConnection,
}

impl PurchaseReturnRepository {
    /// Creates a new purchase return repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Sends goods back to the supplier of a purchase.
    ///
    /// The returned value is priced at the purchase's per-unit line value. Once
    /// the purchase is overpaid, up to the requested refund is paid out as a
    /// `purchase_refund` credit and the rest becomes supplier advance. Walk-in
    /// purchases refund the whole overpayment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No items are given, or a product was not on the purchase
    /// - A quantity exceeds what is still returnable
    /// - A refund is due without an account
    /// - Stock on hand is short
    pub async fn create_purchase_return(
        &self,
        company_id: Uuid,
        input: CreatePurchaseReturnInput,
    ) -> Result<PurchaseReturnWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let purchase = lock_purchase(&txn, company_id, input.purchase_id).await?;

        let sold: Vec<DocumentLine> = load_purchase_items(&txn, purchase.id)
            .await?
            .iter()
            .map(|i| DocumentLine {
                product_id: i.product_id,
                quantity: i.quantity,
                line_total: i.line_total,
            })
            .collect();
        let returned = returned_so_far(&txn, purchase.id).await?;
        let requested: Vec<(Uuid, Decimal)> =
            input.items.iter().map(|i| (i.product_id, i.quantity)).collect();
        let lines = validate_return(&returnable_quantities(&sold, &returned), &requested)
            .inspect_err(|e| warn!(purchase_id = %purchase.id, error = %e, "Purchase return rejected"))?;
        let total: Decimal = lines.iter().map(|l| l.line_total).sum();

        for line in &lines {
            unbook_line(&txn, company_id, TRADE, line.product_id, line.quantity).await?;
        }

        let return_id = Uuid::new_v4();
        let number = next_number(&txn, company_id, DocumentKind::PurchaseReturn).await?;
        let header = purchase_returns::ActiveModel {
            id: Set(return_id),
            company_id: Set(company_id),
            return_number: Set(number.clone()),
            purchase_id: Set(purchase.id),
            supplier_id: Set(purchase.supplier_id),
            return_date: Set(input.return_date),
            total_amount: Set(total),
            refund_amount: Set(Decimal::ZERO),
            account_id: Set(None),
            refund_transaction_id: Set(None),
            note: Set(input.note),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(
                purchase_return_items::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    purchase_return_id: Set(return_id),
                    product_id: Set(line.product_id),
                    quantity: Set(line.quantity),
                    unit_price: Set(line.unit_price),
                    line_total: Set(line.line_total),
                }
                .insert(&txn)
                .await?,
            );
        }

        let mut settlement = purchase.settlement();
        settlement.returned_amount += total;
        let charges = purchase.charges();
        let purchase = resettle_purchase(&txn, purchase, charges, settlement).await?;

        let overpaid = purchase.balance().overpaid();
        let refund = if purchase.party_id().is_none() {
            overpaid
        } else {
            refund_amount(input.refund_amount, overpaid)?
        };

        let purchase_return = if refund > Decimal::ZERO {
            let account_id = input.account_id.ok_or(LedgerError::PaymentAccountRequired)?;
            let (kind, side) = TRADE.refund();
            let transaction = post(
                &txn,
                PostingRequest {
                    company_id,
                    account_id,
                    kind,
                    side,
                    amount: refund,
                    date: input.return_date,
                    description: format!("Refund for {number} on {}", purchase.bill_number),
                    source: Some((TRADE.return_source(), return_id)),
                },
            )
            .await?;

            settlement.paid_amount -= refund;
            resettle_purchase(&txn, purchase.clone(), charges, settlement).await?;

            let mut active: purchase_returns::ActiveModel = header.into();
            active.refund_amount = Set(refund);
            active.account_id = Set(Some(account_id));
            active.refund_transaction_id = Set(Some(transaction.id));
            active.update(&txn).await?
        } else {
            header
        };

        if let Some(supplier_id) = purchase.supplier_id {
            sync_supplier_advance(&txn, company_id, supplier_id, true).await?;
        }
        txn.commit().await?;

        info!(
            company_id = %company_id,
            return_id = %return_id,
            number = %number,
            purchase_id = %purchase.id,
            total = %total,
            refund = %refund,
            "Purchase return created"
        );
        Ok(PurchaseReturnWithItems { purchase_return, items })
    }

    /// Gets a purchase return with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the return is not in the company.
    pub async fn get_purchase_return(
        &self,
        company_id: Uuid,
        return_id: Uuid,
    ) -> Result<PurchaseReturnWithItems, RepositoryError> {
        let purchase_return = purchase_returns::Entity::find_by_id(return_id)
            .filter(purchase_returns::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("PurchaseReturn", return_id))?;
        let items = load_items(&self.db, return_id).await?;

        Ok(PurchaseReturnWithItems { purchase_return, items })
    }

    /// Lists purchase returns, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_purchase_returns(
        &self,
        company_id: Uuid,
        filter: PurchaseReturnFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<purchase_returns::Model>, RepositoryError> {
        let mut query =
            purchase_returns::Entity::find().filter(purchase_returns::Column::CompanyId.eq(company_id));

        if let Some(purchase_id) = filter.purchase_id {
            query = query.filter(purchase_returns::Column::PurchaseId.eq(purchase_id));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchase_returns::Column::SupplierId.eq(supplier_id));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(purchase_returns::Column::ReturnDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(purchase_returns::Column::ReturnDate.lte(date_to));
        }

        let query = query
            .order_by_desc(purchase_returns::Column::ReturnDate)
            .order_by_desc(purchase_returns::Column::ReturnNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }
}
