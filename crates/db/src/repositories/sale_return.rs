//! Sale returns: goods back into stock, the sale's value reduced and any
//! overpayment refunded in cash or kept as customer advance.

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

use super::customer::sync_customer_advance;
use super::document::{Trade, TradeDocument, unbook_line};
use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::sale::{load_sale_items, lock_sale, resettle_sale};
use super::transaction::{PostingRequest, post};
use crate::entities::{sale_return_items, sale_returns};

/// One returned product.
#[derive(Debug, Clone, Copy)]
pub struct ReturnItemInput {
    /// Product being returned; must be on the original document.
    pub product_id: Uuid,
    /// Quantity returned.
    pub quantity: Decimal,
}

const TRADE: Trade = Trade::Sale;

/// Input for creating a sale return.
#[derive(Debug, Clone)]
pub struct CreateSaleReturnInput {
    /// Sale the goods came from.
    pub sale_id: Uuid,
    /// Return date.
    pub return_date: NaiveDate,
    /// Returned products.
    pub items: Vec<ReturnItemInput>,
    /// Cash to hand back, capped at the overpayment.
    pub refund_amount: Decimal,
    /// Account paying the refund.
    pub account_id: Option<Uuid>,
    /// Free text.
    pub note: Option<String>,
}

/// Filter options for listing sale returns.
#[derive(Debug, Clone, Default)]
pub struct SaleReturnFilter {
    /// Filter by sale.
    pub sale_id: Option<Uuid>,
    /// Filter by customer.
    pub customer_id: Option<Uuid>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// A sale return with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReturnWithItems {
    /// Header.
    #[serde(flatten)]
    pub sale_return: sale_returns::Model,
    /// Lines.
    pub items: Vec<sale_return_items::Model>,
}

/// Quantities already returned against a sale, per return line.
async fn returned_so_far<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
) -> Result<Vec<(Uuid, Decimal)>, RepositoryError> {
    let return_ids: Vec<Uuid> = sale_returns::Entity::find()
        .select_only()
        .column(sale_returns::Column::Id)
        .filter(sale_returns::Column::SaleId.eq(sale_id))
        .into_tuple()
        .all(conn)
        .await?;
    if return_ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(sale_return_items::Entity::find()
        .select_only()
        .column(sale_return_items::Column::ProductId)
        .column(sale_return_items::Column::Quantity)
        .filter(sale_return_items::Column::SaleReturnId.is_in(return_ids))
        .into_tuple()
        .all(conn)
        .await?)
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    return_id: Uuid,
) -> Result<Vec<sale_return_items::Model>, RepositoryError> {
    Ok(sale_return_items::Entity::find()
        .filter(sale_return_items::Column::SaleReturnId.eq(return_id))
        .all(conn)
        .await?)
}

/// Sale return repository.
#[derive(Debug, Clone)]
pub struct SaleReturnRepository {
    db: DatabaseConnection,
}

impl SaleReturnRepository {
    /// Creates a new sale return repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Takes goods back from a sale.
    ///
    /// The returned value is priced at the sale's per-unit line value. Once
    /// the sale is overpaid, up to the requested refund is paid out as a
    /// `sale_refund` debit and the rest becomes customer advance. Walk-in
    /// sales refund the whole overpayment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No items are given, or a product was not on the sale
    /// - A quantity exceeds what is still returnable
    /// - A refund is due without an account
    /// - The refund account is cash without enough balance
    pub async fn create_sale_return(
        &self,
        company_id: Uuid,
        input: CreateSaleReturnInput,
    ) -> Result<SaleReturnWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let sale = lock_sale(&txn, company_id, input.sale_id).await?;

        let sold: Vec<DocumentLine> = load_sale_items(&txn, sale.id)
            .await?
            .iter()
            .map(|i| DocumentLine {
                product_id: i.product_id,
                quantity: i.quantity,
                line_total: i.line_total,
            })
            .collect();
        let returned = returned_so_far(&txn, sale.id).await?;
        let requested: Vec<(Uuid, Decimal)> =
            input.items.iter().map(|i| (i.product_id, i.quantity)).collect();
        let lines = validate_return(&returnable_quantities(&sold, &returned), &requested)
            .inspect_err(|e| warn!(sale_id = %sale.id, error = %e, "Sale return rejected"))?;
        let total: Decimal = lines.iter().map(|l| l.line_total).sum();

        for line in &lines {
            unbook_line(&txn, company_id, TRADE, line.product_id, line.quantity).await?;
        }

        let return_id = Uuid::new_v4();
        let number = next_number(&txn, company_id, DocumentKind::SaleReturn).await?;
        let header = sale_returns::ActiveModel {
            id: Set(return_id),
            company_id: Set(company_id),
            return_number: Set(number.clone()),
            sale_id: Set(sale.id),
            customer_id: Set(sale.customer_id),
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
                sale_return_items::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    sale_return_id: Set(return_id),
                    product_id: Set(line.product_id),
                    quantity: Set(line.quantity),
                    unit_price: Set(line.unit_price),
                    line_total: Set(line.line_total),
                }
                .insert(&txn)
                .await?,
            );
        }

        let mut settlement = sale.settlement();
        settlement.returned_amount += total;
        let charges = sale.charges();
        let sale = resettle_sale(&txn, sale, charges, settlement).await?;

        let overpaid = sale.balance().overpaid();
        let refund = if sale.party_id().is_none() {
            overpaid
        } else {
            refund_amount(input.refund_amount, overpaid)?
        };

        let sale_return = if refund > Decimal::ZERO {
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
                    description: format!("Refund for {number} on {}", sale.invoice_number),
                    source: Some((TRADE.return_source(), return_id)),
                },
            )
            .await?;

            settlement.paid_amount -= refund;
            resettle_sale(&txn, sale.clone(), charges, settlement).await?;

            let mut active: sale_returns::ActiveModel = header.into();
            active.refund_amount = Set(refund);
            active.account_id = Set(Some(account_id));
            active.refund_transaction_id = Set(Some(transaction.id));
            active.update(&txn).await?
        } else {
            header
        };

        if let Some(customer_id) = sale.customer_id {
            sync_customer_advance(&txn, company_id, customer_id, true).await?;
        }
        txn.commit().await?;

        info!(
            company_id = %company_id,
            return_id = %return_id,
            number = %number,
            sale_id = %sale.id,
            total = %total,
            refund = %refund,
            "Sale return created"
        );
        Ok(SaleReturnWithItems { sale_return, items })
    }

    /// Gets a sale return with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the return is not in the company.
    pub async fn get_sale_return(
        &self,
        company_id: Uuid,
        return_id: Uuid,
    ) -> Result<SaleReturnWithItems, RepositoryError> {
        let sale_return = sale_returns::Entity::find_by_id(return_id)
            .filter(sale_returns::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("SaleReturn", return_id))?;
        let items = load_items(&self.db, return_id).await?;

        Ok(SaleReturnWithItems { sale_return, items })
    }

    /// Lists sale returns, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_sale_returns(
        &self,
        company_id: Uuid,
        filter: SaleReturnFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<sale_returns::Model>, RepositoryError> {
        let mut query =
            sale_returns::Entity::find().filter(sale_returns::Column::CompanyId.eq(company_id));

        if let Some(sale_id) = filter.sale_id {
            query = query.filter(sale_returns::Column::SaleId.eq(sale_id));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(sale_returns::Column::CustomerId.eq(customer_id));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(sale_returns::Column::ReturnDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(sale_returns::Column::ReturnDate.lte(date_to));
        }

        let query = query
            .order_by_desc(sale_returns::Column::ReturnDate)
            .order_by_desc(sale_returns::Column::ReturnNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }
}
