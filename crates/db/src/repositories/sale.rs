//! Sale repository: invoices, their items and derived totals.
//!
//! Every mutation runs in one database transaction that moves stock, posts
//! cash payments to the ledger, recomputes the sale header from its items
//! and reconciles the customer's advance.

use chrono::{NaiveDate, Utc};
use hisab_core::LedgerError;
use hisab_core::billing::{
    DocumentCharges, DocumentTotals, PaymentStatus, SettlementState, compute_totals, price_line,
};
use hisab_core::settlement::draw_advance;
use hisab_shared::types::{PageRequest, PageResponse, round_money};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::company::require_company;
use super::customer::{lock_customer, sync_customer_advance};
use super::document::{
    Trade, TradeDocument, book_line, ensure_walk_in_settled, rebook_line, unbook_line,
};
use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::transaction::{PostingRequest, post, reverse_source};
use crate::entities::{
    money_receipt_allocations, money_receipts, products, sale_items, sale_returns, sales,
    sea_orm_active_enums,
};

const TRADE: Trade = Trade::Sale;

/// One line of a new sale.
#[derive(Debug, Clone)]
pub struct SaleItemInput {
    /// Product sold.
    pub product_id: Uuid,
    /// Quantity sold.
    pub quantity: Decimal,
    /// Price per unit; the product's sale price when omitted.
    pub unit_price: Option<Decimal>,
    /// Line discount.
    pub discount_amount: Decimal,
}

/// Input for changing an existing sale line.
#[derive(Debug, Clone, Default)]
pub struct UpdateSaleItemInput {
    /// Quantity sold.
    pub quantity: Option<Decimal>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Line discount.
    pub discount_amount: Option<Decimal>,
}

/// Input for creating a sale.
#[derive(Debug, Clone)]
pub struct CreateSaleInput {
    /// Customer; `None` for a walk-in sale.
    pub customer_id: Option<Uuid>,
    /// Invoice date.
    pub sale_date: NaiveDate,
    /// Account receiving the cash payment.
    pub account_id: Option<Uuid>,
    /// Line items, at least one.
    pub items: Vec<SaleItemInput>,
    /// Invoice-level discount.
    pub discount_amount: Decimal,
    /// VAT charged.
    pub vat_amount: Decimal,
    /// Delivery charge.
    pub delivery_charge: Decimal,
    /// Cash paid at the counter.
    pub paid_amount: Decimal,
    /// Customer advance to spend on this sale.
    pub advance_used: Decimal,
    /// Free text.
    pub note: Option<String>,
}

/// Input for updating sale header fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateSaleInput {
    /// Invoice date.
    pub sale_date: Option<NaiveDate>,
    /// Invoice-level discount.
    pub discount_amount: Option<Decimal>,
    /// VAT charged.
    pub vat_amount: Option<Decimal>,
    /// Delivery charge.
    pub delivery_charge: Option<Decimal>,
    /// Free text.
    pub note: Option<Option<String>>,
}

/// Filter options for listing sales.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    /// Filter by customer.
    pub customer_id: Option<Uuid>,
    /// Filter by payment status.
    pub status: Option<PaymentStatus>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// A sale with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    /// Header.
    #[serde(flatten)]
    pub sale: sales::Model,
    /// Lines.
    pub items: Vec<sale_items::Model>,
}

fn write_totals(active: &mut sales::ActiveModel, totals: &DocumentTotals, settlement: SettlementState) {
    active.gross_total = Set(totals.gross_total);
    active.discount_amount = Set(totals.discount_amount);
    active.vat_amount = Set(totals.vat_amount);
    active.delivery_charge = Set(totals.delivery_charge);
    active.net_total = Set(totals.net_total);
    active.grand_total = Set(totals.grand_total);
    active.paid_amount = Set(settlement.paid_amount);
    active.returned_amount = Set(settlement.returned_amount);
    active.due_amount = Set(totals.due_amount);
    active.payment_status = Set(totals.payment_status.into());
    active.updated_at = Set(Utc::now().into());
}

/// Loads a sale of the company and locks it for update.
pub(crate) async fn lock_sale<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    sale_id: Uuid,
) -> Result<sales::Model, RepositoryError> {
    sales::Entity::find_by_id(sale_id)
        .filter(sales::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Sale", sale_id))
}

pub(crate) async fn load_sale_items<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
) -> Result<Vec<sale_items::Model>, RepositoryError> {
    Ok(sale_items::Entity::find()
        .filter(sale_items::Column::SaleId.eq(sale_id))
        .order_by_asc(sale_items::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// Recomputes a sale's header from its items, charges and settlement.
pub(crate) async fn resettle_sale<C: ConnectionTrait>(
    conn: &C,
    sale: sales::Model,
    charges: DocumentCharges,
    settlement: SettlementState,
) -> Result<sales::Model, RepositoryError> {
    let line_totals: Vec<Decimal> = load_sale_items(conn, sale.id)
        .await?
        .iter()
        .map(|i| i.line_total)
        .collect();
    let totals = compute_totals(&line_totals, charges, settlement)?;

    let mut active: sales::ActiveModel = sale.into();
    write_totals(&mut active, &totals, settlement);
    Ok(active.update(conn).await?)
}

/// Reconciles the sale's customer, if any.
pub(crate) async fn sync_sale_party<C: ConnectionTrait>(
    conn: &C,
    sale: &sales::Model,
) -> Result<(), RepositoryError> {
    if let Some(customer_id) = sale.customer_id {
        sync_customer_advance(conn, sale.company_id, customer_id, true).await?;
    }
    Ok(())
}

async fn ensure_no_returns<C: ConnectionTrait>(conn: &C, sale_id: Uuid) -> Result<(), RepositoryError> {
    let returns = sale_returns::Entity::find()
        .filter(sale_returns::Column::SaleId.eq(sale_id))
        .count(conn)
        .await?;
    if returns > 0 {
        return Err(LedgerError::HasReturns(sale_id).into());
    }
    Ok(())
}

async fn insert_item<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    sale_id: Uuid,
    item: &SaleItemInput,
) -> Result<sale_items::Model, RepositoryError> {
    let unit_price = match item.unit_price {
        Some(price) => price,
        None => {
            products::Entity::find_by_id(item.product_id)
                .filter(products::Column::CompanyId.eq(company_id))
                .one(conn)
                .await?
                .ok_or(RepositoryError::not_found("Product", item.product_id))?
                .sale_price
        }
    };
    let line = price_line(item.quantity, unit_price, item.discount_amount)?;
    book_line(conn, company_id, TRADE, item.product_id, line.quantity).await?;

    Ok(sale_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        sale_id: Set(sale_id),
        product_id: Set(item.product_id),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        discount_amount: Set(line.discount_amount),
        line_total: Set(line.line_total),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?)
}

/// Sale repository.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: DatabaseConnection,
}

impl SaleRepository {
    /// Creates a new sale repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a sale with its items and optional payment.
    ///
    /// Cash is posted to `account_id` as a `sale_payment` credit. Advance is
    /// drawn from the customer and capped at what the invoice still owes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are no items, or a line is invalid
    /// - Stock is insufficient
    /// - Cash is paid without an account
    /// - More advance is requested than the customer holds
    /// - A walk-in sale is not fully paid
    pub async fn create_sale(
        &self,
        company_id: Uuid,
        input: CreateSaleInput,
    ) -> Result<SaleWithItems, RepositoryError> {
        if input.items.is_empty() {
            return Err(LedgerError::EmptyDocument.into());
        }
        let cash = round_money(input.paid_amount);
        if cash < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(cash).into());
        }
        if cash > Decimal::ZERO && input.account_id.is_none() {
            return Err(LedgerError::PaymentAccountRequired.into());
        }
        let charges = DocumentCharges {
            discount_amount: input.discount_amount,
            vat_amount: input.vat_amount,
            delivery_charge: input.delivery_charge,
        }
        .normalized()?;

        let txn = self.db.begin().await?;
        require_company(&txn, company_id).await?;

        let available_advance = match input.customer_id {
            Some(customer_id) => lock_customer(&txn, company_id, customer_id).await?.advance_balance,
            None => Decimal::ZERO,
        };

        let sale_id = Uuid::new_v4();
        let invoice_number = next_number(&txn, company_id, TRADE.numbering()).await?;
        let now = Utc::now().into();

        // Header first so items can reference it; totals are filled in below.
        let header = sales::ActiveModel {
            id: Set(sale_id),
            company_id: Set(company_id),
            invoice_number: Set(invoice_number.clone()),
            customer_id: Set(input.customer_id),
            sale_date: Set(input.sale_date),
            account_id: Set(input.account_id),
            gross_total: Set(Decimal::ZERO),
            discount_amount: Set(Decimal::ZERO),
            vat_amount: Set(Decimal::ZERO),
            delivery_charge: Set(Decimal::ZERO),
            net_total: Set(Decimal::ZERO),
            grand_total: Set(Decimal::ZERO),
            paid_amount: Set(Decimal::ZERO),
            advance_used: Set(Decimal::ZERO),
            returned_amount: Set(Decimal::ZERO),
            due_amount: Set(Decimal::ZERO),
            payment_status: Set(sea_orm_active_enums::PaymentStatus::Due),
            note: Set(input.note),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(insert_item(&txn, company_id, sale_id, item).await?);
        }

        let line_totals: Vec<Decimal> = items.iter().map(|i| i.line_total).collect();
        let unpaid = compute_totals(&line_totals, charges, SettlementState::default())?;
        let advance_used = draw_advance(input.advance_used, available_advance, unpaid.due_amount)
            .inspect_err(|e| warn!(company_id = %company_id, error = %e, "Sale rejected"))?;

        let settlement = SettlementState {
            paid_amount: cash + advance_used,
            returned_amount: Decimal::ZERO,
        };
        let totals = compute_totals(&line_totals, charges, settlement)?;

        let mut active: sales::ActiveModel = header.into();
        write_totals(&mut active, &totals, settlement);
        active.advance_used = Set(advance_used);
        let sale = active.update(&txn).await?;

        ensure_walk_in_settled(&sale)
            .inspect_err(|e| warn!(company_id = %company_id, error = %e, "Sale rejected"))?;

        if let (Some(account_id), true) = (input.account_id, cash > Decimal::ZERO) {
            let (kind, side) = TRADE.payment();
            post(
                &txn,
                PostingRequest {
                    company_id,
                    account_id,
                    kind,
                    side,
                    amount: cash,
                    date: sale.sale_date,
                    description: format!("Payment for {invoice_number}"),
                    source: Some((TRADE.source(), sale_id)),
                },
            )
            .await?;
        }

        sync_sale_party(&txn, &sale).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            sale_id = %sale.id,
            number = %sale.invoice_number,
            grand_total = %sale.grand_total,
            due = %sale.due_amount,
            "Sale created"
        );
        Ok(SaleWithItems { sale, items })
    }

    /// Gets a sale with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sale is not in the company.
    pub async fn get_sale(
        &self,
        company_id: Uuid,
        sale_id: Uuid,
    ) -> Result<SaleWithItems, RepositoryError> {
        let sale = sales::Entity::find_by_id(sale_id)
            .filter(sales::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Sale", sale_id))?;
        let items = load_sale_items(&self.db, sale_id).await?;

        Ok(SaleWithItems { sale, items })
    }

    /// Lists sales, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_sales(
        &self,
        company_id: Uuid,
        filter: SaleFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<sales::Model>, RepositoryError> {
        let mut query = sales::Entity::find().filter(sales::Column::CompanyId.eq(company_id));

        if let Some(customer_id) = filter.customer_id {
            query = query.filter(sales::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(
                sales::Column::PaymentStatus.eq(sea_orm_active_enums::PaymentStatus::from(status)),
            );
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(sales::Column::SaleDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(sales::Column::SaleDate.lte(date_to));
        }

        let query = query
            .order_by_desc(sales::Column::SaleDate)
            .order_by_desc(sales::Column::InvoiceNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Adds a line to a sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the sale has returns, the line is invalid, stock
    /// is short, or a walk-in sale would be left unpaid.
    pub async fn add_item(
        &self,
        company_id: Uuid,
        sale_id: Uuid,
        item: SaleItemInput,
    ) -> Result<SaleWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let sale = lock_sale(&txn, company_id, sale_id).await?;
        ensure_no_returns(&txn, sale_id).await?;

        insert_item(&txn, company_id, sale_id, &item).await?;
        let (charges, settlement) = (sale.charges(), sale.settlement());
        let sale = resettle_sale(&txn, sale, charges, settlement).await?;
        ensure_walk_in_settled(&sale)?;
        sync_sale_party(&txn, &sale).await?;

        let items = load_sale_items(&txn, sale_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, sale_id = %sale_id, grand_total = %sale.grand_total, "Sale item added");
        Ok(SaleWithItems { sale, items })
    }

    /// Changes quantity, price or discount of a sale line.
    ///
    /// # Errors
    ///
    /// Returns an error if the sale has returns, the line is invalid, stock
    /// is short, or a walk-in sale would be left unpaid.
    pub async fn update_item(
        &self,
        company_id: Uuid,
        sale_id: Uuid,
        item_id: Uuid,
        input: UpdateSaleItemInput,
    ) -> Result<SaleWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let sale = lock_sale(&txn, company_id, sale_id).await?;
        ensure_no_returns(&txn, sale_id).await?;

        let item = sale_items::Entity::find_by_id(item_id)
            .filter(sale_items::Column::SaleId.eq(sale_id))
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("SaleItem", item_id))?;

        let line = price_line(
            input.quantity.unwrap_or(item.quantity),
            input.unit_price.unwrap_or(item.unit_price),
            input.discount_amount.unwrap_or(item.discount_amount),
        )?;

        rebook_line(&txn, company_id, TRADE, item.product_id, item.quantity, line.quantity).await?;

        let mut active: sale_items::ActiveModel = item.into();
        active.quantity = Set(line.quantity);
        active.unit_price = Set(line.unit_price);
        active.discount_amount = Set(line.discount_amount);
        active.line_total = Set(line.line_total);
        active.update(&txn).await?;

        let (charges, settlement) = (sale.charges(), sale.settlement());
        let sale = resettle_sale(&txn, sale, charges, settlement).await?;
        ensure_walk_in_settled(&sale)?;
        sync_sale_party(&txn, &sale).await?;

        let items = load_sale_items(&txn, sale_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, sale_id = %sale_id, item_id = %item_id, "Sale item updated");
        Ok(SaleWithItems { sale, items })
    }

    /// Removes a line from a sale and restocks it.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` for the last line, `HasReturns` once returns exist.
    pub async fn remove_item(
        &self,
        company_id: Uuid,
        sale_id: Uuid,
        item_id: Uuid,
    ) -> Result<SaleWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let sale = lock_sale(&txn, company_id, sale_id).await?;
        ensure_no_returns(&txn, sale_id).await?;

        let mut items = load_sale_items(&txn, sale_id).await?;
        let position = items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(RepositoryError::not_found("SaleItem", item_id))?;
        if items.len() <= 1 {
            return Err(LedgerError::EmptyDocument.into());
        }
        let item = items.swap_remove(position);

        unbook_line(&txn, company_id, TRADE, item.product_id, item.quantity).await?;
        item.delete(&txn).await?;

        let (charges, settlement) = (sale.charges(), sale.settlement());
        let sale = resettle_sale(&txn, sale, charges, settlement).await?;
        sync_sale_party(&txn, &sale).await?;

        let items = load_sale_items(&txn, sale_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, sale_id = %sale_id, item_id = %item_id, "Sale item removed");
        Ok(SaleWithItems { sale, items })
    }

    /// Updates header fields and recomputes the totals.
    ///
    /// # Errors
    ///
    /// Returns an error if a charge is negative, the discount exceeds the
    /// gross total, or a walk-in sale would be left unpaid.
    pub async fn update_sale(
        &self,
        company_id: Uuid,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> Result<SaleWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut sale = lock_sale(&txn, company_id, sale_id).await?;

        let current = sale.charges();
        let charges = DocumentCharges {
            discount_amount: input.discount_amount.unwrap_or(current.discount_amount),
            vat_amount: input.vat_amount.unwrap_or(current.vat_amount),
            delivery_charge: input.delivery_charge.unwrap_or(current.delivery_charge),
        };

        if input.sale_date.is_some() || input.note.is_some() {
            let mut active: sales::ActiveModel = sale.into();
            if let Some(date) = input.sale_date {
                active.sale_date = Set(date);
            }
            if let Some(note) = input.note {
                active.note = Set(note);
            }
            sale = active.update(&txn).await?;
        }

        let settlement = sale.settlement();
        let sale = resettle_sale(&txn, sale, charges, settlement).await?;
        ensure_walk_in_settled(&sale)?;
        sync_sale_party(&txn, &sale).await?;

        let items = load_sale_items(&txn, sale_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, sale_id = %sale_id, grand_total = %sale.grand_total, "Sale updated");
        Ok(SaleWithItems { sale, items })
    }

    /// Deletes a sale, undoing its payments, stock and allocations.
    ///
    /// Receipt money that was allocated to the sale goes back to the
    /// receipt's advance; advance spent on the sale goes back to the customer.
    ///
    /// # Errors
    ///
    /// Returns `HasReturns` once returns exist, or `AdvanceAlreadyConsumed`
    /// when the sale's overpayment was already spent elsewhere.
    pub async fn delete_sale(&self, company_id: Uuid, sale_id: Uuid) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let sale = lock_sale(&txn, company_id, sale_id).await?;
        ensure_no_returns(&txn, sale_id)
            .await
            .inspect_err(|e| warn!(sale_id = %sale_id, error = %e, "Sale delete rejected"))?;

        let reason = format!("Sale {} deleted", sale.invoice_number);
        reverse_source(&txn, company_id, TRADE.source(), sale_id, &reason).await?;

        for item in load_sale_items(&txn, sale_id).await? {
            unbook_line(&txn, company_id, TRADE, item.product_id, item.quantity).await?;
        }

        let allocations = money_receipt_allocations::Entity::find()
            .filter(money_receipt_allocations::Column::SaleId.eq(sale_id))
            .all(&txn)
            .await?;
        for allocation in allocations {
            let receipt = money_receipts::Entity::find_by_id(allocation.receipt_id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or(RepositoryError::not_found("MoneyReceipt", allocation.receipt_id))?;
            let advance = receipt.advance_amount + allocation.amount;
            let mut active: money_receipts::ActiveModel = receipt.into();
            active.advance_amount = Set(advance);
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;
            allocation.delete(&txn).await?;
        }

        let customer_id = sale.customer_id;
        let number = sale.invoice_number.clone();
        sale.delete(&txn).await?;

        if let Some(customer_id) = customer_id {
            sync_customer_advance(&txn, company_id, customer_id, true)
                .await
                .inspect_err(|e| warn!(sale_id = %sale_id, error = %e, "Sale delete rejected"))?;
        }
        txn.commit().await?;

        info!(company_id = %company_id, sale_id = %sale_id, number = %number, "Sale deleted");
        Ok(())
    }
}
