//! Purchase repository: supplier bills, their items and derived totals.
//!
//! Every mutation runs in one database transaction that moves stock, posts
//! cash payments to the ledger, recomputes the purchase header from its items
//! and reconciles the supplier's advance.

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
use super::document::{
    Trade, TradeDocument, book_line, ensure_walk_in_settled, rebook_line, unbook_line,
};
use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::supplier::{lock_supplier, sync_supplier_advance};
use super::transaction::{PostingRequest, post, reverse_source};
use crate::entities::{
    products, purchase_items, purchase_returns, purchases, sea_orm_active_enums,
    supplier_payment_allocations, supplier_payments,
};

const TRADE: Trade = Trade::Purchase;

/// One line of a new purchase.
#[derive(Debug, Clone)]
pub struct PurchaseItemInput {
    /// Product bought.
    pub product_id: Uuid,
    /// Quantity bought.
    pub quantity: Decimal,
    /// Price per unit; the product's purchase price when omitted.
    pub unit_price: Option<Decimal>,
    /// Line discount.
    pub discount_amount: Decimal,
}

/// Input for changing an existing purchase line.
#[derive(Debug, Clone, Default)]
pub struct UpdatePurchaseItemInput {
    /// Quantity bought.
    pub quantity: Option<Decimal>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Line discount.
    pub discount_amount: Option<Decimal>,
}

/// Input for creating a purchase.
#[derive(Debug, Clone)]
pub struct CreatePurchaseInput {
    /// Supplier; `None` for a walk-in purchase.
    pub supplier_id: Option<Uuid>,
    /// Bill date.
    pub purchase_date: NaiveDate,
    /// Account paying the cash.
    pub account_id: Option<Uuid>,
    /// Line items, at least one.
    pub items: Vec<PurchaseItemInput>,
    /// Bill-level discount.
    pub discount_amount: Decimal,
    /// VAT charged.
    pub vat_amount: Decimal,
    /// Delivery charge.
    pub delivery_charge: Decimal,
    /// Cash paid to the supplier.
    pub paid_amount: Decimal,
    /// Supplier advance to spend on this purchase.
    pub advance_used: Decimal,
    /// Free text.
    pub note: Option<String>,
}

/// Input for updating purchase header fields.
#[derive(Debug, Clone, Default)]
pub struct UpdatePurchaseInput {
    /// Bill date.
    pub purchase_date: Option<NaiveDate>,
    /// Bill-level discount.
    pub discount_amount: Option<Decimal>,
    /// VAT charged.
    pub vat_amount: Option<Decimal>,
    /// Delivery charge.
    pub delivery_charge: Option<Decimal>,
    /// Free text.
    pub note: Option<Option<String>>,
}

/// Filter options for listing purchases.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFilter {
    /// Filter by supplier.
    pub supplier_id: Option<Uuid>,
    /// Filter by payment status.
    pub status: Option<PaymentStatus>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// A purchase with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithItems {
    /// Header.
    #[serde(flatten)]
    pub purchase: purchases::Model,
    /// Lines.
    pub items: Vec<purchase_items::Model>,
}

fn write_totals(active: &mut purchases::ActiveModel, totals: &DocumentTotals, settlement: SettlementState) {
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

/// Loads a purchase of the company and locks it for update.
pub(crate) async fn lock_purchase<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    purchase_id: Uuid,
) -> Result<purchases::Model, RepositoryError> {
    purchases::Entity::find_by_id(purchase_id)
        .filter(purchases::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Purchase", purchase_id))
}

pub(crate) async fn load_purchase_items<C: ConnectionTrait>(
    conn: &C,
    purchase_id: Uuid,
) -> Result<Vec<purchase_items::Model>, RepositoryError> {
    Ok(purchase_items::Entity::find()
        .filter(purchase_items::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(purchase_items::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// Recomputes a purchase's header from its items, charges and settlement.
pub(crate) async fn resettle_purchase<C: ConnectionTrait>(
    conn: &C,
    purchase: purchases::Model,
    charges: DocumentCharges,
    settlement: SettlementState,
) -> Result<purchases::Model, RepositoryError> {
    let line_totals: Vec<Decimal> = load_purchase_items(conn, purchase.id)
        .await?
        .iter()
        .map(|i| i.line_total)
        .collect();
    let totals = compute_totals(&line_totals, charges, settlement)?;

    let mut active: purchases::ActiveModel = purchase.into();
    write_totals(&mut active, &totals, settlement);
    Ok(active.update(conn).await?)
}

/// Reconciles the purchase's supplier, if any.
pub(crate) async fn sync_purchase_party<C: ConnectionTrait>(
    conn: &C,
    purchase: &purchases::Model,
) -> Result<(), RepositoryError> {
    if let Some(supplier_id) = purchase.supplier_id {
        sync_supplier_advance(conn, purchase.company_id, supplier_id, true).await?;
    }
    Ok(())
}

async fn ensure_no_returns<C: ConnectionTrait>(conn: &C, purchase_id: Uuid) -> Result<(), RepositoryError> {
    let returns = purchase_returns::Entity::find()
        .filter(purchase_returns::Column::PurchaseId.eq(purchase_id))
        .count(conn)
        .await?;
    if returns > 0 {
        return Err(LedgerError::HasReturns(purchase_id).into());
    }
    Ok(())
}

async fn insert_item<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    purchase_id: Uuid,
    item: &PurchaseItemInput,
) -> Result<purchase_items::Model, RepositoryError> {
    let unit_price = match item.unit_price {
        Some(price) => price,
        None => {
            products::Entity::find_by_id(item.product_id)
                .filter(products::Column::CompanyId.eq(company_id))
                .one(conn)
                .await?
                .ok_or(RepositoryError::not_found("Product", item.product_id))?
                .purchase_price
        }
    };
    let line = price_line(item.quantity, unit_price, item.discount_amount)?;
    book_line(conn, company_id, TRADE, item.product_id, line.quantity).await?;

    Ok(purchase_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_id: Set(purchase_id),
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

/// Purchase repository.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    db: DatabaseConnection,
}

impl PurchaseRepository {
    /// Creates a new purchase repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a purchase with its items and optional payment.
    ///
    /// Cash is posted to `account_id` as a `purchase_payment` debit. Advance is
    /// drawn from the supplier and capped at what the bill still owes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are no items, or a line is invalid
    /// - Cash is paid without an account
    /// - More advance is requested than the supplier holds
    /// - A walk-in purchase is not fully paid
    pub async fn create_purchase(
        &self,
        company_id: Uuid,
        input: CreatePurchaseInput,
    ) -> Result<PurchaseWithItems, RepositoryError> {
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

        let available_advance = match input.supplier_id {
            Some(supplier_id) => lock_supplier(&txn, company_id, supplier_id).await?.advance_balance,
            None => Decimal::ZERO,
        };

        let purchase_id = Uuid::new_v4();
        let bill_number = next_number(&txn, company_id, TRADE.numbering()).await?;
        let now = Utc::now().into();

        // Header first so items can reference it; totals are filled in below.
        let header = purchases::ActiveModel {
            id: Set(purchase_id),
            company_id: Set(company_id),
            bill_number: Set(bill_number.clone()),
            supplier_id: Set(input.supplier_id),
            purchase_date: Set(input.purchase_date),
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
            items.push(insert_item(&txn, company_id, purchase_id, item).await?);
        }

        let line_totals: Vec<Decimal> = items.iter().map(|i| i.line_total).collect();
        let unpaid = compute_totals(&line_totals, charges, SettlementState::default())?;
        let advance_used = draw_advance(input.advance_used, available_advance, unpaid.due_amount)
            .inspect_err(|e| warn!(company_id = %company_id, error = %e, "Purchase rejected"))?;

        let settlement = SettlementState {
            paid_amount: cash + advance_used,
            returned_amount: Decimal::ZERO,
        };
        let totals = compute_totals(&line_totals, charges, settlement)?;

        let mut active: purchases::ActiveModel = header.into();
        write_totals(&mut active, &totals, settlement);
        active.advance_used = Set(advance_used);
        let purchase = active.update(&txn).await?;

        ensure_walk_in_settled(&purchase)
            .inspect_err(|e| warn!(company_id = %company_id, error = %e, "Purchase rejected"))?;

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
                    date: purchase.purchase_date,
                    description: format!("Payment for {bill_number}"),
                    source: Some((TRADE.source(), purchase_id)),
                },
            )
            .await?;
        }

        sync_purchase_party(&txn, &purchase).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            purchase_id = %purchase.id,
            number = %purchase.bill_number,
            grand_total = %purchase.grand_total,
            due = %purchase.due_amount,
            "Purchase created"
        );
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Gets a purchase with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the purchase is not in the company.
    pub async fn get_purchase(
        &self,
        company_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<PurchaseWithItems, RepositoryError> {
        let purchase = purchases::Entity::find_by_id(purchase_id)
            .filter(purchases::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Purchase", purchase_id))?;
        let items = load_purchase_items(&self.db, purchase_id).await?;

        Ok(PurchaseWithItems { purchase, items })
    }

    /// Lists purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_purchases(
        &self,
        company_id: Uuid,
        filter: PurchaseFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<purchases::Model>, RepositoryError> {
        let mut query = purchases::Entity::find().filter(purchases::Column::CompanyId.eq(company_id));

        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchases::Column::SupplierId.eq(supplier_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(
                purchases::Column::PaymentStatus.eq(sea_orm_active_enums::PaymentStatus::from(status)),
            );
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(purchases::Column::PurchaseDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(purchases::Column::PurchaseDate.lte(date_to));
        }

        let query = query
            .order_by_desc(purchases::Column::PurchaseDate)
            .order_by_desc(purchases::Column::BillNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Adds a line to a purchase.
    ///
    /// # Errors
    ///
    /// Returns an error if the purchase has returns, the line is invalid, stock
    /// is short, or a walk-in purchase would be left unpaid.
    pub async fn add_item(
        &self,
        company_id: Uuid,
        purchase_id: Uuid,
        item: PurchaseItemInput,
    ) -> Result<PurchaseWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let purchase = lock_purchase(&txn, company_id, purchase_id).await?;
        ensure_no_returns(&txn, purchase_id).await?;

        insert_item(&txn, company_id, purchase_id, &item).await?;
        let (charges, settlement) = (purchase.charges(), purchase.settlement());
        let purchase = resettle_purchase(&txn, purchase, charges, settlement).await?;
        ensure_walk_in_settled(&purchase)?;
        sync_purchase_party(&txn, &purchase).await?;

        let items = load_purchase_items(&txn, purchase_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, purchase_id = %purchase_id, grand_total = %purchase.grand_total, "Purchase item added");
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Changes quantity, price or discount of a purchase line.
    ///
    /// # Errors
    ///
    /// Returns an error if the purchase has returns, the line is invalid, stock
    /// is short, or a walk-in purchase would be left unpaid.
    pub async fn update_item(
        &self,
        company_id: Uuid,
        purchase_id: Uuid,
        item_id: Uuid,
        input: UpdatePurchaseItemInput,
    ) -> Result<PurchaseWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let purchase = lock_purchase(&txn, company_id, purchase_id).await?;
        ensure_no_returns(&txn, purchase_id).await?;

        let item = purchase_items::Entity::find_by_id(item_id)
            .filter(purchase_items::Column::PurchaseId.eq(purchase_id))
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("PurchaseItem", item_id))?;

        let line = price_line(
            input.quantity.unwrap_or(item.quantity),
            input.unit_price.unwrap_or(item.unit_price),
            input.discount_amount.unwrap_or(item.discount_amount),
        )?;

        rebook_line(&txn, company_id, TRADE, item.product_id, item.quantity, line.quantity).await?;

        let mut active: purchase_items::ActiveModel = item.into();
        active.quantity = Set(line.quantity);
        active.unit_price = Set(line.unit_price);
        active.discount_amount = Set(line.discount_amount);
        active.line_total = Set(line.line_total);
        active.update(&txn).await?;

        let (charges, settlement) = (purchase.charges(), purchase.settlement());
        let purchase = resettle_purchase(&txn, purchase, charges, settlement).await?;
        ensure_walk_in_settled(&purchase)?;
        sync_purchase_party(&txn, &purchase).await?;

        let items = load_purchase_items(&txn, purchase_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, purchase_id = %purchase_id, item_id = %item_id, "Purchase item updated");
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Removes a line from a purchase and takes its stock back out.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` for the last line, `HasReturns` once returns exist.
    pub async fn remove_item(
        &self,
        company_id: Uuid,
        purchase_id: Uuid,
        item_id: Uuid,
    ) -> Result<PurchaseWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let purchase = lock_purchase(&txn, company_id, purchase_id).await?;
        ensure_no_returns(&txn, purchase_id).await?;

        let mut items = load_purchase_items(&txn, purchase_id).await?;
        let position = items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(RepositoryError::not_found("PurchaseItem", item_id))?;
        if items.len() <= 1 {
            return Err(LedgerError::EmptyDocument.into());
        }
        let item = items.swap_remove(position);

        unbook_line(&txn, company_id, TRADE, item.product_id, item.quantity).await?;
        item.delete(&txn).await?;

        let (charges, settlement) = (purchase.charges(), purchase.settlement());
        let purchase = resettle_purchase(&txn, purchase, charges, settlement).await?;
        sync_purchase_party(&txn, &purchase).await?;

        let items = load_purchase_items(&txn, purchase_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, purchase_id = %purchase_id, item_id = %item_id, "Purchase item removed");
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Updates header fields and recomputes the totals.
    ///
    /// # Errors
    ///
    /// Returns an error if a charge is negative, the discount exceeds the
    /// gross total, or a walk-in purchase would be left unpaid.
    pub async fn update_purchase(
        &self,
        company_id: Uuid,
        purchase_id: Uuid,
        input: UpdatePurchaseInput,
    ) -> Result<PurchaseWithItems, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut purchase = lock_purchase(&txn, company_id, purchase_id).await?;

        let current = purchase.charges();
        let charges = DocumentCharges {
            discount_amount: input.discount_amount.unwrap_or(current.discount_amount),
            vat_amount: input.vat_amount.unwrap_or(current.vat_amount),
            delivery_charge: input.delivery_charge.unwrap_or(current.delivery_charge),
        };

        if input.purchase_date.is_some() || input.note.is_some() {
            let mut active: purchases::ActiveModel = purchase.into();
            if let Some(date) = input.purchase_date {
                active.purchase_date = Set(date);
            }
            if let Some(note) = input.note {
                active.note = Set(note);
            }
            purchase = active.update(&txn).await?;
        }

        let settlement = purchase.settlement();
        let purchase = resettle_purchase(&txn, purchase, charges, settlement).await?;
        ensure_walk_in_settled(&purchase)?;
        sync_purchase_party(&txn, &purchase).await?;

        let items = load_purchase_items(&txn, purchase_id).await?;
        txn.commit().await?;

        info!(company_id = %company_id, purchase_id = %purchase_id, grand_total = %purchase.grand_total, "Purchase updated");
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Deletes a purchase, undoing its payments, stock and allocations.
    ///
    /// Payment money that was allocated to the purchase goes back to the
    /// payment's advance; advance spent on the purchase goes back to the supplier.
    ///
    /// # Errors
    ///
    /// Returns `HasReturns` once returns exist, or `AdvanceAlreadyConsumed`
    /// when the purchase's overpayment was already spent elsewhere.
    pub async fn delete_purchase(&self, company_id: Uuid, purchase_id: Uuid) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let purchase = lock_purchase(&txn, company_id, purchase_id).await?;
        ensure_no_returns(&txn, purchase_id)
            .await
            .inspect_err(|e| warn!(purchase_id = %purchase_id, error = %e, "Purchase delete rejected"))?;

        let reason = format!("Purchase {} deleted", purchase.bill_number);
        reverse_source(&txn, company_id, TRADE.source(), purchase_id, &reason).await?;

        for item in load_purchase_items(&txn, purchase_id).await? {
            unbook_line(&txn, company_id, TRADE, item.product_id, item.quantity).await?;
        }

        let allocations = supplier_payment_allocations::Entity::find()
            .filter(supplier_payment_allocations::Column::PurchaseId.eq(purchase_id))
            .all(&txn)
            .await?;
        for allocation in allocations {
            let payment = supplier_payments::Entity::find_by_id(allocation.payment_id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or(RepositoryError::not_found("SupplierPayment", allocation.payment_id))?;
            let advance = payment.advance_amount + allocation.amount;
            let mut active: supplier_payments::ActiveModel = payment.into();
            active.advance_amount = Set(advance);
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;
            allocation.delete(&txn).await?;
        }

        let supplier_id = purchase.supplier_id;
        let number = purchase.bill_number.clone();
        purchase.delete(&txn).await?;

        if let Some(supplier_id) = supplier_id {
            sync_supplier_advance(&txn, company_id, supplier_id, true)
                .await
                .inspect_err(|e| warn!(purchase_id = %purchase_id, error = %e, "Purchase delete rejected"))?;
        }
        txn.commit().await?;

        info!(company_id = %company_id, purchase_id = %purchase_id, number = %number, "Purchase deleted");
        Ok(())
    }
}
