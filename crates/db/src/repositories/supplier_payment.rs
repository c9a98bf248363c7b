//! Supplier payment repository: payments made against purchases.
//!
//! A payment posts one `supplier_payment` debit, spreads its amount over the
//! supplier's open purchases and keeps the unallocated rest as advance.

use chrono::{NaiveDate, Utc};
use hisab_core::LedgerError;
use hisab_core::ledger::{EntrySide, TransactionKind};
use hisab_core::numbering::DocumentKind;
use hisab_core::settlement::{
    AllocationPlan, OpenDocument, allocate_fifo, allocate_to_document, ensure_advance_unconsumed,
};
use hisab_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::document::TradeDocument;
use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::purchase::{lock_purchase, resettle_purchase};
use super::supplier::{lock_supplier, sync_supplier_advance};
use super::transaction::{PostingRequest, Source, post, reverse_source};
use crate::entities::{purchases, supplier_payment_allocations, supplier_payments};

/// Input for creating a supplier payment.
#[derive(Debug, Clone)]
pub struct CreateSupplierPaymentInput {
    /// Supplier being paid.
    pub supplier_id: Uuid,
    /// Account paying the money.
    pub account_id: Uuid,
    /// Purchase to settle; oldest open purchases first when omitted.
    pub purchase_id: Option<Uuid>,
    /// Amount paid.
    pub amount: Decimal,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Filter options for listing supplier payments.
#[derive(Debug, Clone, Default)]
pub struct SupplierPaymentFilter {
    /// Filter by supplier.
    pub supplier_id: Option<Uuid>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// A supplier payment with the purchases it settled.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierPaymentWithAllocations {
    /// Header.
    #[serde(flatten)]
    pub payment: supplier_payments::Model,
    /// Amounts applied per purchase.
    pub allocations: Vec<supplier_payment_allocations::Model>,
}

async fn load_allocations<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
) -> Result<Vec<supplier_payment_allocations::Model>, RepositoryError> {
    Ok(supplier_payment_allocations::Entity::find()
        .filter(supplier_payment_allocations::Column::PaymentId.eq(payment_id))
        .order_by_asc(supplier_payment_allocations::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// Supplier payment repository.
#[derive(Debug, Clone)]
pub struct SupplierPaymentRepository {
    db: DatabaseConnection,
}

impl SupplierPaymentRepository {
    /// Creates a new supplier payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records money paid to a supplier.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive
    /// - The supplier, account or purchase is missing
    /// - The purchase belongs to another supplier
    /// - The account is inactive
    pub async fn create_payment(
        &self,
        company_id: Uuid,
        input: CreateSupplierPaymentInput,
    ) -> Result<SupplierPaymentWithAllocations, RepositoryError> {
        let txn = self.db.begin().await?;
        let supplier = lock_supplier(&txn, company_id, input.supplier_id).await?;

        let (plan, open): (AllocationPlan, Vec<purchases::Model>) = match input.purchase_id {
            Some(purchase_id) => {
                let purchase = lock_purchase(&txn, company_id, purchase_id).await?;
                if purchase.supplier_id != Some(supplier.id) {
                    warn!(purchase_id = %purchase_id, supplier_id = %supplier.id, "Supplier payment rejected");
                    return Err(LedgerError::PartyMismatch(purchase_id).into());
                }
                (allocate_to_document(input.amount, &purchase.open())?, vec![purchase])
            }
            None => {
                let open = purchases::Entity::find()
                    .filter(purchases::Column::CompanyId.eq(company_id))
                    .filter(purchases::Column::SupplierId.eq(supplier.id))
                    .filter(purchases::Column::DueAmount.gt(Decimal::ZERO))
                    .order_by_asc(purchases::Column::PurchaseDate)
                    .order_by_asc(purchases::Column::BillNumber)
                    .lock_exclusive()
                    .all(&txn)
                    .await?;
                let documents: Vec<OpenDocument> = open.iter().map(TradeDocument::open).collect();
                (allocate_fifo(input.amount, &documents)?, open)
            }
        };
        let amount = plan.allocated() + plan.advance_amount;

        let payment_id = Uuid::new_v4();
        let payment_number = next_number(&txn, company_id, DocumentKind::SupplierPayment).await?;
        let transaction = post(
            &txn,
            PostingRequest {
                company_id,
                account_id: input.account_id,
                kind: TransactionKind::SupplierPayment,
                side: EntrySide::Debit,
                amount,
                date: input.payment_date,
                description: format!("Supplier payment {payment_number} to {}", supplier.name),
                source: Some((Source::SupplierPayment, payment_id)),
            },
        )
        .await?;

        let now = Utc::now().into();
        let payment = supplier_payments::ActiveModel {
            id: Set(payment_id),
            company_id: Set(company_id),
            payment_number: Set(payment_number),
            supplier_id: Set(supplier.id),
            account_id: Set(input.account_id),
            purchase_id: Set(input.purchase_id),
            amount: Set(amount),
            advance_amount: Set(plan.advance_amount),
            payment_date: Set(input.payment_date),
            note: Set(input.note),
            transaction_id: Set(transaction.id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut allocations = Vec::with_capacity(plan.allocations.len());
        for allocation in &plan.allocations {
            let Some(purchase) = open.iter().find(|s| s.id == allocation.document_id) else {
                continue;
            };
            let mut settlement = purchase.settlement();
            settlement.paid_amount += allocation.amount;
            resettle_purchase(&txn, purchase.clone(), purchase.charges(), settlement).await?;

            allocations.push(
                supplier_payment_allocations::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    payment_id: Set(payment_id),
                    purchase_id: Set(purchase.id),
                    amount: Set(allocation.amount),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?,
            );
        }

        sync_supplier_advance(&txn, company_id, supplier.id, true).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            payment_id = %payment.id,
            number = %payment.payment_number,
            %amount,
            allocated = %plan.allocated(),
            advance = %payment.advance_amount,
            "Supplier payment created"
        );
        Ok(SupplierPaymentWithAllocations {
            payment,
            allocations,
        })
    }

    /// Gets a supplier payment with its allocations.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the payment is not in the company.
    pub async fn get_payment(
        &self,
        company_id: Uuid,
        payment_id: Uuid,
    ) -> Result<SupplierPaymentWithAllocations, RepositoryError> {
        let payment = supplier_payments::Entity::find_by_id(payment_id)
            .filter(supplier_payments::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("SupplierPayment", payment_id))?;
        let allocations = load_allocations(&self.db, payment_id).await?;

        Ok(SupplierPaymentWithAllocations {
            payment,
            allocations,
        })
    }

    /// Lists supplier payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_payments(
        &self,
        company_id: Uuid,
        filter: SupplierPaymentFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<supplier_payments::Model>, RepositoryError> {
        let mut query =
            supplier_payments::Entity::find().filter(supplier_payments::Column::CompanyId.eq(company_id));

        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(supplier_payments::Column::SupplierId.eq(supplier_id));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(supplier_payments::Column::PaymentDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(supplier_payments::Column::PaymentDate.lte(date_to));
        }

        let query = query
            .order_by_desc(supplier_payments::Column::PaymentDate)
            .order_by_desc(supplier_payments::Column::PaymentNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Deletes a supplier payment, unwinding its allocations and ledger row.
    ///
    /// # Errors
    ///
    /// Returns `AdvanceAlreadyConsumed` when the advance this payment created
    /// has already been spent.
    pub async fn delete_payment(
        &self,
        company_id: Uuid,
        payment_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let payment = supplier_payments::Entity::find_by_id(payment_id)
            .filter(supplier_payments::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("SupplierPayment", payment_id))?;

        let supplier = lock_supplier(&txn, company_id, payment.supplier_id).await?;
        ensure_advance_unconsumed(supplier.advance_balance, payment.advance_amount).inspect_err(
            |e| warn!(payment_id = %payment_id, error = %e, "Supplier payment delete rejected"),
        )?;

        let reason = format!("Supplier payment {} deleted", payment.payment_number);
        reverse_source(&txn, company_id, Source::SupplierPayment, payment_id, &reason).await?;

        let allocations = load_allocations(&txn, payment_id).await?;
        for allocation in allocations {
            let purchase = lock_purchase(&txn, company_id, allocation.purchase_id).await?;
            let mut settlement = purchase.settlement();
            settlement.paid_amount -= allocation.amount;
            let charges = purchase.charges();
            resettle_purchase(&txn, purchase, charges, settlement).await?;
            allocation.delete(&txn).await?;
        }

        let number = payment.payment_number.clone();
        payment.delete(&txn).await?;

        sync_supplier_advance(&txn, company_id, supplier.id, true).await?;
        txn.commit().await?;

        info!(company_id = %company_id, payment_id = %payment_id, number = %number, "Supplier payment deleted");
        Ok(())
    }
}
