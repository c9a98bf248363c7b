//! Money receipt repository: customer payments against sales.
//!
//! A receipt posts one `money_receipt` credit, spreads its amount over the
//! customer's open sales and keeps the unallocated rest as advance.

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

use super::customer::{lock_customer, sync_customer_advance};
use super::document::TradeDocument;
use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::sale::{lock_sale, resettle_sale};
use super::transaction::{PostingRequest, Source, post, reverse_source};
use crate::entities::{money_receipt_allocations, money_receipts, sales};

/// Input for creating a money receipt.
#[derive(Debug, Clone)]
pub struct CreateMoneyReceiptInput {
    /// Paying customer.
    pub customer_id: Uuid,
    /// Account receiving the money.
    pub account_id: Uuid,
    /// Sale to settle; oldest open sales first when omitted.
    pub sale_id: Option<Uuid>,
    /// Amount received.
    pub amount: Decimal,
    /// Receipt date.
    pub receipt_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Filter options for listing money receipts.
#[derive(Debug, Clone, Default)]
pub struct MoneyReceiptFilter {
    /// Filter by customer.
    pub customer_id: Option<Uuid>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// A money receipt with the sales it settled.
#[derive(Debug, Clone, Serialize)]
pub struct MoneyReceiptWithAllocations {
    /// Header.
    #[serde(flatten)]
    pub receipt: money_receipts::Model,
    /// Amounts applied per sale.
    pub allocations: Vec<money_receipt_allocations::Model>,
}

async fn load_allocations<C: ConnectionTrait>(
    conn: &C,
    receipt_id: Uuid,
) -> Result<Vec<money_receipt_allocations::Model>, RepositoryError> {
    Ok(money_receipt_allocations::Entity::find()
        .filter(money_receipt_allocations::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(money_receipt_allocations::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// Money receipt repository.
#[derive(Debug, Clone)]
pub struct MoneyReceiptRepository {
    db: DatabaseConnection,
}

impl MoneyReceiptRepository {
    /// Creates a new money receipt repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records money received from a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive
    /// - The customer, account or sale is missing
    /// - The sale belongs to another customer
    /// - The account is inactive
    pub async fn create_receipt(
        &self,
        company_id: Uuid,
        input: CreateMoneyReceiptInput,
    ) -> Result<MoneyReceiptWithAllocations, RepositoryError> {
        let txn = self.db.begin().await?;
        let customer = lock_customer(&txn, company_id, input.customer_id).await?;

        let (plan, open): (AllocationPlan, Vec<sales::Model>) = match input.sale_id {
            Some(sale_id) => {
                let sale = lock_sale(&txn, company_id, sale_id).await?;
                if sale.customer_id != Some(customer.id) {
                    warn!(sale_id = %sale_id, customer_id = %customer.id, "Receipt rejected");
                    return Err(LedgerError::PartyMismatch(sale_id).into());
                }
                (allocate_to_document(input.amount, &sale.open())?, vec![sale])
            }
            None => {
                let open = sales::Entity::find()
                    .filter(sales::Column::CompanyId.eq(company_id))
                    .filter(sales::Column::CustomerId.eq(customer.id))
                    .filter(sales::Column::DueAmount.gt(Decimal::ZERO))
                    .order_by_asc(sales::Column::SaleDate)
                    .order_by_asc(sales::Column::InvoiceNumber)
                    .lock_exclusive()
                    .all(&txn)
                    .await?;
                let documents: Vec<OpenDocument> = open.iter().map(TradeDocument::open).collect();
                (allocate_fifo(input.amount, &documents)?, open)
            }
        };
        let amount = plan.allocated() + plan.advance_amount;

        let receipt_id = Uuid::new_v4();
        let receipt_number = next_number(&txn, company_id, DocumentKind::MoneyReceipt).await?;
        let transaction = post(
            &txn,
            PostingRequest {
                company_id,
                account_id: input.account_id,
                kind: TransactionKind::MoneyReceipt,
                side: EntrySide::Credit,
                amount,
                date: input.receipt_date,
                description: format!("Money receipt {receipt_number} from {}", customer.name),
                source: Some((Source::MoneyReceipt, receipt_id)),
            },
        )
        .await?;

        let now = Utc::now().into();
        let receipt = money_receipts::ActiveModel {
            id: Set(receipt_id),
            company_id: Set(company_id),
            receipt_number: Set(receipt_number),
            customer_id: Set(customer.id),
            account_id: Set(input.account_id),
            sale_id: Set(input.sale_id),
            amount: Set(amount),
            advance_amount: Set(plan.advance_amount),
            receipt_date: Set(input.receipt_date),
            note: Set(input.note),
            transaction_id: Set(transaction.id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut allocations = Vec::with_capacity(plan.allocations.len());
        for allocation in &plan.allocations {
            let Some(sale) = open.iter().find(|s| s.id == allocation.document_id) else {
                continue;
            };
            let mut settlement = sale.settlement();
            settlement.paid_amount += allocation.amount;
            resettle_sale(&txn, sale.clone(), sale.charges(), settlement).await?;

            allocations.push(
                money_receipt_allocations::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    receipt_id: Set(receipt_id),
                    sale_id: Set(sale.id),
                    amount: Set(allocation.amount),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?,
            );
        }

        sync_customer_advance(&txn, company_id, customer.id, true).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            receipt_id = %receipt.id,
            number = %receipt.receipt_number,
            %amount,
            allocated = %plan.allocated(),
            advance = %receipt.advance_amount,
            "Money receipt created"
        );
        Ok(MoneyReceiptWithAllocations {
            receipt,
            allocations,
        })
    }

    /// Gets a money receipt with its allocations.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the receipt is not in the company.
    pub async fn get_receipt(
        &self,
        company_id: Uuid,
        receipt_id: Uuid,
    ) -> Result<MoneyReceiptWithAllocations, RepositoryError> {
        let receipt = money_receipts::Entity::find_by_id(receipt_id)
            .filter(money_receipts::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("MoneyReceipt", receipt_id))?;
        let allocations = load_allocations(&self.db, receipt_id).await?;

        Ok(MoneyReceiptWithAllocations {
            receipt,
            allocations,
        })
    }

    /// Lists money receipts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_receipts(
        &self,
        company_id: Uuid,
        filter: MoneyReceiptFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<money_receipts::Model>, RepositoryError> {
        let mut query =
            money_receipts::Entity::find().filter(money_receipts::Column::CompanyId.eq(company_id));

        if let Some(customer_id) = filter.customer_id {
            query = query.filter(money_receipts::Column::CustomerId.eq(customer_id));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(money_receipts::Column::ReceiptDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(money_receipts::Column::ReceiptDate.lte(date_to));
        }

        let query = query
            .order_by_desc(money_receipts::Column::ReceiptDate)
            .order_by_desc(money_receipts::Column::ReceiptNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Deletes a money receipt, unwinding its allocations and ledger row.
    ///
    /// # Errors
    ///
    /// Returns `AdvanceAlreadyConsumed` when the advance this receipt created
    /// has already been spent.
    pub async fn delete_receipt(
        &self,
        company_id: Uuid,
        receipt_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let receipt = money_receipts::Entity::find_by_id(receipt_id)
            .filter(money_receipts::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("MoneyReceipt", receipt_id))?;

        let customer = lock_customer(&txn, company_id, receipt.customer_id).await?;
        ensure_advance_unconsumed(customer.advance_balance, receipt.advance_amount).inspect_err(
            |e| warn!(receipt_id = %receipt_id, error = %e, "Money receipt delete rejected"),
        )?;

        let reason = format!("Money receipt {} deleted", receipt.receipt_number);
        reverse_source(&txn, company_id, Source::MoneyReceipt, receipt_id, &reason).await?;

        let allocations = load_allocations(&txn, receipt_id).await?;
        for allocation in allocations {
            let sale = lock_sale(&txn, company_id, allocation.sale_id).await?;
            let mut settlement = sale.settlement();
            settlement.paid_amount -= allocation.amount;
            let charges = sale.charges();
            resettle_sale(&txn, sale, charges, settlement).await?;
            allocation.delete(&txn).await?;
        }

        let number = receipt.receipt_number.clone();
        receipt.delete(&txn).await?;

        sync_customer_advance(&txn, company_id, customer.id, true).await?;
        txn.commit().await?;

        info!(company_id = %company_id, receipt_id = %receipt_id, number = %number, "Money receipt deleted");
        Ok(())
    }
}
