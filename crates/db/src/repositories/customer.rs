//! Customer repository and customer advance reconciliation.

use chrono::Utc;
use hisab_core::LedgerError;
use hisab_core::settlement::{AdvanceSync, DocumentBalance, raw_advance};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::company::require_company;
use super::document::TradeDocument;
use super::error::RepositoryError;
use super::party::{CreatePartyInput, DueSummary, PartyFilter, UpdatePartyInput};
use crate::entities::{customers, money_receipts, sales};

/// Loads a customer of the company and locks it for update.
pub(crate) async fn lock_customer<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    customer_id: Uuid,
) -> Result<customers::Model, RepositoryError> {
    customers::Entity::find_by_id(customer_id)
        .filter(customers::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Customer", customer_id))
}

async fn customer_raw_advance<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> Result<Decimal, RepositoryError> {
    let receipt_advances: Vec<Decimal> = money_receipts::Entity::find()
        .select_only()
        .column(money_receipts::Column::AdvanceAmount)
        .filter(money_receipts::Column::CustomerId.eq(customer_id))
        .into_tuple()
        .all(conn)
        .await?;

    let documents: Vec<DocumentBalance> = sales::Entity::find()
        .filter(sales::Column::CustomerId.eq(customer_id))
        .all(conn)
        .await?
        .iter()
        .map(TradeDocument::balance)
        .collect();

    Ok(raw_advance(receipt_advances, &documents))
}

/// Recomputes a customer's advance and stores it when it changed.
///
/// With `strict`, a negative recomputed advance (advance spent that no
/// longer exists) fails with `AdvanceAlreadyConsumed` instead of clamping.
pub(crate) async fn sync_customer_advance<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    customer_id: Uuid,
    strict: bool,
) -> Result<AdvanceSync, RepositoryError> {
    let customer = lock_customer(conn, company_id, customer_id).await?;
    let raw = customer_raw_advance(conn, customer_id).await?;

    if strict && raw < Decimal::ZERO {
        return Err(LedgerError::AdvanceAlreadyConsumed {
            available: customer.advance_balance,
            required: customer.advance_balance - raw,
        }
        .into());
    }

    let sync = AdvanceSync {
        old_balance: customer.advance_balance,
        new_balance: raw.max(Decimal::ZERO),
    };

    if sync.changed() {
        let mut active: customers::ActiveModel = customer.into();
        active.advance_balance = Set(sync.new_balance);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;
        debug!(
            customer_id = %customer_id,
            old = %sync.old_balance,
            new = %sync.new_balance,
            "Customer advance synced"
        );
    }

    Ok(sync)
}

/// Customer repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: DatabaseConnection,
}

impl CustomerRepository {
    /// Creates a new customer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a customer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the company does not exist.
    pub async fn create_customer(
        &self,
        company_id: Uuid,
        input: CreatePartyInput,
    ) -> Result<customers::Model, RepositoryError> {
        require_company(&self.db, company_id).await?;

        let now = Utc::now().into();
        let customer = customers::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(input.name),
            phone: Set(input.phone),
            email: Set(input.email),
            address: Set(input.address),
            advance_balance: Set(Decimal::ZERO),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(company_id = %company_id, customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Gets a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the customer is not in the company.
    pub async fn get_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<customers::Model, RepositoryError> {
        customers::Entity::find_by_id(customer_id)
            .filter(customers::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Customer", customer_id))
    }

    /// Lists customers by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_customers(
        &self,
        company_id: Uuid,
        filter: PartyFilter,
    ) -> Result<Vec<customers::Model>, RepositoryError> {
        let mut query = customers::Entity::find()
            .filter(customers::Column::CompanyId.eq(company_id))
            .order_by_asc(customers::Column::Name);

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(customers::Column::Name.contains(search));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(customers::Column::IsActive.eq(is_active));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Updates a customer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the customer is not in the company.
    pub async fn update_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
        input: UpdatePartyInput,
    ) -> Result<customers::Model, RepositoryError> {
        let customer = self.get_customer(company_id, customer_id).await?;
        let mut active: customers::ActiveModel = customer.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Soft-deletes a customer. Documents keep pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the customer is not in the company.
    pub async fn deactivate_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<customers::Model, RepositoryError> {
        self.update_customer(
            company_id,
            customer_id,
            UpdatePartyInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Recomputes and stores the customer's advance balance.
    ///
    /// Clamps at zero rather than failing, so it can repair drift.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the customer is not in the company.
    pub async fn sync_advance_balance(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<AdvanceSync, RepositoryError> {
        let txn = self.db.begin().await?;
        let sync = sync_customer_advance(&txn, company_id, customer_id, false).await?;
        txn.commit().await?;

        if sync.changed() {
            info!(
                company_id = %company_id,
                customer_id = %customer_id,
                old = %sync.old_balance,
                new = %sync.new_balance,
                "Customer advance corrected"
            );
        }
        Ok(sync)
    }

    /// Totals billed, paid, returned and due across the customer's sales.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the customer is not in the company.
    pub async fn due_summary(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<DueSummary, RepositoryError> {
        let customer = self.get_customer(company_id, customer_id).await?;
        let docs = sales::Entity::find()
            .filter(sales::Column::CustomerId.eq(customer_id))
            .all(&self.db)
            .await?;

        Ok(DueSummary {
            party_id: customer_id,
            total_billed: docs.iter().map(|s| s.grand_total).sum(),
            total_paid: docs.iter().map(|s| s.paid_amount).sum(),
            total_returned: docs.iter().map(|s| s.returned_amount).sum(),
            total_due: docs.iter().map(|s| s.due_amount).sum(),
            advance_balance: customer.advance_balance,
        })
    }
}
