//! Supplier repository and supplier advance reconciliation.

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
use crate::entities::{suppliers, supplier_payments, purchases};

/// Loads a supplier of the company and locks it for update.
pub(crate) async fn lock_supplier<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    supplier_id: Uuid,
) -> Result<suppliers::Model, RepositoryError> {
    suppliers::Entity::find_by_id(supplier_id)
        .filter(suppliers::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Supplier", supplier_id))
}

async fn supplier_raw_advance<C: ConnectionTrait>(
    conn: &C,
    supplier_id: Uuid,
) -> Result<Decimal, RepositoryError> {
    let payment_advances: Vec<Decimal> = supplier_payments::Entity::find()
        .select_only()
        .column(supplier_payments::Column::AdvanceAmount)
        .filter(supplier_payments::Column::SupplierId.eq(supplier_id))
        .into_tuple()
        .all(conn)
        .await?;

    let documents: Vec<DocumentBalance> = purchases::Entity::find()
        .filter(purchases::Column::SupplierId.eq(supplier_id))
        .all(conn)
        .await?
        .iter()
        .map(TradeDocument::balance)
        .collect();

    Ok(raw_advance(payment_advances, &documents))
}

/// Recomputes a supplier's advance and stores it when it changed.
///
/// With `strict`, a negative recomputed advance (advance spent that no
/// longer exists) fails with `AdvanceAlreadyConsumed` instead of clamping.
pub(crate) async fn sync_supplier_advance<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    supplier_id: Uuid,
    strict: bool,
) -> Result<AdvanceSync, RepositoryError> {
    let supplier = lock_supplier(conn, company_id, supplier_id).await?;
    let raw = supplier_raw_advance(conn, supplier_id).await?;

    if strict && raw < Decimal::ZERO {
        return Err(LedgerError::AdvanceAlreadyConsumed {
            available: supplier.advance_balance,
            required: supplier.advance_balance - raw,
        }
        .into());
    }

    let sync = AdvanceSync {
        old_balance: supplier.advance_balance,
        new_balance: raw.max(Decimal::ZERO),
    };

    if sync.changed() {
        let mut active: suppliers::ActiveModel = supplier.into();
        active.advance_balance = Set(sync.new_balance);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;
        debug!(
            supplier_id = %supplier_id,
            old = %sync.old_balance,
            new = %sync.new_balance,
            "Supplier advance synced"
        );
    }

    Ok(sync)
}

/// Supplier repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    db: DatabaseConnection,
}

impl SupplierRepository {
    /// Creates a new supplier repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a supplier.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the company does not exist.
    pub async fn create_supplier(
        &self,
        company_id: Uuid,
        input: CreatePartyInput,
    ) -> Result<suppliers::Model, RepositoryError> {
        require_company(&self.db, company_id).await?;

        let now = Utc::now().into();
        let supplier = suppliers::ActiveModel {
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

        info!(company_id = %company_id, supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// Gets a supplier by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the supplier is not in the company.
    pub async fn get_supplier(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<suppliers::Model, RepositoryError> {
        suppliers::Entity::find_by_id(supplier_id)
            .filter(suppliers::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Supplier", supplier_id))
    }

    /// Lists suppliers by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_suppliers(
        &self,
        company_id: Uuid,
        filter: PartyFilter,
    ) -> Result<Vec<suppliers::Model>, RepositoryError> {
        let mut query = suppliers::Entity::find()
            .filter(suppliers::Column::CompanyId.eq(company_id))
            .order_by_asc(suppliers::Column::Name);

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(suppliers::Column::Name.contains(search));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(suppliers::Column::IsActive.eq(is_active));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Updates a supplier.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the supplier is not in the company.
    pub async fn update_supplier(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
        input: UpdatePartyInput,
    ) -> Result<suppliers::Model, RepositoryError> {
        let supplier = self.get_supplier(company_id, supplier_id).await?;
        let mut active: suppliers::ActiveModel = supplier.into();

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

    /// Soft-deletes a supplier. Documents keep pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the supplier is not in the company.
    pub async fn deactivate_supplier(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<suppliers::Model, RepositoryError> {
        self.update_supplier(
            company_id,
            supplier_id,
            UpdatePartyInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Recomputes and stores the supplier's advance balance.
    ///
    /// Clamps at zero rather than failing, so it can repair drift.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the supplier is not in the company.
    pub async fn sync_advance_balance(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<AdvanceSync, RepositoryError> {
        let txn = self.db.begin().await?;
        let sync = sync_supplier_advance(&txn, company_id, supplier_id, false).await?;
        txn.commit().await?;

        if sync.changed() {
            info!(
                company_id = %company_id,
                supplier_id = %supplier_id,
                old = %sync.old_balance,
                new = %sync.new_balance,
                "Supplier advance corrected"
            );
        }
        Ok(sync)
    }

    /// Totals billed, paid, returned and due across the supplier's purchases.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the supplier is not in the company.
    pub async fn due_summary(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<DueSummary, RepositoryError> {
        let supplier = self.get_supplier(company_id, supplier_id).await?;
        let docs = purchases::Entity::find()
            .filter(purchases::Column::SupplierId.eq(supplier_id))
            .all(&self.db)
            .await?;

        Ok(DueSummary {
            party_id: supplier_id,
            total_billed: docs.iter().map(|s| s.grand_total).sum(),
            total_paid: docs.iter().map(|s| s.paid_amount).sum(),
            total_returned: docs.iter().map(|s| s.returned_amount).sum(),
            total_due: docs.iter().map(|s| s.due_amount).sum(),
            advance_balance: supplier.advance_balance,
        })
    }
}
