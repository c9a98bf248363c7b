//! Account transfers: a `transfer_out` debit paired with a `transfer_in` credit.

use chrono::{NaiveDate, Utc};
use hisab_core::LedgerError;
use hisab_core::ledger::{EntrySide, TransactionKind};
use hisab_core::numbering::DocumentKind;
use hisab_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::transaction::{PostingRequest, Source, post, reverse_source};
use crate::entities::account_transfers;

/// Input for moving money between two accounts.
#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    /// Account the money leaves.
    pub from_account_id: Uuid,
    /// Account the money enters.
    pub to_account_id: Uuid,
    /// Amount moved.
    pub amount: Decimal,
    /// Transfer date.
    pub transfer_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Filter options for listing transfers.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    /// Transfers touching this account on either side.
    pub account_id: Option<Uuid>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// Account transfer repository.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    db: DatabaseConnection,
}

impl TransferRepository {
    /// Creates a new transfer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Moves money from one account to another.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Both sides are the same account
    /// - Either account is missing, inactive or in another company
    /// - The source is a cash account without enough balance
    pub async fn create_transfer(
        &self,
        company_id: Uuid,
        input: CreateTransferInput,
    ) -> Result<account_transfers::Model, RepositoryError> {
        if input.from_account_id == input.to_account_id {
            warn!(account_id = %input.from_account_id, "Transfer to same account rejected");
            return Err(LedgerError::SameAccountTransfer.into());
        }

        let txn = self.db.begin().await?;
        let transfer_id = Uuid::new_v4();
        let number = next_number(&txn, company_id, DocumentKind::Transfer).await?;

        let out = post(
            &txn,
            PostingRequest {
                company_id,
                account_id: input.from_account_id,
                kind: TransactionKind::TransferOut,
                side: EntrySide::Debit,
                amount: input.amount,
                date: input.transfer_date,
                description: format!("Transfer {number} out"),
                source: Some((Source::Transfer, transfer_id)),
            },
        )
        .await?;
        let inbound = post(
            &txn,
            PostingRequest {
                company_id,
                account_id: input.to_account_id,
                kind: TransactionKind::TransferIn,
                side: EntrySide::Credit,
                amount: input.amount,
                date: input.transfer_date,
                description: format!("Transfer {number} in"),
                source: Some((Source::Transfer, transfer_id)),
            },
        )
        .await?;

        let transfer = account_transfers::ActiveModel {
            id: Set(transfer_id),
            company_id: Set(company_id),
            transfer_number: Set(number),
            from_account_id: Set(input.from_account_id),
            to_account_id: Set(input.to_account_id),
            amount: Set(out.debit),
            transfer_date: Set(input.transfer_date),
            note: Set(input.note),
            out_transaction_id: Set(out.id),
            in_transaction_id: Set(inbound.id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            transfer_id = %transfer.id,
            number = %transfer.transfer_number,
            from = %transfer.from_account_id,
            to = %transfer.to_account_id,
            amount = %transfer.amount,
            "Transfer created"
        );
        Ok(transfer)
    }

    /// Gets a transfer by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the transfer is not in the company.
    pub async fn get_transfer(
        &self,
        company_id: Uuid,
        transfer_id: Uuid,
    ) -> Result<account_transfers::Model, RepositoryError> {
        account_transfers::Entity::find_by_id(transfer_id)
            .filter(account_transfers::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("AccountTransfer", transfer_id))
    }

    /// Lists transfers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transfers(
        &self,
        company_id: Uuid,
        filter: TransferFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<account_transfers::Model>, RepositoryError> {
        let mut query = account_transfers::Entity::find()
            .filter(account_transfers::Column::CompanyId.eq(company_id));

        if let Some(account_id) = filter.account_id {
            query = query.filter(
                Condition::any()
                    .add(account_transfers::Column::FromAccountId.eq(account_id))
                    .add(account_transfers::Column::ToAccountId.eq(account_id)),
            );
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(account_transfers::Column::TransferDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(account_transfers::Column::TransferDate.lte(date_to));
        }

        let query = query
            .order_by_desc(account_transfers::Column::TransferDate)
            .order_by_desc(account_transfers::Column::TransferNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Deletes a transfer after reversing both legs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the transfer is not in the company.
    pub async fn delete_transfer(
        &self,
        company_id: Uuid,
        transfer_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let transfer = account_transfers::Entity::find_by_id(transfer_id)
            .filter(account_transfers::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("AccountTransfer", transfer_id))?;

        let reason = format!("Transfer {} deleted", transfer.transfer_number);
        let reversals = reverse_source(&txn, company_id, Source::Transfer, transfer_id, &reason).await?;

        let number = transfer.transfer_number.clone();
        transfer.delete(&txn).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            transfer_id = %transfer_id,
            number = %number,
            reversed = reversals.len(),
            "Transfer deleted"
        );
        Ok(())
    }
}
