//! Income repository. Each income owns one `income` credit.

use chrono::{NaiveDate, Utc};
use hisab_core::ledger::{EntrySide, TransactionKind};
use hisab_core::numbering::DocumentKind;
use hisab_shared::types::{PageRequest, PageResponse, round_money};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use super::transaction::{PostingRequest, Source, post, reverse, reverse_source};
use crate::entities::incomes;

/// Input for creating an income.
#[derive(Debug, Clone)]
pub struct CreateIncomeInput {
    /// Account the money enters.
    pub account_id: Uuid,
    /// Free-form category, e.g. `interest`.
    pub category: String,
    /// Amount earned.
    pub amount: Decimal,
    /// Income date.
    pub income_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Input for updating an income.
#[derive(Debug, Clone, Default)]
pub struct UpdateIncomeInput {
    /// Account the money enters.
    pub account_id: Option<Uuid>,
    /// Category.
    pub category: Option<String>,
    /// Amount earned.
    pub amount: Option<Decimal>,
    /// Income date.
    pub income_date: Option<NaiveDate>,
    /// Free text.
    pub note: Option<Option<String>>,
}

/// Filter options for listing incomes.
#[derive(Debug, Clone, Default)]
pub struct IncomeFilter {
    /// Filter by category.
    pub category: Option<String>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

fn income_posting(
    company_id: Uuid,
    income_id: Uuid,
    number: &str,
    account_id: Uuid,
    amount: Decimal,
    date: NaiveDate,
    category: &str,
) -> PostingRequest {
    PostingRequest {
        company_id,
        account_id,
        kind: TransactionKind::Income,
        side: EntrySide::Credit,
        amount,
        date,
        description: format!("Income {number}: {category}"),
        source: Some((Source::Income, income_id)),
    }
}

/// Income repository.
#[derive(Debug, Clone)]
pub struct IncomeRepository {
    db: DatabaseConnection,
}

impl IncomeRepository {
    /// Creates a new income repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an income and credits its account.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive or the account is
    /// missing or inactive.
    pub async fn create_income(
        &self,
        company_id: Uuid,
        input: CreateIncomeInput,
    ) -> Result<incomes::Model, RepositoryError> {
        let txn = self.db.begin().await?;

        let income_id = Uuid::new_v4();
        let number = next_number(&txn, company_id, DocumentKind::Income).await?;
        let transaction = post(
            &txn,
            income_posting(
                company_id,
                income_id,
                &number,
                input.account_id,
                input.amount,
                input.income_date,
                &input.category,
            ),
        )
        .await?;

        let now = Utc::now().into();
        let income = incomes::ActiveModel {
            id: Set(income_id),
            company_id: Set(company_id),
            income_number: Set(number),
            account_id: Set(input.account_id),
            category: Set(input.category),
            amount: Set(transaction.credit),
            income_date: Set(input.income_date),
            note: Set(input.note),
            transaction_id: Set(transaction.id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            income_id = %income.id,
            number = %income.income_number,
            amount = %income.amount,
            "Income created"
        );
        Ok(income)
    }

    /// Gets an income by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the income is not in the company.
    pub async fn get_income(
        &self,
        company_id: Uuid,
        income_id: Uuid,
    ) -> Result<incomes::Model, RepositoryError> {
        incomes::Entity::find_by_id(income_id)
            .filter(incomes::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Income", income_id))
    }

    /// Lists incomes, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_incomes(
        &self,
        company_id: Uuid,
        filter: IncomeFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<incomes::Model>, RepositoryError> {
        let mut query = incomes::Entity::find().filter(incomes::Column::CompanyId.eq(company_id));

        if let Some(category) = filter.category {
            query = query.filter(incomes::Column::Category.eq(category));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(incomes::Column::IncomeDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(incomes::Column::IncomeDate.lte(date_to));
        }

        let query = query
            .order_by_desc(incomes::Column::IncomeDate)
            .order_by_desc(incomes::Column::IncomeNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Updates an income.
    ///
    /// A new amount or account reverses the old ledger row and posts a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the income is missing or the new posting fails.
    pub async fn update_income(
        &self,
        company_id: Uuid,
        income_id: Uuid,
        input: UpdateIncomeInput,
    ) -> Result<incomes::Model, RepositoryError> {
        let txn = self.db.begin().await?;
        let income = incomes::Entity::find_by_id(income_id)
            .filter(incomes::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("Income", income_id))?;

        let account_id = input.account_id.unwrap_or(income.account_id);
        let amount = input.amount.map_or(income.amount, round_money);
        let date = input.income_date.unwrap_or(income.income_date);
        let category = input.category.unwrap_or_else(|| income.category.clone());
        let reposted = account_id != income.account_id || amount != income.amount;

        let mut active: incomes::ActiveModel = income.clone().into();
        if reposted {
            let reason = format!("Income {} updated", income.income_number);
            reverse(&txn, company_id, income.transaction_id, &reason, false).await?;
            let transaction = post(
                &txn,
                income_posting(
                    company_id,
                    income_id,
                    &income.income_number,
                    account_id,
                    amount,
                    date,
                    &category,
                ),
            )
            .await?;
            active.transaction_id = Set(transaction.id);
            active.account_id = Set(account_id);
            active.amount = Set(transaction.credit);
        }
        active.category = Set(category);
        active.income_date = Set(date);
        if let Some(note) = input.note {
            active.note = Set(note);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            income_id = %income_id,
            number = %updated.income_number,
            reposted,
            "Income updated"
        );
        Ok(updated)
    }

    /// Deletes an income after reversing its ledger rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the income is not in the company.
    pub async fn delete_income(
        &self,
        company_id: Uuid,
        income_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let income = incomes::Entity::find_by_id(income_id)
            .filter(incomes::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("Income", income_id))?;

        let reason = format!("Income {} deleted", income.income_number);
        reverse_source(&txn, company_id, Source::Income, income_id, &reason).await?;

        let number = income.income_number.clone();
        income.delete(&txn).await?;
        txn.commit().await?;

        info!(company_id = %company_id, income_id = %income_id, number = %number, "Income deleted");
        Ok(())
    }
}
