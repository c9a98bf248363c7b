//! Expense repository. Each expense owns one `expense` debit.

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
use crate::entities::expenses;

/// Input for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Account the money leaves.
    pub account_id: Uuid,
    /// Free-form category, e.g. `rent`.
    pub category: String,
    /// Amount spent.
    pub amount: Decimal,
    /// Expense date.
    pub expense_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Input for updating an expense.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseInput {
    /// Account the money leaves.
    pub account_id: Option<Uuid>,
    /// Category.
    pub category: Option<String>,
    /// Amount spent.
    pub amount: Option<Decimal>,
    /// Expense date.
    pub expense_date: Option<NaiveDate>,
    /// Free text.
    pub note: Option<Option<String>>,
}

/// Filter options for listing expenses.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Filter by category.
    pub category: Option<String>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

fn expense_posting(
    company_id: Uuid,
    expense_id: Uuid,
    number: &str,
    account_id: Uuid,
    amount: Decimal,
    date: NaiveDate,
    category: &str,
) -> PostingRequest {
    PostingRequest {
        company_id,
        account_id,
        kind: TransactionKind::Expense,
        side: EntrySide::Debit,
        amount,
        date,
        description: format!("Expense {number}: {category}"),
        source: Some((Source::Expense, expense_id)),
    }
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an expense and debits its account.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, the account is
    /// missing or inactive, or cash would go negative.
    pub async fn create_expense(
        &self,
        company_id: Uuid,
        input: CreateExpenseInput,
    ) -> Result<expenses::Model, RepositoryError> {
        let txn = self.db.begin().await?;

        let expense_id = Uuid::new_v4();
        let number = next_number(&txn, company_id, DocumentKind::Expense).await?;
        let transaction = post(
            &txn,
            expense_posting(
                company_id,
                expense_id,
                &number,
                input.account_id,
                input.amount,
                input.expense_date,
                &input.category,
            ),
        )
        .await?;

        let now = Utc::now().into();
        let expense = expenses::ActiveModel {
            id: Set(expense_id),
            company_id: Set(company_id),
            expense_number: Set(number),
            account_id: Set(input.account_id),
            category: Set(input.category),
            amount: Set(transaction.debit),
            expense_date: Set(input.expense_date),
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
            expense_id = %expense.id,
            number = %expense.expense_number,
            amount = %expense.amount,
            "Expense created"
        );
        Ok(expense)
    }

    /// Gets an expense by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the expense is not in the company.
    pub async fn get_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<expenses::Model, RepositoryError> {
        expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Expense", expense_id))
    }

    /// Lists expenses, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_expenses(
        &self,
        company_id: Uuid,
        filter: ExpenseFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<expenses::Model>, RepositoryError> {
        let mut query = expenses::Entity::find().filter(expenses::Column::CompanyId.eq(company_id));

        if let Some(category) = filter.category {
            query = query.filter(expenses::Column::Category.eq(category));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(expenses::Column::ExpenseDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(expenses::Column::ExpenseDate.lte(date_to));
        }

        let query = query
            .order_by_desc(expenses::Column::ExpenseDate)
            .order_by_desc(expenses::Column::ExpenseNumber);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Updates an expense.
    ///
    /// A new amount or account reverses the old ledger row and posts a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is missing or the new posting fails.
    pub async fn update_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        input: UpdateExpenseInput,
    ) -> Result<expenses::Model, RepositoryError> {
        let txn = self.db.begin().await?;
        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("Expense", expense_id))?;

        let account_id = input.account_id.unwrap_or(expense.account_id);
        let amount = input.amount.map_or(expense.amount, round_money);
        let date = input.expense_date.unwrap_or(expense.expense_date);
        let category = input.category.unwrap_or_else(|| expense.category.clone());
        let reposted = account_id != expense.account_id || amount != expense.amount;

        let mut active: expenses::ActiveModel = expense.clone().into();
        if reposted {
            let reason = format!("Expense {} updated", expense.expense_number);
            reverse(&txn, company_id, expense.transaction_id, &reason, false).await?;
            let transaction = post(
                &txn,
                expense_posting(
                    company_id,
                    expense_id,
                    &expense.expense_number,
                    account_id,
                    amount,
                    date,
                    &category,
                ),
            )
            .await?;
            active.transaction_id = Set(transaction.id);
            active.account_id = Set(account_id);
            active.amount = Set(transaction.debit);
        }
        active.category = Set(category);
        active.expense_date = Set(date);
        if let Some(note) = input.note {
            active.note = Set(note);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            expense_id = %expense_id,
            number = %updated.expense_number,
            reposted,
            "Expense updated"
        );
        Ok(updated)
    }

    /// Deletes an expense after reversing its ledger rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the expense is not in the company.
    pub async fn delete_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("Expense", expense_id))?;

        let reason = format!("Expense {} deleted", expense.expense_number);
        reverse_source(&txn, company_id, Source::Expense, expense_id, &reason).await?;

        let number = expense.expense_number.clone();
        expense.delete(&txn).await?;
        txn.commit().await?;

        info!(company_id = %company_id, expense_id = %expense_id, number = %number, "Expense deleted");
        Ok(())
    }
}
