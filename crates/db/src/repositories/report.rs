//! Read-only reports over the ledger and documents.

use chrono::NaiveDate;
use hisab_core::ledger::{self, Posting, running_balances};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::error::RepositoryError;
use crate::entities::{accounts, expenses, incomes, purchases, sales, transactions};

/// One ledger row on a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRow {
    /// Transaction ID.
    pub transaction_id: Uuid,
    /// `TXN-000000` number.
    pub transaction_number: String,
    /// Business date.
    pub date: NaiveDate,
    /// Transaction kind.
    pub kind: ledger::TransactionKind,
    /// Description.
    pub description: String,
    /// Money out.
    pub debit: Decimal,
    /// Money in.
    pub credit: Decimal,
    /// Balance after this row in date order.
    pub balance: Decimal,
}

/// Account activity over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatement {
    /// Account ID.
    pub account_id: Uuid,
    /// Account name.
    pub account_name: String,
    /// Range start, inclusive.
    pub from: Option<NaiveDate>,
    /// Range end, inclusive.
    pub to: Option<NaiveDate>,
    /// Balance before `from`.
    pub opening_balance: Decimal,
    /// Rows in range.
    pub rows: Vec<StatementRow>,
    /// Σ debit in range.
    pub total_debit: Decimal,
    /// Σ credit in range.
    pub total_credit: Decimal,
    /// Balance after the last row.
    pub closing_balance: Decimal,
}

/// Company-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Σ sale grand total in range.
    pub total_sales: Decimal,
    /// Σ purchase grand total in range.
    pub total_purchases: Decimal,
    /// Σ expenses in range.
    pub total_expenses: Decimal,
    /// Σ incomes in range.
    pub total_incomes: Decimal,
    /// Σ sale due, all time.
    pub receivables: Decimal,
    /// Σ purchase due, all time.
    pub payables: Decimal,
    /// Σ balance of active accounts.
    pub cash_position: Decimal,
}

/// `SUM(column)` over the filtered rows; zero when none match.
async fn sum_column<E, C>(
    conn: &C,
    select: Select<E>,
    column: E::Column,
) -> Result<Decimal, RepositoryError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let total: Option<Option<Decimal>> = select
        .select_only()
        .column_as(column.sum(), "total")
        .into_tuple::<Option<Decimal>>()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(Decimal::ZERO))
}

/// Report repository.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Builds an account statement with running balances.
    ///
    /// Rows are ordered by date then posting order, so the running balance
    /// can differ from `balance_after` when back-dated rows exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or a stored row is malformed.
    pub async fn account_statement(
        &self,
        company_id: Uuid,
        account_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AccountStatement, RepositoryError> {
        let account = accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Account", account_id))?;

        let opening_balance = match from {
            Some(from) => {
                let before: Vec<(Decimal, Decimal)> = transactions::Entity::find()
                    .select_only()
                    .column(transactions::Column::Debit)
                    .column(transactions::Column::Credit)
                    .filter(transactions::Column::AccountId.eq(account_id))
                    .filter(transactions::Column::TransactionDate.lt(from))
                    .into_tuple()
                    .all(&self.db)
                    .await?;
                before.iter().map(|(debit, credit)| credit - debit).sum()
            }
            None => Decimal::ZERO,
        };

        let mut query =
            transactions::Entity::find().filter(transactions::Column::AccountId.eq(account_id));
        if let Some(from) = from {
            query = query.filter(transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(transactions::Column::TransactionDate.lte(to));
        }
        let rows = query
            .order_by_asc(transactions::Column::TransactionDate)
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::TransactionNumber)
            .all(&self.db)
            .await?;

        let postings = rows
            .iter()
            .map(|t| Posting::from_parts(t.debit, t.credit))
            .collect::<Result<Vec<_>, _>>()?;
        let balances = running_balances(opening_balance, &postings);
        let closing_balance = balances.last().copied().unwrap_or(opening_balance);

        let total_debit: Decimal = rows.iter().map(|t| t.debit).sum();
        let total_credit: Decimal = rows.iter().map(|t| t.credit).sum();
        let rows: Vec<StatementRow> = rows
            .into_iter()
            .zip(balances)
            .map(|(t, balance)| StatementRow {
                transaction_id: t.id,
                transaction_number: t.transaction_number,
                date: t.transaction_date,
                kind: t.kind.into(),
                description: t.description,
                debit: t.debit,
                credit: t.credit,
                balance,
            })
            .collect();

        debug!(account_id = %account_id, rows = rows.len(), %closing_balance, "Statement built");
        Ok(AccountStatement {
            account_id,
            account_name: account.name,
            from,
            to,
            opening_balance,
            rows,
            total_debit,
            total_credit,
            closing_balance,
        })
    }

    /// Totals for the company dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn dashboard(
        &self,
        company_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Dashboard, RepositoryError> {
        let mut sales_in_range =
            sales::Entity::find().filter(sales::Column::CompanyId.eq(company_id));
        let mut purchases_in_range =
            purchases::Entity::find().filter(purchases::Column::CompanyId.eq(company_id));
        let mut expenses_in_range =
            expenses::Entity::find().filter(expenses::Column::CompanyId.eq(company_id));
        let mut incomes_in_range =
            incomes::Entity::find().filter(incomes::Column::CompanyId.eq(company_id));

        if let Some(from) = from {
            sales_in_range = sales_in_range.filter(sales::Column::SaleDate.gte(from));
            purchases_in_range = purchases_in_range.filter(purchases::Column::PurchaseDate.gte(from));
            expenses_in_range = expenses_in_range.filter(expenses::Column::ExpenseDate.gte(from));
            incomes_in_range = incomes_in_range.filter(incomes::Column::IncomeDate.gte(from));
        }
        if let Some(to) = to {
            sales_in_range = sales_in_range.filter(sales::Column::SaleDate.lte(to));
            purchases_in_range = purchases_in_range.filter(purchases::Column::PurchaseDate.lte(to));
            expenses_in_range = expenses_in_range.filter(expenses::Column::ExpenseDate.lte(to));
            incomes_in_range = incomes_in_range.filter(incomes::Column::IncomeDate.lte(to));
        }

        let db = &self.db;
        Ok(Dashboard {
            total_sales: sum_column(db, sales_in_range, sales::Column::GrandTotal).await?,
            total_purchases: sum_column(db, purchases_in_range, purchases::Column::GrandTotal)
                .await?,
            total_expenses: sum_column(db, expenses_in_range, expenses::Column::Amount).await?,
            total_incomes: sum_column(db, incomes_in_range, incomes::Column::Amount).await?,
            receivables: sum_column(
                db,
                sales::Entity::find().filter(sales::Column::CompanyId.eq(company_id)),
                sales::Column::DueAmount,
            )
            .await?,
            payables: sum_column(
                db,
                purchases::Entity::find().filter(purchases::Column::CompanyId.eq(company_id)),
                purchases::Column::DueAmount,
            )
            .await?,
            cash_position: sum_column(
                db,
                accounts::Entity::find()
                    .filter(accounts::Column::CompanyId.eq(company_id))
                    .filter(accounts::Column::IsActive.eq(true)),
                accounts::Column::Balance,
            )
            .await?,
        })
    }
}
