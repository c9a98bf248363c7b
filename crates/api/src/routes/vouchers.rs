//! Expense and income routes.
//!
//! Both share one request shape; an expense debits the account, an income
//! credits it.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_db::{
    entities::{expenses, incomes},
    repositories::{
        CreateExpenseInput, CreateIncomeInput, ExpenseFilter, ExpenseRepository, IncomeFilter,
        IncomeRepository, UpdateExpenseInput, UpdateIncomeInput,
    },
};
use hisab_shared::types::PageResponse;

/// Creates the expense and income routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route(
            "/expenses/{expense_id}",
            get(get_expense)
                .patch(update_expense)
                .delete(delete_expense),
        )
        .route("/incomes", get(list_incomes).post(create_income))
        .route(
            "/incomes/{income_id}",
            get(get_income).patch(update_income).delete(delete_income),
        )
}

/// Query parameters for listing expenses or incomes.
#[derive(Debug, Deserialize)]
pub struct ListVouchersQuery {
    /// Exact category.
    pub category: Option<String>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// Request body for creating an expense or income.
#[derive(Debug, Deserialize)]
pub struct CreateVoucherRequest {
    /// Account debited (expense) or credited (income).
    pub account_id: Uuid,
    /// Free-form category.
    pub category: String,
    /// Positive amount.
    pub amount: Decimal,
    /// Voucher date.
    pub date: NaiveDate,
    /// Free-form note.
    pub note: Option<String>,
}

/// Request body for updating an expense or income.
///
/// Changing `amount` or `account_id` reposts the ledger transaction.
#[derive(Debug, Deserialize)]
pub struct UpdateVoucherRequest {
    /// Account.
    pub account_id: Option<Uuid>,
    /// Category.
    pub category: Option<String>,
    /// Amount.
    pub amount: Option<Decimal>,
    /// Voucher date.
    pub date: Option<NaiveDate>,
    /// Note; `null` clears it.
    #[serde(default, deserialize_with = "super::nullable")]
    pub note: Option<Option<String>>,
}

async fn list_expenses(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListVouchersQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<expenses::Model>>> {
    let page = ExpenseRepository::new(state.conn())
        .list_expenses(
            tenant.company_id(),
            ExpenseFilter {
                category: query.category,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_expense(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateVoucherRequest>,
) -> ApiResult<(StatusCode, Json<expenses::Model>)> {
    let expense = ExpenseRepository::new(state.conn())
        .create_expense(
            tenant.company_id(),
            CreateExpenseInput {
                account_id: body.account_id,
                category: body.category,
                amount: body.amount,
                expense_date: body.date,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn get_expense(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, expense_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<expenses::Model>> {
    let expense = ExpenseRepository::new(state.conn())
        .get_expense(tenant.company_id(), expense_id)
        .await?;
    Ok(Json(expense))
}

async fn update_expense(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, expense_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateVoucherRequest>,
) -> ApiResult<Json<expenses::Model>> {
    let expense = ExpenseRepository::new(state.conn())
        .update_expense(
            tenant.company_id(),
            expense_id,
            UpdateExpenseInput {
                account_id: body.account_id,
                category: body.category,
                amount: body.amount,
                expense_date: body.date,
                note: body.note,
            },
        )
        .await?;
    Ok(Json(expense))
}

async fn delete_expense(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, expense_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ExpenseRepository::new(state.conn())
        .delete_expense(tenant.company_id(), expense_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_incomes(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListVouchersQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<incomes::Model>>> {
    let page = IncomeRepository::new(state.conn())
        .list_incomes(
            tenant.company_id(),
            IncomeFilter {
                category: query.category,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_income(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateVoucherRequest>,
) -> ApiResult<(StatusCode, Json<incomes::Model>)> {
    let income = IncomeRepository::new(state.conn())
        .create_income(
            tenant.company_id(),
            CreateIncomeInput {
                account_id: body.account_id,
                category: body.category,
                amount: body.amount,
                income_date: body.date,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(income)))
}

async fn get_income(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, income_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<incomes::Model>> {
    let income = IncomeRepository::new(state.conn())
        .get_income(tenant.company_id(), income_id)
        .await?;
    Ok(Json(income))
}

async fn update_income(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, income_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateVoucherRequest>,
) -> ApiResult<Json<incomes::Model>> {
    let income = IncomeRepository::new(state.conn())
        .update_income(
            tenant.company_id(),
            income_id,
            UpdateIncomeInput {
                account_id: body.account_id,
                category: body.category,
                amount: body.amount,
                income_date: body.date,
                note: body.note,
            },
        )
        .await?;
    Ok(Json(income))
}

async fn delete_income(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, income_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    IncomeRepository::new(state.conn())
        .delete_income(tenant.company_id(), income_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
