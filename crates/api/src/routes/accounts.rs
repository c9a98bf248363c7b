//! Account management routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_core::account::AccountKind;
use hisab_db::{
    entities::accounts,
    repositories::{
        AccountFilter, AccountRepository, AccountStatement, BalanceCheck, CreateAccountInput,
        ReportRepository, UpdateAccountInput,
    },
};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/{account_id}",
            get(get_account)
                .patch(update_account)
                .delete(deactivate_account),
        )
        .route("/accounts/{account_id}/verify", get(verify_balance))
        .route("/accounts/{account_id}/statement", get(account_statement))
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by kind.
    pub kind: Option<AccountKind>,
    /// Filter by active status.
    pub active: Option<bool>,
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Display name.
    pub name: String,
    /// `bank`, `mobile`, `cash` or `other`.
    pub kind: AccountKind,
    /// Account or wallet number (bank and mobile only).
    pub number: Option<String>,
    /// Bank name.
    pub bank_name: Option<String>,
    /// Branch.
    pub branch: Option<String>,
    /// Money already in the account, posted as its first transaction.
    #[serde(default)]
    pub opening_balance: Decimal,
    /// Date of the opening balance posting. Defaults to today.
    pub opening_date: Option<NaiveDate>,
}

/// Request body for updating an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// Display name.
    pub name: Option<String>,
    /// Account number.
    #[serde(default, deserialize_with = "super::nullable")]
    pub number: Option<Option<String>>,
    /// Bank name.
    #[serde(default, deserialize_with = "super::nullable")]
    pub bank_name: Option<Option<String>>,
    /// Branch.
    #[serde(default, deserialize_with = "super::nullable")]
    pub branch: Option<Option<String>>,
    /// Whether the account is active.
    pub is_active: Option<bool>,
}

/// Date range for a statement.
#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// GET `/companies/{company_id}/accounts`
async fn list_accounts(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Json<Value>> {
    let accounts = AccountRepository::new(state.conn())
        .list_accounts(
            tenant.company_id(),
            AccountFilter {
                kind: query.kind,
                is_active: query.active,
            },
        )
        .await?;
    Ok(Json(json!({ "accounts": accounts })))
}

/// POST `/companies/{company_id}/accounts`
async fn create_account(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<accounts::Model>)> {
    let account = AccountRepository::new(state.conn())
        .create_account(
            tenant.company_id(),
            CreateAccountInput {
                name: body.name,
                kind: body.kind,
                number: body.number,
                bank_name: body.bank_name,
                branch: body.branch,
                opening_balance: body.opening_balance,
                opening_date: body.opening_date,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/companies/{company_id}/accounts/{account_id}`
async fn get_account(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, account_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<accounts::Model>> {
    let account = AccountRepository::new(state.conn())
        .get_account(tenant.company_id(), account_id)
        .await?;
    Ok(Json(account))
}

/// PATCH `/companies/{company_id}/accounts/{account_id}`
async fn update_account(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, account_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateAccountRequest>,
) -> ApiResult<Json<accounts::Model>> {
    let account = AccountRepository::new(state.conn())
        .update_account(
            tenant.company_id(),
            account_id,
            UpdateAccountInput {
                name: body.name,
                number: body.number,
                bank_name: body.bank_name,
                branch: body.branch,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(Json(account))
}

/// DELETE `/companies/{company_id}/accounts/{account_id}` - soft delete.
async fn deactivate_account(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, account_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<accounts::Model>> {
    let account = AccountRepository::new(state.conn())
        .deactivate_account(tenant.company_id(), account_id)
        .await?;
    Ok(Json(account))
}

/// GET `/companies/{company_id}/accounts/{account_id}/verify`
async fn verify_balance(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, account_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<BalanceCheck>> {
    let check = AccountRepository::new(state.conn())
        .verify_balance(tenant.company_id(), account_id)
        .await?;
    Ok(Json(check))
}

/// GET `/companies/{company_id}/accounts/{account_id}/statement`
async fn account_statement(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, account_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<StatementQuery>,
) -> ApiResult<Json<AccountStatement>> {
    let statement = ReportRepository::new(state.conn())
        .account_statement(tenant.company_id(), account_id, query.from, query.to)
        .await?;
    Ok(Json(statement))
}
