//! Ledger transaction routes.
//!
//! Transactions are append-only. The only writes exposed here are manual
//! adjustments and their reversal.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_core::ledger::{EntrySide, TransactionKind};
use hisab_db::{
    entities::transactions,
    repositories::{CreateAdjustmentInput, TransactionFilter, TransactionRepository},
};
use hisab_shared::types::PageResponse;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/adjustments", post(create_adjustment))
        .route("/transactions/{transaction_id}", get(get_transaction))
        .route(
            "/transactions/{transaction_id}/reverse",
            post(reverse_transaction),
        )
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by account.
    pub account_id: Option<Uuid>,
    /// Filter by kind.
    pub kind: Option<TransactionKind>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// Request body for a manual adjustment.
#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentRequest {
    /// Account to adjust.
    pub account_id: Uuid,
    /// `debit` takes money out, `credit` puts it in.
    pub side: EntrySide,
    /// Positive amount.
    pub amount: Decimal,
    /// Posting date.
    pub date: NaiveDate,
    /// Why the adjustment was made.
    pub description: String,
}

/// Request body for reversing a transaction.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    /// Reason recorded on the reversal.
    pub reason: String,
}

async fn list_transactions(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListTransactionsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<transactions::Model>>> {
    let page = TransactionRepository::new(state.conn())
        .list_transactions(
            tenant.company_id(),
            TransactionFilter {
                account_id: query.account_id,
                kind: query.kind,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_adjustment(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateAdjustmentRequest>,
) -> ApiResult<(StatusCode, Json<transactions::Model>)> {
    let transaction = TransactionRepository::new(state.conn())
        .create_adjustment(
            tenant.company_id(),
            CreateAdjustmentInput {
                account_id: body.account_id,
                side: body.side,
                amount: body.amount,
                date: body.date,
                description: body.description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transaction(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, transaction_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<transactions::Model>> {
    let transaction = TransactionRepository::new(state.conn())
        .get_transaction(tenant.company_id(), transaction_id)
        .await?;
    Ok(Json(transaction))
}

/// POST `/transactions/{transaction_id}/reverse` - returns the reversal row.
async fn reverse_transaction(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, transaction_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ReverseRequest>,
) -> ApiResult<(StatusCode, Json<transactions::Model>)> {
    let reversal = TransactionRepository::new(state.conn())
        .reverse_transaction(tenant.company_id(), transaction_id, &body.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(reversal)))
}
