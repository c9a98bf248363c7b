//! Account transfer routes.

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
    entities::account_transfers,
    repositories::{CreateTransferInput, TransferFilter, TransferRepository},
};
use hisab_shared::types::PageResponse;

/// Creates the transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route(
            "/transfers/{transfer_id}",
            get(get_transfer).delete(delete_transfer),
        )
}

/// Query parameters for listing transfers.
#[derive(Debug, Deserialize)]
pub struct ListTransfersQuery {
    /// Either side of the transfer.
    pub account_id: Option<Uuid>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Account money leaves.
    pub from_account_id: Uuid,
    /// Account money enters.
    pub to_account_id: Uuid,
    /// Positive amount.
    pub amount: Decimal,
    /// Transfer date.
    pub transfer_date: NaiveDate,
    /// Free-form note.
    pub note: Option<String>,
}

async fn list_transfers(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListTransfersQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<account_transfers::Model>>> {
    let page = TransferRepository::new(state.conn())
        .list_transfers(
            tenant.company_id(),
            TransferFilter {
                account_id: query.account_id,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_transfer(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateTransferRequest>,
) -> ApiResult<(StatusCode, Json<account_transfers::Model>)> {
    let transfer = TransferRepository::new(state.conn())
        .create_transfer(
            tenant.company_id(),
            CreateTransferInput {
                from_account_id: body.from_account_id,
                to_account_id: body.to_account_id,
                amount: body.amount,
                transfer_date: body.transfer_date,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

async fn get_transfer(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, transfer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<account_transfers::Model>> {
    let transfer = TransferRepository::new(state.conn())
        .get_transfer(tenant.company_id(), transfer_id)
        .await?;
    Ok(Json(transfer))
}

async fn delete_transfer(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, transfer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    TransferRepository::new(state.conn())
        .delete_transfer(tenant.company_id(), transfer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
