//! Sale and purchase return routes.

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
    entities::{purchase_returns, sale_returns},
    repositories::{
        CreatePurchaseReturnInput, CreateSaleReturnInput, PurchaseReturnFilter,
        PurchaseReturnRepository, PurchaseReturnWithItems, ReturnItemInput, SaleReturnFilter,
        SaleReturnRepository, SaleReturnWithItems,
    },
};
use hisab_shared::types::PageResponse;

/// Creates the return routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sale-returns",
            get(list_sale_returns).post(create_sale_return),
        )
        .route("/sale-returns/{return_id}", get(get_sale_return))
        .route(
            "/purchase-returns",
            get(list_purchase_returns).post(create_purchase_return),
        )
        .route("/purchase-returns/{return_id}", get(get_purchase_return))
}

/// Query parameters for listing returns.
#[derive(Debug, Deserialize)]
pub struct ListReturnsQuery {
    /// Original sale or purchase.
    pub document_id: Option<Uuid>,
    /// Customer or supplier.
    pub party_id: Option<Uuid>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// One returned product.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReturnItemRequest {
    /// Product on the original document.
    pub product_id: Uuid,
    /// Quantity going back.
    pub quantity: Decimal,
}

/// Request body for a return against a sale or purchase.
#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    /// Original sale or purchase.
    pub document_id: Uuid,
    /// Return date.
    pub return_date: NaiveDate,
    /// Returned products.
    pub items: Vec<ReturnItemRequest>,
    /// Cash to refund, capped at the overpayment.
    #[serde(default)]
    pub refund_amount: Decimal,
    /// Account the refund moves through.
    pub account_id: Option<Uuid>,
    /// Free-form note.
    pub note: Option<String>,
}

impl CreateReturnRequest {
    fn items(&self) -> Vec<ReturnItemInput> {
        self.items
            .iter()
            .map(|item| ReturnItemInput {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect()
    }
}

async fn list_sale_returns(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListReturnsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<sale_returns::Model>>> {
    let page = SaleReturnRepository::new(state.conn())
        .list_sale_returns(
            tenant.company_id(),
            SaleReturnFilter {
                sale_id: query.document_id,
                customer_id: query.party_id,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_sale_return(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateReturnRequest>,
) -> ApiResult<(StatusCode, Json<SaleReturnWithItems>)> {
    let items = body.items();
    let sale_return = SaleReturnRepository::new(state.conn())
        .create_sale_return(
            tenant.company_id(),
            CreateSaleReturnInput {
                sale_id: body.document_id,
                return_date: body.return_date,
                items,
                refund_amount: body.refund_amount,
                account_id: body.account_id,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(sale_return)))
}

async fn get_sale_return(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, return_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SaleReturnWithItems>> {
    let sale_return = SaleReturnRepository::new(state.conn())
        .get_sale_return(tenant.company_id(), return_id)
        .await?;
    Ok(Json(sale_return))
}

async fn list_purchase_returns(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListReturnsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<purchase_returns::Model>>> {
    let page = PurchaseReturnRepository::new(state.conn())
        .list_purchase_returns(
            tenant.company_id(),
            PurchaseReturnFilter {
                purchase_id: query.document_id,
                supplier_id: query.party_id,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_purchase_return(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateReturnRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseReturnWithItems>)> {
    let items = body.items();
    let purchase_return = PurchaseReturnRepository::new(state.conn())
        .create_purchase_return(
            tenant.company_id(),
            CreatePurchaseReturnInput {
                purchase_id: body.document_id,
                return_date: body.return_date,
                items,
                refund_amount: body.refund_amount,
                account_id: body.account_id,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(purchase_return)))
}

async fn get_purchase_return(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, return_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PurchaseReturnWithItems>> {
    let purchase_return = PurchaseReturnRepository::new(state.conn())
        .get_purchase_return(tenant.company_id(), return_id)
        .await?;
    Ok(Json(purchase_return))
}
