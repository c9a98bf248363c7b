//! Purchase routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use super::sales::{ItemRequest, ListDocumentsQuery, UpdateDocumentRequest, UpdateItemRequest};
use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_db::{
    entities::purchases,
    repositories::{
        CreatePurchaseInput, PurchaseFilter, PurchaseItemInput, PurchaseRepository,
        PurchaseWithItems, UpdatePurchaseInput, UpdatePurchaseItemInput,
    },
};
use hisab_shared::types::PageResponse;

/// Creates the purchase routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", get(list_purchases).post(create_purchase))
        .route(
            "/purchases/{purchase_id}",
            get(get_purchase)
                .patch(update_purchase)
                .delete(delete_purchase),
        )
        .route("/purchases/{purchase_id}/items", post(add_item))
        .route(
            "/purchases/{purchase_id}/items/{item_id}",
            patch(update_item).delete(remove_item),
        )
}

/// Request body for creating a purchase.
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    /// Supplier; omit for a cash purchase, which must be paid in full.
    pub supplier_id: Option<Uuid>,
    /// Purchase date.
    pub purchase_date: NaiveDate,
    /// Account paying `paid_amount`.
    pub account_id: Option<Uuid>,
    /// Lines; at least one.
    pub items: Vec<ItemRequest>,
    /// Document discount.
    #[serde(default)]
    pub discount_amount: Decimal,
    /// VAT.
    #[serde(default)]
    pub vat_amount: Decimal,
    /// Delivery charge.
    #[serde(default)]
    pub delivery_charge: Decimal,
    /// Cash paid on the spot.
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Supplier advance to draw on.
    #[serde(default)]
    pub advance_used: Decimal,
    /// Free-form note.
    pub note: Option<String>,
}

impl From<ItemRequest> for PurchaseItemInput {
    fn from(item: ItemRequest) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount_amount: item.discount_amount,
        }
    }
}

async fn list_purchases(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListDocumentsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<purchases::Model>>> {
    let page = PurchaseRepository::new(state.conn())
        .list_purchases(
            tenant.company_id(),
            PurchaseFilter {
                supplier_id: query.party_id,
                status: query.status,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_purchase(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreatePurchaseRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseWithItems>)> {
    let purchase = PurchaseRepository::new(state.conn())
        .create_purchase(
            tenant.company_id(),
            CreatePurchaseInput {
                supplier_id: body.supplier_id,
                purchase_date: body.purchase_date,
                account_id: body.account_id,
                items: body.items.into_iter().map(Into::into).collect(),
                discount_amount: body.discount_amount,
                vat_amount: body.vat_amount,
                delivery_charge: body.delivery_charge,
                paid_amount: body.paid_amount,
                advance_used: body.advance_used,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

async fn get_purchase(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, purchase_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PurchaseWithItems>> {
    let purchase = PurchaseRepository::new(state.conn())
        .get_purchase(tenant.company_id(), purchase_id)
        .await?;
    Ok(Json(purchase))
}

async fn update_purchase(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, purchase_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<PurchaseWithItems>> {
    let purchase = PurchaseRepository::new(state.conn())
        .update_purchase(
            tenant.company_id(),
            purchase_id,
            UpdatePurchaseInput {
                purchase_date: body.date,
                discount_amount: body.discount_amount,
                vat_amount: body.vat_amount,
                delivery_charge: body.delivery_charge,
                note: body.note,
            },
        )
        .await?;
    Ok(Json(purchase))
}

async fn delete_purchase(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, purchase_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    PurchaseRepository::new(state.conn())
        .delete_purchase(tenant.company_id(), purchase_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, purchase_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ItemRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseWithItems>)> {
    let purchase = PurchaseRepository::new(state.conn())
        .add_item(tenant.company_id(), purchase_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

async fn update_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, purchase_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateItemRequest>,
) -> ApiResult<Json<PurchaseWithItems>> {
    let purchase = PurchaseRepository::new(state.conn())
        .update_item(
            tenant.company_id(),
            purchase_id,
            item_id,
            UpdatePurchaseItemInput {
                quantity: body.quantity,
                unit_price: body.unit_price,
                discount_amount: body.discount_amount,
            },
        )
        .await?;
    Ok(Json(purchase))
}

async fn remove_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, purchase_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<PurchaseWithItems>> {
    let purchase = PurchaseRepository::new(state.conn())
        .remove_item(tenant.company_id(), purchase_id, item_id)
        .await?;
    Ok(Json(purchase))
}
