//! Sale routes.
//!
//! Item requests and header updates are shared with purchases.

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
use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_core::billing::PaymentStatus;
use hisab_db::{
    entities::sales,
    repositories::{
        CreateSaleInput, SaleFilter, SaleItemInput, SaleRepository, SaleWithItems,
        UpdateSaleInput, UpdateSaleItemInput,
    },
};
use hisab_shared::types::PageResponse;

/// Creates the sale routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(create_sale))
        .route(
            "/sales/{sale_id}",
            get(get_sale).patch(update_sale).delete(delete_sale),
        )
        .route("/sales/{sale_id}/items", post(add_item))
        .route(
            "/sales/{sale_id}/items/{item_id}",
            patch(update_item).delete(remove_item),
        )
}

/// Query parameters for listing sales or purchases.
#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    /// Customer (sales) or supplier (purchases).
    pub party_id: Option<Uuid>,
    /// `paid`, `partial` or `due`.
    pub status: Option<PaymentStatus>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// One line of a sale or purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    /// Product.
    pub product_id: Uuid,
    /// Quantity, up to 3 decimal places.
    pub quantity: Decimal,
    /// Price per unit; the product's price when omitted.
    pub unit_price: Option<Decimal>,
    /// Line discount.
    #[serde(default)]
    pub discount_amount: Decimal,
}

/// Changes to one line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// Quantity.
    pub quantity: Option<Decimal>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Line discount.
    pub discount_amount: Option<Decimal>,
}

/// Header changes on a sale or purchase; totals are recomputed after.
#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    /// Document date.
    pub date: Option<NaiveDate>,
    /// Document discount.
    pub discount_amount: Option<Decimal>,
    /// VAT.
    pub vat_amount: Option<Decimal>,
    /// Delivery charge.
    pub delivery_charge: Option<Decimal>,
    /// Note; `null` clears it.
    #[serde(default, deserialize_with = "super::nullable")]
    pub note: Option<Option<String>>,
}

/// Request body for creating a sale.
#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    /// Customer; omit for a walk-in sale, which must be paid in full.
    pub customer_id: Option<Uuid>,
    /// Sale date.
    pub sale_date: NaiveDate,
    /// Account receiving `paid_amount`.
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
    /// Cash paid at the counter.
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Customer advance to draw on.
    #[serde(default)]
    pub advance_used: Decimal,
    /// Free-form note.
    pub note: Option<String>,
}

impl From<ItemRequest> for SaleItemInput {
    fn from(item: ItemRequest) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount_amount: item.discount_amount,
        }
    }
}

async fn list_sales(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListDocumentsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<sales::Model>>> {
    let page = SaleRepository::new(state.conn())
        .list_sales(
            tenant.company_id(),
            SaleFilter {
                customer_id: query.party_id,
                status: query.status,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_sale(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateSaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleWithItems>)> {
    let sale = SaleRepository::new(state.conn())
        .create_sale(
            tenant.company_id(),
            CreateSaleInput {
                customer_id: body.customer_id,
                sale_date: body.sale_date,
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
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn get_sale(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, sale_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SaleWithItems>> {
    let sale = SaleRepository::new(state.conn())
        .get_sale(tenant.company_id(), sale_id)
        .await?;
    Ok(Json(sale))
}

async fn update_sale(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, sale_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<SaleWithItems>> {
    let sale = SaleRepository::new(state.conn())
        .update_sale(
            tenant.company_id(),
            sale_id,
            UpdateSaleInput {
                sale_date: body.date,
                discount_amount: body.discount_amount,
                vat_amount: body.vat_amount,
                delivery_charge: body.delivery_charge,
                note: body.note,
            },
        )
        .await?;
    Ok(Json(sale))
}

async fn delete_sale(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, sale_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    SaleRepository::new(state.conn())
        .delete_sale(tenant.company_id(), sale_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, sale_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ItemRequest>,
) -> ApiResult<(StatusCode, Json<SaleWithItems>)> {
    let sale = SaleRepository::new(state.conn())
        .add_item(tenant.company_id(), sale_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn update_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, sale_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateItemRequest>,
) -> ApiResult<Json<SaleWithItems>> {
    let sale = SaleRepository::new(state.conn())
        .update_item(
            tenant.company_id(),
            sale_id,
            item_id,
            UpdateSaleItemInput {
                quantity: body.quantity,
                unit_price: body.unit_price,
                discount_amount: body.discount_amount,
            },
        )
        .await?;
    Ok(Json(sale))
}

async fn remove_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, sale_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<SaleWithItems>> {
    let sale = SaleRepository::new(state.conn())
        .remove_item(tenant.company_id(), sale_id, item_id)
        .await?;
    Ok(Json(sale))
}
