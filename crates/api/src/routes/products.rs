//! Product and stock routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_db::{
    entities::products,
    repositories::{CreateProductInput, ProductFilter, ProductRepository, UpdateProductInput},
};

/// Creates the product routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{product_id}",
            get(get_product)
                .patch(update_product)
                .delete(deactivate_product),
        )
        .route("/products/{product_id}/adjust-stock", post(adjust_stock))
}

/// Query parameters for listing products.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    /// Name or SKU fragment.
    pub search: Option<String>,
    /// Filter by active status.
    pub active: Option<bool>,
    /// Only products at or below this stock level.
    pub low_stock: Option<Decimal>,
}

/// Request body for creating a product.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Display name.
    pub name: String,
    /// Stock keeping unit.
    pub sku: String,
    /// Unit of measure.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Default purchase price.
    #[serde(default)]
    pub purchase_price: Decimal,
    /// Default sale price.
    #[serde(default)]
    pub sale_price: Decimal,
    /// Opening stock.
    #[serde(default)]
    pub stock_quantity: Decimal,
}

fn default_unit() -> String {
    "pcs".to_string()
}

/// Request body for updating a product.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    /// Display name.
    pub name: Option<String>,
    /// Stock keeping unit.
    pub sku: Option<String>,
    /// Unit of measure.
    pub unit: Option<String>,
    /// Default purchase price.
    pub purchase_price: Option<Decimal>,
    /// Default sale price.
    pub sale_price: Option<Decimal>,
    /// Whether the product is active.
    pub is_active: Option<bool>,
}

/// Request body for a manual stock correction.
#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    /// Signed change; negative removes stock.
    pub delta: Decimal,
    /// Why the stock was corrected.
    pub reason: String,
}

async fn list_products(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListProductsQuery>,
) -> ApiResult<Json<Value>> {
    let products = ProductRepository::new(state.conn())
        .list_products(
            tenant.company_id(),
            ProductFilter {
                search: query.search,
                is_active: query.active,
                low_stock: query.low_stock,
            },
        )
        .await?;
    Ok(Json(json!({ "products": products })))
}

async fn create_product(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<products::Model>)> {
    let product = ProductRepository::new(state.conn())
        .create_product(
            tenant.company_id(),
            CreateProductInput {
                name: body.name,
                sku: body.sku,
                unit: body.unit,
                purchase_price: body.purchase_price,
                sale_price: body.sale_price,
                stock_quantity: body.stock_quantity,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<products::Model>> {
    let product = ProductRepository::new(state.conn())
        .get_product(tenant.company_id(), product_id)
        .await?;
    Ok(Json(product))
}

async fn update_product(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, product_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateProductRequest>,
) -> ApiResult<Json<products::Model>> {
    let product = ProductRepository::new(state.conn())
        .update_product(
            tenant.company_id(),
            product_id,
            UpdateProductInput {
                name: body.name,
                sku: body.sku,
                unit: body.unit,
                purchase_price: body.purchase_price,
                sale_price: body.sale_price,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(Json(product))
}

async fn deactivate_product(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<products::Model>> {
    let product = ProductRepository::new(state.conn())
        .deactivate_product(tenant.company_id(), product_id)
        .await?;
    Ok(Json(product))
}

async fn adjust_stock(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, product_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<AdjustStockRequest>,
) -> ApiResult<Json<products::Model>> {
    let product = ProductRepository::new(state.conn())
        .adjust_stock(tenant.company_id(), product_id, body.delta, &body.reason)
        .await?;
    Ok(Json(product))
}
