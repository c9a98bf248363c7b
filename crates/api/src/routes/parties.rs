//! Customer and supplier routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, error::ApiResult, extract::{Json, Path, Query}, middleware::Tenant};
use hisab_core::settlement::AdvanceSync;
use hisab_db::{
    entities::{customers, suppliers},
    repositories::{
        CreatePartyInput, CustomerRepository, DueSummary, PartyFilter, SupplierRepository,
        UpdatePartyInput,
    },
};

/// Creates the customer and supplier routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/{customer_id}",
            get(get_customer)
                .patch(update_customer)
                .delete(deactivate_customer),
        )
        .route("/customers/{customer_id}/due", get(customer_due))
        .route(
            "/customers/{customer_id}/sync-advance",
            post(sync_customer_advance),
        )
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/{supplier_id}",
            get(get_supplier)
                .patch(update_supplier)
                .delete(deactivate_supplier),
        )
        .route("/suppliers/{supplier_id}/due", get(supplier_due))
        .route(
            "/suppliers/{supplier_id}/sync-advance",
            post(sync_supplier_advance),
        )
}

/// Query parameters for listing parties.
#[derive(Debug, Deserialize)]
pub struct ListPartiesQuery {
    /// Name fragment.
    pub search: Option<String>,
    /// Filter by active status.
    pub active: Option<bool>,
}

impl From<ListPartiesQuery> for PartyFilter {
    fn from(query: ListPartiesQuery) -> Self {
        Self {
            search: query.search,
            is_active: query.active,
        }
    }
}

/// Request body for creating a customer or supplier.
#[derive(Debug, Deserialize)]
pub struct CreatePartyRequest {
    /// Display name.
    pub name: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Postal address.
    pub address: Option<String>,
}

impl From<CreatePartyRequest> for CreatePartyInput {
    fn from(body: CreatePartyRequest) -> Self {
        Self {
            name: body.name,
            phone: body.phone,
            email: body.email,
            address: body.address,
        }
    }
}

/// Request body for updating a customer or supplier.
#[derive(Debug, Deserialize)]
pub struct UpdatePartyRequest {
    /// Display name.
    pub name: Option<String>,
    /// Contact phone.
    #[serde(default, deserialize_with = "super::nullable")]
    pub phone: Option<Option<String>>,
    /// Contact email.
    #[serde(default, deserialize_with = "super::nullable")]
    pub email: Option<Option<String>>,
    /// Postal address.
    #[serde(default, deserialize_with = "super::nullable")]
    pub address: Option<Option<String>>,
    /// Whether the party is active.
    pub is_active: Option<bool>,
}

impl From<UpdatePartyRequest> for UpdatePartyInput {
    fn from(body: UpdatePartyRequest) -> Self {
        Self {
            name: body.name,
            phone: body.phone,
            email: body.email,
            address: body.address,
            is_active: body.is_active,
        }
    }
}

// ============================================================================
// Customers
// ============================================================================

async fn list_customers(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListPartiesQuery>,
) -> ApiResult<Json<Value>> {
    let customers = CustomerRepository::new(state.conn())
        .list_customers(tenant.company_id(), query.into())
        .await?;
    Ok(Json(json!({ "customers": customers })))
}

async fn create_customer(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreatePartyRequest>,
) -> ApiResult<(StatusCode, Json<customers::Model>)> {
    let customer = CustomerRepository::new(state.conn())
        .create_customer(tenant.company_id(), body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, customer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<customers::Model>> {
    let customer = CustomerRepository::new(state.conn())
        .get_customer(tenant.company_id(), customer_id)
        .await?;
    Ok(Json(customer))
}

async fn update_customer(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, customer_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdatePartyRequest>,
) -> ApiResult<Json<customers::Model>> {
    let customer = CustomerRepository::new(state.conn())
        .update_customer(tenant.company_id(), customer_id, body.into())
        .await?;
    Ok(Json(customer))
}

async fn deactivate_customer(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, customer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<customers::Model>> {
    let customer = CustomerRepository::new(state.conn())
        .deactivate_customer(tenant.company_id(), customer_id)
        .await?;
    Ok(Json(customer))
}

async fn customer_due(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, customer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DueSummary>> {
    let summary = CustomerRepository::new(state.conn())
        .due_summary(tenant.company_id(), customer_id)
        .await?;
    Ok(Json(summary))
}

async fn sync_customer_advance(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, customer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<AdvanceSync>> {
    let sync = CustomerRepository::new(state.conn())
        .sync_advance_balance(tenant.company_id(), customer_id)
        .await?;
    Ok(Json(sync))
}

// ============================================================================
// Suppliers
// ============================================================================

async fn list_suppliers(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListPartiesQuery>,
) -> ApiResult<Json<Value>> {
    let suppliers = SupplierRepository::new(state.conn())
        .list_suppliers(tenant.company_id(), query.into())
        .await?;
    Ok(Json(json!({ "suppliers": suppliers })))
}

async fn create_supplier(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreatePartyRequest>,
) -> ApiResult<(StatusCode, Json<suppliers::Model>)> {
    let supplier = SupplierRepository::new(state.conn())
        .create_supplier(tenant.company_id(), body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn get_supplier(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, supplier_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<suppliers::Model>> {
    let supplier = SupplierRepository::new(state.conn())
        .get_supplier(tenant.company_id(), supplier_id)
        .await?;
    Ok(Json(supplier))
}

async fn update_supplier(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, supplier_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdatePartyRequest>,
) -> ApiResult<Json<suppliers::Model>> {
    let supplier = SupplierRepository::new(state.conn())
        .update_supplier(tenant.company_id(), supplier_id, body.into())
        .await?;
    Ok(Json(supplier))
}

async fn deactivate_supplier(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, supplier_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<suppliers::Model>> {
    let supplier = SupplierRepository::new(state.conn())
        .deactivate_supplier(tenant.company_id(), supplier_id)
        .await?;
    Ok(Json(supplier))
}

async fn supplier_due(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, supplier_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DueSummary>> {
    let summary = SupplierRepository::new(state.conn())
        .due_summary(tenant.company_id(), supplier_id)
        .await?;
    Ok(Json(summary))
}

async fn sync_supplier_advance(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, supplier_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<AdvanceSync>> {
    let sync = SupplierRepository::new(state.conn())
        .sync_advance_balance(tenant.company_id(), supplier_id)
        .await?;
    Ok(Json(sync))
}
