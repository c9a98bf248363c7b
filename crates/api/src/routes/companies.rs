//! Company (tenant) routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, error::ApiResult, extract::{Json, Path}};
use hisab_db::{
    CompanyRepository,
    entities::companies,
    repositories::{CreateCompanyInput, UpdateCompanyInput},
};

/// Creates the company routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list_companies).post(create_company))
        .route(
            "/companies/{company_id}",
            get(get_company).patch(update_company),
        )
}

/// Request body for creating a company.
#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    /// Display name.
    pub name: String,
    /// URL-safe unique slug.
    pub slug: String,
    /// Postal address.
    pub address: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
}

/// Request body for updating a company.
///
/// `address` and `phone` accept `null` to clear the value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    /// Display name.
    pub name: Option<String>,
    /// Postal address.
    #[serde(default, deserialize_with = "super::nullable")]
    pub address: Option<Option<String>>,
    /// Contact phone.
    #[serde(default, deserialize_with = "super::nullable")]
    pub phone: Option<Option<String>>,
    /// Whether the company is active.
    pub is_active: Option<bool>,
}

/// GET `/companies`
async fn list_companies(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let companies = CompanyRepository::new(state.conn()).list_companies().await?;
    Ok(Json(json!({ "companies": companies })))
}

/// POST `/companies`
async fn create_company(
    State(state): State<AppState>,
    Json(body): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<companies::Model>)> {
    let company = CompanyRepository::new(state.conn())
        .create_company(CreateCompanyInput {
            name: body.name,
            slug: body.slug,
            address: body.address,
            phone: body.phone,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET `/companies/{company_id}`
async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Json<companies::Model>> {
    let company = CompanyRepository::new(state.conn())
        .get_company(company_id)
        .await?;
    Ok(Json(company))
}

/// PATCH `/companies/{company_id}`
async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(body): Json<UpdateCompanyRequest>,
) -> ApiResult<Json<companies::Model>> {
    let company = CompanyRepository::new(state.conn())
        .update_company(
            company_id,
            UpdateCompanyInput {
                name: body.name,
                address: body.address,
                phone: body.phone,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(Json(company))
}
