//! Company scoping for tenant routes.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequestParts, Path, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::{AppState, error::ApiError};
use hisab_db::CompanyRepository;

/// Verified company the request is scoped to.
#[derive(Debug, Clone, Copy)]
pub struct Tenant {
    company_id: Uuid,
}

impl Tenant {
    /// Returns the company ID.
    #[must_use]
    pub const fn company_id(&self) -> Uuid {
        self.company_id
    }
}

fn reject(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

/// Resolves `{company_id}` from the path and checks the company is active.
///
/// On success the [`Tenant`] is stored in request extensions for handlers.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(company_id) = params
        .get("company_id")
        .and_then(|raw| Uuid::parse_str(raw).ok())
    else {
        return reject(
            StatusCode::BAD_REQUEST,
            "invalid_company_id",
            "Company ID must be a UUID",
        );
    };

    let company = match CompanyRepository::new(state.conn())
        .get_company(company_id)
        .await
    {
        Ok(company) => company,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if !company.is_active {
        debug!(company_id = %company_id, "Request to inactive company");
        return reject(
            StatusCode::FORBIDDEN,
            "company_inactive",
            "Company is inactive",
        );
    }

    request.extensions_mut().insert(Tenant { company_id });
    next.run(request).await
}

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().copied().ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "Route is not company scoped"
                })),
            )
        })
    }
}
