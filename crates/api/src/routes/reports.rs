//! Report routes. Account statements live with the account routes.

use axum::{
    Router,
    extract::State,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppState, error::ApiResult, extract::{Json, Query}, middleware::Tenant};
use hisab_db::repositories::{Dashboard, ReportRepository};

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/reports/dashboard", get(dashboard))
}

/// Date range for period totals.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// GET `/companies/{company_id}/reports/dashboard`
///
/// Receivables, payables and cash position ignore the range.
async fn dashboard(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Dashboard>> {
    let dashboard = ReportRepository::new(state.conn())
        .dashboard(tenant.company_id(), query.from, query.to)
        .await?;
    Ok(Json(dashboard))
}
