//! Money receipt and supplier payment routes.

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
    entities::{money_receipts, supplier_payments},
    repositories::{
        CreateMoneyReceiptInput, CreateSupplierPaymentInput, MoneyReceiptFilter,
        MoneyReceiptRepository, MoneyReceiptWithAllocations, SupplierPaymentFilter,
        SupplierPaymentRepository, SupplierPaymentWithAllocations,
    },
};
use hisab_shared::types::PageResponse;

/// Creates the receipt and payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/money-receipts", get(list_receipts).post(create_receipt))
        .route(
            "/money-receipts/{receipt_id}",
            get(get_receipt).delete(delete_receipt),
        )
        .route(
            "/supplier-payments",
            get(list_payments).post(create_payment),
        )
        .route(
            "/supplier-payments/{payment_id}",
            get(get_payment).delete(delete_payment),
        )
}

/// Query parameters for listing receipts or payments.
#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    /// Customer (receipts) or supplier (payments).
    pub party_id: Option<Uuid>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
}

/// Request body for a money receipt.
#[derive(Debug, Deserialize)]
pub struct CreateReceiptRequest {
    /// Paying customer.
    pub customer_id: Uuid,
    /// Account receiving the money.
    pub account_id: Uuid,
    /// Sale to settle; oldest open sales first when omitted.
    pub sale_id: Option<Uuid>,
    /// Positive amount.
    pub amount: Decimal,
    /// Receipt date.
    pub receipt_date: NaiveDate,
    /// Free-form note.
    pub note: Option<String>,
}

/// Request body for a supplier payment.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Supplier being paid.
    pub supplier_id: Uuid,
    /// Account the money leaves.
    pub account_id: Uuid,
    /// Purchase to settle; oldest open purchases first when omitted.
    pub purchase_id: Option<Uuid>,
    /// Positive amount.
    pub amount: Decimal,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Free-form note.
    pub note: Option<String>,
}

async fn list_receipts(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListPaymentsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<money_receipts::Model>>> {
    let page = MoneyReceiptRepository::new(state.conn())
        .list_receipts(
            tenant.company_id(),
            MoneyReceiptFilter {
                customer_id: query.party_id,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_receipt(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreateReceiptRequest>,
) -> ApiResult<(StatusCode, Json<MoneyReceiptWithAllocations>)> {
    let receipt = MoneyReceiptRepository::new(state.conn())
        .create_receipt(
            tenant.company_id(),
            CreateMoneyReceiptInput {
                customer_id: body.customer_id,
                account_id: body.account_id,
                sale_id: body.sale_id,
                amount: body.amount,
                receipt_date: body.receipt_date,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_receipt(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, receipt_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MoneyReceiptWithAllocations>> {
    let receipt = MoneyReceiptRepository::new(state.conn())
        .get_receipt(tenant.company_id(), receipt_id)
        .await?;
    Ok(Json(receipt))
}

async fn delete_receipt(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, receipt_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    MoneyReceiptRepository::new(state.conn())
        .delete_receipt(tenant.company_id(), receipt_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_payments(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListPaymentsQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<supplier_payments::Model>>> {
    let page = SupplierPaymentRepository::new(state.conn())
        .list_payments(
            tenant.company_id(),
            SupplierPaymentFilter {
                supplier_id: query.party_id,
                date_from: query.from,
                date_to: query.to,
            },
            &page.to_request(),
        )
        .await?;
    Ok(Json(page))
}

async fn create_payment(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(body): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<SupplierPaymentWithAllocations>)> {
    let payment = SupplierPaymentRepository::new(state.conn())
        .create_payment(
            tenant.company_id(),
            CreateSupplierPaymentInput {
                supplier_id: body.supplier_id,
                account_id: body.account_id,
                purchase_id: body.purchase_id,
                amount: body.amount,
                payment_date: body.payment_date,
                note: body.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, payment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SupplierPaymentWithAllocations>> {
    let payment = SupplierPaymentRepository::new(state.conn())
        .get_payment(tenant.company_id(), payment_id)
        .await?;
    Ok(Json(payment))
}

async fn delete_payment(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((_, payment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    SupplierPaymentRepository::new(state.conn())
        .delete_payment(tenant.company_id(), payment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
