//! Error to HTTP response mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hisab_db::RepositoryError;
use hisab_shared::AppError;
use serde_json::json;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Handler error rendered as `{"error": "<code>", "message": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code().to_ascii_lowercase(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "not_found")]
    #[case(AppError::Conflict("x".into()), StatusCode::CONFLICT, "conflict")]
    #[case(AppError::invalid("EMPTY_DOCUMENT", "x"), StatusCode::BAD_REQUEST, "empty_document")]
    #[case(
        AppError::rule("INSUFFICIENT_STOCK", "x"),
        StatusCode::UNPROCESSABLE_ENTITY,
        "insufficient_stock"
    )]
    #[tokio::test]
    async fn test_status_and_code(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["error"], code);
    }

    #[tokio::test]
    async fn test_database_error_message_is_masked() {
        let err = RepositoryError::Database(sea_orm::DbErr::Custom("password=hunter2".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "database_error");
        assert_eq!(body["message"], "An error occurred");
    }

    #[tokio::test]
    async fn test_not_found_keeps_entity_in_message() {
        let id = Uuid::nil();
        let response = ApiError::from(RepositoryError::not_found("Sale", id)).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], format!("Sale not found: {id}"));
    }
}
