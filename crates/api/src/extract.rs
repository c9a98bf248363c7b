//! Extractors that reject with the API error body instead of plain text.
//!
//! Drop-in replacements for `axum::Json`, `Query` and `Path`. A malformed
//! request gets the same `{"error", "message"}` shape as a handler error.

use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
};
use hisab_shared::AppError;

use crate::error::ApiError;

/// JSON request body and response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        Self(match rejection {
            // Well-formed JSON that does not fit the request type.
            JsonRejection::JsonDataError(_) => AppError::rule("INVALID_BODY", message),
            JsonRejection::MissingJsonContentType(_) => {
                AppError::invalid("MISSING_JSON_CONTENT_TYPE", message)
            }
            _ => AppError::invalid("MALFORMED_JSON", message),
        })
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::invalid("INVALID_QUERY", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(AppError::invalid("INVALID_PATH", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use rstest::rstest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        #[allow(dead_code)]
        name: String,
    }

    async fn reject(content_type: &str, body: &'static str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let err = Json::<Named>::from_request(request, &()).await.unwrap_err();
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case::wrong_shape("application/json", r#"{"nom": "x"}"#, StatusCode::UNPROCESSABLE_ENTITY, "invalid_body")]
    #[case::broken_json("application/json", r#"{"name": "#, StatusCode::BAD_REQUEST, "malformed_json")]
    #[case::not_json("text/plain", r#"{"name": "x"}"#, StatusCode::BAD_REQUEST, "missing_json_content_type")]
    #[tokio::test]
    async fn test_json_rejection_uses_error_body(
        #[case] content_type: &str,
        #[case] body: &'static str,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (actual, json) = reject(content_type, body).await;
        assert_eq!(actual, status);
        assert_eq!(json["error"], code);
        assert!(json["message"].is_string());
    }
}
