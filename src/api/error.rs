use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::catalog::CatalogError;
use crate::orders::UpstreamError;

/// Error returned by every handler; rendered as `{"error": ..., "code": ...}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    PaymentDeclined(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::InsufficientStock(_) => "insufficient_stock",
            ApiError::PaymentDeclined(_) => "payment_declined",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound(_) => ApiError::NotFound(message),
            CatalogError::InvalidQuantity(_) | CatalogError::InvalidQuery(_) => {
                ApiError::BadRequest(message)
            }
            CatalogError::InsufficientStock { .. } => ApiError::InsufficientStock(message),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(format!("Invalid path: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Rejected {
                status,
                code,
                message,
            } => match status {
                400 if code.as_deref() == Some("insufficient_stock") => {
                    ApiError::InsufficientStock(message)
                }
                400 => ApiError::BadRequest(message),
                402 => ApiError::PaymentDeclined(message),
                404 => ApiError::NotFound(message),
                429 => ApiError::TooManyRequests(message),
                503 => ApiError::ServiceUnavailable(message),
                _ => ApiError::BadGateway(message),
            },
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_mapping() {
        let err: ApiError = CatalogError::NotFound(42).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Product 42 not found");

        let err: ApiError = CatalogError::InsufficientStock {
            product_id: 3,
            requested: 1000,
            available: 120,
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "insufficient_stock");
    }

    #[test]
    fn test_upstream_error_mapping() {
        let rejected = |status| UpstreamError::Rejected {
            status,
            code: None,
            message: "upstream said no".to_string(),
        };

        assert_eq!(ApiError::from(rejected(402)).status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(ApiError::from(rejected(429)).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::from(rejected(500)).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::from(rejected(404)).to_string(), "upstream said no");
        assert_eq!(ApiError::from(rejected(400)).code(), "bad_request");

        let out_of_stock = ApiError::from(UpstreamError::Rejected {
            status: 400,
            code: Some("insufficient_stock".to_string()),
            message: "Insufficient stock".to_string(),
        });
        assert_eq!(out_of_stock.status(), StatusCode::BAD_REQUEST);
        assert_eq!(out_of_stock.code(), "insufficient_stock");

        let err = ApiError::from(UpstreamError::Unreachable("connection refused".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "bad_gateway");
    }
}
