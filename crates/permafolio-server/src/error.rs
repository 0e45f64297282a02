use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use permafolio::error::ValidationError;
use permafolio::service::ServiceError;
use serde::Serialize;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Service(ServiceError::Validation(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Service(ServiceError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Service(ServiceError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Service(ServiceError::PriceUnavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PRICE_UNAVAILABLE")
            }
            ApiError::Service(ServiceError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = ?self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": ErrorBody { code, message } });
        (status, axum::Json(body)).into_response()
    }
}
