//! Mapping of service failures to HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use odpady_core::{ServiceError, UnknownFormat};

use crate::models::ErrorBody;

#[derive(thiserror::Error, Debug)]
/// Error returned by every handler; rendered as `{ "error": <text> }`.
pub enum ApiError {
    /// Failure reported by the report service.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Request body is not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    /// Path segment does not parse as the expected type.
    #[error("Invalid request path: {0}")]
    InvalidPath(String),
    /// Download requested in an unsupported format.
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormat),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_))
            | Self::InvalidBody(_)
            | Self::InvalidPath(_)
            | Self::UnknownFormat(_) => StatusCode::BAD_REQUEST,
            Self::Service(ServiceError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            Self::Service(ServiceError::MunicipalityNotFound | ServiceError::ReportNotFound) => {
                StatusCode::NOT_FOUND
            }
            Self::Service(ServiceError::InvalidData(_) | ServiceError::Upstream(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Request failed: {self}");
            "Failed to process the report request".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody { error: message })
    }
}

#[cfg(test)]
mod tests {
    use odpady_core::{PortError, ValidationError};

    use super::*;

    #[test]
    fn maps_error_classes_to_statuses() {
        let cases = [
            (
                ApiError::from(ServiceError::Validation(ValidationError::QuarterOutOfRange(5))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidBody("expected value".to_owned()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidPath("can not parse \"abc\" to a i64".to_owned()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(UnknownFormat("pdf".to_owned())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(ServiceError::Unauthenticated),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(ServiceError::MunicipalityNotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(ServiceError::ReportNotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(ServiceError::Upstream(PortError::Network("down".to_owned()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }
}
