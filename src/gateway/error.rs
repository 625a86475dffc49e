//! The RPC error taxonomy: `UNAUTHORIZED`, `FORBIDDEN`, `NOT_FOUND`,
//! `INTERNAL_SERVER_ERROR`, `UNKNOWN`. Only user errors and unrecoverable
//! storage errors short-circuit an RPC call this way; everything else is
//! embedded in the `thread.stream` event stream instead.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{memory::MemoryError, thread::CoordinatorError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("internal server error: {0}")]
    Internal(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "code": self.code(), "message": self.to_string() } });
        (self.status(), Json(body)).into_response()
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::NotFound => Self::NotFound,
            CoordinatorError::Forbidden => Self::Forbidden,
            CoordinatorError::Memory(inner) => Self::from(inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {e}"))
    }
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::Connection(_) | MemoryError::SchemaMissing(_) => Self::Internal(e.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_not_found_maps_to_api_not_found() {
        let err: ApiError = CoordinatorError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn coordinator_forbidden_maps_to_api_forbidden() {
        let err: ApiError = CoordinatorError::Forbidden.into();
        assert!(matches!(err, ApiError::Forbidden));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn response_body_carries_code_and_message() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_and_internal_have_distinct_codes() {
        assert_eq!(ApiError::Unauthorized.code(), "UNAUTHORIZED");
        assert_eq!(ApiError::Internal("boom".to_string()).code(), "INTERNAL_SERVER_ERROR");
    }
}
