use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::DomainError;

pub type ApiResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotFound => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden => StatusCode::FORBIDDEN,
            DomainError::External(_) => StatusCode::BAD_GATEWAY,
            DomainError::Database(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            DomainError::NotFound => "Not found".to_string(),
            DomainError::Validation(msg)
            | DomainError::Conflict(msg)
            | DomainError::Unauthorized(msg) => msg.clone(),
            DomainError::Forbidden => "Forbidden".to_string(),
            DomainError::External(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                "Upstream service error".to_string()
            }
            DomainError::Database(msg) | DomainError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_error_kind_has_its_status() {
        assert_eq!(DomainError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            DomainError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(DomainError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            DomainError::External("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DomainError::Database("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
