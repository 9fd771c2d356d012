//! Error taxonomy shared by all API handlers.
//!
//! Auth failures never crash the process; every variant maps to a structured
//! JSON error response. `Internal` details are logged server-side and never
//! leak into the response body.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired, or signature-invalid token, or a token
    /// whose user no longer resolves to a live account.
    #[error("Please authenticate properly")]
    Unauthenticated,
    /// Valid identity, insufficient role.
    #[error("Admin access required")]
    Forbidden,
    /// Malformed payload, recoverable by the caller.
    #[error("{0}")]
    Validation(String),
    /// Duplicate resource, surfaced as 400 like validation failures.
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Persistence or signing failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("product").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_keeps_wire_messages() {
        assert_eq!(
            ApiError::Unauthenticated.to_string(),
            "Please authenticate properly"
        );
        assert_eq!(ApiError::Forbidden.to_string(), "Admin access required");
        assert_eq!(ApiError::NotFound("product").to_string(), "product not found");
    }
}
