use axum::{
    Json,
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use compute::ComputeError;
use sea_orm::{DbErr, SqlErr};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, warn};
use validator::{Validate, ValidationErrors};

use crate::schemas::ErrorResponse;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The detail is logged, never returned to the client.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Persistence(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        } else {
            warn!(code = self.code(), "{}", self);
        }

        let body = ErrorResponse {
            message: self.client_message(),
            code: self.code().to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Validation(message) => ApiError::Validation(message),
            ComputeError::NotFound(message) => ApiError::NotFound(message),
            ComputeError::Conflict(message) => ApiError::Conflict(message),
            ComputeError::Database(db_err) => db_err.into(),
            ComputeError::Serialization(e) => ApiError::Persistence(e.to_string()),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ApiError::Conflict("A record with the same unique value already exists".to_string())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ApiError::Validation("A referenced record does not exist".to_string())
            }
            _ => ApiError::Persistence(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// JSON body extractor that reports malformed bodies and failed field
/// validation as [`ApiError::Validation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        let cases = [
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ApiError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (
                ApiError::Persistence("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_persistence_detail_is_hidden() {
        let err = ApiError::Persistence("disk I/O error at /var/lib".into());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_compute_errors_map_to_api_errors() {
        let err: ApiError = ComputeError::Conflict("stale".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = ComputeError::Validation("range".into()).into();
        assert!(matches!(err, ApiError::Validation(_)));

        let err: ApiError = ComputeError::Database(DbErr::Custom("boom".into())).into();
        assert!(matches!(err, ApiError::Persistence(_)));
    }
}
