use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{payments::PaymentError, repository::RepoError};

/// ErrorResponse
///
/// The JSON body returned for every rejected request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// ApiError
///
/// Every failure a handler or the auth extractor can surface. Each variant maps to
/// exactly one status code in `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `Authorization: Bearer ...` header on a protected route.
    #[error("unauthorized access")]
    MissingToken,

    /// The bearer token failed signature or expiry verification.
    #[error("forbidden access")]
    InvalidToken,

    /// `GET /order?customer=` asked for someone else's orders.
    #[error("access denied: customer does not match token")]
    CustomerMismatch,

    #[error("{0}")]
    BadRequest(String),

    /// The request body was not the JSON the route expects.
    #[error("{}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    #[error("{}", .0.body_text())]
    InvalidPath(#[from] PathRejection),

    #[error("{}", .0.body_text())]
    InvalidQuery(#[from] QueryRejection),

    #[error("failed to issue token")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("database error")]
    Repository(#[from] RepoError),

    #[error("payment processor error")]
    Payment(#[from] PaymentError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken | ApiError::CustomerMismatch => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(rejection) => rejection.status(),
            ApiError::InvalidPath(rejection) => rejection.status(),
            ApiError::InvalidQuery(rejection) => rejection.status(),
            ApiError::Token(_) | ApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 5xx bodies carry only the generic message; the underlying source is logged here.
        match &self {
            ApiError::Token(e) => tracing::error!(error = %e, "token signing failed"),
            ApiError::Repository(e) => tracing::error!(error = %e, "repository failure"),
            ApiError::Payment(e) => tracing::error!(error = %e, "payment processor failure"),
            other => tracing::warn!(status = status.as_u16(), "request rejected: {}", other),
        }

        let body = ErrorResponse {
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
