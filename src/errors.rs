use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::quantity::QuantityError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// JSON body returned with every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "error": "Insufficient stock: available 12, requested 30",
    "code": "insufficient_stock",
    "details": { "available": "12", "requested": "30" },
    "requestId": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Human-readable error description
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    /// Structured context: field errors, missing ids, stock figures
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Products not found: {}", join_ids(.0))]
    MissingProducts(Vec<Uuid>),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: Uuid,
        location_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<QuantityError> for ServiceError {
    fn from(err: QuantityError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) | Self::MissingProducts(_) => StatusCode::NOT_FOUND,
            Self::Validation(_)
            | Self::ValidationError(_)
            | Self::InvalidInput(_)
            | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Stable machine-readable code, also used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::MissingProducts(_) => "missing_products",
            Self::Validation(_) | Self::ValidationError(_) => "validation_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidOperation(_) => "invalid_operation",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Persistence failures return a generic message; the cause is only logged.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Validation(errors) => serde_json::to_value(errors).ok(),
            Self::MissingProducts(ids) => Some(json!({ "missing": ids })),
            Self::InsufficientStock {
                product_id,
                location_id,
                available,
                requested,
            } => Some(json!({
                "productId": product_id,
                "locationId": location_id,
                "available": available,
                "requested": requested,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.response_message(),
            code: self.code().to_string(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
