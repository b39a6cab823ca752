use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PosError {
    #[error("No receiving address available, try again shortly")]
    NoAddressAvailable,

    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Invalid report scope: {0}")]
    InvalidScope(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transaction log corrupted for {0}")]
    LogCorruption(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for PosError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            PosError::InvalidScope(_) | PosError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            PosError::NoAddressAvailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            PosError::RateUnavailable(_) | PosError::LedgerUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
