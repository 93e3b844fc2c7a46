use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("seats unavailable: {seat_ids:?}")]
    SeatUnavailable { seat_ids: Vec<i64> },

    #[error("seat locks missing or expired: {seat_ids:?}")]
    LockExpired { seat_ids: Vec<i64> },

    #[error("schedule unavailable: {0}")]
    ScheduleUnavailable(String),

    #[error("unknown payment: {0}")]
    UnknownPayment(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("payment provider error: {0}")]
    Payment(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limited: {0}")]
    RateLimited(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::SeatUnavailable { .. } => "seat_unavailable",
            AppError::LockExpired { .. } => "lock_expired",
            AppError::ScheduleUnavailable(_) => "schedule_unavailable",
            AppError::UnknownPayment(_) => "unknown_payment",
            AppError::Storage(_) => "storage_error",
            AppError::Payment(_) => "payment_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::RateLimited(_) => "rate_limited",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::SeatUnavailable { .. }
                | AppError::LockExpired { .. }
                | AppError::Storage(_)
                | AppError::RateLimited(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SeatUnavailable { .. } => StatusCode::CONFLICT,
            AppError::LockExpired { .. } => StatusCode::CONFLICT,
            AppError::ScheduleUnavailable(_) => StatusCode::GONE,
            AppError::UnknownPayment(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        };

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        });
        match &self {
            AppError::SeatUnavailable { seat_ids } | AppError::LockExpired { seat_ids } => {
                body["seat_ids"] = serde_json::json!(seat_ids);
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "storage failure");
            }
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}
