use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    auth::AuthError, claude_api::ClaudeApiError, performance::PerformanceError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Performance(#[from] PerformanceError),
    #[error(transparent)]
    Claude(#[from] ClaudeApiError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid PIN")]
    InvalidCredentials,
    #[error("AI features are not configured")]
    AiUnavailable,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => match e {
                AuthError::Unauthorized => StatusCode::FORBIDDEN,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::PinInUse | AuthError::EmailInUse => StatusCode::CONFLICT,
                AuthError::MalformedPin | AuthError::CannotDeleteSelf => StatusCode::BAD_REQUEST,
                AuthError::Database(_) | AuthError::PinSpaceExhausted => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Performance(e) => match e {
                PerformanceError::ScoreOutOfRange | PerformanceError::InvalidMonth => {
                    StatusCode::BAD_REQUEST
                }
                PerformanceError::WeekNotFound => StatusCode::NOT_FOUND,
                PerformanceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Claude(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body: ApiResponse<()> = ApiResponse::error(self.to_string());
        (status, Json(body)).into_response()
    }
}
