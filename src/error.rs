use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Outcome classification for a single upstream call. Carries no upstream payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream rate limit reached")]
    RateLimited,

    #[error("upstream returned HTTP {0}")]
    HttpError(u16),

    #[error("upstream returned a malformed response")]
    MalformedResponse,

    #[error("network failure: {0}")]
    NetworkFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("invalid chart input: {0}")]
    InvalidInput(String),

    #[error("chart backend error: {0}")]
    Backend(String),

    #[error("png encoding failed: {0}")]
    Encode(String),

    #[error("chart font could not be loaded")]
    Font,
}

/// Request-level failure, mapped 1:1 onto an HTTP status and `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    NoDataAvailable(String),

    #[error("CoinGecko API request timed out. Please try again later.")]
    UpstreamTimeout,

    #[error("CoinGecko API rate limit exceeded. Please try again in a while.")]
    UpstreamRateLimited,

    #[error("CoinGecko API request failed with HTTP status {0}.")]
    UpstreamHttpError(u16),

    #[error("CoinGecko API returned an invalid data format.")]
    UpstreamMalformedResponse,

    #[error("CoinGecko API request failed: {0}")]
    UpstreamNetwork(String),

    #[error("chart rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::NoDataAvailable(_) => StatusCode::NOT_FOUND,
            Self::UpstreamTimeout
            | Self::UpstreamRateLimited
            | Self::UpstreamHttpError(_)
            | Self::UpstreamMalformedResponse
            | Self::UpstreamNetwork(_)
            | Self::Render(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout => Self::UpstreamTimeout,
            FetchError::RateLimited => Self::UpstreamRateLimited,
            FetchError::HttpError(status) => Self::UpstreamHttpError(status),
            FetchError::MalformedResponse => Self::UpstreamMalformedResponse,
            FetchError::NetworkFailure(detail) => Self::UpstreamNetwork(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, Self::Render(_) | Self::Internal(_)) {
            error!("{}", self);
        }

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
