//! Error types for the faucet service

use crate::api::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid captcha")]
    InvalidCaptcha,

    #[error("Captcha provider error: {0}")]
    CaptchaProvider(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("You have enough tokens in your account")]
    AlreadyFunded,

    #[error("Balance query failed: {0}")]
    BalanceQuery(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Unable to determine client address")]
    MissingPeerAddress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FaucetError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::InvalidAddress(_)
            | FaucetError::InvalidCaptcha
            | FaucetError::AlreadyFunded
            | FaucetError::BalanceQuery(_) => StatusCode::BAD_REQUEST,
            FaucetError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            FaucetError::CaptchaProvider(_)
            | FaucetError::Command(_)
            | FaucetError::MissingPeerAddress
            | FaucetError::Config(_)
            | FaucetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code placed in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            FaucetError::InvalidAddress(_) => "INVALID_ADDRESS",
            FaucetError::InvalidCaptcha => "INVALID_CAPTCHA",
            FaucetError::CaptchaProvider(_) => "CAPTCHA_PROVIDER_ERROR",
            FaucetError::RateLimited => "RATE_LIMITED",
            FaucetError::AlreadyFunded => "ALREADY_FUNDED",
            FaucetError::BalanceQuery(_) => "BALANCE_QUERY_FAILED",
            FaucetError::Command(_) => "COMMAND_FAILED",
            FaucetError::MissingPeerAddress => "MISSING_PEER_ADDRESS",
            FaucetError::Config(_) => "CONFIG_ERROR",
            FaucetError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::new(
            self.to_string(),
            serde_json::Value::String(self.code().to_string()),
        ));

        (status, body).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
