//! Captcha verification

use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Confirms a captcha response token for a client
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `Ok(false)` is a rejected token; `Err` means the provider could not be asked.
    async fn verify(&self, remote_ip: &str, response: &str) -> FaucetResult<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA `siteverify` client
pub struct RecaptchaVerifier {
    secret: String,
    endpoint: String,
    client: reqwest::Client,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>) -> FaucetResult<Self> {
        Self::with_endpoint(secret, RECAPTCHA_VERIFY_URL)
    }

    pub fn with_endpoint(secret: impl Into<String>, endpoint: impl Into<String>) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FaucetError::Internal(format!("http client: {}", e)))?;

        Ok(Self {
            secret: secret.into(),
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, remote_ip: &str, response: &str) -> FaucetResult<bool> {
        let params = [
            ("secret", self.secret.as_str()),
            ("response", response),
            ("remoteip", remote_ip),
        ];

        let reply: SiteVerifyResponse = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| FaucetError::CaptchaProvider(format!("request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| FaucetError::CaptchaProvider(format!("invalid response: {}", e)))?;

        if !reply.success {
            debug!("Captcha rejected for {}: {:?}", remote_ip, reply.error_codes);
        }
        Ok(reply.success)
    }
}
