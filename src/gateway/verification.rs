//! Identity verification: email OTP over HTTP and a local PAN format check.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{EmailVerifier, GatewayResponse, PanVerifier, http_client, log_failure};
use crate::config::OnboardConfig;
use crate::error::GatewayError;
use crate::onboarding::validate::validate_pan;

const SERVICE: &str = "identity-verification";

#[derive(Debug, Serialize)]
struct UserData<'a> {
    name: &'a str,
    user_id: String,
}

#[derive(Debug, Serialize)]
struct SendOtpRequest<'a> {
    notification_channel: &'static str,
    notification_template_id: &'static str,
    user_data: UserData<'a>,
    recipients: Vec<&'a str>,
    verification_type: &'static str,
}

#[derive(Debug, Serialize)]
struct VerifyOtpRequest<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    message: Option<String>,
}

/// reqwest-backed email OTP channel.
pub struct HttpEmailVerifier {
    client: reqwest::Client,
    notification_url: String,
    timeout: Duration,
    strict_response: bool,
}

impl HttpEmailVerifier {
    pub fn new(config: &OnboardConfig) -> Result<Self, GatewayError> {
        Ok(Self::with_url(&config.notification_url, config.http_timeout)?
            .strict(config.strict_otp_response))
    }

    pub fn with_url(notification_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client(SERVICE, timeout)?,
            notification_url: notification_url.trim_end_matches('/').to_string(),
            timeout,
            strict_response: false,
        })
    }

    /// Require an explicit boolean `success` in OTP verification replies.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_response = strict;
        self
    }

    async fn try_send_otp(
        &self,
        email: &str,
        display_name: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = format!("{}/send_email_notifications", self.notification_url);
        let body = SendOtpRequest {
            notification_channel: "email_notification",
            notification_template_id: "email_verification",
            user_data: UserData {
                name: display_name,
                user_id: chrono::Utc::now().timestamp_millis().to_string(),
            },
            recipients: vec![email],
            verification_type: "normal",
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, self.timeout, e))?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            // The service explains rejections (e.g. already verified); show that text as-is.
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorReply>(&text)
                .ok()
                .and_then(|r| r.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Bad Request".to_string());
            info!(message = %message, "OTP send rejected by verification service");
            return Ok(GatewayResponse::failure(message));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(GatewayResponse::ok("OTP sent to your email successfully"))
    }

    async fn try_verify_otp(&self, email: &str, otp: &str) -> Result<GatewayResponse, GatewayError> {
        let url = format!("{}/verify_email_otp", self.notification_url);
        let resp = self
            .client
            .post(&url)
            .json(&VerifyOtpRequest { email, otp })
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, self.timeout, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let reply: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, self.timeout, e))?;
        Ok(self.interpret_verify_reply(&reply))
    }

    /// Map a verification reply to a result.
    ///
    /// Only an explicit `success: false` is a rejection unless strict mode is
    /// on; replies without a boolean `success` are logged either way.
    fn interpret_verify_reply(&self, reply: &serde_json::Value) -> GatewayResponse {
        let message = reply
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.trim().is_empty());

        match reply.get("success").and_then(|s| s.as_bool()) {
            Some(true) => GatewayResponse::ok("Email verified successfully"),
            Some(false) => GatewayResponse::failure(
                message.unwrap_or("Invalid OTP. Please try again."),
            ),
            None => {
                warn!(
                    strict = self.strict_response,
                    reply = %reply,
                    "OTP verification reply has no boolean success field"
                );
                if self.strict_response {
                    GatewayResponse::failure("Failed to verify OTP. Please try again.")
                } else {
                    GatewayResponse::ok("Email verified successfully")
                }
            }
        }
    }
}

#[async_trait]
impl EmailVerifier for HttpEmailVerifier {
    async fn send_otp(&self, email: &str, display_name: &str) -> GatewayResponse {
        match self.try_send_otp(email, display_name).await {
            Ok(response) => response,
            Err(e) => {
                log_failure("send_email_notifications", &e);
                GatewayResponse::failure("Failed to send OTP. Please try again.")
            }
        }
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> GatewayResponse {
        match self.try_verify_otp(email, otp).await {
            Ok(response) => response,
            Err(e) => {
                log_failure("verify_email_otp", &e);
                GatewayResponse::failure("Failed to verify OTP. Please try again.")
            }
        }
    }
}

/// PAN format check with optional artificial latency.
#[derive(Debug, Clone, Default)]
pub struct LocalPanVerifier {
    latency: Duration,
}

impl LocalPanVerifier {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl PanVerifier for LocalPanVerifier {
    async fn verify(&self, pan: &str) -> GatewayResponse {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match validate_pan(pan) {
            Ok(()) => {
                debug!("PAN format accepted");
                GatewayResponse::ok("PAN verified successfully")
            }
            Err(_) => GatewayResponse::failure("Invalid PAN format"),
        }
    }
}
