//! External collaborators behind a uniform `{success, message}` result.
//!
//! Every implementation catches its own failures: a trait method never
//! returns an error, it returns `success: false` with a user-facing message
//! and logs the concrete cause.

pub mod directory;
pub mod submission;
pub mod verification;

pub use directory::HttpAgentDirectory;
pub use submission::{SubmissionGateway, SubmissionOutcome};
pub use verification::{HttpEmailVerifier, LocalPanVerifier};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::onboarding::model::{CreateAgentRequest, UpdatePasswordRequest};

/// Uniform result of every external call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub message: String,
}

impl GatewayResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Result of `create_agent`; `agent_id` is present on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAgentResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl CreateAgentResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            agent_id: None,
        }
    }
}

/// Agent directory: creates agents and sets their password.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Create an agent from a body forwarded as-is.
    async fn create_agent_json(&self, body: &serde_json::Value) -> CreateAgentResponse;

    async fn create_agent(&self, request: &CreateAgentRequest) -> CreateAgentResponse {
        match serde_json::to_value(request) {
            Ok(body) => self.create_agent_json(&body).await,
            Err(e) => {
                tracing::error!(error = %e, "Could not encode create-agent request");
                CreateAgentResponse::failure("Failed to create agent. Please try again.")
            }
        }
    }

    async fn update_password(&self, request: &UpdatePasswordRequest) -> GatewayResponse;
}

/// Email one-time-passcode channel.
#[async_trait]
pub trait EmailVerifier: Send + Sync {
    /// Send a passcode to `email`. A failure may be informational (e.g. the
    /// address is already verified); its message is meant for the user.
    async fn send_otp(&self, email: &str, display_name: &str) -> GatewayResponse;

    async fn verify_otp(&self, email: &str, otp: &str) -> GatewayResponse;
}

/// PAN check. The shipped implementation is a format check only.
#[async_trait]
pub trait PanVerifier: Send + Sync {
    async fn verify(&self, pan: &str) -> GatewayResponse;
}

/// Build a reqwest client with the configured per-request timeout.
pub(crate) fn http_client(service: &str, timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Client {
            service: service.to_string(),
            reason: e.to_string(),
        })
}

/// Log a gateway failure with its cause; the user only sees the generic message.
pub(crate) fn log_failure(operation: &str, err: &GatewayError) {
    tracing::error!(
        operation,
        retryable = err.is_retryable(),
        error = %err,
        "External call failed"
    );
}
