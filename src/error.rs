//! Error types for the onboarding service.

use std::time::Duration;

use crate::onboarding::model::Field;
use crate::onboarding::validate::ValidationErrors;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to an external collaborator.
///
/// These never reach the wizard: every gateway converts them into a
/// `GatewayResponse::failure` after logging the concrete cause.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to build HTTP client for {service}: {reason}")]
    Client { service: String, reason: String },

    #[error("Request to {service} failed: {reason}")]
    Transport { service: String, reason: String },

    #[error("Request to {service} timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    Decode { service: String, reason: String },
}

impl GatewayError {
    /// Classify a reqwest failure, separating timeouts from other transport errors.
    pub fn from_reqwest(service: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                service: service.to_string(),
                timeout,
            }
        } else if err.is_decode() {
            Self::Decode {
                service: service.to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::Transport {
                service: service.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Client { .. } | Self::Decode { .. } => false,
        }
    }
}

/// Wizard misuse by the host. Expected user mistakes are `ValidationErrors`,
/// not variants of this enum, except where an operation has to refuse.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: Field, reason: String },

    #[error("{field} is locked after successful verification")]
    FieldLocked { field: Field },

    #[error("A {kind} request is already in progress")]
    Busy { kind: String },

    #[error("Submission is only available on the review step (current step {step})")]
    NotAtReview { step: u8 },

    #[error("An email OTP has not been sent yet")]
    OtpNotSent,

    #[error("Response for {kind} arrived after the wizard moved on; ignored")]
    Stale { kind: String },

    #[error("Agent {agent_id} was already created; the form resets shortly")]
    AlreadySubmitted { agent_id: String },

    #[error("Record is missing {field}")]
    MissingField { field: Field },

    #[error("Validation failed: {0}")]
    Invalid(ValidationErrors),
}
