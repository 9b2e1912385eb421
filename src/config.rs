//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Deployment stage used when none is configured.
pub const DEFAULT_STAGE: &str = "dev";

/// Service endpoints and wizard timing, built from environment variables.
#[derive(Debug, Clone)]
pub struct OnboardConfig {
    /// Deployment stage identifier, e.g. "dev" or "prod".
    pub stage: String,
    /// Base URL of the agent directory (hosts `create_agent`).
    pub directory_url: String,
    /// Base URL of the notification service (OTP endpoints and `agent_update_password`).
    pub notification_url: String,
    /// Client-side timeout for every outbound request.
    pub http_timeout: Duration,
    /// How long a successful submission stays on screen before the record resets.
    pub reset_delay: Duration,
    /// Artificial latency of the local PAN format check.
    pub pan_latency: Duration,
    /// Treat an OTP verification response without a boolean `success` as a failure.
    pub strict_otp_response: bool,
    /// Port for the HTTP server.
    pub port: u16,
}

impl Default for OnboardConfig {
    fn default() -> Self {
        Self::for_stage(DEFAULT_STAGE)
    }
}

impl OnboardConfig {
    /// Default endpoints for a deployment stage.
    pub fn for_stage(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            directory_url: format!("https://los-{stage}.dailype.in"),
            notification_url: format!("https://notification-{stage}.dailype.in"),
            http_timeout: Duration::from_secs(15),
            reset_delay: Duration::from_millis(3000),
            pan_latency: Duration::ZERO,
            strict_otp_response: false,
            port: 8080,
        }
    }

    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stage = lookup("ONBOARD_STAGE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string());

        let mut config = Self::for_stage(&stage);

        if let Some(url) = lookup("ONBOARD_DIRECTORY_URL") {
            config.directory_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("ONBOARD_NOTIFICATION_URL") {
            config.notification_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ONBOARD_HTTP_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "ONBOARD_HTTP_TIMEOUT_SECS".to_string(),
                    message: "timeout must be at least one second".to_string(),
                });
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ONBOARD_RESET_DELAY_MS")? {
            config.reset_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ONBOARD_PAN_LATENCY_MS")? {
            config.pan_latency = Duration::from_millis(ms);
        }
        if let Some(strict) = parse_var::<bool, _>(&lookup, "ONBOARD_STRICT_OTP_RESPONSE")? {
            config.strict_otp_response = strict;
        }
        if let Some(port) = parse_var::<u16, _>(&lookup, "ONBOARD_PORT")? {
            config.port = port;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}
