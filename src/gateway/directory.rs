//! Agent directory client: `create_agent` and `agent_update_password`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{AgentDirectory, CreateAgentResponse, GatewayResponse, http_client, log_failure};
use crate::config::OnboardConfig;
use crate::error::GatewayError;
use crate::onboarding::model::UpdatePasswordRequest;

const SERVICE: &str = "agent-directory";

/// Success body of `create_agent`. Some deployments return a numeric id.
#[derive(Debug, Deserialize)]
struct CreateAgentReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    agent_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    #[serde(default)]
    message: Option<String>,
}

/// reqwest-backed agent directory.
///
/// `create_agent` lives on the directory host while the password update is
/// served by the notification host.
pub struct HttpAgentDirectory {
    client: reqwest::Client,
    directory_url: String,
    notification_url: String,
    timeout: Duration,
}

impl HttpAgentDirectory {
    pub fn new(config: &OnboardConfig) -> Result<Self, GatewayError> {
        Self::with_urls(
            &config.directory_url,
            &config.notification_url,
            config.http_timeout,
        )
    }

    pub fn with_urls(
        directory_url: &str,
        notification_url: &str,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client(SERVICE, timeout)?,
            directory_url: directory_url.trim_end_matches('/').to_string(),
            notification_url: notification_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = self
            .client
            .post(url)
            .json(body)
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
        Ok(resp)
    }

    async fn try_create_agent(
        &self,
        body: &serde_json::Value,
    ) -> Result<CreateAgentResponse, GatewayError> {
        let url = format!("{}/create_agent", self.directory_url);
        let parent_agent_id = body
            .get("parent_agent_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        info!(url = %url, parent_agent_id, "Creating agent");

        let reply: CreateAgentReply = self
            .post(&url, body)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, self.timeout, e))?;

        let agent_id = match reply.agent_id {
            Some(serde_json::Value::String(id)) if !id.trim().is_empty() => Some(id),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                warn!(agent_id = %other, "Unexpected agent_id shape in create_agent reply");
                None
            }
            None => None,
        };

        Ok(CreateAgentResponse {
            success: true,
            message: reply
                .message
                .unwrap_or_else(|| "Agent created successfully!".to_string()),
            agent_id,
        })
    }

    async fn try_update_password(
        &self,
        request: &UpdatePasswordRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = format!("{}/agent_update_password", self.notification_url);
        info!(agent_id = %request.agent_id, "Updating agent password");

        let reply: MessageReply = self
            .post(&url, request)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, self.timeout, e))?;

        Ok(GatewayResponse::ok(
            reply
                .message
                .unwrap_or_else(|| "Password updated successfully!".to_string()),
        ))
    }
}

#[async_trait]
impl AgentDirectory for HttpAgentDirectory {
    async fn create_agent_json(&self, body: &serde_json::Value) -> CreateAgentResponse {
        match self.try_create_agent(body).await {
            Ok(response) => {
                info!(agent_id = ?response.agent_id, "Agent created");
                response
            }
            Err(e) => {
                log_failure("create_agent", &e);
                CreateAgentResponse::failure("Failed to create agent. Please try again.")
            }
        }
    }

    async fn update_password(&self, request: &UpdatePasswordRequest) -> GatewayResponse {
        match self.try_update_password(request).await {
            Ok(response) => response,
            Err(e) => {
                log_failure("agent_update_password", &e);
                GatewayResponse::failure("Failed to update password. Please try again.")
            }
        }
    }
}
