//! Two-phase submission: create the agent, then set its password.
//!
//! There is no rollback. If the password phase fails the agent already
//! exists, and the outcome says so explicitly.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::AgentDirectory;
use crate::onboarding::model::{AgentRecord, CreateAgentRequest, UpdatePasswordRequest};

const MISSING_AGENT_ID: &str = "Agent creation did not return an agent ID. Please try again.";

/// Combined result of both phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Phase 1 failed; the password phase was not attempted.
    Rejected { message: String },
    /// The agent exists but its password could not be set.
    PasswordFailed { agent_id: String, message: String },
    /// Both phases succeeded.
    Completed { agent_id: String },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Self::Rejected { .. } => None,
            Self::PasswordFailed { agent_id, .. } | Self::Completed { agent_id } => Some(agent_id),
        }
    }

    /// Whether the wizard should clear the record after showing this outcome.
    pub fn should_reset(&self) -> bool {
        self.is_success()
    }

    /// The single message shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { message } => message.clone(),
            Self::PasswordFailed { agent_id, message } => format!(
                "Agent created with ID: {agent_id}, but password update failed: {message}"
            ),
            Self::Completed { agent_id } => format!(
                "Success! Agent created with ID: {agent_id}. Password updated successfully."
            ),
        }
    }
}

impl std::fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Drives the create-then-set-password sequence against an [`AgentDirectory`].
#[derive(Clone)]
pub struct SubmissionGateway {
    directory: Arc<dyn AgentDirectory>,
}

impl SubmissionGateway {
    pub fn new(directory: Arc<dyn AgentDirectory>) -> Self {
        Self { directory }
    }

    pub async fn submit(&self, record: &AgentRecord) -> SubmissionOutcome {
        let request = match CreateAgentRequest::try_from(record) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Record is not ready for submission");
                return SubmissionOutcome::Rejected {
                    message: e.to_string(),
                };
            }
        };

        let created = self.directory.create_agent(&request).await;
        if !created.success {
            warn!(message = %created.message, "Agent creation failed");
            return SubmissionOutcome::Rejected {
                message: created.message,
            };
        }
        let Some(agent_id) = created.agent_id else {
            error!(message = %created.message, "Agent directory reported success without an agent id");
            return SubmissionOutcome::Rejected {
                message: MISSING_AGENT_ID.to_string(),
            };
        };

        let password = self
            .directory
            .update_password(&UpdatePasswordRequest {
                email: record.email.clone(),
                agent_id: agent_id.clone(),
                password: record.password.clone(),
            })
            .await;

        if password.success {
            info!(agent_id = %agent_id, "Agent onboarded");
            SubmissionOutcome::Completed { agent_id }
        } else {
            warn!(agent_id = %agent_id, message = %password.message, "Agent created but password update failed");
            SubmissionOutcome::PasswordFailed {
                agent_id,
                message: password.message,
            }
        }
    }
}
