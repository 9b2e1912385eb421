//! REST endpoints that relay agent creation and password updates.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{error, warn};

use crate::gateway::{AgentDirectory, GatewayResponse};
use crate::onboarding::model::UpdatePasswordRequest;

/// Fields `POST /agents` insists on before relaying.
const CREATE_REQUIRED: [&str; 4] = ["mob_num", "fname", "lname", "email"];

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub directory: Arc<dyn AgentDirectory>,
}

fn reply(status: StatusCode, message: &str) -> Response {
    (status, Json(GatewayResponse::failure(message))).into_response()
}

fn internal_error() -> Response {
    reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn has_text(body: &Value, key: &str) -> bool {
    body.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// POST /agents
///
/// Checks the minimal field subset, then relays the body unchanged to the
/// agent directory, which owns the full schema.
async fn create_agent(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Unreadable create-agent request");
            return internal_error();
        }
    };

    let missing: Vec<&str> = CREATE_REQUIRED
        .into_iter()
        .filter(|key| !has_text(&body, key))
        .collect();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Create-agent request is missing required fields");
        return reply(StatusCode::BAD_REQUEST, "Missing required fields");
    }

    Json(state.directory.create_agent_json(&body).await).into_response()
}

/// POST /agents/password
async fn update_password(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Unreadable password-update request");
            return internal_error();
        }
    };

    if request.email.trim().is_empty()
        || request.agent_id.trim().is_empty()
        || request.password.expose_secret().is_empty()
    {
        return reply(
            StatusCode::BAD_REQUEST,
            "Missing required fields: email, agent_id, password",
        );
    }

    Json(state.directory.update_password(&request).await).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "agent-onboard"
    }))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agents", post(create_agent))
        .route("/agents/password", post(update_password))
        .with_state(state)
}
