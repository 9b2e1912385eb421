//! Stub of the agent directory and notification services.
//!
//! One Axum server answers every external endpoint so a single base URL can
//! stand in for both hosts.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use agent_onboard::gateway::{HttpAgentDirectory, HttpEmailVerifier, LocalPanVerifier};
use agent_onboard::onboarding::WizardDeps;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Passcode the stub accepts.
pub const VALID_OTP: &str = "123456";

/// Address the stub reports as already verified.
pub const ALREADY_VERIFIED: &str = "verified@example.com";

#[derive(Default)]
pub struct StubState {
    pub created: Mutex<Vec<Value>>,
    pub password_updates: Mutex<Vec<Value>>,
    pub otp_requests: Mutex<Vec<Value>>,
    pub fail_password: AtomicBool,
    next_id: AtomicUsize,
}

impl StubState {
    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn password_calls(&self) -> usize {
        self.password_updates.lock().unwrap().len()
    }
}

async fn create_agent(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    let fname = body["fname"].as_str().unwrap_or_default().to_string();
    state.created.lock().unwrap().push(body);

    match fname.as_str() {
        "Fail" => (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response(),
        "Slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"message": "late", "agent_id": "TOO-LATE"})).into_response()
        }
        "Numeric" => Json(json!({"message": "Agent created", "agent_id": 42})).into_response(),
        _ => {
            let n = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Json(json!({"message": "Agent created", "agent_id": format!("AG{n:04}")})).into_response()
        }
    }
}

async fn update_password(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    state.password_updates.lock().unwrap().push(body);
    if state.fail_password.load(Ordering::SeqCst) {
        (StatusCode::BAD_GATEWAY, "auth backend down").into_response()
    } else {
        Json(json!({"message": "Password updated"})).into_response()
    }
}

async fn send_email_notifications(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> Response {
    let recipient = body["recipients"][0].as_str().unwrap_or_default().to_string();
    state.otp_requests.lock().unwrap().push(body);

    if recipient == ALREADY_VERIFIED {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Email already verified"})),
        )
            .into_response();
    }
    if recipient.ends_with("@bounce.test") {
        return (StatusCode::BAD_REQUEST, "not json").into_response();
    }
    Json(json!({"status": "queued"})).into_response()
}

async fn verify_email_otp(Json(body): Json<Value>) -> Response {
    if body["otp"] == VALID_OTP {
        Json(json!({"success": true, "message": "verified"})).into_response()
    } else {
        Json(json!({"success": false, "message": "Invalid OTP"})).into_response()
    }
}

/// Start the stub on a random port; returns its base URL and state.
pub async fn start_stub() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let app = Router::new()
        .route("/create_agent", post(create_agent))
        .route("/agent_update_password", post(update_password))
        .route("/send_email_notifications", post(send_email_notifications))
        .route("/verify_email_otp", post(verify_email_otp))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{port}"), state)
}

/// HTTP-backed wizard dependencies pointed at the stub.
pub fn http_deps(base_url: &str) -> WizardDeps {
    let timeout = Duration::from_secs(2);
    WizardDeps {
        directory: Arc::new(HttpAgentDirectory::with_urls(base_url, base_url, timeout).unwrap()),
        email_verifier: Arc::new(HttpEmailVerifier::with_url(base_url, timeout).unwrap()),
        pan_verifier: Arc::new(LocalPanVerifier::default()),
    }
}
