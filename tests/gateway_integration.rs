//! Integration tests for the HTTP gateways and the relay routes.
//!
//! Each test spins up the stub services on a random port and exercises the
//! real reqwest clients against them.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::time::timeout;
use tower::ServiceExt;

use agent_onboard::gateway::{
    AgentDirectory, EmailVerifier, GatewayResponse, HttpAgentDirectory, HttpEmailVerifier,
};
use agent_onboard::onboarding::model::{
    AgentRecord, ContractOrCommission, CreateAgentRequest, FosOrDsa, Gender, UpdatePasswordRequest,
};
use agent_onboard::onboarding::{OnboardingRouteState, onboarding_routes};

use common::{ALREADY_VERIFIED, TEST_TIMEOUT, VALID_OTP, start_stub};

fn directory(base: &str) -> HttpAgentDirectory {
    HttpAgentDirectory::with_urls(base, base, Duration::from_secs(2)).unwrap()
}

fn request_for(fname: &str) -> CreateAgentRequest {
    let mut record = AgentRecord::new("AG-7", NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    record.mob_num = "9876543210".into();
    record.fname = fname.into();
    record.lname = "Smith".into();
    record.email = "jane@example.com".into();
    record.password = SecretString::from("secret1");
    record.gender = Some(Gender::Female);
    record.dob = NaiveDate::from_ymd_opt(1990, 5, 20);
    record.fos_or_dsa = Some(FosOrDsa::Fos);
    record.contract_or_commission = Some(ContractOrCommission::Contract);
    CreateAgentRequest::try_from(&record).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Agent directory ─────────────────────────────────────────────────

#[tokio::test]
async fn create_agent_returns_generated_id_and_sends_clean_body() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;

        let response = directory(&base).create_agent(&request_for("Jane")).await;

        assert!(response.success);
        assert_eq!(response.message, "Agent created");
        assert_eq!(response.agent_id.as_deref(), Some("AG0001"));

        let sent = stub.created.lock().unwrap()[0].clone();
        assert_eq!(sent["gender"], "F");
        assert_eq!(sent["dob"], "1990-05-20");
        assert!(sent.get("mname").is_none());
        assert!(sent.get("office_pin_code").is_none());
        assert!(sent.get("password").is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn create_agent_accepts_numeric_ids() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let response = directory(&base).create_agent(&request_for("Numeric")).await;
        assert_eq!(response.agent_id.as_deref(), Some("42"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn create_agent_server_error_becomes_generic_failure() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let response = directory(&base).create_agent(&request_for("Fail")).await;
        assert!(!response.success);
        assert_eq!(response.message, "Failed to create agent. Please try again.");
        assert!(response.agent_id.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn slow_directory_times_out_as_failure() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let impatient =
            HttpAgentDirectory::with_urls(&base, &base, Duration::from_millis(200)).unwrap();
        let response = impatient.create_agent(&request_for("Slow")).await;
        assert!(!response.success);
        assert_eq!(response.message, "Failed to create agent. Please try again.");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn update_password_success_and_failure() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;
        let dir = directory(&base);
        let request = UpdatePasswordRequest {
            email: "jane@example.com".into(),
            agent_id: "AG0001".into(),
            password: SecretString::from("secret1"),
        };

        assert_eq!(
            dir.update_password(&request).await,
            GatewayResponse::ok("Password updated")
        );
        let sent = stub.password_updates.lock().unwrap()[0].clone();
        assert_eq!(sent, json!({"email": "jane@example.com", "agent_id": "AG0001", "password": "secret1"}));

        stub.fail_password.store(true, Ordering::SeqCst);
        assert_eq!(
            dir.update_password(&request).await,
            GatewayResponse::failure("Failed to update password. Please try again.")
        );
    })
    .await
    .expect("test timed out");
}

// ── Email OTP ───────────────────────────────────────────────────────

#[tokio::test]
async fn send_otp_posts_notification_request() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;
        let verifier = HttpEmailVerifier::with_url(&base, Duration::from_secs(2)).unwrap();

        let response = verifier.send_otp("jane@example.com", "Jane Smith").await;
        assert_eq!(response, GatewayResponse::ok("OTP sent to your email successfully"));

        let sent = stub.otp_requests.lock().unwrap()[0].clone();
        assert_eq!(sent["notification_channel"], "email_notification");
        assert_eq!(sent["notification_template_id"], "email_verification");
        assert_eq!(sent["verification_type"], "normal");
        assert_eq!(sent["recipients"], json!(["jane@example.com"]));
        assert_eq!(sent["user_data"]["name"], "Jane Smith");
        assert!(sent["user_data"]["user_id"].as_str().unwrap().parse::<i64>().is_ok());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_otp_surfaces_bad_request_message_verbatim() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let verifier = HttpEmailVerifier::with_url(&base, Duration::from_secs(2)).unwrap();

        let informational = verifier.send_otp(ALREADY_VERIFIED, "User").await;
        assert_eq!(informational, GatewayResponse::failure("Email already verified"));

        let unstructured = verifier.send_otp("x@bounce.test", "User").await;
        assert_eq!(unstructured, GatewayResponse::failure("Bad Request"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn verify_otp_accepts_only_the_right_code() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let verifier = HttpEmailVerifier::with_url(&base, Duration::from_secs(2)).unwrap();

        let ok = verifier.verify_otp("jane@example.com", VALID_OTP).await;
        assert_eq!(ok, GatewayResponse::ok("Email verified successfully"));

        let rejected = verifier.verify_otp("jane@example.com", "000000").await;
        assert_eq!(rejected, GatewayResponse::failure("Invalid OTP"));
    })
    .await
    .expect("test timed out");
}

// ── Relay routes ────────────────────────────────────────────────────

fn relay(base: &str) -> axum::Router {
    onboarding_routes(OnboardingRouteState {
        directory: Arc::new(directory(base)),
    })
}

#[tokio::test]
async fn relay_create_requires_minimal_fields() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;
        let body = json!({"fname": "Jane", "lname": "Smith", "email": "jane@example.com"});

        let response = relay(&base).oneshot(post_json("/agents", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json, json!({"success": false, "message": "Missing required fields"}));
        assert_eq!(stub.create_calls(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn relay_create_forwards_to_directory() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;
        let body = serde_json::to_value(request_for("Jane")).unwrap();

        let response = relay(&base).oneshot(post_json("/agents", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["agent_id"], "AG0001");
        assert_eq!(stub.create_calls(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn relay_passes_form_shaped_body_through_unchanged() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;

        let minimal = json!({
            "mob_num": "9876543210",
            "fname": "Jane",
            "lname": "Smith",
            "email": "jane@example.com"
        });
        let response = relay(&base).oneshot(post_json("/agents", &minimal)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        // Values the directory interprets itself are not second-guessed here.
        let loose = json!({
            "mob_num": "9876543210",
            "fname": "Jane",
            "lname": "Smith",
            "email": "jane@example.com",
            "gender": "Male",
            "dob": "1990-05-20",
            "fos_or_dsa": "fos"
        });
        let response = relay(&base).oneshot(post_json("/agents", &loose)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["agent_id"], "AG0002");

        assert_eq!(stub.create_calls(), 2);
        assert_eq!(stub.created.lock().unwrap()[0], minimal);
        assert_eq!(stub.created.lock().unwrap()[1], loose);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn relay_reports_directory_failure_with_ok_status() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let body = serde_json::to_value(request_for("Fail")).unwrap();

        let response = relay(&base).oneshot(post_json("/agents", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Failed to create agent. Please try again.");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn relay_rejects_unreadable_body_with_500() {
    timeout(TEST_TIMEOUT, async {
        let (base, _stub) = start_stub().await;
        let request = Request::builder()
            .method("POST")
            .uri("/agents")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = relay(&base).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Internal server error");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn relay_password_update() {
    timeout(TEST_TIMEOUT, async {
        let (base, stub) = start_stub().await;

        let missing = relay(&base)
            .oneshot(post_json("/agents/password", &json!({"email": "jane@example.com"})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(missing).await["message"],
            "Missing required fields: email, agent_id, password"
        );
        assert_eq!(stub.password_calls(), 0);

        let body = json!({"email": "jane@example.com", "agent_id": "AG0001", "password": "secret1"});
        let ok = relay(&base)
            .oneshot(post_json("/agents/password", &body))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            body_json(ok).await,
            json!({"success": true, "message": "Password updated"})
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_endpoint() {
    let response = relay("http://127.0.0.1:9")
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
