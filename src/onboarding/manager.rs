//! WizardController: owns one form session and drives its transitions.
//!
//! Every operation runs to completion under the session lock except the
//! external calls, which are made with the lock released. A response is
//! applied only if the session generation and the originating step are
//! unchanged when it returns.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::WizardError;
use crate::gateway::{
    AgentDirectory, EmailVerifier, GatewayResponse, PanVerifier, SubmissionGateway,
    SubmissionOutcome,
};

use super::model::{AgentRecord, Field, SELF_ONBOARD};
use super::state::{FlowVariant, OtpState, WizardState, WizardStep};
use super::validate::{ValidationErrors, validate_all, validate_confirm_password, validate_section};

/// Kinds of external request; at most one of each may be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    SendOtp,
    VerifyOtp,
    VerifyPan,
    Submit,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SendOtp => "send_otp",
            Self::VerifyOtp => "verify_otp",
            Self::VerifyPan => "verify_pan",
            Self::Submit => "submit",
        };
        write!(f, "{s}")
    }
}

/// External collaborators of a wizard.
#[derive(Clone)]
pub struct WizardDeps {
    pub directory: Arc<dyn AgentDirectory>,
    pub email_verifier: Arc<dyn EmailVerifier>,
    pub pan_verifier: Arc<dyn PanVerifier>,
}

/// Mutable state of one form session.
#[derive(Debug)]
struct WizardSession {
    record: AgentRecord,
    /// Never persisted or sent; only compared with the password.
    confirm_password: String,
    state: WizardState,
    errors: ValidationErrors,
    notice: Option<String>,
    /// Bumped on reset so late responses can be recognised.
    generation: u64,
    in_flight: HashSet<RequestKind>,
    /// Agent id of a completed submission awaiting the delayed reset.
    submitted: Option<String>,
}

impl WizardSession {
    fn new(parent_agent_id: &str, variant: FlowVariant, today: NaiveDate) -> Self {
        Self {
            record: AgentRecord::new(parent_agent_id, today),
            confirm_password: String::new(),
            state: WizardState::new(variant),
            errors: ValidationErrors::new(),
            notice: None,
            generation: 0,
            in_flight: HashSet::new(),
            submitted: None,
        }
    }

    fn begin(&mut self, kind: RequestKind) -> Result<Ticket, WizardError> {
        if !self.in_flight.insert(kind) {
            return Err(WizardError::Busy {
                kind: kind.to_string(),
            });
        }
        Ok(Ticket {
            kind,
            generation: self.generation,
            step: self.state.step,
        })
    }

    /// Release the in-flight slot and report whether the response still applies.
    fn finish(&mut self, ticket: &Ticket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.in_flight.remove(&ticket.kind);
        self.state.step == ticket.step
    }

    /// Validation for leaving the current step, including the checks that
    /// live outside the step table.
    fn transition_errors(&self) -> ValidationErrors {
        let step = self.state.current();
        let mut errors = validate_section(step, &self.record);

        if step == WizardStep::Password {
            if let Err(message) =
                validate_confirm_password(self.record.password.expose_secret(), &self.confirm_password)
            {
                errors.insert(Field::ConfirmPassword, message);
            }
        }

        if errors.is_empty() && step == WizardStep::Email && !self.state.email_otp.is_verified() {
            errors.insert(Field::Email, "Please verify your email first");
        }
        errors
    }

    /// Validation of the whole record against every step of the variant.
    fn submit_errors(&self) -> ValidationErrors {
        let mut errors = validate_all(&self.record, self.state.variant);
        if let Err(message) =
            validate_confirm_password(self.record.password.expose_secret(), &self.confirm_password)
        {
            errors.insert(Field::ConfirmPassword, message);
        }
        if !self.state.email_otp.is_verified() {
            errors.insert(Field::Email, "Please verify your email first");
        }
        errors
    }
}

/// Proof that a request slot was taken; carries what the response must match.
#[derive(Debug)]
struct Ticket {
    kind: RequestKind,
    generation: u64,
    step: u8,
}

/// Read-only view of a session for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub session_id: Uuid,
    pub variant: FlowVariant,
    pub step: u8,
    pub step_count: u8,
    pub section: WizardStep,
    pub title: &'static str,
    pub email_otp: OtpState,
    pub pan_verified: bool,
    pub errors: ValidationErrors,
    pub notice: Option<String>,
    #[serde(skip)]
    pub record: AgentRecord,
}

/// Coordinates one onboarding session: field edits, step transitions,
/// verification side-channels and the final submission.
pub struct WizardController {
    id: Uuid,
    session: Arc<RwLock<WizardSession>>,
    email_verifier: Arc<dyn EmailVerifier>,
    pan_verifier: Arc<dyn PanVerifier>,
    submission: SubmissionGateway,
    reset_delay: Duration,
}

impl WizardController {
    /// Open a wizard. `referred_by` is the referral parameter the session was
    /// opened with; absent or empty means self-onboarding.
    pub fn new(referred_by: Option<&str>, deps: WizardDeps, reset_delay: Duration) -> Self {
        let parent_agent_id = referred_by
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(SELF_ONBOARD);
        let variant = FlowVariant::from_parent_agent_id(parent_agent_id);
        let id = Uuid::new_v4();

        info!(session_id = %id, variant = %variant, parent_agent_id, "Onboarding wizard opened");

        Self {
            id,
            session: Arc::new(RwLock::new(WizardSession::new(
                parent_agent_id,
                variant,
                Local::now().date_naive(),
            ))),
            email_verifier: deps.email_verifier,
            pan_verifier: deps.pan_verifier,
            submission: SubmissionGateway::new(deps.directory),
            reset_delay,
        }
    }

    pub async fn variant(&self) -> FlowVariant {
        self.session.read().await.state.variant
    }

    /// Current 1-based step.
    pub async fn step(&self) -> u8 {
        self.session.read().await.state.step
    }

    pub async fn errors(&self) -> ValidationErrors {
        self.session.read().await.errors.clone()
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        let s = self.session.read().await;
        let section = s.state.current();
        WizardSnapshot {
            session_id: self.id,
            variant: s.state.variant,
            step: s.state.step,
            step_count: s.state.step_count(),
            section,
            title: section.title(),
            email_otp: s.state.email_otp,
            pan_verified: s.state.pan_verified,
            errors: s.errors.clone(),
            notice: s.notice.clone(),
            record: s.record.clone(),
        }
    }

    /// Edit one field from raw text. Clears any error shown for that field.
    pub async fn set(&self, field: Field, value: &str) -> Result<(), WizardError> {
        let mut s = self.session.write().await;

        match field {
            Field::Email if s.state.email_otp.is_verified() => {
                return Err(WizardError::FieldLocked { field });
            }
            Field::Pan if s.state.pan_verified => {
                return Err(WizardError::FieldLocked { field });
            }
            Field::ConfirmPassword => {
                s.confirm_password = value.to_string();
            }
            Field::Email => {
                let before = s.record.email.clone();
                s.record.set_field(field, value)?;
                // A passcode sent to the old address proves nothing about the new one.
                if s.record.email != before && s.state.email_otp == OtpState::Sent {
                    s.state.set_email_otp(OtpState::Unsent).ok();
                    debug!(session_id = %self.id, "Email changed; OTP must be re-sent");
                }
            }
            _ => s.record.set_field(field, value)?,
        }

        s.errors.remove(field);
        Ok(())
    }

    /// Validate the current step and move forward one step.
    ///
    /// Returns the new step, or the errors that blocked the transition. On
    /// the email step, an unverified address blocks even when it is valid.
    pub async fn next(&self) -> Result<u8, ValidationErrors> {
        let mut s = self.session.write().await;
        let errors = s.transition_errors();
        s.errors = errors.clone();

        if !errors.is_empty() {
            debug!(session_id = %self.id, step = s.state.step, errors = %errors, "Step blocked");
            return Err(errors);
        }

        let from = s.state.current();
        let step = s.state.advance();
        s.notice = None;
        info!(session_id = %self.id, from = %from, to = %s.state.current(), step, "Wizard advanced");
        Ok(step)
    }

    /// Move back one step without validation.
    pub async fn prev(&self) -> u8 {
        let mut s = self.session.write().await;
        let step = s.state.retreat();
        s.errors = ValidationErrors::new();
        step
    }

    /// Send a passcode to the record's email address.
    pub async fn send_otp(&self) -> Result<GatewayResponse, WizardError> {
        let (ticket, email, name) = {
            let mut s = self.session.write().await;
            if s.state.email_otp.is_verified() {
                return Ok(GatewayResponse::ok("Email already verified"));
            }
            let errors = validate_section(WizardStep::Email, &s.record);
            if !errors.is_empty() {
                s.errors.extend(errors.clone());
                return Err(WizardError::Invalid(errors));
            }
            let ticket = s.begin(RequestKind::SendOtp)?;
            (ticket, s.record.email.clone(), s.record.display_name())
        };

        let response = self.email_verifier.send_otp(&email, &name).await;

        let mut s = self.session.write().await;
        if !s.finish(&ticket) || s.record.email != email {
            warn!(session_id = %self.id, "Discarding OTP send response for an inactive step");
            return Err(WizardError::Stale {
                kind: ticket.kind.to_string(),
            });
        }
        if response.success {
            s.state.set_email_otp(OtpState::Sent).ok();
            info!(session_id = %self.id, "Email OTP sent");
        }
        s.notice = Some(response.message.clone());
        Ok(response)
    }

    /// Check a passcode. Success makes the email verified and immutable.
    pub async fn verify_otp(&self, code: &str) -> Result<GatewayResponse, WizardError> {
        let code = code.trim();
        let (ticket, email) = {
            let mut s = self.session.write().await;
            match s.state.email_otp {
                OtpState::Verified => return Ok(GatewayResponse::ok("Email already verified")),
                OtpState::Unsent => return Err(WizardError::OtpNotSent),
                OtpState::Sent => {}
            }
            if code.is_empty() {
                return Err(WizardError::InvalidValue {
                    field: Field::Email,
                    reason: "OTP is required".to_string(),
                });
            }
            let ticket = s.begin(RequestKind::VerifyOtp)?;
            (ticket, s.record.email.clone())
        };

        let response = self.email_verifier.verify_otp(&email, code).await;

        let mut s = self.session.write().await;
        if !s.finish(&ticket) || s.record.email != email {
            warn!(session_id = %self.id, "Discarding OTP verification response for an inactive step");
            return Err(WizardError::Stale {
                kind: ticket.kind.to_string(),
            });
        }
        if response.success {
            if s.state.set_email_otp(OtpState::Verified).is_ok() {
                s.errors.remove(Field::Email);
                info!(session_id = %self.id, "Email verified");
            }
        } else {
            info!(session_id = %self.id, "Email OTP rejected");
        }
        s.notice = Some(response.message.clone());
        Ok(response)
    }

    /// Run the PAN check. Success locks the PAN field for the session.
    pub async fn verify_pan(&self) -> Result<GatewayResponse, WizardError> {
        let (ticket, pan) = {
            let mut s = self.session.write().await;
            if s.state.pan_verified {
                return Ok(GatewayResponse::ok("PAN already verified"));
            }
            let ticket = s.begin(RequestKind::VerifyPan)?;
            (ticket, s.record.pan.clone())
        };

        let response = self.pan_verifier.verify(&pan).await;

        let mut s = self.session.write().await;
        if !s.finish(&ticket) || s.record.pan != pan {
            warn!(session_id = %self.id, "Discarding PAN verification response for an inactive step");
            return Err(WizardError::Stale {
                kind: ticket.kind.to_string(),
            });
        }
        if response.success {
            s.state.pan_verified = true;
            s.errors.remove(Field::Pan);
        } else {
            s.errors.insert(Field::Pan, response.message.clone());
        }
        Ok(response)
    }

    /// Submit the record from the review step.
    ///
    /// The whole record is re-validated first. After full success the record
    /// is reset once `reset_delay` has passed; a partial failure keeps it.
    /// Until that reset, further submissions are refused.
    pub async fn submit(&self) -> Result<SubmissionOutcome, WizardError> {
        let (ticket, record) = {
            let mut s = self.session.write().await;
            if let Some(agent_id) = &s.submitted {
                return Err(WizardError::AlreadySubmitted {
                    agent_id: agent_id.clone(),
                });
            }
            if !s.state.is_terminal() {
                return Err(WizardError::NotAtReview { step: s.state.step });
            }
            let errors = s.submit_errors();
            if !errors.is_empty() {
                s.errors = errors.clone();
                return Err(WizardError::Invalid(errors));
            }
            let ticket = s.begin(RequestKind::Submit)?;
            s.notice = None;
            (ticket, s.record.clone())
        };

        let outcome = self.submission.submit(&record).await;

        {
            let mut s = self.session.write().await;
            if s.finish(&ticket) {
                s.notice = Some(outcome.message());
            }
            // The agent exists whether or not the review step is still shown.
            if s.generation == ticket.generation && outcome.is_success() {
                s.submitted = outcome.agent_id().map(str::to_string);
            }
        }

        if outcome.should_reset() {
            self.schedule_reset(ticket.generation);
        }
        Ok(outcome)
    }

    /// Return the session to its initial state, keeping the variant.
    pub async fn reset(&self) {
        let mut s = self.session.write().await;
        reset_session(&mut s, self.id);
    }

    fn schedule_reset(&self, generation: u64) {
        let session = Arc::clone(&self.session);
        let delay = self.reset_delay;
        let id = self.id;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut s = session.write().await;
            if s.generation == generation {
                reset_session(&mut s, id);
            }
        });
    }
}

fn reset_session(s: &mut WizardSession, id: Uuid) {
    let parent_agent_id = s.record.parent_agent_id.clone();
    let variant = s.state.variant;
    let generation = s.generation + 1;
    *s = WizardSession::new(&parent_agent_id, variant, Local::now().date_naive());
    s.generation = generation;
    info!(session_id = %id, generation, "Wizard reset");
}
