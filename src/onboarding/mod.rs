//! Agent onboarding wizard.
//!
//! A session collects an agent record over a fixed sequence of steps. The
//! sequence depends on whether the session was opened from a referral link
//! (short flow) or not (self-onboarding, with address and banking steps).
//! The email step cannot be left until the address is verified by OTP, and
//! the review step submits the record through the two-phase gateway.

pub mod manager;
pub mod model;
pub mod routes;
pub mod state;
pub mod validate;

pub use manager::{RequestKind, WizardController, WizardDeps, WizardSnapshot};
pub use model::{AgentRecord, ContractOrCommission, Field, FosOrDsa, Gender, SELF_ONBOARD};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{FlowVariant, OtpState, WizardState, WizardStep};
pub use validate::{ValidationErrors, validate_step};
