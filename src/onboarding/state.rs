//! Wizard state machine: flow variants, step tables and verification states.

use serde::{Deserialize, Serialize};

use super::model::SELF_ONBOARD;

/// The sections a wizard step can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Email,
    Password,
    Personal,
    Address,
    Financial,
    Configuration,
    Review,
}

impl WizardStep {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Email => "Email Verification",
            Self::Password => "Create Password",
            Self::Personal => "Personal Details",
            Self::Address => "Address Information",
            Self::Financial => "Financial Details",
            Self::Configuration => "Agent Configuration",
            Self::Review => "Review & Submit",
        }
    }

    /// Whether this is the terminal step (submit instead of next).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Review)
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::Personal => "personal",
            Self::Address => "address",
            Self::Financial => "financial",
            Self::Configuration => "configuration",
            Self::Review => "review",
        };
        write!(f, "{s}")
    }
}

const REFERRED_STEPS: [WizardStep; 5] = [
    WizardStep::Email,
    WizardStep::Password,
    WizardStep::Personal,
    WizardStep::Configuration,
    WizardStep::Review,
];

const SELF_ONBOARDING_STEPS: [WizardStep; 7] = [
    WizardStep::Email,
    WizardStep::Password,
    WizardStep::Personal,
    WizardStep::Address,
    WizardStep::Financial,
    WizardStep::Configuration,
    WizardStep::Review,
];

/// Which wizard shape a session uses. Fixed once the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVariant {
    /// Opened through a referral link; address and banking are skipped.
    Referred,
    SelfOnboarding,
}

impl FlowVariant {
    /// Resolve the variant from a `parent_agent_id`.
    pub fn from_parent_agent_id(parent_agent_id: &str) -> Self {
        let id = parent_agent_id.trim();
        if id.is_empty() || id == SELF_ONBOARD {
            Self::SelfOnboarding
        } else {
            Self::Referred
        }
    }

    /// Ordered steps of this variant.
    pub fn steps(&self) -> &'static [WizardStep] {
        match self {
            Self::Referred => &REFERRED_STEPS,
            Self::SelfOnboarding => &SELF_ONBOARDING_STEPS,
        }
    }

    /// Number of steps, `N`.
    pub fn step_count(&self) -> u8 {
        self.steps().len() as u8
    }

    /// The step shown at 1-based position `n`.
    pub fn step_at(&self, n: u8) -> Option<WizardStep> {
        let index = usize::from(n).checked_sub(1)?;
        self.steps().get(index).copied()
    }
}

impl std::fmt::Display for FlowVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Referred => write!(f, "referred"),
            Self::SelfOnboarding => write!(f, "self_onboarding"),
        }
    }
}

/// Email OTP lifecycle: Unsent → Sent → Verified. Verified is sticky.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    #[default]
    Unsent,
    Sent,
    Verified,
}

impl OtpState {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Re-sending keeps the channel in `Sent`; editing the address of an
    /// unverified channel drops it back to `Unsent`.
    pub fn can_transition_to(&self, target: OtpState) -> bool {
        use OtpState::*;
        matches!(
            (self, target),
            (Unsent, Sent) | (Sent, Sent) | (Sent, Verified) | (Sent, Unsent)
        )
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for OtpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unsent => "unsent",
            Self::Sent => "sent",
            Self::Verified => "verified",
        };
        write!(f, "{s}")
    }
}

/// Position in the wizard plus the verification side-channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub variant: FlowVariant,
    /// 1-based step index, always within `1..=variant.step_count()`.
    pub step: u8,
    pub email_otp: OtpState,
    pub pan_verified: bool,
}

impl WizardState {
    pub fn new(variant: FlowVariant) -> Self {
        Self {
            variant,
            step: 1,
            email_otp: OtpState::Unsent,
            pan_verified: false,
        }
    }

    pub fn step_count(&self) -> u8 {
        self.variant.step_count()
    }

    /// The section shown at the current step.
    pub fn current(&self) -> WizardStep {
        self.variant
            .step_at(self.step)
            .unwrap_or(WizardStep::Email)
    }

    pub fn is_terminal(&self) -> bool {
        self.step >= self.step_count()
    }

    /// Move forward one step, saturating at the last step.
    pub fn advance(&mut self) -> u8 {
        self.step = (self.step + 1).min(self.step_count());
        self.step
    }

    /// Move back one step, saturating at the first step.
    pub fn retreat(&mut self) -> u8 {
        self.step = self.step.saturating_sub(1).max(1);
        self.step
    }

    /// Move the email channel to `target` if the transition is allowed.
    pub fn set_email_otp(&mut self, target: OtpState) -> Result<(), String> {
        if !self.email_otp.can_transition_to(target) {
            return Err(format!(
                "Cannot transition email OTP from {} to {}",
                self.email_otp, target
            ));
        }
        self.email_otp = target;
        Ok(())
    }
}
