//! Field validators and the per-step validator.
//!
//! Field validators are pure: raw value in, `Err(message)` out when the
//! value is unacceptable. The step validator applies them to the fields a
//! step requires, which depend on the flow variant only through the step
//! table in [`super::state`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::ExposeSecret;
use serde::Serialize;

use super::model::{AgentRecord, Field};
use super::state::{FlowVariant, WizardStep};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

// ASCII classes on purpose: `\d` would also accept non-Latin digits.
static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("mobile regex"));

static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("PAN regex"));

const MIN_PASSWORD_LEN: usize = 6;

/// Field name → message for every field that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// Merge `other` into `self`, keeping existing messages on conflict.
    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, message) in other.0 {
            self.0.entry(field).or_insert(message);
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_confirm_password(password: &str, confirm: &str) -> Result<(), String> {
    if confirm.trim().is_empty() {
        return Err("Please confirm your password".to_string());
    }
    if password != confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

pub fn validate_mobile(mobile: &str) -> Result<(), String> {
    if mobile.trim().is_empty() {
        return Err("Mobile number is required".to_string());
    }
    if !MOBILE_RE.is_match(mobile) {
        return Err("Please enter a valid 10-digit mobile number".to_string());
    }
    Ok(())
}

pub fn validate_pan(pan: &str) -> Result<(), String> {
    if pan.trim().is_empty() {
        return Err("PAN is required".to_string());
    }
    if !PAN_RE.is_match(pan) {
        return Err("Please enter a valid PAN number".to_string());
    }
    Ok(())
}

pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} is required"));
    }
    Ok(())
}

/// PIN codes are stored as integers; 0 means "not entered".
pub fn validate_pin_code(pin_code: u32, label: &str) -> Result<(), String> {
    if pin_code == 0 {
        return Err(format!("{label} is required"));
    }
    Ok(())
}

fn validate_selected<T>(value: Option<T>, label: &str) -> Result<(), String> {
    match value {
        Some(_) => Ok(()),
        None => Err(format!("{label} is required")),
    }
}

/// Check one field of the record with its validator.
///
/// Optional fields always pass. `ConfirmPassword` is not part of the record
/// and is checked by the caller with [`validate_confirm_password`].
pub fn validate_field(field: Field, record: &AgentRecord) -> Result<(), String> {
    let label = field.label();
    match field {
        Field::Email => validate_email(&record.email),
        Field::Password => validate_password(record.password.expose_secret()),
        Field::MobNum => validate_mobile(&record.mob_num),
        Field::Pan => validate_pan(&record.pan),
        Field::Fname => validate_required(&record.fname, label),
        Field::Lname => validate_required(&record.lname, label),
        Field::Gender => validate_selected(record.gender, label),
        Field::Dob => validate_selected(record.dob, label),
        Field::HomeAddress1 => validate_required(&record.home.line1, label),
        Field::HomeDistrict => validate_required(&record.home.district, label),
        Field::HomeState => validate_required(&record.home.state, label),
        Field::HomePinCode => validate_pin_code(record.home.pin_code, label),
        Field::Ifsc => validate_required(&record.ifsc, label),
        Field::AccNum => validate_required(&record.acc_num, label),
        Field::BeneficiaryName => validate_required(&record.beneficiary_name, label),
        Field::FosOrDsa => validate_selected(record.fos_or_dsa, label),
        Field::ContractOrCommission => validate_selected(record.contract_or_commission, label),
        Field::Mname
        | Field::ConfirmPassword
        | Field::HomeAddress2
        | Field::OfficeAddress1
        | Field::OfficeAddress2
        | Field::OfficeDistrict
        | Field::OfficeState
        | Field::OfficePinCode => Ok(()),
    }
}

/// Fields a step requires before the wizard may leave it.
pub fn required_fields(step: WizardStep) -> &'static [Field] {
    match step {
        WizardStep::Email => &[Field::Email],
        WizardStep::Password => &[Field::Password],
        WizardStep::Personal => &[Field::Fname, Field::Lname, Field::Gender, Field::Dob],
        WizardStep::Address => &[
            Field::HomeAddress1,
            Field::HomeDistrict,
            Field::HomeState,
            Field::HomePinCode,
        ],
        WizardStep::Financial => &[
            Field::Pan,
            Field::Ifsc,
            Field::AccNum,
            Field::BeneficiaryName,
        ],
        WizardStep::Configuration => &[Field::FosOrDsa, Field::ContractOrCommission],
        WizardStep::Review => &[],
    }
}

/// Validate the required fields of a single step.
pub fn validate_section(step: WizardStep, record: &AgentRecord) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for &field in required_fields(step) {
        if let Err(message) = validate_field(field, record) {
            errors.insert(field, message);
        }
    }
    errors
}

/// Validate step number `step` (1-based) of `variant`.
///
/// Step numbers outside the variant's range have no required fields.
pub fn validate_step(step: u8, record: &AgentRecord, variant: FlowVariant) -> ValidationErrors {
    match variant.step_at(step) {
        Some(kind) => validate_section(kind, record),
        None => ValidationErrors::new(),
    }
}

/// Validate every step of `variant`, i.e. whether the record could be submitted.
pub fn validate_all(record: &AgentRecord, variant: FlowVariant) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for &step in variant.steps() {
        errors.extend(validate_section(step, record));
    }
    errors
}
