//! Agent record and wire models.

use std::str::FromStr;

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// `parent_agent_id` value meaning "no referrer".
pub const SELF_ONBOARD: &str = "self-onboard";

/// Input length limits mirrored from the entry form.
const MOBILE_MAX_LEN: usize = 10;
const PIN_CODE_MAX_LEN: usize = 6;
const PAN_MAX_LEN: usize = 10;
const IFSC_MAX_LEN: usize = 11;

/// Agent gender. Serialized as the single-letter code the directory expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Other => "O",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" | "male" | "M" => Ok(Self::Male),
            "Female" | "female" | "F" => Ok(Self::Female),
            "Other" | "other" | "O" => Ok(Self::Other),
            other => Err(format!("unknown gender '{other}' (expected Male, Female or Other)")),
        }
    }
}

/// Field officer or direct selling agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FosOrDsa {
    #[serde(rename = "FOS")]
    Fos,
    #[serde(rename = "DSA")]
    Dsa,
}

impl std::fmt::Display for FosOrDsa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fos => write!(f, "FOS"),
            Self::Dsa => write!(f, "DSA"),
        }
    }
}

impl FromStr for FosOrDsa {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FOS" => Ok(Self::Fos),
            "DSA" => Ok(Self::Dsa),
            _ => Err(format!("unknown agent type '{}' (expected FOS or DSA)", s.trim())),
        }
    }
}

/// How the agent is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractOrCommission {
    Contract,
    Commission,
}

impl std::fmt::Display for ContractOrCommission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contract => write!(f, "Contract"),
            Self::Commission => write!(f, "Commission"),
        }
    }
}

impl FromStr for ContractOrCommission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contract" => Ok(Self::Contract),
            "commission" => Ok(Self::Commission),
            _ => Err(format!(
                "unknown engagement '{}' (expected Contract or Commission)",
                s.trim()
            )),
        }
    }
}

/// A postal address. A `pin_code` of 0 means "not entered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub district: String,
    pub state: String,
    pub pin_code: u32,
}

/// Every user-editable field of the wizard, keyed by its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MobNum,
    Fname,
    Mname,
    Lname,
    Gender,
    Dob,
    Email,
    Password,
    ConfirmPassword,
    HomeAddress1,
    HomeAddress2,
    HomeDistrict,
    HomeState,
    HomePinCode,
    OfficeAddress1,
    OfficeAddress2,
    OfficeDistrict,
    OfficeState,
    OfficePinCode,
    Pan,
    Ifsc,
    AccNum,
    BeneficiaryName,
    FosOrDsa,
    ContractOrCommission,
}

impl Field {
    pub const ALL: [Field; 25] = [
        Field::MobNum,
        Field::Fname,
        Field::Mname,
        Field::Lname,
        Field::Gender,
        Field::Dob,
        Field::Email,
        Field::Password,
        Field::ConfirmPassword,
        Field::HomeAddress1,
        Field::HomeAddress2,
        Field::HomeDistrict,
        Field::HomeState,
        Field::HomePinCode,
        Field::OfficeAddress1,
        Field::OfficeAddress2,
        Field::OfficeDistrict,
        Field::OfficeState,
        Field::OfficePinCode,
        Field::Pan,
        Field::Ifsc,
        Field::AccNum,
        Field::BeneficiaryName,
        Field::FosOrDsa,
        Field::ContractOrCommission,
    ];

    /// Wire name, identical to the serde representation.
    pub fn name(self) -> &'static str {
        match self {
            Self::MobNum => "mob_num",
            Self::Fname => "fname",
            Self::Mname => "mname",
            Self::Lname => "lname",
            Self::Gender => "gender",
            Self::Dob => "dob",
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirm_password",
            Self::HomeAddress1 => "home_address1",
            Self::HomeAddress2 => "home_address2",
            Self::HomeDistrict => "home_district",
            Self::HomeState => "home_state",
            Self::HomePinCode => "home_pin_code",
            Self::OfficeAddress1 => "office_address1",
            Self::OfficeAddress2 => "office_address2",
            Self::OfficeDistrict => "office_district",
            Self::OfficeState => "office_state",
            Self::OfficePinCode => "office_pin_code",
            Self::Pan => "pan",
            Self::Ifsc => "ifsc",
            Self::AccNum => "acc_num",
            Self::BeneficiaryName => "beneficiary_name",
            Self::FosOrDsa => "fos_or_dsa",
            Self::ContractOrCommission => "contract_or_commission",
        }
    }

    /// Human-readable label used in messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::MobNum => "Mobile number",
            Self::Fname => "First name",
            Self::Mname => "Middle name",
            Self::Lname => "Last name",
            Self::Gender => "Gender",
            Self::Dob => "Date of birth",
            Self::Email => "Email",
            Self::Password => "Password",
            Self::ConfirmPassword => "Confirm password",
            Self::HomeAddress1 => "Address",
            Self::HomeAddress2 => "Address line 2",
            Self::HomeDistrict => "District",
            Self::HomeState => "State",
            Self::HomePinCode => "PIN code",
            Self::OfficeAddress1 => "Office address",
            Self::OfficeAddress2 => "Office address line 2",
            Self::OfficeDistrict => "Office district",
            Self::OfficeState => "Office state",
            Self::OfficePinCode => "Office PIN code",
            Self::Pan => "PAN",
            Self::Ifsc => "IFSC",
            Self::AccNum => "Account number",
            Self::BeneficiaryName => "Beneficiary name",
            Self::FosOrDsa => "FOS or DSA",
            Self::ContractOrCommission => "Contract or Commission",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Field::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

/// The agent record under construction.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub mob_num: String,
    pub fname: String,
    pub mname: String,
    pub lname: String,
    pub gender: Option<Gender>,
    pub dob: Option<NaiveDate>,
    pub email: String,
    /// Held for the lifetime of the form session; sent only in phase two.
    pub password: SecretString,
    pub home: Address,
    pub office: Address,
    pub pan: String,
    pub ifsc: String,
    pub acc_num: String,
    pub beneficiary_name: String,
    pub fos_or_dsa: Option<FosOrDsa>,
    pub contract_or_commission: Option<ContractOrCommission>,
    /// Referrer id, or [`SELF_ONBOARD`].
    pub parent_agent_id: String,
    pub onboarding_date: NaiveDate,
}

impl AgentRecord {
    /// Empty record for a wizard opened on `onboarding_date`.
    pub fn new(parent_agent_id: impl Into<String>, onboarding_date: NaiveDate) -> Self {
        Self {
            mob_num: String::new(),
            fname: String::new(),
            mname: String::new(),
            lname: String::new(),
            gender: None,
            dob: None,
            email: String::new(),
            password: SecretString::from(String::new()),
            home: Address::default(),
            office: Address::default(),
            pan: String::new(),
            ifsc: String::new(),
            acc_num: String::new(),
            beneficiary_name: String::new(),
            fos_or_dsa: None,
            contract_or_commission: None,
            parent_agent_id: parent_agent_id.into(),
            onboarding_date,
        }
    }

    pub fn is_self_onboard(&self) -> bool {
        self.parent_agent_id == SELF_ONBOARD
    }

    /// Name shown in the OTP email: "First Last" once both are known.
    pub fn display_name(&self) -> String {
        let (first, last) = (self.fname.trim(), self.lname.trim());
        if first.is_empty() || last.is_empty() {
            "User".to_string()
        } else {
            format!("{first} {last}")
        }
    }

    /// Apply a raw text edit to a persisted field.
    ///
    /// Enumerations and dates are parsed here; an empty string clears them.
    /// PIN codes follow the entry form: empty or non-numeric text becomes 0.
    pub fn set_field(&mut self, field: Field, raw: &str) -> Result<(), WizardError> {
        let invalid = |reason: String| WizardError::InvalidValue { field, reason };

        match field {
            Field::MobNum => self.mob_num = bounded(raw, MOBILE_MAX_LEN).map_err(invalid)?,
            Field::Fname => self.fname = raw.to_string(),
            Field::Mname => self.mname = raw.to_string(),
            Field::Lname => self.lname = raw.to_string(),
            Field::Gender => {
                self.gender = parse_optional(raw).map_err(invalid)?;
            }
            Field::Dob => {
                self.dob = if raw.trim().is_empty() {
                    None
                } else {
                    Some(
                        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                            .map_err(|e| invalid(format!("expected YYYY-MM-DD: {e}")))?,
                    )
                };
            }
            Field::Email => self.email = raw.trim().to_string(),
            Field::Password => self.password = SecretString::from(raw.to_string()),
            Field::ConfirmPassword => {
                return Err(invalid(
                    "confirm password is not part of the agent record".to_string(),
                ));
            }
            Field::HomeAddress1 => self.home.line1 = raw.to_string(),
            Field::HomeAddress2 => self.home.line2 = raw.to_string(),
            Field::HomeDistrict => self.home.district = raw.to_string(),
            Field::HomeState => self.home.state = raw.to_string(),
            Field::HomePinCode => self.home.pin_code = parse_pin_code(raw).map_err(invalid)?,
            Field::OfficeAddress1 => self.office.line1 = raw.to_string(),
            Field::OfficeAddress2 => self.office.line2 = raw.to_string(),
            Field::OfficeDistrict => self.office.district = raw.to_string(),
            Field::OfficeState => self.office.state = raw.to_string(),
            Field::OfficePinCode => self.office.pin_code = parse_pin_code(raw).map_err(invalid)?,
            Field::Pan => self.pan = bounded(raw.trim(), PAN_MAX_LEN).map_err(invalid)?,
            Field::Ifsc => self.ifsc = bounded(raw.trim(), IFSC_MAX_LEN).map_err(invalid)?,
            Field::AccNum => self.acc_num = raw.trim().to_string(),
            Field::BeneficiaryName => self.beneficiary_name = raw.to_string(),
            Field::FosOrDsa => self.fos_or_dsa = parse_optional(raw).map_err(invalid)?,
            Field::ContractOrCommission => {
                self.contract_or_commission = parse_optional(raw).map_err(invalid)?;
            }
        }
        Ok(())
    }

    /// Display-only summary for the review step. Address and banking
    /// sections are listed only when the self-onboarding flow collected them.
    pub fn review_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Name", format!("{} {}", self.fname, self.lname)),
            ("Email", self.email.clone()),
            ("Mobile", self.mob_num.clone()),
            (
                "Gender",
                self.gender.map(|g| g.to_string()).unwrap_or_default(),
            ),
            (
                "Date of birth",
                self.dob.map(|d| d.to_string()).unwrap_or_default(),
            ),
        ];

        if self.is_self_onboard() {
            lines.extend([
                ("Address", self.home.line1.clone()),
                ("District", self.home.district.clone()),
                ("State", self.home.state.clone()),
                ("PIN code", self.home.pin_code.to_string()),
                ("PAN", self.pan.clone()),
                ("IFSC", self.ifsc.clone()),
                ("Account number", self.acc_num.clone()),
                ("Beneficiary name", self.beneficiary_name.clone()),
            ]);
        }

        lines.extend([
            (
                "Agent type",
                self.fos_or_dsa.map(|v| v.to_string()).unwrap_or_default(),
            ),
            (
                "Engagement",
                self.contract_or_commission
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ),
            (
                "Referred by",
                if self.is_self_onboard() {
                    "Self-onboard".to_string()
                } else {
                    self.parent_agent_id.clone()
                },
            ),
        ]);
        lines
    }
}

fn bounded(raw: &str, max: usize) -> Result<String, String> {
    if raw.chars().count() > max {
        Err(format!("must be at most {max} characters"))
    } else {
        Ok(raw.to_string())
    }
}

fn parse_pin_code(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if raw.chars().count() > PIN_CODE_MAX_LEN {
        return Err(format!("must be at most {PIN_CODE_MAX_LEN} digits"));
    }
    Ok(raw.parse().unwrap_or(0))
}

fn parse_optional<T>(raw: &str) -> Result<Option<T>, String>
where
    T: FromStr<Err = String>,
{
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ── Wire models ─────────────────────────────────────────────────────

/// Body of `create_agent`: the record minus credentials, with empty
/// optional fields omitted rather than sent as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    pub mob_num: String,
    pub fname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mname: Option<String>,
    pub lname: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub home_address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_address2: Option<String>,
    pub home_district: String,
    pub home_state: String,
    pub home_pin_code: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_pin_code: Option<u32>,
    pub email: String,
    pub onboarding_date: NaiveDate,
    pub pan: String,
    pub ifsc: String,
    pub acc_num: String,
    pub beneficiary_name: String,
    pub fos_or_dsa: FosOrDsa,
    pub contract_or_commission: ContractOrCommission,
    pub parent_agent_id: String,
}

impl TryFrom<&AgentRecord> for CreateAgentRequest {
    type Error = WizardError;

    fn try_from(record: &AgentRecord) -> Result<Self, Self::Error> {
        let missing = |field| WizardError::MissingField { field };

        Ok(Self {
            mob_num: record.mob_num.clone(),
            fname: record.fname.trim().to_string(),
            mname: non_empty(&record.mname),
            lname: record.lname.trim().to_string(),
            dob: record.dob.ok_or_else(|| missing(Field::Dob))?,
            gender: record.gender.ok_or_else(|| missing(Field::Gender))?,
            home_address1: record.home.line1.clone(),
            home_address2: non_empty(&record.home.line2),
            home_district: record.home.district.clone(),
            home_state: record.home.state.clone(),
            home_pin_code: record.home.pin_code,
            office_address1: non_empty(&record.office.line1),
            office_address2: non_empty(&record.office.line2),
            office_district: non_empty(&record.office.district),
            office_state: non_empty(&record.office.state),
            office_pin_code: Some(record.office.pin_code).filter(|pin| *pin != 0),
            email: record.email.clone(),
            onboarding_date: record.onboarding_date,
            pan: record.pan.clone(),
            ifsc: record.ifsc.clone(),
            acc_num: record.acc_num.clone(),
            beneficiary_name: record.beneficiary_name.clone(),
            fos_or_dsa: record.fos_or_dsa.ok_or_else(|| missing(Field::FosOrDsa))?,
            contract_or_commission: record
                .contract_or_commission
                .ok_or_else(|| missing(Field::ContractOrCommission))?,
            parent_agent_id: record.parent_agent_id.clone(),
        })
    }
}

/// Body of `agent_update_password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(with = "secret_text", default = "secret_text::empty")]
    pub password: SecretString,
}

/// Plain-string wire form for a [`SecretString`].
mod secret_text {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn empty() -> SecretString {
        SecretString::from(String::new())
    }

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn complete_record() -> AgentRecord {
        let mut record = AgentRecord::new(SELF_ONBOARD, today());
        record.mob_num = "9876543210".into();
        record.fname = "Jane".into();
        record.lname = "Smith".into();
        record.gender = Some(Gender::Female);
        record.dob = NaiveDate::from_ymd_opt(1990, 5, 20);
        record.email = "jane.smith@example.com".into();
        record.password = SecretString::from("secret1");
        record.home = Address {
            line1: "12 MG Road".into(),
            line2: String::new(),
            district: "New Delhi".into(),
            state: "Delhi".into(),
            pin_code: 110001,
        };
        record.pan = "ABCDE1234F".into();
        record.ifsc = "HDFC0001234".into();
        record.acc_num = "123456789012".into();
        record.beneficiary_name = "Jane Smith".into();
        record.fos_or_dsa = Some(FosOrDsa::Fos);
        record.contract_or_commission = Some(ContractOrCommission::Commission);
        record
    }

    #[test]
    fn field_names_round_trip_through_from_str_and_serde() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.name()), "serde name for {field:?}");
        }
        assert!("nickname".parse::<Field>().is_err());
    }

    #[test]
    fn gender_serializes_as_single_letter() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"M\"");
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"F\"");
        assert_eq!(serde_json::to_string(&Gender::Other).unwrap(), "\"O\"");
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!(Gender::Other.to_string(), "Other");
        assert!("X".parse::<Gender>().is_err());
    }

    #[test]
    fn set_field_parses_pin_codes_like_the_form() {
        let mut record = AgentRecord::new(SELF_ONBOARD, today());
        record.set_field(Field::HomePinCode, "110001").unwrap();
        assert_eq!(record.home.pin_code, 110001);
        record.set_field(Field::HomePinCode, "").unwrap();
        assert_eq!(record.home.pin_code, 0);
        record.set_field(Field::HomePinCode, "11a").unwrap();
        assert_eq!(record.home.pin_code, 0);
        assert!(record.set_field(Field::HomePinCode, "1100011").is_err());
    }

    #[test]
    fn set_field_enforces_input_limits() {
        let mut record = AgentRecord::new(SELF_ONBOARD, today());
        assert!(record.set_field(Field::Ifsc, "HDFC0001234").is_ok());
        assert!(record.set_field(Field::Ifsc, "HDFC00012345").is_err());
        assert_eq!(record.ifsc, "HDFC0001234");
        assert!(record.set_field(Field::MobNum, "98765432101").is_err());
        assert!(record.set_field(Field::Pan, "ABCDE1234FG").is_err());
    }

    #[test]
    fn set_field_parses_typed_values() {
        let mut record = AgentRecord::new(SELF_ONBOARD, today());
        record.set_field(Field::Gender, "Male").unwrap();
        record.set_field(Field::Dob, "1990-05-20").unwrap();
        record.set_field(Field::FosOrDsa, "DSA").unwrap();
        record.set_field(Field::ContractOrCommission, "Contract").unwrap();
        assert_eq!(record.gender, Some(Gender::Male));
        assert_eq!(record.dob, NaiveDate::from_ymd_opt(1990, 5, 20));
        assert_eq!(record.fos_or_dsa, Some(FosOrDsa::Dsa));
        assert_eq!(record.contract_or_commission, Some(ContractOrCommission::Contract));

        record.set_field(Field::Gender, "").unwrap();
        assert_eq!(record.gender, None);
        assert!(record.set_field(Field::Dob, "20/05/1990").is_err());
        assert!(record.set_field(Field::ConfirmPassword, "x").is_err());
    }

    #[test]
    fn create_request_omits_empty_optional_fields() {
        let record = complete_record();
        let request = CreateAgentRequest::try_from(&record).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        let obj = json.as_object().unwrap();

        for absent in [
            "mname",
            "home_address2",
            "office_address1",
            "office_address2",
            "office_district",
            "office_state",
            "office_pin_code",
            "password",
            "confirm_password",
        ] {
            assert!(!obj.contains_key(absent), "{absent} should be omitted");
        }
        assert_eq!(json["gender"], "F");
        assert_eq!(json["home_pin_code"], 110001);
        assert_eq!(json["dob"], "1990-05-20");
        assert_eq!(json["onboarding_date"], "2025-01-15");
        assert_eq!(json["fos_or_dsa"], "FOS");
        assert_eq!(json["contract_or_commission"], "Commission");
        assert_eq!(json["parent_agent_id"], "self-onboard");
    }

    #[test]
    fn create_request_keeps_present_office_fields() {
        let mut record = complete_record();
        record.mname = "K".into();
        record.office.line1 = "Tower B".into();
        record.office.pin_code = 560001;
        let json = serde_json::to_value(CreateAgentRequest::try_from(&record).unwrap()).unwrap();
        assert_eq!(json["mname"], "K");
        assert_eq!(json["office_address1"], "Tower B");
        assert_eq!(json["office_pin_code"], 560001);
        assert!(json.get("office_state").is_none());
    }

    #[test]
    fn create_request_requires_typed_fields() {
        let mut record = complete_record();
        record.gender = None;
        let err = CreateAgentRequest::try_from(&record).unwrap_err();
        assert!(matches!(err, WizardError::MissingField { field: Field::Gender }));
    }

    #[test]
    fn display_name_falls_back_to_user() {
        let mut record = AgentRecord::new(SELF_ONBOARD, today());
        assert_eq!(record.display_name(), "User");
        record.fname = "Jane".into();
        assert_eq!(record.display_name(), "User");
        record.lname = "Smith".into();
        assert_eq!(record.display_name(), "Jane Smith");
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let record = complete_record();
        let debug = format!("{record:?}");
        assert!(!debug.contains("secret1"));

        let request = UpdatePasswordRequest {
            email: "a@b.co".into(),
            agent_id: "A1".into(),
            password: SecretString::from("secret1"),
        };
        assert!(!format!("{request:?}").contains("secret1"));

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["password"], "secret1");
        let back: UpdatePasswordRequest =
            serde_json::from_value(serde_json::json!({"email": "a@b.co"})).unwrap();
        assert!(back.password.expose_secret().is_empty());
        assert!(back.agent_id.is_empty());
    }

    #[test]
    fn review_lines_follow_the_flow() {
        let record = complete_record();
        let labels: Vec<_> = record.review_lines().iter().map(|(l, _)| *l).collect();
        assert!(labels.contains(&"PAN"));

        let mut referred = complete_record();
        referred.parent_agent_id = "AG-77".into();
        let lines = referred.review_lines();
        assert!(!lines.iter().any(|(l, _)| *l == "PAN"));
        assert_eq!(lines.last().unwrap().1, "AG-77");
    }
}
