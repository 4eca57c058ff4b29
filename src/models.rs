use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const UNKNOWN_CONTACT: &str = "Unknown Contact";
pub const DEFAULT_SUBJECT: &str = "General Note";
pub const DEFAULT_USER: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default = "unknown_contact", deserialize_with = "name_or_default")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub case_notes: Vec<CaseNote>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub programs: Vec<Program>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub attendance: Vec<AttendanceEvent>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: unknown_contact(),
            image: None,
            case_notes: Vec::new(),
            programs: Vec::new(),
            attendance: Vec::new(),
        }
    }
}

impl Profile {
    /// Image source usable in an `<img>` tag; bare base64 is assumed to be PNG.
    pub fn image_source(&self) -> Option<String> {
        self.image.as_deref().map(|image| {
            if image.starts_with("data:") {
                image.to_string()
            } else {
                format!("data:image/png;base64,{image}")
            }
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseNote {
    #[serde(default, deserialize_with = "loose_text")]
    pub date: String,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub note: String,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub chef: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub staff: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub user: Option<String>,
}

impl CaseNote {
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT)
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Fills the fields a freshly appended note must always carry.
    pub fn with_defaults(mut self, today: NaiveDate) -> Self {
        if self.date.is_empty() {
            self.date = us_date(today);
        }
        self.subject.get_or_insert_with(|| DEFAULT_SUBJECT.to_string());
        self.user.get_or_insert_with(|| DEFAULT_USER.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Program {
    #[serde(default, deserialize_with = "loose_text")]
    pub program: String,
    #[serde(default, deserialize_with = "loose_tier")]
    pub tier1: TierStatus,
    #[serde(default, deserialize_with = "loose_tier")]
    pub tier2: TierStatus,
    #[serde(default, deserialize_with = "loose_tier")]
    pub tier3: TierStatus,
}

impl Program {
    pub fn tiers(&self) -> [&TierStatus; 3] {
        [&self.tier1, &self.tier2, &self.tier3]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TierStatus {
    #[default]
    Empty,
    Complete,
    NotApplicable,
    Custom(String),
}

impl TierStatus {
    pub fn label(&self, default_label: &str) -> String {
        match self {
            TierStatus::Empty | TierStatus::Complete => default_label.to_string(),
            TierStatus::NotApplicable => "N/A".to_string(),
            TierStatus::Custom(text) => text.clone(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            TierStatus::Complete => "tier-complete",
            TierStatus::NotApplicable => "tier-na",
            TierStatus::Empty | TierStatus::Custom(_) => "tier-empty",
        }
    }
}

impl From<Option<String>> for TierStatus {
    fn from(value: Option<String>) -> Self {
        match value {
            None => TierStatus::Empty,
            Some(text) => match text.to_lowercase().as_str() {
                "complete" => TierStatus::Complete,
                "na" => TierStatus::NotApplicable,
                _ => TierStatus::Custom(text),
            },
        }
    }
}

impl Serialize for TierStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TierStatus::Empty => serializer.serialize_none(),
            TierStatus::Complete => serializer.serialize_str("complete"),
            TierStatus::NotApplicable => serializer.serialize_str("na"),
            TierStatus::Custom(text) => serializer.serialize_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttendanceEvent {
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub excused: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
}

impl AttendanceEvent {
    pub fn is_excused(&self) -> bool {
        self.excused
            .as_deref()
            .is_some_and(|value| value.eq_ignore_ascii_case("yes"))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub present: u32,
    pub late: u32,
    pub left_early: u32,
    pub absent: u32,
    pub ncns: u32,
    pub total: u32,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub summary: AttendanceSummary,
    pub months: Vec<crate::calendar::MonthGrid>,
}

/// `M/D/YYYY`, the way the host formats dates.
pub fn us_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

fn unknown_contact() -> String {
    UNKNOWN_CONTACT.to_string()
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_text))
}

fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.unwrap_or_default())
}

fn name_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.unwrap_or_else(unknown_contact))
}

fn loose_tier<'de, D>(deserializer: D) -> Result<TierStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(TierStatus::from(loose_string(deserializer)?))
}

fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
