use crate::errors::ProfileError;
use crate::models::{CaseNote, Profile};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use tracing::{error, info};

pub const LOAD_ERROR_MESSAGE: &str = "Failed to load data";

/// Decodes a host payload. The host sends either a JSON document or a JSON
/// string holding one; the latter is unwrapped once.
pub fn decode_payload(raw: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(raw)? {
        Value::String(text) => serde_json::from_str(&text),
        other => Ok(other),
    }
}

pub fn profile_from_value(value: Value) -> Result<Profile, ProfileError> {
    if !value.is_object() {
        return Err(ProfileError::MalformedInput(format!(
            "expected an object, got {}",
            value_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|err| ProfileError::MalformedInput(err.to_string()))
}

pub fn parse_profile(raw: &str) -> Result<Profile, ProfileError> {
    let value = decode_payload(raw).map_err(|err| ProfileError::MalformedInput(err.to_string()))?;
    profile_from_value(value)
}

pub fn case_note_from_value(value: Value) -> Result<CaseNote, ProfileError> {
    if !value.is_object() {
        return Err(ProfileError::InvalidCaseNote(format!(
            "expected an object, got {}",
            value_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|err| ProfileError::InvalidCaseNote(err.to_string()))
}

pub fn parse_case_note(raw: &str) -> Result<CaseNote, ProfileError> {
    let value =
        decode_payload(raw).map_err(|err| ProfileError::InvalidCaseNote(err.to_string()))?;
    case_note_from_value(value)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The active render session. Holds the one profile the page shows plus the
/// visible error and host diagnostic, if any.
#[derive(Debug, Default)]
pub struct Session {
    profile: Option<Profile>,
    error: Option<String>,
    notice: Option<String>,
}

impl Session {
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: Option<String>) {
        self.notice = notice;
    }

    /// Replaces the active profile wholesale.
    pub fn load_profile(&mut self, profile: Profile) {
        info!(
            case_notes = profile.case_notes.len(),
            programs = profile.programs.len(),
            attendance = profile.attendance.len(),
            "contact data loaded"
        );
        self.profile = Some(profile);
        self.error = None;
    }

    /// Loads a raw host payload. On failure the previous profile stays active
    /// and the visible error state is set.
    pub fn load_contact(&mut self, raw: &str) -> Result<(), ProfileError> {
        self.load_result(parse_profile(raw))
    }

    /// Loads a raw request body. Bytes that are not UTF-8 are malformed input.
    pub fn load_contact_bytes(&mut self, body: &[u8]) -> Result<(), ProfileError> {
        match std::str::from_utf8(body) {
            Ok(raw) => self.load_contact(raw),
            Err(err) => self.load_result(Err(ProfileError::MalformedInput(err.to_string()))),
        }
    }

    pub fn load_value(&mut self, value: Value) -> Result<(), ProfileError> {
        self.load_result(profile_from_value(value))
    }

    fn load_result(&mut self, parsed: Result<Profile, ProfileError>) -> Result<(), ProfileError> {
        match parsed {
            Ok(profile) => {
                self.load_profile(profile);
                Ok(())
            }
            Err(err) => {
                error!(%err, "error loading data");
                self.error = Some(LOAD_ERROR_MESSAGE.to_string());
                Err(err)
            }
        }
    }

    pub fn add_case_note(&mut self, raw: &str) -> Result<&CaseNote, ProfileError> {
        self.add_case_note_at(Local::now().date_naive(), raw)
    }

    pub fn add_case_note_bytes(&mut self, body: &[u8]) -> Result<&CaseNote, ProfileError> {
        self.add_case_note_bytes_at(Local::now().date_naive(), body)
    }

    pub fn add_case_note_bytes_at(&mut self, today: NaiveDate, body: &[u8]) -> Result<&CaseNote, ProfileError> {
        match std::str::from_utf8(body) {
            Ok(raw) => self.add_case_note_at(today, raw),
            Err(err) => {
                let err = ProfileError::InvalidCaseNote(err.to_string());
                error!(%err, "rejected case note");
                Err(err)
            }
        }
    }

    /// Prepends a case note, creating an empty profile first if none is
    /// active. Invalid payloads leave the session untouched.
    pub fn add_case_note_at(&mut self, today: NaiveDate, raw: &str) -> Result<&CaseNote, ProfileError> {
        let note = match parse_case_note(raw) {
            Ok(note) => note.with_defaults(today),
            Err(err) => {
                error!(%err, received = raw, "rejected case note");
                return Err(err);
            }
        };
        Ok(self.prepend_case_note(note))
    }

    pub fn prepend_case_note(&mut self, note: CaseNote) -> &CaseNote {
        let profile = self.profile.get_or_insert_with(Profile::default);
        profile.case_notes.insert(0, note);
        info!(subject = profile.case_notes[0].subject(), "case note added");
        &profile.case_notes[0]
    }
}
