use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a status check
///
/// `Unknown` is the cleared/pending state, stored as NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    #[default]
    Unknown,
    /// Not selected
    Denied,
    /// Randomly selected for further processing
    Selected,
}

impl CheckOutcome {
    /// Database representation
    pub fn as_db(self) -> Option<&'static str> {
        match self {
            CheckOutcome::Unknown => None,
            CheckOutcome::Denied => Some("denied"),
            CheckOutcome::Selected => Some("selected"),
        }
    }

    pub fn from_db(value: Option<&str>) -> Self {
        match value {
            Some("denied") => CheckOutcome::Denied,
            Some("selected") => CheckOutcome::Selected,
            _ => CheckOutcome::Unknown,
        }
    }

    /// Boolean view: `None` while pending
    pub fn as_bool(self) -> Option<bool> {
        match self {
            CheckOutcome::Unknown => None,
            CheckOutcome::Denied => Some(false),
            CheckOutcome::Selected => Some(true),
        }
    }

    pub fn is_known(self) -> bool {
        self != CheckOutcome::Unknown
    }

    /// Classify the text of the result page
    pub fn classify(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        if text.contains("not been selected") || text.contains("not selected") {
            Some(CheckOutcome::Denied)
        } else if text.contains("selected") {
            Some(CheckOutcome::Selected)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CheckOutcome::Unknown => "unknown",
            CheckOutcome::Denied => "not selected",
            CheckOutcome::Selected => "selected",
        }
    }
}

/// One tracked applicant
#[derive(Debug, Clone, Default)]
pub struct StatusRecord {
    pub user_id: i64,
    pub lastname: String,
    pub confirmation_number: String,
    pub birth_year: String,
    pub captcha_image: Option<Vec<u8>>,
    pub captcha_result: Option<String>,
    pub check_result: CheckOutcome,
    pub screenshot: Option<Vec<u8>>,
    pub last_update: Option<DateTime<Utc>>,
}

impl StatusRecord {
    /// 4-digit program year prefix of the confirmation number
    pub fn year(&self) -> Option<&str> {
        year_prefix(&self.confirmation_number)
    }

    pub fn is_set(&self, field: RecordField) -> bool {
        match field {
            RecordField::CaptchaImage => has_bytes(&self.captcha_image),
            RecordField::CaptchaResult => self
                .captcha_result
                .as_deref()
                .is_some_and(|s| !s.is_empty()),
            RecordField::CheckResult => self.check_result.is_known(),
            RecordField::Screenshot => has_bytes(&self.screenshot),
        }
    }
}

fn has_bytes(value: &Option<Vec<u8>>) -> bool {
    value.as_ref().is_some_and(|b| !b.is_empty())
}

pub(crate) fn year_prefix(confirmation_number: &str) -> Option<&str> {
    let prefix = confirmation_number.get(..4)?;
    prefix.bytes().all(|b| b.is_ascii_digit()).then_some(prefix)
}

/// Record fields a poller can wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    CaptchaImage,
    CaptchaResult,
    CheckResult,
    Screenshot,
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordField::CaptchaImage => "captcha_image",
            RecordField::CaptchaResult => "captcha_result",
            RecordField::CheckResult => "check_result",
            RecordField::Screenshot => "screenshot",
        };
        f.write_str(name)
    }
}
