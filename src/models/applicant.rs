use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

static BIRTH_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static CONFIRMATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[0-9A-Z]+$").unwrap());

const MAX_FIELD_LEN: usize = 100;

/// Human-entered identifiers for a new record
#[derive(Debug, Clone, Deserialize)]
pub struct NewApplicant {
    pub lastname: String,
    pub confirmation_number: String,
    pub birth_year: String,
}

impl NewApplicant {
    /// Trim, normalize and check the identifiers
    pub fn validate(self) -> AppResult<Self> {
        let lastname = self.lastname.trim().to_string();
        let confirmation_number = self.confirmation_number.trim().to_uppercase();
        let birth_year = self.birth_year.trim().to_string();

        if lastname.is_empty() || lastname.chars().count() > MAX_FIELD_LEN {
            return Err(AppError::InvalidInput(format!(
                "last name must be 1-{} characters",
                MAX_FIELD_LEN
            )));
        }
        if !BIRTH_YEAR.is_match(&birth_year) {
            return Err(AppError::InvalidInput(format!(
                "birth year must be four digits, got '{}'",
                birth_year
            )));
        }
        if confirmation_number.len() > MAX_FIELD_LEN || !CONFIRMATION.is_match(&confirmation_number) {
            return Err(AppError::InvalidInput(format!(
                "confirmation number must start with the program year, got '{}'",
                confirmation_number
            )));
        }

        Ok(Self {
            lastname,
            confirmation_number,
            birth_year,
        })
    }
}
