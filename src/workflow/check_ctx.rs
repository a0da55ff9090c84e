//! Check context
//!
//! Wraps "which applicant this cycle is checking"

use std::fmt::Display;

use crate::models::StatusRecord;

/// Immutable inputs of one check cycle
#[derive(Debug, Clone)]
pub struct CheckCtx {
    pub user_id: i64,
    pub lastname: String,
    pub confirmation_number: String,
    pub birth_year: String,
}

impl CheckCtx {
    pub fn from_record(record: &StatusRecord) -> Self {
        Self {
            user_id: record.user_id,
            lastname: record.lastname.clone(),
            confirmation_number: record.confirmation_number.clone(),
            birth_year: record.birth_year.clone(),
        }
    }
}

impl Display for CheckCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[user #{} {}]", self.user_id, self.lastname)
    }
}
