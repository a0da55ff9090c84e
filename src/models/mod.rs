pub mod applicant;
pub mod record;

pub use applicant::NewApplicant;
pub use record::{CheckOutcome, RecordField, StatusRecord};
