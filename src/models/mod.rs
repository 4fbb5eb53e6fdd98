pub mod enums;
pub mod patient_case;
pub mod triage_record;

pub use enums::*;
pub use patient_case::*;
pub use triage_record::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Corrupt triage record: {0}")]
    CorruptRecord(String),
}
