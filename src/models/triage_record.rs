use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{CaseStatus, Urgency};
use super::patient_case::{
    PatientCase, DEFAULT_PATIENT_AGE, DEFAULT_PATIENT_NAME, GENERAL_SPECIALTY,
};
use super::ModelError;
use crate::relative_time::format_relative;

/// Id used for a stored capture that carries no correlation ids.
pub const LOCAL_CASE_ID: &str = "latest-triage";

/// The triage capture as persisted in the local store.
///
/// Every field except `timestamp` is optional so that older or partial
/// records still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialties: Option<Vec<String>>,
    /// Absolute capture time, RFC 3339.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
}

impl TriageRecord {
    pub fn captured_at(&self) -> Result<DateTime<Utc>, ModelError> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ModelError::CorruptRecord(format!("timestamp {:?}: {e}", self.timestamp)))
    }

    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Build the queue case for this record, with its age relative to `now`.
    pub fn to_case(&self, now: DateTime<Utc>) -> Result<PatientCase, ModelError> {
        let captured_at = self.captured_at()?;
        let session_id = Self::non_empty(&self.session_id);
        let user_id = Self::non_empty(&self.user_id);
        let correlated = session_id.is_some() && user_id.is_some();

        let status = match self.status {
            Some(CaseStatus::Pending) if !correlated => {
                return Err(ModelError::CorruptRecord(
                    "pending record without userId and sessionId".into(),
                ));
            }
            Some(status) => status,
            None if correlated => CaseStatus::Pending,
            None => CaseStatus::Completed,
        };

        let specialties: Vec<String> = self
            .specialties
            .iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect();

        Ok(PatientCase {
            id: session_id.or(user_id).unwrap_or(LOCAL_CASE_ID).to_string(),
            user_id: user_id.map(str::to_string),
            session_id: session_id.map(str::to_string),
            name: Self::non_empty(&self.name)
                .unwrap_or(DEFAULT_PATIENT_NAME)
                .to_string(),
            age: self.age.unwrap_or(DEFAULT_PATIENT_AGE),
            urgency: Urgency::from_remote(self.urgency.as_deref()),
            timestamp: format_relative(captured_at, now),
            specialties: if specialties.is_empty() {
                vec![GENERAL_SPECIALTY.to_string()]
            } else {
                specialties
            },
            symptoms: self.symptoms.clone(),
            urgency_score: self.urgency_score.clone(),
            urgency_description: self.urgency_description.clone(),
            suggested_actions: self.suggested_actions.clone(),
            status,
        })
    }
}
