use serde::{Deserialize, Serialize};

use super::enums::{CaseStatus, Urgency};

pub const DEFAULT_PATIENT_NAME: &str = "Patient";
pub const DEFAULT_PATIENT_AGE: u32 = 35;
pub const GENERAL_SPECIALTY: &str = "General";

/// One patient's triage record as tracked by the provider queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCase {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub name: String,
    pub age: u32,
    pub urgency: Urgency,
    /// Relative age string, computed once at load/update time.
    pub timestamp: String,
    pub specialties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<Vec<String>>,
    pub status: CaseStatus,
}

impl PatientCase {
    pub fn is_completed(&self) -> bool {
        self.status == CaseStatus::Completed
    }

    /// Correlation ids for the status endpoint, when both are present.
    pub fn correlation(&self) -> Option<(&str, &str)> {
        let user_id = self.user_id.as_deref().filter(|s| !s.is_empty())?;
        let session_id = self.session_id.as_deref().filter(|s| !s.is_empty())?;
        Some((user_id, session_id))
    }

    /// Only pending cases carrying both correlation ids are polled.
    pub fn is_pollable(&self) -> bool {
        !self.is_completed() && self.correlation().is_some()
    }
}

/// First usable label among the candidates, else `"General"`.
/// Empty strings and the `—` placeholder do not count.
pub fn specialties_or_general<'a, I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty() && *s != "—")
        .map(|s| vec![s.to_string()])
        .unwrap_or_else(|| vec![GENERAL_SPECIALTY.to_string()])
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn pending_case(id: &str) -> PatientCase {
        PatientCase {
            id: id.to_string(),
            user_id: Some(format!("user-{id}")),
            session_id: Some(id.to_string()),
            name: DEFAULT_PATIENT_NAME.to_string(),
            age: DEFAULT_PATIENT_AGE,
            urgency: Urgency::Medium,
            timestamp: "Just now".to_string(),
            specialties: vec![GENERAL_SPECIALTY.to_string()],
            symptoms: None,
            urgency_score: Some("5/10".to_string()),
            urgency_description: None,
            suggested_actions: None,
            status: CaseStatus::Pending,
        }
    }

    pub fn completed_case(id: &str, urgency: Urgency) -> PatientCase {
        PatientCase {
            user_id: None,
            session_id: None,
            urgency,
            status: CaseStatus::Completed,
            ..pending_case(id)
        }
    }
}
