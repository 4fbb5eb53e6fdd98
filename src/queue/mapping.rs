//! Field mapping from remote listing entries and the local store to
//! [`PatientCase`], plus the fixed fallback case.

use chrono::{DateTime, Utc};

use super::client::RemoteQueueItem;
use crate::models::{
    specialties_or_general, CaseStatus, PatientCase, TriageRecord, Urgency,
    DEFAULT_PATIENT_AGE, DEFAULT_PATIENT_NAME,
};

/// Listing `time` used when the service sends none.
pub const JUST_NOW: &str = "Just now";

/// Listing `summary` placeholder while the patient has not spoken yet.
const SUMMARY_PLACEHOLDER: &str = "Waiting for voice input...";

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Map one listing entry. `index` is its position in the listing and only
/// names the case when the entry has neither `sessionId` nor `userId`.
pub fn case_from_remote(item: &RemoteQueueItem, index: usize) -> PatientCase {
    let pending = Urgency::is_pending_marker(item.urgency.as_deref());
    let urgency = Urgency::from_remote(item.urgency.as_deref());
    let session_id = non_empty(&item.session_id);
    let user_id = non_empty(&item.user_id);

    let summary = non_empty(&item.summary)
        .filter(|s| *s != SUMMARY_PLACEHOLDER)
        .map(str::to_string);

    let id = session_id
        .or(user_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("queue-{index}"));

    // Pending only with both correlation ids.
    let status = if pending && session_id.is_some() && user_id.is_some() {
        CaseStatus::Pending
    } else {
        if pending {
            tracing::debug!(case_id = %id, "Pending entry lacks correlation ids, listing as completed");
        }
        CaseStatus::Completed
    };

    PatientCase {
        id,
        user_id: user_id.map(str::to_string),
        session_id: session_id.map(str::to_string),
        name: non_empty(&item.name)
            .unwrap_or(DEFAULT_PATIENT_NAME)
            .to_string(),
        age: DEFAULT_PATIENT_AGE,
        urgency,
        timestamp: non_empty(&item.time).unwrap_or(JUST_NOW).to_string(),
        specialties: specialties_or_general([
            item.specialist.as_deref(),
            item.category.as_deref(),
        ]),
        symptoms: summary.clone(),
        urgency_score: Some(urgency.default_score().to_string()),
        urgency_description: summary,
        suggested_actions: non_empty(&item.suggested_action).map(|a| vec![a.to_string()]),
        status,
    }
}

/// Map a full listing, keeping its order.
pub fn cases_from_remote(items: &[RemoteQueueItem]) -> Vec<PatientCase> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| case_from_remote(item, index))
        .collect()
}

/// The fixed demonstration case shown whenever the service has no data.
pub fn mock_case() -> PatientCase {
    PatientCase {
        id: "1".to_string(),
        user_id: None,
        session_id: None,
        name: "Maria Santos".to_string(),
        age: 42,
        urgency: Urgency::High,
        timestamp: "10 secs ago".to_string(),
        specialties: vec!["Neurological".to_string(), "Neurologist".to_string()],
        symptoms: Some(
            "Acute onset of severe, retro-orbital headache, concurrent with blurry vision, \
             dizziness, and subjective difficulty breathing."
                .to_string(),
        ),
        urgency_score: Some("8/10".to_string()),
        urgency_description: Some(
            "Sudden onset of severe neurological symptoms (headache, vision changes) paired \
             with reported respiratory distress is highly indicative of a time-sensitive \
             neurovascular event (e.g., CVA) or severe systemic crisis."
                .to_string(),
        ),
        suggested_actions: Some(vec![
            "Immediate EMS activation and transfer to Emergency Department (ED).".to_string(),
            "Request immediate BP and SpO2 readings if caregiver present.".to_string(),
            "Screen for focal neurological deficits (e.g., facial asymmetry, unilateral limb drift)."
                .to_string(),
        ]),
        status: CaseStatus::Completed,
    }
}

/// Fallback set: the local capture (if usable) first, then the mock case.
/// Never empty.
pub fn fallback_cases(local: Option<&TriageRecord>, now: DateTime<Utc>) -> Vec<PatientCase> {
    let mut cases = Vec::with_capacity(2);
    if let Some(record) = local {
        match record.to_case(now) {
            Ok(case) => cases.push(case),
            Err(e) => tracing::warn!(error = %e, "Skipping unusable local triage record"),
        }
    }
    cases.push(mock_case());
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(urgency: Option<&str>) -> RemoteQueueItem {
        RemoteQueueItem {
            name: Some("Joao Silva".into()),
            urgency: urgency.map(str::to_string),
            time: Some("2 mins ago".into()),
            category: Some("Respiratory".into()),
            summary: Some("Persistent cough for a week".into()),
            specialist: Some("Pulmonologist".into()),
            suggested_action: Some("Schedule chest X-ray".into()),
            user_id: Some("u-7".into()),
            session_id: Some("s-7".into()),
        }
    }

    #[test]
    fn pending_marker_maps_to_medium_pending() {
        let case = case_from_remote(&item(Some("Pending...")), 0);
        assert_eq!(case.urgency, Urgency::Medium);
        assert_eq!(case.status, CaseStatus::Pending);
        assert_eq!(case.urgency_score.as_deref(), Some("5/10"));
        assert!(case.is_pollable());
    }

    #[test]
    fn completed_entry_maps_all_fields() {
        let case = case_from_remote(&item(Some("high")), 0);
        assert_eq!(case.id, "s-7");
        assert_eq!(case.name, "Joao Silva");
        assert_eq!(case.age, 35);
        assert_eq!(case.urgency, Urgency::High);
        assert_eq!(case.timestamp, "2 mins ago");
        assert_eq!(case.specialties, vec!["Pulmonologist"]);
        assert_eq!(case.symptoms.as_deref(), Some("Persistent cough for a week"));
        assert_eq!(case.urgency_description, case.symptoms);
        assert_eq!(case.urgency_score.as_deref(), Some("8/10"));
        assert_eq!(case.suggested_actions, Some(vec!["Schedule chest X-ray".to_string()]));
        assert_eq!(case.status, CaseStatus::Completed);
    }

    #[test]
    fn sparse_entry_gets_defaults() {
        let case = case_from_remote(&RemoteQueueItem::default(), 3);
        assert_eq!(case.id, "queue-3");
        assert_eq!(case.name, "Patient");
        assert_eq!(case.urgency, Urgency::Medium);
        assert_eq!(case.timestamp, JUST_NOW);
        assert_eq!(case.specialties, vec!["General"]);
        assert!(case.symptoms.is_none());
        assert!(case.suggested_actions.is_none());
        assert_eq!(case.status, CaseStatus::Completed);
        assert!(!case.is_pollable());
    }

    #[test]
    fn pending_entry_without_both_ids_is_not_pending() {
        let bare = RemoteQueueItem {
            urgency: Some("Pending...".into()),
            ..Default::default()
        };
        let case = case_from_remote(&bare, 0);
        assert_eq!(case.status, CaseStatus::Completed);
        assert_eq!(case.urgency, Urgency::Medium);

        let mut half = item(Some("pending"));
        half.user_id = None;
        let case = case_from_remote(&half, 1);
        assert_eq!(case.id, "s-7");
        assert_eq!(case.status, CaseStatus::Completed);
        assert!(!case.is_pollable());
    }

    #[test]
    fn mapped_pending_cases_always_carry_both_ids() {
        let listing = vec![
            item(Some("Pending...")),
            RemoteQueueItem {
                urgency: Some("pending".into()),
                session_id: Some("s-9".into()),
                ..Default::default()
            },
            RemoteQueueItem {
                urgency: Some("Pending...".into()),
                ..Default::default()
            },
        ];
        for case in cases_from_remote(&listing) {
            if case.status == CaseStatus::Pending {
                assert!(case.correlation().is_some(), "case {} lacks ids", case.id);
            }
        }
    }

    #[test]
    fn id_falls_back_to_user_id() {
        let mut entry = item(Some("Low"));
        entry.session_id = None;
        let case = case_from_remote(&entry, 0);
        assert_eq!(case.id, "u-7");
        assert_eq!(case.urgency_score.as_deref(), Some("2/10"));
    }

    #[test]
    fn placeholder_summary_and_dash_specialist_are_ignored() {
        let mut entry = item(Some("Pending..."));
        entry.summary = Some("Waiting for voice input...".into());
        entry.specialist = Some("—".into());
        let case = case_from_remote(&entry, 0);
        assert!(case.symptoms.is_none());
        assert!(case.urgency_description.is_none());
        assert_eq!(case.specialties, vec!["Respiratory"]);
    }

    #[test]
    fn listing_order_is_preserved() {
        let mut second = item(Some("Low"));
        second.session_id = Some("s-8".into());
        let cases = cases_from_remote(&[item(Some("High")), second]);
        let ids: Vec<&str> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["s-7", "s-8"]);
    }

    #[test]
    fn fallback_without_local_is_mock_only() {
        let cases = fallback_cases(None, Utc::now());
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "1");
        assert_eq!(cases[0].name, "Maria Santos");
    }

    #[test]
    fn fallback_prepends_local_capture() {
        let now = Utc::now();
        let record = TriageRecord {
            session_id: Some("session-9".into()),
            user_id: Some("user-9".into()),
            name: None,
            age: None,
            urgency: Some("High".into()),
            symptoms: None,
            urgency_score: None,
            urgency_description: None,
            suggested_actions: None,
            specialties: None,
            timestamp: (now - Duration::seconds(45)).to_rfc3339(),
            status: Some(CaseStatus::Pending),
        };
        let cases = fallback_cases(Some(&record), now);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, "session-9");
        assert_eq!(cases[0].timestamp, "45 secs ago");
        assert_eq!(cases[1].id, "1");
    }

    #[test]
    fn fallback_skips_corrupt_local_capture() {
        let mut record: TriageRecord =
            serde_json::from_str(r#"{"timestamp": "not a time"}"#).unwrap();
        record.status = None;
        let cases = fallback_cases(Some(&record), Utc::now());
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "1");
    }
}
