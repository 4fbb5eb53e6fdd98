//! Reconciliation of the in-memory case set.
//!
//! - `load_queue` / `resolve_queue`: full replacement from the listing, or the fallback set
//! - `replace_cases`: apply a reload without reverting completed cases
//! - `poll_case_status` / `merge_status`: per-case enrichment on completion
//! - `sorted_cases`: display order

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::client::{QueueFetch, StatusCheck, StatusData, TriageApi};
use super::mapping::{cases_from_remote, fallback_cases};
use crate::models::{CaseStatus, PatientCase, SortOrder, TriageRecord, Urgency};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Why a load used the fallback set instead of the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    /// The service answered with an empty listing.
    EmptyListing,
    /// Transport failure, non-2xx or malformed body.
    Unavailable(String),
}

/// Where the current case set came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueSource {
    Remote,
    Fallback(FallbackReason),
}

impl QueueSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

/// Result of one queue load. `cases` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLoad {
    pub cases: Vec<PatientCase>,
    pub source: QueueSource,
}

// ═══════════════════════════════════════════════════════════
// Queue load
// ═══════════════════════════════════════════════════════════

/// Turn a listing fetch into the case set to display.
pub fn resolve_queue(
    fetch: QueueFetch,
    local: Option<&TriageRecord>,
    now: DateTime<Utc>,
) -> QueueLoad {
    match fetch {
        QueueFetch::Data(items) => {
            let cases = cases_from_remote(&items);
            tracing::debug!(count = cases.len(), "Loaded patient queue from service");
            QueueLoad {
                cases,
                source: QueueSource::Remote,
            }
        }
        QueueFetch::Empty => {
            tracing::info!("Queue service returned an empty listing, using fallback cases");
            QueueLoad {
                cases: fallback_cases(local, now),
                source: QueueSource::Fallback(FallbackReason::EmptyListing),
            }
        }
        QueueFetch::Failed(e) => {
            tracing::warn!(error = %e, "Queue service unavailable, using fallback cases");
            QueueLoad {
                cases: fallback_cases(local, now),
                source: QueueSource::Fallback(FallbackReason::Unavailable(e.to_string())),
            }
        }
    }
}

/// Fetch the listing and resolve it. Never fails.
pub async fn load_queue(
    api: &dyn TriageApi,
    local: Option<&TriageRecord>,
    now: DateTime<Utc>,
) -> QueueLoad {
    let fetch = api.fetch_queue().await;
    resolve_queue(fetch, local, now)
}

/// Replace the whole set with `incoming`, except that an incoming pending
/// case keeps its already-completed in-memory version.
pub fn replace_cases(current: &[PatientCase], incoming: Vec<PatientCase>) -> Vec<PatientCase> {
    incoming
        .into_iter()
        .map(|case| {
            if case.is_completed() {
                return case;
            }
            match current.iter().find(|c| c.id == case.id && c.is_completed()) {
                Some(done) => done.clone(),
                None => case,
            }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Status poll
// ═══════════════════════════════════════════════════════════

/// Query status for one case. `None` when the case is not pollable (no
/// request is made), still pending, or the query failed.
pub async fn poll_case_status(api: &dyn TriageApi, case: &PatientCase) -> Option<StatusData> {
    if case.is_completed() {
        return None;
    }
    let (user_id, session_id) = case.correlation()?;

    match api.fetch_status(user_id, session_id).await {
        Ok(StatusCheck::Completed(data)) => {
            tracing::debug!(case_id = %case.id, "Triage analysis completed");
            Some(data)
        }
        Ok(StatusCheck::Pending) => {
            tracing::trace!(case_id = %case.id, "No update yet (still pending)");
            None
        }
        Err(e) => {
            tracing::debug!(case_id = %case.id, error = %e, "Status query failed");
            None
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

fn present_list(value: &Option<Vec<String>>) -> Option<Vec<String>> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Merge enrichment into one case and mark it completed. Present remote
/// values win; empty or unrecognised ones keep what the case had.
pub fn apply_status(case: &mut PatientCase, data: &StatusData) {
    if let Some(urgency) = data.urgency.as_deref().and_then(Urgency::parse_loose) {
        case.urgency = urgency;
    }
    if let Some(symptoms) = present(&data.symptoms) {
        case.symptoms = Some(symptoms);
    }
    if let Some(score) = present(&data.urgency_score) {
        case.urgency_score = Some(score);
    }
    if let Some(description) = present(&data.urgency_description) {
        case.urgency_description = Some(description);
    }
    if let Some(actions) = present_list(&data.suggested_actions) {
        case.suggested_actions = Some(actions);
    }
    if let Some(specialties) = present_list(&data.specialties) {
        case.specialties = specialties;
    }
    case.status = CaseStatus::Completed;
}

/// Merge into the case with `id`. Returns false (and changes nothing) when no
/// such case exists or it is already completed.
pub fn merge_status(cases: &mut [PatientCase], id: &str, data: &StatusData) -> bool {
    match cases.iter_mut().find(|c| c.id == id) {
        Some(case) if !case.is_completed() => {
            apply_status(case, data);
            true
        }
        _ => false,
    }
}

/// Cases the status-poll cycle should query this round.
pub fn pollable_cases(cases: &[PatientCase]) -> impl Iterator<Item = &PatientCase> {
    cases.iter().filter(|c| c.is_pollable())
}

// ═══════════════════════════════════════════════════════════
// Sorting
// ═══════════════════════════════════════════════════════════

/// Display order. Urgency is a stable High → Medium → Low sort; time keeps
/// the listing order.
pub fn sorted_cases(cases: &[PatientCase], order: SortOrder) -> Vec<PatientCase> {
    let mut sorted = cases.to_vec();
    if order == SortOrder::Urgency {
        sorted.sort_by_key(|c| c.urgency.rank());
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient_case::fixtures::{completed_case, pending_case};
    use crate::queue::client::{ApiError, RemoteQueueItem};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every status query with a fixed result and counts calls.
    struct FixedStatusApi {
        answer: Option<StatusData>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TriageApi for FixedStatusApi {
        async fn fetch_queue(&self) -> QueueFetch {
            QueueFetch::Empty
        }

        async fn fetch_status(&self, _: &str, _: &str) -> Result<StatusCheck, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Some(data) => Ok(StatusCheck::Completed(data.clone())),
                None => Err(ApiError::Timeout(1)),
            }
        }
    }

    fn low_urgency() -> StatusData {
        StatusData {
            urgency: Some("Low".into()),
            symptoms: Some("Mild rash".into()),
            urgency_score: Some("2/10".into()),
            urgency_description: Some("Non-urgent dermatological complaint".into()),
            suggested_actions: Some(vec!["Book dermatology visit".into()]),
            specialties: Some(vec!["Dermatology".into()]),
        }
    }

    #[test]
    fn empty_and_failed_fetches_fall_back() {
        let now = Utc::now();
        let empty = resolve_queue(QueueFetch::Empty, None, now);
        assert!(!empty.cases.is_empty());
        assert_eq!(empty.source, QueueSource::Fallback(FallbackReason::EmptyListing));

        let failed = resolve_queue(
            QueueFetch::Failed(ApiError::Status { status: 500 }),
            None,
            now,
        );
        assert!(!failed.cases.is_empty());
        assert!(matches!(failed.source, QueueSource::Fallback(FallbackReason::Unavailable(_))));
        assert!(!failed.source.is_remote());
    }

    #[test]
    fn data_fetch_uses_listing() {
        let item = RemoteQueueItem {
            session_id: Some("s-1".into()),
            user_id: Some("u-1".into()),
            urgency: Some("Pending...".into()),
            ..Default::default()
        };
        let load = resolve_queue(QueueFetch::Data(vec![item]), None, Utc::now());
        assert_eq!(load.source, QueueSource::Remote);
        assert_eq!(load.cases.len(), 1);
        assert_eq!(load.cases[0].status, CaseStatus::Pending);
    }

    #[test]
    fn merge_completes_only_matching_case() {
        let mut cases = vec![pending_case("a"), pending_case("b"), completed_case("c", Urgency::High)];
        let before_b = cases[1].clone();
        let before_c = cases[2].clone();

        assert!(merge_status(&mut cases, "a", &low_urgency()));
        assert_eq!(cases[0].status, CaseStatus::Completed);
        assert_eq!(cases[0].urgency, Urgency::Low);
        assert_eq!(cases[0].specialties, vec!["Dermatology"]);
        assert_eq!(cases[0].id, "a");
        assert_eq!(cases[1], before_b);
        assert_eq!(cases[2], before_c);
    }

    #[test]
    fn merge_is_idempotent_on_completed_case() {
        let mut cases = vec![pending_case("a")];
        assert!(merge_status(&mut cases, "a", &low_urgency()));
        let once = cases.clone();

        let other = StatusData {
            urgency: Some("High".into()),
            ..Default::default()
        };
        assert!(!merge_status(&mut cases, "a", &other));
        assert_eq!(cases, once);
    }

    #[test]
    fn merge_unknown_id_changes_nothing() {
        let mut cases = vec![pending_case("a")];
        assert!(!merge_status(&mut cases, "zzz", &low_urgency()));
        assert_eq!(cases[0].status, CaseStatus::Pending);
    }

    #[test]
    fn apply_keeps_existing_values_for_empty_fields() {
        let mut case = pending_case("a");
        case.symptoms = Some("Headache".into());
        let data = StatusData {
            urgency: Some("Unknown".into()),
            symptoms: Some("".into()),
            specialties: Some(vec![]),
            ..Default::default()
        };
        apply_status(&mut case, &data);
        assert_eq!(case.urgency, Urgency::Medium);
        assert_eq!(case.symptoms.as_deref(), Some("Headache"));
        assert_eq!(case.specialties, vec!["General"]);
        assert_eq!(case.status, CaseStatus::Completed);
    }

    #[test]
    fn reload_does_not_revert_completed_case() {
        let mut current = vec![pending_case("a")];
        merge_status(&mut current, "a", &low_urgency());

        let incoming = vec![pending_case("a"), pending_case("new")];
        let replaced = replace_cases(&current, incoming);
        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced[0].status, CaseStatus::Completed);
        assert_eq!(replaced[0].urgency, Urgency::Low);
        assert_eq!(replaced[1].id, "new");
    }

    #[test]
    fn reload_drops_cases_missing_from_listing() {
        let current = vec![completed_case("gone", Urgency::High), pending_case("kept")];
        let replaced = replace_cases(&current, vec![pending_case("kept")]);
        let ids: Vec<&str> = replaced.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["kept"]);
    }

    #[test]
    fn urgency_sort_is_stable() {
        let cases = vec![
            completed_case("A", Urgency::Medium),
            completed_case("B", Urgency::High),
            completed_case("C", Urgency::Medium),
        ];
        let ids: Vec<String> = sorted_cases(&cases, SortOrder::Urgency)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["B", "A", "C"]);

        let ids: Vec<String> = sorted_cases(&cases, SortOrder::Time)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn cases_without_ids_are_never_queried() {
        let api = FixedStatusApi {
            answer: Some(low_urgency()),
            calls: AtomicUsize::new(0),
        };
        let mut no_user = pending_case("a");
        no_user.user_id = None;
        let mut no_session = pending_case("b");
        no_session.session_id = None;

        assert!(poll_case_status(&api, &no_user).await.is_none());
        assert!(poll_case_status(&api, &no_session).await.is_none());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pollable_cases(&[no_user, no_session]).count(), 0);
    }

    #[tokio::test]
    async fn completed_case_is_not_queried() {
        let api = FixedStatusApi {
            answer: Some(low_urgency()),
            calls: AtomicUsize::new(0),
        };
        let mut case = pending_case("a");
        case.status = CaseStatus::Completed;
        assert!(poll_case_status(&api, &case).await.is_none());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_query_is_no_update() {
        let api = FixedStatusApi {
            answer: None,
            calls: AtomicUsize::new(0),
        };
        assert!(poll_case_status(&api, &pending_case("a")).await.is_none());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_queue_falls_back_on_empty_listing() {
        let api = FixedStatusApi {
            answer: None,
            calls: AtomicUsize::new(0),
        };
        let load = load_queue(&api, None, Utc::now()).await;
        assert_eq!(load.cases[0].id, "1");
    }
}
