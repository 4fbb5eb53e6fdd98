//! Voice triage recorder.
//!
//! `idle --begin--> recording --end--> processing --resolve--> idle`
//!
//! Calls made from the wrong state do nothing and report
//! [`Transition::Ignored`] with the state they found.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::analyzer::{TriageAnalysis, TriageAnalyzer};
use super::{new_session_id, new_user_id};
use crate::models::{CaseStatus, TriageRecord, TriageStatus};
use crate::store::{write_latest_record, LocalStore};

/// Result of a state-machine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T = ()> {
    Applied(T),
    /// The call was not valid in `from`; nothing changed.
    Ignored { from: TriageStatus },
}

impl<T> Transition<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

struct RecorderState {
    status: TriageStatus,
    last_result: Option<TriageRecord>,
}

pub struct TriageRecorder {
    analyzer: Arc<dyn TriageAnalyzer>,
    store: Arc<dyn LocalStore>,
    state: Mutex<RecorderState>,
}

impl TriageRecorder {
    pub fn new(analyzer: Arc<dyn TriageAnalyzer>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            analyzer,
            store,
            state: Mutex::new(RecorderState {
                status: TriageStatus::Idle,
                last_result: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        lock_state(&self.state)
    }

    pub fn status(&self) -> TriageStatus {
        self.lock().status
    }

    /// Most recent successfully analysed capture, persisted or not.
    pub fn last_result(&self) -> Option<TriageRecord> {
        self.lock().last_result.clone()
    }

    /// Start recording. Only valid while idle.
    pub fn begin(&self) -> Transition {
        let mut state = self.lock();
        if state.status != TriageStatus::Idle {
            tracing::debug!(from = %state.status, "Ignoring begin");
            return Transition::Ignored { from: state.status };
        }
        state.status = TriageStatus::Recording;
        tracing::info!("Triage recording started");
        Transition::Applied(())
    }

    /// Stop recording and analyse it. Only valid while recording.
    ///
    /// Resolves once the recorder is idle again. `Applied(None)` means the
    /// analysis failed and nothing was produced. A failed store write still
    /// yields the record.
    pub async fn end(&self) -> Transition<Option<TriageRecord>> {
        {
            let mut state = self.lock();
            if state.status != TriageStatus::Recording {
                tracing::debug!(from = %state.status, "Ignoring end");
                return Transition::Ignored { from: state.status };
            }
            state.status = TriageStatus::Processing;
        }
        tracing::info!("Triage recording stopped, analysing");

        // Returns the recorder to idle if this future is dropped mid-analysis.
        let guard = ProcessingGuard {
            state: &self.state,
            armed: true,
        };
        let analysis = self.analyzer.analyze().await;

        let record = match analysis {
            Ok(analysis) => {
                let record = pending_record(analysis);
                let persisted = write_latest_record(self.store.as_ref(), &record);
                tracing::info!(
                    session_id = ?record.session_id,
                    urgency = ?record.urgency,
                    persisted,
                    "Triage capture complete"
                );
                Some(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Triage analysis failed, discarding capture");
                None
            }
        };

        guard.disarm();
        let mut state = self.lock();
        state.status = TriageStatus::Idle;
        if let Some(record) = &record {
            state.last_result = Some(record.clone());
        }
        Transition::Applied(record)
    }
}

// State is plain data; a panicked holder cannot leave it half-updated.
fn lock_state(state: &Mutex<RecorderState>) -> MutexGuard<'_, RecorderState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resets `Processing` to `Idle` on drop unless disarmed.
struct ProcessingGuard<'a> {
    state: &'a Mutex<RecorderState>,
    armed: bool,
}

impl ProcessingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock_state(self.state);
        if state.status == TriageStatus::Processing {
            state.status = TriageStatus::Idle;
            tracing::warn!("Triage analysis cancelled, recorder reset to idle");
        }
    }
}

/// A fresh pending record with new correlation ids, stamped now.
fn pending_record(analysis: TriageAnalysis) -> TriageRecord {
    TriageRecord {
        session_id: Some(new_session_id()),
        user_id: Some(new_user_id()),
        name: None,
        age: None,
        urgency: Some(analysis.urgency.as_str().to_string()),
        symptoms: analysis.symptoms,
        urgency_score: analysis.urgency_score,
        urgency_description: analysis.urgency_description,
        suggested_actions: Some(analysis.suggested_actions).filter(|a| !a.is_empty()),
        specialties: Some(analysis.specialties).filter(|s| !s.is_empty()),
        timestamp: Utc::now().to_rfc3339(),
        status: Some(CaseStatus::Pending),
    }
}
