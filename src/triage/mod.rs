//! Triage capture: voice recording state machine and the analysis step that
//! turns a recording into a pending triage record.

pub mod analyzer;
pub mod recorder;

pub use analyzer::{SimulatedAnalyzer, TriageAnalysis, TriageAnalyzer};
pub use recorder::{Transition, TriageRecorder};

use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

/// Length of the random suffix on generated correlation ids.
const ID_SUFFIX_LEN: usize = 9;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Voice analysis failed: {0}")]
    Analysis(String),

    #[error("Voice analysis unavailable: {0}")]
    Unavailable(String),
}

/// `{prefix}-{unix millis}-{9 random alphanumerics}`.
fn correlation_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}-{millis}-{}", suffix.to_ascii_lowercase())
}

/// Fresh session id for a new capture.
pub fn new_session_id() -> String {
    correlation_id("session")
}

/// Fresh user id for a new capture.
pub fn new_user_id() -> String {
    correlation_id("user")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_has_prefix_millis_and_suffix() {
        let id = new_session_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn ids_do_not_collide() {
        let ids: HashSet<String> = (0..500).map(|_| new_user_id()).collect();
        assert_eq!(ids.len(), 500);
    }
}
