use std::time::Duration;

use async_trait::async_trait;

use super::TriageError;
use crate::config::DEFAULT_ANALYSIS_DELAY_MS;
use crate::models::Urgency;

/// Outcome of analysing one voice capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageAnalysis {
    pub urgency: Urgency,
    pub symptoms: Option<String>,
    pub urgency_score: Option<String>,
    pub urgency_description: Option<String>,
    pub suggested_actions: Vec<String>,
    pub specialties: Vec<String>,
}

/// Turns a finished recording into a triage assessment.
#[async_trait]
pub trait TriageAnalyzer: Send + Sync {
    async fn analyze(&self) -> Result<TriageAnalysis, TriageError>;
}

/// Stand-in analyzer: waits, then returns a fixed neurological assessment.
pub struct SimulatedAnalyzer {
    delay: Duration,
}

impl SimulatedAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    fn canned() -> TriageAnalysis {
        TriageAnalysis {
            urgency: Urgency::High,
            symptoms: Some(
                "Severe headache, blurred vision, dizziness, difficulty breathing".into(),
            ),
            urgency_score: Some("8/10".into()),
            urgency_description: Some(
                "Symptoms suggest time-sensitive neurovascular event or severe systemic crisis."
                    .into(),
            ),
            suggested_actions: vec![
                "Activate EMS and transfer to ED".into(),
                "Request BP and SpO2 if caregiver present".into(),
                "Screen for focal neurological deficits".into(),
            ],
            specialties: vec!["Neurological".into(), "Neurologist".into()],
        }
    }
}

impl Default for SimulatedAnalyzer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_ANALYSIS_DELAY_MS))
    }
}

#[async_trait]
impl TriageAnalyzer for SimulatedAnalyzer {
    async fn analyze(&self) -> Result<TriageAnalysis, TriageError> {
        tokio::time::sleep(self.delay).await;
        Ok(Self::canned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_result_is_high_neuro() {
        let analysis = SimulatedAnalyzer::new(Duration::ZERO).analyze().await.unwrap();
        assert_eq!(analysis.urgency, Urgency::High);
        assert_eq!(analysis.urgency_score.as_deref(), Some("8/10"));
        assert_eq!(analysis.suggested_actions.len(), 3);
        assert_eq!(analysis.specialties, vec!["Neurological", "Neurologist"]);
    }

    #[tokio::test]
    async fn simulated_analysis_waits_for_delay() {
        let delay = Duration::from_millis(30);
        let started = std::time::Instant::now();
        SimulatedAnalyzer::new(delay).analyze().await.unwrap();
        assert!(started.elapsed() >= delay);
    }

    #[test]
    fn default_delay_matches_config() {
        assert_eq!(
            SimulatedAnalyzer::default().delay,
            Duration::from_millis(DEFAULT_ANALYSIS_DELAY_MS)
        );
    }
}
