//! Concept Scorers
//!
//! Pure functions from a deduplicated concept list to one facet each:
//! - [`EngagementScorer`]: 0-100 engagement score
//! - [`ActivityClassifier`]: one activity category
//! - [`SafetyAssessor`]: safety issues and score
//! - [`AttendanceEstimator`]: approximate head count
//!
//! None of them fail: "no indicator matched" is a valid zero result.
//! [`ConceptScorer`] applies all four to one backend's concepts.

pub mod activity;
pub mod attendance;
pub mod engagement;
pub mod safety;

pub use activity::ActivityClassifier;
pub use attendance::AttendanceEstimator;
pub use engagement::EngagementScorer;
pub use safety::SafetyAssessor;

use crate::config::AnalysisConfig;
use crate::types::{BackendAnalysis, Concept};
use tracing::debug;

/// All four scorers, built once from configuration
#[derive(Debug, Clone, Default)]
pub struct ConceptScorer {
    engagement: EngagementScorer,
    activity: ActivityClassifier,
    safety: SafetyAssessor,
    attendance: AttendanceEstimator,
}

impl ConceptScorer {
    pub fn new(
        engagement: EngagementScorer,
        activity: ActivityClassifier,
        safety: SafetyAssessor,
        attendance: AttendanceEstimator,
    ) -> Self {
        Self {
            engagement,
            activity,
            safety,
            attendance,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            EngagementScorer::from_config(&config.engagement),
            ActivityClassifier::from_config(&config.activity),
            SafetyAssessor::from_config(&config.safety),
            AttendanceEstimator::from_config(&config.attendance),
        )
    }

    /// Score one backend's deduplicated concepts
    pub fn score(&self, backend: &str, concepts: &[Concept]) -> BackendAnalysis {
        let analysis = BackendAnalysis {
            backend: backend.to_string(),
            concept_count: concepts.len(),
            engagement: self.engagement.score(concepts),
            activity: self.activity.classify(concepts),
            safety: self.safety.assess(concepts),
            attendance: self.attendance.estimate(concepts),
        };

        debug!(
            backend = backend,
            concepts = analysis.concept_count,
            engagement = analysis.engagement.score,
            activity = %analysis.activity.activity_type,
            safe = analysis.safety.safe,
            attendance = analysis.attendance.estimated_count,
            "Scored backend concepts"
        );

        analysis
    }
}
