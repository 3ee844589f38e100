//! Recommendation Engine
//!
//! Rule set over a combined analysis, evaluated in fixed order:
//! 1. Engagement below `low` → one engagement recommendation
//!    (high priority below `critical`, otherwise medium)
//! 2. Unsafe → one high-priority recommendation per safety issue
//! 3. Estimated attendance below the caller's roster count → one
//!    medium-priority attendance recommendation (skipped without a roster)
//!
//! Output order is rule-evaluation order. Generation never fails.

use crate::types::{
    AnalysisResult, AttendanceEstimate, CombinedAnalysis, EngagementScore, Priority,
    Recommendation, RecommendationType, SafetyAssessment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Warning attached when overall confidence is below the configured floor
pub const LOW_CONFIDENCE_WARNING: &str = "low overall confidence; treat metrics as indicative";

/// Engagement score thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementThresholds {
    /// Scores below this produce a recommendation
    pub low: u32,
    /// Scores below this make it high priority
    pub critical: u32,
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self {
            low: 60,
            critical: 40,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    thresholds: EngagementThresholds,
}

impl RecommendationEngine {
    pub fn new(thresholds: EngagementThresholds) -> Self {
        Self { thresholds }
    }

    /// Recommendations for a freshly combined analysis
    pub fn generate(
        &self,
        analysis: &CombinedAnalysis,
        expected_attendance: Option<u32>,
    ) -> Vec<Recommendation> {
        self.evaluate(
            &analysis.engagement,
            &analysis.safety,
            &analysis.attendance,
            expected_attendance,
        )
    }

    /// Recommendations for a stored result (e.g. a cache hit with a new roster)
    pub fn generate_for_result(
        &self,
        result: &AnalysisResult,
        expected_attendance: Option<u32>,
    ) -> Vec<Recommendation> {
        self.evaluate(
            &result.engagement,
            &result.safety,
            &result.attendance,
            expected_attendance,
        )
    }

    fn evaluate(
        &self,
        engagement: &EngagementScore,
        safety: &SafetyAssessment,
        attendance: &AttendanceEstimate,
        expected_attendance: Option<u32>,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if engagement.score < self.thresholds.low {
            let priority = if engagement.score < self.thresholds.critical {
                Priority::High
            } else {
                Priority::Medium
            };
            recommendations.push(Recommendation {
                rec_type: RecommendationType::Engagement,
                priority,
                suggestion: "increase interactive activities".to_string(),
                reason: "engagement below threshold".to_string(),
            });
        }

        if !safety.safe {
            for issue in &safety.issues {
                recommendations.push(Recommendation {
                    rec_type: RecommendationType::Safety,
                    priority: Priority::High,
                    suggestion: format!("address safety concern: {}", issue.issue_type),
                    reason: format!(
                        "{} detected with confidence {:.2}",
                        issue.issue_type, issue.confidence
                    ),
                });
            }
        }

        if let Some(expected) = expected_attendance {
            if attendance.estimated_count < expected {
                recommendations.push(Recommendation {
                    rec_type: RecommendationType::Attendance,
                    priority: Priority::Medium,
                    suggestion: "follow up on absent students".to_string(),
                    reason: format!(
                        "estimated attendance {} below expected {}",
                        attendance.estimated_count, expected
                    ),
                });
            }
        }

        debug!(
            count = recommendations.len(),
            engagement = engagement.score,
            safe = safety.safe,
            "Generated recommendations"
        );

        recommendations
    }
}

/// Low-confidence warning, if `overall_confidence` is below `floor`
pub fn confidence_warning(overall_confidence: f32, floor: f32) -> Option<String> {
    (overall_confidence < floor).then(|| LOW_CONFIDENCE_WARNING.to_string())
}
