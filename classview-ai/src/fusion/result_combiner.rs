//! Result Combiner
//!
//! Merges per-backend scorer outputs into one analysis record.
//!
//! # Fusion Strategy
//! - **One backend:** facets pass through unchanged; overall confidence is
//!   that backend's engagement confidence
//! - **Two backends:** numeric fields (engagement score and confidence,
//!   attendance count and confidence) are a weighted average with weights
//!   normalized by their sum
//! - **Activity:** taken from the primary, unless the primary reports
//!   `other` and the secondary a concrete type (fallback, never a blend)
//! - **Safety:** taken from the primary (issue lists are not averaged)
//! - **No backend:** `AnalysisError::Scoring`
//!
//! A backend that produced zero concepts counts as absent.
//!
//! # Example Calculation
//! Primary engagement confidence 0.8, secondary 0.6, weights 0.6/0.4:
//!
//! overall = 0.8 * 0.6 + 0.6 * 0.4 = 0.48 + 0.24 = 0.72

use crate::error::AnalysisError;
use crate::types::{
    ActivityClassification, ActivityType, AttendanceEstimate, BackendAnalysis, CombinedAnalysis,
    EngagementScore,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative weight of each backend in numeric blends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendWeights {
    pub primary: f32,
    pub secondary: f32,
}

impl Default for BackendWeights {
    fn default() -> Self {
        Self {
            primary: 0.6,
            secondary: 0.4,
        }
    }
}

impl BackendWeights {
    pub fn new(primary: f32, secondary: f32) -> Self {
        Self { primary, secondary }
    }

    /// Weights must be finite, non-negative and not both zero
    pub fn validate(&self) -> Result<(), String> {
        if !self.primary.is_finite() || !self.secondary.is_finite() {
            return Err(format!(
                "weights must be finite (primary={}, secondary={})",
                self.primary, self.secondary
            ));
        }
        if self.primary < 0.0 || self.secondary < 0.0 {
            return Err(format!(
                "weights must be non-negative (primary={}, secondary={})",
                self.primary, self.secondary
            ));
        }
        if self.primary + self.secondary <= 0.0 {
            return Err("at least one weight must be positive".to_string());
        }
        Ok(())
    }

    /// Weights scaled to sum to 1.0
    pub fn normalized(&self) -> (f32, f32) {
        let total = self.primary + self.secondary;
        (self.primary / total, self.secondary / total)
    }
}

/// Combines one or two [`BackendAnalysis`] records
#[derive(Debug, Clone, Default)]
pub struct ResultCombiner {
    weights: BackendWeights,
}

impl ResultCombiner {
    pub fn new(weights: BackendWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> BackendWeights {
        self.weights
    }

    /// Combine primary and secondary outputs
    ///
    /// # Errors
    /// - `AnalysisError::Config` if the weights are invalid
    /// - `AnalysisError::Scoring` if neither backend produced concepts
    pub fn combine(
        &self,
        primary: Option<&BackendAnalysis>,
        secondary: Option<&BackendAnalysis>,
    ) -> Result<CombinedAnalysis, AnalysisError> {
        let primary = primary.filter(|a| a.concept_count > 0);
        let secondary = secondary.filter(|a| a.concept_count > 0);

        match (primary, secondary) {
            (Some(p), Some(s)) => self.blend(p, s),
            (Some(only), None) | (None, Some(only)) => Ok(Self::pass_through(only)),
            (None, None) => Err(AnalysisError::Scoring(
                "no backend produced any concepts".to_string(),
            )),
        }
    }

    fn pass_through(analysis: &BackendAnalysis) -> CombinedAnalysis {
        debug!(backend = %analysis.backend, "Single backend result, passing through");
        CombinedAnalysis {
            engagement: analysis.engagement,
            activity: analysis.activity,
            safety: analysis.safety.clone(),
            attendance: analysis.attendance,
            overall_confidence: analysis.engagement.confidence,
            sources: vec![analysis.backend.clone()],
        }
    }

    fn blend(
        &self,
        primary: &BackendAnalysis,
        secondary: &BackendAnalysis,
    ) -> Result<CombinedAnalysis, AnalysisError> {
        self.weights
            .validate()
            .map_err(|e| AnalysisError::Config(format!("backend weights: {}", e)))?;
        let (wp, ws) = self.weights.normalized();
        let mix = |p: f32, s: f32| p * wp + s * ws;

        let engagement = EngagementScore {
            score: mix(primary.engagement.score as f32, secondary.engagement.score as f32)
                .round()
                .clamp(0.0, 100.0) as u32,
            confidence: mix(primary.engagement.confidence, secondary.engagement.confidence)
                .clamp(0.0, 1.0),
        };

        let attendance = AttendanceEstimate {
            estimated_count: mix(
                primary.attendance.estimated_count as f32,
                secondary.attendance.estimated_count as f32,
            )
            .round()
            .max(0.0) as u32,
            confidence: mix(primary.attendance.confidence, secondary.attendance.confidence)
                .clamp(0.0, 1.0),
        };

        let activity = select_activity(&primary.activity, &secondary.activity);

        debug!(
            primary = %primary.backend,
            secondary = %secondary.backend,
            primary_weight = wp,
            secondary_weight = ws,
            engagement = engagement.score,
            activity = %activity.activity_type,
            "Blended backend results"
        );

        Ok(CombinedAnalysis {
            overall_confidence: engagement.confidence,
            engagement,
            activity,
            safety: primary.safety.clone(),
            attendance,
            sources: vec![primary.backend.clone(), secondary.backend.clone()],
        })
    }
}

/// Primary classification unless it is `other` and the secondary is concrete
fn select_activity(
    primary: &ActivityClassification,
    secondary: &ActivityClassification,
) -> ActivityClassification {
    if primary.activity_type == ActivityType::Other
        && secondary.activity_type != ActivityType::Other
    {
        *secondary
    } else {
        *primary
    }
}
