//! Core Types and Trait Definitions for classview-ai
//!
//! Defines the data model of the analysis pipeline:
//! - **Input:** [`Concept`] lists produced by a [`VisionBackend`]
//! - **Per backend:** [`BackendAnalysis`] (engagement, activity, safety, attendance)
//! - **Output:** [`AnalysisResult`] after combination and recommendations
//!
//! Serialized field names are camelCase so stored results match the shape
//! the dashboard reads.

use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Concepts
// ============================================================================

/// Named visual feature with a confidence score, emitted by a vision backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Concept name (e.g. "person", "whiteboard")
    pub name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

impl Concept {
    /// Create new concept with clamped confidence (0.0-1.0)
    ///
    /// NaN confidences become 0.0.
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Deduplicate concepts by name, keeping the maximum confidence
///
/// Multiple backends (or one noisy backend) may emit the same concept.
/// Output preserves first-occurrence order so downstream ordering
/// (e.g. safety issues) is deterministic.
pub fn dedup_concepts(concepts: Vec<Concept>) -> Vec<Concept> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(concepts.len());
    let mut deduped: Vec<Concept> = Vec::with_capacity(concepts.len());

    for concept in concepts {
        let concept = Concept::new(concept.name, concept.confidence);
        match index.get(&concept.name) {
            Some(&i) => {
                if concept.confidence > deduped[i].confidence {
                    deduped[i].confidence = concept.confidence;
                }
            }
            None => {
                index.insert(concept.name.clone(), deduped.len());
                deduped.push(concept);
            }
        }
    }

    deduped
}

// ============================================================================
// Vision Backend Trait
// ============================================================================

/// Image scoring capability
///
/// Every concrete scorer (hosted vision API, local model subprocess, test
/// double) implements this trait; the pipeline is backend-agnostic.
///
/// # Example
/// ```rust,ignore
/// use classview_ai::types::{Concept, VisionBackend};
///
/// struct FixedBackend(Vec<Concept>);
///
/// #[async_trait::async_trait]
/// impl VisionBackend for FixedBackend {
///     fn name(&self) -> &str { "fixed" }
///
///     async fn score(&self, _image: &[u8]) -> Result<Vec<Concept>, BackendError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait VisionBackend: Send + Sync {
    /// Backend name for provenance and logging
    fn name(&self) -> &str;

    /// Score image bytes into a flat concept list
    ///
    /// # Errors
    /// Returns `BackendError` on network, quota, parse or process failure.
    async fn score(&self, image: &[u8]) -> Result<Vec<Concept>, BackendError>;
}

// ============================================================================
// Per-facet Outputs
// ============================================================================

/// Engagement facet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementScore {
    /// Engagement score (0-100)
    pub score: u32,
    /// Mean confidence of matched indicator concepts (0.0-1.0)
    pub confidence: f32,
}

/// Classroom activity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Lecture,
    GroupWork,
    IndividualWork,
    LabWork,
    Other,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Lecture => "lecture",
            ActivityType::GroupWork => "group_work",
            ActivityType::IndividualWork => "individual_work",
            ActivityType::LabWork => "lab_work",
            ActivityType::Other => "other",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity facet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityClassification {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Winning group score divided by the group's indicator count (0.0-1.0)
    pub confidence: f32,
}

/// Unsafe concept detected above the safety threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub confidence: f32,
}

/// Safety facet
///
/// `safe` is authoritative; `score` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub safe: bool,
    pub issues: Vec<SafetyIssue>,
    /// 1 - mean(issue confidence), or 1.0 when no issues
    pub score: f32,
}

/// Attendance facet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEstimate {
    /// Rough head count derived from person-concept confidence
    pub estimated_count: u32,
    pub confidence: f32,
}

/// Scorer outputs for one backend's concept list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAnalysis {
    /// Backend name
    pub backend: String,
    /// Number of deduplicated concepts scored
    pub concept_count: usize,
    pub engagement: EngagementScore,
    pub activity: ActivityClassification,
    pub safety: SafetyAssessment,
    pub attendance: AttendanceEstimate,
}

// ============================================================================
// Recommendations
// ============================================================================

/// Recommendation priority (ordered low < medium < high)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Facet a recommendation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Engagement,
    Safety,
    Attendance,
}

/// Actionable recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub rec_type: RecommendationType,
    pub priority: Priority,
    pub suggestion: String,
    pub reason: String,
}

// ============================================================================
// Pipeline Output
// ============================================================================

/// Combined facets before recommendations are attached
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedAnalysis {
    pub engagement: EngagementScore,
    pub activity: ActivityClassification,
    pub safety: SafetyAssessment,
    pub attendance: AttendanceEstimate,
    /// Weighted blend of backend engagement confidences
    pub overall_confidence: f32,
    /// Backends that contributed, primary first
    pub sources: Vec<String>,
}

/// Full analysis of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub engagement: EngagementScore,
    pub activity: ActivityClassification,
    pub safety: SafetyAssessment,
    pub attendance: AttendanceEstimate,
    pub overall_confidence: f32,
    pub recommendations: Vec<Recommendation>,
    pub computed_at: DateTime<Utc>,
    /// Backends that contributed, primary first
    #[serde(default)]
    pub sources: Vec<String>,
    /// Degraded-path notes (backend unavailable, low confidence)
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_confidence_clamping() {
        assert_eq!(Concept::new("person", 1.5).confidence, 1.0);
        assert_eq!(Concept::new("person", -0.5).confidence, 0.0);
        assert_eq!(Concept::new("person", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_dedup_keeps_max_and_first_position() {
        let concepts = vec![
            Concept::new("person", 0.4),
            Concept::new("whiteboard", 0.7),
            Concept::new("person", 0.9),
            Concept::new("whiteboard", 0.2),
        ];

        let deduped = dedup_concepts(concepts);
        assert_eq!(
            deduped,
            vec![Concept::new("person", 0.9), Concept::new("whiteboard", 0.7)]
        );
    }

    #[test]
    fn test_dedup_clamps_raw_values() {
        let raw = Concept {
            name: "fire".to_string(),
            confidence: 3.0,
        };
        let deduped = dedup_concepts(vec![raw]);
        assert_eq!(deduped[0].confidence, 1.0);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_activity_type_serialization() {
        let json = serde_json::to_string(&ActivityType::GroupWork).unwrap();
        assert_eq!(json, "\"group_work\"");
        assert_eq!(ActivityType::LabWork.to_string(), "lab_work");
    }

    #[test]
    fn test_recommendation_serializes_type_field() {
        let rec = Recommendation {
            rec_type: RecommendationType::Safety,
            priority: Priority::High,
            suggestion: "address safety concern: fire".to_string(),
            reason: "fire detected".to_string(),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["type"], "safety");
        assert_eq!(value["priority"], "high");
    }
}
