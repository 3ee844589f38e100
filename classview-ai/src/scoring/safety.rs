//! Safety Assessor
//!
//! Flags vocabulary concepts whose confidence is strictly above the
//! threshold. `safe` is true exactly when no issue was raised; the
//! `score` (1 - mean issue confidence) is informational and must not be
//! used for branching.

use crate::config::SafetyConfig;
use crate::types::{Concept, SafetyAssessment, SafetyIssue};
use std::collections::HashSet;

/// Safety assessor over a fixed issue vocabulary
#[derive(Debug, Clone)]
pub struct SafetyAssessor {
    vocabulary: HashSet<String>,
    threshold: f32,
}

impl SafetyAssessor {
    pub fn new<I, S>(vocabulary: I, threshold: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: vocabulary.into_iter().map(Into::into).collect(),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &SafetyConfig) -> Self {
        Self::new(config.vocabulary.iter().cloned(), config.threshold)
    }

    /// Assess a deduplicated concept list
    ///
    /// Issues keep the order of the input concepts.
    pub fn assess(&self, concepts: &[Concept]) -> SafetyAssessment {
        let issues: Vec<SafetyIssue> = concepts
            .iter()
            .filter(|c| self.vocabulary.contains(&c.name) && c.confidence > self.threshold)
            .map(|c| SafetyIssue {
                issue_type: c.name.clone(),
                confidence: c.confidence,
            })
            .collect();

        let score = if issues.is_empty() {
            1.0
        } else {
            let mean = issues.iter().map(|i| i.confidence).sum::<f32>() / issues.len() as f32;
            (1.0 - mean).clamp(0.0, 1.0)
        };

        SafetyAssessment {
            safe: issues.is_empty(),
            issues,
            score,
        }
    }
}

impl Default for SafetyAssessor {
    fn default() -> Self {
        Self::from_config(&SafetyConfig::default())
    }
}
