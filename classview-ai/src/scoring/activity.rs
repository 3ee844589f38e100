//! Activity Classifier
//!
//! Picks one activity category by indicator-group scoring.
//!
//! Each group scores the sum of confidences of its indicator concepts. The
//! strictly highest score wins; groups are visited in configuration order,
//! so on a tie the first-defined group wins. When nothing matches, the
//! result is `other`.

use crate::config::{ActivityConfig, ActivityGroup};
use crate::types::{ActivityClassification, ActivityType, Concept};
use std::collections::HashSet;

/// Activity classifier over an ordered list of indicator groups
#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    groups: Vec<(ActivityType, HashSet<String>)>,
}

impl ActivityClassifier {
    /// Create classifier from ordered `(type, indicators)` groups
    pub fn new(groups: &[ActivityGroup]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|g| (g.activity, g.indicators.iter().cloned().collect()))
                .collect(),
        }
    }

    pub fn from_config(config: &ActivityConfig) -> Self {
        Self::new(&config.groups)
    }

    /// Classify a deduplicated concept list
    pub fn classify(&self, concepts: &[Concept]) -> ActivityClassification {
        let mut best: Option<(ActivityType, f32, usize)> = None;

        for (activity, indicators) in &self.groups {
            let score: f32 = concepts
                .iter()
                .filter(|c| indicators.contains(&c.name))
                .map(|c| c.confidence)
                .sum();

            let max_score = best.map(|(_, s, _)| s).unwrap_or(0.0);
            if score > max_score {
                best = Some((*activity, score, indicators.len()));
            }
        }

        match best {
            Some((activity_type, score, size)) if size > 0 => ActivityClassification {
                activity_type,
                confidence: (score / size as f32).clamp(0.0, 1.0),
            },
            _ => ActivityClassification {
                activity_type: ActivityType::Other,
                confidence: 0.0,
            },
        }
    }
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::from_config(&ActivityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(activity: ActivityType, indicators: &[&str]) -> ActivityGroup {
        ActivityGroup {
            activity,
            indicators: indicators.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_match_is_other() {
        let classifier = ActivityClassifier::default();
        let result = classifier.classify(&[Concept::new("person", 0.9)]);
        assert_eq!(result.activity_type, ActivityType::Other);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_zero_confidence_match_is_other() {
        let classifier = ActivityClassifier::default();
        let result = classifier.classify(&[Concept::new("whiteboard", 0.0)]);
        assert_eq!(result.activity_type, ActivityType::Other);
    }

    #[test]
    fn test_highest_group_wins() {
        let classifier = ActivityClassifier::new(&[
            group(ActivityType::Lecture, &["whiteboard", "projector"]),
            group(ActivityType::GroupWork, &["group", "discussion"]),
        ]);
        let concepts = vec![
            Concept::new("whiteboard", 0.3),
            Concept::new("group", 0.6),
            Concept::new("discussion", 0.8),
        ];
        let result = classifier.classify(&concepts);
        assert_eq!(result.activity_type, ActivityType::GroupWork);
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_tie_break_first_defined_wins() {
        let groups = [
            group(ActivityType::LabWork, &["computer"]),
            group(ActivityType::IndividualWork, &["computer"]),
        ];
        let concepts = vec![Concept::new("computer", 0.8)];

        let result = ActivityClassifier::new(&groups).classify(&concepts);
        assert_eq!(result.activity_type, ActivityType::LabWork);

        // Reversed order flips the winner
        let reversed = [groups[1].clone(), groups[0].clone()];
        let result = ActivityClassifier::new(&reversed).classify(&concepts);
        assert_eq!(result.activity_type, ActivityType::IndividualWork);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = ActivityClassifier::default();
        let concepts = vec![
            Concept::new("computer", 0.7),
            Concept::new("reading", 0.4),
            Concept::new("microscope", 0.1),
            Concept::new("teacher", 0.5),
        ];
        let first = classifier.classify(&concepts);
        for _ in 0..50 {
            assert_eq!(classifier.classify(&concepts), first);
        }
    }

    #[test]
    fn test_confidence_divides_by_winning_group_size() {
        let classifier = ActivityClassifier::new(&[group(
            ActivityType::Lecture,
            &["whiteboard", "presentation", "teacher", "projector"],
        )]);
        let result =
            classifier.classify(&[Concept::new("whiteboard", 0.8), Concept::new("teacher", 0.6)]);
        assert_eq!(result.activity_type, ActivityType::Lecture);
        assert!((result.confidence - 0.35).abs() < 1e-6);
    }
}
