//! Engagement Scorer
//!
//! Maps concepts to a 0-100 engagement score with a weighted-indicator model.
//!
//! # Scoring
//! - Sum the confidences of concepts whose name is in the indicator set
//! - Divide by the indicator-set size (not the number of matches)
//! - Scale to 0-100, clamp, round to nearest integer
//!
//! Normalizing by the full set size caps the score and penalizes sparse
//! matches: one strongly detected indicator out of four scores at most 25.
//!
//! # Example Calculation
//! Indicators `{attentive, engaged, participating, focused}`, concepts
//! `attentive=0.9, engaged=0.8`:
//!
//! score = round((0.9 + 0.8) / 4 * 100) = round(42.5) = 43

use crate::config::EngagementConfig;
use crate::types::{Concept, EngagementScore};
use std::collections::HashSet;

/// Engagement scorer over a fixed indicator vocabulary
#[derive(Debug, Clone)]
pub struct EngagementScorer {
    indicators: HashSet<String>,
}

impl EngagementScorer {
    /// Create scorer from indicator names (duplicates collapse)
    pub fn new<I, S>(indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indicators: indicators.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &EngagementConfig) -> Self {
        Self::new(config.indicators.iter().cloned())
    }

    /// Size of the indicator set (the normalization denominator)
    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// Score a deduplicated concept list
    ///
    /// No matching concepts is a valid result (score 0, confidence 0).
    pub fn score(&self, concepts: &[Concept]) -> EngagementScore {
        if self.indicators.is_empty() {
            return EngagementScore {
                score: 0,
                confidence: 0.0,
            };
        }

        let (sum, matched) = concepts
            .iter()
            .filter(|c| self.indicators.contains(&c.name))
            .fold((0.0f32, 0usize), |(sum, n), c| (sum + c.confidence, n + 1));

        if matched == 0 {
            return EngagementScore {
                score: 0,
                confidence: 0.0,
            };
        }

        let normalized = sum / self.indicators.len() as f32;
        let score = (normalized * 100.0).clamp(0.0, 100.0).round() as u32;
        let confidence = (sum / matched as f32).clamp(0.0, 1.0);

        EngagementScore { score, confidence }
    }
}

impl Default for EngagementScorer {
    fn default() -> Self {
        Self::from_config(&EngagementConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> EngagementScorer {
        EngagementScorer::new(["attentive", "engaged", "participating", "focused"])
    }

    #[test]
    fn test_no_matches_scores_zero() {
        let concepts = vec![Concept::new("whiteboard", 0.99), Concept::new("person", 0.95)];
        let result = scorer().score(&concepts);
        assert_eq!(result.score, 0);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_empty_concepts_scores_zero() {
        assert_eq!(scorer().score(&[]).score, 0);
    }

    #[test]
    fn test_normalizes_by_indicator_set_size() {
        // One perfect match out of four indicators caps at 25
        let result = scorer().score(&[Concept::new("focused", 1.0)]);
        assert_eq!(result.score, 25);
        assert!((result.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_indicator_example() {
        let concepts = vec![Concept::new("attentive", 0.9), Concept::new("engaged", 0.8)];
        let result = scorer().score(&concepts);
        // (0.9 + 0.8) / 4 * 100 = 42.5, rounds half away from zero
        assert_eq!(result.score, 43);
        assert!((result.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_all_indicators_full_confidence_is_100() {
        let concepts: Vec<Concept> = ["attentive", "engaged", "participating", "focused"]
            .iter()
            .map(|n| Concept::new(*n, 1.0))
            .collect();
        assert_eq!(scorer().score(&concepts).score, 100);
    }

    #[test]
    fn test_score_always_within_bounds() {
        let confidences = [0.0f32, 0.13, 0.5, 0.77, 1.0];
        for &a in &confidences {
            for &b in &confidences {
                let concepts = vec![
                    Concept::new("attentive", a),
                    Concept::new("engaged", b),
                    Concept::new("participating", a),
                    Concept::new("focused", b),
                    Concept::new("noise", 1.0),
                ];
                let result = scorer().score(&concepts);
                assert!(result.score <= 100, "score {} out of range", result.score);
                assert!((0.0..=1.0).contains(&result.confidence));
            }
        }
    }

    #[test]
    fn test_duplicate_indicator_names_collapse() {
        let scorer = EngagementScorer::new(["focused", "focused", "engaged"]);
        assert_eq!(scorer.indicator_count(), 2);
        assert_eq!(scorer.score(&[Concept::new("focused", 1.0)]).score, 50);
    }
}
