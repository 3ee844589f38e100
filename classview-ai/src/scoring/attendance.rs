//! Attendance Estimator
//!
//! Approximates a head count from the confidence of the person concept:
//! `round(confidence * max_expected_class_size)`. This is a rough signal,
//! not a person detector.

use crate::config::AttendanceConfig;
use crate::types::{AttendanceEstimate, Concept};

#[derive(Debug, Clone)]
pub struct AttendanceEstimator {
    indicator: String,
    max_expected_class_size: u32,
}

impl AttendanceEstimator {
    pub fn new(indicator: impl Into<String>, max_expected_class_size: u32) -> Self {
        Self {
            indicator: indicator.into(),
            max_expected_class_size,
        }
    }

    pub fn from_config(config: &AttendanceConfig) -> Self {
        Self::new(config.indicator.clone(), config.max_expected_class_size)
    }

    pub fn estimate(&self, concepts: &[Concept]) -> AttendanceEstimate {
        match concepts.iter().find(|c| c.name == self.indicator) {
            Some(person) => AttendanceEstimate {
                estimated_count: (person.confidence * self.max_expected_class_size as f32).round()
                    as u32,
                confidence: person.confidence,
            },
            None => AttendanceEstimate {
                estimated_count: 0,
                confidence: 0.0,
            },
        }
    }
}

impl Default for AttendanceEstimator {
    fn default() -> Self {
        Self::from_config(&AttendanceConfig::default())
    }
}
