//! classview-ai - classroom image analysis engine
//!
//! Turns concept→confidence output of one or two vision backends into an
//! engagement score, activity classification, safety assessment, attendance
//! estimate and prioritized recommendations, with caching and monitoring
//! around the pipeline.
//!
//! ```rust,ignore
//! use classview_ai::{AnalysisConfig, AnalyzeOptions, Analyzer};
//!
//! let config = AnalysisConfig::load(None)?;
//! let analyzer = Analyzer::from_config(&config)?;
//! let options = AnalyzeOptions::from_config(&config).with_expected_attendance(28);
//! let result = analyzer.analyze(&image_bytes, &options).await?;
//! ```

pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod fusion;
pub mod monitor;
pub mod pipeline;
pub mod recommendations;
pub mod scoring;
pub mod types;

pub use crate::cache::{AnalysisCache, CacheStore, MemoryCacheStore};
pub use crate::config::AnalysisConfig;
pub use crate::error::{AnalysisError, BackendError, CacheError};
pub use crate::fusion::{BackendWeights, ResultCombiner};
pub use crate::monitor::{AnalysisMonitor, MonitorSnapshot};
pub use crate::pipeline::{AnalyzeOptions, Analyzer};
pub use crate::recommendations::{EngagementThresholds, RecommendationEngine};
pub use crate::types::{
    ActivityClassification, ActivityType, AnalysisResult, AttendanceEstimate, Concept,
    EngagementScore, Priority, Recommendation, RecommendationType, SafetyAssessment, SafetyIssue,
    VisionBackend,
};
