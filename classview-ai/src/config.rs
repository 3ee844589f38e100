//! Configuration for classview-ai
//!
//! All vocabularies, thresholds and weights of the analysis engine are
//! configuration, loaded from `classview-ai.toml`. Every field has a
//! built-in default, so a missing or partial file is valid.
//!
//! ```toml
//! [engagement]
//! indicators = ["attentive", "engaged", "participating", "focused"]
//!
//! # Array order is the tie-break order: first defined wins.
//! [[activity.groups]]
//! activity = "lecture"
//! indicators = ["whiteboard", "presentation", "teacher", "projector"]
//!
//! [safety]
//! vocabulary = ["weapon", "fire", "smoke"]
//! threshold = 0.5
//!
//! [combiner]
//! primary = 0.6
//! secondary = 0.4
//!
//! [backends.primary]
//! kind = "clarifai"
//! user_id = "school-district"
//! app_id = "classroom"
//!
//! [backends.secondary]
//! kind = "subprocess"
//! command = "python3"
//! args = ["models/classroom_concepts.py"]
//! ```
//!
//! Priority for the config file location: `--config` → `CLASSVIEW_CONFIG`
//! → `~/.config/classview/classview-ai.toml` → compiled defaults.

use crate::fusion::BackendWeights;
use crate::recommendations::EngagementThresholds;
use crate::types::ActivityType;
use classview_common::config::{load_or_default, ConfigResolver, LoggingConfig};
use classview_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "classview-ai.toml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "CLASSVIEW_CONFIG";

/// Environment variable overriding the Clarifai API key
pub const CLARIFAI_KEY_ENV_VAR: &str = "CLASSVIEW_CLARIFAI_API_KEY";

/// Default per-call backend timeout
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 30_000;

/// Default cache entry lifetime (1 hour)
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Root analysis configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub logging: LoggingConfig,
    pub engagement: EngagementConfig,
    pub activity: ActivityConfig,
    pub safety: SafetyConfig,
    pub attendance: AttendanceConfig,
    pub combiner: BackendWeights,
    pub recommendations: RecommendationConfig,
    pub cache: CacheConfig,
    pub backends: BackendsConfig,
}

/// Engagement indicator vocabulary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Concept names counted as engagement signals. The score is normalized
    /// by the size of this list, not by the number of matches.
    pub indicators: Vec<String>,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            indicators: strings(&["attentive", "engaged", "participating", "focused"]),
        }
    }
}

/// One activity type and its indicator concepts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityGroup {
    pub activity: ActivityType,
    pub indicators: Vec<String>,
}

/// Ordered activity indicator groups
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Evaluated in order; on equal scores the earlier group wins
    pub groups: Vec<ActivityGroup>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            groups: vec![
                ActivityGroup {
                    activity: ActivityType::Lecture,
                    indicators: strings(&[
                        "whiteboard",
                        "presentation",
                        "teacher",
                        "projector",
                        "teaching",
                    ]),
                },
                ActivityGroup {
                    activity: ActivityType::GroupWork,
                    indicators: strings(&["group", "collaboration", "discussion"]),
                },
                ActivityGroup {
                    activity: ActivityType::IndividualWork,
                    indicators: strings(&["writing", "reading", "studying", "book"]),
                },
                ActivityGroup {
                    activity: ActivityType::LabWork,
                    indicators: strings(&["laboratory", "experiment", "microscope", "computer"]),
                },
            ],
        }
    }
}

/// Safety vocabulary and threshold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub vocabulary: Vec<String>,
    /// A concept is an issue when its confidence is strictly above this
    pub threshold: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            vocabulary: strings(&[
                "danger",
                "weapon",
                "fire",
                "smoke",
                "overcrowding",
                "obstruction",
                "hazard",
                "unsafe",
            ]),
            threshold: 0.5,
        }
    }
}

/// Attendance estimation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Concept whose confidence drives the head-count estimate
    pub indicator: String,
    /// Class size that a confidence of 1.0 maps to. A tunable ceiling for a
    /// typical classroom, not a measured capacity.
    pub max_expected_class_size: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            indicator: "person".to_string(),
            max_expected_class_size: 30,
        }
    }
}

/// Recommendation rule thresholds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Engagement score below which an engagement recommendation is emitted
    pub low_engagement: u32,
    /// Engagement score below which that recommendation is high priority
    pub critical_engagement: u32,
    /// Overall confidence below which a low-confidence warning is attached
    pub low_confidence_warning: f32,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            low_engagement: 60,
            critical_engagement: 40,
            low_confidence_warning: 0.3,
        }
    }
}

impl RecommendationConfig {
    pub fn thresholds(&self) -> EngagementThresholds {
        EngagementThresholds {
            low: self.low_engagement,
            critical: self.critical_engagement,
        }
    }
}

/// Analysis cache settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            key_prefix: "analysis:".to_string(),
        }
    }
}

/// Backend selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Per-call timeout applied to each backend
    pub timeout_ms: u64,
    /// Continue with the surviving backend when the other one fails
    pub allow_partial: bool,
    pub primary: Option<BackendConfig>,
    pub secondary: Option<BackendConfig>,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            allow_partial: false,
            primary: None,
            secondary: None,
        }
    }
}

/// Concrete backend, selected by `kind`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Clarifai(ClarifaiConfig),
    Subprocess(SubprocessConfig),
}

/// Hosted Clarifai model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClarifaiConfig {
    /// API key (overridden by `CLASSVIEW_CLARIFAI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
    pub user_id: String,
    pub app_id: String,
    #[serde(default = "default_clarifai_model")]
    pub model_id: String,
    /// API root, for proxies and tests
    #[serde(default = "default_clarifai_base_url")]
    pub base_url: String,
}

fn default_clarifai_model() -> String {
    "classroom-analysis-model".to_string()
}

fn default_clarifai_base_url() -> String {
    "https://api.clarifai.com".to_string()
}

/// Local model run as a child process (image on stdin, JSON on stdout)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubprocessConfig {
    /// Backend name used in logs and `sources` (default "subprocess")
    #[serde(default)]
    pub name: Option<String>,
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl AnalysisConfig {
    /// Resolve, load, apply environment overrides and validate
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let resolver = ConfigResolver::new(DEFAULT_CONFIG_FILE, CONFIG_ENV_VAR);
        let source = resolver.resolve(cli_path);
        let mut config: AnalysisConfig = load_or_default(&source)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply secret overrides from the environment
    pub fn apply_env_overrides(&mut self) {
        let env_key = std::env::var(CLARIFAI_KEY_ENV_VAR).ok();
        for backend in [&mut self.backends.primary, &mut self.backends.secondary]
            .into_iter()
            .flatten()
        {
            if let BackendConfig::Clarifai(clarifai) = backend {
                clarifai.api_key = resolve_api_key(env_key.as_deref(), clarifai.api_key.as_deref());
            }
        }
    }

    /// Reject configurations that would make scoring meaningless
    pub fn validate(&self) -> Result<()> {
        if self.engagement.indicators.is_empty() {
            return Err(Error::Config("engagement.indicators must not be empty".to_string()));
        }

        for group in &self.activity.groups {
            if group.indicators.is_empty() {
                return Err(Error::Config(format!(
                    "activity group '{}' has no indicators",
                    group.activity
                )));
            }
            if group.activity == ActivityType::Other {
                return Err(Error::Config(
                    "'other' is the fallback activity and cannot have an indicator group"
                        .to_string(),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.safety.threshold) {
            return Err(Error::Config(format!(
                "safety.threshold must be within [0, 1], got {}",
                self.safety.threshold
            )));
        }

        if self.attendance.indicator.trim().is_empty() {
            return Err(Error::Config("attendance.indicator must not be empty".to_string()));
        }
        if self.attendance.max_expected_class_size == 0 {
            return Err(Error::Config(
                "attendance.max_expected_class_size must be positive".to_string(),
            ));
        }

        self.combiner
            .validate()
            .map_err(|e| Error::Config(format!("combiner: {}", e)))?;

        let rec = &self.recommendations;
        if rec.critical_engagement > rec.low_engagement || rec.low_engagement > 100 {
            return Err(Error::Config(format!(
                "recommendations thresholds must satisfy critical <= low <= 100 \
                 (critical={}, low={})",
                rec.critical_engagement, rec.low_engagement
            )));
        }
        if !(0.0..=1.0).contains(&rec.low_confidence_warning) {
            return Err(Error::Config(
                "recommendations.low_confidence_warning must be within [0, 1]".to_string(),
            ));
        }

        if self.backends.timeout_ms == 0 {
            return Err(Error::Config("backends.timeout_ms must be positive".to_string()));
        }

        Ok(())
    }
}

/// Pick the Clarifai API key
///
/// **Priority:** ENV → TOML
fn resolve_api_key(env_key: Option<&str>, toml_key: Option<&str>) -> Option<String> {
    let env_key = env_key.filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(env), Some(_)) => {
            warn!(
                "Clarifai API key found in environment and TOML. \
                 Using environment (highest priority)."
            );
            Some(env.to_string())
        }
        (Some(env), None) => {
            info!("Clarifai API key loaded from environment variable");
            Some(env.to_string())
        }
        (None, Some(toml)) => {
            info!("Clarifai API key loaded from TOML config");
            Some(toml.to_string())
        }
        (None, None) => None,
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
