//! Analysis Pipeline
//!
//! Orchestrates one image analysis end to end.
//!
//! # Flow
//! 1. **Cache lookup** by content hash (skipped with `skip_cache`)
//! 2. **Backend calls**: primary and secondary run concurrently, each under
//!    its own timeout; concepts are deduplicated per backend
//! 3. **Scoring**: engagement, activity, safety, attendance per backend
//! 4. **Fusion**: [`ResultCombiner`] merges the per-backend facets
//! 5. **Recommendations** and low-confidence warning
//! 6. **Cache store** and monitor update
//!
//! # Error Handling
//! - Any backend failure or timeout fails the whole request:
//!   `AnalysisError::Backend` (one failure) or
//!   `AnalysisError::AllBackendsFailed` (both)
//! - With [`AnalyzeOptions::allow_partial`], a failure while the other
//!   backend produced concepts is tolerated instead; the result carries a
//!   `"<name> backend unavailable: <error>"` warning
//! - No usable concepts and no failure: `AnalysisError::Scoring`
//! - Cache problems never fail a request
//!
//! # Cache Hits
//! A hit re-runs the recommendation rules and the low-confidence warning
//! with the caller's current options. Facet values, `sources` and backend
//! warnings stay as computed: backend weights are fixed per cached entry
//! (use `skip_cache` to recompute under new weights). Hits are not recorded
//! in the monitor, which measures computed analyses only.

use crate::backends::build_backend;
use crate::cache::{AnalysisCache, MemoryCacheStore};
use crate::config::{AnalysisConfig, BackendConfig, RecommendationConfig};
use crate::error::{AnalysisError, BackendError};
use crate::fusion::{BackendWeights, ResultCombiner};
use crate::monitor::AnalysisMonitor;
use crate::recommendations::{
    confidence_warning, EngagementThresholds, RecommendationEngine, LOW_CONFIDENCE_WARNING,
};
use crate::scoring::ConceptScorer;
use crate::types::{dedup_concepts, AnalysisResult, BackendAnalysis, Concept, VisionBackend};
use classview_common::time::{Clock, SystemClock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Per-call analysis options
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOptions {
    /// Bypass the cache lookup (the fresh result is still stored)
    pub skip_cache: bool,
    pub backend_weights: BackendWeights,
    pub engagement_thresholds: EngagementThresholds,
    /// Roster size; enables the attendance recommendation
    pub expected_attendance: Option<u32>,
    /// Timeout applied to each backend call
    ///
    /// HTTP backends built from config also stop at `[backends] timeout_ms`;
    /// either limit is reported as `BackendError::Timeout`.
    pub backend_timeout: Duration,
    /// Tolerate one failed backend when the other produced concepts
    pub allow_partial: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl AnalyzeOptions {
    /// Options carrying the configured weights, thresholds and timeout
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            skip_cache: false,
            backend_weights: config.combiner,
            engagement_thresholds: config.recommendations.thresholds(),
            expected_attendance: None,
            backend_timeout: Duration::from_millis(config.backends.timeout_ms),
            allow_partial: config.backends.allow_partial,
        }
    }

    pub fn with_skip_cache(mut self, skip_cache: bool) -> Self {
        self.skip_cache = skip_cache;
        self
    }

    pub fn with_expected_attendance(mut self, expected: u32) -> Self {
        self.expected_attendance = Some(expected);
        self
    }

    pub fn with_backend_weights(mut self, weights: BackendWeights) -> Self {
        self.backend_weights = weights;
        self
    }

    pub fn with_engagement_thresholds(mut self, thresholds: EngagementThresholds) -> Self {
        self.engagement_thresholds = thresholds;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_allow_partial(mut self, allow_partial: bool) -> Self {
        self.allow_partial = allow_partial;
        self
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        self.backend_weights
            .validate()
            .map_err(|e| AnalysisError::Config(format!("backend weights: {}", e)))?;
        if self.engagement_thresholds.critical > self.engagement_thresholds.low {
            return Err(AnalysisError::Config(format!(
                "engagement thresholds must satisfy critical <= low (critical={}, low={})",
                self.engagement_thresholds.critical, self.engagement_thresholds.low
            )));
        }
        if self.backend_timeout.is_zero() {
            return Err(AnalysisError::Config("backend timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Image analysis engine
pub struct Analyzer {
    primary: Option<Arc<dyn VisionBackend>>,
    secondary: Option<Arc<dyn VisionBackend>>,
    scorer: ConceptScorer,
    cache: Option<AnalysisCache>,
    monitor: Arc<AnalysisMonitor>,
    clock: Arc<dyn Clock>,
    low_confidence_warning: f32,
}

impl Analyzer {
    /// Analyzer with no backends, no cache and a private monitor
    pub fn new(scorer: ConceptScorer) -> Self {
        Self {
            primary: None,
            secondary: None,
            scorer,
            cache: None,
            monitor: Arc::new(AnalysisMonitor::new()),
            clock: Arc::new(SystemClock),
            low_confidence_warning: RecommendationConfig::default().low_confidence_warning,
        }
    }

    /// Build backends, scorers and cache from configuration
    ///
    /// Uses an in-memory cache store and the process-wide monitor.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let timeout = Duration::from_millis(config.backends.timeout_ms);
        let build = |backend: &BackendConfig| {
            build_backend(backend, timeout)
                .map_err(|e| AnalysisError::Config(format!("failed to build backend: {}", e)))
        };

        let mut analyzer = Self::new(ConceptScorer::from_config(config))
            .with_monitor(AnalysisMonitor::shared())
            .with_low_confidence_warning(config.recommendations.low_confidence_warning);

        if let Some(primary) = &config.backends.primary {
            analyzer = analyzer.with_primary(build(primary)?);
        }
        if let Some(secondary) = &config.backends.secondary {
            analyzer = analyzer.with_secondary(build(secondary)?);
        }
        if !analyzer.has_backend() {
            return Err(AnalysisError::Config(
                "no vision backend configured (set [backends.primary])".to_string(),
            ));
        }

        if config.cache.enabled {
            let store = Arc::new(MemoryCacheStore::new());
            analyzer = analyzer.with_cache(AnalysisCache::from_config(store, &config.cache));
        }

        info!(
            primary = analyzer.primary.as_ref().map(|b| b.name()).unwrap_or("none"),
            secondary = analyzer.secondary.as_ref().map(|b| b.name()).unwrap_or("none"),
            cache = config.cache.enabled,
            timeout_ms = config.backends.timeout_ms,
            "Analyzer initialized"
        );

        Ok(analyzer)
    }

    pub fn with_primary(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.primary = Some(backend);
        self
    }

    pub fn with_secondary(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.secondary = Some(backend);
        self
    }

    pub fn with_cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<AnalysisMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_low_confidence_warning(mut self, floor: f32) -> Self {
        self.low_confidence_warning = floor;
        self
    }

    pub fn monitor(&self) -> &Arc<AnalysisMonitor> {
        &self.monitor
    }

    pub fn cache(&self) -> Option<&AnalysisCache> {
        self.cache.as_ref()
    }

    fn has_backend(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Analyze one image
    pub async fn analyze(
        &self,
        image: &[u8],
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", request_id = %request_id, image_bytes = image.len());
        self.analyze_inner(image, options).instrument(span).await
    }

    async fn analyze_inner(
        &self,
        image: &[u8],
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        options.validate()?;
        if !self.has_backend() {
            return Err(AnalysisError::Config("no vision backend configured".to_string()));
        }

        let cache_key = self.cache.as_ref().map(|cache| cache.key_for(image));

        if let (Some(cache), Some(key), false) = (&self.cache, &cache_key, options.skip_cache) {
            if let Some(cached) = cache.get(key).await {
                debug!(key = %key, "Returning cached analysis");
                return Ok(self.refresh_cached(cached, options));
            }
        }

        let start = Instant::now();
        let outcome = self.compute(image, options).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.monitor.record(outcome.is_ok(), elapsed_ms);

        match &outcome {
            Ok(result) => {
                info!(
                    engagement = result.engagement.score,
                    activity = %result.activity.activity_type,
                    safe = result.safety.safe,
                    attendance = result.attendance.estimated_count,
                    recommendations = result.recommendations.len(),
                    elapsed_ms = elapsed_ms,
                    "Analysis complete"
                );
                if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
                    cache.set(key, result).await;
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    elapsed_ms = elapsed_ms,
                    "Analysis failed"
                );
            }
        }

        outcome
    }

    async fn compute(
        &self,
        image: &[u8],
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let timeout = options.backend_timeout;
        let (primary, secondary) = tokio::join!(
            call_backend(self.primary.as_deref(), image, timeout),
            call_backend(self.secondary.as_deref(), image, timeout),
        );

        let mut failures: Vec<(String, BackendError)> = Vec::new();
        let primary = self.score_outcome(primary, &mut failures);
        let secondary = self.score_outcome(secondary, &mut failures);

        let usable =
            |a: &Option<BackendAnalysis>| a.as_ref().is_some_and(|a| a.concept_count > 0);
        let survivor = usable(&primary) || usable(&secondary);
        if !failures.is_empty() && !(options.allow_partial && survivor) {
            return Err(if failures.len() == 1 {
                let (backend, source) = failures.remove(0);
                AnalysisError::Backend { backend, source }
            } else {
                AnalysisError::AllBackendsFailed { failures }
            });
        }

        let mut warnings: Vec<String> = failures
            .iter()
            .map(|(name, err)| {
                warn!(
                    backend = %name,
                    error = %err,
                    "Backend unavailable, continuing with remaining backend"
                );
                format!("{} backend unavailable: {}", name, err)
            })
            .collect();

        let combined = ResultCombiner::new(options.backend_weights)
            .combine(primary.as_ref(), secondary.as_ref())?;

        let recommendations = RecommendationEngine::new(options.engagement_thresholds)
            .generate(&combined, options.expected_attendance);

        let overall = combined.overall_confidence;
        if let Some(warning) = confidence_warning(overall, self.low_confidence_warning) {
            debug!(overall_confidence = combined.overall_confidence, "Low overall confidence");
            warnings.push(warning);
        }

        Ok(AnalysisResult {
            engagement: combined.engagement,
            activity: combined.activity,
            safety: combined.safety,
            attendance: combined.attendance,
            overall_confidence: combined.overall_confidence,
            recommendations,
            computed_at: self.clock.now(),
            sources: combined.sources,
            warnings,
        })
    }

    /// Re-apply per-call rules to a cached result
    fn refresh_cached(
        &self,
        mut cached: AnalysisResult,
        options: &AnalyzeOptions,
    ) -> AnalysisResult {
        cached.recommendations = RecommendationEngine::new(options.engagement_thresholds)
            .generate_for_result(&cached, options.expected_attendance);

        cached.warnings.retain(|w| w != LOW_CONFIDENCE_WARNING);
        if let Some(warning) =
            confidence_warning(cached.overall_confidence, self.low_confidence_warning)
        {
            cached.warnings.push(warning);
        }
        cached
    }

    /// Score a successful call, or record its failure
    fn score_outcome(
        &self,
        outcome: Option<(String, Result<Vec<Concept>, BackendError>)>,
        failures: &mut Vec<(String, BackendError)>,
    ) -> Option<BackendAnalysis> {
        match outcome? {
            (name, Ok(concepts)) => Some(self.scorer.score(&name, &concepts)),
            (name, Err(err)) => {
                failures.push((name, err));
                None
            }
        }
    }
}

/// Call one backend under `timeout`; `None` if not configured
async fn call_backend(
    backend: Option<&dyn VisionBackend>,
    image: &[u8],
    timeout: Duration,
) -> Option<(String, Result<Vec<Concept>, BackendError>)> {
    let backend = backend?;
    let name = backend.name().to_string();
    let start = Instant::now();

    let result = match tokio::time::timeout(timeout, backend.score(image)).await {
        Ok(Ok(concepts)) => Ok(dedup_concepts(concepts)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(BackendError::Timeout(timeout.as_millis() as u64)),
    };

    debug!(
        backend = %name,
        ok = result.is_ok(),
        concepts = result.as_ref().map(|c| c.len()).unwrap_or(0),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Backend call finished"
    );

    Some((name, result))
}
