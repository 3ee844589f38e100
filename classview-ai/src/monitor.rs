//! Analysis Monitor
//!
//! Success/failure counts and an exponentially weighted processing time
//! across pipeline invocations.
//!
//! `avg = avg * 0.9 + duration * 0.1`, seeded with the first observed
//! duration. The monitor only reports; alerting belongs to the caller
//! (see [`AnalysisMonitor::is_unhealthy`]).
//!
//! Stats live behind one mutex so concurrent analyses never interleave a
//! partial update.

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Default error-rate alert threshold
pub const DEFAULT_UNHEALTHY_THRESHOLD: f64 = 0.1;

const EWMA_KEEP: f64 = 0.9;
const EWMA_NEW: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
struct MonitorStats {
    total: u64,
    successful: u64,
    failed: u64,
    avg_processing_time_ms: f64,
}

/// Point-in-time copy of the monitor state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub avg_processing_time_ms: f64,
    pub error_rate: f64,
    pub success_rate: f64,
}

/// Pipeline invocation statistics
///
/// [`crate::Analyzer`] records every analysis it computes, successful or
/// failed. Results served from the cache are not recorded, so the counts
/// and latency describe backend-backed work only.
#[derive(Debug, Default)]
pub struct AnalysisMonitor {
    stats: Mutex<MonitorStats>,
}

static SHARED: OnceLock<Arc<AnalysisMonitor>> = OnceLock::new();

impl AnalysisMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide monitor instance
    pub fn shared() -> Arc<AnalysisMonitor> {
        SHARED.get_or_init(|| Arc::new(AnalysisMonitor::new())).clone()
    }

    fn lock(&self) -> MutexGuard<'_, MonitorStats> {
        // Poisoning is ignored: every update leaves the stats consistent
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one pipeline invocation
    pub fn record(&self, success: bool, duration_ms: f64) {
        let duration_ms = if duration_ms.is_finite() { duration_ms.max(0.0) } else { 0.0 };
        let mut stats = self.lock();

        stats.avg_processing_time_ms = if stats.total == 0 {
            duration_ms
        } else {
            stats.avg_processing_time_ms * EWMA_KEEP + duration_ms * EWMA_NEW
        };
        stats.total += 1;
        if success {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }

        debug!(
            success = success,
            duration_ms = duration_ms,
            total = stats.total,
            failed = stats.failed,
            "Recorded analysis"
        );
    }

    /// Time `fut` and record its outcome
    pub async fn track<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = fut.await;
        self.record(result.is_ok(), start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    /// `failed / total`, 0 before any invocation
    pub fn error_rate(&self) -> f64 {
        let stats = *self.lock();
        Self::rate(stats.failed, stats.total)
    }

    /// `successful / total`, 0 before any invocation
    pub fn success_rate(&self) -> f64 {
        let stats = *self.lock();
        Self::rate(stats.successful, stats.total)
    }

    fn rate(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            part as f64 / total as f64
        }
    }

    /// Error rate strictly above `threshold`
    pub fn is_unhealthy(&self, threshold: f64) -> bool {
        let rate = self.error_rate();
        let unhealthy = rate > threshold;
        if unhealthy {
            warn!(error_rate = rate, threshold = threshold, "Analysis error rate above threshold");
        }
        unhealthy
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let stats = *self.lock();
        MonitorSnapshot {
            total: stats.total,
            successful: stats.successful,
            failed: stats.failed,
            avg_processing_time_ms: stats.avg_processing_time_ms,
            error_rate: Self::rate(stats.failed, stats.total),
            success_rate: Self::rate(stats.successful, stats.total),
        }
    }

    pub fn reset(&self) {
        *self.lock() = MonitorStats::default();
    }
}
