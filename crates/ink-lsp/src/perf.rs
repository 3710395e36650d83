// perf.rs - Timing and counters for compile cycles and requests
//
// Controlled via the INK_LSP_PERF environment variable.
//
// Usage:
//   INK_LSP_PERF=1 ink-lsp --stdio        # Log phase durations
//   INK_LSP_PERF=verbose ink-lsp --stdio  # Also warn when a phase exceeds its threshold

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PERF_ENABLED: OnceLock<bool> = OnceLock::new();
static PERF_VERBOSE: OnceLock<bool> = OnceLock::new();

/// Check if performance timing is enabled
pub fn is_enabled() -> bool {
    *PERF_ENABLED.get_or_init(|| {
        std::env::var("INK_LSP_PERF")
            .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
            .unwrap_or(false)
    })
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    *PERF_VERBOSE.get_or_init(|| {
        std::env::var("INK_LSP_PERF")
            .map(|v| v.to_lowercase() == "verbose")
            .unwrap_or(false)
    })
}

/// RAII timing guard that logs duration on drop
///
/// ```
/// use ink_lsp::perf::TimingGuard;
///
/// let _guard = TimingGuard::new("Parsing");
/// // ... do work ...
/// // Duration logged when _guard goes out of scope
/// ```
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    threshold_warn_ms: Option<u64>,
    enabled: bool,
}

impl TimingGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: None,
            enabled: is_enabled(),
        }
    }

    /// Timing guard that warns (in verbose mode) above `threshold_ms`.
    pub fn with_threshold(name: &'static str, threshold_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: Some(threshold_ms),
            enabled: is_enabled(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Consume the guard without logging and return the duration.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        std::mem::forget(self);
        elapsed
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.start.elapsed();
        log::debug!("[PERF] {} completed in {:?}", self.name, elapsed);

        if let Some(threshold) = self.threshold_warn_ms {
            if elapsed.as_millis() > threshold as u128 && is_verbose() {
                log::warn!(
                    "[PERF] {} exceeded threshold ({}ms > {}ms)",
                    self.name,
                    elapsed.as_millis(),
                    threshold
                );
            }
        }
    }
}

/// Process-wide compile counters.
#[derive(Debug, Default)]
pub struct CompileMetrics {
    started: AtomicU64,
    cancelled: AtomicU64,
    superseded: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    first_publish_ms: OnceLock<u64>,
}

/// Point-in-time copy of [`CompileMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileMetricsSnapshot {
    pub started: u64,
    pub cancelled: u64,
    pub superseded: u64,
    pub published: u64,
    pub failed: u64,
    pub first_publish_ms: Option<u64>,
}

impl CompileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a publication; the first one also records time since `since`.
    pub fn record_published(&self, since: Instant) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let elapsed = since.elapsed().as_millis() as u64;
        if self.first_publish_ms.set(elapsed).is_ok() && is_enabled() {
            log::info!("[PERF] First diagnostics published after {}ms", elapsed);
        }
    }

    pub fn snapshot(&self) -> CompileMetricsSnapshot {
        CompileMetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            first_publish_ms: self.first_publish_ms.get().copied(),
        }
    }

    pub fn log_summary(&self) {
        if !is_enabled() {
            return;
        }
        let s = self.snapshot();
        log::info!(
            "[PERF] Compiles: {} started, {} published, {} cancelled, {} superseded, {} failed",
            s.started,
            s.published,
            s.cancelled,
            s.superseded,
            s.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_guard_elapsed() {
        let guard = TimingGuard::new("test");
        std::thread::sleep(Duration::from_millis(10));
        assert!(guard.elapsed().as_millis() >= 10);
    }

    #[test]
    fn test_timing_guard_finish() {
        let guard = TimingGuard::with_threshold("test", 1);
        std::thread::sleep(Duration::from_millis(10));
        assert!(guard.finish().as_millis() >= 10);
    }

    #[test]
    fn test_compile_metrics() {
        let metrics = CompileMetrics::new();
        let start = Instant::now();
        metrics.record_started();
        metrics.record_started();
        metrics.record_cancelled();
        metrics.record_published(start);
        metrics.record_published(start);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.started, 2);
        assert_eq!(snapshot.cancelled, 1);
        assert_eq!(snapshot.published, 2);
        assert_eq!(snapshot.failed, 0);
        assert!(snapshot.first_publish_ms.is_some());
    }
}
