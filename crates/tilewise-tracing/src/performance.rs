//! Timing guards and structured events for kernel configuration and dispatch.
//!
//! ```rust
//! use tilewise_tracing::performance::{record_dispatch, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("box3x3::run", Some(100));
//! // ... run the kernel ...
//! record_dispatch("box3x3", 4, span.elapsed_us());
//! ```

use std::time::Instant;

/// Whether performance spans are built and the duration below which they
/// stay silent. Derived from [`crate::TracingConfig::perf_settings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub threshold_us: Option<u64>,
}

impl PerfSettings {
    /// Settings of [`crate::TracingConfig::from_env`].
    pub fn from_env() -> Self {
        crate::TracingConfig::from_env().perf_settings()
    }
}

/// Measures the time between creation and drop, then reports it inside a
/// `perf` span unless it stayed under the threshold.
pub struct PerformanceSpan {
    name: String,
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    pub fn new(name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("perf", name = %name);
        Self::with_span(name, threshold_us, span)
    }

    /// Report into `span`, which carries the caller's fields.
    pub fn with_span(name: impl Into<String>, threshold_us: Option<u64>, span: tracing::Span) -> Self {
        Self {
            name: name.into(),
            threshold_us,
            start_time: Instant::now(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();
        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Outcome of a kernel's window/padding negotiation.
pub fn record_negotiation(kernel: &str, window_changed: bool, padding_changed: bool, iterations: usize) {
    tracing::debug!(
        event = "negotiation",
        kernel = kernel,
        window_changed = window_changed,
        padding_changed = padding_changed,
        iterations = iterations,
        "window_negotiated"
    );
}

/// One scheduled kernel execution split into `partitions` sub-windows.
pub fn record_dispatch(kernel: &str, partitions: usize, duration_us: u64) {
    tracing::debug!(
        event = "dispatch",
        kernel = kernel,
        partitions = partitions,
        duration_us = duration_us,
        duration_ms = duration_us as f64 / 1000.0,
        "kernel_dispatched"
    );
}

/// Elements processed per second for a finished run.
pub fn record_throughput(kernel: &str, elements: usize, duration_us: u64) {
    let elements_per_sec = elements_per_second(elements, duration_us);
    tracing::debug!(
        event = "throughput",
        kernel = kernel,
        elements = elements,
        duration_us = duration_us,
        elements_per_sec = elements_per_sec,
        melems_per_sec = elements_per_sec / 1_000_000.0,
        "kernel_throughput"
    );
}

fn elements_per_second(elements: usize, duration_us: u64) -> f64 {
    if duration_us == 0 {
        0.0
    } else {
        elements as f64 / duration_us as f64 * 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn span_keeps_name_and_threshold() {
        let span = PerformanceSpan::new("fill_border", Some(1000));
        assert_eq!(span.name(), "fill_border");
        assert_eq!(span.threshold_us, Some(1000));
    }

    #[test]
    fn span_measures_elapsed_time() {
        let span = PerformanceSpan::new("sleep", None);
        thread::sleep(Duration::from_millis(5));
        assert!(span.elapsed_us() >= 5_000);
    }

    #[test]
    fn events_do_not_panic() {
        record_negotiation("box3x3", true, false, 2);
        record_dispatch("box3x3", 4, 120);
        record_throughput("box3x3", 4096, 0);
    }

    #[test]
    fn throughput_math() {
        assert!((elements_per_second(1_000_000, 1000) - 1e9).abs() < 1.0);
        assert_eq!(elements_per_second(10, 0), 0.0);
    }
}
