//! Shorthands over [`crate::performance`].

/// Start a [`crate::performance::PerformanceSpan`]. Extra fields are
/// recorded on its `perf` span, so they accompany the completion event and
/// anything logged while the span is entered.
///
/// ```rust
/// use tilewise_tracing::perf_span;
///
/// let perf = perf_span!("scheduler::partition", thread = 0, iterations = 16);
/// let _entered = perf.enter();
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::perf_span_threshold!($name, None, $($field = $value),+)
    }};
}

/// Like [`perf_span!`] but silent below `threshold_us`, which is a `u64` or
/// an `Option<u64>`.
#[macro_export]
macro_rules! perf_span_threshold {
    ($name:expr, $threshold_us:expr) => {{
        $crate::performance::PerformanceSpan::new(
            $name,
            ::core::convert::Into::<Option<u64>>::into($threshold_us),
        )
    }};
    ($name:expr, $threshold_us:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::performance::PerformanceSpan::with_span(
            $name,
            ::core::convert::Into::<Option<u64>>::into($threshold_us),
            tracing::debug_span!("perf", name = $name, $($field = $value),+),
        )
    }};
}
