//! Subscriber setup shared by every tilewise crate, test and bench.
//!
//! Kernels only emit `tracing` events; whoever owns the process decides how
//! they are rendered. This crate turns a [`TracingConfig`] (built from a
//! preset or from `TILEWISE_*` environment variables) into a subscriber.
//!
//! # Example
//!
//! ```rust
//! use tilewise_tracing::{build_subscriber, TracingConfig};
//!
//! let config = TracingConfig::for_ci();
//! let subscriber = build_subscriber(&config).expect("valid default filter");
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::info!(kernel = "box3x3", "configured");
//! });
//! ```

pub mod performance;

#[macro_use]
pub mod macros;

use std::env;
use std::error::Error;
use std::fmt;

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

use crate::performance::PerfSettings;

const ENV_PROFILE: &str = "TILEWISE_TRACING_PROFILE";
const ENV_DIRECTIVES: &str = "TILEWISE_TRACING_DIRECTIVES";
const ENV_FORMAT: &str = "TILEWISE_TRACING_FORMAT";
const ENV_PERF_TRACING: &str = "TILEWISE_PERF_TRACING";
const ENV_PERF_THRESHOLD: &str = "TILEWISE_PERF_THRESHOLD_US";

/// Directives that surface negotiation and dispatch details.
const KERNEL_DEBUG_DIRECTIVES: &str = "tilewise_core=debug,tilewise_backends=debug";

/// How the shared subscriber renders events.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Explicit filter directives. Falls back to `RUST_LOG`, then to
    /// [`TracingConfig::default_directive`].
    pub directives: Option<String>,
    pub default_directive: String,
    pub include_targets: bool,
    pub ansi: bool,
    pub span_events: FmtSpan,
    pub output: TracingOutput,
    /// Whether schedulers build [`performance::PerformanceSpan`]s.
    pub enable_performance_tracing: bool,
    /// Spans shorter than this many microseconds are not reported.
    pub performance_threshold_us: Option<u64>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_local()
    }
}

impl TracingConfig {
    /// Human-readable output for a developer terminal.
    pub fn for_local() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Pretty,
            enable_performance_tracing: cfg!(debug_assertions),
            performance_threshold_us: None,
        }
    }

    /// JSON lines without colour, for log collectors.
    pub fn for_ci() -> Self {
        Self {
            ansi: false,
            output: TracingOutput::Json,
            enable_performance_tracing: false,
            ..Self::for_local()
        }
    }

    /// JSON output with span timings and debug-level kernel events.
    pub fn for_performance() -> Self {
        Self {
            directives: Some(KERNEL_DEBUG_DIRECTIVES.to_string()),
            span_events: FmtSpan::ENTER | FmtSpan::EXIT | FmtSpan::CLOSE,
            enable_performance_tracing: true,
            ..Self::for_ci()
        }
    }

    /// Start from the `TILEWISE_TRACING_PROFILE` preset (`local`, `ci` or
    /// `performance`) and apply the remaining overrides:
    ///
    /// - `TILEWISE_TRACING_DIRECTIVES`: filter directives
    /// - `TILEWISE_TRACING_FORMAT`: `pretty`, `compact` or `json`
    /// - `TILEWISE_PERF_TRACING`: `true`/`1`/`yes` to enable performance spans
    /// - `TILEWISE_PERF_THRESHOLD_US`: minimum span duration to report
    pub fn from_env() -> Self {
        let profile = env::var(ENV_PROFILE)
            .unwrap_or_else(|_| "local".to_string())
            .to_ascii_lowercase();

        let mut config = match profile.as_str() {
            "ci" => Self::for_ci(),
            "performance" => Self::for_performance(),
            _ => Self::for_local(),
        };

        if let Some(directives) = non_empty_var(ENV_DIRECTIVES) {
            config.directives = Some(directives);
        }

        if let Some(output) = non_empty_var(ENV_FORMAT).and_then(|v| TracingOutput::from_env_value(&v)) {
            config.output = output;
        }
        // Escape codes corrupt JSON and most CI log viewers.
        if config.output == TracingOutput::Json || profile == "ci" {
            config.ansi = false;
        }

        if let Some(flag) = non_empty_var(ENV_PERF_TRACING) {
            config.enable_performance_tracing = parse_flag(&flag);
        }

        if let Some(threshold) = non_empty_var(ENV_PERF_THRESHOLD).and_then(|v| v.trim().parse::<u64>().ok()) {
            config.performance_threshold_us = Some(threshold);
        }

        config
    }

    /// The performance-span part of this config.
    pub fn perf_settings(&self) -> PerfSettings {
        PerfSettings {
            enabled: self.enable_performance_tracing,
            threshold_us: self.performance_threshold_us,
        }
    }

    fn resolve_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter(err.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Failure to build or install the subscriber.
#[derive(Debug)]
pub enum TracingSetupError {
    InvalidFilter(String),
    /// A global subscriber is already installed.
    SubscriberInit(tracing_subscriber::util::TryInitError),
}

impl fmt::Display for TracingSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter(msg) => write!(f, "invalid tracing directive: {msg}"),
            Self::SubscriberInit(err) => write!(f, "failed to install global tracing subscriber: {err}"),
        }
    }
}

impl Error for TracingSetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInit(err) => Some(err),
            Self::InvalidFilter(_) => None,
        }
    }
}

/// Build a subscriber without installing it.
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let (filter, fmt_layer) = subscriber_layers(config)?;
    Ok(Registry::default().with(fmt_layer).with(filter))
}

fn subscriber_layers(
    config: &TracingConfig,
) -> Result<(EnvFilter, Box<dyn Layer<Registry> + Send + Sync>), TracingSetupError> {
    let filter = config.resolve_filter()?;
    let base = tracing_fmt::layer()
        .with_target(config.include_targets)
        .with_span_events(config.span_events.clone());

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.output {
        TracingOutput::Compact => Box::new(base.compact().with_ansi(config.ansi)),
        TracingOutput::Pretty => Box::new(base.pretty().with_ansi(config.ansi)),
        TracingOutput::Json => Box::new(base.json().with_ansi(false)),
    };

    Ok((filter, layer))
}

/// Install the configured subscriber as the process-wide default.
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    build_subscriber(config)?
        .try_init()
        .map_err(TracingSetupError::SubscriberInit)
}

/// Install a subscriber from [`TracingConfig::from_env`], ignoring the
/// error when one is already set. Intended for tests and benches.
pub fn try_init_from_env() {
    let _ = init_global_tracing(&TracingConfig::from_env());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl TracingOutput {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}
