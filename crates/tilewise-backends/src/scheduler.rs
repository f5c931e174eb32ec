//! Window-splitting schedulers.
//!
//! A scheduler takes a configured [`Kernel`], splits its window along one
//! axis with [`Window::split_window`] and calls [`Kernel::run`] once per
//! partition. [`CpuScheduler`] runs the partitions on a rayon pool;
//! [`SingleThreadScheduler`] runs the whole window on the calling thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use tilewise_backends::scheduler::{CpuScheduler, Hints, Scheduler, SchedulerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = CpuScheduler::new(SchedulerConfig::from_env())?;
//! # let kernel: &dyn tilewise_backends::Kernel = todo!();
//! # let tensors = tilewise_backends::TensorPack::new();
//! scheduler.schedule(kernel, &tensors, Hints::default())?;
//! # Ok(())
//! # }
//! ```

use std::env;
use std::time::Instant;

use rayon::prelude::*;
use tilewise_core::{Window, DIM_Y, MAX_DIMS};
use tilewise_tracing::perf_span_threshold;
use tilewise_tracing::performance::{record_dispatch, record_throughput, PerfSettings};
use tracing::trace;

use crate::error::{BackendError, Result};
use crate::kernel::{Kernel, TensorPack, ThreadInfo};

const ENV_NUM_THREADS: &str = "TILEWISE_NUM_THREADS";
const ENV_SPLIT_DIMENSION: &str = "TILEWISE_SPLIT_DIMENSION";

/// Per-call scheduling hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hints {
    /// Axis the kernel window is split along.
    pub split_dimension: usize,
}

impl Hints {
    pub fn new(split_dimension: usize) -> Self {
        Self { split_dimension }
    }
}

impl Default for Hints {
    fn default() -> Self {
        Self::new(DIM_Y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub num_threads: usize,
    /// Split axis used by [`Scheduler::schedule_default`].
    pub split_dimension: usize,
    /// Per-dispatch performance spans; off by default.
    pub perf: PerfSettings,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            split_dimension: DIM_Y,
            perf: PerfSettings::default(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `TILEWISE_NUM_THREADS` and
    /// `TILEWISE_SPLIT_DIMENSION`, with performance spans configured by the
    /// tracing environment (`TILEWISE_PERF_TRACING`,
    /// `TILEWISE_PERF_THRESHOLD_US`). Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self {
            perf: PerfSettings::from_env(),
            ..Self::default()
        };
        if let Some(n) = parse_var::<usize>(ENV_NUM_THREADS).filter(|&n| n > 0) {
            config.num_threads = n;
        }
        if let Some(d) = parse_var::<usize>(ENV_SPLIT_DIMENSION).filter(|&d| d < MAX_DIMS) {
            config.split_dimension = d;
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(BackendError::invalid_config("num_threads must be at least 1"));
        }
        if self.split_dimension >= MAX_DIMS {
            return Err(BackendError::invalid_config(format!(
                "split_dimension {} out of range (max {})",
                self.split_dimension,
                MAX_DIMS - 1
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub trait Scheduler {
    fn num_threads(&self) -> usize;

    /// Run `kernel` over its whole window, split along
    /// `hints.split_dimension` when the kernel allows it.
    fn schedule(&self, kernel: &dyn Kernel, tensors: &TensorPack<'_>, hints: Hints) -> Result<()>;

    fn schedule_default(&self, kernel: &dyn Kernel, tensors: &TensorPack<'_>) -> Result<()> {
        self.schedule(kernel, tensors, Hints::default())
    }
}

/// Number of partitions `window` is split into along `dim`.
fn partitions(kernel: &dyn Kernel, window: &Window, dim: usize, num_threads: usize) -> usize {
    if !kernel.is_parallelisable() {
        return 1;
    }
    window.num_iterations(dim).clamp(1, num_threads.max(1))
}

/// Runs partitions on a dedicated rayon pool.
pub struct CpuScheduler {
    pool: rayon::ThreadPool,
    config: SchedulerConfig,
}

impl CpuScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("tilewise-worker-{i}"))
            .build()
            .map_err(|e| BackendError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Scheduler for CpuScheduler {
    fn num_threads(&self) -> usize {
        self.config.num_threads
    }

    #[tracing::instrument(skip_all, fields(kernel = kernel.name(), split = hints.split_dimension))]
    fn schedule(&self, kernel: &dyn Kernel, tensors: &TensorPack<'_>, hints: Hints) -> Result<()> {
        let window = *kernel.window();
        let dim = hints.split_dimension;
        debug_assert!(dim < MAX_DIMS, "split dimension {dim} out of range");
        let num = partitions(kernel, &window, dim, self.num_threads());

        let perf = self.config.perf.enabled.then(|| {
            perf_span_threshold!(
                "scheduler::schedule",
                self.config.perf.threshold_us,
                kernel = kernel.name(),
                partitions = num,
            )
        });
        let _entered = perf.as_ref().map(|p| p.enter());
        let start = Instant::now();

        if num == 1 {
            kernel.run(tensors, &window, &ThreadInfo::default())?;
        } else {
            self.pool.install(|| {
                (0..num).into_par_iter().try_for_each(|thread_id| {
                    let part = window.split_window(dim, thread_id, num);
                    trace!(thread_id, start = part[dim].start(), end = part[dim].end(), "partition");
                    kernel.run(
                        tensors,
                        &part,
                        &ThreadInfo {
                            thread_id,
                            num_threads: num,
                        },
                    )
                })
            })?;
        }

        let elapsed_us = start.elapsed().as_micros() as u64;
        record_dispatch(kernel.name(), num, elapsed_us);
        record_throughput(kernel.name(), window.num_iterations_total(), elapsed_us);
        Ok(())
    }

    fn schedule_default(&self, kernel: &dyn Kernel, tensors: &TensorPack<'_>) -> Result<()> {
        self.schedule(kernel, tensors, Hints::new(self.config.split_dimension))
    }
}

/// Runs every kernel on the calling thread, one partition.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThreadScheduler;

impl Scheduler for SingleThreadScheduler {
    fn num_threads(&self) -> usize {
        1
    }

    #[tracing::instrument(skip_all, fields(kernel = kernel.name()))]
    fn schedule(&self, kernel: &dyn Kernel, tensors: &TensorPack<'_>, _hints: Hints) -> Result<()> {
        let start = Instant::now();
        kernel.run(tensors, kernel.window(), &ThreadInfo::default())?;
        record_dispatch(kernel.name(), 1, start.elapsed().as_micros() as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tilewise_core::Dimension;

    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    /// Records the Y range of every partition it is run on.
    struct Recorder {
        window: Window,
        parallel: bool,
        seen: Mutex<Vec<(usize, usize, i32, i32)>>,
    }

    impl Recorder {
        fn new(rows: i32, parallel: bool) -> Self {
            let mut window = Window::new();
            window.set(0, Dimension::new(0, 4, 1));
            window.set(1, Dimension::new(0, rows, 1));
            Self {
                window,
                parallel,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn rows(&self) -> Vec<i32> {
            let mut seen = self.seen.lock().clone();
            seen.sort_by_key(|s| s.2);
            seen.iter().flat_map(|&(_, _, s, e)| s..e).collect()
        }
    }

    impl Kernel for Recorder {
        fn name(&self) -> &'static str {
            "Recorder"
        }

        fn window(&self) -> &Window {
            &self.window
        }

        fn is_parallelisable(&self) -> bool {
            self.parallel
        }

        fn run(&self, _tensors: &TensorPack<'_>, window: &Window, info: &ThreadInfo) -> Result<()> {
            self.seen
                .lock()
                .push((info.thread_id, info.num_threads, window.y().start(), window.y().end()));
            Ok(())
        }
    }

    #[test]
    fn test_cpu_scheduler_covers_window_once() -> Result<()> {
        let scheduler = CpuScheduler::new(SchedulerConfig {
            num_threads: 3,
            split_dimension: DIM_Y,
            ..SchedulerConfig::default()
        })?;
        let kernel = Recorder::new(10, true);
        scheduler.schedule_default(&kernel, &TensorPack::new())?;
        assert_eq!(kernel.seen.lock().len(), 3);
        assert_eq!(kernel.rows(), (0..10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_fewer_rows_than_threads() -> Result<()> {
        let scheduler = CpuScheduler::new(SchedulerConfig {
            num_threads: 8,
            split_dimension: DIM_Y,
            ..SchedulerConfig::default()
        })?;
        let kernel = Recorder::new(2, true);
        scheduler.schedule(&kernel, &TensorPack::new(), Hints::default())?;
        assert_eq!(kernel.seen.lock().len(), 2);
        assert_eq!(kernel.rows(), vec![0, 1]);
        Ok(())
    }

    #[test]
    fn test_non_parallelisable_runs_once() -> Result<()> {
        let scheduler = CpuScheduler::new(SchedulerConfig {
            num_threads: 4,
            split_dimension: DIM_Y,
            ..SchedulerConfig::default()
        })?;
        let kernel = Recorder::new(16, false);
        scheduler.schedule_default(&kernel, &TensorPack::new())?;
        assert_eq!(*kernel.seen.lock(), vec![(0, 1, 0, 16)]);
        Ok(())
    }

    #[test]
    fn test_single_thread_scheduler() -> Result<()> {
        let kernel = Recorder::new(5, true);
        SingleThreadScheduler.schedule_default(&kernel, &TensorPack::new())?;
        assert_eq!(*kernel.seen.lock(), vec![(0, 1, 0, 5)]);
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulerConfig {
            num_threads: 0,
            split_dimension: DIM_Y,
            ..SchedulerConfig::default()
        };
        assert!(matches!(CpuScheduler::new(config), Err(BackendError::InvalidConfig(_))));
        let config = SchedulerConfig {
            num_threads: 1,
            split_dimension: MAX_DIMS,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock();
        env::set_var(ENV_NUM_THREADS, "3");
        env::set_var(ENV_SPLIT_DIMENSION, "0");
        let config = SchedulerConfig::from_env();
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.split_dimension, 0);

        env::set_var(ENV_NUM_THREADS, "zero");
        env::set_var(ENV_SPLIT_DIMENSION, "9");
        let config = SchedulerConfig::from_env();
        let defaults = SchedulerConfig::default();
        assert_eq!(config.num_threads, defaults.num_threads);
        assert_eq!(config.split_dimension, defaults.split_dimension);
        env::remove_var(ENV_NUM_THREADS);
        env::remove_var(ENV_SPLIT_DIMENSION);
    }

    #[test]
    fn test_perf_settings_from_tracing_env() {
        let _guard = ENV_LOCK.lock();
        env::set_var("TILEWISE_PERF_TRACING", "1");
        env::set_var("TILEWISE_PERF_THRESHOLD_US", "250");
        let config = SchedulerConfig::from_env();
        env::remove_var("TILEWISE_PERF_TRACING");
        env::remove_var("TILEWISE_PERF_THRESHOLD_US");
        assert_eq!(
            config.perf,
            PerfSettings {
                enabled: true,
                threshold_us: Some(250)
            }
        );
    }

    #[test]
    fn test_schedule_with_perf_spans() -> Result<()> {
        let scheduler = CpuScheduler::new(SchedulerConfig {
            num_threads: 2,
            split_dimension: DIM_Y,
            perf: PerfSettings {
                enabled: true,
                threshold_us: Some(0),
            },
        })?;
        let kernel = Recorder::new(6, true);
        scheduler.schedule_default(&kernel, &TensorPack::new())?;
        assert_eq!(kernel.rows(), (0..6).collect::<Vec<_>>());
        Ok(())
    }
}
