//! Slice dispatch for GPU-style kernels.
//!
//! GPU kernels run one launch per 2D slice of their window: the X/Y extent
//! becomes the global work size and every higher axis is walked on the host.
//! Device management is left to the [`CommandQueue`] implementation.

use std::fmt;

use tilewise_core::{Window, DIM_X, DIM_Y, DIM_Z, MAX_DIMS};
use tracing::trace;

use crate::error::Result;

/// Launch extent in work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NdRange {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl NdRange {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub const fn total(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl fmt::Display for NdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Global work size covering `window`: one work item per step on X, Y and
/// Z. `None` when any of them is empty.
pub fn gws_from_window(window: &Window) -> Option<NdRange> {
    let extent = |dim: usize| {
        let d = window[dim];
        if d.step() == 0 {
            return 1;
        }
        ((d.end() - d.start()) / d.step()).max(0) as usize
    };
    let gws = NdRange::new(extent(DIM_X), extent(DIM_Y), extent(DIM_Z));
    (gws.total() > 0).then_some(gws)
}

/// Device queue kernels are enqueued on.
pub trait CommandQueue {
    fn enqueue(&mut self, kernel: &str, window: &Window, gws: NdRange, lws: Option<NdRange>) -> Result<()>;
}

/// A configured kernel dispatched as 2D slices.
pub trait GpuKernel {
    fn name(&self) -> &'static str;

    fn window(&self) -> &Window;

    /// Preferred local work size.
    fn lws_hint(&self) -> Option<NdRange> {
        None
    }
}

/// Enqueue `kernel` once per non-empty 2D slice of its window. Returns the
/// number of launches.
pub fn enqueue_2d_slices(kernel: &dyn GpuKernel, queue: &mut dyn CommandQueue) -> Result<usize> {
    let window = kernel.window();
    if window.is_empty() {
        return Ok(0);
    }
    let mut slice = window.first_slice_window_2d();
    let mut launches = 0usize;
    loop {
        if !slice_in_window(window, &slice) {
            break;
        }
        if let Some(gws) = gws_from_window(&slice) {
            trace!(kernel = kernel.name(), %gws, z = slice.z().start(), "enqueue slice");
            queue.enqueue(kernel.name(), &slice, gws, kernel.lws_hint())?;
            launches += 1;
        }
        if !window.slide_window_slice_2d(&mut slice) {
            break;
        }
    }
    Ok(launches)
}

/// Every iterated axis above Y of `slice` sits inside `window`.
fn slice_in_window(window: &Window, slice: &Window) -> bool {
    (DIM_Z..MAX_DIMS).all(|d| {
        let w = window[d];
        w.step() == 0 || (slice[d].start() >= w.start() && slice[d].start() < w.end())
    })
}

/// Queue that only records what it was asked to launch. Useful to inspect
/// the dispatch pattern of a kernel without a device.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    pub launches: Vec<(String, Window, NdRange)>,
}

impl CommandQueue for RecordingQueue {
    fn enqueue(&mut self, kernel: &str, window: &Window, gws: NdRange, _lws: Option<NdRange>) -> Result<()> {
        self.launches.push((kernel.to_string(), *window, gws));
        Ok(())
    }
}
