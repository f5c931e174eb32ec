//! Greedy non-maximum suppression by distance.
//!
//! Candidates are visited strongest first; one is kept unless an already
//! kept candidate lies closer than `min_distance`. The pass is inherently
//! sequential, so the kernel is not parallelisable and its window is a
//! single position.

use parking_lot::Mutex;
use tilewise_core::{Error, Result, Status, Window};

use super::corner_candidates::Candidate;
use crate::kernel::{Kernel, TensorPack, ThreadInfo};

#[derive(Debug)]
pub struct SortEuclideanDistanceKernel {
    window: Window,
    min_distance: f32,
    input: Vec<Candidate>,
    output: Mutex<Vec<Candidate>>,
}

impl SortEuclideanDistanceKernel {
    pub fn validate(min_distance: f32) -> Status {
        tilewise_core::ensure!(
            min_distance.is_finite() && min_distance >= 0.0,
            Error::InvalidArgument(format!("min_distance must be finite and non-negative, got {min_distance}"))
        );
        Ok(())
    }

    #[tracing::instrument(skip(candidates), fields(candidates = candidates.len()))]
    pub fn configure(candidates: Vec<Candidate>, min_distance: f32) -> Result<Self> {
        Self::validate(min_distance)?;
        Ok(Self {
            window: Window::new(),
            min_distance,
            input: candidates,
            output: Mutex::new(Vec::new()),
        })
    }

    /// Surviving candidates, strongest first.
    pub fn keypoints(&self) -> Vec<Candidate> {
        self.output.lock().clone()
    }
}

impl Kernel for SortEuclideanDistanceKernel {
    fn name(&self) -> &'static str {
        "SortEuclideanDistance"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn is_parallelisable(&self) -> bool {
        false
    }

    fn run(&self, _tensors: &TensorPack<'_>, _window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        let mut sorted = self.input.clone();
        sorted.sort_by(|a, b| b.strength.total_cmp(&a.strength));

        let min_sq = self.min_distance * self.min_distance;
        let mut kept: Vec<Candidate> = Vec::with_capacity(sorted.len());
        for c in sorted {
            let crowded = kept.iter().any(|k| {
                let (dx, dy) = ((k.x - c.x) as f32, (k.y - c.y) as f32);
                dx * dx + dy * dy < min_sq
            });
            if !crowded {
                kept.push(c);
            }
        }
        *self.output.lock() = kept;
        Ok(())
    }
}
