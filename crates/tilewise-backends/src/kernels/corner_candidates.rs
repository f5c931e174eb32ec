//! Collect every element of an F32 response map above a threshold.
//!
//! Partitions gather locally and append to the shared list under a lock,
//! so the order of the list depends on scheduling.

use parking_lot::Mutex;
use tilewise_core::{
    calculate_max_window_for_info, execute_window_loop, update_window_and_padding, AccessWindowHorizontal,
    BorderSize, DataType, Result, Status, Steps, TensorInfo, TensorIterator, Window, DIM_X, DIM_Y,
};

use super::ensure_data_type;
use crate::kernel::{window_unchanged, Kernel, TensorPack, TensorSlot, ThreadInfo};

/// A location and its response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: i32,
    pub y: i32,
    pub strength: f32,
}

#[derive(Debug)]
pub struct CornerCandidatesKernel {
    window: Window,
    threshold: f32,
    candidates: Mutex<Vec<Candidate>>,
}

impl CornerCandidatesKernel {
    pub fn validate(src: &TensorInfo) -> Status {
        ensure_data_type("CornerCandidates", src, &[DataType::F32])?;
        let mut src = src.clone();
        let (_, changed) = configure_window(&mut src);
        window_unchanged(changed)
    }

    /// Scan the valid region of `src`; keep responses strictly above
    /// `threshold`.
    #[tracing::instrument(skip(src))]
    pub fn configure(src: &mut TensorInfo, threshold: f32) -> Result<Self> {
        Self::validate(src)?;
        let (window, _) = configure_window(src);
        Ok(Self {
            window,
            threshold,
            candidates: Mutex::new(Vec::new()),
        })
    }

    /// Candidates found so far, in discovery order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.candidates.lock().clone()
    }

    /// Move the candidates out, leaving the kernel ready for another run.
    pub fn take_candidates(&self) -> Vec<Candidate> {
        std::mem::take(&mut *self.candidates.lock())
    }
}

fn configure_window(src: &mut TensorInfo) -> (Window, bool) {
    let mut window = calculate_max_window_for_info(src, &Steps::new(&[1]), false, BorderSize::empty());
    let mut access = AccessWindowHorizontal::new(src, 0, 1);
    let changed = update_window_and_padding(&mut window, &mut [&mut access]);
    (window, changed)
}

impl Kernel for CornerCandidatesKernel {
    fn name(&self) -> &'static str {
        "CornerCandidates"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, tensors: &TensorPack<'_>, window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        let src = tensors.require(TensorSlot::Src0)?;
        let mut found = Vec::new();
        let mut iterators = [TensorIterator::new(src.info(), window)];
        execute_window_loop(window, &mut iterators, |id, it| {
            let strength = src.load::<f32>(it[0].offset());
            if strength > self.threshold {
                found.push(Candidate {
                    x: id[DIM_X],
                    y: id[DIM_Y],
                    strength,
                });
            }
        });
        if !found.is_empty() {
            self.candidates.lock().extend(found);
        }
        Ok(())
    }
}
