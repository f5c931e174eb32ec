//! Global minimum and maximum of a U8, S16 or F32 tensor.
//!
//! Each partition folds its own sub-window and merges the result into the
//! kernel's accumulator under a lock. Call [`MinMaxKernel::reset`] before
//! reusing the kernel.

use bytemuck::Pod;
use parking_lot::Mutex;
use tilewise_core::{
    calculate_max_window_for_info, execute_window_loop, update_window_and_padding, AccessWindowHorizontal,
    BorderSize, DataType, Result, Status, Steps, Tensor, TensorInfo, TensorIterator, Window,
};

use super::ensure_data_type;
use crate::kernel::{window_unchanged, Kernel, TensorPack, TensorSlot, ThreadInfo};

const SUPPORTED: &[DataType] = &[DataType::U8, DataType::S16, DataType::F32];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f32,
    pub max: f32,
}

impl Default for MinMax {
    /// Identity of [`MinMax::merge`].
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }
}

impl MinMax {
    fn update(&mut self, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(&mut self, other: &MinMax) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

#[derive(Debug)]
pub struct MinMaxKernel {
    window: Window,
    data_type: DataType,
    result: Mutex<MinMax>,
}

impl MinMaxKernel {
    pub fn validate(src: &TensorInfo) -> Status {
        ensure_data_type("MinMax", src, SUPPORTED)?;
        let mut src = src.clone();
        let (_, changed) = configure_window(&mut src);
        window_unchanged(changed)
    }

    #[tracing::instrument(skip_all)]
    pub fn configure(src: &mut TensorInfo) -> Result<Self> {
        Self::validate(src)?;
        let (window, _) = configure_window(src);
        Ok(Self {
            window,
            data_type: src.data_type(),
            result: Mutex::new(MinMax::default()),
        })
    }

    pub fn reset(&self) {
        *self.result.lock() = MinMax::default();
    }

    /// Accumulated extrema; infinities until something ran.
    pub fn result(&self) -> MinMax {
        *self.result.lock()
    }
}

fn configure_window(src: &mut TensorInfo) -> (Window, bool) {
    let mut window = calculate_max_window_for_info(src, &Steps::new(&[1]), false, BorderSize::empty());
    let mut access = AccessWindowHorizontal::new(src, 0, 1);
    let changed = update_window_and_padding(&mut window, &mut [&mut access]);
    (window, changed)
}

fn fold<T: Pod + Into<f32>>(src: &Tensor, window: &Window) -> MinMax {
    let mut local = MinMax::default();
    let mut iterators = [TensorIterator::new(src.info(), window)];
    execute_window_loop(window, &mut iterators, |_, it| {
        local.update(src.load::<T>(it[0].offset()).into());
    });
    local
}

impl Kernel for MinMaxKernel {
    fn name(&self) -> &'static str {
        "MinMax"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, tensors: &TensorPack<'_>, window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        let src = tensors.require(TensorSlot::Src0)?;
        let local = match self.data_type {
            DataType::U8 => fold::<u8>(src, window),
            DataType::S16 => fold::<i16>(src, window),
            _ => fold::<f32>(src, window),
        };
        self.result.lock().merge(&local);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewise_core::{Error, TensorShape};

    #[test]
    fn test_min_max_s16() -> crate::Result<()> {
        let mut info = TensorInfo::new(TensorShape::from([3, 2]), DataType::S16);
        let kernel = MinMaxKernel::configure(&mut info)?;
        let mut src = Tensor::new(info);
        src.allocate()?;
        src.import(&[4i16, -7, 12, 0, 3, 3])?;
        let pack = TensorPack::new().with(TensorSlot::Src0, &src);

        // Two halves merged.
        for id in 0..2 {
            let part = kernel.window().split_window(1, id, 2);
            kernel.run(&pack, &part, &ThreadInfo { thread_id: id, num_threads: 2 })?;
        }
        assert_eq!(kernel.result(), MinMax { min: -7.0, max: 12.0 });

        kernel.reset();
        assert_eq!(kernel.result(), MinMax::default());
        Ok(())
    }

    #[test]
    fn test_needs_no_padding() -> Result<()> {
        let mut info = TensorInfo::new(TensorShape::from([7, 3]), DataType::F32);
        MinMaxKernel::configure(&mut info)?;
        assert!(!info.has_padding());
        Ok(())
    }

    #[test]
    fn test_rejects_u16() {
        let info = TensorInfo::new(TensorShape::from([4]), DataType::U16);
        assert!(matches!(
            MinMaxKernel::validate(&info),
            Err(Error::UnsupportedDataType { operation: "MinMax", .. })
        ));
    }
}
