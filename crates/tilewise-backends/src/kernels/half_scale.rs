//! Halve the width of a U8 image by averaging horizontal pairs.
//!
//! The window runs over the output; the input is reached through a
//! horizontal access scaled by 2, so one step of eight outputs reads
//! sixteen inputs.

use tilewise_core::{
    calculate_max_window_for_info, execute_window_loop, update_window_and_padding, AccessWindow,
    AccessWindowHorizontal, BorderSize, DataType, Error, Result, Status, Steps, TensorInfo, TensorIterator, Window,
    DIM_X,
};
use tilewise_tracing::performance::record_negotiation;

use super::ensure_data_type;
use crate::kernel::{ensure_same_data_type, window_unchanged, Kernel, TensorPack, TensorSlot, ThreadInfo};

const ELEMS_PER_STEP: usize = 8;
const ELEMS_READ: usize = 2 * ELEMS_PER_STEP;

#[derive(Debug)]
pub struct HalfScaleHorizontalKernel {
    window: Window,
}

impl HalfScaleHorizontalKernel {
    pub fn validate(src: &TensorInfo, dst: &TensorInfo) -> Status {
        validate_arguments(src, dst)?;
        let (mut src, mut dst) = (src.clone(), dst.clone());
        let (_, changed) = configure_window(&mut src, &mut dst);
        window_unchanged(changed)
    }

    #[tracing::instrument(skip_all)]
    pub fn configure(src: &mut TensorInfo, dst: &mut TensorInfo) -> Result<Self> {
        Self::validate(src, dst)?;
        let (window, _) = configure_window(src, dst);
        Ok(Self { window })
    }
}

fn validate_arguments(src: &TensorInfo, dst: &TensorInfo) -> Status {
    ensure_data_type("HalfScaleHorizontal", src, &[DataType::U8])?;
    ensure_same_data_type(DataType::U8, dst.data_type())?;
    let mut expected = *src.tensor_shape();
    expected.set(DIM_X, src.dimension(DIM_X).div_ceil(2));
    tilewise_core::ensure!(
        *dst.tensor_shape() == expected,
        Error::shape_mismatch(expected, dst.tensor_shape())
    );
    Ok(())
}

fn configure_window(src: &mut TensorInfo, dst: &mut TensorInfo) -> (Window, bool) {
    let padding_before = (src.padding(), dst.padding());
    // Inputs whose pair partner lies outside the region do not count.
    let mut input_region = src.valid_region();
    let start = (input_region.start(DIM_X) + 1) / 2;
    let end = input_region.end(DIM_X) / 2;
    input_region.set(DIM_X, start, (end - start).max(0) as usize);

    let mut window = calculate_max_window_for_info(dst, &Steps::new(&[ELEMS_PER_STEP as i32]), false, BorderSize::empty());
    let mut src_access = AccessWindowHorizontal::with_scale(src, 0, ELEMS_READ as i32, 2.0);
    let mut dst_access = AccessWindowHorizontal::new(dst, 0, ELEMS_PER_STEP as i32);
    let changed = update_window_and_padding(&mut window, &mut [&mut src_access, &mut dst_access]);
    dst_access.set_valid_region(&window, input_region, false, BorderSize::empty());

    record_negotiation(
        "HalfScaleHorizontal",
        changed,
        padding_before != (src.padding(), dst.padding()),
        window.num_iterations_total(),
    );
    (window, changed)
}

impl Kernel for HalfScaleHorizontalKernel {
    fn name(&self) -> &'static str {
        "HalfScaleHorizontal"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, tensors: &TensorPack<'_>, window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        let src = tensors.require(TensorSlot::Src0)?;
        let dst = tensors.require(TensorSlot::Dst)?;

        let mut iterators = [TensorIterator::new(dst.info(), window)];
        execute_window_loop(window, &mut iterators, |id, it| {
            let mut coords = *id;
            coords.set(DIM_X, 2 * id.x());
            let pairs: [u8; ELEMS_READ] = src.load_array(src.info().offset_element_in_bytes(&coords));
            let mut out = [0u8; ELEMS_PER_STEP];
            for (i, o) in out.iter_mut().enumerate() {
                *o = ((pairs[2 * i] as u16 + pairs[2 * i + 1] as u16 + 1) / 2) as u8;
            }
            // SAFETY: partitions own disjoint destination windows.
            unsafe { dst.store_array(it[0].offset(), out) };
        });
        Ok(())
    }
}
