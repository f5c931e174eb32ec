//! Transpose X and Y in 4x4 blocks, for 1, 2 or 4 byte elements.

use bytemuck::Pod;
use tilewise_core::{
    calculate_max_window_for_info, execute_window_loop, update_window_and_padding, AccessWindow,
    AccessWindowRectangle, AccessWindowTranspose, BorderSize, Error, Result, Status, Steps, Tensor, TensorInfo,
    TensorIterator, Window, DIM_X, DIM_Y,
};
use tilewise_tracing::performance::record_negotiation;

use crate::kernel::{ensure_same_data_type, window_unchanged, Kernel, TensorPack, TensorSlot, ThreadInfo};

const BLOCK: usize = 4;

#[derive(Debug)]
pub struct TransposeKernel {
    window: Window,
}

impl TransposeKernel {
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

/// `shape` with X and Y swapped.
fn transposed_shape(info: &TensorInfo) -> tilewise_core::TensorShape {
    let mut shape = *info.tensor_shape();
    shape.set(DIM_X, info.dimension(DIM_Y));
    shape.set(DIM_Y, info.dimension(DIM_X));
    shape
}

fn validate_arguments(src: &TensorInfo, dst: &TensorInfo) -> Status {
    tilewise_core::ensure!(
        matches!(src.element_size(), 1 | 2 | 4),
        Error::UnsupportedDataType {
            operation: "Transpose",
            data_type: src.data_type(),
        }
    );
    ensure_same_data_type(src.data_type(), dst.data_type())?;
    let expected = transposed_shape(src);
    tilewise_core::ensure!(
        *dst.tensor_shape() == expected,
        Error::shape_mismatch(expected, dst.tensor_shape())
    );
    Ok(())
}

fn configure_window(src: &mut TensorInfo, dst: &mut TensorInfo) -> (Window, bool) {
    let padding_before = (src.padding(), dst.padding());
    let input_region = src.valid_region();
    let steps = Steps::new(&[BLOCK as i32, BLOCK as i32]);
    let mut window = calculate_max_window_for_info(src, &steps, false, BorderSize::empty());

    let mut src_access = AccessWindowRectangle::new(src, 0, 0, BLOCK as i32, BLOCK as i32);
    let mut dst_access = AccessWindowTranspose::new(dst, 0, 0, BLOCK as i32, BLOCK as i32);
    let changed = update_window_and_padding(&mut window, &mut [&mut src_access, &mut dst_access]);
    dst_access.set_valid_region(&window, input_region, false, BorderSize::empty());

    record_negotiation(
        "Transpose",
        changed,
        padding_before != (src.padding(), dst.padding()),
        window.num_iterations_total(),
    );
    (window, changed)
}

fn transpose_blocks<T: Pod>(src: &Tensor, dst: &Tensor, window: &Window) {
    let src_sy = src.info().strides_in_bytes()[DIM_Y] as isize;
    let dst_strides = dst.info().strides_in_bytes();
    let (dst_sx, dst_sy) = (dst_strides[DIM_X] as isize, dst_strides[DIM_Y] as isize);

    let mut iterators = [TensorIterator::new(src.info(), window)];
    execute_window_loop(window, &mut iterators, |id, it| {
        let mut corner = *id;
        corner.set(DIM_X, id.y());
        corner.set(DIM_Y, id.x());
        let origin = dst.info().offset_element_in_bytes(&corner);
        for j in 0..BLOCK as isize {
            let row: [T; BLOCK] = src.load_array(it[0].offset_by(j * src_sy));
            for (i, value) in row.into_iter().enumerate() {
                // SAFETY: partitions own disjoint source blocks, hence
                // disjoint destination blocks.
                unsafe { dst.store(origin + j * dst_sx + i as isize * dst_sy, value) };
            }
        }
    });
}

impl Kernel for TransposeKernel {
    fn name(&self) -> &'static str {
        "Transpose"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, tensors: &TensorPack<'_>, window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        let src = tensors.require(TensorSlot::Src0)?;
        let dst = tensors.require(TensorSlot::Dst)?;
        match src.info().element_size() {
            1 => transpose_blocks::<u8>(src, dst, window),
            2 => transpose_blocks::<u16>(src, dst, window),
            _ => transpose_blocks::<u32>(src, dst, window),
        }
        Ok(())
    }
}
