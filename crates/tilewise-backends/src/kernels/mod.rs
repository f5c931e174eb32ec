//! Reference kernels built on the window/padding negotiation.
//!
//! Every kernel follows the same shape: `validate()` checks the arguments
//! and negotiates on clones of the infos, `configure()` runs the same
//! checks and then negotiates for real, and [`crate::Kernel::run`] walks
//! the window it is handed with
//! [`execute_window_loop`](tilewise_core::execute_window_loop).

pub mod box3x3;
pub mod corner_candidates;
pub mod fill_border;
pub mod half_scale;
pub mod min_max;
pub mod scale;
pub mod sort_euclidean;
pub mod transpose;

pub use box3x3::Box3x3Kernel;
pub use corner_candidates::{Candidate, CornerCandidatesKernel};
pub use fill_border::FillBorderKernel;
pub use half_scale::HalfScaleHorizontalKernel;
pub use min_max::{MinMax, MinMaxKernel};
pub use scale::ScaleKernel;
pub use sort_euclidean::SortEuclideanDistanceKernel;
pub use transpose::TransposeKernel;

use tilewise_core::{DataType, Error, Status, Tensor, TensorInfo};

/// Copy `size` bytes between two element offsets.
///
/// # Safety
///
/// Same contract as [`Tensor::store`]: nothing else may touch the
/// destination bytes during the call.
unsafe fn copy_element(src: &Tensor, src_offset: isize, dst: &Tensor, dst_offset: isize, size: usize) {
    for i in 0..size as isize {
        dst.store(dst_offset + i, src.load::<u8>(src_offset + i));
    }
}

/// # Safety
///
/// Same contract as [`Tensor::store`].
unsafe fn write_bytes(dst: &Tensor, offset: isize, bytes: &[u8]) {
    for (i, &b) in bytes.iter().enumerate() {
        dst.store(offset + i as isize, b);
    }
}

fn ensure_data_type(operation: &'static str, info: &TensorInfo, supported: &[DataType]) -> Status {
    tilewise_core::ensure!(
        supported.contains(&info.data_type()),
        Error::UnsupportedDataType {
            operation,
            data_type: info.data_type(),
        }
    );
    Ok(())
}

fn ensure_same_shape(expected: &TensorInfo, actual: &TensorInfo) -> Status {
    tilewise_core::ensure!(
        expected.tensor_shape() == actual.tensor_shape(),
        Error::shape_mismatch(expected.tensor_shape(), actual.tensor_shape())
    );
    Ok(())
}
