//! 3x3 box filter on U8 images, eight outputs per step.

use tilewise_core::{
    calculate_max_window_for_info, execute_window_loop, update_window_and_padding, AccessWindow,
    AccessWindowHorizontal, AccessWindowRectangle, BorderSize, DataType, Result, Status, Steps, TensorInfo,
    TensorIterator, Window, DIM_X, DIM_Y,
};
use tilewise_tracing::performance::record_negotiation;

use super::{ensure_data_type, ensure_same_shape};
use crate::kernel::{ensure_same_data_type, window_unchanged, Kernel, TensorPack, TensorSlot, ThreadInfo};

const ELEMS_PER_STEP: usize = 8;
/// Outputs plus one neighbour on each side.
const ELEMS_READ: usize = ELEMS_PER_STEP + 2;

#[derive(Debug)]
pub struct Box3x3Kernel {
    window: Window,
}

impl Box3x3Kernel {
    pub fn validate(src: &TensorInfo, dst: &TensorInfo, border_undefined: bool) -> Status {
        validate_arguments(src, dst)?;
        let (mut src, mut dst) = (src.clone(), dst.clone());
        let (_, changed) = configure_window(&mut src, &mut dst, border_undefined);
        window_unchanged(changed)
    }

    /// Negotiate the window and padding of `src`/`dst`. With
    /// `border_undefined` the outer ring of `dst` is left out of its valid
    /// region; otherwise `src` needs its border filled before running.
    #[tracing::instrument(skip(src, dst))]
    pub fn configure(src: &mut TensorInfo, dst: &mut TensorInfo, border_undefined: bool) -> Result<Self> {
        Self::validate(src, dst, border_undefined)?;
        let (window, _) = configure_window(src, dst, border_undefined);
        Ok(Self { window })
    }
}

fn validate_arguments(src: &TensorInfo, dst: &TensorInfo) -> Status {
    ensure_data_type("Box3x3", src, &[DataType::U8])?;
    ensure_same_data_type(DataType::U8, dst.data_type())?;
    ensure_same_shape(src, dst)
}

fn configure_window(src: &mut TensorInfo, dst: &mut TensorInfo, border_undefined: bool) -> (Window, bool) {
    let border = BorderSize::uniform(1);
    let padding_before = (src.padding(), dst.padding());
    let input_region = src.valid_region();
    let mut window = calculate_max_window_for_info(src, &Steps::new(&[ELEMS_PER_STEP as i32]), border_undefined, border);

    let mut src_access = AccessWindowRectangle::new(
        src,
        -(border.left as i32),
        -(border.top as i32),
        ELEMS_READ as i32,
        3,
    );
    let mut dst_access = AccessWindowHorizontal::new(dst, 0, ELEMS_PER_STEP as i32);
    let changed = update_window_and_padding(&mut window, &mut [&mut src_access, &mut dst_access]);
    dst_access.set_valid_region(&window, input_region, border_undefined, border);

    record_negotiation(
        "Box3x3",
        changed,
        padding_before != (src.padding(), dst.padding()),
        window.num_iterations_total(),
    );
    (window, changed)
}

impl Kernel for Box3x3Kernel {
    fn name(&self) -> &'static str {
        "Box3x3"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn border_size(&self) -> BorderSize {
        BorderSize::uniform(1)
    }

    fn run(&self, tensors: &TensorPack<'_>, window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        let src = tensors.require(TensorSlot::Src0)?;
        let dst = tensors.require(TensorSlot::Dst)?;
        let strides = src.info().strides_in_bytes();
        let (sx, sy) = (strides[DIM_X] as isize, strides[DIM_Y] as isize);

        let mut iterators = [
            TensorIterator::new(src.info(), window),
            TensorIterator::new(dst.info(), window),
        ];
        execute_window_loop(window, &mut iterators, |_, it| {
            let rows: [[u8; ELEMS_READ]; 3] = [-1isize, 0, 1].map(|dy| src.load_array(it[0].offset_by(dy * sy - sx)));
            let mut out = [0u8; ELEMS_PER_STEP];
            for (i, o) in out.iter_mut().enumerate() {
                let sum: u16 = rows.iter().map(|r| r[i] as u16 + r[i + 1] as u16 + r[i + 2] as u16).sum();
                *o = (sum / 9) as u8;
            }
            // SAFETY: partitions own disjoint destination windows.
            unsafe { dst.store_array(it[1].offset(), out) };
        });
        Ok(())
    }
}
