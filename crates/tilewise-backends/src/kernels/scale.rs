//! Nearest-neighbour resize between tensors of any element type.
//!
//! Every output position may read anywhere in the input plane, so the input
//! is declared with a static access covering the whole plane plus border.

use tilewise_core::{
    calculate_max_window_for_info, calculate_valid_region_scale, execute_window_loop, update_window_and_padding,
    AccessWindowHorizontal, AccessWindowStatic, BorderSize, InterpolationPolicy, Result, SamplingPolicy, Status,
    Steps, TensorInfo, TensorIterator, Window, DIM_X, DIM_Y,
};
use tilewise_tracing::performance::record_negotiation;

use super::copy_element;
use crate::kernel::{ensure_same_data_type, window_unchanged, Kernel, TensorPack, TensorSlot, ThreadInfo};

const ELEMS_PER_STEP: i32 = 16;

#[derive(Debug)]
pub struct ScaleKernel {
    window: Window,
    sampling: SamplingPolicy,
}

impl ScaleKernel {
    pub fn validate(
        src: &TensorInfo,
        dst: &TensorInfo,
        sampling: SamplingPolicy,
        border_undefined: bool,
    ) -> Status {
        validate_arguments(src, dst)?;
        let (mut src, mut dst) = (src.clone(), dst.clone());
        let (_, changed) = configure_window(&mut src, &mut dst, sampling, border_undefined);
        window_unchanged(changed)
    }

    #[tracing::instrument(skip(src, dst))]
    pub fn configure(
        src: &mut TensorInfo,
        dst: &mut TensorInfo,
        sampling: SamplingPolicy,
        border_undefined: bool,
    ) -> Result<Self> {
        Self::validate(src, dst, sampling, border_undefined)?;
        let (window, _) = configure_window(src, dst, sampling, border_undefined);
        Ok(Self { window, sampling })
    }
}

fn validate_arguments(src: &TensorInfo, dst: &TensorInfo) -> Status {
    ensure_same_data_type(src.data_type(), dst.data_type())?;
    tilewise_core::ensure!(
        dst.dimension(DIM_X) > 0 && dst.dimension(DIM_Y) > 0 && src.dimension(DIM_X) > 0 && src.dimension(DIM_Y) > 0,
        tilewise_core::Error::InvalidArgument("scale needs non-empty planes".to_string())
    );
    for d in 2..src.num_dimensions().max(dst.num_dimensions()) {
        tilewise_core::ensure!(
            src.dimension(d) == dst.dimension(d),
            tilewise_core::Error::shape_mismatch(src.tensor_shape(), dst.tensor_shape())
        );
    }
    Ok(())
}

fn configure_window(
    src: &mut TensorInfo,
    dst: &mut TensorInfo,
    sampling: SamplingPolicy,
    border_undefined: bool,
) -> (Window, bool) {
    let border = BorderSize::uniform(1);
    let padding_before = (src.padding(), dst.padding());
    let dst_region = calculate_valid_region_scale(
        src,
        dst.tensor_shape(),
        InterpolationPolicy::NearestNeighbor,
        sampling,
        border_undefined,
    );
    let mut window = calculate_max_window_for_info(dst, &Steps::new(&[ELEMS_PER_STEP]), false, BorderSize::empty());

    let (width, height) = (src.dimension(DIM_X) as i32, src.dimension(DIM_Y) as i32);
    let mut src_access = AccessWindowStatic::new(
        src,
        -(border.left as i32),
        -(border.top as i32),
        width + border.right as i32,
        height + border.bottom as i32,
    );
    let mut dst_access = AccessWindowHorizontal::new(dst, 0, ELEMS_PER_STEP);
    let changed = update_window_and_padding(&mut window, &mut [&mut src_access, &mut dst_access]);
    dst.set_valid_region(dst_region);

    record_negotiation(
        "Scale",
        changed,
        padding_before != (src.padding(), dst.padding()),
        window.num_iterations_total(),
    );
    (window, changed)
}

impl Kernel for ScaleKernel {
    fn name(&self) -> &'static str {
        "Scale"
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
        let (src_w, src_h) = (src.info().dimension(DIM_X), src.info().dimension(DIM_Y));
        let dst_w = dst.info().dimension(DIM_X) as i32;
        let wr = src_w as f32 / dst_w as f32;
        let hr = src_h as f32 / dst.info().dimension(DIM_Y) as f32;
        let sp = self.sampling.offset();
        let es = src.info().element_size();
        let dst_sx = dst.info().strides_in_bytes()[DIM_X] as isize;

        let mut iterators = [TensorIterator::new(dst.info(), window)];
        execute_window_loop(window, &mut iterators, |id, it| {
            let in_y = (((id.y() as f32 + sp) * hr) as usize).min(src_h - 1);
            let mut coords = *id;
            coords.set(DIM_Y, in_y as i32);
            let last = (id.x() + ELEMS_PER_STEP).min(dst_w);
            for (i, x) in (id.x()..last).enumerate() {
                let in_x = (((x as f32 + sp) * wr) as usize).min(src_w - 1);
                coords.set(DIM_X, in_x as i32);
                let from = src.info().offset_element_in_bytes(&coords);
                // SAFETY: partitions own disjoint destination windows.
                unsafe { copy_element(src, from, dst, it[0].offset_by(i as isize * dst_sx), es) };
            }
        });
        Ok(())
    }
}
