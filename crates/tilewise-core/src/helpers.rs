//! Window construction and valid-region arithmetic used by every kernel's
//! `configure()`.

use crate::dimensions::{Coordinates, Steps, TensorShape, DIM_X, DIM_Y, MAX_DIMS};
use crate::tensor_info::TensorInfo;
use crate::types::{BorderSize, InterpolationPolicy, SamplingPolicy, ValidRegion};
use crate::window::{Dimension, Window};

/// Smallest multiple of `multiple` that is `>= value`.
pub fn ceil_to_multiple(value: i32, multiple: i32) -> i32 {
    debug_assert!(multiple > 0, "multiple must be positive");
    (value + multiple - 1).div_euclid(multiple) * multiple
}

/// Largest multiple of `multiple` that is `<= value`.
pub fn floor_to_multiple(value: i32, multiple: i32) -> i32 {
    debug_assert!(multiple > 0, "multiple must be positive");
    value.div_euclid(multiple) * multiple
}

/// Coordinates of the `index`-th element in row-major order (axis 0 fastest).
pub fn index2coords(shape: &TensorShape, mut index: usize) -> Coordinates {
    let mut coords = Coordinates::new(&[0]);
    let mut remaining = shape.total_size();
    for d in (0..shape.num_dimensions()).rev() {
        remaining /= shape[d].max(1);
        coords.set(d, (index / remaining.max(1)) as i32);
        index %= remaining.max(1);
    }
    coords
}

/// Inverse of [`index2coords`].
pub fn coords2index(shape: &TensorShape, coords: &Coordinates) -> usize {
    let mut index = 0usize;
    let mut stride = 1usize;
    for d in 0..coords.num_dimensions() {
        index += coords[d] as usize * stride;
        stride *= shape[d];
    }
    index
}

fn shrink(extent: usize, front: u32, back: u32) -> i32 {
    (extent as i32 - front as i32 - back as i32).max(0)
}

fn set_higher_dimensions(window: &mut Window, region: &ValidRegion, steps: &Steps, first: usize) {
    for n in first..region.num_dimensions() {
        let step = if n == 2 { steps[2] } else { 1 };
        window.set(
            n,
            Dimension::new(region.anchor[n], region.anchor[n] + region.shape[n].max(1) as i32, step),
        );
    }
}

/// Largest window over `valid_region` whose X/Y extents are whole multiples
/// of `steps`. With `skip_border` the border is excluded from X and Y;
/// otherwise it is ignored.
///
/// The end is rounded up, so the last iteration may reach past the region;
/// access-window negotiation takes care of that.
pub fn calculate_max_window(
    valid_region: &ValidRegion,
    steps: &Steps,
    skip_border: bool,
    border_size: BorderSize,
) -> Window {
    let border = if skip_border { border_size } else { BorderSize::empty() };
    let anchor = &valid_region.anchor;
    let shape = &valid_region.shape;
    let mut window = Window::new();

    let start_x = anchor[DIM_X] + border.left as i32;
    window.set(
        DIM_X,
        Dimension::new(
            start_x,
            start_x + ceil_to_multiple(shrink(shape[DIM_X], border.left, border.right), steps[DIM_X]),
            steps[DIM_X],
        ),
    );

    if valid_region.num_dimensions() > 1 {
        let start_y = anchor[DIM_Y] + border.top as i32;
        window.set(
            DIM_Y,
            Dimension::new(
                start_y,
                start_y + ceil_to_multiple(shrink(shape[DIM_Y], border.top, border.bottom), steps[DIM_Y]),
                steps[DIM_Y],
            ),
        );
    }

    set_higher_dimensions(&mut window, valid_region, steps, 2);
    window
}

/// [`calculate_max_window`] over the whole of `shape`, no border.
pub fn calculate_max_window_for_shape(shape: &TensorShape, steps: &Steps) -> Window {
    calculate_max_window(&ValidRegion::from_shape(*shape), steps, false, BorderSize::empty())
}

/// [`calculate_max_window`] over the valid region of `info`.
pub fn calculate_max_window_for_info(
    info: &TensorInfo,
    steps: &Steps,
    skip_border: bool,
    border_size: BorderSize,
) -> Window {
    calculate_max_window(&info.valid_region(), steps, skip_border, border_size)
}

/// Window for kernels that only filter along X: the horizontal border is
/// skipped when `skip_border`, and Y runs row by row over the region plus,
/// when not skipping, the vertical border.
pub fn calculate_max_window_horizontal(
    valid_region: &ValidRegion,
    steps: &Steps,
    skip_border: bool,
    border_size: BorderSize,
) -> Window {
    let mut border = border_size;
    if skip_border {
        border.top = 0;
        border.bottom = 0;
    } else {
        border.left = 0;
        border.right = 0;
    }
    let anchor = &valid_region.anchor;
    let shape = &valid_region.shape;
    let mut window = Window::new();

    let start_x = anchor[DIM_X] + border.left as i32;
    window.set(
        DIM_X,
        Dimension::new(
            start_x,
            start_x + ceil_to_multiple(shrink(shape[DIM_X], border.left, border.right), steps[DIM_X]),
            steps[DIM_X],
        ),
    );

    if valid_region.num_dimensions() > 1 {
        window.set(
            DIM_Y,
            Dimension::new(
                anchor[DIM_Y] - border.top as i32,
                anchor[DIM_Y] + shape[DIM_Y] as i32 + border.bottom as i32,
                1,
            ),
        );
    }

    set_higher_dimensions(&mut window, valid_region, &Steps::default(), 2);
    window
}

/// Window that also covers the border around `valid_region`, used by
/// kernels that write the border itself.
pub fn calculate_max_enlarged_window(valid_region: &ValidRegion, steps: &Steps, border_size: BorderSize) -> Window {
    let anchor = &valid_region.anchor;
    let shape = &valid_region.shape;
    let border = border_size;
    let mut window = Window::new();

    let start_x = anchor[DIM_X] - border.left as i32;
    let width = shape[DIM_X] as i32 + border.left as i32 + border.right as i32;
    window.set(
        DIM_X,
        Dimension::new(start_x, start_x + ceil_to_multiple(width, steps[DIM_X]), steps[DIM_X]),
    );

    if valid_region.num_dimensions() > 1 {
        let start_y = anchor[DIM_Y] - border.top as i32;
        let height = shape[DIM_Y] as i32 + border.top as i32 + border.bottom as i32;
        window.set(
            DIM_Y,
            Dimension::new(start_y, start_y + ceil_to_multiple(height, steps[DIM_Y]), steps[DIM_Y]),
        );
    }

    set_higher_dimensions(&mut window, valid_region, steps, 2);
    window
}

/// Region defined in every input: per axis the latest start and earliest
/// end, over the lowest rank among `regions`.
///
/// Commutative, associative and idempotent. Disjoint inputs give an empty
/// (zero-extent) region.
pub fn intersect_valid_regions(regions: &[ValidRegion]) -> ValidRegion {
    let Some(first) = regions.first() else {
        return ValidRegion::default();
    };
    let rank = regions.iter().map(ValidRegion::num_dimensions).min().unwrap_or(0);
    let mut anchors = [0i32; MAX_DIMS];
    let mut extents = [1usize; MAX_DIMS];
    for d in 0..rank {
        let start = regions.iter().map(|r| r.start(d)).max().unwrap_or(first.start(d));
        let end = regions.iter().map(|r| r.end(d)).min().unwrap_or(first.end(d));
        anchors[d] = start;
        extents[d] = (end - start).max(0) as usize;
    }
    ValidRegion::new(Coordinates::new(&anchors[..rank]), TensorShape::new(&extents[..rank]))
}

/// Output valid region of a resampling kernel that maps `src_info` onto
/// `dst_shape`.
///
/// With a defined border the region is the input region scaled. With an
/// undefined border, outputs whose sample point needs input outside the
/// valid region are excluded, according to `interpolation` and `sampling`.
pub fn calculate_valid_region_scale(
    src_info: &TensorInfo,
    dst_shape: &TensorShape,
    interpolation: InterpolationPolicy,
    sampling: SamplingPolicy,
    border_undefined: bool,
) -> ValidRegion {
    let src_shape = src_info.tensor_shape();
    let scale_x = dst_shape[DIM_X] as f32 / src_shape[DIM_X] as f32;
    let scale_y = dst_shape[DIM_Y] as f32 / src_shape[DIM_Y] as f32;
    let sp = sampling.offset();

    let in_region = src_info.valid_region();
    let start_in_x = in_region.start(DIM_X) as f32;
    let start_in_y = in_region.start(DIM_Y) as f32;
    let end_in_x = in_region.end(DIM_X) as f32;
    let end_in_y = in_region.end(DIM_Y) as f32;

    let mut start_x = (start_in_x * scale_x) as i32;
    let mut start_y = (start_in_y * scale_y) as i32;
    let mut end_x = ((end_in_x * scale_x).ceil() as i32).min(dst_shape[DIM_X] as i32);
    let mut end_y = ((end_in_y * scale_y).ceil() as i32).min(dst_shape[DIM_Y] as i32);

    if border_undefined {
        match interpolation {
            InterpolationPolicy::NearestNeighbor => {
                // start_out + sp >= start_in * scale, end_out - 1 + sp < end_in * scale
                start_x = (start_in_x * scale_x - sp).ceil() as i32;
                start_y = (start_in_y * scale_y - sp).ceil() as i32;
                end_x = (end_in_x * scale_x - sp).ceil() as i32;
                end_y = (end_in_y * scale_y - sp).ceil() as i32;
            }
            InterpolationPolicy::Bilinear => {
                start_x = ((start_in_x + sp) * scale_x - sp).ceil() as i32;
                start_y = ((start_in_y + sp) * scale_y - sp).ceil() as i32;
                end_x = ((end_in_x - 1.0 + sp) * scale_x - sp + 1.0).floor() as i32;
                end_y = ((end_in_y - 1.0 + sp) * scale_y - sp + 1.0).floor() as i32;
            }
            InterpolationPolicy::Area => {}
        }
    }

    let mut region = ValidRegion::from_shape(*dst_shape);
    let anchor_x = start_x.max(0);
    let anchor_y = start_y.max(0);
    region.set(
        DIM_X,
        anchor_x,
        ((end_x.min(dst_shape[DIM_X] as i32) - anchor_x).max(0) as usize).min(dst_shape[DIM_X]),
    );
    region.set(
        DIM_Y,
        anchor_y,
        ((end_y.min(dst_shape[DIM_Y] as i32) - anchor_y).max(0) as usize).min(dst_shape[DIM_Y]),
    );
    region
}
