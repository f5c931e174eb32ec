//! Access patterns and padding negotiation.
//!
//! Each operand of a kernel declares which elements one window position
//! touches: an [`AccessWindow`]. During `configure()` the kernel negotiates
//! its window against all of them with [`update_window_and_padding`]:
//!
//! 1. Tensors that are no longer resizable (already allocated) cannot grow
//!    padding, so the window is shrunk until every access fits in the
//!    padding they have. Shrinking repeats until the window is stable,
//!    which makes the outcome independent of the order of the patterns.
//! 2. Resizable tensors then grow their padding to cover every access of
//!    the final window.
//!
//! Finally outputs record which part of them the kernel will define with
//! [`AccessWindow::set_valid_region`].
//!
//! # Geometry
//!
//! A rectangle access with offset `o`, extent `e` and scale `s` on an axis
//! driven by window dimension `[start, end)` step `p` touches tensor
//! elements `[start * s + o, (end - p) * s + o + e)`.
//!
//! # Example
//!
//! ```rust
//! use tilewise_core::access_window::{update_window_and_padding, AccessWindowRectangle, AccessWindow};
//! use tilewise_core::dimensions::{Steps, TensorShape};
//! use tilewise_core::helpers::calculate_max_window_for_info;
//! use tilewise_core::tensor_info::TensorInfo;
//! use tilewise_core::types::{BorderSize, DataType};
//!
//! let mut src = TensorInfo::new(TensorShape::from([10, 10]), DataType::U8);
//! let mut window = calculate_max_window_for_info(&src, &Steps::new(&[1]), true, BorderSize::uniform(1));
//! let mut access = AccessWindowRectangle::new(&mut src, -1, -1, 3, 3);
//! update_window_and_padding(&mut window, &mut [&mut access]);
//! assert_eq!(src.padding(), BorderSize::empty());
//! ```

use tracing::debug;

use crate::dimensions::{DIM_X, DIM_Y, MAX_DIMS};
use crate::tensor_info::TensorInfo;
use crate::types::{BorderSize, PaddingSize, ValidRegion};
use crate::window::{Dimension, Window};

/// Largest `required - k * step` (k >= 0) that is `<= available`.
///
/// # Panics
///
/// If `step <= 0`.
pub fn adjust_down(required: i32, available: i32, step: i32) -> i32 {
    assert!(step > 0, "step must be positive, got {step}");
    if required <= available {
        required
    } else {
        required - step * ceil_div(required - available, step)
    }
}

/// Smallest `required + k * step` (k >= 0) that is `>= available`.
///
/// # Panics
///
/// If `step <= 0`.
pub fn adjust_up(required: i32, available: i32, step: i32) -> i32 {
    assert!(step > 0, "step must be positive, got {step}");
    if required >= available {
        required
    } else {
        required + step * ceil_div(available - required, step)
    }
}

fn ceil_div(value: i32, divisor: i32) -> i32 {
    (value + divisor - 1) / divisor
}

/// One operand's declared access pattern, bound to that operand's metadata.
///
/// An access window without a bound tensor (an optional operand) accepts
/// every window, never pads, and passes valid regions through.
pub trait AccessWindow {
    /// Shrink `window` so every access fits the tensor's existing padding.
    /// Only acts on tensors that are not resizable. Returns whether the
    /// window changed.
    fn update_window_if_needed(&self, window: &mut Window) -> bool;

    /// Grow the tensor's padding so every access of `window` is in bounds.
    /// Only acts on resizable tensors. Returns whether the padding grew.
    fn update_padding_if_needed(&mut self, window: &Window) -> bool;

    /// Region of the tensor this pattern defines when the kernel runs
    /// `window` on inputs valid over `input_valid_region`. When
    /// `border_undefined`, elements depending on the input's border are
    /// excluded using `border_size`.
    fn compute_valid_region(
        &self,
        window: &Window,
        input_valid_region: ValidRegion,
        border_undefined: bool,
        border_size: BorderSize,
    ) -> ValidRegion;

    fn info_mut(&mut self) -> Option<&mut TensorInfo>;

    fn compute_valid_region_without_border(&self, window: &Window, input_valid_region: ValidRegion) -> ValidRegion {
        self.compute_valid_region(window, input_valid_region, false, BorderSize::empty())
    }

    /// Compute the valid region and store it on the bound tensor.
    fn set_valid_region(
        &mut self,
        window: &Window,
        input_valid_region: ValidRegion,
        border_undefined: bool,
        border_size: BorderSize,
    ) {
        let region = self.compute_valid_region(window, input_valid_region, border_undefined, border_size);
        if let Some(info) = self.info_mut() {
            info.set_valid_region(region);
        }
    }
}

fn padding_front(padding: &PaddingSize, axis: usize) -> u32 {
    if axis == DIM_X {
        padding.left
    } else {
        padding.top
    }
}

fn padding_back(padding: &PaddingSize, axis: usize) -> u32 {
    if axis == DIM_X {
        padding.right
    } else {
        padding.bottom
    }
}

fn tensor_rank(info: &TensorInfo) -> usize {
    info.num_dimensions().max(1)
}

/// Intersect axes `2..` of the window with the input region.
fn intersect_higher_dimensions(info: &TensorInfo, window: &Window, input: &ValidRegion, out: &mut ValidRegion) {
    for d in 2..info.num_dimensions().min(MAX_DIMS) {
        let start = window[d].start().max(input.start(d));
        let end = window[d].end().min(input.end(d));
        out.set(d, start, (end - start).max(0) as usize);
    }
}

/// Offset/extent/scale of a rectangle along one tensor axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisAccess {
    offset: i32,
    extent: i32,
    scale: f32,
}

impl AxisAccess {
    fn first(&self, d: &Dimension) -> i32 {
        (d.start() as f32 * self.scale).floor() as i32 + self.offset
    }

    /// One past the last element touched.
    fn last_end(&self, d: &Dimension) -> i32 {
        ((d.end() - d.step()) as f32 * self.scale).ceil() as i32 + self.offset + self.extent
    }

    /// Padding needed on each side of a tensor axis of length `len`.
    fn needed(&self, d: &Dimension, len: usize) -> (u32, u32) {
        if d.extent() <= 0 {
            return (0, 0);
        }
        let front = (-self.first(d)).max(0) as u32;
        let back = (self.last_end(d) - len as i32).max(0) as u32;
        (front, back)
    }

    /// Shrink `d` so its accesses stay in `[-front, len + back)`.
    ///
    /// Works on window positions: `floor(p * scale) >= m` holds exactly
    /// when `p >= m / scale`, and `ceil(p * scale) <= m` when
    /// `p <= m / scale`, so the bounds map back without rounding drift.
    fn shrink(&self, d: Dimension, len: usize, front: u32, back: u32) -> Dimension {
        if d.extent() <= 0 {
            return d;
        }
        let step = d.step().max(1);
        let mut start = d.start();
        let mut last = d.end() - step;

        let available_front = -(front as i32);
        if self.first(&d) < available_front {
            let lowest = ((available_front - self.offset) as f32 / self.scale).ceil() as i32;
            start = adjust_up(start, lowest, step);
        }

        let available_back = len as i32 + back as i32;
        if self.last_end(&d) > available_back {
            let highest = ((available_back - self.offset - self.extent) as f32 / self.scale).floor() as i32;
            last = adjust_down(last, highest, step);
        }

        let start = start.min(d.end());
        let end = (last + step).clamp(start, d.end());
        Dimension::new(start, end, d.step())
    }
}

/// Rectangular access: `width` x `height` elements at offset `(x, y)` from
/// each window position, optionally scaled.
///
/// Tensor X is driven by window axis `axes[0]` and tensor Y by `axes[1]`;
/// `[0, 1]` for ordinary kernels, `[1, 0]` for [`AccessWindowTranspose`].
pub struct AccessWindowRectangle<'a> {
    info: Option<&'a mut TensorInfo>,
    access: [AxisAccess; 2],
    axes: [usize; 2],
}

impl<'a> AccessWindowRectangle<'a> {
    pub fn new(info: &'a mut TensorInfo, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::with_scale(info, x, y, width, height, 1.0, 1.0)
    }

    /// # Panics
    ///
    /// On negative `width`/`height` or non-positive scales.
    pub fn with_scale(
        info: &'a mut TensorInfo,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        scale_x: f32,
        scale_y: f32,
    ) -> Self {
        Self::build(Some(info), x, y, width, height, scale_x, scale_y, [DIM_X, DIM_Y])
    }

    /// Pattern for an absent optional operand.
    pub fn unbound(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::build(None, x, y, width, height, 1.0, 1.0, [DIM_X, DIM_Y])
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        info: Option<&'a mut TensorInfo>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        scale_x: f32,
        scale_y: f32,
        axes: [usize; 2],
    ) -> Self {
        assert!(width >= 0, "width must not be negative, got {width}");
        assert!(height >= 0, "height must not be negative, got {height}");
        assert!(scale_x > 0.0, "scale_x must be positive, got {scale_x}");
        assert!(scale_y > 0.0, "scale_y must be positive, got {scale_y}");
        Self {
            info,
            access: [
                AxisAccess {
                    offset: x,
                    extent: width,
                    scale: scale_x,
                },
                AxisAccess {
                    offset: y,
                    extent: height,
                    scale: scale_y,
                },
            ],
            axes,
        }
    }

    /// Padding every access of `window` needs, regardless of what the
    /// tensor already has.
    pub fn get_needed_padding(&self, window: &Window) -> PaddingSize {
        let Some(info) = self.info.as_deref() else {
            return PaddingSize::empty();
        };
        let shape = info.tensor_shape();
        let (left, right) = self.access[DIM_X].needed(&window[self.axes[DIM_X]], shape[DIM_X]);
        let (top, bottom) = self.access[DIM_Y].needed(&window[self.axes[DIM_Y]], shape[DIM_Y]);
        PaddingSize::new(top, right, bottom, left)
    }
}

impl AccessWindow for AccessWindowRectangle<'_> {
    fn update_window_if_needed(&self, window: &mut Window) -> bool {
        let Some(info) = self.info.as_deref() else {
            return false;
        };
        if info.is_resizable() {
            return false;
        }
        let needed = self.get_needed_padding(window);
        if needed.max(&info.padding()) == info.padding() {
            return false;
        }

        let shape = info.tensor_shape();
        let padding = info.padding();
        let before = *window;
        // Y first: its shrink never widens X.
        for axis in [DIM_Y, DIM_X] {
            let w = self.axes[axis];
            let shrunk = self.access[axis].shrink(
                window[w],
                shape[axis],
                padding_front(&padding, axis),
                padding_back(&padding, axis),
            );
            window.set(w, shrunk);
        }
        window.validate();

        let changed = *window != before;
        if changed {
            debug!(?before, after = ?window, ?padding, "window shrunk to fit fixed padding");
        }
        changed
    }

    fn update_padding_if_needed(&mut self, window: &Window) -> bool {
        let needed = self.get_needed_padding(window);
        match self.info.as_deref_mut() {
            Some(info) if info.is_resizable() => info.extend_padding(&needed),
            _ => false,
        }
    }

    fn compute_valid_region(
        &self,
        window: &Window,
        input_valid_region: ValidRegion,
        border_undefined: bool,
        border_size: BorderSize,
    ) -> ValidRegion {
        let Some(info) = self.info.as_deref() else {
            return input_valid_region;
        };
        let border = if border_undefined {
            border_size
        } else {
            BorderSize::empty()
        };

        let mut out = input_valid_region;
        for axis in 0..tensor_rank(info).min(2) {
            let w = self.axes[axis];
            let d = window[w];
            let a = &self.access[axis];
            // Transposed axes take the front border of the driving window
            // axis and the back border of the output axis.
            let front = padding_front(&border, w) as i32;
            let back = padding_back(&border, axis) as i32;

            let scaled_start = (d.start() as f32 * a.scale).floor() as i32;
            let scaled_last = ((d.end() - d.step()) as f32 * a.scale).floor() as i32;
            let start = scaled_start.max(input_valid_region.start(w) + front) + a.offset;
            let end = (input_valid_region.end(w) - back).min(scaled_last + a.extent) + a.offset;
            out.set(axis, start, (end - start).max(0) as usize);
        }
        intersect_higher_dimensions(info, window, &input_valid_region, &mut out);
        out
    }

    fn info_mut(&mut self) -> Option<&mut TensorInfo> {
        self.info.as_deref_mut()
    }
}

macro_rules! delegate_access_window {
    ($name:ident) => {
        impl AccessWindow for $name<'_> {
            fn update_window_if_needed(&self, window: &mut Window) -> bool {
                self.0.update_window_if_needed(window)
            }

            fn update_padding_if_needed(&mut self, window: &Window) -> bool {
                self.0.update_padding_if_needed(window)
            }

            fn compute_valid_region(
                &self,
                window: &Window,
                input_valid_region: ValidRegion,
                border_undefined: bool,
                border_size: BorderSize,
            ) -> ValidRegion {
                self.0
                    .compute_valid_region(window, input_valid_region, border_undefined, border_size)
            }

            fn info_mut(&mut self) -> Option<&mut TensorInfo> {
                self.0.info_mut()
            }
        }

        impl<'a> $name<'a> {
            pub fn get_needed_padding(&self, window: &Window) -> PaddingSize {
                self.0.get_needed_padding(window)
            }
        }
    };
}

/// `width` elements at offset `x` along X, one row.
pub struct AccessWindowHorizontal<'a>(AccessWindowRectangle<'a>);

impl<'a> AccessWindowHorizontal<'a> {
    pub fn new(info: &'a mut TensorInfo, x: i32, width: i32) -> Self {
        Self::with_scale(info, x, width, 1.0)
    }

    pub fn with_scale(info: &'a mut TensorInfo, x: i32, width: i32, scale_x: f32) -> Self {
        Self(AccessWindowRectangle::with_scale(info, x, 0, width, 1, scale_x, 1.0))
    }
}

delegate_access_window!(AccessWindowHorizontal);

/// `height` rows at offset `y`, one element wide.
pub struct AccessWindowVertical<'a>(AccessWindowRectangle<'a>);

impl<'a> AccessWindowVertical<'a> {
    pub fn new(info: &'a mut TensorInfo, y: i32, height: i32) -> Self {
        Self::with_scale(info, y, height, 1.0)
    }

    pub fn with_scale(info: &'a mut TensorInfo, y: i32, height: i32, scale_y: f32) -> Self {
        Self(AccessWindowRectangle::with_scale(info, 0, y, 1, height, 1.0, scale_y))
    }
}

delegate_access_window!(AccessWindowVertical);

/// Rectangle on the output of a transposing kernel: window Y drives tensor
/// X and window X drives tensor Y.
pub struct AccessWindowTranspose<'a>(AccessWindowRectangle<'a>);

impl<'a> AccessWindowTranspose<'a> {
    pub fn new(info: &'a mut TensorInfo, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::with_scale(info, x, y, width, height, 1.0, 1.0)
    }

    pub fn with_scale(
        info: &'a mut TensorInfo,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        scale_x: f32,
        scale_y: f32,
    ) -> Self {
        Self(AccessWindowRectangle::build(
            Some(info),
            x,
            y,
            width,
            height,
            scale_x,
            scale_y,
            [DIM_Y, DIM_X],
        ))
    }
}

delegate_access_window!(AccessWindowTranspose);

/// Fixed absolute rectangle `[start_x, end_x) x [start_y, end_y)`,
/// independent of the window position. Used by kernels that read a whole
/// input (plus border) from every position.
pub struct AccessWindowStatic<'a> {
    info: Option<&'a mut TensorInfo>,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
}

impl<'a> AccessWindowStatic<'a> {
    pub fn new(info: &'a mut TensorInfo, start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> Self {
        Self {
            info: Some(info),
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn get_needed_padding(&self) -> PaddingSize {
        let Some(info) = self.info.as_deref() else {
            return PaddingSize::empty();
        };
        let shape = info.tensor_shape();
        PaddingSize::new(
            (-self.start_y).max(0) as u32,
            (self.end_x - shape[DIM_X] as i32).max(0) as u32,
            (self.end_y - shape[DIM_Y] as i32).max(0) as u32,
            (-self.start_x).max(0) as u32,
        )
    }
}

impl AccessWindow for AccessWindowStatic<'_> {
    /// The rectangle cannot move with the window, so a fixed tensor with
    /// too little padding empties the whole window.
    fn update_window_if_needed(&self, window: &mut Window) -> bool {
        let Some(info) = self.info.as_deref() else {
            return false;
        };
        if info.is_resizable() {
            return false;
        }
        let needed = self.get_needed_padding();
        if needed.max(&info.padding()) == info.padding() {
            return false;
        }
        let before = *window;
        for d in 0..MAX_DIMS {
            window.set(d, Dimension::new(0, 0, 1));
        }
        let changed = *window != before;
        if changed {
            debug!(?before, padding = ?info.padding(), ?needed, "static access does not fit, window emptied");
        }
        changed
    }

    fn update_padding_if_needed(&mut self, _window: &Window) -> bool {
        let needed = self.get_needed_padding();
        match self.info.as_deref_mut() {
            Some(info) if info.is_resizable() => info.extend_padding(&needed),
            _ => false,
        }
    }

    /// The rectangle clamped to the tensor; borders do not apply.
    fn compute_valid_region(
        &self,
        window: &Window,
        input_valid_region: ValidRegion,
        _border_undefined: bool,
        _border_size: BorderSize,
    ) -> ValidRegion {
        let Some(info) = self.info.as_deref() else {
            return input_valid_region;
        };
        let shape = info.tensor_shape();
        let mut out = input_valid_region;

        let start_x = self.start_x.max(0);
        let end_x = self.end_x.min(shape[DIM_X] as i32);
        out.set(DIM_X, start_x, (end_x - start_x).max(0) as usize);
        if info.num_dimensions() > 1 {
            let start_y = self.start_y.max(0);
            let end_y = self.end_y.min(shape[DIM_Y] as i32);
            out.set(DIM_Y, start_y, (end_y - start_y).max(0) as usize);
        }
        intersect_higher_dimensions(info, window, &input_valid_region, &mut out);
        out
    }

    fn info_mut(&mut self) -> Option<&mut TensorInfo> {
        self.info.as_deref_mut()
    }
}

/// Negotiate `window` against every pattern: shrink it until every access
/// on a fixed tensor fits that tensor's padding, then grow the padding of
/// every resizable tensor to cover the final window.
///
/// Returns whether the window changed. Kernels that cannot run a shrunk
/// window report this as [`crate::Error::InsufficientPadding`].
pub fn update_window_and_padding(window: &mut Window, patterns: &mut [&mut dyn AccessWindow]) -> bool {
    let original = *window;

    let mut passes = 0usize;
    loop {
        passes += 1;
        let before = *window;
        for pattern in patterns.iter() {
            pattern.update_window_if_needed(window);
        }
        if *window == before {
            break;
        }
    }

    let mut padding_changed = false;
    for pattern in patterns.iter_mut() {
        padding_changed |= pattern.update_padding_if_needed(window);
    }

    window.validate();
    let window_changed = *window != original;
    debug!(window_changed, padding_changed, passes, "window negotiated");
    window_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::{Coordinates, Steps, TensorShape};
    use crate::helpers::calculate_max_window_for_info;
    use crate::types::DataType;

    fn u8_info(shape: [usize; 2]) -> TensorInfo {
        TensorInfo::new(TensorShape::from(shape), DataType::U8)
    }

    fn fixed(mut info: TensorInfo, padding: BorderSize) -> TensorInfo {
        info.extend_padding(&padding);
        info.set_is_resizable(false);
        info
    }

    #[test]
    fn test_adjust_down_up() {
        assert_eq!(adjust_down(17, 12, 8), 9);
        assert_eq!(adjust_down(12, 12, 8), 12);
        assert_eq!(adjust_down(5, 12, 8), 5);
        assert_eq!(adjust_up(-3, 0, 2), 1);
        assert_eq!(adjust_up(-4, 0, 2), 0);
        assert_eq!(adjust_up(3, 0, 2), 3);
    }

    #[test]
    #[should_panic(expected = "step must be positive")]
    fn test_adjust_rejects_zero_step() {
        adjust_up(0, 1, 0);
    }

    #[test]
    #[should_panic(expected = "width must not be negative")]
    fn test_negative_width_rejected() {
        let mut info = u8_info([4, 4]);
        AccessWindowRectangle::new(&mut info, 0, 0, -1, 1);
    }

    #[test]
    fn test_needed_padding_rectangle() {
        let mut info = u8_info([10, 10]);
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 16, 8));
        window.set(1, Dimension::new(0, 10, 1));
        let access = AccessWindowRectangle::new(&mut info, -1, -1, 10, 3);
        assert_eq!(access.get_needed_padding(&window), BorderSize::new(1, 7, 1, 1));
    }

    #[test]
    fn test_padding_grows_on_resizable() {
        let mut info = u8_info([10, 10]);
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 16, 8));
        window.set(1, Dimension::new(0, 10, 1));
        {
            let mut access = AccessWindowRectangle::new(&mut info, -1, -1, 10, 3);
            assert!(!access.update_window_if_needed(&mut window));
            assert!(access.update_padding_if_needed(&window));
            assert!(!access.update_padding_if_needed(&window));
        }
        assert_eq!(info.padding(), BorderSize::new(1, 7, 1, 1));
    }

    #[test]
    fn test_window_shrinks_on_fixed_tensor() {
        let mut info = fixed(u8_info([10, 10]), BorderSize::empty());
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 16, 8));
        window.set(1, Dimension::new(0, 10, 1));
        let mut access = AccessWindowRectangle::new(&mut info, -1, -1, 10, 3);
        assert!(access.update_window_if_needed(&mut window));
        // x: start needs +1 element -> +8, end leaves one vector
        assert_eq!(window.x(), Dimension::new(8, 8, 8));
        assert_eq!(window.y(), Dimension::new(1, 9, 1));
        assert!(!access.update_padding_if_needed(&window));
    }

    #[test]
    fn test_window_unchanged_when_padding_suffices() {
        let mut info = fixed(u8_info([10, 10]), BorderSize::new(1, 7, 1, 1));
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 16, 8));
        window.set(1, Dimension::new(0, 10, 1));
        let before = window;
        let access = AccessWindowRectangle::new(&mut info, -1, -1, 10, 3);
        assert!(!access.update_window_if_needed(&mut window));
        assert_eq!(window, before);
    }

    #[test]
    fn test_scaled_shrink_stays_on_step() {
        // Half-scale output: 8 outputs per 16 inputs.
        let mut info = fixed(u8_info([12, 1]), BorderSize::empty());
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 32, 16));
        let access = AccessWindowHorizontal::with_scale(&mut info, 0, 8, 0.5);
        assert!(access.update_window_if_needed(&mut window));
        assert_eq!(window.x(), Dimension::new(0, 16, 16));
    }

    #[test]
    fn test_downscaled_shrink_reaches_padding() {
        // ceil(p * 0.5) + 1 <= 2 only holds up to p = 2.
        let mut info = fixed(u8_info([2, 1]), BorderSize::empty());
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 5, 1));
        let access = AccessWindowHorizontal::with_scale(&mut info, 0, 1, 0.5);
        assert!(access.update_window_if_needed(&mut window));
        assert_eq!(window.x(), Dimension::new(0, 3, 1));
        assert!(!access.update_window_if_needed(&mut window));
    }

    #[test]
    fn test_valid_region_rectangle_with_border() {
        let mut out = u8_info([10, 10]);
        let mut window = Window::new();
        window.set(0, Dimension::new(1, 9, 1));
        window.set(1, Dimension::new(1, 9, 1));
        let input = ValidRegion::from_shape(TensorShape::from([10, 10]));
        let mut access = AccessWindowRectangle::new(&mut out, 0, 0, 1, 1);
        access.set_valid_region(&window, input, true, BorderSize::uniform(1));
        assert_eq!(
            out.valid_region(),
            ValidRegion::new(Coordinates::from([1, 1]), TensorShape::from([8, 8]))
        );
    }

    #[test]
    fn test_valid_region_without_border_is_input_region() {
        let mut out = u8_info([10, 7]);
        let input = ValidRegion::new(Coordinates::from([2, 1]), TensorShape::from([6, 5]));
        let mut window = Window::new();
        window.set(0, Dimension::new(2, 10, 4));
        window.set(1, Dimension::new(1, 6, 1));
        let access = AccessWindowHorizontal::new(&mut out, 0, 4);
        assert_eq!(access.compute_valid_region_without_border(&window, input), input);
    }

    #[test]
    fn test_unbound_pattern_is_inert() {
        let mut window = Window::new();
        window.set(0, Dimension::new(-4, 16, 4));
        let before = window;
        let mut access = AccessWindowRectangle::unbound(-2, -2, 5, 5);
        assert!(!access.update_window_if_needed(&mut window));
        assert!(!access.update_padding_if_needed(&window));
        assert_eq!(window, before);
        let region = ValidRegion::from_shape(TensorShape::from([3, 3]));
        assert_eq!(access.compute_valid_region(&window, region, true, BorderSize::uniform(1)), region);
        assert!(access.info_mut().is_none());
    }

    #[test]
    fn test_static_padding_and_region() {
        let mut info = u8_info([6, 4]);
        let window = Window::new();
        {
            let mut access = AccessWindowStatic::new(&mut info, -2, -1, 8, 5);
            assert!(access.update_padding_if_needed(&window));
            let region = access.compute_valid_region(
                &window,
                ValidRegion::from_shape(TensorShape::from([6, 4])),
                true,
                BorderSize::uniform(3),
            );
            assert_eq!(region, ValidRegion::from_shape(TensorShape::from([6, 4])));
        }
        assert_eq!(info.padding(), BorderSize::new(1, 2, 1, 2));
    }

    #[test]
    fn test_static_empties_window_on_fixed_tensor() {
        let mut info = fixed(u8_info([6, 4]), BorderSize::uniform(1));
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 6, 1));
        let access = AccessWindowStatic::new(&mut info, -2, 0, 6, 4);
        assert!(access.update_window_if_needed(&mut window));
        assert!(window.is_empty());
        assert_eq!(window.x(), Dimension::new(0, 0, 1));
    }

    #[test]
    fn test_transpose_maps_axes() {
        let mut out = u8_info([6, 10]);
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 12, 4));
        window.set(1, Dimension::new(0, 8, 4));
        {
            let mut access = AccessWindowTranspose::new(&mut out, 0, 0, 4, 4);
            // tensor X follows window Y [0, 8) -> 8 > 6; tensor Y follows window X [0, 12) -> 12 > 10
            assert_eq!(access.get_needed_padding(&window), BorderSize::new(0, 2, 2, 0));
            access.set_valid_region(
                &window,
                ValidRegion::from_shape(TensorShape::from([10, 6])),
                false,
                BorderSize::empty(),
            );
        }
        assert_eq!(out.valid_region(), ValidRegion::from_shape(TensorShape::from([6, 10])));
    }

    #[test]
    fn test_transpose_valid_region_asymmetric_border() {
        let mut out = u8_info([6, 10]);
        let mut window = Window::new();
        window.set(0, Dimension::new(0, 10, 1));
        window.set(1, Dimension::new(0, 6, 1));
        let input = ValidRegion::from_shape(TensorShape::from([10, 6]));
        let border = BorderSize::new(1, 2, 3, 4);
        let access = AccessWindowTranspose::new(&mut out, 0, 0, 1, 1);
        let region = access.compute_valid_region(&window, input, true, border);
        // X: [0 + top, 6 - right), Y: [0 + left, 10 - bottom)
        assert_eq!(region, ValidRegion::new(Coordinates::from([1, 4]), TensorShape::from([3, 3])));
    }

    #[test]
    fn test_negotiation_is_order_independent() {
        let shape = [13, 9];
        let run = |reverse: bool| {
            let mut src = fixed(u8_info(shape), BorderSize::new(1, 3, 0, 1));
            let mut dst = u8_info(shape);
            let mut window = calculate_max_window_for_info(&src, &Steps::new(&[4]), false, BorderSize::empty());
            let mut input = AccessWindowRectangle::new(&mut src, -1, -1, 6, 3);
            let mut output = AccessWindowHorizontal::new(&mut dst, 0, 4);
            let changed = if reverse {
                update_window_and_padding(&mut window, &mut [&mut output, &mut input])
            } else {
                update_window_and_padding(&mut window, &mut [&mut input, &mut output])
            };
            drop(output);
            (changed, window, dst.padding())
        };
        let forward = run(false);
        assert!(forward.0);
        assert_eq!(forward, run(true));
    }

    #[test]
    fn test_update_window_and_padding_reports_change() {
        let mut src = u8_info([10, 10]);
        let mut dst = u8_info([10, 10]);
        let mut window = calculate_max_window_for_info(&src, &Steps::new(&[8]), false, BorderSize::uniform(1));
        let mut input = AccessWindowRectangle::new(&mut src, -1, -1, 10, 3);
        let mut output = AccessWindowHorizontal::new(&mut dst, 0, 8);
        assert!(!update_window_and_padding(&mut window, &mut [&mut input, &mut output]));
        drop(input);
        drop(output);
        assert_eq!(src.padding(), BorderSize::new(1, 7, 1, 1));
        assert_eq!(dst.padding(), BorderSize::new(0, 6, 0, 0));
    }
}
