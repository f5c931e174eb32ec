//! Write the border ring around a tensor's valid region, plane by plane.
//!
//! Kernels configured with a defined border read this ring, so it runs
//! before them on the same tensor.

use tilewise_core::{
    execute_window_loop, BorderMode, BorderSize, Dimension, Error, PixelValue, Result, Status, TensorInfo,
    TensorIterator, Window, DIM_X, DIM_Y,
};
use tracing::debug;

use super::{copy_element, write_bytes};
use crate::kernel::{Kernel, TensorPack, TensorSlot, ThreadInfo};

#[derive(Debug)]
pub struct FillBorderKernel {
    window: Window,
    border: BorderSize,
    mode: BorderMode,
    constant: Vec<u8>,
}

impl FillBorderKernel {
    /// A fixed tensor must already have `border` as padding; a resizable
    /// one grows it.
    pub fn validate(tensor: &TensorInfo, border: BorderSize, mode: BorderMode) -> Status {
        if mode == BorderMode::Undefined || tensor.is_resizable() {
            return Ok(());
        }
        tilewise_core::ensure!(
            tensor.padding().max(&border) == tensor.padding(),
            Error::InsufficientPadding
        );
        Ok(())
    }

    #[tracing::instrument(skip(tensor, constant))]
    pub fn configure(
        tensor: &mut TensorInfo,
        border: BorderSize,
        mode: BorderMode,
        constant: PixelValue,
    ) -> Result<Self> {
        Self::validate(tensor, border, mode)?;
        if mode != BorderMode::Undefined && tensor.is_resizable() && tensor.extend_padding(&border) {
            debug!(?border, "padding grown for border fill");
        }

        // One position per XY plane.
        let mut window = Window::new();
        for d in 2..tensor.num_dimensions() {
            window.set(d, Dimension::new(0, tensor.dimension(d) as i32, 1));
        }
        Ok(Self {
            window,
            border,
            mode,
            constant: constant.to_bytes(tensor.data_type()),
        })
    }
}

impl Kernel for FillBorderKernel {
    fn name(&self) -> &'static str {
        "FillBorder"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, tensors: &TensorPack<'_>, window: &Window, _info: &ThreadInfo) -> crate::Result<()> {
        if self.mode == BorderMode::Undefined || self.border.is_empty() {
            return Ok(());
        }
        let tensor = tensors.require(TensorSlot::Dst)?;
        let info = tensor.info();
        let region = info.valid_region();
        let (x0, x1) = (region.start(DIM_X), region.end(DIM_X));
        let (y0, y1) = (region.start(DIM_Y), region.end(DIM_Y));
        if x1 <= x0 || y1 <= y0 {
            return Ok(());
        }
        let es = info.element_size();
        let strides = info.strides_in_bytes();
        let (sx, sy) = (strides[DIM_X] as isize, strides[DIM_Y] as isize);
        let b = self.border;
        let (left, right, top, bottom) = (b.left as i32, b.right as i32, b.top as i32, b.bottom as i32);

        // The iterator starts at element (0, 0) of each plane.
        let mut plane = *window;
        plane.set(DIM_X, Dimension::new(0, 1, 1));
        plane.set(DIM_Y, Dimension::new(0, 1, 1));
        let mut iterators = [TensorIterator::new(info, &plane)];
        execute_window_loop(&plane, &mut iterators, |_, it| {
            let base = it[0].offset();
            let at = |x: i32, y: i32| base + x as isize * sx + y as isize * sy;
            // SAFETY: each plane belongs to exactly one partition.
            let fill = |to: isize, from: isize| unsafe {
                match self.mode {
                    BorderMode::Constant => write_bytes(tensor, to, &self.constant),
                    _ => copy_element(tensor, from, tensor, to, es),
                }
            };

            for y in y0..y1 {
                for x in x0 - left..x0 {
                    fill(at(x, y), at(x0, y));
                }
                for x in x1..x1 + right {
                    fill(at(x, y), at(x1 - 1, y));
                }
            }
            // Whole rows, so the corners replicate the filled columns.
            for x in x0 - left..x1 + right {
                for y in y0 - top..y0 {
                    fill(at(x, y), at(x, y0));
                }
                for y in y1..y1 + bottom {
                    fill(at(x, y), at(x, y1 - 1));
                }
            }
        });
        Ok(())
    }
}
