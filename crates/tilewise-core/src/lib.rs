//! # tilewise-core
//!
//! Iteration spaces, access patterns and padding negotiation for kernels
//! over multi-dimensional strided tensors.
//!
//! ## Architecture
//!
//! ```text
//! configure():  TensorInfo ──► calculate_max_window ──► Window
//!                                   │
//!               AccessWindow* ◄─────┘  update_window_and_padding
//!                   │                  (shrink window / grow padding)
//!                   └──► set_valid_region on outputs
//!
//! run():        Window ──► split_window ──► TensorIterator* ──► execute_window_loop
//! ```
//!
//! Configuration only touches [`TensorInfo`]s; [`Tensor`] storage is
//! allocated afterwards with the negotiated padding, so every access a
//! kernel makes inside its window is in bounds.
//!
//! ## Modules
//!
//! - [`dimensions`]: fixed-rank coordinates, shapes, strides, steps
//! - [`window`]: [`Window`] and its slicing/splitting operations
//! - [`types`]: borders, padding, valid regions, data types
//! - [`tensor_info`], [`tensor`]: metadata and host storage
//! - [`access_window`]: the access-pattern family and negotiation
//! - [`helpers`]: maximal windows and valid-region arithmetic
//! - [`iterator`]: strided iteration over a window

pub mod access_window;
pub mod dimensions;
pub mod error;
pub mod helpers;
pub mod iterator;
pub mod tensor;
pub mod tensor_info;
pub mod types;
pub mod window;

pub use access_window::{
    adjust_down, adjust_up, update_window_and_padding, AccessWindow, AccessWindowHorizontal, AccessWindowRectangle,
    AccessWindowStatic, AccessWindowTranspose, AccessWindowVertical,
};
pub use dimensions::{Coordinates, Dimensions, Steps, Strides, TensorShape, DIM_X, DIM_Y, DIM_Z, MAX_DIMS};
pub use error::{Error, ErrorCode, Result, Status};
pub use helpers::{
    calculate_max_enlarged_window, calculate_max_window, calculate_max_window_for_info, calculate_max_window_for_shape,
    calculate_max_window_horizontal, calculate_valid_region_scale, intersect_valid_regions,
};
pub use iterator::{execute_window_loop, TensorIterator};
pub use tensor::Tensor;
pub use tensor_info::TensorInfo;
pub use types::{
    BorderMode, BorderSize, DataType, InterpolationPolicy, PaddingSize, PixelValue, SamplingPolicy, ValidRegion,
};
pub use window::{Dimension, Window};
