//! Kernel contract, schedulers and reference kernels
//!
//! This crate provides:
//! - **Kernel trait**: what a configured kernel exposes to schedulers
//! - **Schedulers**: rayon-backed [`CpuScheduler`] and [`SingleThreadScheduler`]
//! - **GPU dispatch**: 2D slice enqueueing over a [`gpu::CommandQueue`]
//! - **Reference kernels**: small consumers of the negotiation protocol
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Kernel::configure(&mut TensorInfo, ..)         │
//! │   window + padding negotiated by tilewise-core        │
//! └─────────────────────────┬────────────────────────────┘
//!                           │ Kernel::window()
//!                           ▼
//! ┌──────────────────────────────────────────────────────┐
//! │        Scheduler::schedule(kernel, pack, hints)        │
//! │   split_window(dim, id, n) -> Kernel::run per part     │
//! └─────────────────────────┬────────────────────────────┘
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!      ┌──────────────┐          ┌──────────────┐
//!      │ CpuScheduler │          │ SingleThread │
//!      │  rayon pool  │          │  Scheduler   │
//!      └──────────────┘          └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use tilewise_backends::kernels::Box3x3Kernel;
//! use tilewise_backends::{Scheduler, SingleThreadScheduler, TensorPack, TensorSlot};
//! use tilewise_core::{DataType, Tensor, TensorInfo, TensorShape};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut src_info = TensorInfo::new(TensorShape::from([16, 4]), DataType::U8);
//! let mut dst_info = TensorInfo::new(TensorShape::from([16, 4]), DataType::U8);
//! let kernel = Box3x3Kernel::configure(&mut src_info, &mut dst_info, true)?;
//!
//! let (mut src, mut dst) = (Tensor::new(src_info), Tensor::new(dst_info));
//! src.allocate()?;
//! dst.allocate()?;
//! src.import(&[9u8; 64])?;
//!
//! let pack = TensorPack::new().with(TensorSlot::Src0, &src).with(TensorSlot::Dst, &dst);
//! SingleThreadScheduler.schedule_default(&kernel, &pack)?;
//! assert_eq!(dst.export::<u8>()?[17], 9);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gpu;
pub mod kernel;
pub mod kernels;
pub mod scheduler;

pub use error::{BackendError, Result};
pub use gpu::{enqueue_2d_slices, gws_from_window, CommandQueue, GpuKernel, NdRange};
pub use kernel::{Kernel, TensorPack, TensorSlot, ThreadInfo};
pub use scheduler::{CpuScheduler, Hints, Scheduler, SchedulerConfig, SingleThreadScheduler};
