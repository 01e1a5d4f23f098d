//! GPU loop lowering.
//!
//! Maps loop axes bound by the schedule onto block/thread indices and turns
//! the loop nest into a kernel body:
//!
//! 1. [`gather_axis_info`] - launch dimensions of a group of stages
//! 2. [`transform_gpu_forloops`] - rewrite bound loop headers to device
//!    indices and shrink local/shared buffers accordingly
//! 3. [`remove_gpu_forloops_axis`] - drop bound loop headers, recording
//!    their extents as the function's launch dimensions
//! 4. [`insert_sync_threads`] - place barriers between shared-memory
//!    writers and readers, never inside a conditional
//!
//! ```text
//! for [threadIdx.x] (i, 0, 32) { B[i] = A[i] }
//!   ==>  function fn_B(_A, _B) <grid:[1, 1, 1], block:[32, 1, 1]> { B[threadIdx.x] = A[threadIdx.x] }
//! ```

mod axis_info;
mod remove_axis;
mod sync;
mod transform;

pub use axis_info::gather_axis_info;
pub use remove_axis::remove_gpu_forloops_axis;
pub use sync::insert_sync_threads;
pub use transform::transform_gpu_forloops;
