//! Lowering passes from scheduled tensor IR to device loop nests.
//!
//! # Module Organization
//!
//! - [`stage`] - Per-tensor scheduling metadata ([`Stage`], [`StageMap`])
//! - [`inline_expand`] - Substitution of compute-inline tensors into their uses
//! - [`dependency`] - Producer/consumer graph between stored tensors
//! - [`gpu`] - Mapping of bound loops onto block/thread indices, launch
//!   dimensions and barrier insertion
//! - [`pipeline`] - [`lower_function`], the passes in their fixed order
//! - [`config`] - [`LowerOptions`] with builder and environment fallbacks

pub mod config;
pub mod dependency;
pub mod error;
pub mod gpu;
pub mod inline_expand;
pub mod pipeline;
pub mod stage;


pub use config::LowerOptions;
pub use dependency::DependencyGraph;
pub use error::{Error, Result};
pub use gpu::{gather_axis_info, insert_sync_threads, remove_gpu_forloops_axis, transform_gpu_forloops};
pub use inline_expand::{compute_inline_expand, compute_inline_expand_with_limit};
pub use pipeline::{LowerContext, lower_function};
pub use stage::{AxisBinding, ComputeAt, ForloopInfo, ForloopInfos, Stage, StageMap};
