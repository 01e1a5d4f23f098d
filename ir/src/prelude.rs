//! Common imports for working with IR trees.
//!
//! ```rust,ignore
//! use tessel_ir::prelude::*;
//! ```

pub use crate::node::{Block, Expr, For, IfThenElse, Load, LoweredFunc, PolyFor, Store, TensorRef, Var};
pub use crate::tensor::{Buffer, Tensor, TensorMap};
pub use crate::types::{AxisKind, ConstValue, DeviceAxis, ForType, GpuDim, LaunchDims, MemoryType};
pub use crate::visit::{MutVisitor, Visitor};
