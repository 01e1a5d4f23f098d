//! Tree intermediate representation for scheduled tensor programs.
//!
//! # Module Organization
//!
//! - [`node`] - The [`Expr`] tagged tree and its node structs
//! - [`types`] - Literals, operator kinds, memory spaces, device axes
//! - [`tensor`] - Tensors, buffers and the [`TensorMap`] registry
//! - [`visit`] - [`Visitor`] / [`MutVisitor`] traversal framework
//! - [`collect`] - Read-only tree queries
//! - [`subst`] - Variable substitution
//! - [`display`] / [`tree`] - Textual and ASCII-tree rendering
//! - [`error`] - Error types and result handling

pub mod collect;
pub mod constructors;
pub mod display;
pub mod error;
pub mod node;
pub mod prelude;
pub mod subst;
pub mod tensor;
pub mod tree;
pub mod types;
pub mod visit;

#[cfg(any(test, feature = "proptest"))]
pub mod test;

pub use error::{Error, Result};
pub use node::*;
pub use tensor::{Buffer, Tensor, TensorMap};
pub use types::{
    AxisKind, BinaryOp, CallType, ConstValue, DType, DeviceAxis, ForType, GpuDim, LaunchDims, MemoryType, ReduceOp,
    UnaryOp,
};
pub use visit::{MutVisitor, Visitor};
