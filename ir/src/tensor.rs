//! Tensors, buffers and the name-keyed registry that owns them.
//!
//! Tree nodes refer to tensors and buffers by name only. The registry is the
//! single owner, so a tensor's defining expression never aliases the copies
//! that inline expansion splices into the tree.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::node::{Expr, Var};
use crate::types::{DType, MemoryType};
use crate::{collect, subst};

/// Suffix of buffers introduced by a write cache.
pub const WRITE_CACHE_SUFFIX: &str = "_write_cache";
/// Suffix of buffers introduced by a read cache.
pub const READ_CACHE_SUFFIX: &str = "_read_cache";
/// Suffix of scratch buffers.
pub const TEMP_BUFFER_SUFFIX: &str = "_temp_buffer";

/// Whether a buffer name carries one of the cache suffixes.
pub fn is_cache_buffer_name(name: &str) -> bool {
    [WRITE_CACHE_SUFFIX, READ_CACHE_SUFFIX, TEMP_BUFFER_SUFFIX].iter().any(|suffix| name.ends_with(suffix))
}

/// Storage backing one or more tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<Expr>,
    pub strides: Vec<Expr>,
    pub elem_offset: Expr,
    pub memory_type: MemoryType,
}

impl Buffer {
    pub fn new(name: impl Into<String>, shape: Vec<Expr>, memory_type: MemoryType) -> Self {
        Self {
            name: name.into(),
            dtype: DType::Float32,
            shape,
            strides: Vec::new(),
            elem_offset: Expr::int(0),
            memory_type,
        }
    }

    /// Default buffer name for a tensor: the tensor name with a `_` prefix.
    pub fn name_for_tensor(tensor: &str) -> String {
        format!("_{tensor}")
    }

    pub fn is_cache(&self) -> bool {
        is_cache_buffer_name(&self.name)
    }
}

/// A named tensor with an optional defining expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<Expr>,
    /// Iteration variables of the defining expression, one per dimension.
    pub axes: Vec<Var>,
    pub body: Option<Expr>,
    pub buffer: Option<String>,
}

impl Tensor {
    /// Placeholder tensor (an input) with no defining expression.
    pub fn placeholder(name: impl Into<String>, shape: Vec<Expr>) -> Self {
        let name = name.into();
        let axes = (0..shape.len()).map(|i| Var::new(format!("{name}_i{i}"))).collect();
        Self { name, dtype: DType::Float32, shape, axes, body: None, buffer: None }
    }

    /// Computed tensor `name[axes...] = body`.
    pub fn compute(name: impl Into<String>, shape: Vec<Expr>, axes: Vec<Var>, body: Expr) -> Self {
        Self { name: name.into(), dtype: DType::Float32, shape, axes, body: Some(body), buffer: None }
    }

    pub fn with_buffer(mut self, buffer: impl Into<String>) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.name.as_str())
    }

    /// Names of tensors loaded by the defining expression, in first-use order.
    pub fn depend_tensor_names(&self) -> SmallVec<[String; 4]> {
        match &self.body {
            Some(body) => collect::load_tensor_names(body, |_| true).into_iter().collect(),
            None => SmallVec::new(),
        }
    }

    /// Copy of the defining expression with the tensor's axes bound to `indices`.
    ///
    /// All axes are substituted simultaneously, so an index expression that
    /// mentions an axis name of this tensor is not substituted again. Reduction
    /// axes and `Let` symbols of the definition that clash with a variable of
    /// `indices` are renamed first, so the indices are never captured.
    pub fn inline_expanded(&self, indices: &[Expr]) -> Result<Expr> {
        let body = self.body.as_ref().context(NotComputedSnafu { tensor: self.name.clone() })?;
        ensure!(
            indices.len() == self.axes.len(),
            IndexArityMismatchSnafu { tensor: self.name.clone(), expected: self.axes.len(), actual: indices.len() }
        );

        let mut expanded = body.clone();
        let free: HashSet<String> = indices.iter().flat_map(collect::var_names).collect();
        for bound in collect::bound_var_names(&expanded) {
            if free.contains(&bound) {
                let fresh = fresh_name(&bound, &free, &expanded);
                subst::rename_var(&mut expanded, &bound, &fresh);
            }
        }

        let bindings: HashMap<&str, &Expr> = self.axis_names().zip(indices).collect();
        subst::substitute_vars(&mut expanded, &bindings);
        Ok(expanded)
    }
}

/// `{name}_{n}` for the first `n` used neither in `taken` nor in `expr`.
fn fresh_name(name: &str, taken: &HashSet<String>, expr: &Expr) -> String {
    let used = collect::var_names(expr);
    (0..)
        .map(|n| format!("{name}_{n}"))
        .find(|candidate| !taken.contains(candidate) && !used.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Registry of every tensor and buffer of a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct TensorMap {
    tensors: HashMap<String, Tensor>,
    buffers: HashMap<String, Buffer>,
}

impl TensorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tensor, replacing any previous entry with the same name.
    pub fn insert(&mut self, tensor: Tensor) {
        self.tensors.insert(tensor.name.clone(), tensor);
    }

    pub fn insert_buffer(&mut self, buffer: Buffer) {
        self.buffers.insert(buffer.name.clone(), buffer);
    }

    /// Register `tensor` together with its backing buffer.
    pub fn insert_with_buffer(&mut self, tensor: Tensor, buffer: Buffer) {
        self.insert(tensor.with_buffer(buffer.name.clone()));
        self.insert_buffer(buffer);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn tensor(&self, name: &str) -> Result<&Tensor> {
        self.tensors.get(name).context(UnknownTensorSnafu { name })
    }

    pub fn buffer(&self, name: &str) -> Result<&Buffer> {
        self.buffers.get(name).context(UnknownBufferSnafu { name })
    }

    pub fn buffer_mut(&mut self, name: &str) -> Result<&mut Buffer> {
        self.buffers.get_mut(name).context(UnknownBufferSnafu { name })
    }

    /// Buffer backing tensor `name`, if it has one.
    pub fn buffer_of(&self, name: &str) -> Result<Option<&Buffer>> {
        match &self.tensor(name)?.buffer {
            Some(buffer) => self.buffer(buffer).map(Some),
            None => Ok(None),
        }
    }

    /// Memory space of the buffer backing tensor `name`.
    pub fn memory_type_of(&self, name: &str) -> Result<Option<MemoryType>> {
        Ok(self.buffer_of(name)?.map(|buffer| buffer.memory_type))
    }

    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.values()
    }

    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.values()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}
