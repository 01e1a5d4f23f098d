//! Inline expansion of compute-inline tensors.
//!
//! Every `Load` of a tensor whose stage is marked inlined is replaced by a
//! copy of the tensor's defining expression, with the tensor's axes bound to
//! the load indices. The copy is then visited as *inlined code*, where loads
//! of cache buffers are rebased onto the loop nest they are computed at:
//!
//! ```text
//! // C = compute_inline(A_read_cache[i, j] * 2), A_read_cache at level 0 of (i, j)
//! D[i, j] = C[i, j]   ==>   D[i, j] = (A_read_cache[0, j] * 2)
//! ```
//!
//! Expansion is greedy: each round expands the inlined tensors currently
//! loaded, and rounds repeat until none is left or the round cap is hit.

use std::collections::HashMap;
use std::mem;

use snafu::OptionExt;
use tessel_ir::collect::load_tensor_names;
use tessel_ir::subst::substitute_vars;
use tessel_ir::tensor::{WRITE_CACHE_SUFFIX, is_cache_buffer_name};
use tessel_ir::types::{BLOCK_IDX_PREFIX, THREAD_IDX_PREFIX};
use tessel_ir::{Expr, Load, MemoryType, MutVisitor, TensorMap, TensorRef};
use tracing::{debug, error, trace};

use crate::config::DEFAULT_MAX_INLINE_ROUNDS;
use crate::error::*;
use crate::stage::StageMap;

/// Expand every inlined tensor loaded by `expr`, in place.
pub fn compute_inline_expand(expr: &mut Expr, stages: &StageMap, tensors: &TensorMap) -> Result<()> {
    compute_inline_expand_with_limit(expr, stages, tensors, DEFAULT_MAX_INLINE_ROUNDS)
}

/// [`compute_inline_expand`] with an explicit round cap.
#[tracing::instrument(skip_all, fields(max_rounds))]
pub fn compute_inline_expand_with_limit(
    expr: &mut Expr,
    stages: &StageMap,
    tensors: &TensorMap,
    max_rounds: usize,
) -> Result<()> {
    for round in 0..max_rounds {
        let pending = load_tensor_names(expr, |name| stages.is_inlined(name));
        if pending.is_empty() {
            debug!(rounds = round, "inline expansion reached fixpoint");
            return Ok(());
        }
        debug!(round, tensors = ?pending, "expanding inlined tensors");

        for name in &pending {
            let mut mutator = TensorInlineExpandMutator::new(name, stages, tensors);
            mutator.visit_expr(expr);
            mutator.finish()?;
        }
    }

    let remaining = load_tensor_names(expr, |name| stages.is_inlined(name));
    if remaining.is_empty() {
        return Ok(());
    }
    error!(rounds = max_rounds, remaining = ?remaining, "inline expansion did not terminate");
    InlineRoundLimitSnafu { rounds: max_rounds, remaining }.fail()
}

/// Expands the loads of a single tensor.
struct TensorInlineExpandMutator<'a> {
    tensor_name: &'a str,
    stages: &'a StageMap,
    tensors: &'a TensorMap,
    /// Inside a copy of the tensor's defining expression.
    inline_code: bool,
    /// Inside the indices of a cache-buffer access.
    temp_buffer: bool,
    /// Inside the indices of a `GpuLocal` cache-buffer access.
    memory_local: bool,
    failure: Option<Error>,
}

impl<'a> TensorInlineExpandMutator<'a> {
    fn new(tensor_name: &'a str, stages: &'a StageMap, tensors: &'a TensorMap) -> Self {
        Self {
            tensor_name,
            stages,
            tensors,
            inline_code: false,
            temp_buffer: false,
            memory_local: false,
            failure: None,
        }
    }

    fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record the first failure; traversal stops descending afterwards.
    fn fail(&mut self, err: Error) {
        error!(tensor = %self.tensor_name, error = %err, "inline expansion failed");
        self.failure.get_or_insert(err);
    }

    fn expansion(&self, load: &Load) -> Result<Expr> {
        let name = load.tensor.name();
        let tensor = self.tensors.get(name).context(MissingTensorSnafu { name })?;
        trace!(tensor = %name, indices = load.indices.len(), "expanding load");
        Ok(tensor.inline_expanded(&load.indices)?)
    }

    /// Zero the axes fixed by the compute-at attachment of `tensor` in `indices`.
    fn rebase_indices(&self, tensor: &str, indices: &mut [Expr]) -> Result<()> {
        let stage = self.stages.stage(tensor)?;
        let attached = stage.attached_axes()?;
        if attached.is_empty() {
            return Ok(());
        }
        trace!(tensor = %tensor, axes = ?attached, "rebasing cache indices");

        let zero = Expr::int(0);
        let bindings: HashMap<&str, &Expr> = attached.iter().map(|axis| (axis.as_str(), &zero)).collect();
        for index in indices {
            substitute_vars(index, &bindings);
        }
        Ok(())
    }

    fn visit_cache_load(&mut self, load: &mut Load, buffer_name: &str, memory_type: MemoryType) -> Result<()> {
        let tensor = load.tensor.name().to_string();

        if buffer_name.ends_with(WRITE_CACHE_SUFFIX) && memory_type == MemoryType::Heap {
            let uncached = buffer_name.strip_prefix('_').unwrap_or(buffer_name);
            let uncached = uncached.strip_suffix(WRITE_CACHE_SUFFIX).unwrap_or(uncached);
            if self.tensors.contains(uncached) {
                self.visit_tensor_ref(&mut load.tensor);
            } else {
                self.rebase_indices(&tensor, &mut load.indices)?;
            }
            return Ok(());
        }

        self.rebase_indices(&tensor, &mut load.indices)?;

        let keep_temp_buffer = mem::replace(&mut self.temp_buffer, true);
        let keep_memory_local = self.memory_local;
        if memory_type == MemoryType::GpuLocal {
            self.memory_local = true;
        }
        self.super_load(load);
        self.temp_buffer = keep_temp_buffer;
        self.memory_local = keep_memory_local;
        Ok(())
    }

    fn is_zeroed_index(&self, name: &str) -> bool {
        name.starts_with(BLOCK_IDX_PREFIX) || (self.memory_local && name.starts_with(THREAD_IDX_PREFIX))
    }
}

impl MutVisitor for TensorInlineExpandMutator<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if self.failure.is_some() {
            return;
        }
        match expr {
            // A self-referencing definition is left for the next round, where
            // the round cap reports it.
            Expr::Load(load) if load.tensor.name() == self.tensor_name && !self.inline_code => {
                match self.expansion(load) {
                    Ok(expanded) => {
                        *expr = expanded;
                        let keep = mem::replace(&mut self.inline_code, true);
                        self.visit_expr(expr);
                        self.inline_code = keep;
                    }
                    Err(err) => self.fail(err),
                }
            }
            Expr::Var(var) if self.inline_code && self.temp_buffer && self.is_zeroed_index(&var.name) => {
                *expr = Expr::int(0);
            }
            _ => self.super_expr(expr),
        }
    }

    fn visit_load(&mut self, load: &mut Load) {
        if !self.inline_code {
            return self.super_load(load);
        }
        let Some(tensor) = self.tensors.get(load.tensor.name()) else {
            return self.super_load(load);
        };
        let Some(buffer_name) = tensor.buffer.clone() else {
            return self.super_load(load);
        };
        if !is_cache_buffer_name(&buffer_name) {
            return self.super_load(load);
        }

        let memory_type = match self.tensors.buffer(&buffer_name) {
            Ok(buffer) => buffer.memory_type,
            Err(_) => return self.fail(Error::MissingBuffer { name: buffer_name }),
        };
        if let Err(err) = self.visit_cache_load(load, &buffer_name, memory_type) {
            self.fail(err);
        }
    }

    fn visit_tensor_ref(&mut self, tensor: &mut TensorRef) {
        if !self.inline_code || !tensor.name().ends_with(WRITE_CACHE_SUFFIX) {
            return;
        }
        let Ok(Some(MemoryType::Heap)) = self.tensors.memory_type_of(tensor.name()) else {
            return;
        };

        let uncached = &tensor.name()[..tensor.name().len() - WRITE_CACHE_SUFFIX.len()];
        if !self.tensors.contains(uncached) {
            return self.fail(Error::MissingTensor { name: uncached.to_string() });
        }
        trace!(from = %tensor.name(), to = %uncached, "redirecting write cache to its tensor");
        *tensor = TensorRef::new(uncached);
    }
}
