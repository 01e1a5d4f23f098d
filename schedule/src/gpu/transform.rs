use std::collections::HashSet;
use std::mem;

use snafu::ensure;
use tessel_ir::collect::contains_node;
use tessel_ir::subst::replace_var_with_expr;
use tessel_ir::{Alloc, AxisKind, DeviceAxis, Expr, For, Load, MemoryType, MutVisitor, PolyFor, Store, TensorMap, Var};
use tracing::{debug, error, trace};

use crate::error::*;
use crate::stage::{AxisInfos, ForloopInfos};

/// Rewrite loops bound to hardware axes so that they iterate over device indices.
///
/// Statements are processed in `traverse_order`. For each statement, every
/// loop enclosing a `Store` to it whose variable is bound in the statement's
/// `forloop_infos` gets the device index as header variable and `0` as
/// minimum; the body sees `device_index + min` in place of the old variable.
///
/// Inside rewritten loops, accesses to `GpuLocal` buffers lose their leading
/// block and thread indices and accesses to `GpuShared` buffers lose their
/// leading block indices. Each buffer's declared shape is shrunk once (its
/// name is recorded in `resized_buffers`) and `Alloc` extents follow.
#[tracing::instrument(skip_all, fields(statements = traverse_order.len()))]
pub fn transform_gpu_forloops(
    forloop_infos: &ForloopInfos,
    traverse_order: &[String],
    tensors: &mut TensorMap,
    resized_buffers: &mut HashSet<String>,
    expr: &mut Expr,
) -> Result<()> {
    for statement in traverse_order {
        let Some(infos) = forloop_infos.get(statement) else {
            trace!(statement = %statement, "no loop infos");
            continue;
        };
        if infos.values().all(|info| info.bind.is_none()) {
            continue;
        }

        let mut rewriter = GpuForloopRewriter {
            statement,
            infos,
            tensors: &mut *tensors,
            resized_buffers: &mut *resized_buffers,
            in_bound_body: false,
            failure: None,
        };
        rewriter.visit_expr(expr);
        rewriter.finish()?;
    }

    if !resized_buffers.is_empty() {
        AllocExtentSync { tensors, resized_buffers }.visit_expr(expr);
    }
    Ok(())
}

struct GpuForloopRewriter<'a> {
    statement: &'a str,
    infos: &'a AxisInfos,
    tensors: &'a mut TensorMap,
    resized_buffers: &'a mut HashSet<String>,
    /// Inside the body of a loop rewritten by this pass.
    in_bound_body: bool,
    failure: Option<Error>,
}

impl GpuForloopRewriter<'_> {
    fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: Error) {
        error!(statement = %self.statement, error = %err, "GPU loop rewriting failed");
        self.failure.get_or_insert(err);
    }

    fn binding(&self, var: &Var) -> Option<DeviceAxis> {
        self.infos.get(&var.name).and_then(|info| info.bind).map(|bind| bind.axis)
    }

    fn encloses_statement(&self, body: &Expr) -> bool {
        contains_node(body, |e| matches!(e, Expr::Store(store) if store.tensor.name() == self.statement))
    }

    fn rewrite_header(&self, node: &mut For, axis: DeviceAxis) {
        let device = Expr::var(axis.var_name());
        let replacement = if node.min.is_zero() { device } else { Expr::add(device, (*node.min).clone()) };
        debug!(statement = %self.statement, var = %node.var.name, device = %axis, "binding loop to device axis");

        replace_var_with_expr(&mut node.body, &node.var.name, &replacement);
        node.var = Var::new(axis.var_name());
        node.min = Box::new(Expr::int(0));
        node.for_type = axis.kind.for_type();
        node.bind = Some(axis);
    }

    /// Drop the leading device indices of an access to `tensor`.
    fn resize_access(&mut self, tensor: &str, indices: &mut Vec<Expr>) -> Result<()> {
        let Some(buffer_name) = self.tensors.get(tensor).and_then(|t| t.buffer.clone()) else {
            return Ok(());
        };
        let buffer =
            self.tensors.buffer_mut(&buffer_name).map_err(|_| Error::MissingBuffer { name: buffer_name.clone() })?;
        let dropped = leading_device_indices(indices, buffer.memory_type);

        if self.resized_buffers.contains(&buffer_name) {
            drop_leading(indices, dropped, 0);
        } else {
            if dropped == 0 {
                return Ok(());
            }
            check_rank(&buffer_name, tensor, indices.len(), buffer.shape.len())?;
            drop_leading(indices, dropped, 0);
            drop_leading(&mut buffer.shape, dropped, 1);
            trace!(buffer = %buffer_name, dropped, shape = buffer.shape.len(), "resized buffer");
            self.resized_buffers.insert(buffer_name.clone());
        }
        check_rank(&buffer_name, tensor, indices.len(), buffer.shape.len())
    }
}

impl MutVisitor for GpuForloopRewriter<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if self.failure.is_none() {
            self.super_expr(expr);
        }
    }

    fn visit_for(&mut self, node: &mut For) {
        let Some(axis) = self.binding(&node.var) else {
            return self.super_for(node);
        };
        if !self.encloses_statement(&node.body) {
            return self.super_for(node);
        }

        self.rewrite_header(node, axis);
        let keep = mem::replace(&mut self.in_bound_body, true);
        self.super_for(node);
        self.in_bound_body = keep;
    }

    fn visit_poly_for(&mut self, node: &mut PolyFor) {
        let bound = node.bind.or_else(|| self.binding(&node.var));
        match bound {
            Some(axis) => self.fail(Error::BoundPolyFor { var: node.var.name.clone(), axis: axis.to_string() }),
            None => self.super_poly_for(node),
        }
    }

    fn visit_load(&mut self, node: &mut Load) {
        if self.in_bound_body
            && let Err(err) = self.resize_access(node.tensor.name(), &mut node.indices)
        {
            return self.fail(err);
        }
        self.super_load(node);
    }

    fn visit_store(&mut self, node: &mut Store) {
        if self.in_bound_body
            && let Err(err) = self.resize_access(node.tensor.name(), &mut node.indices)
        {
            return self.fail(err);
        }
        self.super_store(node);
    }
}

/// Number of leading indices addressing per-block (shared) or per-thread
/// (local) storage.
fn leading_device_indices(indices: &[Expr], memory_type: MemoryType) -> usize {
    let droppable = |axis: DeviceAxis| match memory_type {
        MemoryType::GpuLocal => true,
        MemoryType::GpuShared => axis.kind == AxisKind::Block,
        MemoryType::Heap => false,
    };
    indices
        .iter()
        .take_while(|index| index.as_var().and_then(Var::device_axis).is_some_and(droppable))
        .count()
}

/// Remove `count` leading entries, leaving `[fill]` when nothing is left.
fn drop_leading(exprs: &mut Vec<Expr>, count: usize, fill: i64) {
    if count == 0 {
        return;
    }
    exprs.drain(..count.min(exprs.len()));
    if exprs.is_empty() {
        exprs.push(Expr::int(fill));
    }
}

fn check_rank(buffer: &str, tensor: &str, indices: usize, rank: usize) -> Result<()> {
    ensure!(indices == rank, AccessArityMismatchSnafu { buffer, tensor, indices, rank });
    Ok(())
}

/// Copies resized buffer shapes into the matching `Alloc` extents.
struct AllocExtentSync<'a> {
    tensors: &'a TensorMap,
    resized_buffers: &'a HashSet<String>,
}

impl MutVisitor for AllocExtentSync<'_> {
    fn visit_alloc(&mut self, node: &mut Alloc) {
        if self.resized_buffers.contains(node.buffer.name())
            && let Ok(buffer) = self.tensors.buffer(node.buffer.name())
        {
            trace!(buffer = %buffer.name, "syncing alloc extents");
            node.extents = buffer.shape.clone();
        }
        self.super_alloc(node);
    }
}
