//! The lowering pipeline for one function.

use std::collections::HashSet;

use tessel_ir::{Expr, TensorMap};
use tracing::{Level, debug, warn};

use crate::config::LowerOptions;
use crate::dependency::DependencyGraph;
use crate::error::*;
use crate::gpu::{gather_axis_info, insert_sync_threads, remove_gpu_forloops_axis, transform_gpu_forloops};
use crate::inline_expand::compute_inline_expand_with_limit;
use crate::stage::{ForloopInfos, Stage, StageMap};

/// Everything the passes read or update besides the tree itself.
#[derive(Debug)]
pub struct LowerContext<'a> {
    pub stages: &'a StageMap,
    pub tensors: &'a mut TensorMap,
    /// Statement name → axis name → loop info.
    pub forloop_infos: ForloopInfos,
    /// Statements to rewrite, in order.
    pub traverse_order: Vec<String>,
    /// Buffers whose shape was already shrunk by GPU lowering.
    pub resized_buffers: HashSet<String>,
}

impl<'a> LowerContext<'a> {
    /// Context taking the loop infos from `stages`.
    pub fn new(stages: &'a StageMap, tensors: &'a mut TensorMap, traverse_order: Vec<String>) -> Self {
        Self { forloop_infos: stages.forloop_infos(), stages, tensors, traverse_order, resized_buffers: HashSet::new() }
    }

    fn ordered_stages(&self) -> Vec<&'a Stage> {
        self.traverse_order.iter().filter_map(|name| self.stages.get(name)).collect()
    }
}

/// Lower `func` in place.
///
/// Runs inline expansion, then GPU loop lowering: bound loops are rewritten
/// to device indices, the launch dimensions gathered from the stages in the
/// traverse order are attached to the function, bound headers are removed and
/// barriers are inserted (unless disabled in `options`).
#[tracing::instrument(skip_all, fields(statements = ctx.traverse_order.len()))]
pub fn lower_function(func: &mut Expr, ctx: &mut LowerContext<'_>, options: &LowerOptions) -> Result<()> {
    compute_inline_expand_with_limit(func, ctx.stages, ctx.tensors, options.max_inline_rounds)?;
    debug!(ir = %func, "after inline expansion");

    if tracing::enabled!(Level::DEBUG) {
        log_dependencies(func, ctx.tensors);
    }

    let launch = gather_axis_info(&ctx.ordered_stages());
    transform_gpu_forloops(&ctx.forloop_infos, &ctx.traverse_order, ctx.tensors, &mut ctx.resized_buffers, func)?;
    if launch.valid
        && let Expr::Function(lowered) = func
    {
        match &mut lowered.launch {
            Some(existing) => existing.merge(&launch),
            None => lowered.launch = Some(launch),
        }
    }
    debug!(ir = %func, launch = %launch, "after GPU loop rewriting");

    remove_gpu_forloops_axis(func)?;
    debug!(ir = %func, "after bound header removal");

    if options.insert_barriers {
        insert_sync_threads(func, ctx.tensors)?;
        debug!(ir = %func, "after barrier insertion");
    }
    Ok(())
}

fn log_dependencies(func: &Expr, tensors: &TensorMap) {
    match DependencyGraph::build(func, tensors) {
        Ok(graph) => match graph.producer_first_order() {
            Some(order) => debug!(order = ?order, edges = graph.edge_count(), "tensor dependencies"),
            None => warn!("tensor dependency graph has a cycle"),
        },
        Err(err) => warn!(error = %err, "could not build tensor dependency graph"),
    }
}
