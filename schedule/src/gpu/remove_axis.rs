use std::mem;

use tessel_ir::{Block, Expr, LaunchDims, LoweredFunc, MutVisitor};
use tracing::{debug, error};

use crate::error::*;

/// Replace every bound `For` by its body and record its extent as launch geometry.
///
/// The extent of each removed loop raises the matching grid/block dimension
/// of the innermost enclosing function; dimensions already present on the
/// function are kept when larger. Blocks left nested by a removed header are
/// spliced into their parent block.
#[tracing::instrument(skip_all)]
pub fn remove_gpu_forloops_axis(expr: &mut Expr) -> Result<()> {
    let mut remover = GpuForloopsAxisRemover::default();
    remover.visit_expr(expr);
    match remover.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[derive(Default)]
struct GpuForloopsAxisRemover {
    /// Launch dims of the enclosing functions, innermost last.
    launches: Vec<LaunchDims>,
    failure: Option<Error>,
}

impl GpuForloopsAxisRemover {
    fn fail(&mut self, err: Error) {
        error!(error = %err, "removing bound loop headers failed");
        self.failure.get_or_insert(err);
    }

    /// Record the extent of a bound loop; returns whether the header can go.
    fn record(&mut self, expr: &Expr) -> Result<bool> {
        match expr {
            Expr::For(node) => {
                let Some(axis) = node.bind else {
                    return Ok(false);
                };
                let extent = node.extent.as_i64().ok_or_else(|| Error::NonConstantExtent {
                    var: node.var.name.clone(),
                    axis: axis.to_string(),
                    extent: node.extent.to_string(),
                })?;
                let launch = self
                    .launches
                    .last_mut()
                    .ok_or_else(|| Error::NotInFunction { var: node.var.name.clone(), axis: axis.to_string() })?;
                launch.extend(axis, extent);
                debug!(var = %node.var.name, device = %axis, extent, "removed bound loop header");
                Ok(true)
            }
            Expr::PolyFor(node) => match node.bind {
                Some(axis) => BoundPolyForSnafu { var: node.var.name.as_str(), axis: axis.to_string() }.fail(),
                None => Ok(false),
            },
            _ => Ok(false),
        }
    }
}

impl MutVisitor for GpuForloopsAxisRemover {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if self.failure.is_some() {
            return;
        }
        match self.record(expr) {
            Ok(true) => {
                if let Expr::For(node) = expr {
                    let body = mem::replace(&mut *node.body, Expr::Block(Block::default()));
                    *expr = body;
                }
                self.visit_expr(expr);
            }
            Ok(false) => self.super_expr(expr),
            Err(err) => self.fail(err),
        }
    }

    fn visit_block(&mut self, node: &mut Block) {
        self.super_block(node);
        if node.stmts.iter().any(|stmt| matches!(stmt, Expr::Block(_))) {
            node.stmts = mem::take(&mut node.stmts).into_iter().flat_map(Expr::into_stmts).collect();
        }
    }

    fn visit_function(&mut self, node: &mut LoweredFunc) {
        self.launches.push(LaunchDims::default());
        self.super_function(node);
        let Some(gathered) = self.launches.pop() else {
            return;
        };
        if !gathered.valid {
            return;
        }
        match &mut node.launch {
            Some(launch) => launch.merge(&gathered),
            None => node.launch = Some(gathered),
        }
        debug!(function = %node.name, launch = %gathered, "attached launch dimensions");
    }
}
