use std::collections::HashSet;
use std::mem;

use snafu::ensure;
use tessel_ir::collect::{contains_node, load_tensor_names, store_tensor_names, var_names};
use tessel_ir::{Alloc, Block, Expr, For, IfThenElse, LoweredFunc, MemoryType, PolyFor, TensorMap, Var};
use tracing::{debug, trace};

use crate::error::*;

/// Insert block-wide barriers between writers and readers of shared memory.
///
/// Each statement sequence tracks the `GpuShared` tensors written since the
/// last barrier; a barrier goes right before the first statement reading one
/// of them. Conditionals never contain a barrier: their branches are cut at
/// barriers into consecutive conditionals, with the barriers between them.
///
/// ```text
/// if (c) { S[t] = x; y = S[t'] }      if (c) { S[t] = x }
///                               ==>   __syncthreads()
///                                     if (c) { y = S[t'] }
/// ```
///
/// A loop or allocation scope that needs a barrier inside is not left under a
/// conditional: the conditional moves into its body and is cut there.
///
/// ```text
/// if (c) { for k { S[t] = x; y = S[t'] } }   ==>   for k { if (c) { S[t] = x }
///                                                          __syncthreads()
///                                                          if (c) { y = S[t'] } }
/// ```
///
/// This requires the condition not to depend on the loop; otherwise the pass
/// fails with [`Error::LoopVariantCondition`].
#[tracing::instrument(skip_all)]
pub fn insert_sync_threads(expr: &mut Expr, tensors: &TensorMap) -> Result<()> {
    let inserter = SyncInserter { shared: shared_tensors(tensors)? };
    if inserter.shared.is_empty() {
        trace!("no shared memory, nothing to synchronize");
        return Ok(());
    }
    inserter.sync_root(expr)
}

/// Tensors backed by a `GpuShared` buffer.
fn shared_tensors(tensors: &TensorMap) -> Result<HashSet<String>> {
    let mut shared = HashSet::new();
    for tensor in tensors.tensors() {
        let Some(buffer) = &tensor.buffer else { continue };
        let memory_type = tensors
            .buffer(buffer)
            .map_err(|_| Error::MissingBuffer { name: buffer.clone() })?
            .memory_type;
        if memory_type == MemoryType::GpuShared {
            shared.insert(tensor.name.clone());
        }
    }
    Ok(shared)
}

fn push_barrier(out: &mut Vec<Expr>) {
    if !out.last().is_some_and(Expr::is_barrier) {
        out.push(Expr::barrier());
    }
}

fn empty() -> Expr {
    Expr::Block(Block::default())
}

/// Emit the pending run of statements as `if (condition) { group }`.
fn flush_group(condition: &Expr, group: &mut Vec<Expr>, out: &mut Vec<Expr>) {
    if !group.is_empty() {
        out.push(Expr::if_then(condition.clone(), Expr::block(mem::take(group))));
    }
}

/// The condition must read nothing the loop changes.
fn ensure_loop_invariant(condition: &Expr, var: &Var, body: &Expr) -> Result<()> {
    let written = store_tensor_names(body);
    let variant = var_names(condition).contains(&var.name)
        || !load_tensor_names(condition, |name| written.iter().any(|w| w == name)).is_empty();
    ensure!(!variant, LoopVariantConditionSnafu { var: var.name.as_str(), condition: condition.to_string() });
    Ok(())
}

struct SyncInserter {
    shared: HashSet<String>,
}

impl SyncInserter {
    fn sync_root(&self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::Function(func) => self.sync_function(func),
            Expr::Module(module) => {
                for function in &mut module.functions {
                    self.sync_root(function)?;
                }
                for submodule in &mut module.submodules {
                    self.sync_root(submodule)?;
                }
                Ok(())
            }
            other => {
                *other = self.sync_body(mem::replace(other, empty()))?;
                Ok(())
            }
        }
    }

    fn sync_function(&self, func: &mut LoweredFunc) -> Result<()> {
        let body = mem::replace(&mut *func.body, empty());
        *func.body = self.sync_body(body)?;
        debug!(function = %func.name, "inserted barriers");
        Ok(())
    }

    fn sync_body(&self, body: Expr) -> Result<Expr> {
        let mut pending = HashSet::new();
        let mut out = Vec::new();
        self.sync_seq(body.into_stmts(), &mut pending, false, &mut out)?;
        Ok(match <[Expr; 1]>::try_from(out) {
            Ok([stmt]) => stmt,
            Err(stmts) => Expr::block(stmts),
        })
    }

    fn reads(&self, stmt: &Expr) -> HashSet<String> {
        load_tensor_names(stmt, |name| self.shared.contains(name)).into_iter().collect()
    }

    fn writes(&self, stmt: &Expr) -> HashSet<String> {
        store_tensor_names(stmt).into_iter().filter(|name| self.shared.contains(name)).collect()
    }

    /// Whether a loop or scope needs a barrier somewhere inside.
    fn needs_inner_barrier(&self, stmt: &Expr) -> bool {
        contains_node(stmt, Expr::is_barrier) || !self.reads(stmt).is_disjoint(&self.writes(stmt))
    }

    /// Whether `stmt` cannot stay whole under a conditional.
    fn needs_split(&self, stmt: &Expr) -> bool {
        match stmt {
            Expr::Block(block) => block.stmts.iter().any(|stmt| self.needs_split(stmt)),
            Expr::IfThenElse(node) => {
                self.needs_split(&node.true_case) || node.false_case.as_deref().is_some_and(|f| self.needs_split(f))
            }
            Expr::For(_) | Expr::PolyFor(_) | Expr::Alloc(Alloc { body: Some(_), .. }) => {
                self.needs_inner_barrier(stmt)
            }
            _ => false,
        }
    }

    /// Rewrite `if (condition) { stmts }` so that every loop or scope needing
    /// a barrier carries the condition inside its body instead.
    fn distribute(&self, condition: &Expr, stmts: Vec<Expr>) -> Result<Vec<Expr>> {
        let mut out = Vec::new();
        let mut group = Vec::new();
        for stmt in stmts {
            if !self.needs_split(&stmt) {
                group.push(stmt);
                continue;
            }
            flush_group(condition, &mut group, &mut out);
            match stmt {
                Expr::Block(block) => out.extend(self.distribute(condition, block.stmts)?),
                Expr::IfThenElse(node) => {
                    let inner = self.distribute_if(node)?;
                    out.extend(self.distribute(condition, inner)?);
                }
                Expr::For(mut node) => {
                    ensure_loop_invariant(condition, &node.var, &node.body)?;
                    let body = mem::replace(&mut *node.body, empty());
                    *node.body = Expr::if_then(condition.clone(), body);
                    out.push(Expr::For(node));
                }
                Expr::PolyFor(mut node) => {
                    ensure_loop_invariant(condition, &node.var, &node.body)?;
                    let body = mem::replace(&mut *node.body, empty());
                    *node.body = Expr::if_then(condition.clone(), body);
                    out.push(Expr::PolyFor(node));
                }
                Expr::Alloc(mut node) => {
                    if let Some(body) = node.body.take() {
                        node.body = Some(Box::new(Expr::if_then(condition.clone(), *body)));
                    }
                    out.push(Expr::Alloc(node));
                }
                other => group.push(other),
            }
        }
        flush_group(condition, &mut group, &mut out);
        Ok(out)
    }

    /// `if (c) { T } else { F }` as `if (c) { T }; if (!c) { F }`, distributed.
    fn distribute_if(&self, node: IfThenElse) -> Result<Vec<Expr>> {
        let IfThenElse { condition, true_case, false_case } = node;
        let mut stmts = self.distribute(&condition, true_case.into_stmts())?;
        if let Some(false_case) = false_case {
            stmts.extend(self.distribute(&Expr::not((*condition).clone()), false_case.into_stmts())?);
        }
        Ok(stmts)
    }

    /// Emit `stmts` into `out`, given the shared writes not yet synchronized.
    fn sync_seq(
        &self,
        stmts: Vec<Expr>,
        pending: &mut HashSet<String>,
        under_cond: bool,
        out: &mut Vec<Expr>,
    ) -> Result<()> {
        for stmt in stmts {
            match stmt {
                stmt if stmt.is_barrier() => {
                    push_barrier(out);
                    pending.clear();
                }
                Expr::Block(block) => self.sync_seq(block.stmts, pending, under_cond, out)?,
                Expr::IfThenElse(node) => self.sync_if(node, pending, under_cond, out)?,
                // Conditionals were distributed, so nothing below needs a barrier inside.
                stmt if under_cond => self.sync_opaque(stmt, pending, out),
                Expr::For(node) => self.sync_for(node, pending, out)?,
                Expr::PolyFor(node) => self.sync_poly_for(node, pending, out)?,
                Expr::Alloc(node) if node.body.is_some() => self.sync_alloc(node, pending, out)?,
                stmt => self.sync_opaque(stmt, pending, out),
            }
        }
        Ok(())
    }

    /// A statement whose inside is not split.
    fn sync_opaque(&self, stmt: Expr, pending: &mut HashSet<String>, out: &mut Vec<Expr>) {
        if !self.reads(&stmt).is_disjoint(pending) {
            push_barrier(out);
            pending.clear();
        }
        pending.extend(self.writes(&stmt));
        out.push(stmt);
    }

    /// Barrier before a header whose expressions read pending writes.
    fn sync_header<'e>(
        &self,
        exprs: impl IntoIterator<Item = &'e Expr>,
        pending: &mut HashSet<String>,
        out: &mut Vec<Expr>,
    ) {
        if exprs.into_iter().any(|expr| !self.reads(expr).is_disjoint(pending)) {
            push_barrier(out);
            pending.clear();
        }
    }

    /// Loop bodies are synchronized against the writes of earlier iterations too.
    fn sync_loop_body(&self, body: Expr, pending: &mut HashSet<String>) -> Result<Expr> {
        let stmts = body.into_stmts();

        let mut carried = pending.clone();
        self.sync_seq(stmts.clone(), &mut carried, false, &mut Vec::new())?;

        let mut entry: HashSet<String> = pending.union(&carried).cloned().collect();
        let mut out = Vec::new();
        self.sync_seq(stmts, &mut entry, false, &mut out)?;

        // Zero iterations leave the incoming writes pending.
        pending.extend(entry);
        Ok(Expr::block(out))
    }

    fn sync_for(&self, mut node: For, pending: &mut HashSet<String>, out: &mut Vec<Expr>) -> Result<()> {
        self.sync_header([&*node.min, &*node.extent], pending, out);
        let body = mem::replace(&mut *node.body, empty());
        *node.body = self.sync_loop_body(body, pending)?;
        out.push(Expr::For(node));
        Ok(())
    }

    fn sync_poly_for(&self, mut node: PolyFor, pending: &mut HashSet<String>, out: &mut Vec<Expr>) -> Result<()> {
        self.sync_header([&*node.init], pending, out);
        let body = mem::replace(&mut *node.body, empty());
        *node.body = self.sync_loop_body(body, pending)?;
        out.push(Expr::PolyFor(node));
        Ok(())
    }

    /// The body of a scoped allocation continues the enclosing sequence.
    fn sync_alloc(&self, mut node: Alloc, pending: &mut HashSet<String>, out: &mut Vec<Expr>) -> Result<()> {
        self.sync_header(node.extents.iter().chain(node.condition.as_deref()), pending, out);
        if let Some(body) = node.body.take() {
            let mut stmts = Vec::new();
            self.sync_seq(body.into_stmts(), pending, false, &mut stmts)?;
            node.body = Some(Box::new(Expr::block(stmts)));
        }
        out.push(Expr::Alloc(node));
        Ok(())
    }

    fn sync_if(
        &self,
        node: IfThenElse,
        pending: &mut HashSet<String>,
        under_cond: bool,
        out: &mut Vec<Expr>,
    ) -> Result<()> {
        if self.needs_split(&node.true_case) || node.false_case.as_deref().is_some_and(|f| self.needs_split(f)) {
            debug!(condition = %node.condition, "moving conditional into loops that need barriers");
            let stmts = self.distribute_if(node)?;
            return self.sync_seq(stmts, pending, under_cond, out);
        }

        let IfThenElse { condition, true_case, false_case } = node;
        self.sync_header([&*condition], pending, out);

        let mut true_pending = pending.clone();
        let mut true_stmts = Vec::new();
        self.sync_seq(true_case.into_stmts(), &mut true_pending, true, &mut true_stmts)?;

        let mut false_pending = pending.clone();
        let false_stmts = match false_case {
            Some(false_case) => {
                let mut stmts = Vec::new();
                self.sync_seq(false_case.into_stmts(), &mut false_pending, true, &mut stmts)?;
                Some(stmts)
            }
            None => None,
        };

        *pending = true_pending.union(&false_pending).cloned().collect();

        let split = true_stmts.iter().chain(false_stmts.iter().flatten()).any(Expr::is_barrier);
        if !split {
            out.push(match false_stmts {
                Some(false_stmts) => Expr::if_then_else(*condition, Expr::block(true_stmts), Expr::block(false_stmts)),
                None => Expr::if_then(*condition, Expr::block(true_stmts)),
            });
            return Ok(());
        }

        debug!(condition = %condition, "splitting conditional around barriers");
        emit_segments(&condition, true_stmts, out);
        if let Some(false_stmts) = false_stmts {
            emit_segments(&Expr::not((*condition).clone()), false_stmts, out);
        }
        Ok(())
    }
}

/// Emit `if (condition) { segment }` for each barrier-free run of `stmts`,
/// with the barriers between them.
fn emit_segments(condition: &Expr, stmts: Vec<Expr>, out: &mut Vec<Expr>) {
    let mut segment = Vec::new();
    for stmt in stmts {
        if stmt.is_barrier() {
            if !segment.is_empty() {
                out.push(Expr::if_then(condition.clone(), Expr::block(mem::take(&mut segment))));
            }
            push_barrier(out);
        } else {
            segment.push(stmt);
        }
    }
    if !segment.is_empty() {
        out.push(Expr::if_then(condition.clone(), Expr::block(segment)));
    }
}
