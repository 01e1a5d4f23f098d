//! Read-only queries over IR trees.

use std::collections::{BTreeSet, HashSet};

use crate::node::{Expr, Let, Load, Store, Var};
use crate::visit::Visitor;

struct NodeCollector<F> {
    predicate: F,
    found: Vec<Expr>,
}

impl<F: FnMut(&Expr) -> bool> Visitor for NodeCollector<F> {
    fn visit_expr(&mut self, expr: &Expr) {
        if (self.predicate)(expr) {
            self.found.push(expr.clone());
        }
        self.super_expr(expr);
    }
}

/// Copies of every node (pre-order) satisfying `predicate`.
pub fn collect_nodes(expr: &Expr, predicate: impl FnMut(&Expr) -> bool) -> Vec<Expr> {
    let mut collector = NodeCollector { predicate, found: Vec::new() };
    collector.visit_expr(expr);
    collector.found
}

struct NodeCounter<F> {
    predicate: F,
    count: usize,
}

impl<F: FnMut(&Expr) -> bool> Visitor for NodeCounter<F> {
    fn visit_expr(&mut self, expr: &Expr) {
        if (self.predicate)(expr) {
            self.count += 1;
        }
        self.super_expr(expr);
    }
}

pub fn count_nodes(expr: &Expr, predicate: impl FnMut(&Expr) -> bool) -> usize {
    let mut counter = NodeCounter { predicate, count: 0 };
    counter.visit_expr(expr);
    counter.count
}

pub fn contains_node(expr: &Expr, predicate: impl FnMut(&Expr) -> bool) -> bool {
    count_nodes(expr, predicate) > 0
}

#[derive(Default)]
struct TensorNames {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl TensorNames {
    fn push(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }
}

struct LoadTensorCollector<F> {
    predicate: F,
    names: TensorNames,
}

impl<F: Fn(&str) -> bool> Visitor for LoadTensorCollector<F> {
    fn visit_load(&mut self, node: &Load) {
        if (self.predicate)(node.tensor.name()) {
            self.names.push(node.tensor.name());
        }
        self.super_load(node);
    }
}

/// Distinct tensors read by `Load` nodes, in first-use order.
pub fn load_tensor_names(expr: &Expr, predicate: impl Fn(&str) -> bool) -> Vec<String> {
    let mut collector = LoadTensorCollector { predicate, names: TensorNames::default() };
    collector.visit_expr(expr);
    collector.names.names
}

#[derive(Default)]
struct StoreTensorCollector {
    names: TensorNames,
}

impl Visitor for StoreTensorCollector {
    fn visit_store(&mut self, node: &Store) {
        self.names.push(node.tensor.name());
        self.super_store(node);
    }
}

/// Distinct tensors written by `Store` nodes, in first-use order.
pub fn store_tensor_names(expr: &Expr) -> Vec<String> {
    let mut collector = StoreTensorCollector::default();
    collector.visit_expr(expr);
    collector.names.names
}

#[derive(Default)]
struct VarCollector {
    names: HashSet<String>,
}

impl Visitor for VarCollector {
    fn visit_var(&mut self, var: &Var) {
        self.names.insert(var.name.clone());
        self.super_var(var);
    }
}

/// Names of every variable occurring in an expression position.
///
/// Loop header variables are declarations, not uses, and are not reported.
pub fn var_names(expr: &Expr) -> HashSet<String> {
    let mut collector = VarCollector::default();
    collector.visit_expr(expr);
    collector.names
}

#[derive(Default)]
struct BinderCollector {
    names: BTreeSet<String>,
}

impl Visitor for BinderCollector {
    fn visit_var(&mut self, var: &Var) {
        if var.is_reduce_axis() {
            self.names.insert(var.name.clone());
        }
        self.super_var(var);
    }

    fn visit_let(&mut self, node: &Let) {
        self.names.insert(node.symbol.name.clone());
        self.super_let(node);
    }
}

/// Names bound inside `expr`: reduction axes and `Let` symbols.
pub fn bound_var_names(expr: &Expr) -> BTreeSet<String> {
    let mut collector = BinderCollector::default();
    collector.visit_expr(expr);
    collector.names
}
