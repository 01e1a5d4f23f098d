//! Generators for property-based testing.
//!
//! Provides strategies for index expressions and for small elementwise
//! programs whose tensors form a random DAG.

use proptest::prelude::*;

use crate::types::BinaryOp;
use crate::{Buffer, Expr, MemoryType, Tensor, TensorMap, Var};

/// Extent of every axis in generated programs.
pub const EXTENT: i64 = 8;

// ============================================================================
// Expression Generators
// ============================================================================

/// Generate an index operator.
pub fn arb_index_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![Just(BinaryOp::Add), Just(BinaryOp::Sub), Just(BinaryOp::Mul), Just(BinaryOp::Div), Just(BinaryOp::Mod)]
}

/// Generate an integer index expression over `vars` (must be non-empty).
pub fn arb_index_expr(vars: Vec<String>) -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![(0i64..16).prop_map(Expr::int), proptest::sample::select(vars).prop_map(Expr::var)];
    leaf.prop_recursive(3, 16, 2, |inner| {
        (arb_index_op(), inner.clone(), inner).prop_map(|(op, a, b)| Expr::binary(op, a, b))
    })
}

// ============================================================================
// Program Generators
// ============================================================================

/// A straight-line elementwise program over 1-D tensors `T0..Tn`.
///
/// `T0` is a placeholder; every `Tk` (k > 0) loads a non-empty subset of the
/// tensors before it, so the dependency graph is always acyclic.
#[derive(Debug, Clone)]
pub struct ElementwiseProgram {
    pub tensors: TensorMap,
    /// One `for` loop storing each computed tensor, in definition order.
    pub program: Expr,
    pub names: Vec<String>,
    /// `deps[k]` are the indices of the tensors `Tk` reads.
    pub deps: Vec<Vec<usize>>,
}

impl ElementwiseProgram {
    /// Names of the computed (non-placeholder) tensors.
    pub fn computed(&self) -> impl Iterator<Item = &str> {
        self.names.iter().skip(1).map(String::as_str)
    }
}

fn tensor_name(k: usize) -> String {
    format!("T{k}")
}

fn build_program(computed_deps: Vec<Vec<usize>>) -> ElementwiseProgram {
    let mut tensors = TensorMap::new();
    let shape = vec![Expr::int(EXTENT)];

    let input = tensor_name(0);
    tensors.insert_with_buffer(
        Tensor::placeholder(&input, shape.clone()),
        Buffer::new(Buffer::name_for_tensor(&input), shape.clone(), MemoryType::Heap),
    );

    let mut names = vec![input];
    let mut deps = vec![Vec::new()];
    let mut stmts = Vec::new();

    for (offset, reads) in computed_deps.into_iter().enumerate() {
        let k = offset + 1;
        let name = tensor_name(k);
        let axis = format!("{name}_i");

        let body = reads
            .iter()
            .map(|&d| Expr::load(tensor_name(d), vec![Expr::var(&axis)]))
            .fold(Expr::int(k as i64), Expr::add);

        stmts.push(Expr::for_(
            &axis,
            Expr::int(0),
            Expr::int(EXTENT),
            Expr::store(&name, body.clone(), vec![Expr::var(&axis)]),
        ));
        tensors.insert_with_buffer(
            Tensor::compute(&name, shape.clone(), vec![Var::new(&axis)], body),
            Buffer::new(Buffer::name_for_tensor(&name), shape.clone(), MemoryType::Heap),
        );

        names.push(name);
        deps.push(reads);
    }

    ElementwiseProgram { tensors, program: Expr::block(stmts), names, deps }
}

/// Generate an elementwise program with between 2 and `max_tensors` tensors.
pub fn arb_elementwise_program(max_tensors: usize) -> impl Strategy<Value = ElementwiseProgram> {
    (2..=max_tensors.max(2))
        .prop_flat_map(|n| {
            (1..n)
                .map(|k| proptest::sample::subsequence((0..k).collect::<Vec<_>>(), 1..=k.min(3)))
                .collect::<Vec<_>>()
        })
        .prop_map(build_program)
}
