use crate::collect::{count_nodes, load_tensor_names, store_tensor_names, var_names};
use crate::node::*;
use crate::visit::{MutVisitor, Visitor};

/// `for (i, 0, 4) { B[i] = (A[i] + k) }`
fn sample_loop() -> Expr {
    Expr::for_(
        "i",
        Expr::int(0),
        Expr::int(4),
        Expr::store("B", Expr::add(Expr::load("A", vec![Expr::var("i")]), Expr::var("k")), vec![Expr::var("i")]),
    )
}

#[derive(Default)]
struct KindCounter {
    loads: usize,
    vars: usize,
    tensor_refs: Vec<String>,
}

impl Visitor for KindCounter {
    fn visit_load(&mut self, node: &Load) {
        self.loads += 1;
        self.super_load(node);
    }

    fn visit_var(&mut self, var: &Var) {
        self.vars += 1;
        self.super_var(var);
    }

    fn visit_tensor_ref(&mut self, tensor: &TensorRef) {
        self.tensor_refs.push(tensor.name().to_string());
    }
}

#[test]
fn test_visitor_reaches_every_kind() {
    let mut counter = KindCounter::default();
    counter.visit_expr(&sample_loop());

    assert_eq!(counter.loads, 1);
    // i (load index), k, i (store index); the loop header is a declaration.
    assert_eq!(counter.vars, 3);
    // Store visits its value before its own tensor reference.
    assert_eq!(counter.tensor_refs, vec!["A", "B"]);
}

#[test]
fn test_visitor_descends_into_reduce_axis_bounds() {
    let k = Var::reduce_axis("k", Expr::int(0), Expr::var("n"));
    let expr = Expr::reduce(crate::ReduceOp::Sum, Expr::int(0), Expr::load("A", vec![Expr::Var(k)]));

    let names = var_names(&expr);
    assert!(names.contains("k"));
    assert!(names.contains("n"), "reduction bounds must be visited");
}

#[test]
fn test_leaf_kinds_are_not_descended() {
    let range = Expr::Range(Range { min: Box::new(Expr::var("lo")), extent: Box::new(Expr::var("n")) });
    assert!(var_names(&range).is_empty());

    let free = Expr::free("_A");
    assert_eq!(count_nodes(&free, |e| matches!(e, Expr::Free(_))), 1);
}

struct RenameLoads;

impl MutVisitor for RenameLoads {
    fn visit_load(&mut self, node: &mut Load) {
        node.tensor = TensorRef::new(format!("{}_copy", node.tensor.name()));
        self.super_load(node);
    }
}

#[test]
fn test_mut_visitor_edits_in_place() {
    let mut expr = sample_loop();
    RenameLoads.visit_expr(&mut expr);

    assert_eq!(load_tensor_names(&expr, |_| true), vec!["A_copy"]);
    assert_eq!(store_tensor_names(&expr), vec!["B"]);
}

/// Replaces every load with a constant and counts what it saw afterwards.
struct LoadToConst {
    replaced: usize,
    consts_seen: usize,
}

impl MutVisitor for LoadToConst {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Expr::Load(_) = expr {
            *expr = Expr::int(7);
            self.replaced += 1;
            // Continue into the replacement.
            self.visit_expr(expr);
            return;
        }
        if let Expr::Const(_) = expr {
            self.consts_seen += 1;
        }
        self.super_expr(expr);
    }
}

#[test]
fn test_slot_replacement_is_visible_to_continuation() {
    let mut expr = sample_loop();
    let mut pass = LoadToConst { replaced: 0, consts_seen: 0 };
    pass.visit_expr(&mut expr);

    assert_eq!(pass.replaced, 1);
    // min, extent and the replacement itself.
    assert_eq!(pass.consts_seen, 3);
    assert_eq!(count_nodes(&expr, |e| matches!(e, Expr::Load(_))), 0);
    assert_eq!(expr.to_string(), "for (i, 0, 4) {\n  B[i] = (7 + k)\n}");
}

#[test]
fn test_module_and_function_are_traversed() {
    let func = Expr::function("fn_B", vec![Argument::input("_A"), Argument::output("_B")], sample_loop());
    let module = Expr::module("m", vec![func]);

    assert_eq!(count_nodes(&module, |e| matches!(e, Expr::Store(_))), 1);
    assert_eq!(count_nodes(&module, |e| matches!(e, Expr::Function(_))), 1);
}
