//! Tree visualization for IR nodes.
//!
//! Renders an [`Expr`] as an ASCII tree, one line per node:
//!
//! ```text
//! Function fn_C
//! └─ For i (0, 16)
//!    └─ Store C
//!       ├─ Load A
//!       │  └─ Var i
//!       └─ Var i
//! ```

use std::borrow::Cow;
use std::io;

use ptree::{Style, TreeItem};

use crate::node::Expr;
use crate::visit::Visitor;

/// Collects the direct children of a node.
#[derive(Default)]
struct ChildCollector {
    children: Vec<Expr>,
}

impl Visitor for ChildCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        self.children.push(expr.clone());
    }
}

/// Direct child expressions of `expr`, in traversal order.
pub fn children(expr: &Expr) -> Vec<Expr> {
    let mut collector = ChildCollector::default();
    collector.super_expr(expr);
    collector.children
}

#[derive(Clone)]
struct ExprTree {
    expr: Expr,
}

impl TreeItem for ExprTree {
    type Child = ExprTree;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        write!(f, "{}", format_node(&self.expr))
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Owned(children(&self.expr).into_iter().map(|expr| ExprTree { expr }).collect())
    }
}

/// One-line label for a node: kind plus its identifying payload.
fn format_node(expr: &Expr) -> String {
    let kind = expr.as_ref();
    match expr {
        Expr::Const(value) => format!("{kind} {value}"),
        Expr::Var(var) => format!("{kind} {}", var.name),
        Expr::Unary(node) => format!("{kind} {}", node.op.as_ref()),
        Expr::Binary(node) => format!("{kind} {}", node.op.as_ref()),
        Expr::Cast(node) => format!("{kind} {}", node.dtype),
        Expr::Load(node) => format!("{kind} {}", node.tensor.name()),
        Expr::Store(node) => format!("{kind} {}", node.tensor.name()),
        Expr::Alloc(node) => format!("{kind} {}", node.buffer.name()),
        Expr::Free(node) => format!("{kind} {}", node.buffer.name()),
        Expr::For(node) => match node.bind {
            Some(axis) => format!("{kind} {} ({}, {}) [{axis}]", node.var, node.min, node.extent),
            None => format!("{kind} {} ({}, {})", node.var, node.min, node.extent),
        },
        Expr::PolyFor(node) => format!("{kind} {}", node.var),
        Expr::Call(node) => format!("{kind} {}", node.name),
        Expr::Reduce(node) => format!("{kind} {}", node.reduce_op.as_ref()),
        Expr::Let(node) => format!("{kind} {}", node.symbol),
        Expr::IterVar(node) => format!("{kind} {}", node.var),
        Expr::Function(node) => match &node.launch {
            Some(launch) => format!("{kind} {} {launch}", node.name),
            None => format!("{kind} {}", node.name),
        },
        Expr::Module(node) => format!("{kind} {}", node.name),
        Expr::Select(_)
        | Expr::IfThenElse(_)
        | Expr::Block(_)
        | Expr::Ramp(_)
        | Expr::Broadcast(_)
        | Expr::Range(_) => kind.to_string(),
    }
}

/// Render an IR tree as an ASCII tree string.
pub fn render_tree(expr: &Expr) -> String {
    let mut buf = Vec::new();
    if let Err(err) = ptree::write_tree(&ExprTree { expr: expr.clone() }, &mut buf) {
        tracing::warn!(error = %err, "tree rendering failed");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

impl Expr {
    /// ASCII tree rendering of this node, see [`render_tree`].
    pub fn tree(&self) -> String {
        render_tree(self)
    }
}
