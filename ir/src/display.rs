//! C-like textual rendering of IR trees.
//!
//! ```text
//! function fn_C(_A, _C) <grid:[4, 1, 1], block:[32, 1, 1]> {
//!   C[blockIdx.x, threadIdx.x] = (A[blockIdx.x, threadIdx.x] * 2)
//! }
//! ```

use std::fmt::{self, Formatter};

use itertools::Itertools;

use crate::node::*;

const INDENT: &str = "  ";

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn write_indent(f: &mut Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_str(INDENT)?;
    }
    Ok(())
}

/// Write `{`, the body one level deeper, and `}`.
fn write_body(f: &mut Formatter<'_>, body: &Expr, level: usize) -> fmt::Result {
    if matches!(body, Expr::Block(block) if block.stmts.is_empty()) {
        return f.write_str("{ }");
    }
    writeln!(f, "{{")?;
    write_indent(f, level + 1)?;
    write_expr(f, body, level + 1)?;
    writeln!(f)?;
    write_indent(f, level)?;
    f.write_str("}")
}

/// The caller has already written the indentation of the first line.
fn write_expr(f: &mut Formatter<'_>, expr: &Expr, level: usize) -> fmt::Result {
    match expr {
        Expr::Const(value) => write!(f, "{value}"),
        Expr::Var(var) => write!(f, "{var}"),
        Expr::Unary(node) => write!(f, "({}{})", node.op.symbol(), node.value),
        Expr::Binary(node) => match node.op.symbol() {
            Some(symbol) => write!(f, "({} {symbol} {})", node.a, node.b),
            None => write!(f, "{}({}, {})", node.op.as_ref().to_lowercase(), node.a, node.b),
        },
        Expr::Cast(node) => write!(f, "{}({})", node.dtype, node.value),
        Expr::Select(node) => write!(f, "select({}, {}, {})", node.condition, node.true_value, node.false_value),
        Expr::Load(node) => write!(f, "{}[{}]", node.tensor.name(), node.indices.iter().join(", ")),
        Expr::Store(node) => {
            write!(f, "{}[{}] = {}", node.tensor.name(), node.indices.iter().join(", "), node.value)
        }
        Expr::Alloc(node) => {
            write!(f, "alloc({}, [{}])", node.buffer.name(), node.extents.iter().join(", "))?;
            if let Some(body) = &node.body {
                f.write_str(" ")?;
                write_body(f, body, level)?;
            }
            Ok(())
        }
        Expr::Free(node) => write!(f, "free({})", node.buffer.name()),
        Expr::For(node) => {
            match node.bind {
                Some(axis) => write!(f, "for [{axis}] ({}, {}, {}) ", node.var, node.min, node.extent)?,
                None => write!(f, "for ({}, {}, {}) ", node.var, node.min, node.extent)?,
            }
            write_body(f, &node.body, level)
        }
        Expr::PolyFor(node) => {
            write!(f, "poly_for ({}, {}, {}, {}) ", node.var, node.init, node.condition, node.inc)?;
            write_body(f, &node.body, level)
        }
        Expr::IfThenElse(node) => {
            write!(f, "if ({}) ", node.condition)?;
            write_body(f, &node.true_case, level)?;
            if let Some(false_case) = &node.false_case {
                f.write_str(" else ")?;
                write_body(f, false_case, level)?;
            }
            Ok(())
        }
        Expr::Block(node) => {
            for (i, stmt) in node.stmts.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                    write_indent(f, level)?;
                }
                write_expr(f, stmt, level)?;
            }
            Ok(())
        }
        Expr::Call(node) => {
            write!(f, "{}({})", node.name, node.read_args.iter().chain(&node.write_args).join(", "))
        }
        Expr::Reduce(node) => {
            write!(f, "reduce_{}({}, {})", node.reduce_op.as_ref().to_lowercase(), node.init, node.body)
        }
        Expr::Ramp(node) => write!(f, "ramp({}, {}, {})", node.base, node.stride, node.lanes),
        Expr::Broadcast(node) => write!(f, "broadcast({}, {})", node.value, node.lanes),
        Expr::Let(node) => match &node.body {
            Some(body) => write!(f, "let {} = {}", node.symbol, body),
            None => write!(f, "let {}", node.symbol),
        },
        Expr::Range(node) => write!(f, "range({}, {})", node.min, node.extent),
        Expr::IterVar(node) => write!(f, "iter_var({}, {}, {})", node.var, node.dom.min, node.dom.extent),
        Expr::Function(node) => {
            write!(f, "function {}({})", node.name, node.args.iter().map(|arg| arg.buffer.name()).join(", "))?;
            if let Some(launch) = &node.launch {
                write!(f, " {launch}")?;
            }
            f.write_str(" ")?;
            write_body(f, &node.body, level)
        }
        Expr::Module(node) => {
            write!(f, "module {} ", node.name)?;
            let body = Expr::block(node.functions.iter().chain(&node.submodules).cloned().collect());
            write_body(f, &body, level)
        }
    }
}
