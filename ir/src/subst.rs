//! Variable substitution.

use std::collections::HashMap;

use crate::node::{Expr, Var};
use crate::visit::MutVisitor;

struct VarSubstituter<'a> {
    bindings: &'a HashMap<&'a str, &'a Expr>,
}

impl MutVisitor for VarSubstituter<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Expr::Var(var) = expr
            && let Some(replacement) = self.bindings.get(var.name.as_str())
        {
            // The replacement is not visited: substitution is simultaneous.
            *expr = (*replacement).clone();
            return;
        }
        self.super_expr(expr);
    }
}

/// Replace every variable named in `bindings` by a copy of its binding.
pub fn substitute_vars(expr: &mut Expr, bindings: &HashMap<&str, &Expr>) {
    if bindings.is_empty() {
        return;
    }
    VarSubstituter { bindings }.visit_expr(expr);
}

/// Replace every occurrence of variable `name` by a copy of `with`.
pub fn replace_var_with_expr(expr: &mut Expr, name: &str, with: &Expr) {
    let bindings = HashMap::from([(name, with)]);
    substitute_vars(expr, &bindings);
}

struct VarRenamer<'a> {
    from: &'a str,
    to: &'a str,
}

impl MutVisitor for VarRenamer<'_> {
    fn visit_var(&mut self, var: &mut Var) {
        if var.name == self.from {
            var.name = self.to.to_string();
        }
        self.super_var(var);
    }
}

/// Rename every occurrence of variable `from`, binders included.
pub fn rename_var(expr: &mut Expr, from: &str, to: &str) {
    VarRenamer { from, to }.visit_expr(expr);
}
