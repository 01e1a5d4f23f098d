//! Property tests for variable substitution.

use std::collections::HashMap;

use proptest::prelude::*;

use super::generators::*;
use crate::collect::var_names;
use crate::subst::{replace_var_with_expr, substitute_vars};
use crate::{Expr, Tensor, Var};

fn ij() -> Vec<String> {
    vec!["i".to_string(), "j".to_string()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Replacing a variable by a constant removes every occurrence of it.
    #[test]
    fn replaced_var_disappears(expr in arb_index_expr(ij())) {
        let mut rewritten = expr.clone();
        replace_var_with_expr(&mut rewritten, "i", &Expr::int(0));

        prop_assert!(!var_names(&rewritten).contains("i"));
        prop_assert_eq!(var_names(&rewritten).contains("j"), var_names(&expr).contains("j"));
    }

    /// Swapping two variables is an involution because bindings apply simultaneously.
    #[test]
    fn swap_is_involution(expr in arb_index_expr(ij())) {
        let i = Expr::var("i");
        let j = Expr::var("j");
        let swap: HashMap<&str, &Expr> = HashMap::from([("i", &j), ("j", &i)]);

        let mut rewritten = expr.clone();
        substitute_vars(&mut rewritten, &swap);
        substitute_vars(&mut rewritten, &swap);

        prop_assert_eq!(rewritten, expr);
    }

    /// Expanding a tensor at its own axes reproduces its defining expression.
    #[test]
    fn expand_at_own_axes_is_identity(body in arb_index_expr(ij())) {
        let tensor = Tensor::compute("A", vec![Expr::int(4), Expr::int(4)], vec![Var::new("i"), Var::new("j")], body.clone());
        let expanded = tensor.inline_expanded(&[Expr::var("i"), Expr::var("j")]).unwrap();
        prop_assert_eq!(expanded, body);
    }
}
