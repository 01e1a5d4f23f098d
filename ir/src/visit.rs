//! Traversal framework over [`Expr`] trees.
//!
//! A single macro generates two traits from the same dispatch table:
//! [`Visitor`] takes `&Expr` slots and [`MutVisitor`] takes `&mut Expr`
//! slots. Every `visit_*` hook defaults to the matching `super_*` method,
//! which recurses into each owned child. Leaf kinds (constants, free
//! variables, `Free`, `Range`, `IterVar`, tensor and buffer references) do
//! nothing by default.
//!
//! A pass overrides only the hooks for the kinds it cares about. To replace
//! a whole node, override `visit_expr`, assign to the slot and keep visiting
//! the new content before returning:
//!
//! ```ignore
//! impl MutVisitor for ZeroOut<'_> {
//!     fn visit_expr(&mut self, expr: &mut Expr) {
//!         match expr {
//!             Expr::Var(var) if var.name == self.name => *expr = Expr::int(0),
//!             _ => self.super_expr(expr),
//!         }
//!     }
//! }
//! ```
//!
//! The per-kind `super_*` methods are not meant to be overridden; they are
//! what an override calls to fall back to structural recursion.

use crate::node::*;
use crate::types::ConstValue;

macro_rules! make_visitor {
    ($visitor_trait_name:ident, $($mutability:ident)?) => {
        pub trait $visitor_trait_name {
            fn visit_expr(&mut self, expr: & $($mutability)? Expr) {
                self.super_expr(expr);
            }

            fn visit_const(&mut self, _value: & $($mutability)? ConstValue) {}

            fn visit_var(&mut self, var: & $($mutability)? Var) {
                self.super_var(var);
            }

            fn visit_tensor_ref(&mut self, _tensor: & $($mutability)? TensorRef) {}

            fn visit_buffer_ref(&mut self, _buffer: & $($mutability)? BufferRef) {}

            fn visit_unary(&mut self, node: & $($mutability)? Unary) {
                self.super_unary(node);
            }

            fn visit_binary(&mut self, node: & $($mutability)? Binary) {
                self.super_binary(node);
            }

            fn visit_cast(&mut self, node: & $($mutability)? Cast) {
                self.super_cast(node);
            }

            fn visit_select(&mut self, node: & $($mutability)? Select) {
                self.super_select(node);
            }

            fn visit_load(&mut self, node: & $($mutability)? Load) {
                self.super_load(node);
            }

            fn visit_store(&mut self, node: & $($mutability)? Store) {
                self.super_store(node);
            }

            fn visit_alloc(&mut self, node: & $($mutability)? Alloc) {
                self.super_alloc(node);
            }

            fn visit_free(&mut self, _node: & $($mutability)? Free) {}

            fn visit_for(&mut self, node: & $($mutability)? For) {
                self.super_for(node);
            }

            fn visit_poly_for(&mut self, node: & $($mutability)? PolyFor) {
                self.super_poly_for(node);
            }

            fn visit_if_then_else(&mut self, node: & $($mutability)? IfThenElse) {
                self.super_if_then_else(node);
            }

            fn visit_block(&mut self, node: & $($mutability)? Block) {
                self.super_block(node);
            }

            fn visit_call(&mut self, node: & $($mutability)? Call) {
                self.super_call(node);
            }

            fn visit_reduce(&mut self, node: & $($mutability)? Reduce) {
                self.super_reduce(node);
            }

            fn visit_ramp(&mut self, node: & $($mutability)? Ramp) {
                self.super_ramp(node);
            }

            fn visit_broadcast(&mut self, node: & $($mutability)? Broadcast) {
                self.super_broadcast(node);
            }

            fn visit_let(&mut self, node: & $($mutability)? Let) {
                self.super_let(node);
            }

            fn visit_range(&mut self, _node: & $($mutability)? Range) {}

            fn visit_iter_var(&mut self, _node: & $($mutability)? IterVar) {}

            fn visit_function(&mut self, node: & $($mutability)? LoweredFunc) {
                self.super_function(node);
            }

            fn visit_module(&mut self, node: & $($mutability)? Module) {
                self.super_module(node);
            }

            // Structural recursion.

            fn super_expr(&mut self, expr: & $($mutability)? Expr) {
                match expr {
                    Expr::Const(value) => self.visit_const(value),
                    Expr::Var(var) => self.visit_var(var),
                    Expr::Unary(node) => self.visit_unary(node),
                    Expr::Binary(node) => self.visit_binary(node),
                    Expr::Cast(node) => self.visit_cast(node),
                    Expr::Select(node) => self.visit_select(node),
                    Expr::Load(node) => self.visit_load(node),
                    Expr::Store(node) => self.visit_store(node),
                    Expr::Alloc(node) => self.visit_alloc(node),
                    Expr::Free(node) => self.visit_free(node),
                    Expr::For(node) => self.visit_for(node),
                    Expr::PolyFor(node) => self.visit_poly_for(node),
                    Expr::IfThenElse(node) => self.visit_if_then_else(node),
                    Expr::Block(node) => self.visit_block(node),
                    Expr::Call(node) => self.visit_call(node),
                    Expr::Reduce(node) => self.visit_reduce(node),
                    Expr::Ramp(node) => self.visit_ramp(node),
                    Expr::Broadcast(node) => self.visit_broadcast(node),
                    Expr::Let(node) => self.visit_let(node),
                    Expr::Range(node) => self.visit_range(node),
                    Expr::IterVar(node) => self.visit_iter_var(node),
                    Expr::Function(node) => self.visit_function(node),
                    Expr::Module(node) => self.visit_module(node),
                }
            }

            fn super_var(&mut self, var: & $($mutability)? Var) {
                if let Some((lower, upper)) = & $($mutability)? var.reduce_bounds {
                    self.visit_expr(lower);
                    self.visit_expr(upper);
                }
            }

            fn super_unary(&mut self, node: & $($mutability)? Unary) {
                self.visit_expr(& $($mutability)? *node.value);
            }

            fn super_binary(&mut self, node: & $($mutability)? Binary) {
                self.visit_expr(& $($mutability)? *node.a);
                self.visit_expr(& $($mutability)? *node.b);
            }

            fn super_cast(&mut self, node: & $($mutability)? Cast) {
                self.visit_expr(& $($mutability)? *node.value);
            }

            fn super_select(&mut self, node: & $($mutability)? Select) {
                self.visit_expr(& $($mutability)? *node.condition);
                self.visit_expr(& $($mutability)? *node.true_value);
                self.visit_expr(& $($mutability)? *node.false_value);
            }

            fn super_load(&mut self, node: & $($mutability)? Load) {
                self.visit_tensor_ref(& $($mutability)? node.tensor);
                for index in & $($mutability)? node.indices {
                    self.visit_expr(index);
                }
            }

            fn super_store(&mut self, node: & $($mutability)? Store) {
                self.visit_expr(& $($mutability)? *node.value);
                self.visit_tensor_ref(& $($mutability)? node.tensor);
                for index in & $($mutability)? node.indices {
                    self.visit_expr(index);
                }
            }

            fn super_alloc(&mut self, node: & $($mutability)? Alloc) {
                self.visit_buffer_ref(& $($mutability)? node.buffer);
                for extent in & $($mutability)? node.extents {
                    self.visit_expr(extent);
                }
                if let Some(condition) = & $($mutability)? node.condition {
                    self.visit_expr(condition);
                }
                if let Some(body) = & $($mutability)? node.body {
                    self.visit_expr(body);
                }
            }

            fn super_for(&mut self, node: & $($mutability)? For) {
                self.visit_expr(& $($mutability)? *node.min);
                self.visit_expr(& $($mutability)? *node.extent);
                self.visit_expr(& $($mutability)? *node.body);
            }

            fn super_poly_for(&mut self, node: & $($mutability)? PolyFor) {
                self.visit_expr(& $($mutability)? *node.init);
                self.visit_expr(& $($mutability)? *node.condition);
                self.visit_expr(& $($mutability)? *node.inc);
                self.visit_expr(& $($mutability)? *node.body);
            }

            fn super_if_then_else(&mut self, node: & $($mutability)? IfThenElse) {
                self.visit_expr(& $($mutability)? *node.condition);
                self.visit_expr(& $($mutability)? *node.true_case);
                if let Some(false_case) = & $($mutability)? node.false_case {
                    self.visit_expr(false_case);
                }
            }

            fn super_block(&mut self, node: & $($mutability)? Block) {
                for stmt in & $($mutability)? node.stmts {
                    self.visit_expr(stmt);
                }
            }

            fn super_call(&mut self, node: & $($mutability)? Call) {
                for arg in & $($mutability)? node.read_args {
                    self.visit_expr(arg);
                }
                for arg in & $($mutability)? node.write_args {
                    self.visit_expr(arg);
                }
            }

            fn super_reduce(&mut self, node: & $($mutability)? Reduce) {
                self.visit_expr(& $($mutability)? *node.init);
                self.visit_expr(& $($mutability)? *node.body);
            }

            fn super_ramp(&mut self, node: & $($mutability)? Ramp) {
                self.visit_expr(& $($mutability)? *node.base);
                self.visit_expr(& $($mutability)? *node.stride);
            }

            fn super_broadcast(&mut self, node: & $($mutability)? Broadcast) {
                self.visit_expr(& $($mutability)? *node.value);
            }

            fn super_let(&mut self, node: & $($mutability)? Let) {
                self.visit_var(& $($mutability)? node.symbol);
                if let Some(body) = & $($mutability)? node.body {
                    self.visit_expr(body);
                }
            }

            fn super_function(&mut self, node: & $($mutability)? LoweredFunc) {
                for arg in & $($mutability)? node.args {
                    self.visit_buffer_ref(& $($mutability)? arg.buffer);
                }
                for buffer in & $($mutability)? node.temp_buffers {
                    self.visit_buffer_ref(buffer);
                }
                self.visit_expr(& $($mutability)? *node.body);
            }

            fn super_module(&mut self, node: & $($mutability)? Module) {
                for function in & $($mutability)? node.functions {
                    self.visit_expr(function);
                }
                for buffer in & $($mutability)? node.buffers {
                    self.visit_buffer_ref(buffer);
                }
                for submodule in & $($mutability)? node.submodules {
                    self.visit_expr(submodule);
                }
            }
        }
    };
}

make_visitor!(Visitor,);
make_visitor!(MutVisitor, mut);
