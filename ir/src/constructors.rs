//! Constructor helpers for building IR trees.

use crate::node::*;
use crate::types::*;

impl Expr {
    pub fn int(v: i64) -> Self {
        Expr::Const(ConstValue::Int(v))
    }

    pub fn float(v: f64) -> Self {
        Expr::Const(ConstValue::Float(v))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(Var::new(name))
    }

    pub fn unary(op: UnaryOp, value: Expr) -> Self {
        Expr::Unary(Unary { op, value: Box::new(value) })
    }

    pub fn binary(op: BinaryOp, a: Expr, b: Expr) -> Self {
        Expr::Binary(Binary { op, a: Box::new(a), b: Box::new(b) })
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Add, a, b)
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Sub, a, b)
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Mul, a, b)
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Div, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Lt, a, b)
    }

    pub fn not(value: Expr) -> Self {
        Self::unary(UnaryOp::Not, value)
    }

    pub fn cast(dtype: DType, value: Expr) -> Self {
        Expr::Cast(Cast { dtype, value: Box::new(value) })
    }

    pub fn select(condition: Expr, true_value: Expr, false_value: Expr) -> Self {
        Expr::Select(Select {
            condition: Box::new(condition),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        })
    }

    pub fn load(tensor: impl Into<String>, indices: Vec<Expr>) -> Self {
        Expr::Load(Load { tensor: TensorRef::new(tensor), indices })
    }

    pub fn store(tensor: impl Into<String>, value: Expr, indices: Vec<Expr>) -> Self {
        Expr::Store(Store { tensor: TensorRef::new(tensor), value: Box::new(value), indices })
    }

    pub fn alloc(buffer: impl Into<String>, extents: Vec<Expr>) -> Self {
        Expr::Alloc(Alloc { buffer: BufferRef::new(buffer), extents, condition: None, body: None })
    }

    /// Allocation live for the duration of `body`.
    pub fn alloc_in(buffer: impl Into<String>, extents: Vec<Expr>, body: Expr) -> Self {
        Expr::Alloc(Alloc { buffer: BufferRef::new(buffer), extents, condition: None, body: Some(Box::new(body)) })
    }

    pub fn free(buffer: impl Into<String>) -> Self {
        Expr::Free(Free { buffer: BufferRef::new(buffer) })
    }

    /// Serial loop `for (var, min, extent)`.
    pub fn for_(var: impl Into<String>, min: Expr, extent: Expr, body: Expr) -> Self {
        Expr::For(For {
            var: Var::new(var),
            min: Box::new(min),
            extent: Box::new(extent),
            for_type: ForType::Serial,
            bind: None,
            body: Box::new(body),
        })
    }

    /// Loop bound to a hardware axis.
    pub fn for_bound(var: impl Into<String>, extent: i64, axis: DeviceAxis, body: Expr) -> Self {
        Expr::For(For {
            var: Var::new(var),
            min: Box::new(Expr::int(0)),
            extent: Box::new(Expr::int(extent)),
            for_type: axis.kind.for_type(),
            bind: Some(axis),
            body: Box::new(body),
        })
    }

    pub fn poly_for(var: impl Into<String>, init: Expr, condition: Expr, inc: Expr, body: Expr) -> Self {
        Expr::PolyFor(PolyFor {
            var: Var::new(var),
            init: Box::new(init),
            condition: Box::new(condition),
            inc: Box::new(inc),
            for_type: ForType::Serial,
            bind: None,
            body: Box::new(body),
        })
    }

    pub fn if_then(condition: Expr, true_case: Expr) -> Self {
        Expr::IfThenElse(IfThenElse { condition: Box::new(condition), true_case: Box::new(true_case), false_case: None })
    }

    pub fn if_then_else(condition: Expr, true_case: Expr, false_case: Expr) -> Self {
        Expr::IfThenElse(IfThenElse {
            condition: Box::new(condition),
            true_case: Box::new(true_case),
            false_case: Some(Box::new(false_case)),
        })
    }

    pub fn block(stmts: Vec<Expr>) -> Self {
        Expr::Block(Block { stmts })
    }

    pub fn call(name: impl Into<String>, call_type: CallType, read_args: Vec<Expr>, write_args: Vec<Expr>) -> Self {
        Expr::Call(Call { name: name.into(), call_type, read_args, write_args })
    }

    /// Block-wide barrier (`__syncthreads()`).
    pub fn barrier() -> Self {
        Self::call(BARRIER_INTRINSIC, CallType::Intrinsic, Vec::new(), Vec::new())
    }

    pub fn reduce(reduce_op: ReduceOp, init: Expr, body: Expr) -> Self {
        Expr::Reduce(Reduce { reduce_op, init: Box::new(init), body: Box::new(body) })
    }

    pub fn ramp(base: Expr, stride: Expr, lanes: u32) -> Self {
        Expr::Ramp(Ramp { base: Box::new(base), stride: Box::new(stride), lanes })
    }

    pub fn broadcast(value: Expr, lanes: u32) -> Self {
        Expr::Broadcast(Broadcast { value: Box::new(value), lanes })
    }

    pub fn let_(symbol: impl Into<String>, body: Expr) -> Self {
        Expr::Let(Let { symbol: Var::new(symbol), body: Some(Box::new(body)) })
    }

    pub fn function(name: impl Into<String>, args: Vec<Argument>, body: Expr) -> Self {
        Expr::Function(LoweredFunc {
            name: name.into(),
            args,
            temp_buffers: Vec::new(),
            body: Box::new(body),
            launch: None,
        })
    }

    pub fn module(name: impl Into<String>, functions: Vec<Expr>) -> Self {
        Expr::Module(Module { name: name.into(), functions, buffers: Vec::new(), submodules: Vec::new() })
    }
}

impl Argument {
    pub fn input(buffer: impl Into<String>) -> Self {
        Self { buffer: BufferRef::new(buffer), is_output: false }
    }

    pub fn output(buffer: impl Into<String>) -> Self {
        Self { buffer: BufferRef::new(buffer), is_output: true }
    }
}
