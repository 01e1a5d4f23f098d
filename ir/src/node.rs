//! IR node definitions.
//!
//! [`Expr`] is a closed tagged tree. Composite nodes own their children
//! through `Box`/`Vec`; tensors and buffers are referenced by name and
//! resolved through [`TensorMap`](crate::TensorMap), which is the only place
//! where identity is shared between several tree positions.

use crate::types::*;

/// Name-keyed reference to a tensor in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorRef(pub String);

impl TensorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Name-keyed reference to a buffer in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferRef(pub String);

impl BufferRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Variable. Reduction axes carry their iteration bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub dtype: DType,
    pub reduce_bounds: Option<(Box<Expr>, Box<Expr>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub a: Box<Expr>,
    pub b: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub dtype: DType,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub condition: Box<Expr>,
    pub true_value: Box<Expr>,
    pub false_value: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub tensor: TensorRef,
    pub indices: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub tensor: TensorRef,
    pub value: Box<Expr>,
    pub indices: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alloc {
    pub buffer: BufferRef,
    pub extents: Vec<Expr>,
    pub condition: Option<Box<Expr>>,
    pub body: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Free {
    pub buffer: BufferRef,
}

/// Simple bounded loop: `for (var = min; var < min + extent; ++var)`.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub var: Var,
    pub min: Box<Expr>,
    pub extent: Box<Expr>,
    pub for_type: ForType,
    pub bind: Option<DeviceAxis>,
    pub body: Box<Expr>,
}

/// Loop with polyhedral bounds: `for (var = init; condition; var += inc)`.
///
/// Its trip count is not guaranteed to be a compile-time constant, so it can
/// never be mapped onto a hardware axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyFor {
    pub var: Var,
    pub init: Box<Expr>,
    pub condition: Box<Expr>,
    pub inc: Box<Expr>,
    pub for_type: ForType,
    pub bind: Option<DeviceAxis>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfThenElse {
    pub condition: Box<Expr>,
    pub true_case: Box<Expr>,
    pub false_case: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub call_type: CallType,
    pub read_args: Vec<Expr>,
    pub write_args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reduce {
    pub reduce_op: ReduceOp,
    pub init: Box<Expr>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    pub base: Box<Expr>,
    pub stride: Box<Expr>,
    pub lanes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub value: Box<Expr>,
    pub lanes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub symbol: Var,
    pub body: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub min: Box<Expr>,
    pub extent: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterVar {
    pub var: Var,
    pub dom: Range,
}

/// Function argument: a buffer read and/or written by the kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub buffer: BufferRef,
    pub is_output: bool,
}

/// Lowered function, the unit handed to backend code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFunc {
    pub name: String,
    pub args: Vec<Argument>,
    pub temp_buffers: Vec<BufferRef>,
    pub body: Box<Expr>,
    pub launch: Option<LaunchDims>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Expr>,
    pub buffers: Vec<BufferRef>,
    pub submodules: Vec<Expr>,
}

/// IR node.
#[derive(Debug, Clone, PartialEq, strum::AsRefStr)]
pub enum Expr {
    Const(ConstValue),
    Var(Var),
    Unary(Unary),
    Binary(Binary),
    Cast(Cast),
    Select(Select),

    Load(Load),
    Store(Store),
    Alloc(Alloc),
    Free(Free),

    For(For),
    PolyFor(PolyFor),
    IfThenElse(IfThenElse),
    Block(Block),

    Call(Call),
    Reduce(Reduce),
    Ramp(Ramp),
    Broadcast(Broadcast),
    Let(Let),

    Range(Range),
    IterVar(IterVar),

    Function(LoweredFunc),
    Module(Module),
}

impl Expr {
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Expr::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&ConstValue> {
        match self {
            Expr::Const(c) => Some(c),
            _ => None,
        }
    }

    /// Integer value of a constant node.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_const().and_then(ConstValue::as_i64)
    }

    pub fn is_zero(&self) -> bool {
        self.as_const().is_some_and(ConstValue::is_zero)
    }

    /// Whether this node is the block-wide barrier intrinsic.
    pub fn is_barrier(&self) -> bool {
        matches!(self, Expr::Call(call) if call.call_type == CallType::Intrinsic && call.name == BARRIER_INTRINSIC)
    }

    /// Statements of a block, or the node itself as a one-element slice.
    pub fn stmts(&self) -> &[Expr] {
        match self {
            Expr::Block(block) => &block.stmts,
            other => std::slice::from_ref(other),
        }
    }

    /// Move the statements out of a block (or wrap a single statement).
    pub fn into_stmts(self) -> Vec<Expr> {
        match self {
            Expr::Block(block) => block.stmts,
            other => vec![other],
        }
    }
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), dtype: DType::Int64, reduce_bounds: None }
    }

    /// Reduction axis iterating `[lower, upper)`.
    pub fn reduce_axis(name: impl Into<String>, lower: Expr, upper: Expr) -> Self {
        Self { name: name.into(), dtype: DType::Int64, reduce_bounds: Some((Box::new(lower), Box::new(upper))) }
    }

    pub fn is_reduce_axis(&self) -> bool {
        self.reduce_bounds.is_some()
    }

    /// Device axis this variable stands for, when it is a hardware index.
    pub fn device_axis(&self) -> Option<DeviceAxis> {
        DeviceAxis::from_var_name(&self.name)
    }
}

impl From<Var> for Expr {
    fn from(var: Var) -> Self {
        Expr::Var(var)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Const(ConstValue::Int(v))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Const(ConstValue::Float(v))
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Const(ConstValue::Bool(v))
    }
}
