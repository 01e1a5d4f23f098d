//! Type definitions for IR nodes.
//!
//! Literal values, operator kinds, memory spaces and the loop/device binding
//! metadata carried by loop nodes and lowered functions.

use std::fmt;

/// Element type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    Bool,
    Int32,
    #[default]
    Int64,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Void,
}

impl DType {
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::UInt32 | Self::UInt64)
    }
}

/// Literal constant stored in a `Const` node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ConstValue {
    pub const fn dtype(&self) -> DType {
        match self {
            ConstValue::Int(_) => DType::Int64,
            ConstValue::UInt(_) => DType::UInt64,
            ConstValue::Float(_) => DType::Float64,
            ConstValue::Bool(_) => DType::Bool,
            ConstValue::Str(_) => DType::Void,
        }
    }

    /// Integer view of the constant, if it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(*v),
            ConstValue::UInt(v) => i64::try_from(*v).ok(),
            ConstValue::Bool(v) => Some(*v as i64),
            ConstValue::Float(_) | ConstValue::Str(_) => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            ConstValue::Int(v) => *v == 0,
            ConstValue::UInt(v) => *v == 0,
            ConstValue::Float(v) => *v == 0.0,
            ConstValue::Bool(v) => !*v,
            ConstValue::Str(_) => false,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::UInt(v) => write!(f, "{v}u"),
            ConstValue::Float(v) => write!(f, "{v:?}f"),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Unary operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

/// Binary operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Infix symbol, `None` for ops rendered as calls (`min(a, b)`).
    pub const fn symbol(&self) -> Option<&'static str> {
        Some(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Min | Self::Max | Self::Pow => return None,
        })
    }

    pub const fn is_comparison(&self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// Reduction operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum ReduceOp {
    Sum,
    Prod,
    Max,
    Min,
}

/// Memory space a buffer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::AsRefStr, strum::Display)]
pub enum MemoryType {
    /// Host or device-global memory.
    #[default]
    Heap,
    /// Per-thread registers/local memory.
    GpuLocal,
    /// Per-block shared memory.
    GpuShared,
}

/// How a loop is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::AsRefStr)]
pub enum ForType {
    #[default]
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
    GpuBlock,
    GpuThread,
}

/// Hardware index family a loop axis can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum AxisKind {
    Block,
    Thread,
}

impl AxisKind {
    /// Name prefix of the device index variable (`blockIdx`, `threadIdx`).
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Block => BLOCK_IDX_PREFIX,
            Self::Thread => THREAD_IDX_PREFIX,
        }
    }

    pub const fn for_type(&self) -> ForType {
        match self {
            Self::Block => ForType::GpuBlock,
            Self::Thread => ForType::GpuThread,
        }
    }
}

pub const BLOCK_IDX_PREFIX: &str = "blockIdx";
pub const THREAD_IDX_PREFIX: &str = "threadIdx";

/// Dimension of a block/thread index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GpuDim {
    X,
    Y,
    Z,
}

impl GpuDim {
    pub const ALL: [GpuDim; 3] = [GpuDim::X, GpuDim::Y, GpuDim::Z];

    pub const fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// A concrete hardware axis: `blockIdx.y`, `threadIdx.x`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAxis {
    pub kind: AxisKind,
    pub dim: GpuDim,
}

impl DeviceAxis {
    pub const fn block(dim: GpuDim) -> Self {
        Self { kind: AxisKind::Block, dim }
    }

    pub const fn thread(dim: GpuDim) -> Self {
        Self { kind: AxisKind::Thread, dim }
    }

    /// Name of the index variable standing for this axis.
    pub fn var_name(&self) -> String {
        format!("{}.{}", self.kind.prefix(), self.dim.as_ref())
    }

    /// Inverse of [`DeviceAxis::var_name`].
    pub fn from_var_name(name: &str) -> Option<Self> {
        let (prefix, dim) = name.split_once('.')?;
        let kind = match prefix {
            BLOCK_IDX_PREFIX => AxisKind::Block,
            THREAD_IDX_PREFIX => AxisKind::Thread,
            _ => return None,
        };
        let dim = match dim {
            "x" => GpuDim::X,
            "y" => GpuDim::Y,
            "z" => GpuDim::Z,
            _ => return None,
        };
        Some(Self { kind, dim })
    }
}

impl fmt::Display for DeviceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.prefix(), self.dim.as_ref())
    }
}

/// Kernel launch geometry: grid (block counts) and block (thread counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchDims {
    pub grid: [i64; 3],
    pub block: [i64; 3],
    /// Set once at least one axis has been bound.
    pub valid: bool,
}

impl Default for LaunchDims {
    fn default() -> Self {
        Self { grid: [1; 3], block: [1; 3], valid: false }
    }
}

impl LaunchDims {
    pub fn extent(&self, axis: DeviceAxis) -> i64 {
        match axis.kind {
            AxisKind::Block => self.grid[axis.dim.index()],
            AxisKind::Thread => self.block[axis.dim.index()],
        }
    }

    /// Raise the extent of `axis` to at least `extent`.
    pub fn extend(&mut self, axis: DeviceAxis, extent: i64) {
        let slot = match axis.kind {
            AxisKind::Block => &mut self.grid[axis.dim.index()],
            AxisKind::Thread => &mut self.block[axis.dim.index()],
        };
        *slot = (*slot).max(extent);
        self.valid = true;
    }

    /// Elementwise maximum of two descriptors.
    pub fn merge(&mut self, other: &LaunchDims) {
        if !other.valid {
            return;
        }
        for dim in GpuDim::ALL {
            self.extend(DeviceAxis::block(dim), other.grid[dim.index()]);
            self.extend(DeviceAxis::thread(dim), other.block[dim.index()]);
        }
    }
}

impl fmt::Display for LaunchDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [gx, gy, gz] = self.grid;
        let [bx, by, bz] = self.block;
        write!(f, "<grid:[{gx}, {gy}, {gz}], block:[{bx}, {by}, {bz}]>")
    }
}

/// Call flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::AsRefStr)]
pub enum CallType {
    #[default]
    Extern,
    Intrinsic,
}

/// Name of the block-wide barrier intrinsic.
pub const BARRIER_INTRINSIC: &str = "__syncthreads";
