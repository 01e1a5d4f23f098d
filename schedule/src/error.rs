use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal lowering errors.
///
/// All of them come from inconsistent upstream scheduling metadata; none is
/// recoverable and the lowered tree must be discarded.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // =========================================================================
    // Scheduling invariant violations
    // =========================================================================
    /// A tensor computes at more than one target.
    #[snafu(display("tensor {tensor} computes at {count} targets ({targets:?}); at most one is allowed"))]
    MultipleComputeAt { tensor: String, count: usize, targets: Vec<String> },

    /// Compute-at level points past the stage's axes.
    #[snafu(display("tensor {tensor} computes at level {level} but has only {axes} axes"))]
    ComputeAtLevelOutOfRange { tensor: String, level: usize, axes: usize },

    /// A polyhedral loop is bound to a hardware axis.
    #[snafu(display("polyhedral loop over {var} is bound to {axis}; only simple loops may carry GPU bindings"))]
    BoundPolyFor { var: String, axis: String },

    /// A loop that needs barriers sits under a condition it may change.
    #[snafu(display("loop over {var} needs barriers but its enclosing condition {condition} depends on the loop"))]
    LoopVariantCondition { var: String, condition: String },

    /// Inline expansion did not reach a fixpoint.
    #[snafu(display("inline expansion still has {remaining:?} to expand after {rounds} rounds"))]
    InlineRoundLimit { rounds: usize, remaining: Vec<String> },

    // =========================================================================
    // Missing references
    // =========================================================================
    /// Tensor absent from the global tensor map.
    #[snafu(display("tensor {name} is not in the global tensor map"))]
    MissingTensor { name: String },

    /// Buffer absent from the global tensor map.
    #[snafu(display("buffer {name} is not in the global tensor map"))]
    MissingBuffer { name: String },

    /// Tensor without scheduling metadata.
    #[snafu(display("tensor {tensor} has no stage"))]
    MissingStage { tensor: String },

    // =========================================================================
    // Malformed shapes
    // =========================================================================
    /// Access arity differs from the buffer rank.
    #[snafu(display("access to buffer {buffer} through {tensor} has {indices} indices but the buffer has rank {rank}"))]
    AccessArityMismatch { buffer: String, tensor: String, indices: usize, rank: usize },

    /// A bound loop whose extent is not a constant.
    #[snafu(display("loop over {var} is bound to {axis} but its extent {extent} is not constant"))]
    NonConstantExtent { var: String, axis: String, extent: String },

    /// A bound loop with no enclosing lowered function to record the launch on.
    #[snafu(display("loop over {var} is bound to {axis} outside of any lowered function"))]
    NotInFunction { var: String, axis: String },

    /// IR-level failure (tensor expansion, registry lookups).
    #[snafu(display("{source}"), context(false))]
    Ir { source: tessel_ir::Error },
}

