use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Tensor has no defining expression to expand.
    #[snafu(display("tensor {tensor} has no defining expression"))]
    NotComputed { tensor: String },

    /// Access arity differs from the tensor's axis count.
    #[snafu(display("tensor {tensor} is indexed with {actual} indices but has {expected} axes"))]
    IndexArityMismatch { tensor: String, expected: usize, actual: usize },

    /// Tensor name absent from the registry.
    #[snafu(display("tensor {name} is not registered"))]
    UnknownTensor { name: String },

    /// Buffer name absent from the registry.
    #[snafu(display("buffer {name} is not registered"))]
    UnknownBuffer { name: String },
}
