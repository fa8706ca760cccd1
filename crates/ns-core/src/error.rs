//! Error types for NextStat distributions

use thiserror::Error;

/// NextStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// No complete parameter group was supplied.
    #[error("{distribution}: underspecified parameters: {detail}")]
    UnderspecifiedParameters {
        /// Distribution being constructed.
        distribution: String,
        /// Which groups were expected and which names were supplied.
        detail: String,
    },

    /// More than one parameter group (or a group plus stray members) was supplied.
    #[error("{distribution}: conflicting parameters: {detail}")]
    ConflictingParameters {
        /// Distribution being constructed.
        distribution: String,
        /// Which groups were expected and which names were supplied.
        detail: String,
    },

    /// The distribution has no generative procedure.
    #[error("cannot sample from {0} distribution")]
    UnsamplableDistribution(String),

    /// Resolving a variable required the variable itself.
    #[error("cyclic dependency while resolving values: {0}")]
    CyclicDependency(String),

    /// A referenced variable has neither a value in the point nor a registered distribution.
    #[error("unresolved reference to variable `{0}`")]
    UnresolvedReference(String),

    /// Shapes cannot be broadcast together.
    #[error("shape error: {0}")]
    Shape(String),

    /// The rejection sampler gave up before filling the output.
    #[error(
        "rejection sampler exhausted {rounds} rounds with {filled}/{requested} in-range draws"
    )]
    RejectionLimit {
        /// Rounds of inner draws performed.
        rounds: usize,
        /// Output positions filled so far.
        filled: usize,
        /// Output positions requested.
        requested: usize,
    },

    /// Sampling was cancelled through its cancellation flag.
    #[error("sampling cancelled after {rounds} rounds")]
    Cancelled {
        /// Rounds performed before cancellation was observed.
        rounds: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
