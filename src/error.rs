use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation core and its I/O wrappers.
///
/// Each variant carries enough context to be actionable. Stale events and
/// "no hit" predictions are not errors and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user, configuration or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Numerical or geometric issue: a NaN event time, exhausted nudge retries
    /// or time running backwards.
    #[error("numerical error: {0}")]
    MathError(String),

    /// Malformed line in a particle-list file (1-based line number).
    #[error("malformed input at line {line}: {message}")]
    Input { line: usize, message: String },

    /// Particle-list file with a different number of particles than declared.
    #[error("expected {expected} particles, found {found}")]
    ParticleCount { expected: usize, found: usize },

    /// Unreadable run configuration file.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Propagated I/O errors (reading inputs, writing trajectories).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
