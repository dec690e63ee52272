//! Error types for environment policy operations.

use std::collections::TryReserveError;

/// Errors raised while reading, copying or writing environment state.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("failed to allocate environment copy: {0}")]
    Alloc(#[from] TryReserveError),

    #[error("failed to set {name}: {source}")]
    SetVar {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid variable name {0:?}")]
    InvalidName(String),

    #[error("value for {0} contains a NUL byte")]
    InvalidValue(String),
}

/// Result of an environment policy operation.
pub type EnvResult<T> = Result<T, EnvError>;
