use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Result alias for errors emitted by dispose-clippy internals.
pub type ClippyResult<T> = Result<T, DisposeClippyError>;

/// Structured error type for dispose-clippy subsystems.
#[derive(Debug, Error)]
pub enum DisposeClippyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl DisposeClippyError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True when the error came from a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for DisposeClippyError {
    fn from(err: AnyhowError) -> Self {
        match err.downcast::<DisposeClippyError>() {
            Ok(inner) => inner,
            Err(err) => DisposeClippyError::other(format!("{err:#}")),
        }
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning DisposeClippyError.
#[macro_export]
macro_rules! clippy_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::DisposeClippyError::other(format!($($arg)*)))
    };
}
