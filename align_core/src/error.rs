use thiserror::Error;

/// Failures observed by the driver loop while talking to the units.
/// The controller itself never produces these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unit returned error: {0}")]
    Protocol(String),
    #[error("timeout waiting for unit")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

impl LinkError {
    /// Transport-class failures are retried indefinitely by the driver loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LinkError::Transport(_) | LinkError::Timeout | LinkError::Protocol(_)
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
