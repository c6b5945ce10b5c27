use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit request timed out")]
    Timeout,
    #[error("transport: {0}")]
    Transport(String),
    /// Non-zero status code in an RPC result.
    #[error("rpc status {0}")]
    Status(i32),
    #[error("malformed reply: {0}")]
    Parse(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UnitError>;
