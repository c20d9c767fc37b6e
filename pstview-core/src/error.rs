use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("reader is closed")]
    Closed,

    /// Raised by a generation checkpoint once a newer operation has started.
    /// Owners of the guard swallow it; it never reaches user-visible state.
    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    BackingStore(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ViewError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ViewError::Cancelled)
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, ViewError>;
