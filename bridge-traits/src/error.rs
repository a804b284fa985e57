use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The native player refused a data source (bad locator, permissions).
    #[error("Source rejected: {0}")]
    SourceRejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the failure concerns the data source itself rather
    /// than the player or the host.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, BridgeError::SourceRejected(_) | BridgeError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
