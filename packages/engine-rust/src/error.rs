use twsbridge_core::{ConnectionError, IbError};

/// Errors returned synchronously by `start` and `cancel`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown operation: {key}")]
    UnknownOperation { key: String },
    #[error("operation {key} is already active and cannot be correlated twice")]
    OperationAlreadyActive { key: String },
    #[error("operation {key} has no cancel action")]
    NotCancellable { key: String },
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Terminal failure delivered through an operation's result handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Ib(#[from] IbError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
