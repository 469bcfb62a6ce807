/// DB-API error taxonomy for the spanner-dbapi driver
///
/// Backend error conditions are translated into this taxonomy exactly once,
/// at the execution-router boundary (`execute` module). No other layer
/// inspects backend error kinds. All failures are synchronous; nothing is
/// retried here beyond what the wrapped transaction primitive already does.
use crate::client::BackendError;

/// Driver result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An unsupported-but-requested operation, e.g. `commit`/`rollback` on a
    /// driver that only offers autocommit semantics.
    #[error("warning: {0}")]
    Warning(String),

    /// Operation attempted on a closed cursor or connection.
    #[error("interface error: {0}")]
    Interface(String),

    /// Caller misuse: no active result set, unimplemented optional method,
    /// malformed statement or bad placeholder/argument shape.
    #[error("programming error: {0}")]
    Programming(String),

    /// Constraint or uniqueness violation reported by the backend.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Backend-reported internal or transient failure. Recoverable only by
    /// re-issuing the statement.
    #[error("operational error: {0}")]
    Operational(String),
}

impl Error {
    /// Map a backend error condition into the DB-API taxonomy.
    ///
    /// Pre-existing-row and failed-precondition conditions are integrity
    /// errors; malformed statements are programming errors; everything else
    /// (internal, overloaded, aborted after the client's own retries ran out)
    /// is operational.
    pub(crate) fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::AlreadyExists(msg) | BackendError::FailedPrecondition(msg) => {
                Error::Integrity(msg)
            }
            BackendError::InvalidArgument(msg) => Error::Programming(msg),
            BackendError::Internal(msg)
            | BackendError::Unavailable(msg)
            | BackendError::Aborted(msg)
            | BackendError::Other(msg) => Error::Operational(msg),
        }
    }

    pub(crate) fn closed_cursor() -> Self {
        Error::Interface("cursor is already closed".into())
    }

    pub(crate) fn closed_connection() -> Self {
        Error::Interface("connection is already closed".into())
    }
}
