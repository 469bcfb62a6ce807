/// External RPC client seam
///
/// The driver does not speak the wire protocol itself. It consumes a backend
/// handle through the traits in this module: a snapshot primitive for
/// read-only queries, a retryable transaction primitive for mutations and an
/// asynchronous schema-update primitive for DDL. The wrapped RPC client
/// implements these; the driver only routes into them.
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::connection::Staleness;
use crate::value::{Row, TypeCode, Value};

/// A fully translated statement, ready for the backend: SQL in the target
/// dialect's `@name` binding syntax plus the parameter and wire-type maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: BTreeMap<String, Value>,
    pub param_types: BTreeMap<String, TypeCode>,
    /// RPC deadline passed through from the connection configuration. The
    /// driver does not enforce it; the client does.
    pub timeout: Option<Duration>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: BTreeMap::new(),
            param_types: BTreeMap::new(),
            timeout: None,
        }
    }
}

/// Options for a single-call read-only snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotOptions {
    pub staleness: Staleness,
    pub timeout: Option<Duration>,
}

/// Error conditions reported by the wrapped RPC client.
///
/// These are mapped into the DB-API taxonomy at the execution-router
/// boundary, nowhere else.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The row being inserted already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// A backend precondition (constraint, schema state) was violated.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    /// Malformed statement or bad argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Transaction aborted after the client's internal retries ran out.
    #[error("aborted: {0}")]
    Aborted(String),
    /// Backend internal failure.
    #[error("internal: {0}")]
    Internal(String),
    /// Transient overload; the caller may re-issue the statement.
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Other(String),
}

/// Schema of a result stream: one field per selected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMetadata {
    pub row_type: Vec<Field>,
}

/// A single column descriptor in result metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub type_code: TypeCode,
}

impl Field {
    /// Serialized byte size of this field descriptor on the wire: the name
    /// bytes plus one tag byte each for the name and type entries. Surfaced
    /// as `internal_size` in cursor descriptions.
    pub fn encoded_len(&self) -> usize {
        self.name.len() + 2
    }
}

/// Pull-based stream of result rows.
///
/// Metadata arrives with the first result chunk, so `metadata()` returns
/// `None` until the stream has been pulled at least once. The driver peeks
/// one row immediately after execute so that column metadata is available
/// even if the caller never fetches.
pub trait RowStream: Send {
    fn metadata(&self) -> Option<&ResultMetadata>;
    fn next_row(&mut self) -> Option<Result<Row, BackendError>>;
}

/// Outcome of executing SQL: an affected-row count for DML, a row stream for
/// SELECT.
pub enum ExecutionOutcome {
    RowCount(i64),
    Stream(Box<dyn RowStream>),
}

/// Result of a committed transaction attempt.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// Value returned by the last invocation of the work callback.
    pub rows: i64,
    pub commit_timestamp: Option<DateTime<Utc>>,
}

/// Scoped read-only context (snapshot). Reads observe a single consistent
/// timestamp; no writes are possible.
#[async_trait]
pub trait ReadContext: Send {
    async fn execute_sql(&mut self, statement: Statement)
        -> Result<ExecutionOutcome, BackendError>;

    /// Timestamp at which this snapshot reads, once known.
    fn read_timestamp(&self) -> Option<DateTime<Utc>>;
}

/// Context handed to the transaction work callback for one attempt.
#[async_trait]
pub trait MutationContext: Send {
    /// Execute a DML statement, returning the affected-row count.
    async fn execute_update(&mut self, statement: Statement) -> Result<i64, BackendError>;

    /// Execute arbitrary SQL inside the transaction, returning a stream.
    ///
    /// The wrapped client defers the write until the stream is consumed; the
    /// caller must drain it or the mutation is silently dropped.
    async fn execute_sql(
        &mut self,
        statement: Statement,
    ) -> Result<Box<dyn RowStream>, BackendError>;

    /// Bulk write of a homogeneous value matrix in a single RPC.
    async fn insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Row>,
    ) -> Result<(), BackendError>;
}

/// Work callback for one transaction attempt.
///
/// The client's retry-on-conflict loop invokes this at least once per commit,
/// so the callback must be re-invokable without accumulating state across
/// attempts. The router satisfies this with stateless closures over already
/// translated statements.
pub type TransactionWork<'a> = &'a mut (dyn for<'t> FnMut(
    &'t mut (dyn MutationContext + Send),
) -> BoxFuture<'t, Result<i64, BackendError>>
              + Send);

/// Handle to the backing database, as offered by the wrapped RPC client.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Apply a batch of DDL statements, resolving once the asynchronous
    /// schema operation completes.
    async fn update_ddl(
        &self,
        statements: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<(), BackendError>;

    /// Open a read-only snapshot scoped to a single call.
    async fn snapshot(
        &self,
        options: SnapshotOptions,
    ) -> Result<Box<dyn ReadContext>, BackendError>;

    /// Run `work` inside a retryable transaction attempt and commit.
    async fn run_in_transaction(
        &self,
        work: TransactionWork<'_>,
    ) -> Result<CommitResult, BackendError>;
}
