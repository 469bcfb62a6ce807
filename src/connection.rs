/// Connection lifecycle and session configuration.
///
/// A `Connection` owns the backend handle and the session-level configuration
/// (read-only flag, staleness, RPC timeout, DML mode). The driver only offers
/// autocommit semantics: there is no pending-transaction state, `commit` and
/// `rollback` exist solely to satisfy the standard interface shape and always
/// fail with a warning.
///
/// Cursors share the connection state through an `Arc` and consult the closed
/// flag on every operation, so closing a connection invalidates all of its
/// cursors without any explicit deregistration.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{DatabaseClient, SnapshotOptions};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::execute::{self, ExecuteOutcome};
use crate::params::Params;
use crate::value::Value;

const LIST_TABLES_SQL: &str = "SELECT t.table_name \
     FROM information_schema.tables AS t \
     WHERE t.table_catalog = '' AND t.table_schema = ''";

const TABLE_COLUMNS_SQL: &str = "SELECT c.column_name, c.is_nullable, c.spanner_type \
     FROM information_schema.columns AS c \
     WHERE c.table_schema = '' AND c.table_name = %s";

/// Transaction mode derived from the read-only flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// How autocommit DML executes on the backend.
///
/// `PartitionedNonAtomic` is carried as configuration for the backend's
/// partitioned-DML execution; the routing layer itself always uses the
/// transactional path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutocommitDmlMode {
    #[default]
    Transactional,
    PartitionedNonAtomic,
}

/// Staleness bound for read-only snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Staleness {
    /// Read at a timestamp where all previously committed data is visible.
    #[default]
    Strong,
    /// Read exactly at the given timestamp.
    ReadTimestamp(DateTime<Utc>),
    /// Read at exactly `now - duration`.
    ExactStaleness(Duration),
    /// Read at the freshest timestamp within the bound.
    MaxStaleness(Duration),
}

/// One column of a table schema, as reported by the INFORMATION_SCHEMA
/// columns view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// The backend's type name, e.g. `INT64` or `STRING(MAX)`.
    pub sql_type: String,
    pub null_ok: bool,
}

/// Session configuration mutated through the connection setters.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionConfig {
    pub(crate) read_only: bool,
    pub(crate) autocommit_dml_mode: AutocommitDmlMode,
    pub(crate) timeout: Option<Duration>,
    pub(crate) staleness: Staleness,
}

/// Connection state shared with cursors.
pub(crate) struct ConnectionInner {
    pub(crate) id: Uuid,
    pub(crate) client: Arc<dyn DatabaseClient>,
    closed: AtomicBool,
    pub(crate) config: Mutex<SessionConfig>,
    /// DDL statements queued for the next schema-update flush. Queued DDL is
    /// flushed before any subsequent statement executes.
    pub(crate) ddl_statements: Mutex<Vec<String>>,
    pub(crate) read_timestamp: Mutex<Option<DateTime<Utc>>>,
    pub(crate) commit_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl ConnectionInner {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::closed_connection());
        }
        Ok(())
    }

    pub(crate) fn lock_config(&self) -> Result<std::sync::MutexGuard<'_, SessionConfig>> {
        self.config
            .lock()
            .map_err(|e| Error::Operational(format!("config lock poisoned: {e}")))
    }

    pub(crate) fn snapshot_options(&self) -> Result<SnapshotOptions> {
        let config = self.lock_config()?;
        Ok(SnapshotOptions {
            staleness: config.staleness.clone(),
            timeout: config.timeout,
        })
    }
}

/// A connection to one database.
///
/// Create through [`connect`]. Not designed for concurrent use from multiple
/// threads without external synchronization; execution calls block the
/// calling thread for the duration of the RPC.
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

/// Open a connection over an established backend handle.
pub fn connect(client: Arc<dyn DatabaseClient>) -> Connection {
    let id = Uuid::new_v4();
    info!(conn_id = %id, "opening connection");
    Connection {
        inner: Arc::new(ConnectionInner {
            id,
            client,
            closed: AtomicBool::new(false),
            config: Mutex::new(SessionConfig::default()),
            ddl_statements: Mutex::new(Vec::new()),
            read_timestamp: Mutex::new(None),
            commit_timestamp: Mutex::new(None),
        }),
    }
}

impl Connection {
    /// The driver always works in autocommit mode; there is no way to turn
    /// it off.
    pub fn autocommit(&self) -> bool {
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn read_only(&self) -> Result<bool> {
        Ok(self.inner.lock_config()?.read_only)
    }

    pub fn set_read_only(&self, read_only: bool) -> Result<()> {
        self.inner.check_open()?;
        self.inner.lock_config()?.read_only = read_only;
        Ok(())
    }

    pub fn transaction_mode(&self) -> Result<TransactionMode> {
        Ok(if self.inner.lock_config()?.read_only {
            TransactionMode::ReadOnly
        } else {
            TransactionMode::ReadWrite
        })
    }

    pub fn autocommit_dml_mode(&self) -> Result<AutocommitDmlMode> {
        Ok(self.inner.lock_config()?.autocommit_dml_mode)
    }

    pub fn set_autocommit_dml_mode(&self, mode: AutocommitDmlMode) -> Result<()> {
        self.inner.check_open()?;
        self.inner.lock_config()?.autocommit_dml_mode = mode;
        Ok(())
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        Ok(self.inner.lock_config()?.timeout)
    }

    /// RPC deadline passed through to the backend client on every call.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.check_open()?;
        self.inner.lock_config()?.timeout = timeout;
        Ok(())
    }

    pub fn staleness(&self) -> Result<Staleness> {
        Ok(self.inner.lock_config()?.staleness.clone())
    }

    pub fn set_staleness(&self, staleness: Staleness) -> Result<()> {
        self.inner.check_open()?;
        self.inner.lock_config()?.staleness = staleness;
        Ok(())
    }

    /// Timestamp of the last snapshot read on this connection.
    pub fn read_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.inner
            .read_timestamp
            .lock()
            .map(|g| *g)
            .map_err(|e| Error::Operational(format!("timestamp lock poisoned: {e}")))
    }

    /// Commit timestamp of the last mutation on this connection.
    pub fn commit_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.inner
            .commit_timestamp
            .lock()
            .map(|g| *g)
            .map_err(|e| Error::Operational(format!("timestamp lock poisoned: {e}")))
    }

    /// Create a cursor on this connection.
    pub fn cursor(&self) -> Result<Cursor> {
        self.inner.check_open()?;
        Ok(Cursor::new(Arc::clone(&self.inner)))
    }

    /// Names of the tables in the database.
    ///
    /// INFORMATION_SCHEMA queries are rejected inside read-write
    /// transactions, so this goes through the snapshot read path like any
    /// other query.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.inner.check_open()?;
        let ExecuteOutcome::Results(mut rows) =
            execute::execute(&self.inner, LIST_TABLES_SQL, &Params::None)?
        else {
            return Err(Error::Operational(
                "table listing returned no result stream".into(),
            ));
        };
        let mut tables = Vec::new();
        while let Some(row) = rows.next_row()? {
            if let Some(Value::String(name)) = row.into_iter().next() {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    /// Column name → type and nullability for one table, from the
    /// INFORMATION_SCHEMA columns view.
    pub fn table_column_schema(&self, table: &str) -> Result<BTreeMap<String, ColumnSchema>> {
        self.inner.check_open()?;
        let args = Params::Positional(vec![Value::String(table.to_string())]);
        let ExecuteOutcome::Results(mut rows) =
            execute::execute(&self.inner, TABLE_COLUMNS_SQL, &args)?
        else {
            return Err(Error::Operational(
                "column listing returned no result stream".into(),
            ));
        };
        let mut schema = BTreeMap::new();
        while let Some(row) = rows.next_row()? {
            let mut columns = row.into_iter();
            let (
                Some(Value::String(name)),
                Some(Value::String(nullable)),
                Some(Value::String(sql_type)),
            ) = (columns.next(), columns.next(), columns.next())
            else {
                continue;
            };
            schema.insert(
                name,
                ColumnSchema {
                    sql_type,
                    null_ok: nullable.eq_ignore_ascii_case("YES"),
                },
            );
        }
        Ok(schema)
    }

    /// Close this connection. The connection and all of its cursors are
    /// unusable from this point forward. Nothing is flushed: no
    /// pending-transaction concept exists in autocommit mode.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!(conn_id = %self.inner.id, "connection closed");
        }
    }

    /// Always fails: the driver has no multi-statement transaction mode.
    pub fn commit(&self) -> Result<()> {
        self.inner.check_open()?;
        Err(Error::Warning(
            "the driver always works in autocommit mode; \
             multi-statement transactions are not supported"
                .into(),
        ))
    }

    /// Always fails: the driver has no multi-statement transaction mode.
    pub fn rollback(&self) -> Result<()> {
        self.inner.check_open()?;
        Err(Error::Warning(
            "the driver always works in autocommit mode; \
             multi-statement transactions are not supported"
                .into(),
        ))
    }
}

impl Drop for Connection {
    /// Scoped use: the connection auto-closes when it leaves scope.
    fn drop(&mut self) {
        self.close();
    }
}
