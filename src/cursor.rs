/// Database cursor: per-statement execution state and the pull-based fetch
/// protocol.
///
/// A cursor owns the result of its most recent `execute`: either a peeked
/// row iterator (read-only queries) or an affected-row count (mutations).
/// Fetch calls pull from the iterator; `rowcount` reports the count. Each
/// `execute` resets this state, and a failed execute leaves no result set
/// behind.
use std::fmt;
use std::sync::Arc;

use crate::connection::ConnectionInner;
use crate::constants::{DEFAULT_ARRAY_SIZE, UNSET_COUNT};
use crate::error::{Error, Result};
use crate::execute::{self, ExecuteOutcome};
use crate::params::Params;
use crate::utils::PeekIterator;
use crate::value::{Row, TypeCode};

/// One entry of `Cursor::description`: metadata for a single result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub type_code: TypeCode,
    /// Fixed display size of the column type; `None` for dynamically-sized
    /// types (STRING, BYTES).
    pub display_size: Option<usize>,
    /// Serialized size of the field descriptor as received from the backend.
    pub internal_size: Option<usize>,
    pub precision: Option<usize>,
    pub scale: Option<usize>,
    pub null_ok: bool,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column(name='{}', type_code={:?}", self.name, self.type_code)?;
        if let Some(size) = self.display_size {
            write!(f, ", display_size={size}")?;
        }
        if let Some(size) = self.internal_size {
            write!(f, ", internal_size={size}")?;
        }
        if let Some(p) = self.precision {
            write!(f, ", precision={p}")?;
        }
        if let Some(s) = self.scale {
            write!(f, ", scale={s}")?;
        }
        if self.null_ok {
            write!(f, ", null_ok=true")?;
        }
        write!(f, ")")
    }
}

/// Database cursor to manage the context of a fetch operation.
///
/// Created through `Connection::cursor()`. Every operation except `close`
/// fails with an interface error once the cursor or its parent connection is
/// closed.
pub struct Cursor {
    /// Taken on close, releasing the cursor's reference to the connection.
    /// `None` is the closed state.
    conn: Option<Arc<ConnectionInner>>,
    results: Option<PeekIterator>,
    row_count: i64,
    /// Default batch size for `fetchmany` when no size is given.
    pub arraysize: usize,
}

impl Cursor {
    pub(crate) fn new(conn: Arc<ConnectionInner>) -> Self {
        Cursor {
            conn: Some(conn),
            results: None,
            row_count: UNSET_COUNT,
            arraysize: DEFAULT_ARRAY_SIZE,
        }
    }

    /// True if this cursor or its parent connection is closed.
    pub fn is_closed(&self) -> bool {
        self.conn.as_ref().map_or(true, |conn| conn.is_closed())
    }

    /// Affected-row count of the last mutating statement, or -1 after any
    /// read-only query and before the first execute.
    pub fn rowcount(&self) -> i64 {
        self.row_count
    }

    /// Column metadata of the current result set.
    ///
    /// Available as soon as `execute` returns for a read-only query - the
    /// result stream is peeked immediately so the schema is known even if no
    /// row is ever fetched. `None` after mutations or before any execute.
    pub fn description(&self) -> Option<Vec<Column>> {
        let metadata = self.results.as_ref()?.metadata()?;
        Some(
            metadata
                .row_type
                .iter()
                .map(|field| Column {
                    name: field.name.clone(),
                    type_code: field.type_code,
                    display_size: field.type_code.display_size(),
                    internal_size: Some(field.encoded_len()),
                    precision: None,
                    scale: None,
                    null_ok: false,
                })
                .collect(),
        )
    }

    fn check_open(&self) -> Result<()> {
        match &self.conn {
            Some(conn) => conn.check_open(),
            None => Err(Error::closed_cursor()),
        }
    }

    /// Execute a SQL statement, routing it to the execution context its
    /// class requires.
    pub fn execute(&mut self, sql: &str, args: Params) -> Result<()> {
        let conn = self.conn.as_ref().ok_or_else(Error::closed_cursor)?;
        conn.check_open()?;

        // A failed execute must leave no stale result set behind.
        self.results = None;

        match execute::execute(conn, sql, &args)? {
            ExecuteOutcome::Ddl => {
                self.row_count = UNSET_COUNT;
            }
            ExecuteOutcome::RowCount(count) => {
                self.row_count = count;
            }
            ExecuteOutcome::Results(iter) => {
                self.results = Some(iter);
                self.row_count = UNSET_COUNT;
            }
        }
        Ok(())
    }

    /// Execute the same operation once per parameter set.
    pub fn executemany(&mut self, sql: &str, seq_of_params: Vec<Params>) -> Result<()> {
        self.check_open()?;
        for args in seq_of_params {
            self.execute(sql, args)?;
        }
        Ok(())
    }

    /// Next row of the current result set, or `None` at exhaustion.
    /// Exhaustion is not an error.
    pub fn fetchone(&mut self) -> Result<Option<Row>> {
        self.check_open()?;
        self.active_results()?.next_row()
    }

    /// Up to `size` rows (default `arraysize`); fewer at exhaustion, empty
    /// once fully exhausted.
    pub fn fetchmany(&mut self, size: Option<usize>) -> Result<Vec<Row>> {
        self.check_open()?;
        let size = size.unwrap_or(self.arraysize);
        let results = self.active_results()?;
        let mut rows = Vec::with_capacity(size);
        for _ in 0..size {
            match results.next_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// All remaining rows of the current result set.
    pub fn fetchall(&mut self) -> Result<Vec<Row>> {
        self.check_open()?;
        let results = self.active_results()?;
        let mut rows = Vec::new();
        while let Some(row) = results.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn active_results(&mut self) -> Result<&mut PeekIterator> {
        self.results
            .as_mut()
            .ok_or_else(|| Error::Programming("no results to return".into()))
    }

    /// Optional DB-API method; not implemented by this driver.
    pub fn setinputsizes(&self, _sizes: &[usize]) -> Result<()> {
        Err(Error::Programming("setinputsizes is not implemented".into()))
    }

    /// Optional DB-API method; not implemented by this driver.
    pub fn setoutputsize(&self, _size: usize, _column: Option<usize>) -> Result<()> {
        Err(Error::Programming("setoutputsize is not implemented".into()))
    }

    /// Close this cursor, releasing its reference to the connection.
    /// Permanent: every later operation except `close` fails with an
    /// interface error.
    pub fn close(&mut self) {
        self.conn = None;
        self.results = None;
    }
}

impl Drop for Cursor {
    /// Scoped use: the cursor auto-closes when it leaves scope.
    fn drop(&mut self) {
        self.close();
    }
}
