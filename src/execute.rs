/// Execution routing.
///
/// Each `Cursor::execute` call runs through this module exactly once, with no
/// state carried across calls beyond the connection handle:
///
/// 1. classify the statement;
/// 2. DDL goes onto the connection's schema-update queue and the queue is
///    flushed, blocking until the asynchronous schema operation completes;
/// 3. every other class first flushes queued DDL, then runs in its own
///    context: read-only snapshot for queries, one bulk-write RPC for
///    homogeneous INSERTs, per-statement execution inside a retryable
///    transaction attempt for everything else;
/// 4. the three result shapes are normalized into one iterator/row-count
///    model for the cursor.
///
/// Backend error conditions are mapped into the DB-API taxonomy here and
/// nowhere else. Nothing is retried here beyond the retry-on-conflict loop
/// the wrapped transaction primitive already runs: the work callbacks below
/// are stateless closures over already translated statements, so re-invoking
/// them on a retry repeats only pure SQL and bulk-write calls.
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::client::{
    BackendError, CommitResult, ExecutionOutcome, MutationContext, Statement,
};
use crate::connection::ConnectionInner;
use crate::constants::{TOKIO_RUNTIME, UNSET_COUNT};
use crate::error::{Error, Result};
use crate::params::{self, Params};
use crate::statement::{classify, ensure_where_clause, parse_insert, InsertPlan, StatementKind};
use crate::utils::{drain, PeekIterator};
use crate::value::Row;

/// Normalized result of one routed statement.
pub(crate) enum ExecuteOutcome {
    /// Schema change applied; no rows, no count.
    Ddl,
    /// Mutation finished with an affected-row count (or the unset sentinel
    /// when the backend did not report one).
    RowCount(i64),
    /// Read-only result stream, already peeked so metadata is available.
    Results(PeekIterator),
}

/// Route one statement to its execution context.
pub(crate) fn execute(conn: &ConnectionInner, sql: &str, args: &Params) -> Result<ExecuteOutcome> {
    let kind = classify(sql);
    trace!(conn_id = %conn.id, ?kind, "classified statement");

    if kind == StatementKind::Ddl {
        enqueue_ddl(conn, sql)?;
        run_prior_ddl(conn)?;
        return Ok(ExecuteOutcome::Ddl);
    }

    // Queued DDL must land before unrelated statements observe the schema.
    run_prior_ddl(conn)?;

    match kind {
        StatementKind::NonUpdating => handle_query(conn, sql, args),
        StatementKind::Insert => handle_insert(conn, sql, args),
        _ => handle_update(conn, sql, args),
    }
}

/// Queue a DDL statement for the next flush. Statements in a schema-update
/// batch must not carry trailing semicolons.
fn enqueue_ddl(conn: &ConnectionInner, sql: &str) -> Result<()> {
    let statement = sql.trim().trim_end_matches(';').trim_end().to_string();
    conn.ddl_statements
        .lock()
        .map_err(|e| Error::Operational(format!("ddl queue lock poisoned: {e}")))?
        .push(statement);
    Ok(())
}

/// Flush all queued DDL through the schema-update primitive, blocking until
/// the asynchronous operation completes. No-op when nothing is queued.
fn run_prior_ddl(conn: &ConnectionInner) -> Result<()> {
    let pending: Vec<String> = {
        let mut queue = conn
            .ddl_statements
            .lock()
            .map_err(|e| Error::Operational(format!("ddl queue lock poisoned: {e}")))?;
        std::mem::take(&mut *queue)
    };
    if pending.is_empty() {
        return Ok(());
    }

    let timeout = conn.lock_config()?.timeout;
    debug!(conn_id = %conn.id, statements = pending.len(), "flushing schema updates");
    TOKIO_RUNTIME
        .block_on(conn.client.update_ddl(pending, timeout))
        .map_err(Error::from_backend)
}

/// Read-only query: translate, run in a single-call snapshot, wrap the
/// stream in a peek-ahead iterator so column metadata is available before
/// the first fetch.
fn handle_query(conn: &ConnectionInner, sql: &str, args: &Params) -> Result<ExecuteOutcome> {
    let options = conn.snapshot_options()?;
    let statement = params::build_statement(sql, args, options.timeout)?;
    trace!(conn_id = %conn.id, sql = statement.sql.as_str(), "snapshot read");

    let (outcome, read_ts) = TOKIO_RUNTIME
        .block_on(async {
            let mut snapshot = conn.client.snapshot(options).await?;
            let outcome = snapshot.execute_sql(statement).await?;
            Ok::<_, BackendError>((outcome, snapshot.read_timestamp()))
        })
        .map_err(Error::from_backend)?;

    if let Some(ts) = read_ts {
        store_timestamp(&conn.read_timestamp, ts)?;
    }

    match outcome {
        ExecutionOutcome::RowCount(n) => Ok(ExecuteOutcome::RowCount(n)),
        // The backend does not report row counts for queries; the cursor
        // keeps the unset sentinel and pulls rows from the iterator.
        ExecutionOutcome::Stream(stream) => {
            Ok(ExecuteOutcome::Results(PeekIterator::new(stream)?))
        }
    }
}

/// INSERT: bulk-write call for a homogeneous decomposition, per-row
/// statement execution otherwise.
fn handle_insert(conn: &ConnectionInner, sql: &str, args: &Params) -> Result<ExecuteOutcome> {
    match parse_insert(sql, args)? {
        InsertPlan::Homogeneous {
            table,
            columns,
            rows,
        } => handle_insert_homogeneous(conn, &table, &columns, &rows),
        InsertPlan::Heterogeneous { statements } => {
            handle_insert_heterogeneous(conn, &statements)
        }
    }
}

/// The common bulk case: one value matrix, one RPC, one transaction attempt.
/// This trades SQL-statement flexibility for a single round trip.
fn handle_insert_homogeneous(
    conn: &ConnectionInner,
    table: &str,
    columns: &[String],
    rows: &[Row],
) -> Result<ExecuteOutcome> {
    debug!(conn_id = %conn.id, table, rows = rows.len(), "bulk insert");
    let mut work = transaction_work(|txn| {
        // Cloned per attempt: the callback may be re-invoked on conflict
        // retry and must not share state across attempts.
        let table = table.to_string();
        let columns = columns.to_vec();
        let rows = rows.to_vec();
        Box::pin(async move {
            let count = rows.len() as i64;
            txn.insert(&table, &columns, rows).await?;
            Ok(count)
        })
    });
    let commit = run_write(conn, &mut work)?;
    Ok(ExecuteOutcome::RowCount(commit.rows))
}

/// The fallback: each row's single-row INSERT executes inside one shared
/// transaction attempt.
fn handle_insert_heterogeneous(
    conn: &ConnectionInner,
    statements: &[(String, Params)],
) -> Result<ExecuteOutcome> {
    let timeout = conn.lock_config()?.timeout;
    let translated: Vec<Statement> = statements
        .iter()
        .map(|(sql, args)| params::build_statement(sql, args, timeout))
        .collect::<Result<_>>()?;
    debug!(conn_id = %conn.id, statements = translated.len(), "per-row insert");

    let mut work = transaction_work(|txn| {
        let statements = translated.clone();
        Box::pin(async move {
            for statement in statements {
                let mut stream = txn.execute_sql(statement).await?;
                // Contract with the wrapped client: the write is deferred
                // until the result stream is consumed. Dropping the stream
                // unread silently loses the mutation, so drain it fully
                // before the attempt completes.
                drain(stream.as_mut())?;
            }
            Ok(UNSET_COUNT)
        })
    });
    let commit = run_write(conn, &mut work)?;
    Ok(ExecuteOutcome::RowCount(commit.rows))
}

/// UPDATE / DELETE / other mutating statements: one transaction attempt,
/// affected-row count accumulated from the integer outcome.
fn handle_update(conn: &ConnectionInner, sql: &str, args: &Params) -> Result<ExecuteOutcome> {
    let timeout = conn.lock_config()?.timeout;
    let sql = ensure_where_clause(sql);
    let statement = params::build_statement(&sql, args, timeout)?;
    trace!(conn_id = %conn.id, sql = statement.sql.as_str(), "transactional update");

    let mut work = transaction_work(|txn| {
        let statement = statement.clone();
        Box::pin(async move { txn.execute_update(statement).await })
    });
    let commit = run_write(conn, &mut work)?;
    Ok(ExecuteOutcome::RowCount(commit.rows))
}

/// Run one transaction work callback through the client's retryable
/// transaction primitive and record the commit timestamp.
fn run_write<F>(conn: &ConnectionInner, work: &mut F) -> Result<CommitResult>
where
    F: for<'t> FnMut(
            &'t mut (dyn MutationContext + Send),
        ) -> BoxFuture<'t, std::result::Result<i64, BackendError>>
        + Send,
{
    let commit = TOKIO_RUNTIME
        .block_on(conn.client.run_in_transaction(work))
        .map_err(Error::from_backend)?;
    if let Some(ts) = commit.commit_timestamp {
        store_timestamp(&conn.commit_timestamp, ts)?;
    }
    Ok(commit)
}

/// Identity helper that pins the work closure to the higher-ranked signature
/// `run_in_transaction` expects; closure inference cannot reach it unaided.
fn transaction_work<F>(work: F) -> F
where
    F: for<'t> FnMut(
            &'t mut (dyn MutationContext + Send),
        ) -> BoxFuture<'t, std::result::Result<i64, BackendError>>
        + Send,
{
    work
}

fn store_timestamp(
    slot: &std::sync::Mutex<Option<DateTime<Utc>>>,
    ts: DateTime<Utc>,
) -> Result<()> {
    *slot
        .lock()
        .map_err(|e| Error::Operational(format!("timestamp lock poisoned: {e}")))? = Some(ts);
    Ok(())
}
