/// Global constants for the spanner-dbapi driver
///
/// This module holds static configuration shared across the codebase: the
/// blocking-facade runtime and the cursor defaults.
use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

/// Global Tokio runtime for the blocking facade over the async RPC client.
///
/// The driver presents a synchronous interface; every backend call is run to
/// completion on this runtime via `block_on`. Do not call driver methods from
/// inside another Tokio runtime - `block_on` would panic there.
///
/// IMPORTANT: This panics if Tokio runtime creation fails, which can only
/// happen in extremely rare circumstances (e.g., system has no available
/// threads). In normal operation, runtime creation succeeds on first use.
#[allow(clippy::expect_used)]
pub static TOKIO_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Runtime::new()
        .expect("Failed to initialize Tokio runtime - check system resources and thread limits")
});

/// Sentinel row count meaning "unknown/unset".
///
/// The backend does not report row counts for read-only queries, so the
/// cursor's `rowcount` stays at this value after any query and before the
/// first execute.
pub const UNSET_COUNT: i64 = -1;

/// Default fetch batch size for `fetchmany` when none is given.
pub const DEFAULT_ARRAY_SIZE: usize = 1;
