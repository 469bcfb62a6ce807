//! `spanner-dbapi`: DB-API style driver core for Cloud Spanner-shaped databases
//!
//! This is the root module for the `spanner-dbapi` driver library. It exposes a
//! synchronous connect → cursor → execute → fetch interface on top of a
//! distributed SQL backend that distinguishes DDL (asynchronous schema
//! operations), read-only queries (snapshot reads) and mutating statements
//! (retryable transaction attempts), each with its own RPC shape.
//!
//! The driver runs in autocommit mode only. Every `execute` call classifies
//! the statement, translates its placeholders into the backend's typed `@name`
//! parameter protocol and routes it to the matching execution context.
pub mod client;
pub mod connection;
pub mod constants;
pub mod cursor;
pub mod error;
mod execute;
pub mod params;
pub mod statement;
pub mod utils;
pub mod value;

// Re-export key types for callers of the driver
pub use client::{BackendError, DatabaseClient};
pub use connection::{
    connect, AutocommitDmlMode, ColumnSchema, Connection, Staleness, TransactionMode,
};
pub use cursor::{Column, Cursor};
pub use error::{Error, Result};
pub use params::Params;
pub use value::{TypeCode, Value};

#[cfg(test)]
mod tests;
