//! Unit and property tests for the driver core.
//!
//! Organized into submodules matching the main library modules, plus an
//! in-memory backend double (`test_client`) used by the connection and
//! cursor tests.

mod connection_tests;
mod value_tests;
