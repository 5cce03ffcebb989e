//! Deterministic, pure logic shared by the packer core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod change_log;
pub mod classifier;
pub mod path;
pub mod require_scan;
pub mod types;
