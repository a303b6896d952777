//! Capability surface over the embedded SQL engine.
//!
//! The engine is the bundled SQLite library consumed through
//! `libsqlite3-sys`. Everything the client layer needs is expressed here as a
//! small set of safe wrappers: open/close a handle, compile/step/finalize a
//! program, bind a typed value at a 1-based position, resolve a parameter
//! name, read column metadata and values, and report the last error text.
//! All `unsafe` in the crate lives in this module.

mod handle;
mod program;
mod transient;

pub(crate) use handle::EngineHandle;
pub(crate) use program::Program;
pub(crate) use transient::TransientBuffers;

/// Declared runtime storage class of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnType {
    Integer,
    Float,
    Text,
    Blob,
    Null,
    /// A storage class this layer does not recognize; decoded as NULL.
    Other,
}
