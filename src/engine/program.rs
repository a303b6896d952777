use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;

use libsqlite3_sys as ffi;

use crate::error::DbError;

use super::ColumnType;
use super::handle::errmsg;
use super::transient::TransientBuffers;

/// One compiled program, addressed by its opaque statement handle.
///
/// Carries a non-owning copy of the connection pointer, used only to fetch
/// error text. A program never outlives its connection; the statement
/// registry finalizes every program before the handle closes.
pub(crate) struct Program {
    stmt: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
}

impl Program {
    pub(super) fn new(stmt: *mut ffi::sqlite3_stmt, db: *mut ffi::sqlite3) -> Self {
        Self { stmt, db }
    }

    /// Advance one row: `true` when a row is available, `false` when the
    /// program is exhausted. Any other engine status is an error.
    pub(crate) fn step(&self) -> Result<bool, DbError> {
        match unsafe { ffi::sqlite3_step(self.stmt) } {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            _ => Err(DbError::Engine(self.last_error())),
        }
    }

    /// Rewind the program to its start. After a failed step this reports
    /// that step's error.
    pub(crate) fn reset(&self) -> Result<(), DbError> {
        let rc = unsafe { ffi::sqlite3_reset(self.stmt) };
        self.check(rc)
    }

    pub(crate) fn clear_bindings(&self) -> Result<(), DbError> {
        let rc = unsafe { ffi::sqlite3_clear_bindings(self.stmt) };
        self.check(rc)
    }

    /// Finalize the program with the engine.
    pub(crate) fn finalize(mut self) -> Result<(), DbError> {
        let stmt = self.stmt;
        self.stmt = ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_finalize(stmt) };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(DbError::Engine(unsafe { errmsg(self.db) }))
        }
    }

    pub(crate) fn bind_integer(&self, pos: usize, value: i64) -> Result<(), DbError> {
        let idx = pos_c(pos)?;
        let rc = unsafe { ffi::sqlite3_bind_int64(self.stmt, idx, value) };
        self.check(rc)
    }

    pub(crate) fn bind_float(&self, pos: usize, value: f64) -> Result<(), DbError> {
        let idx = pos_c(pos)?;
        let rc = unsafe { ffi::sqlite3_bind_double(self.stmt, idx, value) };
        self.check(rc)
    }

    pub(crate) fn bind_null(&self, pos: usize) -> Result<(), DbError> {
        let idx = pos_c(pos)?;
        let rc = unsafe { ffi::sqlite3_bind_null(self.stmt, idx) };
        self.check(rc)
    }

    /// Bind encoded text at `pos`. The bytes are parked in `arena` and handed
    /// to the engine with a static destructor, so they must stay tracked
    /// until the bindings are cleared or the program is finalized.
    pub(crate) fn bind_text(
        &self,
        pos: usize,
        text: &str,
        arena: &mut TransientBuffers,
    ) -> Result<(), DbError> {
        let idx = pos_c(pos)?;
        let len = c_int::try_from(text.len())
            .map_err(|_| DbError::Usage("text parameter too large".into()))?;
        let (data, _) = arena.hold(text.as_bytes().to_vec());
        let rc =
            unsafe { ffi::sqlite3_bind_text(self.stmt, idx, data.cast::<c_char>(), len, None) };
        self.check(rc)
    }

    /// Bind a byte sequence at `pos`, copied into `arena` like text.
    pub(crate) fn bind_blob(
        &self,
        pos: usize,
        bytes: &[u8],
        arena: &mut TransientBuffers,
    ) -> Result<(), DbError> {
        let idx = pos_c(pos)?;
        let len = c_int::try_from(bytes.len())
            .map_err(|_| DbError::Usage("blob parameter too large".into()))?;
        let (data, _) = arena.hold(bytes.to_vec());
        let rc =
            unsafe { ffi::sqlite3_bind_blob(self.stmt, idx, data.cast::<c_void>(), len, None) };
        self.check(rc)
    }

    /// Resolve a parameter name (sigil included) to its 1-based position;
    /// zero means the program has no such parameter.
    pub(crate) fn parameter_index(&self, name: &str) -> Result<usize, DbError> {
        let c_name = CString::new(name)
            .map_err(|_| DbError::Usage("parameter name contains a NUL byte".into()))?;
        let idx = unsafe { ffi::sqlite3_bind_parameter_index(self.stmt, c_name.as_ptr()) };
        Ok(usize::try_from(idx).unwrap_or(0))
    }

    /// Number of columns the compiled program declares.
    pub(crate) fn column_count(&self) -> usize {
        usize::try_from(unsafe { ffi::sqlite3_column_count(self.stmt) }).unwrap_or(0)
    }

    /// Number of columns in the current row; zero when no row is available.
    pub(crate) fn data_count(&self) -> usize {
        usize::try_from(unsafe { ffi::sqlite3_data_count(self.stmt) }).unwrap_or(0)
    }

    pub(crate) fn column_type(&self, col: usize) -> ColumnType {
        match unsafe { ffi::sqlite3_column_type(self.stmt, col as c_int) } {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Float,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            ffi::SQLITE_NULL => ColumnType::Null,
            _ => ColumnType::Other,
        }
    }

    pub(crate) fn column_integer(&self, col: usize) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.stmt, col as c_int) }
    }

    pub(crate) fn column_float(&self, col: usize) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.stmt, col as c_int) }
    }

    /// Copy the current row's text at `col` out of engine-owned memory.
    pub(crate) fn column_text(&self, col: usize) -> String {
        let idx = col as c_int;
        unsafe {
            let data = ffi::sqlite3_column_text(self.stmt, idx);
            if data.is_null() {
                return String::new();
            }
            let len = usize::try_from(ffi::sqlite3_column_bytes(self.stmt, idx)).unwrap_or(0);
            let bytes = std::slice::from_raw_parts(data, len);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }

    /// Copy the current row's blob at `col` into caller-owned memory.
    pub(crate) fn column_blob(&self, col: usize) -> Vec<u8> {
        let idx = col as c_int;
        unsafe {
            let data = ffi::sqlite3_column_blob(self.stmt, idx);
            let len = usize::try_from(ffi::sqlite3_column_bytes(self.stmt, idx)).unwrap_or(0);
            if data.is_null() || len == 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(data.cast::<u8>(), len).to_vec()
        }
    }

    pub(crate) fn column_name(&self, col: usize) -> String {
        let name = unsafe { ffi::sqlite3_column_name(self.stmt, col as c_int) };
        if name.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
        }
    }

    pub(crate) fn last_error(&self) -> String {
        unsafe { errmsg(self.db) }
    }

    fn check(&self, rc: c_int) -> Result<(), DbError> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(DbError::Engine(self.last_error()))
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        if !self.stmt.is_null() {
            unsafe {
                ffi::sqlite3_finalize(self.stmt);
            }
        }
    }
}

fn pos_c(pos: usize) -> Result<c_int, DbError> {
    c_int::try_from(pos)
        .map_err(|_| DbError::Usage(format!("parameter position {pos} out of range")))
}
