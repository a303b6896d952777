use std::ffi::{CStr, CString, c_char, c_int, c_uint};
use std::ptr;

use libsqlite3_sys as ffi;

use crate::error::DbError;

use super::program::Program;

const MAIN_SCHEMA: &CStr = c"main";

/// Read the engine's current error message for a connection.
///
/// # Safety
///
/// `db` must point to an open connection.
pub(super) unsafe fn errmsg(db: *mut ffi::sqlite3) -> String {
    let msg = unsafe { ffi::sqlite3_errmsg(db) };
    if msg.is_null() {
        "unknown engine error".to_owned()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

/// Owned connection to one open in-memory database image.
///
/// Exclusively owned by one `Database`. Every compiled program carries a
/// non-owning copy of the connection pointer for error reporting, so all
/// programs must be finalized before the handle closes; the statement
/// registry enforces that ordering.
pub(crate) struct EngineHandle {
    db: *mut ffi::sqlite3,
}

impl EngineHandle {
    /// Open a fresh, empty in-memory database.
    pub(crate) fn open_in_memory() -> Result<Self, DbError> {
        let mut db = ptr::null_mut();
        let flags = (ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE) as c_int;
        let rc =
            unsafe { ffi::sqlite3_open_v2(c":memory:".as_ptr(), &mut db, flags, ptr::null()) };
        if rc != ffi::SQLITE_OK {
            // Even on failure a handle may have been allocated; it carries
            // the message and must still be closed.
            let msg = if db.is_null() {
                "failed to allocate database handle".to_owned()
            } else {
                let msg = unsafe { errmsg(db) };
                unsafe {
                    ffi::sqlite3_close(db);
                }
                msg
            };
            return Err(DbError::Engine(msg));
        }
        Ok(Self { db })
    }

    /// Seed this handle's main schema from a serialized database image.
    pub(crate) fn load_image(&self, image: &[u8]) -> Result<(), DbError> {
        if image.is_empty() {
            return Ok(());
        }
        let size = i64::try_from(image.len())
            .map_err(|_| DbError::Usage("database image too large".into()))?;
        let buf = unsafe { ffi::sqlite3_malloc64(image.len() as u64) };
        if buf.is_null() {
            return Err(DbError::Engine(
                "out of memory copying database image".into(),
            ));
        }
        let flags =
            (ffi::SQLITE_DESERIALIZE_FREEONCLOSE | ffi::SQLITE_DESERIALIZE_RESIZEABLE) as c_uint;
        let rc = unsafe {
            ptr::copy_nonoverlapping(image.as_ptr(), buf.cast::<u8>(), image.len());
            // FREEONCLOSE transfers buffer ownership to the engine, on the
            // failure path included.
            ffi::sqlite3_deserialize(self.db, MAIN_SCHEMA.as_ptr(), buf.cast::<u8>(), size, size, flags)
        };
        self.check(rc)
    }

    /// Serialize the current contents of the main schema into caller-owned
    /// bytes.
    pub(crate) fn serialize(&self) -> Result<Vec<u8>, DbError> {
        let mut size: ffi::sqlite3_int64 = 0;
        let data = unsafe { ffi::sqlite3_serialize(self.db, MAIN_SCHEMA.as_ptr(), &mut size, 0) };
        if data.is_null() {
            // A pristine handle that never allocated a page serializes to
            // nothing.
            return if size == 0 {
                Ok(Vec::new())
            } else {
                Err(DbError::Engine(self.last_error()))
            };
        }
        let result = match usize::try_from(size) {
            Ok(0) => Ok(Vec::new()),
            Ok(len) => Ok(unsafe { std::slice::from_raw_parts(data.cast_const(), len) }.to_vec()),
            Err(_) => Err(DbError::Engine("engine reported an invalid image size".into())),
        };
        unsafe {
            ffi::sqlite3_free(data.cast());
        }
        result
    }

    /// Compile the first statement in `sql`.
    ///
    /// Returns `Ok(None)` when the text contains nothing compilable (pure
    /// whitespace or comment); a real compile failure is `DbError::Compile`.
    pub(crate) fn compile(&self, sql: &str) -> Result<Option<Program>, DbError> {
        let n_byte =
            c_int::try_from(sql.len()).map_err(|_| DbError::Usage("SQL text too large".into()))?;
        let mut stmt = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.db,
                sql.as_ptr().cast::<c_char>(),
                n_byte,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            return Err(DbError::Compile(self.last_error()));
        }
        if stmt.is_null() {
            return Ok(None);
        }
        Ok(Some(Program::new(stmt, self.db)))
    }

    /// Run a script through the engine's own multi-statement executor,
    /// discarding any rows it produces.
    pub(crate) fn exec_batch(&self, sql: &str) -> Result<(), DbError> {
        let c_sql = CString::new(sql)
            .map_err(|_| DbError::Usage("SQL text contains a NUL byte".into()))?;
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), ptr::null_mut())
        };
        self.check(rc)
    }

    /// Rows changed by the most recently completed statement.
    pub(crate) fn changes(&self) -> usize {
        usize::try_from(unsafe { ffi::sqlite3_changes(self.db) }).unwrap_or(0)
    }

    /// Rowid of the most recent successful insert on this connection.
    pub(crate) fn last_insert_rowid(&self) -> i64 {
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    pub(crate) fn last_error(&self) -> String {
        unsafe { errmsg(self.db) }
    }

    /// Close the handle, surfacing the engine's status.
    pub(crate) fn close(mut self) -> Result<(), DbError> {
        let db = self.db;
        self.db = ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_close(db) };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            let msg = unsafe { errmsg(db) };
            // The statement registry finalizes every program before this
            // runs, so a busy handle here is a bug; retry once and report.
            unsafe {
                ffi::sqlite3_close(db);
            }
            Err(DbError::Engine(msg))
        }
    }

    fn check(&self, rc: c_int) -> Result<(), DbError> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(DbError::Engine(self.last_error()))
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if !self.db.is_null() {
            unsafe {
                ffi::sqlite3_close(self.db);
            }
        }
    }
}
