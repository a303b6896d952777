use std::fmt;
use std::rc::Weak;
use std::sync::Arc;

use crate::database::{DatabaseInner, ProgramSlot, StatementId};
use crate::engine::ColumnType;
use crate::error::DbError;
use crate::results::Row;
use crate::value::{Params, Value};

/// A reusable compiled program.
///
/// Created by [`Database::prepare`](crate::Database::prepare) and owned by
/// that database: this handle carries only a weak back-reference plus the
/// program's registry id. Drive it with [`bind`](Statement::bind) →
/// [`step`](Statement::step) → [`get`](Statement::get) in a loop, and
/// release it with [`free`](Statement::free).
///
/// Once freed — or once the owning database closes — every operation fails
/// with the usage error `"statement closed"`.
pub struct Statement {
    db: Weak<DatabaseInner>,
    id: StatementId,
}

impl Statement {
    pub(crate) fn new(db: Weak<DatabaseInner>, id: StatementId) -> Self {
        Self { db, id }
    }

    fn with_slot<T>(
        &self,
        f: impl FnOnce(&mut ProgramSlot) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let inner = self.db.upgrade().ok_or_else(DbError::statement_closed)?;
        inner.with_slot(self.id, f)
    }

    /// Bind values to the program's parameters, after an implicit
    /// [`reset`](Statement::reset) that clears prior bindings and releases
    /// their transient buffers.
    ///
    /// Positional values bind 1-based in order. Named values resolve through
    /// the engine with the sigil as part of the name (`?NNN`, `:VVV`,
    /// `@VVV`, `$VVV`); names the program does not contain are silently
    /// ignored and the slot stays NULL.
    pub fn bind(&mut self, params: &Params) -> Result<(), DbError> {
        self.reset()?;
        self.with_slot(|slot| match params {
            Params::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    bind_value(slot, i + 1, value)?;
                }
                Ok(())
            }
            Params::Named(pairs) => {
                for (name, value) in pairs {
                    let pos = slot.program.parameter_index(name)?;
                    if pos != 0 {
                        bind_value(slot, pos, value)?;
                    }
                }
                Ok(())
            }
        })
    }

    /// Advance one row: `true` when a row is available for
    /// [`get`](Statement::get), `false` when the program is exhausted.
    pub fn step(&mut self) -> Result<bool, DbError> {
        self.with_slot(|slot| slot.program.step())
    }

    /// Decode the full current row.
    ///
    /// When `params` is given, performs [`bind`](Statement::bind) and one
    /// [`step`](Statement::step) first as a convenience. Each column is
    /// decoded by its declared runtime storage type; text and blobs are
    /// copied out of engine-owned memory, and NULL or an unrecognized type
    /// decodes as [`Value::Null`].
    pub fn get(&mut self, params: Option<&Params>) -> Result<Vec<Value>, DbError> {
        if let Some(params) = params {
            self.bind(params)?;
            self.step()?;
        }
        self.with_slot(|slot| {
            let count = slot.program.data_count();
            let mut row = Vec::with_capacity(count);
            for col in 0..count {
                row.push(match slot.program.column_type(col) {
                    ColumnType::Integer => Value::Integer(slot.program.column_integer(col)),
                    ColumnType::Float => Value::Float(slot.program.column_float(col)),
                    ColumnType::Text => Value::Text(slot.program.column_text(col)),
                    ColumnType::Blob => Value::Blob(slot.program.column_blob(col)),
                    ColumnType::Null | ColumnType::Other => Value::Null,
                });
            }
            Ok(row)
        })
    }

    /// Ordered column names; length equals the compiled program's declared
    /// column count and is stable for the statement's lifetime.
    pub fn column_names(&self) -> Result<Vec<String>, DbError> {
        self.with_slot(|slot| {
            let count = slot.program.column_count();
            Ok((0..count).map(|col| slot.program.column_name(col)).collect())
        })
    }

    /// [`get`](Statement::get) zipped with
    /// [`column_names`](Statement::column_names). When two columns share a
    /// name, lookup on the returned [`Row`] yields the later one's value.
    pub fn get_object(&mut self, params: Option<&Params>) -> Result<Row, DbError> {
        let values = self.get(params)?;
        let columns = self.column_names()?;
        Ok(Row::new(Arc::new(columns), values))
    }

    /// Shorthand for bind + step + reset: execute the program for its side
    /// effects, ignoring any row it returns. The trailing reset runs even
    /// when the step fails, so no transient allocation outlives the call.
    pub fn run(&mut self, params: Option<&Params>) -> Result<(), DbError> {
        if let Some(params) = params {
            self.bind(params)?;
        }
        let stepped = self.step();
        let reset = self.reset();
        stepped?;
        reset
    }

    /// Rewind the program and clear all bindings, releasing every transient
    /// buffer. Buffers are released even when the engine reports an error.
    pub fn reset(&mut self) -> Result<(), DbError> {
        self.with_slot(|slot| {
            let rewound = slot.program.reset();
            let cleared = slot.program.clear_bindings();
            slot.transient.release_all();
            rewound?;
            cleared
        })
    }

    /// Finalize the program and remove it from the owning database.
    ///
    /// A second `free` — like any other call after this one — fails with the
    /// usage error `"statement closed"`.
    pub fn free(&mut self) -> Result<(), DbError> {
        let inner = self.db.upgrade().ok_or_else(DbError::statement_closed)?;
        let slot = inner
            .remove_slot(self.id)
            .ok_or_else(DbError::statement_closed)?;
        slot.finalize()
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let closed = match self.db.upgrade() {
            Some(inner) => inner.with_slot(self.id, |_| Ok(())).is_err(),
            None => true,
        };
        f.debug_struct("Statement")
            .field("id", &self.id)
            .field("closed", &closed)
            .finish()
    }
}

fn bind_value(slot: &mut ProgramSlot, pos: usize, value: &Value) -> Result<(), DbError> {
    match value {
        Value::Integer(i) => slot.program.bind_integer(pos, *i),
        // A whole number that fits the engine's integer width binds as an
        // exact integer, otherwise as floating-point.
        Value::Float(f) => match Value::as_exact_integer(*f) {
            Some(i) => slot.program.bind_integer(pos, i),
            None => slot.program.bind_float(pos, *f),
        },
        Value::Bool(b) => slot.program.bind_integer(pos, i64::from(*b)),
        Value::Text(text) => slot.program.bind_text(pos, text, &mut slot.transient),
        Value::Blob(bytes) => slot.program.bind_blob(pos, bytes, &mut slot.transient),
        Value::Null => slot.program.bind_null(pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn transient_count(stmt: &Statement) -> usize {
        let inner = stmt.db.upgrade().expect("database alive");
        inner
            .with_slot(stmt.id, |slot| Ok(slot.transient.outstanding()))
            .expect("slot alive")
    }

    #[test]
    fn bind_tracks_buffers_and_reset_releases_them() {
        let db = Database::open().unwrap();
        let mut stmt = db.prepare("SELECT ?1, ?2, ?3", None).unwrap();

        stmt.bind(&Params::Positional(vec![
            Value::Text("alpha".into()),
            Value::Blob(vec![1, 2, 3]),
            Value::Integer(9),
        ]))
        .unwrap();
        // Only the text and the blob need caller-owned buffers.
        assert_eq!(transient_count(&stmt), 2);

        assert!(stmt.step().unwrap());
        assert_eq!(
            stmt.get(None).unwrap(),
            vec![
                Value::Text("alpha".into()),
                Value::Blob(vec![1, 2, 3]),
                Value::Integer(9),
            ]
        );

        stmt.reset().unwrap();
        assert_eq!(transient_count(&stmt), 0);
        stmt.free().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn rebinding_replaces_previous_buffers() {
        let db = Database::open().unwrap();
        let mut stmt = db.prepare("SELECT ?1", None).unwrap();
        for text in ["one", "two", "three"] {
            stmt.bind(&Params::Positional(vec![Value::Text(text.into())]))
                .unwrap();
            // The implicit reset released the previous cycle's buffer.
            assert_eq!(transient_count(&stmt), 1);
            assert!(stmt.step().unwrap());
            assert_eq!(stmt.get(None).unwrap(), vec![Value::Text(text.into())]);
        }
        stmt.free().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn run_leaves_no_outstanding_allocations() {
        let db = Database::open().unwrap();
        db.run("CREATE TABLE notes (body TEXT)", None).unwrap();
        let mut stmt = db.prepare("INSERT INTO notes VALUES (?1)", None).unwrap();
        stmt.run(Some(&Params::Positional(vec![Value::Text(
            "remember".into(),
        )])))
        .unwrap();
        assert_eq!(transient_count(&stmt), 0);
        stmt.free().unwrap();
        db.close().unwrap();
    }
}
