use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::engine::{EngineHandle, Program, TransientBuffers};
use crate::error::DbError;
use crate::results::{QueryResult, Row};
use crate::statement::Statement;
use crate::value::Params;

pub(crate) type StatementId = u64;

/// A compiled program coupled with the transient buffers currently bound
/// into it. Keeping both in one registry slot ties buffer lifetime to
/// program lifetime: the program is always finalized before its buffers
/// drop.
pub(crate) struct ProgramSlot {
    pub(crate) program: Program,
    pub(crate) transient: TransientBuffers,
}

impl ProgramSlot {
    fn new(program: Program) -> Self {
        Self {
            program,
            transient: TransientBuffers::default(),
        }
    }

    pub(crate) fn finalize(self) -> Result<(), DbError> {
        let ProgramSlot { program, transient } = self;
        let result = program.finalize();
        drop(transient);
        result
    }
}

/// Shared interior of a [`Database`]: the engine handle plus the registry of
/// compiled programs it owns.
///
/// Statements hold a weak reference to this plus their registry id; once the
/// database is gone or a slot is removed, every statement operation resolves
/// to the closed-resource error. The registry is keyed by an assigned id, so
/// no raw engine handle ever doubles as a map key and there is no ownership
/// cycle.
pub(crate) struct DatabaseInner {
    // Declared before the engine: compiled programs must finalize before the
    // handle closes when the whole database is dropped.
    programs: RefCell<HashMap<StatementId, ProgramSlot>>,
    engine: RefCell<Option<EngineHandle>>,
    next_id: Cell<StatementId>,
}

impl DatabaseInner {
    pub(crate) fn with_engine<T>(
        &self,
        f: impl FnOnce(&EngineHandle) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let engine = self.engine.borrow();
        let engine = engine.as_ref().ok_or_else(DbError::database_closed)?;
        f(engine)
    }

    pub(crate) fn with_slot<T>(
        &self,
        id: StatementId,
        f: impl FnOnce(&mut ProgramSlot) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let mut programs = self.programs.borrow_mut();
        let slot = programs.get_mut(&id).ok_or_else(DbError::statement_closed)?;
        f(slot)
    }

    pub(crate) fn remove_slot(&self, id: StatementId) -> Option<ProgramSlot> {
        self.programs.borrow_mut().remove(&id)
    }
}

/// An open in-memory database image.
///
/// Owns the engine handle and every [`Statement`] compiled against it.
/// Single-threaded and synchronous by design: no operation suspends, row
/// callbacks run inline on the caller's stack, and independent workers each
/// need their own `Database`.
///
/// Closing (or dropping) a `Database` finalizes all of its statements;
/// statement handles that outlive it reject every operation.
pub struct Database {
    inner: Rc<DatabaseInner>,
}

impl Database {
    /// Open a fresh, empty database.
    pub fn open() -> Result<Self, DbError> {
        let engine = EngineHandle::open_in_memory()?;
        debug!("opened empty in-memory database");
        Ok(Self::from_engine(engine))
    }

    /// Open a database seeded from a serialized image, as produced by
    /// [`export`](Database::export).
    pub fn open_from_bytes(image: &[u8]) -> Result<Self, DbError> {
        let engine = EngineHandle::open_in_memory()?;
        engine.load_image(image)?;
        debug!(bytes = image.len(), "opened database from serialized image");
        Ok(Self::from_engine(engine))
    }

    fn from_engine(engine: EngineHandle) -> Self {
        Self {
            inner: Rc::new(DatabaseInner {
                programs: RefCell::new(HashMap::new()),
                engine: RefCell::new(Some(engine)),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Execute SQL, ignoring any rows it returns.
    ///
    /// With `params` the text must hold exactly one statement: it is
    /// compiled, bound, stepped once and finalized (finalization runs even
    /// when the step fails). Without `params` the text may hold several
    /// `;`-separated statements and is forwarded to the engine's own
    /// multi-statement executor.
    ///
    /// Returns `&Self` so calls can be chained.
    pub fn run(&self, sql: &str, params: Option<&Params>) -> Result<&Self, DbError> {
        match params {
            Some(params) => {
                let mut stmt = self.prepare(sql, Some(params))?;
                let stepped = stmt.step();
                let freed = stmt.free();
                stepped?;
                freed?;
            }
            None => self.inner.with_engine(|engine| engine.exec_batch(sql))?,
        }
        Ok(self)
    }

    /// Execute a multi-statement script and collect its results.
    ///
    /// The script is split textually on `;`; string literals and comments
    /// containing a semicolon are not understood, so split such scripts into
    /// separate calls. Fragments that compile to nothing (whitespace,
    /// comments) are skipped; any other compile failure aborts the whole
    /// call and discards results collected so far. A fragment contributes a
    /// [`QueryResult`] only if it produced at least one row, and its
    /// statement is finalized before the next fragment runs.
    pub fn exec(&self, sql: &str) -> Result<Vec<QueryResult>, DbError> {
        let mut results = Vec::new();
        for fragment in sql.split(';') {
            let Some(mut stmt) = self.compile(fragment)? else {
                continue;
            };
            let collected = collect_fragment(&mut stmt, &mut results);
            let freed = stmt.free();
            collected?;
            freed?;
        }
        trace!(results = results.len(), "executed script");
        Ok(results)
    }

    /// Execute a statement and invoke `on_row` synchronously for each result
    /// row, as an ordered name-to-value [`Row`] mapping.
    ///
    /// The statement is finalized after exhaustion. An error from `on_row`
    /// propagates immediately and leaves the statement registered until
    /// [`close`](Database::close) finalizes it.
    pub fn each<F>(&self, sql: &str, params: Option<&Params>, mut on_row: F) -> Result<(), DbError>
    where
        F: FnMut(Row) -> Result<(), DbError>,
    {
        let mut stmt = self.prepare(sql, params)?;
        while stmt.step()? {
            on_row(stmt.get_object(None)?)?;
        }
        stmt.free()
    }

    /// Like [`each`](Database::each), invoking `done` once after the
    /// statement has been finalized.
    pub fn each_with_done<F, D>(
        &self,
        sql: &str,
        params: Option<&Params>,
        on_row: F,
        done: D,
    ) -> Result<(), DbError>
    where
        F: FnMut(Row) -> Result<(), DbError>,
        D: FnOnce(),
    {
        self.each(sql, params, on_row)?;
        done();
        Ok(())
    }

    /// Compile the first statement in `sql` into a reusable [`Statement`]
    /// owned by this database, binding `params` immediately when given.
    ///
    /// Text with no compilable statement fails with the usage error
    /// `"nothing to prepare"`.
    pub fn prepare(&self, sql: &str, params: Option<&Params>) -> Result<Statement, DbError> {
        let mut stmt = self
            .compile(sql)?
            .ok_or_else(DbError::nothing_to_prepare)?;
        if let Some(params) = params {
            stmt.bind(params)?;
        }
        Ok(stmt)
    }

    fn compile(&self, sql: &str) -> Result<Option<Statement>, DbError> {
        let Some(program) = self.inner.with_engine(|engine| engine.compile(sql))? else {
            return Ok(None);
        };
        let id = self.inner.next_id.get() + 1;
        self.inner.next_id.set(id);
        self.inner
            .programs
            .borrow_mut()
            .insert(id, ProgramSlot::new(program));
        trace!(id, "compiled statement");
        Ok(Some(Statement::new(Rc::downgrade(&self.inner), id)))
    }

    /// Serialize the current contents of the database into bytes suitable
    /// for [`open_from_bytes`](Database::open_from_bytes).
    pub fn export(&self) -> Result<Vec<u8>, DbError> {
        self.inner.with_engine(EngineHandle::serialize)
    }

    /// Rows changed by the most recently completed statement.
    pub fn changes(&self) -> Result<usize, DbError> {
        self.inner.with_engine(|engine| Ok(engine.changes()))
    }

    /// Rowid of the most recent successful insert.
    pub fn last_insert_rowid(&self) -> Result<i64, DbError> {
        self.inner.with_engine(|engine| Ok(engine.last_insert_rowid()))
    }

    /// Close the database, finalizing every still-owned statement first.
    ///
    /// Every statement is attempted independently; the first failure is
    /// surfaced after the rest have run and the handle has closed. Taking
    /// `self` by value makes a second close unrepresentable. Dropping a
    /// `Database` without calling this performs the same teardown with
    /// errors ignored.
    pub fn close(self) -> Result<(), DbError> {
        let mut first_err: Option<DbError> = None;
        let slots: Vec<ProgramSlot> = {
            let mut programs = self.inner.programs.borrow_mut();
            programs.drain().map(|(_, slot)| slot).collect()
        };
        let finalized = slots.len();
        for slot in slots {
            if let Err(err) = slot.finalize() {
                first_err.get_or_insert(err);
            }
        }
        if let Some(engine) = self.inner.engine.borrow_mut().take() {
            if let Err(err) = engine.close() {
                first_err.get_or_insert(err);
            }
        }
        debug!(statements = finalized, "closed database");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("open_statements", &self.inner.programs.borrow().len())
            .finish()
    }
}

fn collect_fragment(stmt: &mut Statement, results: &mut Vec<QueryResult>) -> Result<(), DbError> {
    // The fragment's entry is created lazily on its first row, so zero-row
    // fragments contribute nothing.
    let mut current: Option<QueryResult> = None;
    while stmt.step()? {
        let row = stmt.get(None)?;
        match current.as_mut() {
            Some(result) => result.rows.push(row),
            None => {
                let mut result = QueryResult::new(stmt.column_names()?);
                result.rows.push(row);
                current = Some(result);
            }
        }
    }
    if let Some(result) = current {
        results.push(result);
    }
    Ok(())
}
