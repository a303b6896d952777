use thiserror::Error;

/// Errors surfaced by the database and statement layer.
///
/// Three kinds cover the whole surface: a non-success status from the engine,
/// SQL text the engine cannot compile, and misuse of the API itself (operating
/// on a closed resource, preparing empty text, and so on).
#[derive(Debug, Error)]
pub enum DbError {
    /// The engine returned a non-success status. Carries the engine's own
    /// error message text.
    #[error("engine error: {0}")]
    Engine(String),

    /// A statement the engine cannot compile.
    #[error("compile error: {0}")]
    Compile(String),

    /// Caller error: closed resource, nothing to prepare, malformed input.
    #[error("{0}")]
    Usage(String),
}

impl DbError {
    pub(crate) fn statement_closed() -> Self {
        DbError::Usage("statement closed".into())
    }

    pub(crate) fn database_closed() -> Self {
        DbError::Usage("database closed".into())
    }

    pub(crate) fn nothing_to_prepare() -> Self {
        DbError::Usage("nothing to prepare".into())
    }
}
