//! Synchronous, statement-oriented client for in-memory SQLite database
//! images.
//!
//! [`Database::open`] (or [`Database::open_from_bytes`]) opens an in-process
//! database image; [`Database::prepare`] compiles SQL text into a reusable
//! [`Statement`] that is bound, stepped and decoded in a loop; and
//! [`Database::export`] hands the current image back as bytes. Everything
//! runs synchronously in a single address space — the SQL engine itself is
//! the bundled SQLite library, confined behind a small capability layer.
//!
//! ```
//! use sqlite_image::{Database, Params, Value};
//!
//! # fn main() -> Result<(), sqlite_image::DbError> {
//! let db = Database::open()?;
//! db.run("CREATE TABLE user (name TEXT, age INTEGER)", None)?
//!     .run(
//!         "INSERT INTO user VALUES (:name, :age)",
//!         Some(&Params::named([
//!             (":name", Value::Text("Ling".into())),
//!             (":age", Value::Integer(18)),
//!         ])),
//!     )?;
//!
//! let mut stmt = db.prepare("SELECT name FROM user WHERE age >= ?1", None)?;
//! stmt.bind(&Params::positional([Value::Integer(18)]))?;
//! while stmt.step()? {
//!     let row = stmt.get(None)?;
//!     assert_eq!(row[0], Value::Text("Ling".into()));
//! }
//! stmt.free()?;
//! db.close()?;
//! # Ok(())
//! # }
//! ```

mod database;
mod engine;
mod error;
mod results;
mod statement;
mod value;

pub use database::Database;
pub use error::DbError;
pub use results::{QueryResult, Row};
pub use statement::Statement;
pub use value::{Params, Value};
