use sqlite_image::{Database, DbError, Params, Value};

fn assert_statement_closed(err: DbError) {
    match err {
        DbError::Usage(msg) => assert_eq!(msg, "statement closed"),
        other => panic!("expected usage error, got {other:?}"),
    }
}

#[test]
fn freed_statements_reject_every_operation() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT 1", None)?;
    stmt.free()?;

    assert_statement_closed(stmt.step().unwrap_err());
    assert_statement_closed(stmt.get(None).unwrap_err());
    assert_statement_closed(stmt.column_names().unwrap_err());
    assert_statement_closed(stmt.reset().unwrap_err());
    // A second free is a caller error, not a no-op.
    assert_statement_closed(stmt.free().unwrap_err());
    db.close()?;
    Ok(())
}

#[test]
fn close_finalizes_every_owned_statement() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    db.run("CREATE TABLE t (a INTEGER)", None)?;
    let mut s1 = db.prepare("SELECT a FROM t", None)?;
    let mut s2 = db.prepare("INSERT INTO t VALUES (?1)", None)?;
    let mut s3 = db.prepare("SELECT count(*) FROM t", None)?;
    db.close()?;

    assert_statement_closed(s1.step().unwrap_err());
    assert_statement_closed(s2.run(Some(&Params::positional([1i64]))).unwrap_err());
    assert_statement_closed(s3.get(None).unwrap_err());
    Ok(())
}

#[test]
fn run_chains_and_reports_changes() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    db.run("CREATE TABLE t (id INTEGER PRIMARY KEY, body TEXT)", None)?
        .run(
            "INSERT INTO t (body) VALUES (?1)",
            Some(&Params::positional(["one"])),
        )?;
    assert_eq!(db.changes()?, 1);
    assert_eq!(db.last_insert_rowid()?, 1);

    // Without params the text may hold several statements.
    db.run(
        "INSERT INTO t (body) VALUES ('two'); INSERT INTO t (body) VALUES ('three');",
        None,
    )?;
    let results = db.exec("SELECT count(*) FROM t;")?;
    assert_eq!(results[0].rows, vec![vec![Value::Integer(3)]]);
    db.close()?;
    Ok(())
}

#[test]
fn run_finalizes_even_when_the_step_fails() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    db.run("CREATE TABLE u (a INTEGER PRIMARY KEY)", None)?
        .run("INSERT INTO u VALUES (1)", None)?;

    match db.run("INSERT INTO u VALUES (?1)", Some(&Params::positional([1i64]))) {
        Err(DbError::Engine(msg)) => assert!(msg.to_lowercase().contains("unique"), "{msg}"),
        other => panic!("expected engine error, got {other:?}"),
    }
    // The failing statement was still finalized, so close has nothing left
    // to clean up and succeeds.
    db.close()?;
    Ok(())
}

#[test]
fn statements_are_reusable_across_bind_step_reset_cycles()
-> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    db.run("CREATE TABLE log (line TEXT)", None)?;
    let mut insert = db.prepare("INSERT INTO log VALUES (?1)", None)?;
    for i in 0..25 {
        insert.run(Some(&Params::positional([format!("line {i}")])))?;
    }
    insert.free()?;

    let mut count = db.prepare("SELECT count(*) FROM log", None)?;
    assert!(count.step()?);
    assert_eq!(count.get(None)?, vec![Value::Integer(25)]);

    // reset rewinds the program so it can be stepped again.
    count.reset()?;
    assert!(count.step()?);
    assert_eq!(count.get(None)?, vec![Value::Integer(25)]);
    count.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn prepare_binds_immediately_when_params_are_given() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare(
        "SELECT :left || :right",
        Some(&Params::named([(":left", "ab"), (":right", "cd")])),
    )?;
    assert!(stmt.step()?);
    assert_eq!(stmt.get(None)?, vec![Value::Text("abcd".into())]);
    stmt.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn get_before_any_step_decodes_an_empty_row() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT 1, 2", None)?;
    // No row is available yet; the declared column count is unaffected.
    assert!(stmt.get(None)?.is_empty());
    assert_eq!(stmt.column_names()?.len(), 2);
    stmt.free()?;
    db.close()?;
    Ok(())
}
