use sqlite_image::{Database, DbError, Params, Value};

#[test]
fn values_round_trip_through_bind_and_decode() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT ?1", None)?;

    // (bound, expected decode). Whole-number floats and booleans come back
    // as integers by design.
    let cases: Vec<(Value, Value)> = vec![
        (Value::Integer(42), Value::Integer(42)),
        (Value::Integer(i64::MIN), Value::Integer(i64::MIN)),
        (Value::Integer(i64::MAX), Value::Integer(i64::MAX)),
        (Value::Float(1.5), Value::Float(1.5)),
        (Value::Float(3.0), Value::Integer(3)),
        (Value::Float(-2.0), Value::Integer(-2)),
        // Past the engine's integer width, a whole number stays a float.
        (Value::Float(1.0e19), Value::Float(1.0e19)),
        (Value::Bool(true), Value::Integer(1)),
        (Value::Bool(false), Value::Integer(0)),
        (Value::Text("héllo, wörld".into()), Value::Text("héllo, wörld".into())),
        (Value::Text(String::new()), Value::Text(String::new())),
        (Value::Blob(vec![0, 1, 2, 255]), Value::Blob(vec![0, 1, 2, 255])),
        (Value::Null, Value::Null),
    ];

    for (bound, expected) in cases {
        let row = stmt.get(Some(&Params::Positional(vec![bound.clone()])))?;
        assert_eq!(row, vec![expected], "bound {bound:?}");
    }

    stmt.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn named_parameters_resolve_with_their_sigils() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT :a + @b + $c", None)?;
    let row = stmt.get(Some(&Params::named([
        (":a", Value::Integer(1)),
        ("@b", Value::Integer(2)),
        ("$c", Value::Integer(4)),
    ])))?;
    assert_eq!(row, vec![Value::Integer(7)]);
    stmt.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn explicit_numbered_parameters_bind_by_number() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT ?2, ?1", None)?;
    let row = stmt.get(Some(&Params::named([
        ("?1", Value::Text("first".into())),
        ("?2", Value::Text("second".into())),
    ])))?;
    assert_eq!(
        row,
        vec![Value::Text("second".into()), Value::Text("first".into())]
    );
    stmt.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn unrecognized_parameter_names_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT $present", None)?;
    // No parameter named $absent exists; binding it is not an error and the
    // unmatched slot stays NULL.
    stmt.bind(&Params::named([("$absent", Value::Integer(9))]))?;
    assert!(stmt.step()?);
    assert_eq!(stmt.get(None)?, vec![Value::Null]);
    stmt.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn get_object_maps_names_with_later_duplicate_winning() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT 1 AS x, 2 AS x, 'n' AS name", None)?;
    assert!(stmt.step()?);
    let row = stmt.get_object(None)?;
    assert_eq!(row.columns.as_ref(), &vec!["x".to_string(), "x".to_string(), "name".to_string()]);
    assert_eq!(row.get("x"), Some(&Value::Integer(2)));
    assert_eq!(row.get("name"), Some(&Value::Text("n".into())));
    assert_eq!(row.get_by_index(0), Some(&Value::Integer(1)));
    stmt.free()?;
    db.close()?;
    Ok(())
}

#[test]
fn column_names_match_declared_count_before_stepping() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stmt = db.prepare("SELECT 5 AS nbr, x'616200' AS data, NULL AS vacant", None)?;
    assert_eq!(stmt.column_names()?, vec!["nbr", "data", "vacant"]);
    db.close()?;
    Ok(())
}

#[test]
fn bind_requires_an_open_statement() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stmt = db.prepare("SELECT ?1", None)?;
    stmt.free()?;
    match stmt.bind(&Params::Positional(vec![Value::Integer(1)])) {
        Err(DbError::Usage(msg)) => assert_eq!(msg, "statement closed"),
        other => panic!("expected usage error, got {other:?}"),
    }
    db.close()?;
    Ok(())
}
