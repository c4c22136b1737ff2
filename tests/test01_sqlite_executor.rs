#![cfg(feature = "sqlite")]

use std::time::Duration;

use sql_mapper::prelude::*;
use tempfile::TempDir;

fn student_db() -> Result<(TempDir, CommandExecutor), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("school.db");
    let db = CommandExecutor::builder(path.to_string_lossy(), Dialect::Sqlite)
        .command_timeout(Duration::from_secs(5))
        .build()?;
    db.execute_batch(
        "CREATE TABLE Student (Name TEXT NOT NULL, Sex TEXT, Age INTEGER NOT NULL, Photo BLOB);
         INSERT INTO Student (Name, Sex, Age) VALUES ('Ann', 'F', 20);
         INSERT INTO Student (Name, Sex, Age) VALUES ('Bob', 'M', 22);
         INSERT INTO Student (Name, Sex, Age) VALUES ('Cid', NULL, 19);",
    )?;
    Ok((dir, db))
}

#[test]
fn non_query_reports_affected_rows() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let params = [
        db.make_input("@name", "Dee"),
        db.make_input("sex", "F"),
        db.make_input(":age", 21),
    ];
    let inserted = db.execute_non_query(
        "INSERT INTO Student (Name, Sex, Age) VALUES (:name, :sex, :age)",
        &params,
        CommandKind::Text,
    )?;
    assert_eq!(inserted, 1);

    let updated = db.execute_non_query(
        "UPDATE Student SET Age = Age + 1 WHERE Sex = @sex",
        &[db.make_input("sex", "F")],
        CommandKind::Text,
    )?;
    assert_eq!(updated, 2);
    Ok(())
}

#[test]
fn named_parameters_bind_by_name_not_order() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    // Declared in the opposite order of their appearance in the SQL.
    let params = [db.make_input("age", 22), db.make_input("name", "Bob")];
    let found = db.execute_scalar(
        "SELECT count(*) FROM Student WHERE Name = :name AND Age = :age",
        &params,
        CommandKind::Text,
    )?;
    assert_eq!(found, Some(RowValues::Int(1)));
    Ok(())
}

#[test]
fn positional_parameters_bind_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let params = [Parameter::positional(20), Parameter::positional("F")];
    let table = db.execute_table(
        "SELECT Name FROM Student WHERE Age >= ? AND Sex = ? ORDER BY Name",
        &params,
        CommandKind::Text,
    )?;
    assert_eq!(table.column_names(), ["Name"]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].get("name").and_then(RowValues::as_text), Some("Ann"));
    Ok(())
}

#[test]
fn table_keeps_column_and_row_order() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let table = db.execute_table(
        "SELECT Age, Name, Sex FROM Student ORDER BY Age DESC",
        &[],
        CommandKind::Text,
    )?;
    assert_eq!(table.column_names(), ["Age", "Name", "Sex"]);
    let names: Vec<&str> = table
        .iter()
        .filter_map(|row| row.get("Name").and_then(RowValues::as_text))
        .collect();
    assert_eq!(names, ["Bob", "Ann", "Cid"]);
    assert_eq!(table.rows()[2].get_by_index(2), Some(&RowValues::Null));

    let empty = db.execute_table(
        "SELECT Name FROM Student WHERE Age > 100",
        &[],
        CommandKind::Text,
    )?;
    assert!(empty.is_empty());
    assert_eq!(empty.column_names(), ["Name"]);
    Ok(())
}

#[test]
fn scalar_distinguishes_no_rows_from_null() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let count = db.execute_scalar("SELECT count(*) FROM Student", &[], CommandKind::Text)?;
    assert_eq!(count, Some(RowValues::Int(3)));

    let null = db.execute_scalar(
        "SELECT Sex FROM Student WHERE Name = 'Cid'",
        &[],
        CommandKind::Text,
    )?;
    assert_eq!(null, Some(RowValues::Null));

    let none = db.execute_scalar(
        "SELECT Sex FROM Student WHERE Name = 'Nobody'",
        &[],
        CommandKind::Text,
    )?;
    assert_eq!(none, None);
    Ok(())
}

#[test]
fn blobs_round_trip_through_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let photo = vec![0_u8, 159, 146, 150];
    db.execute_non_query(
        "UPDATE Student SET Photo = :photo WHERE Name = :name",
        &[db.make_input("photo", photo.clone()), db.make_input("name", "Ann")],
        CommandKind::Text,
    )?;
    let stored = db.execute_scalar(
        "SELECT Photo FROM Student WHERE Name = 'Ann'",
        &[],
        CommandKind::Text,
    )?;
    assert_eq!(stored, Some(RowValues::Blob(photo)));
    Ok(())
}

#[test]
fn reader_streams_rows_and_can_stop_early() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let mut cursor = db.execute_reader(
        "SELECT Name, Age FROM Student ORDER BY Name",
        &[],
        CommandKind::Text,
    )?;
    assert_eq!(cursor.columns().names(), ["Name", "Age"]);
    let first = cursor.next().transpose()?.expect("one row");
    assert_eq!(first.get("Name").and_then(RowValues::as_text), Some("Ann"));
    drop(cursor);

    // The dropped cursor released its connection; writes go through.
    let affected = db.execute_non_query("DELETE FROM Student", &[], CommandKind::Text)?;
    assert_eq!(affected, 3);

    let cursor = db.execute_reader("SELECT Name FROM Student", &[], CommandKind::Text)?;
    assert_eq!(cursor.count(), 0);
    Ok(())
}

#[test]
fn reader_yields_every_row_then_closes() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let cursor = db.execute_reader("SELECT Age FROM Student", &[], CommandKind::Text)?;
    let ages = cursor
        .map(|row| row.map(|r| r.get_by_index(0).and_then(RowValues::as_int).copied()))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(ages, [Some(20), Some(22), Some(19)]);

    let cursor = db.execute_reader("SELECT Age FROM Student", &[], CommandKind::Text)?;
    cursor.close()?;
    Ok(())
}

#[test]
fn reader_reports_bad_sql_up_front() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let err = db
        .execute_reader("SELECT * FROM NoSuchTable", &[], CommandKind::Text)
        .unwrap_err();
    assert!(matches!(
        err,
        SqlMapperError::Driver {
            dialect: Dialect::Sqlite,
            source: DriverError::Sqlite(_)
        }
    ));
    Ok(())
}

#[test]
fn stored_procedures_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let err = db
        .execute_non_query("usp_add_student", &[], CommandKind::StoredProcedure)
        .unwrap_err();
    assert!(matches!(err.driver_error(), Some(DriverError::Unsupported(_))));

    let err = db
        .execute_table("drop table Student; --", &[], CommandKind::StoredProcedure)
        .unwrap_err();
    assert!(matches!(err.driver_error(), Some(DriverError::InvalidCommand(_))));
    Ok(())
}

#[test]
fn failed_statement_leaves_database_usable() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let err = db
        .execute_non_query(
            "INSERT INTO Student (Name, Age) VALUES (NULL, 1)",
            &[],
            CommandKind::Text,
        )
        .unwrap_err();
    assert!(err.driver_error().is_some());

    let count = db.execute_scalar("SELECT count(*) FROM Student", &[], CommandKind::Text)?;
    assert_eq!(count, Some(RowValues::Int(3)));
    Ok(())
}

#[test]
fn executor_is_shared_across_threads() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = &db;
                scope.spawn(move || {
                    db.execute_scalar("SELECT max(Age) FROM Student", &[], CommandKind::Text)
                })
            })
            .collect();
        for handle in handles {
            let value = handle.join().expect("thread").expect("query");
            assert_eq!(value, Some(RowValues::Int(22)));
        }
    });
    Ok(())
}

#[test]
fn scalar_still_runs_statements_without_result_columns() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = student_db()?;

    let value = db.execute_scalar(
        "INSERT INTO Student (Name, Sex, Age) VALUES (:name, NULL, 30)",
        &[db.make_input("name", "Eve")],
        CommandKind::Text,
    )?;
    assert_eq!(value, None);

    let count = db.execute_scalar("SELECT count(*) FROM Student", &[], CommandKind::Text)?;
    assert_eq!(count, Some(RowValues::Int(4)));
    Ok(())
}

// More rows than the cursor buffers ahead of the consumer.
const MANY: i64 = 500;

fn numbers_db() -> Result<(TempDir, CommandExecutor), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = CommandExecutor::new(dir.path().join("numbers.db").to_string_lossy(), Dialect::Sqlite)?;
    db.execute_batch(&format!(
        "CREATE TABLE Numbers (n INTEGER NOT NULL);
         WITH RECURSIVE c(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM c WHERE i < {MANY})
         INSERT INTO Numbers (n) SELECT i FROM c;"
    ))?;
    Ok((dir, db))
}

#[test]
fn reader_drains_more_rows_than_it_buffers() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = numbers_db()?;

    let cursor = db.execute_reader("SELECT n FROM Numbers ORDER BY n", &[], CommandKind::Text)?;
    let numbers = cursor
        .map(|row| row.map(|r| r.get("n").and_then(RowValues::as_int).copied().unwrap_or(0)))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(numbers.len(), usize::try_from(MANY)?);
    assert_eq!(numbers.iter().sum::<i64>(), MANY * (MANY + 1) / 2);
    Ok(())
}

#[test]
fn stalled_reader_does_not_block_other_calls() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = numbers_db()?;

    let mut cursor = db.execute_reader("SELECT n FROM Numbers ORDER BY n", &[], CommandKind::Text)?;
    let first = cursor.next().transpose()?.expect("first row");
    assert_eq!(first.get("n"), Some(&RowValues::Int(1)));

    let other = db.clone();
    let count = std::thread::spawn(move || {
        other.execute_scalar("SELECT count(*) FROM Numbers", &[], CommandKind::Text)
    })
    .join()
    .expect("thread")?;
    assert_eq!(count, Some(RowValues::Int(MANY)));

    let max = db.execute_scalar("SELECT max(n) FROM Numbers", &[], CommandKind::Text)?;
    assert_eq!(max, Some(RowValues::Int(MANY)));
    drop(cursor);
    Ok(())
}

#[test]
fn reader_dropped_or_closed_mid_stream_releases_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = numbers_db()?;

    let mut cursor = db.execute_reader("SELECT n FROM Numbers", &[], CommandKind::Text)?;
    assert!(cursor.next().is_some());
    drop(cursor);
    let deleted = db.execute_non_query("DELETE FROM Numbers WHERE n > 400", &[], CommandKind::Text)?;
    assert_eq!(deleted, 100);

    let mut cursor = db.execute_reader("SELECT n FROM Numbers", &[], CommandKind::Text)?;
    for _ in 0..10 {
        cursor.next().transpose()?;
    }
    cursor.close()?;
    let deleted = db.execute_non_query("DELETE FROM Numbers", &[], CommandKind::Text)?;
    assert_eq!(deleted, 400);
    Ok(())
}
