use reconcile_core::db::migrations::latest_version;
use reconcile_core::db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "contacts");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reconcile.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute(
            "INSERT INTO contacts (email, link_precedence) VALUES ('a@x.com', 'primary');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_rows_breaking_record_rules() {
    let conn = open_db_in_memory().unwrap();

    let no_fields = conn.execute(
        "INSERT INTO contacts (link_precedence) VALUES ('primary');",
        [],
    );
    assert!(no_fields.is_err());

    let unlinked_secondary = conn.execute(
        "INSERT INTO contacts (email, link_precedence) VALUES ('a@x.com', 'secondary');",
        [],
    );
    assert!(unlinked_secondary.is_err());

    let bad_precedence = conn.execute(
        "INSERT INTO contacts (email, link_precedence) VALUES ('a@x.com', 'tertiary');",
        [],
    );
    assert!(bad_precedence.is_err());
}

#[test]
fn open_with_options_accepts_custom_busy_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeout.db");
    let options = DbOptions {
        busy_timeout: Duration::from_millis(50),
    };

    let conn = open_db_with_options(&path, &options).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
