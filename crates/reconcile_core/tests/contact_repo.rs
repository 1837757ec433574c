use reconcile_core::db::migrations::latest_version;
use reconcile_core::db::open_db_in_memory;
use reconcile_core::repo::contact_repo::soft_delete_contact;
use reconcile_core::{
    ContactId, ContactLink, ContactRepository, ContactValidationError, LinkPrecedence, NewContact,
    RepoError, SqliteContactRepository,
};
use rusqlite::Connection;

fn email(value: &str) -> Option<String> {
    Some(value.to_string())
}

#[test]
fn create_assigns_id_timestamps_and_primary_precedence() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let created = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();

    assert!(created.id.get() > 0);
    assert_eq!(created.email.as_deref(), Some("a@x.com"));
    assert_eq!(created.phone_number, None);
    assert_eq!(created.link_precedence, LinkPrecedence::Primary);
    assert_eq!(created.linked_id, None);
    assert!(created.created_at > 0);
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(created.deleted_at, None);

    let loaded = repo.get_contact(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn ids_are_monotonic() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let first = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();
    let second = repo
        .create_contact(&NewContact::primary(email("b@x.com"), None))
        .unwrap();
    assert!(second.id > first.id);
    assert!(second.created_at >= first.created_at);
}

#[test]
fn create_rejects_invalid_records() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let err = repo
        .create_contact(&NewContact::primary(None, None))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ContactValidationError::MissingContactFields)
    ));

    let mut unlinked = NewContact::primary(email("a@x.com"), None);
    unlinked.link_precedence = LinkPrecedence::Secondary;
    let err = repo.create_contact(&unlinked).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ContactValidationError::SecondaryWithoutLink)
    ));
}

#[test]
fn find_matches_either_field_and_orders_by_creation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let by_email = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();
    let unrelated = repo
        .create_contact(&NewContact::primary(email("z@x.com"), Some("000".to_string())))
        .unwrap();
    let by_phone = repo
        .create_contact(&NewContact::primary(None, Some("999".to_string())))
        .unwrap();

    let found = repo
        .find_by_email_or_phone(Some("a@x.com"), Some("999"))
        .unwrap();
    let ids: Vec<_> = found.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![by_email.id, by_phone.id]);
    assert!(!ids.contains(&unrelated.id));

    let phone_only = repo.find_by_email_or_phone(None, Some("999")).unwrap();
    assert_eq!(phone_only.len(), 1);

    assert!(repo.find_by_email_or_phone(None, None).unwrap().is_empty());
}

#[test]
fn absent_fragment_field_does_not_match_null_columns() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    repo.create_contact(&NewContact::primary(None, Some("555".to_string())))
        .unwrap();

    let found = repo.find_by_email_or_phone(Some("a@x.com"), None).unwrap();
    assert!(found.is_empty());
}

#[test]
fn soft_deleted_records_are_invisible() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let primary = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();
    let secondary = repo
        .create_contact(&NewContact::secondary(
            primary.id,
            None,
            Some("123".to_string()),
        ))
        .unwrap();

    soft_delete_contact(&conn, secondary.id).unwrap();

    assert!(repo.get_contact(secondary.id).unwrap().is_none());
    assert!(repo
        .find_by_email_or_phone(None, Some("123"))
        .unwrap()
        .is_empty());
    assert!(repo.list_secondaries(primary.id).unwrap().is_empty());

    let err = soft_delete_contact(&conn, ContactId(9_999)).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ContactId(9_999))));
}

#[test]
fn update_link_demotes_and_refreshes_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let older = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();
    let newer = repo
        .create_contact(&NewContact::primary(None, Some("999".to_string())))
        .unwrap();
    conn.execute("UPDATE contacts SET updated_at = 1;", [])
        .unwrap();

    repo.update_link(newer.id, ContactLink::secondary_of(older.id))
        .unwrap();

    let demoted = repo.get_contact(newer.id).unwrap().unwrap();
    assert_eq!(demoted.link_precedence, LinkPrecedence::Secondary);
    assert_eq!(demoted.linked_id, Some(older.id));
    assert_eq!(demoted.created_at, newer.created_at);
    assert!(demoted.updated_at > 1);
}

#[test]
fn update_link_rejects_missing_and_self_links() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let record = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();

    let err = repo
        .update_link(ContactId(42), ContactLink::secondary_of(record.id))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ContactId(42))));

    let err = repo
        .update_link(record.id, ContactLink::secondary_of(record.id))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ContactValidationError::SelfLink(_))
    ));
}

#[test]
fn load_cluster_returns_primary_then_secondaries_oldest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    let primary = repo
        .create_contact(&NewContact::primary(email("a@x.com"), None))
        .unwrap();
    let first = repo
        .create_contact(&NewContact::secondary(
            primary.id,
            None,
            Some("1".to_string()),
        ))
        .unwrap();
    let second = repo
        .create_contact(&NewContact::secondary(
            primary.id,
            None,
            Some("2".to_string()),
        ))
        .unwrap();

    let cluster = repo.load_cluster(primary.id).unwrap().unwrap();
    let ids: Vec<_> = cluster.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![primary.id, first.id, second.id]);

    assert!(repo.load_cluster(first.id).unwrap().is_none());
    assert!(repo.load_cluster(ContactId(777)).unwrap().is_none());
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteContactRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_contacts_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteContactRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("contacts"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT,
            phone_number TEXT,
            linked_id INTEGER,
            link_precedence TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteContactRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "contacts",
            column: "deleted_at"
        })
    ));
}

#[test]
fn invalid_persisted_rows_are_reported() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();

    // Bypass CHECK constraints to simulate a corrupted row.
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "INSERT INTO contacts (id, email, link_precedence) VALUES (50, 'a@x.com', 'secondary');",
        [],
    )
    .unwrap();

    let err = repo.get_contact(ContactId(50)).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
