//! Contact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the record store used by identity resolution: equality lookups
//!   and single-record mutations over the `contacts` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Soft-deleted rows (`deleted_at IS NOT NULL`) are invisible to every read.
//! - Multi-row reads are ordered `created_at ASC, id ASC`.
//! - Write paths validate records before SQL mutations; read paths reject
//!   invalid persisted rows instead of masking them.
//! - No merge logic lives here.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::contact::{
    Cluster, Contact, ContactId, ContactLink, ContactValidationError, LinkPrecedence, NewContact,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    email,
    phone_number,
    linked_id,
    link_precedence,
    created_at,
    updated_at,
    deleted_at
FROM contacts";

const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "email",
    "phone_number",
    "linked_id",
    "link_precedence",
    "created_at",
    "updated_at",
    "deleted_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence and lookups.
#[derive(Debug)]
pub enum RepoError {
    Validation(ContactValidationError),
    Db(DbError),
    NotFound(ContactId),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "contact not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted contact data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "contact repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "contact repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "contact repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store consumed by the identity resolution engine.
pub trait ContactRepository {
    /// Active records whose email equals `email` OR whose phone equals
    /// `phone_number`. Absent arguments match nothing.
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> RepoResult<Vec<Contact>>;

    /// Inserts a record; the store assigns id and timestamps.
    fn create_contact(&self, contact: &NewContact) -> RepoResult<Contact>;

    /// Rewrites precedence and link of one record and refreshes `updated_at`.
    fn update_link(&self, id: ContactId, link: ContactLink) -> RepoResult<()>;

    /// `None` when absent or soft-deleted.
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;

    /// Active records linked to `primary_id`, oldest first.
    fn list_secondaries(&self, primary_id: ContactId) -> RepoResult<Vec<Contact>>;

    /// Loads `primary_id` and everything linked to it.
    ///
    /// Returns `None` when the primary is missing or is not a primary.
    fn load_cluster(&self, primary_id: ContactId) -> RepoResult<Option<Cluster>> {
        let Some(primary) = self.get_contact(primary_id)? else {
            return Ok(None);
        };
        let secondaries = self.list_secondaries(primary_id)?;
        Ok(Cluster::new(primary, secondaries))
    }
}

/// SQLite-backed contact repository.
///
/// Borrowing a `Connection` lets callers hand in a `Transaction` (which
/// derefs to `Connection`) so a whole resolution runs atomically.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_contact_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> RepoResult<Vec<Contact>> {
        if email.is_none() && phone_number.is_none() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE deleted_at IS NULL
               AND (
                 (?1 IS NOT NULL AND email = ?1)
                 OR (?2 IS NOT NULL AND phone_number = ?2)
               )
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![email, phone_number])?;
        collect_contacts(&mut rows)
    }

    fn create_contact(&self, contact: &NewContact) -> RepoResult<Contact> {
        contact.validate()?;

        self.conn.execute(
            "INSERT INTO contacts (
                email,
                phone_number,
                linked_id,
                link_precedence
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                contact.email.as_deref(),
                contact.phone_number.as_deref(),
                contact.linked_id.map(ContactId::get),
                contact.link_precedence.as_str(),
            ],
        )?;

        let id = ContactId(self.conn.last_insert_rowid());
        self.get_contact(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("created contact {id} not found in read-back"))
        })
    }

    fn update_link(&self, id: ContactId, link: ContactLink) -> RepoResult<()> {
        if link.linked_id == Some(id) {
            return Err(ContactValidationError::SelfLink(id).into());
        }
        match (link.link_precedence, link.linked_id) {
            (LinkPrecedence::Secondary, None) => {
                return Err(ContactValidationError::SecondaryWithoutLink.into());
            }
            (LinkPrecedence::Primary, Some(linked_id)) => {
                return Err(ContactValidationError::PrimaryWithLink(linked_id).into());
            }
            _ => {}
        }

        let changed = self.conn.execute(
            "UPDATE contacts
             SET
                link_precedence = ?2,
                linked_id = ?3,
                updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![
                id.get(),
                link.link_precedence.as_str(),
                link.linked_id.map(ContactId::get),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE id = ?1
               AND deleted_at IS NULL;"
        ))?;

        let mut rows = stmt.query([id.get()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_contact_row(row)?));
        }

        Ok(None)
    }

    fn list_secondaries(&self, primary_id: ContactId) -> RepoResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE linked_id = ?1
               AND deleted_at IS NULL
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([primary_id.get()])?;
        collect_contacts(&mut rows)
    }
}

/// Soft-deletes one record. Not used by resolution; exposed for maintenance
/// tooling and tests that exercise the exclusion rule.
pub fn soft_delete_contact(conn: &Connection, id: ContactId) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE contacts
         SET
            deleted_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER),
            updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
         WHERE id = ?1;",
        [id.get()],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }

    Ok(())
}

fn collect_contacts(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<Contact>> {
    let mut contacts = Vec::new();
    while let Some(row) = rows.next()? {
        contacts.push(parse_contact_row(row)?);
    }
    Ok(contacts)
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let precedence_text: String = row.get("link_precedence")?;
    let link_precedence = LinkPrecedence::parse(&precedence_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid link precedence `{precedence_text}` in contacts.link_precedence"
        ))
    })?;

    let contact = Contact {
        id: ContactId(row.get("id")?),
        email: row.get("email")?,
        phone_number: row.get("phone_number")?,
        linked_id: row.get::<_, Option<i64>>("linked_id")?.map(ContactId),
        link_precedence,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    contact.validate().map_err(|err| {
        RepoError::InvalidData(format!("contact {} violates record rules: {err}", contact.id))
    })?;
    Ok(contact)
}

fn ensure_contact_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "contacts")? {
        return Err(RepoError::MissingRequiredTable("contacts"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "contacts", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "contacts",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1
             FROM sqlite_master
             WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
