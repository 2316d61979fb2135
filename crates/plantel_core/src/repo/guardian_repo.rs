//! Guardian store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist Guardian documents.
//! - Maintain the `guardian_students` index used to find a Guardian by one
//!   of its Students.
//!
//! # Invariants
//! - A school identifier is linked to at most one Guardian school-wide.
//! - The index rows of a Guardian are rewritten in the same transaction as
//!   its document.

use super::{decode_document, encode_document, ensure_connection_ready, RepoError, RepoResult};
use crate::model::guardian::{Guardian, GuardianId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Store for the Guardian aggregate.
pub trait GuardianRepository {
    /// Loads every Guardian.
    fn find_all_guardians(&self) -> RepoResult<Vec<Guardian>>;
    /// Loads one Guardian by id.
    fn find_guardian(&self, id: GuardianId) -> RepoResult<Option<Guardian>>;
    /// Loads the Guardian that links the given school identifier.
    fn find_guardian_by_student(&self, school_id: &str) -> RepoResult<Option<Guardian>>;
    /// Inserts or overwrites the whole Guardian document.
    fn save_guardian(&self, guardian: &Guardian) -> RepoResult<()>;
}

/// SQLite-backed Guardian store.
pub struct SqliteGuardianRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGuardianRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GuardianRepository for SqliteGuardianRepository<'_> {
    fn find_all_guardians(&self) -> RepoResult<Vec<Guardian>> {
        let mut stmt = self.conn.prepare(
            "SELECT guardian_uuid, document
             FROM guardians
             ORDER BY created_at ASC, guardian_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut guardians = Vec::new();
        while let Some(row) = rows.next()? {
            guardians.push(parse_guardian_row(row)?);
        }
        Ok(guardians)
    }

    fn find_guardian(&self, id: GuardianId) -> RepoResult<Option<Guardian>> {
        let mut stmt = self
            .conn
            .prepare("SELECT guardian_uuid, document FROM guardians WHERE guardian_uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_guardian_row(row)?));
        }
        Ok(None)
    }

    fn find_guardian_by_student(&self, school_id: &str) -> RepoResult<Option<Guardian>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.guardian_uuid AS guardian_uuid, g.document AS document
             FROM guardian_students s
             JOIN guardians g ON g.guardian_uuid = s.guardian_uuid
             WHERE s.school_id = ?1;",
        )?;
        let mut rows = stmt.query([school_id.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_guardian_row(row)?));
        }
        Ok(None)
    }

    fn save_guardian(&self, guardian: &Guardian) -> RepoResult<()> {
        guardian.validate()?;
        let guardian_uuid = guardian.uuid.to_string();
        let email = guardian.email.trim();
        let document = encode_document(guardian)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let email_owner: Option<String> = tx
            .query_row(
                "SELECT guardian_uuid FROM guardians WHERE email = ?1 AND guardian_uuid <> ?2;",
                params![email, guardian_uuid],
                |row| row.get(0),
            )
            .optional()?;
        if email_owner.is_some() {
            return Err(RepoError::DuplicateKey {
                table: "guardians",
                value: email.to_string(),
            });
        }

        for link in &guardian.students {
            let school_id = link.profile.school_id.trim();
            if let Some(owner) = student_owner(&tx, school_id)? {
                if owner != guardian.uuid {
                    return Err(RepoError::StudentClaimed {
                        school_id: school_id.to_string(),
                        guardian_uuid: owner,
                    });
                }
            }
        }

        tx.execute(
            "INSERT INTO guardians (guardian_uuid, email, document)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (guardian_uuid) DO UPDATE SET
                email = excluded.email,
                document = excluded.document,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![guardian_uuid, email, document],
        )?;
        tx.execute(
            "DELETE FROM guardian_students WHERE guardian_uuid = ?1;",
            [guardian_uuid.as_str()],
        )?;
        for link in &guardian.students {
            tx.execute(
                "INSERT INTO guardian_students (school_id, guardian_uuid) VALUES (?1, ?2);",
                params![link.profile.school_id.trim(), guardian_uuid],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn student_owner(conn: &Connection, school_id: &str) -> RepoResult<Option<Uuid>> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT guardian_uuid FROM guardian_students WHERE school_id = ?1;",
            [school_id],
            |row| row.get(0),
        )
        .optional()?;
    owner
        .map(|value| {
            Uuid::parse_str(&value).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid uuid value `{value}` in guardian_students.guardian_uuid"
                ))
            })
        })
        .transpose()
}

fn parse_guardian_row(row: &Row<'_>) -> RepoResult<Guardian> {
    let row_uuid: String = row.get("guardian_uuid")?;
    let document: String = row.get("document")?;
    let guardian: Guardian =
        decode_document(&row_uuid, &document, |guardian: &Guardian| guardian.uuid)?;
    guardian.validate()?;
    Ok(guardian)
}
