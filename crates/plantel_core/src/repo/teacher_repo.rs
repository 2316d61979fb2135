//! Teacher store contract and SQLite implementation.
//!
//! # Invariants
//! - `teacher_classes` mirrors each Teacher's assigned classes and is
//!   rewritten in the same transaction as its document.
//! - Class lookup picks the most recently assigned Teacher; equal
//!   `assigned_at` values fall back to `email ASC`.

use super::{decode_document, encode_document, ensure_connection_ready, RepoError, RepoResult};
use crate::model::teacher::{Teacher, TeacherId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

/// Store for the Teacher aggregate.
pub trait TeacherRepository {
    /// Loads one Teacher by id.
    fn find_teacher(&self, id: TeacherId) -> RepoResult<Option<Teacher>>;
    /// Lists every Teacher ordered by email.
    fn list_teachers(&self) -> RepoResult<Vec<Teacher>>;
    /// Loads the Teacher serving the given grade/section pair.
    fn find_teacher_by_assigned_class(
        &self,
        grade: &str,
        section: &str,
    ) -> RepoResult<Option<Teacher>>;
    /// Inserts or overwrites the whole Teacher document.
    fn save_teacher(&self, teacher: &Teacher) -> RepoResult<()>;
}

/// SQLite-backed Teacher store.
pub struct SqliteTeacherRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeacherRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TeacherRepository for SqliteTeacherRepository<'_> {
    fn find_teacher(&self, id: TeacherId) -> RepoResult<Option<Teacher>> {
        let mut stmt = self
            .conn
            .prepare("SELECT teacher_uuid, document FROM teachers WHERE teacher_uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_teacher_row(row)?));
        }
        Ok(None)
    }

    fn list_teachers(&self) -> RepoResult<Vec<Teacher>> {
        let mut stmt = self.conn.prepare(
            "SELECT teacher_uuid, document FROM teachers ORDER BY email ASC, teacher_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut teachers = Vec::new();
        while let Some(row) = rows.next()? {
            teachers.push(parse_teacher_row(row)?);
        }
        Ok(teachers)
    }

    fn find_teacher_by_assigned_class(
        &self,
        grade: &str,
        section: &str,
    ) -> RepoResult<Option<Teacher>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.teacher_uuid AS teacher_uuid, t.document AS document
             FROM teacher_classes c
             JOIN teachers t ON t.teacher_uuid = c.teacher_uuid
             WHERE c.grade = ?1 AND c.section = ?2
             ORDER BY c.assigned_at DESC, t.email ASC, t.teacher_uuid ASC
             LIMIT 1;",
        )?;
        let mut rows = stmt.query(params![grade.trim(), section.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_teacher_row(row)?));
        }
        Ok(None)
    }

    fn save_teacher(&self, teacher: &Teacher) -> RepoResult<()> {
        teacher.validate()?;
        let teacher_uuid = teacher.uuid.to_string();
        let email = teacher.email.trim();
        let document = encode_document(teacher)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let email_owner: Option<String> = tx
            .query_row(
                "SELECT teacher_uuid FROM teachers WHERE email = ?1 AND teacher_uuid <> ?2;",
                params![email, teacher_uuid],
                |row| row.get(0),
            )
            .optional()?;
        if email_owner.is_some() {
            return Err(RepoError::DuplicateKey {
                table: "teachers",
                value: email.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO teachers (teacher_uuid, email, document)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (teacher_uuid) DO UPDATE SET
                email = excluded.email,
                document = excluded.document,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![teacher_uuid, email, document],
        )?;
        tx.execute(
            "DELETE FROM teacher_classes WHERE teacher_uuid = ?1;",
            [teacher_uuid.as_str()],
        )?;
        for class in &teacher.assigned_classes {
            tx.execute(
                "INSERT INTO teacher_classes (teacher_uuid, grade, section, assigned_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    teacher_uuid,
                    class.grade.trim(),
                    class.section.trim(),
                    class.assigned_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_teacher_row(row: &Row<'_>) -> RepoResult<Teacher> {
    let row_uuid: String = row.get("teacher_uuid")?;
    let document: String = row.get("document")?;
    let teacher: Teacher = decode_document(&row_uuid, &document, |teacher: &Teacher| teacher.uuid)?;
    teacher.validate()?;
    Ok(teacher)
}
