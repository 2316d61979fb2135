//! Period store contract and SQLite implementation.
//!
//! # Invariants
//! - Period labels are unique across stored Periods.
//! - Listing order is deterministic: `created_at ASC, period_uuid ASC`.

use super::{decode_document, encode_document, ensure_connection_ready, RepoError, RepoResult};
use crate::model::period::{Period, PeriodId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

/// Store for the Period aggregate.
pub trait PeriodRepository {
    /// Loads one Period by id.
    fn find_period(&self, id: PeriodId) -> RepoResult<Option<Period>>;
    /// Lists every stored Period.
    fn list_periods(&self) -> RepoResult<Vec<Period>>;
    /// Inserts or overwrites the whole Period document.
    fn save_period(&self, period: &Period) -> RepoResult<()>;
}

/// SQLite-backed Period store.
pub struct SqlitePeriodRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePeriodRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PeriodRepository for SqlitePeriodRepository<'_> {
    fn find_period(&self, id: PeriodId) -> RepoResult<Option<Period>> {
        let mut stmt = self
            .conn
            .prepare("SELECT period_uuid, document FROM periods WHERE period_uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_period_row(row)?));
        }
        Ok(None)
    }

    fn list_periods(&self) -> RepoResult<Vec<Period>> {
        let mut stmt = self.conn.prepare(
            "SELECT period_uuid, document
             FROM periods
             ORDER BY created_at ASC, period_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut periods = Vec::new();
        while let Some(row) = rows.next()? {
            periods.push(parse_period_row(row)?);
        }
        Ok(periods)
    }

    fn save_period(&self, period: &Period) -> RepoResult<()> {
        period.validate()?;
        let label = period.label.trim();
        let document = encode_document(period)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let owner: Option<String> = tx
            .query_row(
                "SELECT period_uuid FROM periods WHERE label = ?1 AND period_uuid <> ?2;",
                params![label, period.uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if owner.is_some() {
            return Err(RepoError::DuplicateKey {
                table: "periods",
                value: label.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO periods (period_uuid, label, document)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (period_uuid) DO UPDATE SET
                label = excluded.label,
                document = excluded.document,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![period.uuid.to_string(), label, document],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_period_row(row: &Row<'_>) -> RepoResult<Period> {
    let row_uuid: String = row.get("period_uuid")?;
    let document: String = row.get("document")?;
    let period: Period = decode_document(&row_uuid, &document, |period: &Period| period.uuid)?;
    period.validate()?;
    Ok(period)
}
