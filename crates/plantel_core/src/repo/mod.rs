//! Aggregate stores and their SQLite implementations.
//!
//! # Responsibility
//! - Define the find/save contracts the core consumes per aggregate.
//! - Keep SQL and JSON document details inside the persistence boundary.
//!
//! # Invariants
//! - `save_*` is a whole-aggregate overwrite and runs in one transaction.
//! - No store operation spans two aggregates.
//! - Write paths validate the aggregate before touching SQL.
//! - Read paths reject invalid persisted documents instead of masking them.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::ModelValidationError;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod guardian_repo;
pub mod period_repo;
pub mod teacher_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all aggregate stores.
#[derive(Debug)]
pub enum RepoError {
    /// Aggregate failed invariant checks before write or after read.
    Validation(ModelValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Aggregate document could not be encoded or decoded.
    Document(serde_json::Error),
    /// Persisted row cannot be converted to a valid aggregate.
    InvalidData(String),
    /// A unique column already belongs to another aggregate.
    DuplicateKey { table: &'static str, value: String },
    /// School identifier is already linked to a different Guardian.
    StudentClaimed { school_id: String, guardian_uuid: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "invalid aggregate document: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::DuplicateKey { table, value } => {
                write!(f, "`{value}` already exists in {table}")
            }
            Self::StudentClaimed {
                school_id,
                guardian_uuid,
            } => write!(
                f,
                "student `{school_id}` already belongs to guardian {guardian_uuid}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::DuplicateKey { .. } => None,
            Self::StudentClaimed { .. } => None,
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
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

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Document(value)
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

fn encode_document<T: Serialize>(aggregate: &T) -> RepoResult<String> {
    Ok(serde_json::to_string(aggregate)?)
}

/// Decodes one stored document and checks it was stored under `row_uuid`.
fn decode_document<T, F>(row_uuid: &str, document: &str, uuid_of: F) -> RepoResult<T>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> Uuid,
{
    let aggregate: T = serde_json::from_str(document)?;
    let document_uuid = uuid_of(&aggregate);
    if document_uuid.to_string() != row_uuid {
        return Err(RepoError::InvalidData(format!(
            "row `{row_uuid}` holds document for `{document_uuid}`"
        )));
    }
    Ok(aggregate)
}
