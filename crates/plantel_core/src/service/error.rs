//! Service-level error type.

use crate::model::guardian::GuardianId;
use crate::model::period::{NodeRef, PeriodId};
use crate::model::teacher::TeacherId;
use crate::model::{EntityKind, ModelValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StructureResult<T> = Result<T, StructureError>;

/// A candidate child collides with an existing sibling or with another
/// candidate in the same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntityError {
    pub kind: EntityKind,
    pub value: String,
}

impl Display for DuplicateEntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} `{}` already exists", self.kind, self.value)
    }
}

impl Error for DuplicateEntityError {}

/// Errors from period/roster service operations.
///
/// Every variant aborts the whole call before any write, except `Repo`,
/// which reports a store failure at the point it happened.
#[derive(Debug)]
pub enum StructureError {
    /// Lapse number, grade name or section name already taken.
    DuplicateEntity(DuplicateEntityError),
    /// Enrollment references a Student absent from every Guardian.
    UnknownStudent(String),
    /// Student is already enrolled in the target Lapse.
    AlreadyEnrolled {
        school_id: String,
        grade: String,
        section: String,
    },
    /// Same school identifier requested twice in one batch.
    DuplicateInBatch(String),
    /// Student is already linked to a Guardian.
    StudentAlreadyRegistered {
        school_id: String,
        guardian_uuid: GuardianId,
    },
    /// Teacher already serves the given class.
    ClassAlreadyAssigned { grade: String, section: String },
    PeriodNotFound(PeriodId),
    GuardianNotFound(GuardianId),
    TeacherNotFound(TeacherId),
    /// Referenced tree node does not exist.
    NodeNotFound {
        kind: EntityKind,
        reference: NodeRef,
    },
    /// Input or resulting aggregate breaks a model invariant.
    Validation(ModelValidationError),
    /// Store-level failure.
    Repo(RepoError),
}

impl Display for StructureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEntity(err) => write!(f, "{err}"),
            Self::UnknownStudent(school_id) => {
                write!(f, "student `{school_id}` is not registered with any guardian")
            }
            Self::AlreadyEnrolled {
                school_id,
                grade,
                section,
            } => write!(
                f,
                "student `{school_id}` is already enrolled in {grade}/{section}"
            ),
            Self::DuplicateInBatch(school_id) => {
                write!(f, "student `{school_id}` appears more than once in the batch")
            }
            Self::StudentAlreadyRegistered {
                school_id,
                guardian_uuid,
            } => write!(
                f,
                "student `{school_id}` is already registered with guardian {guardian_uuid}"
            ),
            Self::ClassAlreadyAssigned { grade, section } => {
                write!(f, "class {grade}/{section} is already assigned to this teacher")
            }
            Self::PeriodNotFound(id) => write!(f, "period not found: {id}"),
            Self::GuardianNotFound(id) => write!(f, "guardian not found: {id}"),
            Self::TeacherNotFound(id) => write!(f, "teacher not found: {id}"),
            Self::NodeNotFound { kind, reference } => write!(f, "{kind} not found: {reference}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StructureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DuplicateEntity(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DuplicateEntityError> for StructureError {
    fn from(value: DuplicateEntityError) -> Self {
        Self::DuplicateEntity(value)
    }
}

impl From<ModelValidationError> for StructureError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StructureError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::StudentClaimed {
                school_id,
                guardian_uuid,
            } => Self::StudentAlreadyRegistered {
                school_id,
                guardian_uuid,
            },
            other => Self::Repo(other),
        }
    }
}
