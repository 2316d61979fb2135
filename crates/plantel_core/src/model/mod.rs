//! Domain aggregates for the school's academic structure.
//!
//! # Responsibility
//! - Define the Period tree (Period -> Lapse -> Grade -> Section -> Student).
//! - Define the Guardian and Teacher aggregates the Period tree mirrors into.
//!
//! # Invariants
//! - Every aggregate and every tree node is identified by a stable UUID.
//! - A Period exclusively owns its tree; no node is shared between Periods.
//! - Guardians are the source of truth for Student identity fields.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod guardian;
pub mod period;
pub mod teacher;

/// Hierarchy level used in uniqueness and lookup diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Lapse,
    Grade,
    Section,
}

impl EntityKind {
    /// Returns the stable lowercase name used in messages and log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lapse => "lapse",
            Self::Grade => "grade",
            Self::Section => "section",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for aggregate invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Period label is blank after trim.
    BlankPeriodLabel,
    /// Lapse numbers start at 1.
    InvalidLapseNumber(u32),
    /// Grade name is blank after trim.
    BlankGradeName,
    /// Section name is blank after trim.
    BlankSectionName,
    /// Student school identifier is blank after trim.
    BlankSchoolId,
    /// Student school identifier carries leading or trailing whitespace.
    UntrimmedSchoolId(String),
    /// A structural candidate already carries enrollment records; Students
    /// enter a Section only through enrollment.
    PrefilledEnrollments { kind: EntityKind, value: String },
    /// A person name field is blank after trim.
    BlankName(&'static str),
    /// Email address is not shaped like `local@domain`.
    InvalidEmail(String),
    /// Two siblings share the same identifying value.
    DuplicateChild { kind: EntityKind, value: String },
    /// A Student appears more than once across the Sections of one Lapse.
    DuplicateEnrollment { lapse: u32, school_id: String },
    /// A Guardian links the same Student twice.
    DuplicateStudentLink(String),
    /// A Teacher lists the same grade/section pair twice.
    DuplicateAssignedClass { grade: String, section: String },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankPeriodLabel => write!(f, "period label must not be blank"),
            Self::InvalidLapseNumber(number) => {
                write!(f, "lapse number must be at least 1, got {number}")
            }
            Self::BlankGradeName => write!(f, "grade name must not be blank"),
            Self::BlankSectionName => write!(f, "section name must not be blank"),
            Self::BlankSchoolId => write!(f, "school identifier must not be blank"),
            Self::UntrimmedSchoolId(value) => {
                write!(f, "school identifier `{value}` has surrounding whitespace")
            }
            Self::PrefilledEnrollments { kind, value } => write!(
                f,
                "new {kind} `{value}` must not carry enrolled students"
            ),
            Self::BlankName(field) => write!(f, "{field} must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::DuplicateChild { kind, value } => {
                write!(f, "{kind} `{value}` appears more than once")
            }
            Self::DuplicateEnrollment { lapse, school_id } => write!(
                f,
                "student `{school_id}` is enrolled more than once in lapse {lapse}"
            ),
            Self::DuplicateStudentLink(school_id) => {
                write!(f, "guardian links student `{school_id}` more than once")
            }
            Self::DuplicateAssignedClass { grade, section } => write!(
                f,
                "class {grade}/{section} is assigned more than once"
            ),
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub(crate) fn validate_email(value: &str) -> Result<(), ModelValidationError> {
    let trimmed = value.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !trimmed.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ModelValidationError::InvalidEmail(value.to_string()))
    }
}
