//! Core domain logic for the school's academic structure.
//! This crate is the single source of truth for enrollment invariants and
//! for keeping the Period tree and Guardian records consistent.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::guardian::{Guardian, GuardianId, GuardianStudentLink, StudentProfile};
pub use model::period::{
    Grade, Lapse, NodeId, NodeRef, Period, PeriodId, Section, StudentEnrollmentRecord,
};
pub use model::teacher::{AssignedClass, Teacher, TeacherId};
pub use model::{EntityKind, ModelValidationError};
pub use repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
pub use repo::period_repo::{PeriodRepository, SqlitePeriodRepository};
pub use repo::teacher_repo::{SqliteTeacherRepository, TeacherRepository};
pub use repo::{RepoError, RepoResult};
pub use service::enrollment::{EnrollmentRequest, StudentIndex, StudentIndexEntry};
pub use service::error::{DuplicateEntityError, StructureError, StructureResult};
pub use service::period_service::{EnrollmentOutcome, PeriodService, SectionPath};
pub use service::propagation::{PartialPropagationWarning, PropagationIssue, PropagationReport};
pub use service::roster_service::RosterService;
pub use service::teacher_assignment::TeacherAssignment;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
