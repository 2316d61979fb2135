//! Teacher assignment resolver.
//!
//! An unstaffed classroom is a normal state, not an error: resolution yields
//! `TeacherAssignment::Unassigned`. When several Teachers claim the same
//! class, the store's tie-break applies (most recently assigned first, then
//! email ascending), so repeated calls on unchanged data agree.

use crate::model::teacher::TeacherId;
use crate::repo::teacher_repo::TeacherRepository;
use crate::repo::RepoResult;
use log::debug;

/// Result of resolving the Teacher for one grade/section pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeacherAssignment {
    Assigned {
        teacher_uuid: TeacherId,
        email: String,
    },
    Unassigned,
}

impl TeacherAssignment {
    /// Contact address to denormalize, `None` when unassigned.
    pub fn contact(&self) -> Option<&str> {
        match self {
            Self::Assigned { email, .. } => Some(email.as_str()),
            Self::Unassigned => None,
        }
    }
}

/// Looks up the Teacher serving `grade`/`section`.
pub fn resolve_teacher<T: TeacherRepository>(
    teachers: &T,
    grade: &str,
    section: &str,
) -> RepoResult<TeacherAssignment> {
    let assignment = match teachers.find_teacher_by_assigned_class(grade, section)? {
        Some(teacher) => TeacherAssignment::Assigned {
            teacher_uuid: teacher.uuid,
            email: teacher.email,
        },
        None => TeacherAssignment::Unassigned,
    };
    debug!(
        "event=teacher_resolve module=service status=ok assigned={}",
        matches!(assignment, TeacherAssignment::Assigned { .. })
    );
    Ok(assignment)
}
