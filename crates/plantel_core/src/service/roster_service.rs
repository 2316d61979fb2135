//! Roster use-case service.
//!
//! Registers the Guardians, Students and Teachers the enrollment pipeline
//! reads from.
//!
//! # Invariants
//! - A school identifier is registered with at most one Guardian.
//! - Identity strings are trimmed before they are stored.

use super::error::{StructureError, StructureResult};
use crate::model::guardian::{Guardian, GuardianId, GuardianStudentLink, StudentProfile};
use crate::model::teacher::{AssignedClass, Teacher, TeacherId};
use crate::repo::guardian_repo::GuardianRepository;
use crate::repo::teacher_repo::TeacherRepository;
use log::info;
use std::time::{SystemTime, UNIX_EPOCH};

/// Roster service facade over the Guardian and Teacher stores.
pub struct RosterService<G: GuardianRepository, T: TeacherRepository> {
    guardians: G,
    teachers: T,
}

impl<G: GuardianRepository, T: TeacherRepository> RosterService<G, T> {
    /// Creates service from repository implementations.
    pub fn new(guardians: G, teachers: T) -> Self {
        Self {
            guardians,
            teachers,
        }
    }

    /// Registers a Guardian with no Students.
    pub fn register_guardian(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> StructureResult<Guardian> {
        let guardian = Guardian::new(name.into().trim(), email.into().trim());
        self.guardians.save_guardian(&guardian)?;
        info!(
            "event=guardian_register module=service status=ok guardian_uuid={}",
            guardian.uuid
        );
        Ok(guardian)
    }

    /// Links a new Student to a Guardian.
    ///
    /// Fails with `StudentAlreadyRegistered` when any Guardian, including
    /// this one, already links the identifier.
    pub fn add_student_to_guardian(
        &self,
        guardian_id: GuardianId,
        profile: StudentProfile,
    ) -> StructureResult<Guardian> {
        let profile = StudentProfile::new(
            profile.school_id.trim(),
            profile.first_names.trim(),
            profile.last_names.trim(),
        );
        profile.validate()?;

        if let Some(owner) = self.guardians.find_guardian_by_student(&profile.school_id)? {
            return Err(StructureError::StudentAlreadyRegistered {
                school_id: profile.school_id,
                guardian_uuid: owner.uuid,
            });
        }

        let mut guardian = self
            .guardians
            .find_guardian(guardian_id)?
            .ok_or(StructureError::GuardianNotFound(guardian_id))?;
        guardian.students.push(GuardianStudentLink::new(profile));
        self.guardians.save_guardian(&guardian)?;
        info!(
            "event=student_register module=service status=ok guardian_uuid={} students={}",
            guardian.uuid,
            guardian.students.len()
        );
        Ok(guardian)
    }

    /// Registers a Teacher with no classes.
    pub fn register_teacher(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> StructureResult<Teacher> {
        let teacher = Teacher::new(name.into().trim(), email.into().trim());
        self.teachers.save_teacher(&teacher)?;
        info!(
            "event=teacher_register module=service status=ok teacher_uuid={}",
            teacher.uuid
        );
        Ok(teacher)
    }

    /// Assigns a grade/section class to a Teacher, stamped with the current
    /// time.
    pub fn assign_class(
        &self,
        teacher_id: TeacherId,
        grade: &str,
        section: &str,
    ) -> StructureResult<Teacher> {
        let (grade, section) = (grade.trim(), section.trim());
        let mut teacher = self
            .teachers
            .find_teacher(teacher_id)?
            .ok_or(StructureError::TeacherNotFound(teacher_id))?;
        if teacher.serves(grade, section) {
            return Err(StructureError::ClassAlreadyAssigned {
                grade: grade.to_string(),
                section: section.to_string(),
            });
        }

        teacher.assigned_classes.push(AssignedClass {
            grade: grade.to_string(),
            section: section.to_string(),
            assigned_at: now_epoch_ms(),
        });
        self.teachers.save_teacher(&teacher)?;
        info!(
            "event=class_assign module=service status=ok teacher_uuid={} classes={}",
            teacher.uuid,
            teacher.assigned_classes.len()
        );
        Ok(teacher)
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
