//! Guardian aggregate.
//!
//! # Responsibility
//! - Hold canonical Student identity (the canonical index is derived from it).
//! - Hold the mirrored academic placement of each linked Student.
//!
//! # Invariants
//! - A Guardian links a given school identifier at most once.
//! - Placement fields are a copy of the Period tree and may lag behind it.

use super::{is_blank, validate_email, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Stable identifier of one Guardian aggregate.
pub type GuardianId = Uuid;

/// Party legally responsible for one or more Students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub uuid: GuardianId,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "hijos_estudiantes", default)]
    pub students: Vec<GuardianStudentLink>,
}

/// Canonical Student identity owned by a Guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(rename = "cedula_escolar")]
    pub school_id: String,
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
}

/// One Student under a Guardian plus the mirrored placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianStudentLink {
    #[serde(rename = "hijo_estudiante")]
    pub profile: StudentProfile,
    #[serde(rename = "grado", default)]
    pub grade: Option<String>,
    #[serde(rename = "seccion", default)]
    pub section: Option<String>,
    #[serde(rename = "docente", default)]
    pub teacher_email: Option<String>,
}

impl StudentProfile {
    pub fn new(
        school_id: impl Into<String>,
        first_names: impl Into<String>,
        last_names: impl Into<String>,
    ) -> Self {
        Self {
            school_id: school_id.into(),
            first_names: first_names.into(),
            last_names: last_names.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if is_blank(&self.school_id) {
            return Err(ModelValidationError::BlankSchoolId);
        }
        if self.school_id.trim() != self.school_id {
            return Err(ModelValidationError::UntrimmedSchoolId(self.school_id.clone()));
        }
        if is_blank(&self.first_names) {
            return Err(ModelValidationError::BlankName("student first names"));
        }
        if is_blank(&self.last_names) {
            return Err(ModelValidationError::BlankName("student last names"));
        }
        Ok(())
    }
}

impl GuardianStudentLink {
    /// Wraps a profile with no placement yet.
    pub fn new(profile: StudentProfile) -> Self {
        Self {
            profile,
            grade: None,
            section: None,
            teacher_email: None,
        }
    }

    /// Overwrites the mirrored placement.
    ///
    /// Returns `true` when any field changed.
    pub fn apply_placement(
        &mut self,
        grade: &str,
        section: &str,
        teacher_email: Option<&str>,
    ) -> bool {
        let changed = self.grade.as_deref() != Some(grade)
            || self.section.as_deref() != Some(section)
            || self.teacher_email.as_deref() != teacher_email;
        if changed {
            self.grade = Some(grade.to_string());
            self.section = Some(section.to_string());
            self.teacher_email = teacher_email.map(str::to_string);
        }
        changed
    }
}

impl Guardian {
    /// Creates a Guardian with no Students and a generated id.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            students: Vec::new(),
        }
    }

    /// Finds the link for one school identifier.
    pub fn student(&self, school_id: &str) -> Option<&GuardianStudentLink> {
        self.students
            .iter()
            .find(|link| link.profile.school_id == school_id)
    }

    /// Finds the link for one school identifier for mutation.
    pub fn student_mut(&mut self, school_id: &str) -> Option<&mut GuardianStudentLink> {
        self.students
            .iter_mut()
            .find(|link| link.profile.school_id == school_id)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if is_blank(&self.name) {
            return Err(ModelValidationError::BlankName("guardian name"));
        }
        validate_email(&self.email)?;

        let mut seen = HashSet::new();
        for link in &self.students {
            link.profile.validate()?;
            if !seen.insert(link.profile.school_id.as_str()) {
                return Err(ModelValidationError::DuplicateStudentLink(
                    link.profile.school_id.clone(),
                ));
            }
        }
        Ok(())
    }
}
