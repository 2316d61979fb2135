//! Teacher aggregate.
//!
//! # Invariants
//! - `email` is the contact denormalized onto enrolled Students.
//! - A Teacher lists each grade/section pair at most once.

use super::{is_blank, validate_email, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Stable identifier of one Teacher aggregate.
pub type TeacherId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub uuid: TeacherId,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "clases_asignadas", default)]
    pub assigned_classes: Vec<AssignedClass>,
}

/// Grade/section pair served by a Teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedClass {
    #[serde(rename = "grado")]
    pub grade: String,
    #[serde(rename = "seccion")]
    pub section: String,
    /// Epoch ms. Drives the tie-break when several Teachers claim one class.
    pub assigned_at: i64,
}

impl AssignedClass {
    /// Returns whether this descriptor matches both labels.
    pub fn matches(&self, grade: &str, section: &str) -> bool {
        self.grade == grade && self.section == section
    }
}

impl Teacher {
    /// Creates a Teacher with no classes and a generated id.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            assigned_classes: Vec::new(),
        }
    }

    /// Returns whether this Teacher serves the given class.
    pub fn serves(&self, grade: &str, section: &str) -> bool {
        self.assigned_classes
            .iter()
            .any(|class| class.matches(grade, section))
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if is_blank(&self.name) {
            return Err(ModelValidationError::BlankName("teacher name"));
        }
        validate_email(&self.email)?;

        let mut seen = HashSet::new();
        for class in &self.assigned_classes {
            if is_blank(&class.grade) {
                return Err(ModelValidationError::BlankGradeName);
            }
            if is_blank(&class.section) {
                return Err(ModelValidationError::BlankSectionName);
            }
            if !seen.insert((class.grade.as_str(), class.section.as_str())) {
                return Err(ModelValidationError::DuplicateAssignedClass {
                    grade: class.grade.clone(),
                    section: class.section.clone(),
                });
            }
        }
        Ok(())
    }
}
