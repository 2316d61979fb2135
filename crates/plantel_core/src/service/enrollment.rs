//! Enrollment resolver.
//!
//! # Responsibility
//! - Build the canonical Student index from every Guardian.
//! - Turn a batch of enrollment requests into enrollment records whose
//!   identity fields come from the index.
//!
//! # Invariants
//! - The first unknown, blank, repeated or already-enrolled identifier
//!   rejects the whole batch; nothing is returned for partial use.
//! - Caller-supplied name fields never reach a record.

use super::error::{StructureError, StructureResult};
use super::teacher_assignment::TeacherAssignment;
use crate::model::guardian::{Guardian, GuardianId};
use crate::model::period::{Lapse, StudentEnrollmentRecord};
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One requested enrollment.
///
/// Only `school_id` is authoritative; the name fields are accepted for wire
/// compatibility and overwritten from the canonical index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    #[serde(rename = "cedula_escolar")]
    pub school_id: String,
    #[serde(rename = "nombre", default)]
    pub first_name: Option<String>,
    #[serde(rename = "apellido", default)]
    pub last_name: Option<String>,
}

impl EnrollmentRequest {
    pub fn new(school_id: impl Into<String>) -> Self {
        Self {
            school_id: school_id.into(),
            first_name: None,
            last_name: None,
        }
    }
}

/// Canonical identity of one Student plus its owning Guardian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentIndexEntry {
    pub school_id: String,
    pub first_names: String,
    pub last_names: String,
    pub guardian_uuid: GuardianId,
}

/// School-wide map from school identifier to canonical identity.
#[derive(Debug, Clone, Default)]
pub struct StudentIndex {
    entries: HashMap<String, StudentIndexEntry>,
}

impl StudentIndex {
    /// Traverses every Guardian's links.
    ///
    /// If two Guardians link the same identifier the first one wins; the
    /// Guardian store rejects that state on write.
    pub fn from_guardians(guardians: &[Guardian]) -> Self {
        let mut entries = HashMap::new();
        for guardian in guardians {
            for link in &guardian.students {
                let school_id = link.profile.school_id.trim().to_string();
                entries
                    .entry(school_id.clone())
                    .or_insert_with(|| StudentIndexEntry {
                        school_id,
                        first_names: link.profile.first_names.clone(),
                        last_names: link.profile.last_names.clone(),
                        guardian_uuid: guardian.uuid,
                    });
            }
        }
        Self { entries }
    }

    pub fn get(&self, school_id: &str) -> Option<&StudentIndexEntry> {
        self.entries.get(school_id.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a batch into records for `grade`/`section` of `lapse`.
///
/// Checks run in request order. Per request: blank identifier, repeated in
/// batch, unknown to the index, already enrolled anywhere in `lapse`.
pub fn resolve_batch(
    index: &StudentIndex,
    lapse: &Lapse,
    grade: &str,
    section: &str,
    teacher: &TeacherAssignment,
    requests: &[EnrollmentRequest],
) -> StructureResult<Vec<StudentEnrollmentRecord>> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(requests.len());

    for request in requests {
        let school_id = request.school_id.trim();
        if school_id.is_empty() {
            return Err(ModelValidationError::BlankSchoolId.into());
        }
        if !seen.insert(school_id) {
            return Err(StructureError::DuplicateInBatch(school_id.to_string()));
        }
        let entry = index
            .get(school_id)
            .ok_or_else(|| StructureError::UnknownStudent(school_id.to_string()))?;
        if let Some(existing) = lapse.find_enrollment(school_id) {
            return Err(StructureError::AlreadyEnrolled {
                school_id: school_id.to_string(),
                grade: existing.grade.clone(),
                section: existing.section.clone(),
            });
        }

        records.push(StudentEnrollmentRecord {
            school_id: entry.school_id.clone(),
            first_name: entry.first_names.clone(),
            last_name: entry.last_names.clone(),
            grade: grade.to_string(),
            section: section.to_string(),
            teacher_email: teacher.contact().map(str::to_string),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::{resolve_batch, EnrollmentRequest, StudentIndex};
    use crate::model::guardian::{Guardian, GuardianStudentLink, StudentProfile};
    use crate::model::period::{Grade, Lapse, Section, StudentEnrollmentRecord};
    use crate::model::ModelValidationError;
    use crate::service::error::StructureError;
    use crate::service::teacher_assignment::TeacherAssignment;
    use uuid::Uuid;

    fn guardian_with(students: &[(&str, &str, &str)]) -> Guardian {
        let mut guardian = Guardian::new("Carmen Lopez", "carmen@correo.com");
        for (school_id, first, last) in students {
            guardian
                .students
                .push(GuardianStudentLink::new(StudentProfile::new(
                    *school_id, *first, *last,
                )));
        }
        guardian
    }

    fn empty_lapse() -> Lapse {
        let mut grade = Grade::new("3rd");
        grade.sections.push(Section::new("A"));
        let mut lapse = Lapse::new(1);
        lapse.grades.push(grade);
        lapse
    }

    #[test]
    fn index_spans_all_guardians() {
        let first = guardian_with(&[("V-001", "Ana", "Lopez")]);
        let second = guardian_with(&[("V-002", "Luis", "Perez"), ("V-003", "Eva", "Perez")]);
        let index = StudentIndex::from_guardians(&[first.clone(), second.clone()]);

        assert_eq!(index.len(), 3);
        assert_eq!(index.get("V-001").unwrap().guardian_uuid, first.uuid);
        assert_eq!(index.get(" V-003 ").unwrap().guardian_uuid, second.uuid);
        assert!(index.get("V-999").is_none());
    }

    #[test]
    fn canonical_names_overwrite_request_names() {
        let index = StudentIndex::from_guardians(&[guardian_with(&[("V-001", "Ana", "Lopez")])]);
        let mut request = EnrollmentRequest::new("V-001");
        request.first_name = Some("Wrong".to_string());
        request.last_name = Some("Name".to_string());
        let teacher = TeacherAssignment::Assigned {
            teacher_uuid: Uuid::new_v4(),
            email: "maria@escuela.edu".to_string(),
        };

        let records =
            resolve_batch(&index, &empty_lapse(), "3rd", "A", &teacher, &[request]).unwrap();

        assert_eq!(
            records,
            vec![StudentEnrollmentRecord {
                school_id: "V-001".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Lopez".to_string(),
                grade: "3rd".to_string(),
                section: "A".to_string(),
                teacher_email: Some("maria@escuela.edu".to_string()),
            }]
        );
    }

    #[test]
    fn unknown_identifier_rejects_batch() {
        let index = StudentIndex::from_guardians(&[guardian_with(&[("V-001", "Ana", "Lopez")])]);
        let requests = [EnrollmentRequest::new("V-001"), EnrollmentRequest::new("V-999")];

        let err = resolve_batch(
            &index,
            &empty_lapse(),
            "3rd",
            "A",
            &TeacherAssignment::Unassigned,
            &requests,
        )
        .unwrap_err();
        assert!(matches!(err, StructureError::UnknownStudent(id) if id == "V-999"));
    }

    #[test]
    fn repeated_and_blank_identifiers_are_rejected() {
        let index = StudentIndex::from_guardians(&[guardian_with(&[("V-001", "Ana", "Lopez")])]);
        let lapse = empty_lapse();
        let unassigned = TeacherAssignment::Unassigned;

        let err = resolve_batch(
            &index,
            &lapse,
            "3rd",
            "A",
            &unassigned,
            &[EnrollmentRequest::new("V-001"), EnrollmentRequest::new(" V-001")],
        )
        .unwrap_err();
        assert!(matches!(err, StructureError::DuplicateInBatch(id) if id == "V-001"));

        let err = resolve_batch(
            &index,
            &lapse,
            "3rd",
            "A",
            &unassigned,
            &[EnrollmentRequest::new("  ")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StructureError::Validation(ModelValidationError::BlankSchoolId)
        ));
    }

    #[test]
    fn student_enrolled_elsewhere_in_lapse_is_rejected() {
        let index = StudentIndex::from_guardians(&[guardian_with(&[("V-001", "Ana", "Lopez")])]);
        let mut lapse = empty_lapse();
        let mut other = Section::new("B");
        other.students.push(StudentEnrollmentRecord {
            school_id: "V-001".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lopez".to_string(),
            grade: "3rd".to_string(),
            section: "B".to_string(),
            teacher_email: None,
        });
        lapse.grades[0].sections.push(other);

        let err = resolve_batch(
            &index,
            &lapse,
            "3rd",
            "A",
            &TeacherAssignment::Unassigned,
            &[EnrollmentRequest::new("V-001")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StructureError::AlreadyEnrolled { section, .. } if section == "B"
        ));
    }
}
