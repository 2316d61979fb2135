//! Period tree model.
//!
//! # Responsibility
//! - Define the nested Period -> Lapse -> Grade -> Section aggregate.
//! - Resolve tree nodes from caller-supplied references.
//!
//! # Invariants
//! - Lapse numbers are unique within a Period.
//! - Grade names are unique within a Lapse.
//! - Section names are unique within a Grade.
//! - A school identifier is enrolled at most once per Lapse.
//! - Child order is insertion order.

use super::{is_blank, EntityKind, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one Period aggregate.
pub type PeriodId = Uuid;

/// Stable identifier of a Lapse, Grade or Section inside a Period tree.
pub type NodeId = Uuid;

/// Top-level enrollment aggregate for one school year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub uuid: PeriodId,
    /// Human label such as `2025-2026`.
    #[serde(rename = "periodo")]
    pub label: String,
    #[serde(rename = "lapsos", default)]
    pub lapses: Vec<Lapse>,
}

/// Grading term within a Period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lapse {
    pub uuid: NodeId,
    #[serde(rename = "lapso")]
    pub number: u32,
    #[serde(rename = "grados", default)]
    pub grades: Vec<Grade>,
}

/// Class level within a Lapse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub uuid: NodeId,
    #[serde(rename = "grado")]
    pub name: String,
    #[serde(rename = "secciones", default)]
    pub sections: Vec<Section>,
}

/// Classroom group within a Grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub uuid: NodeId,
    #[serde(rename = "seccion")]
    pub name: String,
    #[serde(rename = "estudiantes", default)]
    pub students: Vec<StudentEnrollmentRecord>,
}

/// Denormalized projection of one Student inside a Section.
///
/// Identity fields are copied from the owning Guardian's link; placement
/// fields mirror the Guardian link's academic fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentEnrollmentRecord {
    #[serde(rename = "cedula_escolar")]
    pub school_id: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "grado")]
    pub grade: String,
    #[serde(rename = "seccion")]
    pub section: String,
    /// Assigned teacher's email. `None` when the classroom is unstaffed.
    #[serde(rename = "docente", default)]
    pub teacher_email: Option<String>,
}

/// Caller reference to one child node.
///
/// Ordinals are 1-based positions. Labels are the lapse number, grade name or
/// section name. Ids are stable across structural edits; ordinals are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Ordinal(usize),
    Label(String),
    Id(NodeId),
}

impl NodeRef {
    /// Convenience constructor for label references.
    pub fn label(value: impl Into<String>) -> Self {
        Self::Label(value.into())
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ordinal(ordinal) => write!(f, "#{ordinal}"),
            Self::Label(label) => write!(f, "`{label}`"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Common shape of Lapse, Grade and Section as children of a parent scope.
pub trait ChildNode {
    /// Hierarchy level of this node.
    const KIND: EntityKind;

    /// Stable node id.
    fn node_id(&self) -> NodeId;

    /// Identifying value that must be unique among siblings.
    fn key(&self) -> String;

    /// Trims the labels of this node and of every descendant.
    fn normalize(&mut self);

    /// Returns whether any Section in this subtree holds enrollment records.
    fn holds_enrollments(&self) -> bool;

    /// Checks the invariants of this subtree.
    fn validate_node(&self) -> Result<(), ModelValidationError>;
}

impl ChildNode for Lapse {
    const KIND: EntityKind = EntityKind::Lapse;

    fn node_id(&self) -> NodeId {
        self.uuid
    }

    fn key(&self) -> String {
        self.number.to_string()
    }

    fn normalize(&mut self) {
        self.grades.iter_mut().for_each(Grade::normalize);
    }

    fn holds_enrollments(&self) -> bool {
        self.grades.iter().any(Grade::holds_enrollments)
    }

    fn validate_node(&self) -> Result<(), ModelValidationError> {
        self.validate()
    }
}

impl ChildNode for Grade {
    const KIND: EntityKind = EntityKind::Grade;

    fn node_id(&self) -> NodeId {
        self.uuid
    }

    fn key(&self) -> String {
        self.name.trim().to_string()
    }
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.sections.iter_mut().for_each(Section::normalize);
    }

    fn holds_enrollments(&self) -> bool {
        self.sections.iter().any(Section::holds_enrollments)
    }

    fn validate_node(&self) -> Result<(), ModelValidationError> {
        self.validate()
    }
}

impl ChildNode for Section {
    const KIND: EntityKind = EntityKind::Section;

    fn node_id(&self) -> NodeId {
        self.uuid
    }

    fn key(&self) -> String {
        self.name.trim().to_string()
    }
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
    }

    fn holds_enrollments(&self) -> bool {
        !self.students.is_empty()
    }

    fn validate_node(&self) -> Result<(), ModelValidationError> {
        self.validate()
    }
}

/// Returns the position of the child matching `reference`, if any.
pub fn locate<T: ChildNode>(children: &[T], reference: &NodeRef) -> Option<usize> {
    match reference {
        NodeRef::Ordinal(ordinal) => ordinal
            .checked_sub(1)
            .filter(|index| *index < children.len()),
        NodeRef::Label(label) => {
            let wanted = label.trim();
            children.iter().position(|child| child.key() == wanted)
        }
        NodeRef::Id(id) => children.iter().position(|child| child.node_id() == *id),
    }
}

impl Period {
    /// Creates an empty Period with a generated id.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: label.into(),
            lapses: Vec::new(),
        }
    }

    /// Looks up one Lapse.
    pub fn lapse(&self, reference: &NodeRef) -> Option<&Lapse> {
        locate(&self.lapses, reference).map(|index| &self.lapses[index])
    }

    /// Looks up one Lapse for mutation.
    pub fn lapse_mut(&mut self, reference: &NodeRef) -> Option<&mut Lapse> {
        let index = locate(&self.lapses, reference)?;
        Some(&mut self.lapses[index])
    }

    /// Validates every invariant of the tree.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if is_blank(&self.label) {
            return Err(ModelValidationError::BlankPeriodLabel);
        }
        ensure_unique_keys(&self.lapses)?;
        for lapse in &self.lapses {
            lapse.validate()?;
        }
        Ok(())
    }
}

impl Lapse {
    /// Creates an empty Lapse with a generated id.
    pub fn new(number: u32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            number,
            grades: Vec::new(),
        }
    }

    /// Looks up one Grade.
    pub fn grade(&self, reference: &NodeRef) -> Option<&Grade> {
        locate(&self.grades, reference).map(|index| &self.grades[index])
    }

    /// Looks up one Grade for mutation.
    pub fn grade_mut(&mut self, reference: &NodeRef) -> Option<&mut Grade> {
        let index = locate(&self.grades, reference)?;
        Some(&mut self.grades[index])
    }

    /// Iterates every enrollment record across all Grades and Sections.
    pub fn enrollments(&self) -> impl Iterator<Item = &StudentEnrollmentRecord> {
        self.grades
            .iter()
            .flat_map(|grade| grade.sections.iter())
            .flat_map(|section| section.students.iter())
    }

    /// Finds where a Student is enrolled in this Lapse.
    pub fn find_enrollment(&self, school_id: &str) -> Option<&StudentEnrollmentRecord> {
        self.enrollments()
            .find(|record| record.school_id == school_id)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.number == 0 {
            return Err(ModelValidationError::InvalidLapseNumber(self.number));
        }
        ensure_unique_keys(&self.grades)?;
        for grade in &self.grades {
            grade.validate()?;
        }

        let mut seen = HashSet::new();
        for record in self.enrollments() {
            if !seen.insert(record.school_id.as_str()) {
                return Err(ModelValidationError::DuplicateEnrollment {
                    lapse: self.number,
                    school_id: record.school_id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Grade {
    /// Creates an empty Grade with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            sections: Vec::new(),
        }
    }

    /// Looks up one Section.
    pub fn section(&self, reference: &NodeRef) -> Option<&Section> {
        locate(&self.sections, reference).map(|index| &self.sections[index])
    }

    /// Looks up one Section for mutation.
    pub fn section_mut(&mut self, reference: &NodeRef) -> Option<&mut Section> {
        let index = locate(&self.sections, reference)?;
        Some(&mut self.sections[index])
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if is_blank(&self.name) {
            return Err(ModelValidationError::BlankGradeName);
        }
        ensure_unique_keys(&self.sections)?;
        for section in &self.sections {
            section.validate()?;
        }
        Ok(())
    }
}

impl Section {
    /// Creates an empty Section with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            students: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if is_blank(&self.name) {
            return Err(ModelValidationError::BlankSectionName);
        }
        for record in &self.students {
            if is_blank(&record.school_id) {
                return Err(ModelValidationError::BlankSchoolId);
            }
        }
        Ok(())
    }
}

fn ensure_unique_keys<T: ChildNode>(children: &[T]) -> Result<(), ModelValidationError> {
    let mut seen = HashSet::new();
    for child in children {
        let key = child.key();
        if !seen.insert(key.clone()) {
            return Err(ModelValidationError::DuplicateChild {
                kind: T::KIND,
                value: key,
            });
        }
    }
    Ok(())
}
