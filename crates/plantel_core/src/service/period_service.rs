//! Period use-case service.
//!
//! # Responsibility
//! - Gate structural additions (Lapse/Grade/Section) through the uniqueness
//!   validator.
//! - Run the enrollment pipeline: canonical index, teacher resolution,
//!   record resolution, Guardian propagation, Period write.
//! - Rebuild Guardian placements from the Period tree on demand.
//!
//! # Invariants
//! - Structural and identity errors abort before any write.
//! - Guardian writes happen before the single Period write; a crash between
//!   them leaves the Guardians ahead of the tree, which
//!   `reconcile_guardians` repairs.
//! - No locking: concurrent mutations of one Period are last-write-wins.

use super::enrollment::{resolve_batch, EnrollmentRequest, StudentIndex};
use super::error::{StructureError, StructureResult};
use super::propagation::{propagate_placements, PartialPropagationWarning, PropagationReport};
use super::teacher_assignment::{resolve_teacher, TeacherAssignment};
use super::uniqueness::append_unique;
use crate::model::is_blank;
use crate::model::period::{
    ChildNode, Grade, Lapse, NodeRef, Period, PeriodId, Section, StudentEnrollmentRecord,
};
use crate::model::{EntityKind, ModelValidationError};
use crate::repo::guardian_repo::GuardianRepository;
use crate::repo::period_repo::PeriodRepository;
use crate::repo::teacher_repo::TeacherRepository;
use log::{error, info};
use std::time::Instant;

/// Address of one Section inside a Period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPath {
    pub lapse: NodeRef,
    pub grade: NodeRef,
    pub section: NodeRef,
}

impl SectionPath {
    pub fn new(lapse: NodeRef, grade: NodeRef, section: NodeRef) -> Self {
        Self {
            lapse,
            grade,
            section,
        }
    }
}

/// Result of a successful enrollment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    /// Period as persisted after the call.
    pub period: Period,
    /// Records appended to the Section, in request order.
    pub enrolled: Vec<StudentEnrollmentRecord>,
    pub teacher: TeacherAssignment,
    /// Students whose Guardian could not be updated.
    pub warnings: Vec<PartialPropagationWarning>,
}

/// Period service facade over the three aggregate stores.
pub struct PeriodService<P, G, T>
where
    P: PeriodRepository,
    G: GuardianRepository,
    T: TeacherRepository,
{
    periods: P,
    guardians: G,
    teachers: T,
}

impl<P, G, T> PeriodService<P, G, T>
where
    P: PeriodRepository,
    G: GuardianRepository,
    T: TeacherRepository,
{
    /// Creates service from repository implementations.
    pub fn new(periods: P, guardians: G, teachers: T) -> Self {
        Self {
            periods,
            guardians,
            teachers,
        }
    }

    /// Creates and stores an empty Period.
    ///
    /// Labels are trimmed and must be unique among stored Periods.
    pub fn create_period(&self, label: impl Into<String>) -> StructureResult<Period> {
        let label = label.into();
        if is_blank(&label) {
            return Err(ModelValidationError::BlankPeriodLabel.into());
        }
        let period = Period::new(label.trim());
        self.periods.save_period(&period)?;
        info!(
            "event=period_create module=service status=ok period_uuid={}",
            period.uuid
        );
        Ok(period)
    }

    /// Loads one Period.
    pub fn get_period(&self, period_id: PeriodId) -> StructureResult<Period> {
        self.periods
            .find_period(period_id)?
            .ok_or(StructureError::PeriodNotFound(period_id))
    }

    /// Lists stored Periods.
    pub fn list_periods(&self) -> StructureResult<Vec<Period>> {
        self.periods.list_periods().map_err(Into::into)
    }

    /// Adds one Lapse to a Period.
    ///
    /// Fails with `DuplicateEntity` when the lapse number is taken.
    pub fn add_lapse(&self, period_id: PeriodId, lapse: Lapse) -> StructureResult<Period> {
        let mut period = self.get_period(period_id)?;
        let lapses = prepare_candidates(vec![lapse])?;
        append_unique(&mut period.lapses, lapses)?;
        self.commit_structure(period, EntityKind::Lapse, 1)
    }

    /// Adds a batch of Grades to one Lapse, all or nothing.
    pub fn add_grades(
        &self,
        period_id: PeriodId,
        lapse: &NodeRef,
        grades: Vec<Grade>,
    ) -> StructureResult<Period> {
        let mut period = self.get_period(period_id)?;
        let grades = prepare_candidates(grades)?;
        let count = grades.len();

        let target = find_lapse_mut(&mut period, lapse)?;
        append_unique(&mut target.grades, grades)?;
        self.commit_structure(period, EntityKind::Grade, count)
    }

    /// Adds a batch of Sections to one Grade, all or nothing.
    pub fn add_sections(
        &self,
        period_id: PeriodId,
        lapse: &NodeRef,
        grade: &NodeRef,
        sections: Vec<Section>,
    ) -> StructureResult<Period> {
        let mut period = self.get_period(period_id)?;
        let sections = prepare_candidates(sections)?;
        let count = sections.len();

        let target = find_grade_mut(find_lapse_mut(&mut period, lapse)?, grade)?;
        append_unique(&mut target.sections, sections)?;
        self.commit_structure(period, EntityKind::Section, count)
    }

    /// Enrolls a batch of Students into one Section.
    ///
    /// # Contract
    /// - Every identifier must exist in the canonical index built from all
    ///   Guardians; otherwise `UnknownStudent` and nothing is written.
    /// - Name fields come from the index, never from the batch.
    /// - Each Student's Guardian link receives grade, section and teacher;
    ///   misses are returned as warnings, not errors.
    /// - The Period is written once, after the Guardians.
    pub fn enroll_students(
        &self,
        period_id: PeriodId,
        path: &SectionPath,
        batch: &[EnrollmentRequest],
    ) -> StructureResult<EnrollmentOutcome> {
        let started_at = Instant::now();
        info!(
            "event=enroll_students module=service status=start period_uuid={} batch_size={}",
            period_id,
            batch.len()
        );

        let result = self.enroll_students_inner(period_id, path, batch);
        match &result {
            Ok(outcome) => info!(
                "event=enroll_students module=service status=ok period_uuid={} enrolled={} warnings={} duration_ms={}",
                period_id,
                outcome.enrolled.len(),
                outcome.warnings.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=enroll_students module=service status=error period_uuid={} duration_ms={} error={}",
                period_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Rewrites every Guardian placement from one Lapse of the Period tree.
    ///
    /// Idempotent: Guardians that already match are not written.
    pub fn reconcile_guardians(
        &self,
        period_id: PeriodId,
        lapse: &NodeRef,
    ) -> StructureResult<PropagationReport> {
        let period = self.get_period(period_id)?;
        let target = period.lapse(lapse).ok_or_else(|| StructureError::NodeNotFound {
            kind: EntityKind::Lapse,
            reference: lapse.clone(),
        })?;
        let records: Vec<StudentEnrollmentRecord> = target.enrollments().cloned().collect();

        let report = propagate_placements(&self.guardians, &records);
        info!(
            "event=reconcile_guardians module=service status=ok period_uuid={} lapse={} updated={} unchanged={} warnings={}",
            period_id,
            target.number,
            report.updated,
            report.unchanged,
            report.warnings.len()
        );
        Ok(report)
    }

    fn enroll_students_inner(
        &self,
        period_id: PeriodId,
        path: &SectionPath,
        batch: &[EnrollmentRequest],
    ) -> StructureResult<EnrollmentOutcome> {
        let mut period = self.get_period(period_id)?;

        let (teacher, records) = {
            let lapse = period
                .lapse(&path.lapse)
                .ok_or_else(|| StructureError::NodeNotFound {
                    kind: EntityKind::Lapse,
                    reference: path.lapse.clone(),
                })?;
            let grade = lapse
                .grade(&path.grade)
                .ok_or_else(|| StructureError::NodeNotFound {
                    kind: EntityKind::Grade,
                    reference: path.grade.clone(),
                })?;
            let section = grade
                .section(&path.section)
                .ok_or_else(|| StructureError::NodeNotFound {
                    kind: EntityKind::Section,
                    reference: path.section.clone(),
                })?;

            let index = StudentIndex::from_guardians(&self.guardians.find_all_guardians()?);
            let teacher = resolve_teacher(&self.teachers, &grade.name, &section.name)?;
            let records = resolve_batch(
                &index,
                lapse,
                &grade.name,
                &section.name,
                &teacher,
                batch,
            )?;
            (teacher, records)
        };

        let section = find_section_mut(&mut period, path)?;
        section.students.extend(records.iter().cloned());
        period.validate()?;

        let report = propagate_placements(&self.guardians, &records);
        self.periods.save_period(&period)?;

        Ok(EnrollmentOutcome {
            period,
            enrolled: records,
            teacher,
            warnings: report.warnings,
        })
    }

    fn commit_structure(
        &self,
        period: Period,
        kind: EntityKind,
        added: usize,
    ) -> StructureResult<Period> {
        period.validate()?;
        if let Err(err) = self.periods.save_period(&period) {
            error!(
                "event=structure_add module=service status=error kind={} period_uuid={} error={}",
                kind, period.uuid, err
            );
            return Err(err.into());
        }
        info!(
            "event=structure_add module=service status=ok kind={} period_uuid={} added={}",
            kind, period.uuid, added
        );
        Ok(period)
    }
}

/// Trims and validates structural candidates.
///
/// Candidates must arrive empty of Students: records enter a Section only
/// through `enroll_students`, which checks them against the Guardian index.
fn prepare_candidates<T: ChildNode>(batch: Vec<T>) -> StructureResult<Vec<T>> {
    batch
        .into_iter()
        .map(|mut candidate| -> StructureResult<T> {
            candidate.normalize();
            if candidate.holds_enrollments() {
                return Err(ModelValidationError::PrefilledEnrollments {
                    kind: T::KIND,
                    value: candidate.key(),
                }
                .into());
            }
            candidate.validate_node()?;
            Ok(candidate)
        })
        .collect()
}

fn find_lapse_mut<'p>(
    period: &'p mut Period,
    lapse: &NodeRef,
) -> StructureResult<&'p mut Lapse> {
    period
        .lapse_mut(lapse)
        .ok_or_else(|| StructureError::NodeNotFound {
            kind: EntityKind::Lapse,
            reference: lapse.clone(),
        })
}

fn find_grade_mut<'l>(
    lapse: &'l mut Lapse,
    grade: &NodeRef,
) -> StructureResult<&'l mut Grade> {
    lapse
        .grade_mut(grade)
        .ok_or_else(|| StructureError::NodeNotFound {
            kind: EntityKind::Grade,
            reference: grade.clone(),
        })
}

fn find_section_mut<'p>(
    period: &'p mut Period,
    path: &SectionPath,
) -> StructureResult<&'p mut Section> {
    let grade = find_grade_mut(find_lapse_mut(period, &path.lapse)?, &path.grade)?;
    grade
        .section_mut(&path.section)
        .ok_or_else(|| StructureError::NodeNotFound {
            kind: EntityKind::Section,
            reference: path.section.clone(),
        })
}
