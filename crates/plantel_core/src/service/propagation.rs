//! Consistency propagator.
//!
//! # Responsibility
//! - Mirror each enrollment record's placement onto the owning Guardian's
//!   link and persist that Guardian.
//!
//! # Invariants
//! - Each record is handled independently; a miss or store failure for one
//!   Student becomes a warning and never stops the others.
//! - A Guardian is written only when its link actually changed, so applying
//!   the same records twice writes nothing the second time.
//! - The Period aggregate is never written here.

use crate::model::period::StudentEnrollmentRecord;
use crate::repo::guardian_repo::GuardianRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::fmt::{Display, Formatter};

/// Why a placement could not be mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationIssue {
    /// No Guardian links the school identifier.
    GuardianNotFound,
    /// Guardian store failed for this Student.
    StoreFailure(String),
}

/// A Student is placed in a Section but its Guardian does not mirror it.
///
/// Not fatal: surfaced so an operator can reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialPropagationWarning {
    pub school_id: String,
    pub grade: String,
    pub section: String,
    pub issue: PropagationIssue,
}

impl Display for PartialPropagationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.issue {
            PropagationIssue::GuardianNotFound => write!(
                f,
                "student `{}` placed in {}/{} has no guardian to mirror the placement",
                self.school_id, self.grade, self.section
            ),
            PropagationIssue::StoreFailure(message) => write!(
                f,
                "student `{}` placed in {}/{} could not be mirrored: {message}",
                self.school_id, self.grade, self.section
            ),
        }
    }
}

/// Counts and warnings from one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Guardian links rewritten and saved.
    pub updated: usize,
    /// Guardian links that already matched.
    pub unchanged: usize,
    pub warnings: Vec<PartialPropagationWarning>,
}

impl PropagationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Mirrors every record's placement onto its Guardian.
///
/// Guardians are re-read per record so several Students of one Guardian
/// accumulate instead of overwriting each other.
pub fn propagate_placements<G: GuardianRepository>(
    guardians: &G,
    records: &[StudentEnrollmentRecord],
) -> PropagationReport {
    let mut report = PropagationReport::default();

    for record in records {
        match mirror_record(guardians, record) {
            Ok(true) => report.updated += 1,
            Ok(false) => report.unchanged += 1,
            Err(issue) => {
                let warning = PartialPropagationWarning {
                    school_id: record.school_id.clone(),
                    grade: record.grade.clone(),
                    section: record.section.clone(),
                    issue,
                };
                warn!(
                    "event=guardian_propagation module=service status=warn school_id={} reason={}",
                    warning.school_id,
                    match &warning.issue {
                        PropagationIssue::GuardianNotFound => "guardian_not_found",
                        PropagationIssue::StoreFailure(_) => "store_failure",
                    }
                );
                report.warnings.push(warning);
            }
        }
    }

    info!(
        "event=guardian_propagation module=service status=ok records={} updated={} unchanged={} warnings={}",
        records.len(),
        report.updated,
        report.unchanged,
        report.warnings.len()
    );
    report
}

fn mirror_record<G: GuardianRepository>(
    guardians: &G,
    record: &StudentEnrollmentRecord,
) -> Result<bool, PropagationIssue> {
    let store_failure = |err: RepoError| PropagationIssue::StoreFailure(err.to_string());

    let mut guardian = guardians
        .find_guardian_by_student(&record.school_id)
        .map_err(store_failure)?
        .ok_or(PropagationIssue::GuardianNotFound)?;
    let link = guardian
        .student_mut(&record.school_id)
        .ok_or(PropagationIssue::GuardianNotFound)?;

    let changed = link.apply_placement(
        &record.grade,
        &record.section,
        record.teacher_email.as_deref(),
    );
    if changed {
        guardians.save_guardian(&guardian).map_err(store_failure)?;
    }
    Ok(changed)
}
