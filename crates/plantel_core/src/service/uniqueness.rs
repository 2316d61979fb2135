//! Uniqueness validator for structural additions.
//!
//! # Invariants
//! - A batch is appended whole or not at all.
//! - Candidates are checked against existing siblings and against earlier
//!   candidates of the same batch.
//! - Appended children keep batch order after the existing ones.

use super::error::DuplicateEntityError;
use crate::model::period::ChildNode;
use std::collections::HashSet;

/// Checks `batch` against `existing` without mutating anything.
pub fn check_unique<T: ChildNode>(
    existing: &[T],
    batch: &[T],
) -> Result<(), DuplicateEntityError> {
    let mut taken: HashSet<String> = existing.iter().map(T::key).collect();
    for candidate in batch {
        let key = candidate.key();
        if !taken.insert(key.clone()) {
            return Err(DuplicateEntityError {
                kind: T::KIND,
                value: key,
            });
        }
    }
    Ok(())
}

/// Appends `batch` to `existing` when every candidate is unique.
///
/// On error `existing` is left untouched.
pub fn append_unique<T: ChildNode>(
    existing: &mut Vec<T>,
    batch: Vec<T>,
) -> Result<(), DuplicateEntityError> {
    check_unique(existing, &batch)?;
    existing.extend(batch);
    Ok(())
}
