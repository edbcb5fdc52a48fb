//! Outcomes and errors of the relationship operations.

use crate::model::{EntityId, Mentor, Student, ValidationError};
use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors emitted by the relationship operations.
///
/// The `*NotFound` variants carry the id that failed to resolve; their display text is what
/// HTTP clients see.
#[derive(Debug, Error)]
pub enum RelationshipError {
    /// Mentor addressed by the request does not exist.
    #[error("Mentor not found")]
    MentorNotFound(EntityId),
    /// Student addressed by the request does not exist.
    #[error("Student not found")]
    StudentNotFound(EntityId),
    /// Target mentor of a reassignment does not exist.
    #[error("New mentor not found")]
    NewMentorNotFound(EntityId),
    /// One of the students listed in a bulk assignment does not exist.
    #[error("Student with ID {0} not found")]
    BatchStudentNotFound(EntityId),
    /// Submitted fields were rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Entity store failed while executing the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RelationshipError {
    /// Whether the failure is only an identifier that did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MentorNotFound(_)
                | Self::StudentNotFound(_)
                | Self::NewMentorNotFound(_)
                | Self::BatchStudentNotFound(_)
        )
    }
}

/// Result of a bulk assignment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignOutcome {
    /// Mentor state after the newly assigned students were appended.
    pub mentor: Mentor,
    /// Students whose mentor was set by this request, in request order.
    pub updated_students: Vec<Student>,
    /// Students left alone because they already had a mentor.
    #[serde(skip)]
    pub skipped: usize,
}

/// Result of moving one student to a new mentor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignOutcome {
    /// Student with its mentor reference updated.
    pub student: Student,
    /// Mentor that now lists the student.
    pub new_mentor: Mentor,
}
