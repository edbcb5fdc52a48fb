//! Entity store abstraction and shared error type.

use crate::model::{EntityId, Mentor, MentorFields, Student, StudentFields};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned while interacting with the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be established or verified.
    #[error("Failed to connect to MongoDB: {0}")]
    Connection(String),
    /// Driver-level failure while executing a command.
    #[error("MongoDB request failed: {0}")]
    Driver(#[from] mongodb::error::Error),
    /// A stored reference is not in the store's identifier format.
    #[error("Cast to ObjectId failed for value \"{0}\"")]
    InvalidReference(EntityId),
    /// The store handle was closed before the operation ran.
    #[error("Entity store is closed")]
    Closed,
}

/// Persistence operations the relationship logic relies on.
///
/// Lookups return `Ok(None)` for identifiers that do not resolve, including identifiers that are
/// not in the backend's format; only transport or driver problems surface as errors.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a mentor with an empty student list.
    async fn insert_mentor(&self, fields: MentorFields) -> Result<Mentor, StoreError>;

    /// Insert a student with no mentor.
    async fn insert_student(&self, fields: StudentFields) -> Result<Student, StoreError>;

    /// Fetch one mentor by id.
    async fn find_mentor(&self, id: &EntityId) -> Result<Option<Mentor>, StoreError>;

    /// Fetch one student by id.
    async fn find_student(&self, id: &EntityId) -> Result<Option<Student>, StoreError>;

    /// Resolve student references, preserving reference order and dropping dangling ones.
    async fn find_students(&self, ids: &[EntityId]) -> Result<Vec<Student>, StoreError>;

    /// Persist the mentor's current student list.
    async fn save_mentor(&self, mentor: &Mentor) -> Result<(), StoreError>;

    /// Append `student` to the stored list of `mentor` in a single write, leaving the rest of
    /// the list as the store currently holds it. Returns the mentor after the append, or `None`
    /// when the mentor no longer exists.
    async fn push_student(
        &self,
        mentor: &EntityId,
        student: &EntityId,
    ) -> Result<Option<Mentor>, StoreError>;

    /// Persist the student's current mentor reference.
    async fn save_student(&self, student: &Student) -> Result<(), StoreError>;

    /// Round-trip to the backend to confirm it is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release the connection; later calls fail with [`StoreError::Closed`] or a driver error.
    async fn close(&self);
}

/// Arrange fetched students in reference order.
///
/// Each reference yields one entry, so duplicated references repeat the record; references with
/// no matching record are skipped.
pub(crate) fn order_by_references(ids: &[EntityId], found: Vec<Student>) -> Vec<Student> {
    let by_id: HashMap<EntityId, Student> = found
        .into_iter()
        .map(|student| (student.id.clone(), student))
        .collect();
    ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}
