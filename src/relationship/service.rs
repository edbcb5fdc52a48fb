//! Relationship service keeping `student.mentor` and `mentor.students` in step.

use crate::{
    config::PartialAssignPolicy,
    metrics::{MetricsSnapshot, RelationshipMetrics},
    model::{EntityId, Mentor, NewMentor, NewStudent, Student},
    relationship::types::{BulkAssignOutcome, ReassignOutcome, RelationshipError},
    store::EntityStore,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Applies the assignment rules on top of an [`EntityStore`].
///
/// Every operation is a linear sequence of store reads and writes. The student-side and
/// mentor-side writes are separate calls, so a failure between them (or a concurrent request)
/// can leave the two references disagreeing; the service does not lock or retry.
/// Construct it once near process start and share it through an `Arc`.
pub struct RelationshipService {
    store: Arc<dyn EntityStore>,
    partial_assign: PartialAssignPolicy,
    metrics: Arc<RelationshipMetrics>,
}

/// Abstraction over the relationship operations used by the HTTP surface.
#[async_trait]
pub trait RelationshipApi: Send + Sync {
    /// Store a new mentor with no students.
    async fn create_mentor(&self, fields: NewMentor) -> Result<Mentor, RelationshipError>;

    /// Store a new student with no mentor.
    async fn create_student(&self, fields: NewStudent) -> Result<Student, RelationshipError>;

    /// Give every currently unassigned student in `student_ids` to the mentor.
    async fn bulk_assign(
        &self,
        mentor_id: &EntityId,
        student_ids: Vec<EntityId>,
    ) -> Result<BulkAssignOutcome, RelationshipError>;

    /// Move one student to `new_mentor_id`, whether or not it already has a mentor.
    async fn reassign(
        &self,
        student_id: &EntityId,
        new_mentor_id: &EntityId,
    ) -> Result<ReassignOutcome, RelationshipError>;

    /// Resolve the students listed on a mentor, in stored order.
    async fn list_mentor_students(
        &self,
        mentor_id: &EntityId,
    ) -> Result<Vec<Student>, RelationshipError>;

    /// Resolve the mentor a student currently points at, if any.
    async fn previous_mentor(
        &self,
        student_id: &EntityId,
    ) -> Result<Option<Mentor>, RelationshipError>;

    /// Check that the entity store is reachable.
    async fn health(&self) -> Result<(), RelationshipError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RelationshipService {
    /// Build a service over `store` using `partial_assign` for aborted bulk assignments.
    pub fn new(store: Arc<dyn EntityStore>, partial_assign: PartialAssignPolicy) -> Self {
        Self {
            store,
            partial_assign,
            metrics: Arc::new(RelationshipMetrics::new()),
        }
    }

    /// Store a new mentor with no students.
    pub async fn create_mentor(&self, fields: NewMentor) -> Result<Mentor, RelationshipError> {
        let fields = fields.validate()?;
        let mentor = self.store.insert_mentor(fields).await?;
        self.metrics.record_mentor_created();
        tracing::info!(mentor_id = %mentor.id, "Mentor created");
        Ok(mentor)
    }

    /// Store a new student with no mentor.
    pub async fn create_student(&self, fields: NewStudent) -> Result<Student, RelationshipError> {
        let fields = fields.validate()?;
        let student = self.store.insert_student(fields).await?;
        self.metrics.record_student_created();
        tracing::info!(student_id = %student.id, "Student created");
        Ok(student)
    }

    /// Assign every listed student that has no mentor yet.
    ///
    /// Students are looked up and written one at a time in request order. Students that already
    /// have a mentor, this one included, are skipped without error. The first id that does not
    /// resolve aborts the request; students written before that point stay assigned unless the
    /// service was built with [`PartialAssignPolicy::Revert`]. The mentor record is written once,
    /// after every student, and its list is appended to without de-duplication.
    pub async fn bulk_assign(
        &self,
        mentor_id: &EntityId,
        student_ids: Vec<EntityId>,
    ) -> Result<BulkAssignOutcome, RelationshipError> {
        let Some(mut mentor) = self.store.find_mentor(mentor_id).await? else {
            return Err(self.not_found(RelationshipError::MentorNotFound(mentor_id.clone())));
        };

        let requested = student_ids.len();
        let mut updated = Vec::new();
        let mut skipped = 0;
        let result = match self
            .assign_unassigned(&mentor, student_ids, &mut updated, &mut skipped)
            .await
        {
            Ok(()) => {
                mentor
                    .students
                    .extend(updated.iter().map(|student| student.id.clone()));
                self.store
                    .save_mentor(&mentor)
                    .await
                    .map_err(RelationshipError::from)
            }
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            tracing::warn!(
                mentor_id = %mentor.id,
                requested,
                written = updated.len(),
                policy = ?self.partial_assign,
                error = %err,
                "Bulk assignment aborted"
            );
            if self.partial_assign == PartialAssignPolicy::Revert {
                self.revert_assignments(&mut updated).await;
            }
            return Err(err);
        }

        self.metrics
            .record_bulk_assign(updated.len() as u64, skipped as u64);
        tracing::info!(
            mentor_id = %mentor.id,
            requested,
            assigned = updated.len(),
            skipped,
            "Bulk assignment completed"
        );

        Ok(BulkAssignOutcome {
            mentor,
            updated_students: updated,
            skipped,
        })
    }

    async fn assign_unassigned(
        &self,
        mentor: &Mentor,
        student_ids: Vec<EntityId>,
        updated: &mut Vec<Student>,
        skipped: &mut usize,
    ) -> Result<(), RelationshipError> {
        for student_id in student_ids {
            let Some(mut student) = self.store.find_student(&student_id).await? else {
                return Err(self.not_found(RelationshipError::BatchStudentNotFound(student_id)));
            };

            if let Some(current) = &student.mentor {
                tracing::debug!(
                    student_id = %student.id,
                    current_mentor = %current,
                    "Student already assigned; skipping"
                );
                *skipped += 1;
                continue;
            }

            student.mentor = Some(mentor.id.clone());
            self.store.save_student(&student).await?;
            updated.push(student);
        }
        Ok(())
    }

    /// Best-effort compensation: clear the mentor on students this request assigned.
    async fn revert_assignments(&self, students: &mut [Student]) {
        for student in students.iter_mut() {
            student.mentor = None;
            match self.store.save_student(student).await {
                Ok(()) => {
                    tracing::debug!(student_id = %student.id, "Reverted partial assignment")
                }
                Err(err) => tracing::error!(
                    student_id = %student.id,
                    error = %err,
                    "Failed to revert partial assignment"
                ),
            }
        }
    }

    /// Move a student to another mentor.
    ///
    /// The student is pulled from its current mentor's list when that mentor still exists; a
    /// dangling current mentor is ignored. The new mentor gets the student appended in a single
    /// store write, so concurrent reassignments to the same mentor do not overwrite each other.
    /// There is no duplicate check on the append.
    pub async fn reassign(
        &self,
        student_id: &EntityId,
        new_mentor_id: &EntityId,
    ) -> Result<ReassignOutcome, RelationshipError> {
        let Some(mut student) = self.store.find_student(student_id).await? else {
            return Err(self.not_found(RelationshipError::StudentNotFound(student_id.clone())));
        };
        let Some(new_mentor) = self.store.find_mentor(new_mentor_id).await? else {
            return Err(self.not_found(RelationshipError::NewMentorNotFound(
                new_mentor_id.clone(),
            )));
        };

        let previous = student.mentor.clone();
        if let Some(current_id) = &previous {
            let current = if *current_id == new_mentor.id {
                Some(new_mentor.clone())
            } else {
                self.store.find_mentor(current_id).await?
            };
            match current {
                Some(mut current) => {
                    current.remove_student(&student.id);
                    self.store.save_mentor(&current).await?;
                }
                None => tracing::debug!(
                    student_id = %student.id,
                    mentor_id = %current_id,
                    "Current mentor no longer exists; skipping unassign"
                ),
            }
        }

        student.mentor = Some(new_mentor.id.clone());
        self.store.save_student(&student).await?;

        let new_mentor = match self.store.push_student(&new_mentor.id, &student.id).await? {
            Some(updated) => updated,
            None => {
                tracing::warn!(
                    mentor_id = %new_mentor.id,
                    "Mentor vanished before the student was appended"
                );
                let mut stale = new_mentor;
                stale.students.push(student.id.clone());
                stale
            }
        };

        self.metrics.record_reassignment();
        tracing::info!(
            student_id = %student.id,
            previous_mentor = ?previous.as_ref().map(EntityId::as_str),
            new_mentor = %new_mentor.id,
            "Student reassigned"
        );

        Ok(ReassignOutcome {
            student,
            new_mentor,
        })
    }

    /// Resolve the students referenced by a mentor, dropping references that no longer resolve.
    pub async fn list_mentor_students(
        &self,
        mentor_id: &EntityId,
    ) -> Result<Vec<Student>, RelationshipError> {
        let Some(mentor) = self.store.find_mentor(mentor_id).await? else {
            return Err(self.not_found(RelationshipError::MentorNotFound(mentor_id.clone())));
        };
        let students = self.store.find_students(&mentor.students).await?;
        tracing::debug!(
            mentor_id = %mentor.id,
            references = mentor.students.len(),
            resolved = students.len(),
            "Resolved mentor students"
        );
        Ok(students)
    }

    /// Resolve a student's mentor; `None` when unassigned or when the reference dangles.
    pub async fn previous_mentor(
        &self,
        student_id: &EntityId,
    ) -> Result<Option<Mentor>, RelationshipError> {
        let Some(student) = self.store.find_student(student_id).await? else {
            return Err(self.not_found(RelationshipError::StudentNotFound(student_id.clone())));
        };
        let Some(mentor_id) = &student.mentor else {
            return Ok(None);
        };
        let mentor = self.store.find_mentor(mentor_id).await?;
        if mentor.is_none() {
            tracing::debug!(
                student_id = %student.id,
                mentor_id = %mentor_id,
                "Student references a missing mentor"
            );
        }
        Ok(mentor)
    }

    /// Check that the entity store is reachable.
    pub async fn health(&self) -> Result<(), RelationshipError> {
        self.store.ping().await.map_err(Into::into)
    }

    /// Retrieve the current metrics snapshot for diagnostics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn not_found(&self, err: RelationshipError) -> RelationshipError {
        self.metrics.record_not_found();
        tracing::debug!(error = %err, "Lookup did not resolve");
        err
    }
}

#[async_trait]
impl RelationshipApi for RelationshipService {
    async fn create_mentor(&self, fields: NewMentor) -> Result<Mentor, RelationshipError> {
        RelationshipService::create_mentor(self, fields).await
    }

    async fn create_student(&self, fields: NewStudent) -> Result<Student, RelationshipError> {
        RelationshipService::create_student(self, fields).await
    }

    async fn bulk_assign(
        &self,
        mentor_id: &EntityId,
        student_ids: Vec<EntityId>,
    ) -> Result<BulkAssignOutcome, RelationshipError> {
        RelationshipService::bulk_assign(self, mentor_id, student_ids).await
    }

    async fn reassign(
        &self,
        student_id: &EntityId,
        new_mentor_id: &EntityId,
    ) -> Result<ReassignOutcome, RelationshipError> {
        RelationshipService::reassign(self, student_id, new_mentor_id).await
    }

    async fn list_mentor_students(
        &self,
        mentor_id: &EntityId,
    ) -> Result<Vec<Student>, RelationshipError> {
        RelationshipService::list_mentor_students(self, mentor_id).await
    }

    async fn previous_mentor(
        &self,
        student_id: &EntityId,
    ) -> Result<Option<Mentor>, RelationshipError> {
        RelationshipService::previous_mentor(self, student_id).await
    }

    async fn health(&self) -> Result<(), RelationshipError> {
        RelationshipService::health(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RelationshipService::metrics_snapshot(self)
    }
}
