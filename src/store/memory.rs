//! Process-local entity store.
//!
//! Records live in two maps behind a single `RwLock`. Each trait call takes the lock once, so
//! individual reads and writes are atomic while multi-step operations interleave exactly as they
//! would against MongoDB.

use crate::model::{EntityId, Mentor, MentorFields, Student, StudentFields};
use crate::store::types::{EntityStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Records {
    students: HashMap<EntityId, Student>,
    mentors: HashMap<EntityId, Mentor>,
}

/// In-memory implementation of [`EntityStore`].
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Records>,
    closed: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a mentor without touching the students that reference it.
    ///
    /// The API never deletes records; this exists to reproduce records removed by other
    /// writers, which leaves dangling `mentor` references behind.
    pub async fn remove_mentor(&self, id: &EntityId) -> Option<Mentor> {
        self.records.write().await.mentors.remove(id)
    }

    /// Delete a student without touching the mentors that reference it.
    pub async fn remove_student(&self, id: &EntityId) -> Option<Student> {
        self.records.write().await.students.remove(id)
    }

    /// Number of stored students and mentors.
    pub async fn counts(&self) -> (usize, usize) {
        let records = self.records.read().await;
        (records.students.len(), records.mentors.len())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn insert_mentor(&self, fields: MentorFields) -> Result<Mentor, StoreError> {
        self.ensure_open()?;
        let mentor = fields.into_mentor(EntityId::generate());
        self.records
            .write()
            .await
            .mentors
            .insert(mentor.id.clone(), mentor.clone());
        Ok(mentor)
    }

    async fn insert_student(&self, fields: StudentFields) -> Result<Student, StoreError> {
        self.ensure_open()?;
        let student = fields.into_student(EntityId::generate());
        self.records
            .write()
            .await
            .students
            .insert(student.id.clone(), student.clone());
        Ok(student)
    }

    async fn find_mentor(&self, id: &EntityId) -> Result<Option<Mentor>, StoreError> {
        self.ensure_open()?;
        Ok(self.records.read().await.mentors.get(id).cloned())
    }

    async fn find_student(&self, id: &EntityId) -> Result<Option<Student>, StoreError> {
        self.ensure_open()?;
        Ok(self.records.read().await.students.get(id).cloned())
    }

    async fn find_students(&self, ids: &[EntityId]) -> Result<Vec<Student>, StoreError> {
        self.ensure_open()?;
        let records = self.records.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| records.students.get(id).cloned())
            .collect())
    }

    async fn save_mentor(&self, mentor: &Mentor) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut records = self.records.write().await;
        match records.mentors.get_mut(&mentor.id) {
            Some(stored) => stored.students = mentor.students.clone(),
            None => tracing::warn!(mentor_id = %mentor.id, "Mentor record vanished before save"),
        }
        Ok(())
    }

    async fn push_student(
        &self,
        mentor: &EntityId,
        student: &EntityId,
    ) -> Result<Option<Mentor>, StoreError> {
        self.ensure_open()?;
        let mut records = self.records.write().await;
        Ok(records.mentors.get_mut(mentor).map(|stored| {
            stored.students.push(student.clone());
            stored.clone()
        }))
    }

    async fn save_student(&self, student: &Student) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut records = self.records.write().await;
        match records.students.get_mut(&student.id) {
            Some(stored) => stored.mentor = student.mentor.clone(),
            None => tracing::warn!(student_id = %student.id, "Student record vanished before save"),
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentor_fields(name: &str) -> MentorFields {
        MentorFields {
            name: Some(name.into()),
            subject: None,
        }
    }

    fn student_fields(name: &str) -> StudentFields {
        StudentFields {
            name: Some(name.into()),
            age: Some(12.into()),
            grade: Some("7".into()),
        }
    }

    #[tokio::test]
    async fn inserted_records_are_found_by_id() {
        let store = InMemoryStore::new();
        let mentor = store.insert_mentor(mentor_fields("Grace")).await.unwrap();
        let student = store.insert_student(student_fields("Ada")).await.unwrap();

        assert_eq!(store.find_mentor(&mentor.id).await.unwrap(), Some(mentor));
        assert_eq!(store.find_student(&student.id).await.unwrap(), Some(student));
        assert_eq!(
            store.find_student(&EntityId::from("unknown")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn saves_only_touch_relationship_fields() {
        let store = InMemoryStore::new();
        let mentor = store.insert_mentor(mentor_fields("Grace")).await.unwrap();
        let mut student = store.insert_student(student_fields("Ada")).await.unwrap();

        student.name = Some("changed locally".into());
        student.mentor = Some(mentor.id.clone());
        store.save_student(&student).await.unwrap();

        let stored = store.find_student(&student.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Ada"));
        assert_eq!(stored.mentor, Some(mentor.id));
    }

    #[tokio::test]
    async fn find_students_resolves_in_reference_order() {
        let store = InMemoryStore::new();
        let first = store.insert_student(student_fields("first")).await.unwrap();
        let second = store.insert_student(student_fields("second")).await.unwrap();

        let resolved = store
            .find_students(&[
                second.id.clone(),
                EntityId::generate(),
                first.id.clone(),
            ])
            .await
            .unwrap();
        assert_eq!(resolved, vec![second, first]);
    }

    #[tokio::test]
    async fn push_appends_to_the_stored_list() {
        let store = InMemoryStore::new();
        let mentor = store.insert_mentor(mentor_fields("Grace")).await.unwrap();
        let first = EntityId::generate();
        let second = EntityId::generate();

        // Both callers hold the same stale copy; neither append is lost.
        let stale = store.find_mentor(&mentor.id).await.unwrap().unwrap();
        store.push_student(&stale.id, &first).await.unwrap();
        let pushed = store
            .push_student(&stale.id, &second)
            .await
            .unwrap()
            .expect("mentor exists");

        assert_eq!(pushed.students, vec![first, second]);
        assert_eq!(store.find_mentor(&mentor.id).await.unwrap(), Some(pushed));
        assert_eq!(
            store
                .push_student(&EntityId::generate(), &EntityId::generate())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn closed_store_rejects_operations() {
        let store = InMemoryStore::new();
        store.close().await;
        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
        assert!(matches!(
            store.insert_mentor(mentor_fields("late")).await,
            Err(StoreError::Closed)
        ));
    }
}
