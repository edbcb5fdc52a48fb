//! MongoDB-backed entity store.

use crate::model::{EntityId, Mentor, MentorFields, Student, StudentFields};
use crate::store::types::{EntityStore, StoreError, order_by_references};
use async_trait::async_trait;
use bson::{Bson, doc, oid::ObjectId};
use futures_util::TryStreamExt;
use mongodb::{
    Client, Collection, Database,
    options::{ClientOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::time::Duration;

/// Collection holding student documents.
pub const STUDENT_COLLECTION: &str = "students";
/// Collection holding mentor documents.
pub const MENTOR_COLLECTION: &str = "mentors";

const APP_NAME: &str = "mentorship";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Student document as persisted in MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StudentDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mentor: Option<ObjectId>,
}

/// Mentor document as persisted in MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MentorDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default)]
    students: Vec<ObjectId>,
}

impl From<StudentDoc> for Student {
    fn from(doc: StudentDoc) -> Self {
        Self {
            id: doc.id.into(),
            name: doc.name,
            age: doc.age,
            grade: doc.grade,
            mentor: doc.mentor.map(EntityId::from),
        }
    }
}

impl From<MentorDoc> for Mentor {
    fn from(doc: MentorDoc) -> Self {
        Self {
            id: doc.id.into(),
            name: doc.name,
            subject: doc.subject,
            students: doc.students.into_iter().map(EntityId::from).collect(),
        }
    }
}

/// Entity store over the official MongoDB driver.
///
/// Construct once at startup with [`MongoStore::connect`] and share it behind an `Arc`. The
/// driver pools connections internally, so a single handle serves every request.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
    students: Collection<StudentDoc>,
    mentors: Collection<MentorDoc>,
}

impl MongoStore {
    /// Connect to `uri`, select `database`, and verify reachability with a `ping`.
    ///
    /// Connect and server-selection timeouts default to five seconds unless the URI sets them.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_string());
        options.connect_timeout.get_or_insert(CONNECT_TIMEOUT);
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);

        let client =
            Client::with_options(options).map_err(|err| StoreError::Connection(err.to_string()))?;
        let db = client.database(database);
        let store = Self {
            students: db.collection(STUDENT_COLLECTION),
            mentors: db.collection(MENTOR_COLLECTION),
            database: db,
            client,
        };

        store
            .ping()
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        tracing::info!(database, "Connected to MongoDB");
        Ok(store)
    }
}

fn object_id(id: &EntityId) -> Result<ObjectId, StoreError> {
    id.to_object_id()
        .ok_or_else(|| StoreError::InvalidReference(id.clone()))
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn insert_mentor(&self, fields: MentorFields) -> Result<Mentor, StoreError> {
        let doc = MentorDoc {
            id: ObjectId::new(),
            name: fields.name,
            subject: fields.subject,
            students: Vec::new(),
        };
        self.mentors.insert_one(&doc).await?;
        tracing::debug!(mentor_id = %doc.id, "Mentor document inserted");
        Ok(doc.into())
    }

    async fn insert_student(&self, fields: StudentFields) -> Result<Student, StoreError> {
        let doc = StudentDoc {
            id: ObjectId::new(),
            name: fields.name,
            age: fields.age,
            grade: fields.grade,
            mentor: None,
        };
        self.students.insert_one(&doc).await?;
        tracing::debug!(student_id = %doc.id, "Student document inserted");
        Ok(doc.into())
    }

    async fn find_mentor(&self, id: &EntityId) -> Result<Option<Mentor>, StoreError> {
        let Some(oid) = id.to_object_id() else {
            return Ok(None);
        };
        let found = self.mentors.find_one(doc! { "_id": oid }).await?;
        Ok(found.map(Mentor::from))
    }

    async fn find_student(&self, id: &EntityId) -> Result<Option<Student>, StoreError> {
        let Some(oid) = id.to_object_id() else {
            return Ok(None);
        };
        let found = self.students.find_one(doc! { "_id": oid }).await?;
        Ok(found.map(Student::from))
    }

    async fn find_students(&self, ids: &[EntityId]) -> Result<Vec<Student>, StoreError> {
        let oids: Vec<ObjectId> = ids.iter().filter_map(EntityId::to_object_id).collect();
        if oids.is_empty() {
            return Ok(Vec::new());
        }

        let docs: Vec<StudentDoc> = self
            .students
            .find(doc! { "_id": { "$in": oids } })
            .await?
            .try_collect()
            .await?;
        let found = docs.into_iter().map(Student::from).collect();
        Ok(order_by_references(ids, found))
    }

    async fn save_mentor(&self, mentor: &Mentor) -> Result<(), StoreError> {
        let oid = object_id(&mentor.id)?;
        let students = mentor
            .students
            .iter()
            .map(|id| object_id(id).map(Bson::ObjectId))
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .mentors
            .update_one(doc! { "_id": oid }, doc! { "$set": { "students": students } })
            .await?;
        if result.matched_count == 0 {
            tracing::warn!(mentor_id = %mentor.id, "Mentor document vanished before save");
        }
        Ok(())
    }

    async fn push_student(
        &self,
        mentor: &EntityId,
        student: &EntityId,
    ) -> Result<Option<Mentor>, StoreError> {
        let Some(oid) = mentor.to_object_id() else {
            return Ok(None);
        };
        let student = object_id(student)?;
        let updated = self
            .mentors
            .find_one_and_update(doc! { "_id": oid }, doc! { "$push": { "students": student } })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Mentor::from))
    }

    async fn save_student(&self, student: &Student) -> Result<(), StoreError> {
        let oid = object_id(&student.id)?;
        let update = match &student.mentor {
            Some(mentor) => {
                let mentor = object_id(mentor)?;
                doc! { "$set": { "mentor": mentor } }
            }
            None => doc! { "$unset": { "mentor": "" } },
        };

        let result = self.students.update_one(doc! { "_id": oid }, update).await?;
        if result.matched_count == 0 {
            tracing::warn!(student_id = %student.id, "Student document vanished before save");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn close(&self) {
        tracing::info!("Shutting down MongoDB client");
        self.client.clone().shutdown().await;
    }
}
