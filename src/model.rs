//! Student and mentor records as exposed over HTTP and held by the entity stores.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use thiserror::Error;

/// Opaque, store-assigned identifier of a student or mentor.
///
/// Identifiers are rendered as the 24 hex digits of a MongoDB `ObjectId` regardless of which
/// store produced them, so clients never see a backend-specific format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(ObjectId::new().to_hex())
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the identifier as an `ObjectId`, if it has that shape.
    pub fn to_object_id(&self) -> Option<ObjectId> {
        ObjectId::parse_str(&self.0).ok()
    }
}

impl From<ObjectId> for EntityId {
    fn from(value: ObjectId) -> Self {
        Self(value.to_hex())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A student record. `mentor` is unset until an assignment operation sets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Store-assigned identifier.
    #[serde(rename = "_id")]
    pub id: EntityId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Age in years, kept in the numeric form it was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Number>,
    /// School grade or class label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    /// Mentor currently responsible for this student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentor: Option<EntityId>,
}

/// A mentor record with its ordered list of student references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mentor {
    /// Store-assigned identifier.
    #[serde(rename = "_id")]
    pub id: EntityId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Subject taught.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Students assigned to this mentor, in the order they were added.
    #[serde(default)]
    pub students: Vec<EntityId>,
}

impl Mentor {
    /// Drop every reference to `student` from the list.
    pub fn remove_student(&mut self, student: &EntityId) {
        self.students.retain(|id| id != student);
    }
}

/// Fields accepted when creating a student.
///
/// Values arrive as raw JSON and are cast field by field in [`NewStudent::validate`]. Unknown
/// fields, including `mentor`, are ignored: new students always start unassigned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStudent {
    /// Display name.
    #[serde(default)]
    pub name: Option<Value>,
    /// Age; a number, or a string or boolean that casts to one.
    #[serde(default)]
    pub age: Option<Value>,
    /// School grade or class label.
    #[serde(default)]
    pub grade: Option<Value>,
}

/// Fields accepted when creating a mentor.
///
/// Unknown fields, including `students`, are ignored: new mentors always start with no students.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMentor {
    /// Display name.
    #[serde(default)]
    pub name: Option<Value>,
    /// Subject taught.
    #[serde(default)]
    pub subject: Option<Value>,
}

/// Field-level rejection raised before a record reaches the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field held a value that cannot be cast to the field's type.
    #[error(
        "{entity} validation failed: {field}: Cast to {kind} failed for value {value} (type {value_type}) at path \"{field}\""
    )]
    Cast {
        /// Record type being validated.
        entity: &'static str,
        /// Offending field.
        field: &'static str,
        /// Target type of the field.
        kind: &'static str,
        /// The rejected value, rendered as JSON.
        value: String,
        /// JSON type of the rejected value.
        value_type: &'static str,
    },
    /// The request body could not be decoded into the record's fields.
    #[error("{0}")]
    Malformed(String),
}

/// Student fields after casting, ready to be inserted.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct StudentFields {
    pub name: Option<String>,
    pub age: Option<Number>,
    pub grade: Option<String>,
}

/// Mentor fields after casting, ready to be inserted.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct MentorFields {
    pub name: Option<String>,
    pub subject: Option<String>,
}

impl NewStudent {
    /// Cast each field to its stored type. Text is kept exactly as sent.
    pub fn validate(self) -> Result<StudentFields, ValidationError> {
        const ENTITY: &str = "Student";
        Ok(StudentFields {
            name: cast_string(ENTITY, "name", self.name)?,
            age: cast_number(ENTITY, "age", self.age)?,
            grade: cast_string(ENTITY, "grade", self.grade)?,
        })
    }
}

impl NewMentor {
    /// Cast each field to its stored type. Text is kept exactly as sent.
    pub fn validate(self) -> Result<MentorFields, ValidationError> {
        const ENTITY: &str = "Mentor";
        Ok(MentorFields {
            name: cast_string(ENTITY, "name", self.name)?,
            subject: cast_string(ENTITY, "subject", self.subject)?,
        })
    }
}

impl StudentFields {
    /// Materialize an unassigned student under `id`.
    pub fn into_student(self, id: EntityId) -> Student {
        Student {
            id,
            name: self.name,
            age: self.age,
            grade: self.grade,
            mentor: None,
        }
    }
}

impl MentorFields {
    /// Materialize a mentor with no students under `id`.
    pub fn into_mentor(self, id: EntityId) -> Mentor {
        Mentor {
            id,
            name: self.name,
            subject: self.subject,
            students: Vec::new(),
        }
    }
}

/// Scalars become their text form; `null` leaves the field unset.
fn cast_string(
    entity: &'static str,
    field: &'static str,
    value: Option<Value>,
) -> Result<Option<String>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(cast_error(entity, field, "string", &other)),
    }
}

/// Numbers pass through, numeric strings are parsed, booleans become 1 or 0, and `null` or a
/// blank string leaves the field unset.
fn cast_number(
    entity: &'static str,
    field: &'static str,
    value: Option<Value>,
) -> Result<Option<Number>, ValidationError> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => return Ok(Some(number)),
        Some(Value::Bool(flag)) => return Ok(Some(Number::from(u8::from(flag)))),
        Some(Value::String(text)) => text,
        Some(other) => return Err(cast_error(entity, field, "Number", &other)),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_number(trimmed)
        .map(Some)
        .ok_or_else(|| cast_error(entity, field, "Number", &Value::String(text.clone())))
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(integer) = text.parse::<i64>() {
        return Some(Number::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .and_then(Number::from_f64)
}

fn cast_error(
    entity: &'static str,
    field: &'static str,
    kind: &'static str,
    value: &Value,
) -> ValidationError {
    let value_type = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::Cast {
        entity,
        field,
        kind,
        value: value.to_string(),
        value_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_student(payload: Value) -> Result<StudentFields, ValidationError> {
        serde_json::from_value::<NewStudent>(payload)
            .expect("decode")
            .validate()
    }

    #[test]
    fn generated_ids_are_object_id_hex() {
        let id = EntityId::generate();
        assert_eq!(id.as_str().len(), 24);
        assert!(id.to_object_id().is_some());
        assert!(EntityId::from("not-an-id").to_object_id().is_none());
    }

    #[test]
    fn student_fields_ignore_mentor_in_payload() {
        let fields = new_student(json!({
            "name": "Ada",
            "age": 14,
            "grade": "9",
            "mentor": "65f000000000000000000001"
        }))
        .expect("valid");
        let student = fields.into_student(EntityId::from("65f000000000000000000002"));
        assert_eq!(student.name.as_deref(), Some("Ada"));
        assert_eq!(student.age, Some(Number::from(14)));
        assert_eq!(student.mentor, None);
    }

    #[test]
    fn text_is_stored_verbatim() {
        let fields = new_student(json!({ "name": "  Ada ", "grade": "" })).expect("valid");
        assert_eq!(fields.name.as_deref(), Some("  Ada "));
        assert_eq!(fields.grade.as_deref(), Some(""));
    }

    #[test]
    fn mentor_fields_ignore_students_in_payload() {
        let payload = json!({
            "name": "Grace",
            "subject": "Math",
            "students": ["65f000000000000000000001"]
        });
        let mentor = serde_json::from_value::<NewMentor>(payload)
            .expect("decode")
            .validate()
            .expect("valid")
            .into_mentor(EntityId::generate());
        assert!(mentor.students.is_empty());
        assert_eq!(mentor.subject.as_deref(), Some("Math"));
    }

    #[test]
    fn every_field_is_optional() {
        let mentor = NewMentor {
            name: None,
            subject: Some(json!("Math")),
        }
        .validate()
        .expect("name is optional");
        assert_eq!(mentor.name, None);
        assert_eq!(new_student(json!({})).expect("empty"), StudentFields::default());
    }

    #[test]
    fn age_accepts_values_that_cast_to_numbers() {
        assert_eq!(new_student(json!({ "age": "12" })).unwrap().age, Some(Number::from(12)));
        assert_eq!(new_student(json!({ "age": " 7.5 " })).unwrap().age, Number::from_f64(7.5));
        assert_eq!(new_student(json!({ "age": true })).unwrap().age, Some(Number::from(1)));
        assert_eq!(new_student(json!({ "age": "" })).unwrap().age, None);
        assert_eq!(new_student(json!({ "age": null })).unwrap().age, None);
        assert_eq!(new_student(json!({ "age": -3 })).unwrap().age, Some(Number::from(-3)));
    }

    #[test]
    fn uncastable_age_is_rejected() {
        let err = new_student(json!({ "name": "Linus", "age": "twelve" })).expect_err("not a number");
        assert_eq!(
            err.to_string(),
            "Student validation failed: age: Cast to Number failed for value \"twelve\" (type string) at path \"age\""
        );
        assert!(new_student(json!({ "age": "NaN" })).is_err());
    }

    #[test]
    fn scalars_cast_to_text_and_objects_do_not() {
        let fields = new_student(json!({ "name": 42, "grade": false })).expect("scalars");
        assert_eq!(fields.name.as_deref(), Some("42"));
        assert_eq!(fields.grade.as_deref(), Some("false"));

        let err = NewMentor {
            name: Some(json!({ "first": "Grace" })),
            subject: None,
        }
        .validate()
        .expect_err("object name");
        assert!(matches!(err, ValidationError::Cast { field: "name", kind: "string", .. }));
    }

    #[test]
    fn unassigned_student_omits_unset_fields() {
        let student = Student {
            id: EntityId::from("65f000000000000000000003"),
            name: Some("Ken".into()),
            age: None,
            grade: None,
            mentor: None,
        };
        let value = serde_json::to_value(&student).expect("serialize");
        assert_eq!(value, json!({ "_id": "65f000000000000000000003", "name": "Ken" }));
    }

    #[test]
    fn remove_student_drops_every_occurrence() {
        let student = EntityId::from("a");
        let mut mentor = Mentor {
            id: EntityId::from("m"),
            name: Some("Barbara".into()),
            subject: None,
            students: vec![student.clone(), EntityId::from("b"), student.clone()],
        };
        mentor.remove_student(&student);
        assert_eq!(mentor.students, vec![EntityId::from("b")]);
    }
}
