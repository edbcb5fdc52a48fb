//! HTTP surface for the mentorship service.
//!
//! The Axum router maps each request onto one relationship operation:
//!
//! - `POST /mentors` – Create a mentor with an empty student list (`201`).
//! - `POST /students` – Create an unassigned student (`201`).
//! - `POST /assign-mentor/:mentorId` – Assign every unassigned student in `{"students": [...]}`
//!   to the mentor; returns `{ mentor, updatedStudents }`.
//! - `PUT /assign-mentor/:studentId/:mentorId` – Move a student to a mentor; returns
//!   `{ student, newMentor }`.
//! - `GET /mentor-students/:mentorId` – Resolved students of a mentor, in stored order.
//! - `GET /previous-mentor/:studentId` – Resolved mentor of a student, or `null`.
//! - `GET /metrics`, `GET /health`, `GET /commands` – Counters, store reachability, and a
//!   machine-readable endpoint catalog.
//!
//! Failures are returned as `{ "error": "<message>" }`: `404` when an id does not resolve,
//! `500` for everything else, with the underlying message passed through.

use crate::model::{EntityId, Mentor, NewMentor, NewStudent, Student, ValidationError};
use crate::relationship::{BulkAssignOutcome, ReassignOutcome, RelationshipApi, RelationshipError};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the relationship API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: RelationshipApi + 'static,
{
    // Both assignment routes name the first segment `:id`; the router rejects sibling
    // parameters with different names.
    Router::new()
        .route("/mentors", post(create_mentor::<S>))
        .route("/students", post(create_student::<S>))
        .route("/assign-mentor/:id", post(bulk_assign::<S>))
        .route("/assign-mentor/:id/:mentor_id", put(reassign::<S>))
        .route("/mentor-students/:id", get(list_mentor_students::<S>))
        .route("/previous-mentor/:id", get(previous_mentor::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/health", get(health::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Create a mentor from the posted fields.
async fn create_mentor<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<NewMentor>, JsonRejection>,
) -> Result<(StatusCode, Json<Mentor>), AppError>
where
    S: RelationshipApi,
{
    let Json(fields) = payload.map_err(malformed)?;
    let mentor = service.create_mentor(fields).await?;
    Ok((StatusCode::CREATED, Json(mentor)))
}

/// Create a student from the posted fields.
async fn create_student<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<Student>), AppError>
where
    S: RelationshipApi,
{
    let Json(fields) = payload.map_err(malformed)?;
    let student = service.create_student(fields).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// Request body for `POST /assign-mentor/:mentorId`.
#[derive(Deserialize)]
struct AssignRequest {
    /// Students to assign, processed in order.
    students: Vec<EntityId>,
}

/// Assign unassigned students to a mentor.
async fn bulk_assign<S>(
    State(service): State<Arc<S>>,
    Path(mentor_id): Path<String>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<Json<BulkAssignOutcome>, AppError>
where
    S: RelationshipApi,
{
    let Json(request) = payload.map_err(malformed)?;
    let outcome = service
        .bulk_assign(&EntityId::from(mentor_id), request.students)
        .await?;
    Ok(Json(outcome))
}

/// Assign or change the mentor of one student.
async fn reassign<S>(
    State(service): State<Arc<S>>,
    Path((student_id, mentor_id)): Path<(String, String)>,
) -> Result<Json<ReassignOutcome>, AppError>
where
    S: RelationshipApi,
{
    let outcome = service
        .reassign(&EntityId::from(student_id), &EntityId::from(mentor_id))
        .await?;
    Ok(Json(outcome))
}

/// List the students of a mentor.
async fn list_mentor_students<S>(
    State(service): State<Arc<S>>,
    Path(mentor_id): Path<String>,
) -> Result<Json<Vec<Student>>, AppError>
where
    S: RelationshipApi,
{
    let students = service
        .list_mentor_students(&EntityId::from(mentor_id))
        .await?;
    Ok(Json(students))
}

/// Show the mentor a student is assigned to; `null` when unassigned.
async fn previous_mentor<S>(
    State(service): State<Arc<S>>,
    Path(student_id): Path<String>,
) -> Result<Json<Option<Mentor>>, AppError>
where
    S: RelationshipApi,
{
    let mentor = service.previous_mentor(&EntityId::from(student_id)).await?;
    Ok(Json(mentor))
}

/// Return the relationship counters collected since startup.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: RelationshipApi,
{
    Json(service.metrics_snapshot())
}

/// Report whether the entity store answers.
async fn health<S>(State(service): State<Arc<S>>) -> Response
where
    S: RelationshipApi,
{
    match service.health().await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by clients and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "create_mentor",
                method: "POST",
                path: "/mentors",
                description: "Create a mentor. Responds 201 with the stored mentor and an empty students list.",
                request_example: Some(json!({ "name": "Grace Hopper", "subject": "Compilers" })),
            },
            CommandDescriptor {
                name: "create_student",
                method: "POST",
                path: "/students",
                description: "Create a student without a mentor. Responds 201 with the stored student.",
                request_example: Some(json!({ "name": "Ada", "age": 16, "grade": "10" })),
            },
            CommandDescriptor {
                name: "assign_students",
                method: "POST",
                path: "/assign-mentor/:mentorId",
                description: "Assign every listed student that has no mentor yet. Students that already have one are skipped. Response returns { \"mentor\": Mentor, \"updatedStudents\": [Student] }.",
                request_example: Some(json!({
                    "students": ["65f1c0ffee0000000000a001", "65f1c0ffee0000000000a002"]
                })),
            },
            CommandDescriptor {
                name: "change_mentor",
                method: "PUT",
                path: "/assign-mentor/:studentId/:mentorId",
                description: "Assign or change a student's mentor, removing the student from its previous mentor. Response returns { \"student\": Student, \"newMentor\": Mentor }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "mentor_students",
                method: "GET",
                path: "/mentor-students/:mentorId",
                description: "List the students assigned to a mentor, in assignment order.",
                request_example: None,
            },
            CommandDescriptor {
                name: "previous_mentor",
                method: "GET",
                path: "/previous-mentor/:studentId",
                description: "Show the mentor currently recorded on a student, or null.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return relationship counters useful for observability dashboards.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Check that the entity store is reachable.",
                request_example: None,
            },
        ],
    })
}

fn malformed(rejection: JsonRejection) -> AppError {
    AppError(ValidationError::Malformed(rejection.body_text()).into())
}

struct AppError(RelationshipError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!(error = %self.0, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<RelationshipError> for AppError {
    fn from(inner: RelationshipError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::config::PartialAssignPolicy;
    use crate::relationship::RelationshipService;
    use crate::store::{EntityStore, InMemoryStore};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(store: Arc<InMemoryStore>) -> Router {
        create_router(Arc::new(RelationshipService::new(
            store,
            PartialAssignPolicy::Keep,
        )))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header("content-type", "application/json");
        }
        let response = app
            .clone()
            .oneshot(
                request
                    .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn commands_catalog_exposes_assignment_endpoints() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let assign = commands
            .iter()
            .find(|cmd| cmd.name == "assign_students")
            .expect("assign command present");

        assert_eq!(assign.method, "POST");
        assert_eq!(assign.path, "/assign-mentor/:mentorId");
        assert!(commands.iter().any(|cmd| cmd.method == "PUT"));
    }

    #[tokio::test]
    async fn create_mentor_returns_created_record() {
        let app = router(Arc::new(InMemoryStore::new()));
        let (status, body) = send(
            &app,
            Method::POST,
            "/mentors",
            Some(r#"{"name":"Grace","subject":"Math","students":["x"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Grace");
        assert_eq!(body["students"], json!([]));
        assert!(body["_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn create_accepts_partial_records_as_sent() {
        let app = router(Arc::new(InMemoryStore::new()));
        let (status, body) = send(&app, Method::POST, "/mentors", Some(r#"{"subject":"Math"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.get("name").is_none());
        assert_eq!(body["subject"], "Math");

        let (status, body) = send(
            &app,
            Method::POST,
            "/students",
            Some(r#"{"name":"  Ada ","grade":"","age":"12"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "  Ada ");
        assert_eq!(body["grade"], "");
        assert_eq!(body["age"], 12);
    }

    #[tokio::test]
    async fn uncastable_age_is_server_error() {
        let app = router(Arc::new(InMemoryStore::new()));
        let (status, body) =
            send(&app, Method::POST, "/students", Some(r#"{"name":"A","age":"old"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            r#"Student validation failed: age: Cast to Number failed for value "old" (type string) at path "age""#
        );
    }

    #[tokio::test]
    async fn malformed_body_is_server_error_with_message() {
        let app = router(Arc::new(InMemoryStore::new()));
        let (status, body) = send(&app, Method::POST, "/students", Some(r#"{"name":"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = router(Arc::new(InMemoryStore::new()));
        let (status, body) = send(
            &app,
            Method::GET,
            "/mentor-students/65f1c0ffee0000000000beef",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Mentor not found");

        let (status, body) = send(&app, Method::GET, "/previous-mentor/not-an-object-id", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Student not found");
    }

    #[tokio::test]
    async fn store_failures_are_server_errors() {
        let store = Arc::new(InMemoryStore::new());
        let app = router(store.clone());
        store.close().await;

        let (status, body) = send(&app, Method::GET, "/previous-mentor/anything", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Entity store is closed");

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn metrics_reflect_requests() {
        let app = router(Arc::new(InMemoryStore::new()));
        send(&app, Method::POST, "/mentors", Some(r#"{"name":"Grace"}"#)).await;
        send(&app, Method::GET, "/previous-mentor/missing", None).await;

        let (status, body) = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mentors_created"], 1);
        assert_eq!(body["not_found"], 1);
    }
}
