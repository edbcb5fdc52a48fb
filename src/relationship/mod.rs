//! Student/mentor assignment rules over the entity store.

mod service;
pub mod types;

pub use service::{RelationshipApi, RelationshipService};
pub use types::{BulkAssignOutcome, ReassignOutcome, RelationshipError};
