//! Entity store integration: the persistence seam plus MongoDB and in-memory backends.

pub mod memory;
pub mod mongo;
pub mod types;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;
pub use types::{EntityStore, StoreError};
