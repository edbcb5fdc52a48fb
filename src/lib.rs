#![deny(missing_docs)]

//! Core library for the mentorship relationship API.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Relationship counters.
pub mod metrics;
/// Student and mentor records.
pub mod model;
/// Assignment rules linking students and mentors.
pub mod relationship;
/// Entity store integration (MongoDB and in-memory).
pub mod store;
