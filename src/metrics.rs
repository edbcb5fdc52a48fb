use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing relationship activity since startup.
#[derive(Default)]
pub struct RelationshipMetrics {
    mentors_created: AtomicU64,
    students_created: AtomicU64,
    students_assigned: AtomicU64,
    students_skipped: AtomicU64,
    reassignments: AtomicU64,
    not_found: AtomicU64,
}

impl RelationshipMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created mentor.
    pub fn record_mentor_created(&self) {
        self.mentors_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a created student.
    pub fn record_student_created(&self) {
        self.students_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a completed bulk assignment.
    pub fn record_bulk_assign(&self, assigned: u64, skipped: u64) {
        self.students_assigned.fetch_add(assigned, Ordering::Relaxed);
        self.students_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record a completed reassignment.
    pub fn record_reassignment(&self) {
        self.reassignments.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an operation rejected because an id did not resolve.
    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mentors_created: self.mentors_created.load(Ordering::Relaxed),
            students_created: self.students_created.load(Ordering::Relaxed),
            students_assigned: self.students_assigned.load(Ordering::Relaxed),
            students_skipped: self.students_skipped.load(Ordering::Relaxed),
            reassignments: self.reassignments.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of relationship counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Mentors created since startup.
    pub mentors_created: u64,
    /// Students created since startup.
    pub students_created: u64,
    /// Students newly assigned through bulk assignment.
    pub students_assigned: u64,
    /// Students left untouched by bulk assignment because they already had a mentor.
    pub students_skipped: u64,
    /// Completed reassignments.
    pub reassignments: u64,
    /// Requests rejected because a mentor or student id did not resolve.
    pub not_found: u64,
}
