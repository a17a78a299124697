//! Bed and room assignment core.
//!
//! Matching occupants to physical beds under hard constraints: overlap
//! detection before any commit, configurable rule evaluation, a greedy
//! optimization pass over pending demand, and a live per-room availability
//! signal with threshold alerting.

pub mod availability;
pub mod conflict;
pub mod domain;
pub mod memory;
pub mod optimizer;
pub mod router;
pub mod rules;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use availability::{
    AlertKind, AlertSeverity, AvailabilityAlert, AvailabilityRecord, DemandLevel, DemandWindow,
};
pub use conflict::{find_overlaps, OverlapConflict, StayWindow};
pub use domain::{
    AlertId, Assignment, AssignmentConflict, AssignmentHistory, AssignmentId, AssignmentStatus,
    Bed, BedId, BedKind, BedStatus, BunkLevel, ConflictId, ConflictResolution, ConflictSeverity,
    ConflictStatus, HistoryChange, HistoryFilter, HostelId, NewAssignment, OccupantId, RoomId,
    RuleId,
};
pub use memory::{MemoryAllocationStore, MemoryAvailabilityStore};
pub use optimizer::{
    MatchWeights, OptimizationOutcome, OptimizationParams, OptimizationRecord, PendingRequest,
};
pub use router::allocation_router;
pub use rules::{AssignmentRule, ContextValue, Predicate, RequestContext, RuleOutcome};
pub use service::{AllocationConfig, AllocationService};
pub use store::{AllocationStore, AssignmentCommit, AvailabilityStore, StoreError};

/// Error raised by the allocation core.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// Malformed input; reported to the caller, never retried.
    #[error("invalid request: {0}")]
    Validation(String),
    /// A referenced bed, assignment, rule, conflict, or alert is missing.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    /// The requested window overlaps existing stays, or a concurrent write
    /// won the race at commit time (in which case `conflicts` is empty and
    /// the whole operation may be retried).
    #[error("requested stay conflicts with existing assignments")]
    Conflict { conflicts: Vec<OverlapConflict> },
    /// The target bed is not functional/available at commit time.
    #[error("bed {bed_id} is not available: {reason}")]
    NotAvailable { bed_id: BedId, reason: String },
    /// A lifecycle invariant was violated, e.g. reactivating a terminal
    /// assignment.
    #[error("business rule violation: {0}")]
    BusinessRule(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AllocationError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
