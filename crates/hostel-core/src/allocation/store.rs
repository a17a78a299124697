//! Storage contracts for the allocation core.
//!
//! The write path is optimistic: callers read beds (with their versions), run
//! the conflict check, then submit one [`AssignmentCommit`] carrying every
//! write for the operation. The store applies the commit atomically and
//! rejects it with [`StoreError::Conflict`] when any expected bed version has
//! moved, so two racing writers can never both succeed.

use super::availability::{AvailabilityAlert, AvailabilityRecord, DemandWindow};
use super::domain::{
    AlertId, Assignment, AssignmentConflict, AssignmentHistory, AssignmentId, Bed, BedId,
    ConflictId, HistoryFilter, HostelId, RoomId, RuleId,
};
use super::optimizer::OptimizationRecord;
use super::rules::AssignmentRule;

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("write conflicted with a concurrent update")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// All-or-nothing write batch for one lifecycle operation. `expected_beds`
/// carries the versions observed during the read phase; the store must reject
/// the whole batch if any of them has changed.
#[derive(Debug, Clone, Default)]
pub struct AssignmentCommit {
    pub expected_beds: Vec<(BedId, u64)>,
    pub bed_writes: Vec<Bed>,
    pub assignment_writes: Vec<Assignment>,
    pub history_writes: Vec<AssignmentHistory>,
}

/// Storage abstraction for beds, assignments, history, rules, conflicts, and
/// optimization records.
pub trait AllocationStore: Send + Sync {
    fn bed(&self, id: &BedId) -> Result<Option<Bed>, StoreError>;
    fn beds_in_room(&self, room: &RoomId) -> Result<Vec<Bed>, StoreError>;
    fn assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError>;
    fn active_assignments(&self, bed: &BedId) -> Result<Vec<Assignment>, StoreError>;

    /// Apply a commit atomically, or fail it without any partial write.
    fn commit(&self, commit: AssignmentCommit) -> Result<(), StoreError>;

    /// Matching entries in chronological order. When more than `limit`
    /// match, the oldest are dropped.
    fn history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<AssignmentHistory>, StoreError>;

    fn record_conflict(&self, conflict: AssignmentConflict) -> Result<(), StoreError>;
    fn conflict(&self, id: &ConflictId) -> Result<Option<AssignmentConflict>, StoreError>;
    fn update_conflict(&self, conflict: AssignmentConflict) -> Result<(), StoreError>;

    /// Rules for a hostel, ordered by `(priority asc, execution_order asc)`.
    fn rules(&self, hostel: &HostelId) -> Result<Vec<AssignmentRule>, StoreError>;
    fn record_rule_execution(&self, rule: &RuleId, matched: bool) -> Result<(), StoreError>;

    fn record_optimization(&self, record: OptimizationRecord) -> Result<(), StoreError>;
}

/// Storage abstraction for the per-room availability signal.
pub trait AvailabilityStore: Send + Sync {
    fn availability(&self, room: &RoomId) -> Result<Option<AvailabilityRecord>, StoreError>;
    fn save_availability(&self, record: AvailabilityRecord) -> Result<(), StoreError>;

    fn demand(&self, room: &RoomId) -> Result<DemandWindow, StoreError>;
    fn save_demand(&self, room: &RoomId, window: DemandWindow) -> Result<(), StoreError>;

    fn open_alerts(&self, room: &RoomId) -> Result<Vec<AvailabilityAlert>, StoreError>;

    /// Insert an alert unless one of the same kind is already open for the
    /// room, in which case the open alert is returned unchanged. Evaluate-
    /// and-upsert in one step so concurrent triggers cannot duplicate.
    fn upsert_alert(&self, alert: AvailabilityAlert) -> Result<AvailabilityAlert, StoreError>;

    fn alert(&self, id: &AlertId) -> Result<Option<AvailabilityAlert>, StoreError>;
    fn update_alert(&self, alert: AvailabilityAlert) -> Result<(), StoreError>;
}
