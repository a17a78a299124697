use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::allocation::availability::{AvailabilityAlert, AvailabilityRecord, DemandWindow};
use crate::allocation::domain::{
    AlertId, Assignment, AssignmentConflict, AssignmentHistory, AssignmentId, Bed, BedId, BedKind,
    BunkLevel, ConflictId, HistoryFilter, HostelId, NewAssignment, OccupantId, RoomId, RuleId,
};
use crate::allocation::memory::{MemoryAllocationStore, MemoryAvailabilityStore};
use crate::allocation::optimizer::OptimizationRecord;
use crate::allocation::rules::AssignmentRule;
use crate::allocation::service::{AllocationConfig, AllocationService};
use crate::allocation::store::{
    AllocationStore, AssignmentCommit, AvailabilityStore, StoreError,
};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn bed_in(id: &str, room: &str) -> Bed {
    Bed::new(
        BedId(id.to_string()),
        RoomId(room.to_string()),
        BedKind::Single,
        BunkLevel::Standalone,
    )
}

pub(super) fn new_assignment(bed: &str, occupant: &str) -> NewAssignment {
    NewAssignment {
        bed_id: BedId(bed.to_string()),
        occupant_id: OccupantId(occupant.to_string()),
        occupied_from: date(2024, 3, 1),
        expected_vacate: Some(date(2024, 6, 1)),
        monthly_rent: Some(480),
    }
}

pub(super) fn build_service() -> (
    Arc<AllocationService<MemoryAllocationStore, MemoryAvailabilityStore>>,
    Arc<MemoryAllocationStore>,
    Arc<MemoryAvailabilityStore>,
) {
    let store = Arc::new(MemoryAllocationStore::default());
    let availability = Arc::new(MemoryAvailabilityStore::default());
    let service = Arc::new(AllocationService::new(
        store.clone(),
        availability.clone(),
        AllocationConfig::default(),
    ));
    (service, store, availability)
}

/// Store whose every call fails, for surfacing storage errors at the edges.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn offline<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl AllocationStore for UnavailableStore {
    fn bed(&self, _id: &BedId) -> Result<Option<Bed>, StoreError> {
        Self::offline()
    }

    fn beds_in_room(&self, _room: &RoomId) -> Result<Vec<Bed>, StoreError> {
        Self::offline()
    }

    fn assignment(&self, _id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        Self::offline()
    }

    fn active_assignments(&self, _bed: &BedId) -> Result<Vec<Assignment>, StoreError> {
        Self::offline()
    }

    fn commit(&self, _commit: AssignmentCommit) -> Result<(), StoreError> {
        Self::offline()
    }

    fn history(
        &self,
        _filter: &HistoryFilter,
        _limit: usize,
    ) -> Result<Vec<AssignmentHistory>, StoreError> {
        Self::offline()
    }

    fn record_conflict(&self, _conflict: AssignmentConflict) -> Result<(), StoreError> {
        Self::offline()
    }

    fn conflict(&self, _id: &ConflictId) -> Result<Option<AssignmentConflict>, StoreError> {
        Self::offline()
    }

    fn update_conflict(&self, _conflict: AssignmentConflict) -> Result<(), StoreError> {
        Self::offline()
    }

    fn rules(&self, _hostel: &HostelId) -> Result<Vec<AssignmentRule>, StoreError> {
        Self::offline()
    }

    fn record_rule_execution(&self, _rule: &RuleId, _matched: bool) -> Result<(), StoreError> {
        Self::offline()
    }

    fn record_optimization(&self, _record: OptimizationRecord) -> Result<(), StoreError> {
        Self::offline()
    }
}

/// Store that reads normally but loses every commit, simulating a concurrent
/// writer that always gets there first.
#[derive(Default)]
pub(super) struct RacingStore {
    inner: MemoryAllocationStore,
}

impl RacingStore {
    pub(super) fn seed_bed(&self, bed: Bed) {
        self.inner.insert_bed(bed);
    }
}

impl AllocationStore for RacingStore {
    fn bed(&self, id: &BedId) -> Result<Option<Bed>, StoreError> {
        self.inner.bed(id)
    }

    fn beds_in_room(&self, room: &RoomId) -> Result<Vec<Bed>, StoreError> {
        self.inner.beds_in_room(room)
    }

    fn assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        self.inner.assignment(id)
    }

    fn active_assignments(&self, bed: &BedId) -> Result<Vec<Assignment>, StoreError> {
        self.inner.active_assignments(bed)
    }

    fn commit(&self, _commit: AssignmentCommit) -> Result<(), StoreError> {
        Err(StoreError::Conflict)
    }

    fn history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<AssignmentHistory>, StoreError> {
        self.inner.history(filter, limit)
    }

    fn record_conflict(&self, conflict: AssignmentConflict) -> Result<(), StoreError> {
        self.inner.record_conflict(conflict)
    }

    fn conflict(&self, id: &ConflictId) -> Result<Option<AssignmentConflict>, StoreError> {
        self.inner.conflict(id)
    }

    fn update_conflict(&self, conflict: AssignmentConflict) -> Result<(), StoreError> {
        self.inner.update_conflict(conflict)
    }

    fn rules(&self, hostel: &HostelId) -> Result<Vec<AssignmentRule>, StoreError> {
        self.inner.rules(hostel)
    }

    fn record_rule_execution(&self, rule: &RuleId, matched: bool) -> Result<(), StoreError> {
        self.inner.record_rule_execution(rule, matched)
    }

    fn record_optimization(&self, record: OptimizationRecord) -> Result<(), StoreError> {
        self.inner.record_optimization(record)
    }
}

/// Availability store whose demand window reads fail while everything else
/// works, for exercising the degrade-to-low path.
#[derive(Default)]
pub(super) struct BrokenDemandStore {
    inner: MemoryAvailabilityStore,
}

impl AvailabilityStore for BrokenDemandStore {
    fn availability(&self, room: &RoomId) -> Result<Option<AvailabilityRecord>, StoreError> {
        self.inner.availability(room)
    }

    fn save_availability(&self, record: AvailabilityRecord) -> Result<(), StoreError> {
        self.inner.save_availability(record)
    }

    fn demand(&self, _room: &RoomId) -> Result<DemandWindow, StoreError> {
        Err(StoreError::Unavailable("demand counters offline".to_string()))
    }

    fn save_demand(&self, room: &RoomId, window: DemandWindow) -> Result<(), StoreError> {
        self.inner.save_demand(room, window)
    }

    fn open_alerts(&self, room: &RoomId) -> Result<Vec<AvailabilityAlert>, StoreError> {
        self.inner.open_alerts(room)
    }

    fn upsert_alert(&self, alert: AvailabilityAlert) -> Result<AvailabilityAlert, StoreError> {
        self.inner.upsert_alert(alert)
    }

    fn alert(&self, id: &AlertId) -> Result<Option<AvailabilityAlert>, StoreError> {
        self.inner.alert(id)
    }

    fn update_alert(&self, alert: AvailabilityAlert) -> Result<(), StoreError> {
        self.inner.update_alert(alert)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
