//! In-memory store implementations backing tests, the demo command, and the
//! API service. A single mutex per store stands in for the database
//! transaction: every commit is applied (or rejected) under one lock
//! acquisition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::availability::{AvailabilityAlert, AvailabilityRecord, DemandWindow};
use super::domain::{
    AlertId, Assignment, AssignmentConflict, AssignmentHistory, AssignmentId, AssignmentStatus,
    Bed, BedId, ConflictId, HistoryFilter, HostelId, RoomId, RuleId,
};
use super::optimizer::OptimizationRecord;
use super::rules::AssignmentRule;
use super::store::{AllocationStore, AssignmentCommit, AvailabilityStore, StoreError};

#[derive(Default)]
struct AllocationState {
    beds: HashMap<BedId, Bed>,
    assignments: HashMap<AssignmentId, Assignment>,
    history: Vec<AssignmentHistory>,
    conflicts: HashMap<ConflictId, AssignmentConflict>,
    rules: HashMap<RuleId, AssignmentRule>,
    optimizations: Vec<OptimizationRecord>,
}

/// In-memory [`AllocationStore`].
#[derive(Default, Clone)]
pub struct MemoryAllocationStore {
    state: Arc<Mutex<AllocationState>>,
}

impl MemoryAllocationStore {
    /// Seed a bed directly, bypassing the commit protocol. Setup helper for
    /// tests and the demo.
    pub fn insert_bed(&self, bed: Bed) {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");
        state.beds.insert(bed.id.clone(), bed);
    }

    /// Seed or replace a rule definition.
    pub fn upsert_rule(&self, rule: AssignmentRule) {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");
        state.rules.insert(rule.id.clone(), rule);
    }

    pub fn optimizations(&self) -> Vec<OptimizationRecord> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        state.optimizations.clone()
    }

    pub fn conflicts(&self) -> Vec<AssignmentConflict> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        state.conflicts.values().cloned().collect()
    }

    pub fn rule(&self, id: &RuleId) -> Option<AssignmentRule> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        state.rules.get(id).cloned()
    }
}

impl AllocationStore for MemoryAllocationStore {
    fn bed(&self, id: &BedId) -> Result<Option<Bed>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        Ok(state.beds.get(id).cloned())
    }

    fn beds_in_room(&self, room: &RoomId) -> Result<Vec<Bed>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        let mut beds: Vec<Bed> = state
            .beds
            .values()
            .filter(|bed| &bed.room_id == room)
            .cloned()
            .collect();
        beds.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(beds)
    }

    fn assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        Ok(state.assignments.get(id).cloned())
    }

    fn active_assignments(&self, bed: &BedId) -> Result<Vec<Assignment>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        Ok(state
            .assignments
            .values()
            .filter(|assignment| {
                &assignment.bed_id == bed && assignment.status == AssignmentStatus::Active
            })
            .cloned()
            .collect())
    }

    fn commit(&self, commit: AssignmentCommit) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");

        for (bed_id, expected_version) in &commit.expected_beds {
            let current = state.beds.get(bed_id).ok_or(StoreError::NotFound)?;
            if current.version != *expected_version {
                return Err(StoreError::Conflict);
            }
        }

        for mut bed in commit.bed_writes {
            bed.version += 1;
            state.beds.insert(bed.id.clone(), bed);
        }
        for assignment in commit.assignment_writes {
            state.assignments.insert(assignment.id.clone(), assignment);
        }
        state.history.extend(commit.history_writes);

        Ok(())
    }

    fn history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<AssignmentHistory>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        let mut entries: Vec<AssignmentHistory> = state
            .history
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        // Keep the most recent entries, still in chronological order.
        if entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
        Ok(entries)
    }

    fn record_conflict(&self, conflict: AssignmentConflict) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");
        state.conflicts.insert(conflict.id.clone(), conflict);
        Ok(())
    }

    fn conflict(&self, id: &ConflictId) -> Result<Option<AssignmentConflict>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        Ok(state.conflicts.get(id).cloned())
    }

    fn update_conflict(&self, conflict: AssignmentConflict) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");
        if !state.conflicts.contains_key(&conflict.id) {
            return Err(StoreError::NotFound);
        }
        state.conflicts.insert(conflict.id.clone(), conflict);
        Ok(())
    }

    fn rules(&self, hostel: &HostelId) -> Result<Vec<AssignmentRule>, StoreError> {
        let state = self.state.lock().expect("allocation store mutex poisoned");
        let mut rules: Vec<AssignmentRule> = state
            .rules
            .values()
            .filter(|rule| &rule.hostel_id == hostel)
            .cloned()
            .collect();
        rules.sort_by_key(|rule| (rule.evaluation_order(), rule.id.0.clone()));
        Ok(rules)
    }

    fn record_rule_execution(&self, rule: &RuleId, matched: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");
        let entry = state.rules.get_mut(rule).ok_or(StoreError::NotFound)?;
        entry.execution_count += 1;
        if matched {
            entry.success_count += 1;
        }
        Ok(())
    }

    fn record_optimization(&self, record: OptimizationRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("allocation store mutex poisoned");
        state.optimizations.push(record);
        Ok(())
    }
}

#[derive(Default)]
struct AvailabilityState {
    records: HashMap<RoomId, AvailabilityRecord>,
    demand: HashMap<RoomId, DemandWindow>,
    alerts: HashMap<AlertId, AvailabilityAlert>,
}

/// In-memory [`AvailabilityStore`].
#[derive(Default, Clone)]
pub struct MemoryAvailabilityStore {
    state: Arc<Mutex<AvailabilityState>>,
}

impl MemoryAvailabilityStore {
    pub fn alerts(&self) -> Vec<AvailabilityAlert> {
        let state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        state.alerts.values().cloned().collect()
    }
}

impl AvailabilityStore for MemoryAvailabilityStore {
    fn availability(&self, room: &RoomId) -> Result<Option<AvailabilityRecord>, StoreError> {
        let state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        Ok(state.records.get(room).cloned())
    }

    fn save_availability(&self, record: AvailabilityRecord) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        state.records.insert(record.room_id.clone(), record);
        Ok(())
    }

    fn demand(&self, room: &RoomId) -> Result<DemandWindow, StoreError> {
        let state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        Ok(state.demand.get(room).copied().unwrap_or_default())
    }

    fn save_demand(&self, room: &RoomId, window: DemandWindow) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        state.demand.insert(room.clone(), window);
        Ok(())
    }

    fn open_alerts(&self, room: &RoomId) -> Result<Vec<AvailabilityAlert>, StoreError> {
        let state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        let mut alerts: Vec<AvailabilityAlert> = state
            .alerts
            .values()
            .filter(|alert| &alert.room_id == room && alert.is_active)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(alerts)
    }

    fn upsert_alert(&self, alert: AvailabilityAlert) -> Result<AvailabilityAlert, StoreError> {
        let mut state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        if let Some(existing) = state
            .alerts
            .values()
            .find(|open| open.room_id == alert.room_id && open.kind == alert.kind && open.is_active)
        {
            return Ok(existing.clone());
        }
        state.alerts.insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }

    fn alert(&self, id: &AlertId) -> Result<Option<AvailabilityAlert>, StoreError> {
        let state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        Ok(state.alerts.get(id).cloned())
    }

    fn update_alert(&self, alert: AvailabilityAlert) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .expect("availability store mutex poisoned");
        if !state.alerts.contains_key(&alert.id) {
            return Err(StoreError::NotFound);
        }
        state.alerts.insert(alert.id.clone(), alert);
        Ok(())
    }
}
