//! Assignment lifecycle management.
//!
//! All mutating operations follow the same discipline: optimistic read,
//! conflict check, then one atomic commit carrying every write for the
//! operation. A concurrent writer that invalidates the read phase loses at
//! commit time with a conflict error and may retry; partial writes never
//! survive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use super::availability::{
    evaluate_alerts, AvailabilityAlert, AvailabilityRecord, DemandWindow,
};
use super::conflict::{find_overlaps, StayWindow};
use super::domain::{
    AlertId, Assignment, AssignmentConflict, AssignmentHistory, AssignmentId, AssignmentStatus,
    BedId, ConflictId, ConflictResolution, ConflictStatus, HistoryFilter, HostelId, NewAssignment,
    OptimizationId, RoomId,
};
use super::optimizer::{
    plan_matches, OptimizationOutcome, OptimizationParams, OptimizationRecord, ALGORITHM_NAME,
};
use super::rules::{self, RequestContext, RuleOutcome};
use super::store::{AllocationStore, AssignmentCommit, AvailabilityStore, StoreError};
use super::AllocationError;

/// Tunables for the allocation core.
#[derive(Debug, Clone)]
pub struct AllocationConfig {
    /// Rooms at or below this many available beds raise a low-availability
    /// alert.
    pub low_availability_threshold: u32,
    /// Score contribution of one matched rule.
    pub rule_match_weight: u32,
    /// Demand score at which a high-demand alert opens.
    pub high_demand_score: u8,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            low_availability_threshold: 2,
            rule_match_weight: 10,
            high_demand_score: 80,
        }
    }
}

static ASSIGNMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CONFLICT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ALERT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OPTIMIZATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assignment_id() -> AssignmentId {
    let id = ASSIGNMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssignmentId(format!("asg-{id:06}"))
}

fn next_conflict_id() -> ConflictId {
    let id = CONFLICT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ConflictId(format!("cfl-{id:06}"))
}

fn next_alert_id() -> AlertId {
    let id = ALERT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AlertId(format!("alr-{id:06}"))
}

fn next_optimization_id() -> OptimizationId {
    let id = OPTIMIZATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OptimizationId(format!("opt-{id:06}"))
}

/// Service composing the conflict detector, rule engine, optimizer, and
/// availability tracker over the storage contracts.
pub struct AllocationService<S, V> {
    store: Arc<S>,
    availability: Arc<V>,
    config: AllocationConfig,
}

impl<S, V> AllocationService<S, V>
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    pub fn new(store: Arc<S>, availability: Arc<V>, config: AllocationConfig) -> Self {
        Self {
            store,
            availability,
            config,
        }
    }

    /// Assign an occupant to a bed for a stay window.
    ///
    /// Detected overlaps abort the request and are recorded for operator
    /// review; a race lost at commit surfaces as a conflict with no recorded
    /// rows.
    pub fn assign(&self, request: NewAssignment) -> Result<Assignment, AllocationError> {
        request.validate()?;

        let mut bed = self
            .store
            .bed(&request.bed_id)?
            .ok_or_else(|| AllocationError::not_found("bed", &request.bed_id.0))?;

        let window = StayWindow::new(request.occupied_from, request.expected_vacate);
        let active = self.store.active_assignments(&request.bed_id)?;
        let overlaps = find_overlaps(&active, &window);
        if !overlaps.is_empty() {
            let detected_at = Utc::now();
            for overlap in &overlaps {
                let conflict = AssignmentConflict::from_overlap(
                    next_conflict_id(),
                    overlap,
                    Some(request.occupant_id.clone()),
                    detected_at,
                );
                if let Err(err) = self.store.record_conflict(conflict) {
                    warn!(bed = %request.bed_id, error = %err, "failed to record detected conflict");
                }
            }
            return Err(AllocationError::Conflict {
                conflicts: overlaps,
            });
        }

        if !bed.is_assignable() {
            return Err(AllocationError::NotAvailable {
                bed_id: bed.id.clone(),
                reason: bed.unavailability_reason(),
            });
        }

        let observed_version = bed.version;
        bed.reserve(
            request.occupant_id.clone(),
            request.occupied_from,
            request.expected_vacate,
        )?;

        let assignment = Assignment {
            id: next_assignment_id(),
            bed_id: bed.id.clone(),
            room_id: bed.room_id.clone(),
            occupant_id: request.occupant_id,
            occupied_from: request.occupied_from,
            expected_vacate: request.expected_vacate,
            actual_vacate: None,
            monthly_rent: request.monthly_rent,
            status: AssignmentStatus::Active,
            is_transfer: false,
            previous_bed_id: None,
            duration_days: None,
        };
        let history = AssignmentHistory::created(&assignment, Utc::now());

        let room_id = bed.room_id.clone();
        self.apply_commit(AssignmentCommit {
            expected_beds: vec![(bed.id.clone(), observed_version)],
            bed_writes: vec![bed],
            assignment_writes: vec![assignment.clone()],
            history_writes: vec![history],
        })?;

        info!(
            assignment = %assignment.id,
            bed = %assignment.bed_id,
            occupant = %assignment.occupant_id,
            "assignment created"
        );
        self.refresh_room(&room_id);
        Ok(assignment)
    }

    /// Complete an active assignment with an actual vacate date, releasing
    /// the bed.
    pub fn complete(
        &self,
        id: &AssignmentId,
        actual_vacate: NaiveDate,
    ) -> Result<Assignment, AllocationError> {
        let mut assignment = self
            .store
            .assignment(id)?
            .ok_or_else(|| AllocationError::not_found("assignment", &id.0))?;

        if assignment.status.is_terminal() {
            return Err(AllocationError::BusinessRule(format!(
                "assignment {} is already {} and cannot be completed",
                assignment.id,
                assignment.status.label()
            )));
        }
        if actual_vacate < assignment.occupied_from {
            return Err(AllocationError::Validation(format!(
                "actual vacate {} precedes move-in {}",
                actual_vacate, assignment.occupied_from
            )));
        }

        let mut bed = self
            .store
            .bed(&assignment.bed_id)?
            .ok_or_else(|| AllocationError::not_found("bed", &assignment.bed_id.0))?;
        let observed_version = bed.version;
        bed.release()?;
        assignment.complete(actual_vacate);
        let history = AssignmentHistory::completed(&assignment, Utc::now());

        let room_id = bed.room_id.clone();
        self.apply_commit(AssignmentCommit {
            expected_beds: vec![(bed.id.clone(), observed_version)],
            bed_writes: vec![bed],
            assignment_writes: vec![assignment.clone()],
            history_writes: vec![history],
        })?;

        info!(
            assignment = %assignment.id,
            bed = %assignment.bed_id,
            duration_days = assignment.duration_days,
            "assignment completed"
        );
        self.refresh_room(&room_id);
        Ok(assignment)
    }

    /// Move an active assignment to another bed as one atomic unit: the
    /// source leg is marked transferred and the destination leg opens with
    /// the inherited rent and expected vacate date. If the destination
    /// reservation cannot commit, the source completion rolls back with it.
    pub fn transfer(
        &self,
        id: &AssignmentId,
        new_bed_id: &BedId,
        transfer_date: NaiveDate,
        reason: Option<String>,
    ) -> Result<Assignment, AllocationError> {
        let mut source = self
            .store
            .assignment(id)?
            .ok_or_else(|| AllocationError::not_found("assignment", &id.0))?;

        if source.status.is_terminal() {
            return Err(AllocationError::BusinessRule(format!(
                "assignment {} is already {} and cannot be transferred",
                source.id,
                source.status.label()
            )));
        }
        if new_bed_id == &source.bed_id {
            return Err(AllocationError::Validation(
                "transfer destination matches the current bed".to_string(),
            ));
        }
        if transfer_date < source.occupied_from {
            return Err(AllocationError::Validation(format!(
                "transfer date {} precedes move-in {}",
                transfer_date, source.occupied_from
            )));
        }

        let mut destination = self
            .store
            .bed(new_bed_id)?
            .ok_or_else(|| AllocationError::not_found("bed", &new_bed_id.0))?;

        // The destination leg passes the same checks as a fresh assignment.
        let inherited_vacate = source.expected_vacate.filter(|date| *date > transfer_date);
        let window = StayWindow::new(transfer_date, inherited_vacate);
        let active = self.store.active_assignments(new_bed_id)?;
        let overlaps = find_overlaps(&active, &window);
        if !overlaps.is_empty() {
            let detected_at = Utc::now();
            for overlap in &overlaps {
                let conflict = AssignmentConflict::from_overlap(
                    next_conflict_id(),
                    overlap,
                    Some(source.occupant_id.clone()),
                    detected_at,
                );
                if let Err(err) = self.store.record_conflict(conflict) {
                    warn!(bed = %new_bed_id, error = %err, "failed to record detected conflict");
                }
            }
            return Err(AllocationError::Conflict {
                conflicts: overlaps,
            });
        }
        if !destination.is_assignable() {
            return Err(AllocationError::NotAvailable {
                bed_id: destination.id.clone(),
                reason: destination.unavailability_reason(),
            });
        }

        let mut source_bed = self
            .store
            .bed(&source.bed_id)?
            .ok_or_else(|| AllocationError::not_found("bed", &source.bed_id.0))?;

        let source_bed_version = source_bed.version;
        let destination_version = destination.version;

        source_bed.release()?;
        destination.reserve(
            source.occupant_id.clone(),
            transfer_date,
            inherited_vacate,
        )?;

        let previous_bed = source.bed_id.clone();
        source.transfer_out(transfer_date);

        let successor = Assignment {
            id: next_assignment_id(),
            bed_id: destination.id.clone(),
            room_id: destination.room_id.clone(),
            occupant_id: source.occupant_id.clone(),
            occupied_from: transfer_date,
            expected_vacate: inherited_vacate,
            actual_vacate: None,
            monthly_rent: source.monthly_rent,
            status: AssignmentStatus::Active,
            is_transfer: true,
            previous_bed_id: Some(previous_bed),
            duration_days: None,
        };

        let recorded_at = Utc::now();
        let history = vec![
            AssignmentHistory::transferred(&source, recorded_at, reason),
            AssignmentHistory::created(&successor, recorded_at),
        ];

        let source_room = source_bed.room_id.clone();
        let destination_room = destination.room_id.clone();
        self.apply_commit(AssignmentCommit {
            expected_beds: vec![
                (source_bed.id.clone(), source_bed_version),
                (destination.id.clone(), destination_version),
            ],
            bed_writes: vec![source_bed, destination],
            assignment_writes: vec![source.clone(), successor.clone()],
            history_writes: history,
        })?;

        info!(
            from_assignment = %source.id,
            to_assignment = %successor.id,
            bed = %successor.bed_id,
            "assignment transferred"
        );
        self.refresh_room(&source_room);
        if destination_room != source_room {
            self.refresh_room(&destination_room);
        }
        Ok(successor)
    }

    /// Query the append-only history ledger.
    pub fn history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<AssignmentHistory>, AllocationError> {
        Ok(self.store.history(filter, limit)?)
    }

    /// Evaluate the hostel's active rules against a request context,
    /// persisting execution counters.
    pub fn evaluate_rules(
        &self,
        hostel: &HostelId,
        context: &RequestContext,
    ) -> Result<RuleOutcome, AllocationError> {
        let rules = self.store.rules(hostel)?;
        let (outcome, executions) =
            rules::evaluate(&rules, context, self.config.rule_match_weight);

        for execution in executions {
            if let Err(err) = self
                .store
                .record_rule_execution(&execution.rule_id, execution.matched)
            {
                warn!(rule = %execution.rule_id.0, error = %err, "failed to persist rule counters");
            }
        }

        Ok(outcome)
    }

    /// Run the greedy matcher over a batch of available beds and pending
    /// requests, committing each planned match through the normal assignment
    /// path and persisting an audit record.
    pub fn run_optimization(
        &self,
        hostel: &HostelId,
        available_beds: &[BedId],
        requests: &[super::optimizer::PendingRequest],
        params: OptimizationParams,
    ) -> Result<OptimizationOutcome, AllocationError> {
        let started = Instant::now();
        let mut warnings = Vec::new();

        let mut pool = Vec::with_capacity(available_beds.len());
        for bed_id in available_beds {
            match self.store.bed(bed_id)? {
                Some(bed) if bed.is_assignable() => pool.push(bed),
                Some(bed) => warnings.push(format!(
                    "bed {} excluded from pool: {}",
                    bed.id,
                    bed.unavailability_reason()
                )),
                None => warnings.push(format!("bed {bed_id} excluded from pool: unknown bed")),
            }
        }

        let weights = params.weights();
        let plan = plan_matches(&pool, requests, &weights);

        // The in-process claimed set already excludes planned beds, but each
        // commit still runs the full transactional check against shared
        // storage.
        let mut assignments = Vec::new();
        let mut total_score: i64 = 0;
        for (matched, request) in plan.matches.iter().zip(requests.iter()) {
            let outcome = self.assign(NewAssignment {
                bed_id: matched.bed_id.clone(),
                occupant_id: matched.occupant_id.clone(),
                occupied_from: request.move_in,
                expected_vacate: request.expected_vacate,
                monthly_rent: request.monthly_rent,
            });
            match outcome {
                Ok(assignment) => {
                    total_score += i64::from(matched.match_score);
                    assignments.push(assignment);
                }
                Err(err) => warnings.push(format!(
                    "planned match for occupant {} on bed {} did not commit: {err}",
                    matched.occupant_id, matched.bed_id
                )),
            }
        }

        let average_match_score = if assignments.is_empty() {
            0.0
        } else {
            total_score as f64 / assignments.len() as f64
        };

        let record = OptimizationRecord {
            id: next_optimization_id(),
            hostel_id: hostel.clone(),
            algorithm: ALGORITHM_NAME.to_string(),
            algorithm_version: params.algorithm_version.clone(),
            params: serde_json::to_value(&params).unwrap_or(serde_json::Value::Null),
            beds_considered: pool.len(),
            requests_considered: requests.len(),
            assignments_count: assignments.len(),
            total_score,
            average_match_score,
            elapsed_ms: started.elapsed().as_millis() as u64,
            ran_at: Utc::now(),
        };
        self.store.record_optimization(record.clone())?;

        info!(
            optimization = %record.id.0,
            assignments = record.assignments_count,
            total_score = record.total_score,
            "optimization run recorded"
        );
        Ok(OptimizationOutcome {
            record,
            assignments,
            warnings,
        })
    }

    /// Recompute and persist the room's availability record.
    pub fn availability(&self, room: &RoomId) -> Result<AvailabilityRecord, AllocationError> {
        let beds = self.store.beds_in_room(room)?;
        let demand = match self.availability.demand(room) {
            Ok(window) => window,
            Err(err) => {
                // Degrade to the low bucket rather than failing the caller.
                warn!(room = %room, error = %err, "demand window unavailable, defaulting to low");
                DemandWindow::default()
            }
        };

        let record = AvailabilityRecord::derive(
            room.clone(),
            &beds,
            &demand,
            self.config.low_availability_threshold,
        );
        self.availability.save_availability(record.clone())?;
        Ok(record)
    }

    /// Recompute availability, open any newly triggered alerts, and return
    /// the room's open alert set. Idempotent: re-evaluation without a state
    /// change returns the same set.
    pub fn check_alerts(&self, room: &RoomId) -> Result<Vec<AvailabilityAlert>, AllocationError> {
        let record = self.availability(room)?;
        let open = self.availability.open_alerts(room)?;
        let raised = evaluate_alerts(&record, &open, self.config.high_demand_score);

        for raise in raised {
            let alert = AvailabilityAlert {
                id: next_alert_id(),
                room_id: room.clone(),
                kind: raise.kind,
                severity: raise.severity,
                available_beds: record.available_beds,
                demand_score: record.demand_score,
                is_active: true,
                triggered_at: Utc::now(),
                acknowledged_at: None,
                resolved_at: None,
            };
            info!(room = %room, kind = alert.kind.label(), "availability alert opened");
            self.availability.upsert_alert(alert)?;
        }

        Ok(self.availability.open_alerts(room)?)
    }

    /// Mark an open alert as acknowledged by an operator.
    pub fn acknowledge_alert(&self, id: &AlertId) -> Result<AvailabilityAlert, AllocationError> {
        let mut alert = self
            .availability
            .alert(id)?
            .ok_or_else(|| AllocationError::not_found("alert", &id.0))?;
        if !alert.is_active {
            return Err(AllocationError::BusinessRule(format!(
                "alert {} is already resolved",
                alert.id
            )));
        }
        alert.acknowledged_at = Some(Utc::now());
        self.availability.update_alert(alert.clone())?;
        Ok(alert)
    }

    /// Close an open alert. Resolved alerts are terminal.
    pub fn resolve_alert(&self, id: &AlertId) -> Result<AvailabilityAlert, AllocationError> {
        let mut alert = self
            .availability
            .alert(id)?
            .ok_or_else(|| AllocationError::not_found("alert", &id.0))?;
        if !alert.is_active {
            return Err(AllocationError::BusinessRule(format!(
                "alert {} is already resolved",
                alert.id
            )));
        }
        alert.is_active = false;
        alert.resolved_at = Some(Utc::now());
        self.availability.update_alert(alert.clone())?;
        Ok(alert)
    }

    /// Close out a detected conflict with operator-supplied metadata.
    pub fn resolve_conflict(
        &self,
        id: &ConflictId,
        resolution: ConflictResolution,
    ) -> Result<AssignmentConflict, AllocationError> {
        let mut conflict = self
            .store
            .conflict(id)?
            .ok_or_else(|| AllocationError::not_found("conflict", &id.0))?;
        if conflict.status == ConflictStatus::Resolved {
            return Err(AllocationError::BusinessRule(format!(
                "conflict {} is already resolved",
                conflict.id
            )));
        }
        conflict.status = ConflictStatus::Resolved;
        conflict.resolution = Some(resolution);
        self.store.update_conflict(conflict.clone())?;
        Ok(conflict)
    }

    /// Count an inquiry against the room's rolling demand window.
    pub fn record_inquiry(&self, room: &RoomId) -> Result<DemandWindow, AllocationError> {
        let mut window = self.availability.demand(room)?;
        window.record_inquiry();
        self.availability.save_demand(room, window)?;
        Ok(window)
    }

    /// Count a booking against the room's rolling demand window.
    pub fn record_booking(&self, room: &RoomId) -> Result<DemandWindow, AllocationError> {
        let mut window = self.availability.demand(room)?;
        window.record_booking();
        self.availability.save_demand(room, window)?;
        Ok(window)
    }

    /// Reset the rolling demand counters; intended for the periodic window
    /// rollover job and safe to call repeatedly.
    pub fn reset_demand_window(&self, room: &RoomId) -> Result<(), AllocationError> {
        self.availability
            .save_demand(room, DemandWindow::default())?;
        Ok(())
    }

    fn apply_commit(&self, commit: AssignmentCommit) -> Result<(), AllocationError> {
        self.store.commit(commit).map_err(|err| match err {
            // A lost race is a conflict with nothing to enumerate; the caller
            // may retry the whole operation.
            StoreError::Conflict => AllocationError::Conflict {
                conflicts: Vec::new(),
            },
            other => AllocationError::Store(other),
        })
    }

    fn refresh_room(&self, room: &RoomId) {
        // Availability and alerting never fail the assignment operation that
        // triggered them.
        if let Err(err) = self.check_alerts(room) {
            warn!(room = %room, error = %err, "availability refresh failed");
        }
    }
}
