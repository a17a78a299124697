use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::AllocationError;

/// Identifier wrapper for physical beds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BedId(pub String);

/// Identifier wrapper for the room owning a group of beds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub String);

/// Identifier wrapper for occupants (guests/residents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccupantId(pub String);

/// Identifier wrapper for a hostel, used to scope assignment rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostelId(pub String);

/// Identifier wrapper for assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

/// Identifier wrapper for recorded assignment conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictId(pub String);

/// Identifier wrapper for availability alerts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub String);

/// Identifier wrapper for assignment rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Identifier wrapper for persisted optimization runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptimizationId(pub String);

impl fmt::Display for BedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical bed categories offered by the hostel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedKind {
    Single,
    Bunk,
    Double,
    Dormitory,
}

impl BedKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Bunk => "bunk",
            Self::Double => "double",
            Self::Dormitory => "dormitory",
        }
    }
}

/// Position of a bed within a bunk frame, or standalone for flat beds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BunkLevel {
    Lower,
    Upper,
    Standalone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Maintenance,
    Blocked,
}

impl BedStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
            Self::Blocked => "blocked",
        }
    }
}

/// A physical bed and its current occupancy state.
///
/// Invariant: `status == Occupied` exactly when `occupant` is set. Mutations
/// go through [`Bed::reserve`] and [`Bed::release`] so the pairing holds; the
/// store bumps `version` on every committed write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub room_id: RoomId,
    pub kind: BedKind,
    pub bunk_level: BunkLevel,
    pub functional: bool,
    pub status: BedStatus,
    pub occupant: Option<OccupantId>,
    pub occupied_from: Option<NaiveDate>,
    pub expected_vacate: Option<NaiveDate>,
    pub version: u64,
}

impl Bed {
    pub fn new(id: BedId, room_id: RoomId, kind: BedKind, bunk_level: BunkLevel) -> Self {
        Self {
            id,
            room_id,
            kind,
            bunk_level,
            functional: true,
            status: BedStatus::Available,
            occupant: None,
            occupied_from: None,
            expected_vacate: None,
            version: 0,
        }
    }

    /// A bed accepts new assignments only while functional and available.
    pub fn is_assignable(&self) -> bool {
        self.functional && self.status == BedStatus::Available
    }

    /// Why this bed rejects assignment, for error reporting.
    pub fn unavailability_reason(&self) -> String {
        if !self.functional {
            "bed is marked non-functional".to_string()
        } else {
            format!("bed status is {}", self.status.label())
        }
    }

    pub(crate) fn reserve(
        &mut self,
        occupant: OccupantId,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> Result<(), AllocationError> {
        if !self.is_assignable() {
            return Err(AllocationError::NotAvailable {
                bed_id: self.id.clone(),
                reason: self.unavailability_reason(),
            });
        }

        self.status = BedStatus::Occupied;
        self.occupant = Some(occupant);
        self.occupied_from = Some(from);
        self.expected_vacate = until;
        Ok(())
    }

    pub(crate) fn release(&mut self) -> Result<(), AllocationError> {
        if self.status != BedStatus::Occupied {
            return Err(AllocationError::BusinessRule(format!(
                "bed {} is not occupied and cannot be released",
                self.id
            )));
        }

        self.status = BedStatus::Available;
        self.occupant = None;
        self.occupied_from = None;
        self.expected_vacate = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Completed,
    Transferred,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Transferred => "transferred",
        }
    }

    /// Completed and transferred assignments never reactivate.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Transferred)
    }
}

/// The record linking one occupant to one bed for a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub bed_id: BedId,
    pub room_id: RoomId,
    pub occupant_id: OccupantId,
    pub occupied_from: NaiveDate,
    pub expected_vacate: Option<NaiveDate>,
    pub actual_vacate: Option<NaiveDate>,
    pub monthly_rent: Option<u32>,
    pub status: AssignmentStatus,
    pub is_transfer: bool,
    pub previous_bed_id: Option<BedId>,
    pub duration_days: Option<i64>,
}

impl Assignment {
    /// The occupancy window this assignment claims on its bed. Active stays
    /// with no expected vacate date are open-ended.
    pub fn window(&self) -> super::conflict::StayWindow {
        super::conflict::StayWindow::new(
            self.occupied_from,
            self.actual_vacate.or(self.expected_vacate),
        )
    }

    pub(crate) fn complete(&mut self, actual_vacate: NaiveDate) {
        self.status = AssignmentStatus::Completed;
        self.actual_vacate = Some(actual_vacate);
        self.duration_days = Some(
            actual_vacate
                .signed_duration_since(self.occupied_from)
                .num_days(),
        );
    }

    pub(crate) fn transfer_out(&mut self, transfer_date: NaiveDate) {
        self.status = AssignmentStatus::Transferred;
        self.is_transfer = true;
        self.actual_vacate = Some(transfer_date);
        self.duration_days = Some(
            transfer_date
                .signed_duration_since(self.occupied_from)
                .num_days(),
        );
    }
}

/// Typed request for a new assignment. Unknown fields are rejected at the
/// deserialization boundary rather than silently merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAssignment {
    pub bed_id: BedId,
    pub occupant_id: OccupantId,
    pub occupied_from: NaiveDate,
    #[serde(default)]
    pub expected_vacate: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<u32>,
}

impl NewAssignment {
    pub(crate) fn validate(&self) -> Result<(), AllocationError> {
        if let Some(until) = self.expected_vacate {
            if until <= self.occupied_from {
                return Err(AllocationError::Validation(format!(
                    "expected vacate {} must be after move-in {}",
                    until, self.occupied_from
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryChange {
    Created,
    Completed,
    Transferred,
}

impl HistoryChange {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completed => "completed",
            Self::Transferred => "transferred",
        }
    }
}

/// Append-only ledger entry written alongside every lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentHistory {
    pub assignment_id: AssignmentId,
    pub bed_id: BedId,
    pub occupant_id: OccupantId,
    pub change: HistoryChange,
    pub recorded_at: DateTime<Utc>,
    pub occupied_from: NaiveDate,
    pub vacate_date: Option<NaiveDate>,
    pub monthly_rent: Option<u32>,
    pub note: Option<String>,
}

impl AssignmentHistory {
    pub(crate) fn created(assignment: &Assignment, recorded_at: DateTime<Utc>) -> Self {
        Self::snapshot(assignment, HistoryChange::Created, recorded_at, None)
    }

    pub(crate) fn completed(assignment: &Assignment, recorded_at: DateTime<Utc>) -> Self {
        Self::snapshot(assignment, HistoryChange::Completed, recorded_at, None)
    }

    pub(crate) fn transferred(
        assignment: &Assignment,
        recorded_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Self::snapshot(assignment, HistoryChange::Transferred, recorded_at, note)
    }

    fn snapshot(
        assignment: &Assignment,
        change: HistoryChange,
        recorded_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Self {
            assignment_id: assignment.id.clone(),
            bed_id: assignment.bed_id.clone(),
            occupant_id: assignment.occupant_id.clone(),
            change,
            recorded_at,
            occupied_from: assignment.occupied_from,
            vacate_date: assignment.actual_vacate.or(assignment.expected_vacate),
            monthly_rent: assignment.monthly_rent,
            note,
        }
    }
}

/// Filter for querying the history ledger. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    #[serde(default)]
    pub bed_id: Option<BedId>,
    #[serde(default)]
    pub assignment_id: Option<AssignmentId>,
    #[serde(default)]
    pub occupant_id: Option<OccupantId>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &AssignmentHistory) -> bool {
        if let Some(bed_id) = &self.bed_id {
            if &entry.bed_id != bed_id {
                return false;
            }
        }
        if let Some(assignment_id) = &self.assignment_id {
            if &entry.assignment_id != assignment_id {
                return false;
            }
        }
        if let Some(occupant_id) = &self.occupant_id {
            if &entry.occupant_id != occupant_id {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Detected,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    OverlappingStay,
}

/// Operator-supplied metadata closing out a detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: String,
    pub note: Option<String>,
}

/// Persisted record of a detected overlap, kept for operator review even when
/// the triggering request was aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConflict {
    pub id: ConflictId,
    pub bed_id: BedId,
    pub occupant_id: Option<OccupantId>,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub description: String,
    pub status: ConflictStatus,
    pub detected_at: DateTime<Utc>,
    pub resolution: Option<ConflictResolution>,
}
