//! Interval-overlap detection for bed occupancy windows.
//!
//! Windows are half-open `[from, until)`; an absent `until` means the stay is
//! open-ended. A vacate date equal to another stay's move-in date is a
//! same-day handover and is never reported as a conflict.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Assignment, AssignmentConflict, AssignmentId, AssignmentStatus, BedId, ConflictId,
    ConflictKind, ConflictSeverity, ConflictStatus, OccupantId,
};

/// Half-open occupancy window over calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayWindow {
    pub from: NaiveDate,
    pub until: Option<NaiveDate>,
}

impl StayWindow {
    pub fn new(from: NaiveDate, until: Option<NaiveDate>) -> Self {
        Self { from, until }
    }

    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`, with an
    /// open end standing in for +infinity.
    pub fn overlaps(&self, other: &StayWindow) -> bool {
        let starts_before_other_ends = match other.until {
            Some(end) => self.from < end,
            None => true,
        };
        let other_starts_before_self_ends = match self.until {
            Some(end) => other.from < end,
            None => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// Description of one overlap between a proposed window and an existing stay.
/// This is a report, not an error; the lifecycle service decides whether to
/// abort or proceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapConflict {
    pub bed_id: BedId,
    pub assignment_id: AssignmentId,
    pub occupant_id: OccupantId,
    pub existing: StayWindow,
    pub requested: StayWindow,
    pub description: String,
}

impl OverlapConflict {
    fn describe(assignment: &Assignment, requested: &StayWindow) -> String {
        let existing_until = match assignment.window().until {
            Some(date) => date.to_string(),
            None => "open-ended".to_string(),
        };
        let requested_until = match requested.until {
            Some(date) => date.to_string(),
            None => "open-ended".to_string(),
        };
        format!(
            "requested stay {} -> {} overlaps active assignment {} for occupant {} ({} -> {})",
            requested.from,
            requested_until,
            assignment.id,
            assignment.occupant_id,
            assignment.occupied_from,
            existing_until,
        )
    }
}

/// Scan the active assignments of a bed for overlaps with the proposed window.
pub fn find_overlaps(active: &[Assignment], requested: &StayWindow) -> Vec<OverlapConflict> {
    active
        .iter()
        .filter(|assignment| assignment.status == AssignmentStatus::Active)
        .filter(|assignment| assignment.window().overlaps(requested))
        .map(|assignment| OverlapConflict {
            bed_id: assignment.bed_id.clone(),
            assignment_id: assignment.id.clone(),
            occupant_id: assignment.occupant_id.clone(),
            existing: assignment.window(),
            requested: *requested,
            description: OverlapConflict::describe(assignment, requested),
        })
        .collect()
}

impl AssignmentConflict {
    /// Persistable record for a proactively detected overlap. Severity scales
    /// with how much of the requested window is contested: an open-ended
    /// collision is urgent, a bounded one is high.
    pub fn from_overlap(
        id: ConflictId,
        overlap: &OverlapConflict,
        occupant: Option<OccupantId>,
        detected_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let severity = if overlap.requested.until.is_none() || overlap.existing.until.is_none() {
            ConflictSeverity::Urgent
        } else {
            ConflictSeverity::High
        };

        Self {
            id,
            bed_id: overlap.bed_id.clone(),
            occupant_id: occupant,
            kind: ConflictKind::OverlappingStay,
            severity,
            description: overlap.description.clone(),
            status: ConflictStatus::Detected,
            detected_at,
            resolution: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::domain::RoomId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn active_assignment(from: NaiveDate, until: Option<NaiveDate>) -> Assignment {
        Assignment {
            id: AssignmentId("asg-1".to_string()),
            bed_id: BedId("bed-1".to_string()),
            room_id: RoomId("room-1".to_string()),
            occupant_id: OccupantId("occ-1".to_string()),
            occupied_from: from,
            expected_vacate: until,
            actual_vacate: None,
            monthly_rent: None,
            status: AssignmentStatus::Active,
            is_transfer: false,
            previous_bed_id: None,
            duration_days: None,
        }
    }

    #[test]
    fn bounded_windows_overlap_when_interleaved() {
        let a = StayWindow::new(date(2024, 1, 1), Some(date(2024, 6, 1)));
        let b = StayWindow::new(date(2024, 3, 1), Some(date(2024, 9, 1)));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        let a = StayWindow::new(date(2024, 1, 1), Some(date(2024, 2, 1)));
        let b = StayWindow::new(date(2024, 3, 1), Some(date(2024, 4, 1)));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn same_day_handover_is_not_a_conflict() {
        let leaving = StayWindow::new(date(2024, 1, 1), Some(date(2024, 3, 1)));
        let arriving = StayWindow::new(date(2024, 3, 1), Some(date(2024, 6, 1)));
        assert!(!leaving.overlaps(&arriving));
        assert!(!arriving.overlaps(&leaving));
    }

    #[test]
    fn open_ended_window_overlaps_any_later_start() {
        let open = StayWindow::new(date(2024, 1, 1), None);
        let later = StayWindow::new(date(2030, 1, 1), Some(date(2030, 2, 1)));
        assert!(open.overlaps(&later));
    }

    #[test]
    fn find_overlaps_skips_terminal_assignments() {
        let mut completed = active_assignment(date(2024, 1, 1), Some(date(2024, 6, 1)));
        completed.status = AssignmentStatus::Completed;
        let requested = StayWindow::new(date(2024, 2, 1), Some(date(2024, 3, 1)));

        assert!(find_overlaps(&[completed], &requested).is_empty());
    }

    #[test]
    fn find_overlaps_reports_each_collision() {
        let first = active_assignment(date(2024, 1, 1), Some(date(2024, 6, 1)));
        let mut second = active_assignment(date(2024, 7, 1), None);
        second.id = AssignmentId("asg-2".to_string());
        let requested = StayWindow::new(date(2024, 5, 1), Some(date(2024, 8, 1)));

        let conflicts = find_overlaps(&[first, second], &requested);
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts[0].description.contains("asg-1"));
        assert!(conflicts[1].description.contains("asg-2"));
    }
}
