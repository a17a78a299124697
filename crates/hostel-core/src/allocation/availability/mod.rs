//! Per-room availability snapshots, demand scoring, and alert evaluation.
//!
//! The availability record is the single source of truth for alerting and is
//! recomputed on every bed state change.

mod alerts;
mod demand;

pub use alerts::{evaluate_alerts, AlertKind, AlertSeverity, AvailabilityAlert, RaisedAlert};
pub use demand::{bucket, DemandLevel, DemandWindow};

use serde::{Deserialize, Serialize};

use super::domain::{Bed, BedStatus, RoomId};

/// Derived per-room snapshot of bed counts and occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub room_id: RoomId,
    pub total_beds: u32,
    pub available_beds: u32,
    pub occupied_beds: u32,
    pub maintenance_beds: u32,
    pub blocked_beds: u32,
    /// Percentage, 0..=100.
    pub occupancy_rate: f64,
    pub demand_level: DemandLevel,
    pub demand_score: u8,
    pub low_availability_threshold: u32,
}

impl AvailabilityRecord {
    /// Recompute the room snapshot from its beds and the current demand
    /// window: `available = total - occupied - blocked`.
    pub fn derive(
        room_id: RoomId,
        beds: &[Bed],
        demand: &DemandWindow,
        low_availability_threshold: u32,
    ) -> Self {
        let total_beds = beds.len() as u32;
        let occupied_beds = beds
            .iter()
            .filter(|bed| bed.status == BedStatus::Occupied)
            .count() as u32;
        let maintenance_beds = beds
            .iter()
            .filter(|bed| bed.status == BedStatus::Maintenance)
            .count() as u32;
        let blocked_beds = beds
            .iter()
            .filter(|bed| bed.status == BedStatus::Blocked)
            .count() as u32;

        let available_beds = total_beds.saturating_sub(occupied_beds + blocked_beds);
        let occupancy_rate = if total_beds == 0 {
            0.0
        } else {
            f64::from(occupied_beds) / f64::from(total_beds) * 100.0
        };

        let (demand_level, demand_score) = bucket(demand);

        Self {
            room_id,
            total_beds,
            available_beds,
            occupied_beds,
            maintenance_beds,
            blocked_beds,
            occupancy_rate,
            demand_level,
            demand_score,
            low_availability_threshold,
        }
    }
}
