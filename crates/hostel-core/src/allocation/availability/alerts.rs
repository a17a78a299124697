use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AvailabilityRecord;
use crate::allocation::domain::{AlertId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowAvailability,
    Full,
    HighDemand,
}

impl AlertKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LowAvailability => "low_availability",
            Self::Full => "full",
            Self::HighDemand => "high_demand",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

/// An open or resolved availability alert for one room. Terminal once
/// resolved; a fresh trigger opens a new alert instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityAlert {
    pub id: AlertId,
    pub room_id: RoomId,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    /// Availability and demand values at trigger time.
    pub available_beds: u32,
    pub demand_score: u8,
    pub is_active: bool,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A condition the alert evaluator decided to raise. The service attaches
/// identity and timestamps when persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaisedAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
}

/// Evaluate alert conditions against a freshly derived availability record.
///
/// Each condition independently raises at most one alert of its kind; kinds
/// already open for the room are skipped, so re-evaluation without a state
/// change raises nothing. The FULL alert fires alongside LOW_AVAILABILITY
/// rather than replacing it.
///
/// Severity is fixed at trigger time: an open MEDIUM LOW_AVAILABILITY alert
/// is not upgraded to HIGH when the room later empties out. The CRITICAL
/// FULL alert covers that transition; severity reflects the value seen when
/// the alert opened.
pub fn evaluate_alerts(
    record: &AvailabilityRecord,
    open: &[AvailabilityAlert],
    high_demand_score: u8,
) -> Vec<RaisedAlert> {
    let already_open =
        |kind: AlertKind| open.iter().any(|alert| alert.kind == kind && alert.is_active);

    let mut raised = Vec::new();

    if record.available_beds <= record.low_availability_threshold
        && !already_open(AlertKind::LowAvailability)
    {
        let severity = if record.available_beds == 0 {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        raised.push(RaisedAlert {
            kind: AlertKind::LowAvailability,
            severity,
        });
    }

    if record.available_beds == 0 && !already_open(AlertKind::Full) {
        raised.push(RaisedAlert {
            kind: AlertKind::Full,
            severity: AlertSeverity::Critical,
        });
    }

    if record.demand_score >= high_demand_score && !already_open(AlertKind::HighDemand) {
        raised.push(RaisedAlert {
            kind: AlertKind::HighDemand,
            severity: AlertSeverity::Medium,
        });
    }

    raised
}
