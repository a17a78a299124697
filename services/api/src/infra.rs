use chrono::NaiveDate;
use hostel_core::allocation::{
    Bed, BedId, BedKind, BunkLevel, MemoryAllocationStore, RoomId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Beds for a small two-room hostel, used by the demo command and as starter
/// inventory for the in-memory server.
pub(crate) fn seed_demo_beds(store: &MemoryAllocationStore) {
    for index in 1..=4 {
        let mut bed = Bed::new(
            BedId(format!("dorm-a-bed-{index}")),
            RoomId("dorm-a".to_string()),
            BedKind::Dormitory,
            if index % 2 == 0 {
                BunkLevel::Upper
            } else {
                BunkLevel::Lower
            },
        );
        // One bunk is out for repairs so the demo shows pool filtering.
        if index == 4 {
            bed.functional = false;
        }
        store.insert_bed(bed);
    }

    for index in 1..=2 {
        store.insert_bed(Bed::new(
            BedId(format!("private-b-bed-{index}")),
            RoomId("private-b".to_string()),
            BedKind::Single,
            BunkLevel::Standalone,
        ));
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
