use super::common::*;
use std::sync::Arc;

use crate::allocation::availability::{AlertKind, AlertSeverity, DemandLevel};
use crate::allocation::domain::RoomId;
use crate::allocation::memory::MemoryAllocationStore;
use crate::allocation::service::{AllocationConfig, AllocationService};
use crate::allocation::store::AvailabilityStore;
use crate::allocation::AllocationError;

fn room() -> RoomId {
    RoomId("room-1".to_string())
}

#[test]
fn assigning_refreshes_the_room_snapshot() {
    let (service, store, availability) = build_service();
    store.insert_bed(bed_in("bed-1", "room-1"));
    store.insert_bed(bed_in("bed-2", "room-1"));
    store.insert_bed(bed_in("bed-3", "room-1"));

    service
        .assign(new_assignment("bed-1", "occ-1"))
        .expect("assignment commits");

    let record = availability
        .availability(&room())
        .expect("store reads")
        .expect("snapshot written");
    assert_eq!(record.total_beds, 3);
    assert_eq!(record.occupied_beds, 1);
    assert_eq!(record.available_beds, 2);
    assert!((record.occupancy_rate - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn filling_the_room_opens_low_availability_and_full_alerts() {
    let (service, store, availability) = build_service();
    store.insert_bed(bed_in("bed-1", "room-1"));

    service
        .assign(new_assignment("bed-1", "occ-1"))
        .expect("assignment commits");

    let open = availability.open_alerts(&room()).expect("store reads");
    assert_eq!(open.len(), 2);

    let low = open
        .iter()
        .find(|alert| alert.kind == AlertKind::LowAvailability)
        .expect("low availability opened");
    assert_eq!(low.severity, AlertSeverity::High);
    assert_eq!(low.available_beds, 0);

    let full = open
        .iter()
        .find(|alert| alert.kind == AlertKind::Full)
        .expect("full opened");
    assert_eq!(full.severity, AlertSeverity::Critical);
}

#[test]
fn re_evaluation_does_not_duplicate_open_alerts() {
    let (service, store, _) = build_service();
    store.insert_bed(bed_in("bed-1", "room-1"));
    service
        .assign(new_assignment("bed-1", "occ-1"))
        .expect("assignment commits");

    let first = service.check_alerts(&room()).expect("first evaluation");
    let second = service.check_alerts(&room()).expect("second evaluation");
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    let first_ids: Vec<_> = first.iter().map(|alert| alert.id.clone()).collect();
    let second_ids: Vec<_> = second.iter().map(|alert| alert.id.clone()).collect();
    assert_eq!(first_ids, second_ids);
}

#[test]
fn acknowledge_then_resolve_walks_the_alert_lifecycle() {
    let (service, store, _) = build_service();
    store.insert_bed(bed_in("bed-1", "room-1"));
    service
        .assign(new_assignment("bed-1", "occ-1"))
        .expect("assignment commits");

    let open = service.check_alerts(&room()).expect("alerts evaluated");
    let id = open[0].id.clone();

    let acknowledged = service.acknowledge_alert(&id).expect("open alert acknowledges");
    assert!(acknowledged.acknowledged_at.is_some());
    assert!(acknowledged.is_active);

    let resolved = service.resolve_alert(&id).expect("open alert resolves");
    assert!(!resolved.is_active);
    assert!(resolved.resolved_at.is_some());

    let err = service
        .resolve_alert(&id)
        .expect_err("resolved alert is terminal");
    assert!(matches!(err, AllocationError::BusinessRule(_)));
}

#[test]
fn resolving_an_alert_allows_a_fresh_trigger() {
    let (service, store, _) = build_service();
    store.insert_bed(bed_in("bed-1", "room-1"));
    service
        .assign(new_assignment("bed-1", "occ-1"))
        .expect("assignment commits");

    let open = service.check_alerts(&room()).expect("alerts evaluated");
    for alert in &open {
        service.resolve_alert(&alert.id).expect("alert resolves");
    }

    // The condition still holds, so evaluation opens new alerts.
    let reopened = service.check_alerts(&room()).expect("re-evaluation");
    assert_eq!(reopened.len(), 2);
    assert!(reopened.iter().all(|alert| alert.is_active));
    assert!(reopened.iter().all(|alert| !open.iter().any(|old| old.id == alert.id)));
}

#[test]
fn demand_counters_roll_up_into_a_high_demand_alert() {
    let (service, store, _) = build_service();
    for id in ["bed-1", "bed-2", "bed-3", "bed-4", "bed-5", "bed-6"] {
        store.insert_bed(bed_in(id, "room-1"));
    }

    for _ in 0..15 {
        service.record_inquiry(&room()).expect("inquiry recorded");
    }
    for _ in 0..5 {
        service.record_booking(&room()).expect("booking recorded");
    }

    let record = service.availability(&room()).expect("snapshot derives");
    assert_eq!(record.demand_level, DemandLevel::VeryHigh);
    assert_eq!(record.demand_score, 90);

    let open = service.check_alerts(&room()).expect("alerts evaluated");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].kind, AlertKind::HighDemand);
    assert_eq!(open[0].severity, AlertSeverity::Medium);

    service.reset_demand_window(&room()).expect("window resets");
    let record = service.availability(&room()).expect("snapshot derives");
    assert_eq!(record.demand_level, DemandLevel::Low);
}

#[test]
fn a_broken_demand_feed_degrades_to_the_low_bucket() {
    let store = Arc::new(MemoryAllocationStore::default());
    store.insert_bed(bed_in("bed-1", "room-1"));
    let availability = Arc::new(BrokenDemandStore::default());
    let service = AllocationService::new(
        store,
        availability,
        AllocationConfig::default(),
    );

    let record = service
        .availability(&room())
        .expect("snapshot derives despite the broken feed");
    assert_eq!(record.demand_level, DemandLevel::Low);
    assert_eq!(record.demand_score, 30);
}
