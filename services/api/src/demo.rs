use crate::infra::seed_demo_beds;
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;

use hostel_core::allocation::{
    AllocationConfig, AllocationError, AllocationService, AssignmentRule, BedId, BedKind,
    ContextValue, HistoryFilter, HostelId, MemoryAllocationStore, MemoryAvailabilityStore,
    NewAssignment, OccupantId, OptimizationParams, PendingRequest, Predicate, RequestContext,
    RoomId, RuleId,
};
use hostel_core::error::AppError;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Move-in date for the demo stays (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) move_in: Option<NaiveDate>,
    /// Print the full assignment history ledger at the end.
    #[arg(long)]
    pub(crate) show_history: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let move_in = args.move_in.unwrap_or_else(|| Local::now().date_naive());
    let vacate = move_in + Duration::days(30);

    let store = Arc::new(MemoryAllocationStore::default());
    seed_demo_beds(&store);
    seed_demo_rules(&store);
    let availability = Arc::new(MemoryAvailabilityStore::default());
    let service = AllocationService::new(
        store.clone(),
        availability.clone(),
        AllocationConfig::default(),
    );

    println!("Hostel allocation demo ({move_in} -> {vacate})");

    println!("\n1. Direct assignment");
    let first = service
        .assign(NewAssignment {
            bed_id: BedId("dorm-a-bed-1".to_string()),
            occupant_id: OccupantId("guest-ana".to_string()),
            occupied_from: move_in,
            expected_vacate: Some(vacate),
            monthly_rent: Some(420),
        })
        .map_err(AppError::from)?;
    println!(
        "- {} -> {} ({} to {})",
        first.occupant_id, first.bed_id, first.occupied_from, vacate
    );

    println!("\n2. Double-booking attempt");
    let double_booking = service.assign(NewAssignment {
        bed_id: BedId("dorm-a-bed-1".to_string()),
        occupant_id: OccupantId("guest-bo".to_string()),
        occupied_from: move_in + Duration::days(7),
        expected_vacate: Some(vacate),
        monthly_rent: Some(420),
    });
    match double_booking {
        Err(AllocationError::Conflict { conflicts }) => {
            for conflict in conflicts {
                println!("- rejected: {}", conflict.description);
            }
        }
        Err(other) => println!("- rejected: {other}"),
        Ok(_) => println!("- unexpected: double booking was accepted"),
    }

    println!("\n3. Rule evaluation for a long-stay request");
    let context = RequestContext::new()
        .with("stay_kind", ContextValue::Text("long".to_string()))
        .with("bed_type", ContextValue::Text("dormitory".to_string()));
    let outcome = service
        .evaluate_rules(&HostelId("hostel-demo".to_string()), &context)
        .map_err(AppError::from)?;
    println!(
        "- {} rule(s) matched, score {}",
        outcome.matched_rules.len(),
        outcome.score
    );
    for (field, value) in &outcome.modifications {
        println!("  - modification: {field} = {value:?}");
    }

    println!("\n4. Optimization over the remaining beds");
    let pool: Vec<BedId> = (2..=4)
        .map(|index| BedId(format!("dorm-a-bed-{index}")))
        .collect();
    let requests = vec![
        PendingRequest {
            occupant_id: OccupantId("guest-bo".to_string()),
            preferred_kind: Some(BedKind::Dormitory),
            preferred_bunk: None,
            move_in,
            expected_vacate: Some(vacate),
            monthly_rent: Some(390),
        },
        PendingRequest {
            occupant_id: OccupantId("guest-chi".to_string()),
            preferred_kind: Some(BedKind::Dormitory),
            preferred_bunk: None,
            move_in,
            expected_vacate: None,
            monthly_rent: Some(390),
        },
    ];
    let optimization = service
        .run_optimization(
            &HostelId("hostel-demo".to_string()),
            &pool,
            &requests,
            OptimizationParams::default(),
        )
        .map_err(AppError::from)?;
    println!(
        "- {} of {} requests placed, total score {}",
        optimization.record.assignments_count,
        optimization.record.requests_considered,
        optimization.record.total_score
    );
    for assignment in &optimization.assignments {
        println!("  - {} -> {}", assignment.occupant_id, assignment.bed_id);
    }
    for warning in &optimization.warnings {
        println!("  - note: {warning}");
    }

    println!("\n5. Room availability and alerts");
    for room in ["dorm-a", "private-b"] {
        let room_id = RoomId(room.to_string());
        let record = service.availability(&room_id).map_err(AppError::from)?;
        println!(
            "- {}: {}/{} beds free, occupancy {:.0}%, demand {}",
            room,
            record.available_beds,
            record.total_beds,
            record.occupancy_rate,
            record.demand_level.label()
        );
        for alert in service.check_alerts(&room_id).map_err(AppError::from)? {
            println!("  - alert [{:?}] {}", alert.severity, alert.kind.label());
        }
    }

    println!("\n6. Transfer and completion");
    let transferred = service
        .transfer(
            &first.id,
            &BedId("private-b-bed-1".to_string()),
            move_in + Duration::days(10),
            Some("upgraded to a private room".to_string()),
        )
        .map_err(AppError::from)?;
    println!(
        "- {} moved to {} on {}",
        transferred.occupant_id, transferred.bed_id, transferred.occupied_from
    );
    let completed = service
        .complete(&transferred.id, vacate)
        .map_err(AppError::from)?;
    println!(
        "- stay completed after {} day(s)",
        completed.duration_days.unwrap_or_default()
    );

    if args.show_history {
        println!("\nAssignment history");
        let entries = service
            .history(&HistoryFilter::default(), 50)
            .map_err(AppError::from)?;
        for entry in entries {
            println!(
                "- [{}] {} on {} ({})",
                entry.change.label(),
                entry.occupant_id,
                entry.bed_id,
                entry.recorded_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    Ok(())
}

fn seed_demo_rules(store: &MemoryAllocationStore) {
    let mut modifications = BTreeMap::new();
    modifications.insert("deposit_waived".to_string(), ContextValue::Flag(true));
    store.upsert_rule(AssignmentRule {
        id: RuleId("rule-long-stay".to_string()),
        hostel_id: HostelId("hostel-demo".to_string()),
        name: "long stay deposit waiver".to_string(),
        priority: 1,
        execution_order: 1,
        condition: Predicate::Equals {
            field: "stay_kind".to_string(),
            expected: ContextValue::Text("long".to_string()),
        },
        modifications,
        is_active: true,
        execution_count: 0,
        success_count: 0,
    });

    store.upsert_rule(AssignmentRule {
        id: RuleId("rule-dorm-pricing".to_string()),
        hostel_id: HostelId("hostel-demo".to_string()),
        name: "dormitory base pricing".to_string(),
        priority: 2,
        execution_order: 1,
        condition: Predicate::Equals {
            field: "bed_type".to_string(),
            expected: ContextValue::Text("dormitory".to_string()),
        },
        modifications: BTreeMap::new(),
        is_active: true,
        execution_count: 0,
        success_count: 0,
    });
}
