//! Greedy bed matcher over pending demand.
//!
//! Requests are taken in input order; each one claims the first remaining bed
//! with the maximum match score. Claimed beds leave the candidate pool via an
//! index-based claimed set, so a bed is never planned twice within a run. No
//! backtracking: a locally optimal pick may block a better global assignment,
//! which is an accepted trade-off of this algorithm.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Bed, BedId, BedKind, BunkLevel, HostelId, OccupantId, OptimizationId};

pub const ALGORITHM_NAME: &str = "greedy_match";
pub const DEFAULT_ALGORITHM_VERSION: &str = "v1";

/// Score contributions for one bed/request pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub base: i32,
    pub bed_kind: i32,
    pub bunk_preference: i32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            base: 50,
            bed_kind: 20,
            bunk_preference: 15,
        }
    }
}

/// Tunable parameters for one optimization run, stored verbatim on the
/// resulting record for reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationParams {
    #[serde(default)]
    pub weights: Option<MatchWeights>,
    #[serde(default = "OptimizationParams::default_version")]
    pub algorithm_version: String,
}

impl OptimizationParams {
    fn default_version() -> String {
        DEFAULT_ALGORITHM_VERSION.to_string()
    }

    pub fn weights(&self) -> MatchWeights {
        self.weights.unwrap_or_default()
    }
}

impl Default for OptimizationParams {
    fn default() -> Self {
        Self {
            weights: None,
            algorithm_version: Self::default_version(),
        }
    }
}

/// One occupant waiting for a bed, with optional preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub occupant_id: OccupantId,
    #[serde(default)]
    pub preferred_kind: Option<BedKind>,
    #[serde(default)]
    pub preferred_bunk: Option<BunkLevel>,
    pub move_in: NaiveDate,
    #[serde(default)]
    pub expected_vacate: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<u32>,
}

/// A planned (not yet committed) bed/occupant pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMatch {
    pub bed_id: BedId,
    pub occupant_id: OccupantId,
    pub match_score: i32,
}

/// Output of the planning pass over one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPlan {
    pub matches: Vec<PlannedMatch>,
    pub total_score: i64,
    pub average_match_score: f64,
}

/// Score one bed against one request.
pub fn score_bed(bed: &Bed, request: &PendingRequest, weights: &MatchWeights) -> i32 {
    let mut score = weights.base;
    if request.preferred_kind == Some(bed.kind) {
        score += weights.bed_kind;
    }
    if request.preferred_bunk == Some(bed.bunk_level) {
        score += weights.bunk_preference;
    }
    score
}

/// Plan matches for pending requests over the candidate bed pool.
///
/// O(requests x beds). Ties break toward the first bed in input order; the
/// loop stops once either side is exhausted.
pub fn plan_matches(
    beds: &[Bed],
    requests: &[PendingRequest],
    weights: &MatchWeights,
) -> OptimizationPlan {
    let mut claimed = vec![false; beds.len()];
    let mut matches = Vec::new();
    let mut total_score: i64 = 0;

    for request in requests {
        if matches.len() == beds.len() {
            break;
        }

        let mut best: Option<(usize, i32)> = None;
        for (index, bed) in beds.iter().enumerate() {
            if claimed[index] {
                continue;
            }
            let score = score_bed(bed, request, weights);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }

        if let Some((index, score)) = best {
            claimed[index] = true;
            total_score += i64::from(score);
            matches.push(PlannedMatch {
                bed_id: beds[index].id.clone(),
                occupant_id: request.occupant_id.clone(),
                match_score: score,
            });
        }
    }

    let average_match_score = if matches.is_empty() {
        0.0
    } else {
        total_score as f64 / matches.len() as f64
    };

    OptimizationPlan {
        matches,
        total_score,
        average_match_score,
    }
}

/// Audit/replay record persisted after every optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub id: OptimizationId,
    pub hostel_id: HostelId,
    pub algorithm: String,
    pub algorithm_version: String,
    /// The caller-supplied parameters, stored verbatim.
    pub params: serde_json::Value,
    pub beds_considered: usize,
    pub requests_considered: usize,
    pub assignments_count: usize,
    pub total_score: i64,
    pub average_match_score: f64,
    pub elapsed_ms: u64,
    pub ran_at: DateTime<Utc>,
}

/// Committed result handed back to the caller of an optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub record: OptimizationRecord,
    pub assignments: Vec<super::domain::Assignment>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::domain::RoomId;

    fn bed(id: &str, kind: BedKind, bunk: BunkLevel) -> Bed {
        Bed::new(
            BedId(id.to_string()),
            RoomId("room-1".to_string()),
            kind,
            bunk,
        )
    }

    fn request(occupant: &str, kind: Option<BedKind>, bunk: Option<BunkLevel>) -> PendingRequest {
        PendingRequest {
            occupant_id: OccupantId(occupant.to_string()),
            preferred_kind: kind,
            preferred_bunk: bunk,
            move_in: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            expected_vacate: None,
            monthly_rent: None,
        }
    }

    #[test]
    fn scoring_adds_kind_and_bunk_components() {
        let weights = MatchWeights::default();
        let bed = bed("bed-1", BedKind::Single, BunkLevel::Lower);

        let indifferent = request("occ-1", None, None);
        assert_eq!(score_bed(&bed, &indifferent, &weights), 50);

        let kind_match = request("occ-1", Some(BedKind::Single), None);
        assert_eq!(score_bed(&bed, &kind_match, &weights), 70);

        let full_match = request("occ-1", Some(BedKind::Single), Some(BunkLevel::Lower));
        assert_eq!(score_bed(&bed, &full_match, &weights), 85);
    }

    #[test]
    fn highest_scoring_bed_wins_and_leaves_the_pool() {
        let beds = vec![
            bed("bed-a", BedKind::Bunk, BunkLevel::Upper),
            bed("bed-b", BedKind::Single, BunkLevel::Standalone),
        ];
        let requests = vec![request("occ-1", Some(BedKind::Single), None)];

        let plan = plan_matches(&beds, &requests, &MatchWeights::default());
        assert_eq!(plan.matches.len(), 1);
        assert_eq!(plan.matches[0].bed_id, BedId("bed-b".to_string()));
        assert_eq!(plan.matches[0].match_score, 70);
        assert_eq!(plan.total_score, 70);
    }

    #[test]
    fn ties_break_toward_input_order() {
        let beds = vec![
            bed("bed-a", BedKind::Single, BunkLevel::Standalone),
            bed("bed-b", BedKind::Single, BunkLevel::Standalone),
        ];
        let requests = vec![request("occ-1", Some(BedKind::Single), None)];

        let plan = plan_matches(&beds, &requests, &MatchWeights::default());
        assert_eq!(plan.matches[0].bed_id, BedId("bed-a".to_string()));
    }

    #[test]
    fn run_never_plans_a_bed_twice() {
        let beds = vec![
            bed("bed-a", BedKind::Single, BunkLevel::Standalone),
            bed("bed-b", BedKind::Single, BunkLevel::Standalone),
        ];
        let requests = vec![
            request("occ-1", Some(BedKind::Single), None),
            request("occ-2", Some(BedKind::Single), None),
            request("occ-3", Some(BedKind::Single), None),
        ];

        let plan = plan_matches(&beds, &requests, &MatchWeights::default());
        assert_eq!(plan.matches.len(), 2);
        let mut bed_ids: Vec<_> = plan
            .matches
            .iter()
            .map(|matched| matched.bed_id.0.clone())
            .collect();
        bed_ids.sort();
        bed_ids.dedup();
        assert_eq!(bed_ids.len(), 2);
    }

    #[test]
    fn empty_batch_yields_empty_plan() {
        let plan = plan_matches(&[], &[], &MatchWeights::default());
        assert_eq!(plan, OptimizationPlan::default());
    }
}
