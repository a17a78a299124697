//! Ordered, prioritized condition -> action rules applied to assignment
//! requests.
//!
//! Rules are evaluated in `(priority asc, execution_order asc)` order. A match
//! adds a fixed positive weight to the cumulative score and merges the rule's
//! declared modifications into the result. Evaluation never fails on a
//! non-match; zero matched rules yields a zero-score, unmodified outcome.

mod predicate;

pub use predicate::{ContextValue, Predicate, RequestContext};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{HostelId, RuleId};

/// Persisted configuration for one assignment rule, scoped to a hostel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRule {
    pub id: RuleId,
    pub hostel_id: HostelId,
    pub name: String,
    /// Lower priority evaluates first; `execution_order` breaks ties.
    pub priority: i32,
    pub execution_order: i32,
    pub condition: Predicate,
    /// Field adjustments merged into the outcome when the rule matches.
    pub modifications: BTreeMap<String, ContextValue>,
    pub is_active: bool,
    pub execution_count: u64,
    pub success_count: u64,
}

impl AssignmentRule {
    /// Sort key for evaluation order.
    pub fn evaluation_order(&self) -> (i32, i32) {
        (self.priority, self.execution_order)
    }
}

/// Result of evaluating the rule set against one request context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub matched_rules: Vec<RuleId>,
    pub score: u32,
    pub modifications: BTreeMap<String, ContextValue>,
    pub warnings: Vec<String>,
}

/// Evaluate active rules, in order, against a request context.
///
/// The caller is responsible for persisting counter increments; this function
/// reports which rules were evaluated and which matched through the outcome
/// and the returned tally.
pub fn evaluate(
    rules: &[AssignmentRule],
    context: &RequestContext,
    match_weight: u32,
) -> (RuleOutcome, Vec<RuleExecution>) {
    let mut outcome = RuleOutcome::default();
    let mut executions = Vec::with_capacity(rules.len());

    let mut ordered: Vec<&AssignmentRule> = rules.iter().filter(|rule| rule.is_active).collect();
    ordered.sort_by_key(|rule| rule.evaluation_order());

    for rule in ordered {
        let matched = rule.condition.matches(context);
        executions.push(RuleExecution {
            rule_id: rule.id.clone(),
            matched,
        });

        if !matched {
            continue;
        }

        let unchecked = rule.condition.unchecked_fields(context);
        if !unchecked.is_empty() {
            outcome.warnings.push(format!(
                "rule '{}' matched without checking absent field(s): {}",
                rule.name,
                unchecked.join(", ")
            ));
        }

        for (field, value) in &rule.modifications {
            if let Some(previous) = outcome.modifications.get(field) {
                if previous != value {
                    outcome.warnings.push(format!(
                        "rule '{}' overrides modification for field '{}'",
                        rule.name, field
                    ));
                }
            }
            outcome.modifications.insert(field.clone(), value.clone());
        }

        outcome.matched_rules.push(rule.id.clone());
        outcome.score += match_weight;
    }

    (outcome, executions)
}

/// Per-rule evaluation tally for counter bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleExecution {
    pub rule_id: RuleId,
    pub matched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, priority: i32, order: i32, field: &str, expected: &str) -> AssignmentRule {
        AssignmentRule {
            id: RuleId(id.to_string()),
            hostel_id: HostelId("hostel-1".to_string()),
            name: format!("rule {id}"),
            priority,
            execution_order: order,
            condition: Predicate::Equals {
                field: field.to_string(),
                expected: ContextValue::Text(expected.to_string()),
            },
            modifications: BTreeMap::new(),
            is_active: true,
            execution_count: 0,
            success_count: 0,
        }
    }

    fn context() -> RequestContext {
        RequestContext::new().with("bed_type", ContextValue::Text("single".to_string()))
    }

    #[test]
    fn rules_evaluate_in_priority_then_execution_order() {
        let rules = vec![
            rule("r-late", 5, 1, "bed_type", "single"),
            rule("r-first", 1, 2, "bed_type", "single"),
            rule("r-second", 1, 3, "bed_type", "single"),
        ];

        let (outcome, _) = evaluate(&rules, &context(), 10);
        assert_eq!(
            outcome.matched_rules,
            vec![
                RuleId("r-first".to_string()),
                RuleId("r-second".to_string()),
                RuleId("r-late".to_string()),
            ]
        );
        assert_eq!(outcome.score, 30);
    }

    #[test]
    fn inactive_rules_are_skipped_entirely() {
        let mut inactive = rule("r-off", 1, 1, "bed_type", "single");
        inactive.is_active = false;

        let (outcome, executions) = evaluate(&[inactive], &context(), 10);
        assert!(outcome.matched_rules.is_empty());
        assert!(executions.is_empty());
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn no_matches_yields_zero_score_unmodified_outcome() {
        let rules = vec![rule("r-1", 1, 1, "bed_type", "bunk")];

        let (outcome, executions) = evaluate(&rules, &context(), 10);
        assert_eq!(outcome, RuleOutcome::default());
        assert_eq!(executions.len(), 1);
        assert!(!executions[0].matched);
    }

    #[test]
    fn later_rule_overriding_a_modification_warns() {
        let mut first = rule("r-1", 1, 1, "bed_type", "single");
        first.modifications.insert(
            "room_note".to_string(),
            ContextValue::Text("quiet".to_string()),
        );
        let mut second = rule("r-2", 2, 1, "bed_type", "single");
        second.modifications.insert(
            "room_note".to_string(),
            ContextValue::Text("street side".to_string()),
        );

        let (outcome, _) = evaluate(&[first, second], &context(), 10);
        assert_eq!(
            outcome.modifications.get("room_note"),
            Some(&ContextValue::Text("street side".to_string()))
        );
        assert_eq!(outcome.warnings.len(), 1);
    }
}
