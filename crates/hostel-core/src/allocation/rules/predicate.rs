use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value carried by a request context field or a rule condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Flag(bool),
    Number(i64),
    Text(String),
}

/// Flat field map describing an assignment request during rule evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext(pub BTreeMap<String, ContextValue>);

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: ContextValue) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&ContextValue> {
        self.0.get(field)
    }
}

/// Tagged predicate tree for rule conditions. The persisted schema is a flat
/// equality map, so conditions load as a [`Predicate::All`] of
/// [`Predicate::Equals`] leaves; the tree form makes the matching policy
/// explicit and testable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Equals { field: String, expected: ContextValue },
    All { clauses: Vec<Predicate> },
}

impl Predicate {
    /// Build the predicate tree for a persisted flat condition map.
    pub fn from_condition_map(conditions: BTreeMap<String, ContextValue>) -> Self {
        Predicate::All {
            clauses: conditions
                .into_iter()
                .map(|(field, expected)| Predicate::Equals { field, expected })
                .collect(),
        }
    }

    /// Permissive match over intersecting keys: an `Equals` leaf whose field
    /// is absent from the request does not block the match. Deliberate
    /// policy; evaluation reports the unchecked fields as warnings.
    pub fn matches(&self, context: &RequestContext) -> bool {
        match self {
            Predicate::Equals { field, expected } => match context.get(field) {
                Some(actual) => actual == expected,
                None => true,
            },
            Predicate::All { clauses } => clauses.iter().all(|clause| clause.matches(context)),
        }
    }

    /// Fields the predicate constrains but the request never supplied, used
    /// for evaluation warnings.
    pub fn unchecked_fields(&self, context: &RequestContext) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_unchecked(context, &mut fields);
        fields
    }

    fn collect_unchecked(&self, context: &RequestContext, fields: &mut Vec<String>) {
        match self {
            Predicate::Equals { field, .. } => {
                if context.get(field).is_none() {
                    fields.push(field.clone());
                }
            }
            Predicate::All { clauses } => {
                for clause in clauses {
                    clause.collect_unchecked(context, fields);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext::new()
            .with("bed_type", ContextValue::Text("single".to_string()))
            .with("nights", ContextValue::Number(30))
            .with("long_stay", ContextValue::Flag(true))
    }

    #[test]
    fn equals_matches_on_equal_value() {
        let predicate = Predicate::Equals {
            field: "bed_type".to_string(),
            expected: ContextValue::Text("single".to_string()),
        };
        assert!(predicate.matches(&context()));
    }

    #[test]
    fn equals_rejects_on_different_value() {
        let predicate = Predicate::Equals {
            field: "bed_type".to_string(),
            expected: ContextValue::Text("bunk".to_string()),
        };
        assert!(!predicate.matches(&context()));
    }

    #[test]
    fn absent_field_does_not_block_a_match() {
        let predicate = Predicate::Equals {
            field: "floor".to_string(),
            expected: ContextValue::Number(2),
        };
        assert!(predicate.matches(&context()));
        assert_eq!(
            predicate.unchecked_fields(&context()),
            vec!["floor".to_string()]
        );
    }

    #[test]
    fn all_requires_every_present_clause_to_agree() {
        let conditions: std::collections::BTreeMap<_, _> = [
            (
                "bed_type".to_string(),
                ContextValue::Text("single".to_string()),
            ),
            ("nights".to_string(), ContextValue::Number(30)),
            ("floor".to_string(), ContextValue::Number(2)),
        ]
        .into_iter()
        .collect();
        let predicate = Predicate::from_condition_map(conditions);

        assert!(predicate.matches(&context()));

        let mismatched = context().with("floor", ContextValue::Number(3));
        assert!(!predicate.matches(&mismatched));
    }
}
