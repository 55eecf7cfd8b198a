//! Rule evaluation engine.
//!
//! Evaluates a validated rule against one symbol's snapshot.
//!
//! # Evaluation Semantics
//!
//! - `AND`: short-circuits on the first `false`
//! - `OR`: short-circuits on the first `true`
//! - Nested groups are evaluated recursively in declaration order
//! - A leaf whose field is absent from the snapshot is `false`, not an error
//! - Equality uses an absolute epsilon of 1e-9; text comparisons ignore case
//!
//! The logical pass drives the [`ConditionObserver`], so instrumentation only
//! sees the leaves that short-circuiting actually reached. Scoring is a
//! separate pass over every leaf: `condition_score` is the base score plus the
//! weight of each leaf that passed on its own, whatever the group outcome.

use crate::domain::rule::{
    Condition, ConditionGroup, ConditionNode, Logic, NumericTest, Rule, Test, TextTest,
};
use crate::domain::snapshot::{FieldValue, StockSnapshot};

const EPSILON: f64 = 1e-9;

/// Outcome of evaluating one rule against one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub matched: bool,
    /// Field names of leaves that passed, in rule order.
    pub matched_conditions: Vec<String>,
    /// Field names of leaves that failed, in rule order.
    pub failed_conditions: Vec<String>,
    pub condition_score: f64,
}

/// Receives each leaf visited by the short-circuiting logical pass.
pub trait ConditionObserver {
    fn observe(&mut self, condition: &Condition, passed: bool);
}

pub struct NoopObserver;

impl ConditionObserver for NoopObserver {
    fn observe(&mut self, _condition: &Condition, _passed: bool) {}
}

pub fn evaluate(rule: &Rule, snapshot: &StockSnapshot) -> Evaluation {
    evaluate_with(rule, snapshot, &mut NoopObserver)
}

pub fn evaluate_with(
    rule: &Rule,
    snapshot: &StockSnapshot,
    observer: &mut dyn ConditionObserver,
) -> Evaluation {
    let matched = evaluate_group(&rule.conditions, snapshot, observer);

    let mut matched_conditions = Vec::new();
    let mut failed_conditions = Vec::new();
    let mut condition_score = rule.scoring.base_score;

    for leaf in rule.conditions.leaves() {
        let name = leaf.field_name();
        if evaluate_condition(leaf, snapshot) {
            condition_score += rule.scoring.weight(name);
            matched_conditions.push(name.to_string());
        } else {
            failed_conditions.push(name.to_string());
        }
    }

    Evaluation {
        matched,
        matched_conditions,
        failed_conditions,
        condition_score,
    }
}

pub fn evaluate_group(
    group: &ConditionGroup,
    snapshot: &StockSnapshot,
    observer: &mut dyn ConditionObserver,
) -> bool {
    match group.logic {
        Logic::And => {
            for node in &group.nodes {
                if !evaluate_node(node, snapshot, observer) {
                    return false;
                }
            }
            true
        }
        Logic::Or => {
            for node in &group.nodes {
                if evaluate_node(node, snapshot, observer) {
                    return true;
                }
            }
            false
        }
    }
}

fn evaluate_node(
    node: &ConditionNode,
    snapshot: &StockSnapshot,
    observer: &mut dyn ConditionObserver,
) -> bool {
    match node {
        ConditionNode::Leaf(condition) => {
            let passed = evaluate_condition(condition, snapshot);
            observer.observe(condition, passed);
            passed
        }
        ConditionNode::Group(group) => evaluate_group(group, snapshot, observer),
    }
}

pub fn evaluate_condition(condition: &Condition, snapshot: &StockSnapshot) -> bool {
    match condition {
        Condition::Technical { field, test } => snapshot
            .technical(*field)
            .is_some_and(|v| numeric_matches(test, v)),
        Condition::Fundamental { field, test } => {
            value_matches(test, snapshot.fundamental(*field))
        }
        Condition::Market { field, test } => value_matches(test, snapshot.market(*field)),
        Condition::Time { field, test } => numeric_matches(test, snapshot.time(*field)),
    }
}

fn value_matches(test: &Test, value: Option<FieldValue<'_>>) -> bool {
    match (test, value) {
        (Test::Numeric(t), Some(FieldValue::Number(v))) => numeric_matches(t, v),
        (Test::Text(t), Some(FieldValue::Text(s))) => text_matches(t, s),
        _ => false,
    }
}

fn numeric_matches(test: &NumericTest, v: f64) -> bool {
    if !v.is_finite() {
        return false;
    }
    match test {
        NumericTest::Equals(x) => (v - x).abs() < EPSILON,
        NumericTest::NotEquals(x) => (v - x).abs() >= EPSILON,
        NumericTest::GreaterThan(x) => v > *x,
        NumericTest::GreaterThanOrEqual(x) => v >= *x,
        NumericTest::LessThan(x) => v < *x,
        NumericTest::LessThanOrEqual(x) => v <= *x,
        NumericTest::Between { lower, upper } => v >= *lower && v <= *upper,
    }
}

fn text_matches(test: &TextTest, s: &str) -> bool {
    match test {
        TextTest::Equals(x) => s.eq_ignore_ascii_case(x),
        TextTest::NotEquals(x) => !s.eq_ignore_ascii_case(x),
        TextTest::In(items) => items.iter().any(|x| s.eq_ignore_ascii_case(x)),
        TextTest::Contains(x) => s.to_lowercase().contains(&x.to_lowercase()),
    }
}
