//! Rule definition wire format and boundary validation.
//!
//! Rules arrive as JSON (`RuleDefinition`) with loosely typed condition
//! values. [`validate_rule`] converts them into the typed [`Rule`] model and
//! rejects anything the engine could not evaluate: unknown types, fields or
//! operators, operator/field kind mismatches, malformed values and empty
//! groups. Errors carry the JSON path of the offending node.

use crate::domain::error::RuleError;
use crate::domain::rule::{
    Condition, ConditionGroup, ConditionNode, ConditionType, FundamentalField, Logic,
    MarketField, NumericTest, Priority, Rule, RuleActions, RuleStatus, ScoringConfig,
    TechnicalField, Test, TextTest, TimeField, ValueKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_status")]
    pub status: String,
    pub conditions: GroupDefinition,
    #[serde(default)]
    pub scoring_config: ScoringConfig,
    #[serde(default)]
    pub actions: RuleActions,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub execution_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_priority() -> i64 {
    2
}

fn default_status() -> String {
    "draft".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub operator: String,
    pub conditions: Vec<NodeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeDefinition {
    Group(GroupDefinition),
    Leaf(ConditionDefinition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub field: String,
    pub operator: String,
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    In,
    Contains,
}

impl Operator {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => Some(Operator::Equals),
            "not_equals" | "ne" | "!=" => Some(Operator::NotEquals),
            "greater_than" | "gt" | ">" => Some(Operator::GreaterThan),
            "greater_than_or_equal" | "gte" | ">=" => Some(Operator::GreaterThanOrEqual),
            "less_than" | "lt" | "<" => Some(Operator::LessThan),
            "less_than_or_equal" | "lte" | "<=" => Some(Operator::LessThanOrEqual),
            "between" => Some(Operator::Between),
            "in" => Some(Operator::In),
            "contains" => Some(Operator::Contains),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::Contains => "contains",
        }
    }
}

pub fn validate_rule(def: &RuleDefinition) -> Result<Rule, RuleError> {
    if def.id.trim().is_empty() {
        return Err(RuleError::new("id", "id must not be empty"));
    }
    if def.name.trim().is_empty() {
        return Err(RuleError::new("name", "name must not be empty"));
    }

    let priority = u8::try_from(def.priority)
        .ok()
        .and_then(Priority::from_level)
        .ok_or_else(|| {
            RuleError::new(
                "priority",
                format!("priority must be 1, 2 or 3, found {}", def.priority),
            )
        })?;

    let status = RuleStatus::parse(&def.status).ok_or_else(|| {
        RuleError::new(
            "status",
            format!(
                "status must be active, draft or archived, found '{}'",
                def.status
            ),
        )
    })?;

    if def.success_count > def.execution_count {
        return Err(RuleError::new(
            "success_count",
            "success_count cannot exceed execution_count",
        ));
    }

    let conditions = validate_group(&def.conditions, "conditions")?;
    validate_scoring(&def.scoring_config, &conditions)?;

    Ok(Rule {
        id: def.id.trim().to_string(),
        name: def.name.trim().to_string(),
        description: def.description.clone(),
        priority,
        status,
        conditions,
        scoring: def.scoring_config.clone(),
        actions: def.actions.clone(),
        tags: def.tags.clone(),
        execution_count: def.execution_count,
        success_count: def.success_count,
        created_at: def.created_at,
        updated_at: def.updated_at,
    })
}

fn validate_group(group: &GroupDefinition, path: &str) -> Result<ConditionGroup, RuleError> {
    let logic = match group.operator.trim().to_ascii_uppercase().as_str() {
        "AND" => Logic::And,
        "OR" => Logic::Or,
        other => {
            return Err(RuleError::new(
                format!("{}.operator", path),
                format!("group operator must be AND or OR, found '{}'", other),
            ));
        }
    };

    if group.conditions.is_empty() {
        return Err(RuleError::new(
            format!("{}.conditions", path),
            "group must contain at least one condition",
        ));
    }

    let mut nodes = Vec::with_capacity(group.conditions.len());
    for (i, node) in group.conditions.iter().enumerate() {
        let node_path = format!("{}.conditions[{}]", path, i);
        let node = match node {
            NodeDefinition::Group(g) => ConditionNode::Group(validate_group(g, &node_path)?),
            NodeDefinition::Leaf(c) => ConditionNode::Leaf(validate_condition(c, &node_path)?),
        };
        nodes.push(node);
    }

    Ok(ConditionGroup { logic, nodes })
}

fn validate_condition(def: &ConditionDefinition, path: &str) -> Result<Condition, RuleError> {
    let field = def.field.trim();
    let condition_type = match &def.condition_type {
        Some(t) => parse_condition_type(t)
            .ok_or_else(|| RuleError::new(format!("{}.type", path), format!("unknown condition type '{}'", t)))?,
        None => infer_condition_type(field).ok_or_else(|| {
            RuleError::new(
                format!("{}.field", path),
                format!("unknown field '{}'", field),
            )
        })?,
    };

    let operator = Operator::parse(&def.operator).ok_or_else(|| {
        RuleError::new(
            format!("{}.operator", path),
            format!("unknown operator '{}'", def.operator),
        )
    })?;

    let unknown_field = || {
        RuleError::new(
            format!("{}.field", path),
            format!("unknown {:?} field '{}'", condition_type, field).to_lowercase(),
        )
    };

    match condition_type {
        ConditionType::Technical => {
            let field = TechnicalField::parse(field).ok_or_else(unknown_field)?;
            let test = numeric_test(operator, &def.value, path)?;
            Ok(Condition::Technical { field, test })
        }
        ConditionType::Fundamental => {
            let field = FundamentalField::parse(field).ok_or_else(unknown_field)?;
            let test = typed_test(field.kind(), operator, &def.value, path)?;
            Ok(Condition::Fundamental { field, test })
        }
        ConditionType::Market => {
            let field = MarketField::parse(field).ok_or_else(unknown_field)?;
            let test = typed_test(field.kind(), operator, &def.value, path)?;
            Ok(Condition::Market { field, test })
        }
        ConditionType::Time => {
            let field = TimeField::parse(field).ok_or_else(unknown_field)?;
            let test = numeric_test(operator, &def.value, path)?;
            check_time_bounds(field, &test, path)?;
            Ok(Condition::Time { field, test })
        }
    }
}

fn parse_condition_type(s: &str) -> Option<ConditionType> {
    match s.trim().to_ascii_lowercase().as_str() {
        "technical" => Some(ConditionType::Technical),
        "fundamental" => Some(ConditionType::Fundamental),
        "market" => Some(ConditionType::Market),
        "time" => Some(ConditionType::Time),
        _ => None,
    }
}

/// Field names are unique across types, so a missing `type` can be inferred.
fn infer_condition_type(field: &str) -> Option<ConditionType> {
    if TechnicalField::parse(field).is_some() {
        Some(ConditionType::Technical)
    } else if FundamentalField::parse(field).is_some() {
        Some(ConditionType::Fundamental)
    } else if MarketField::parse(field).is_some() {
        Some(ConditionType::Market)
    } else if TimeField::parse(field).is_some() {
        Some(ConditionType::Time)
    } else {
        None
    }
}

fn typed_test(kind: ValueKind, op: Operator, value: &Value, path: &str) -> Result<Test, RuleError> {
    match kind {
        ValueKind::Number => numeric_test(op, value, path).map(Test::Numeric),
        ValueKind::Text => text_test(op, value, path).map(Test::Text),
    }
}

fn numeric_test(op: Operator, value: &Value, path: &str) -> Result<NumericTest, RuleError> {
    let value_path = format!("{}.value", path);
    let number = || {
        as_number(value).ok_or_else(|| {
            RuleError::new(
                &value_path,
                format!("operator {} needs a number, found {}", op.name(), value),
            )
        })
    };

    match op {
        Operator::Equals => Ok(NumericTest::Equals(number()?)),
        Operator::NotEquals => Ok(NumericTest::NotEquals(number()?)),
        Operator::GreaterThan => Ok(NumericTest::GreaterThan(number()?)),
        Operator::GreaterThanOrEqual => Ok(NumericTest::GreaterThanOrEqual(number()?)),
        Operator::LessThan => Ok(NumericTest::LessThan(number()?)),
        Operator::LessThanOrEqual => Ok(NumericTest::LessThanOrEqual(number()?)),
        Operator::Between => {
            let bounds = value
                .as_array()
                .filter(|a| a.len() == 2)
                .and_then(|a| Some((as_number(&a[0])?, as_number(&a[1])?)))
                .ok_or_else(|| {
                    RuleError::new(
                        &value_path,
                        format!("between needs [lower, upper], found {}", value),
                    )
                })?;
            if bounds.0 > bounds.1 {
                return Err(RuleError::new(
                    &value_path,
                    format!("between lower {} exceeds upper {}", bounds.0, bounds.1),
                ));
            }
            Ok(NumericTest::Between {
                lower: bounds.0,
                upper: bounds.1,
            })
        }
        Operator::In | Operator::Contains => Err(RuleError::new(
            format!("{}.operator", path),
            format!("operator {} is not valid for a numeric field", op.name()),
        )),
    }
}

fn text_test(op: Operator, value: &Value, path: &str) -> Result<TextTest, RuleError> {
    let value_path = format!("{}.value", path);
    let text = || {
        value
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RuleError::new(
                    &value_path,
                    format!("operator {} needs a non-empty string, found {}", op.name(), value),
                )
            })
    };

    match op {
        Operator::Equals => Ok(TextTest::Equals(text()?)),
        Operator::NotEquals => Ok(TextTest::NotEquals(text()?)),
        Operator::Contains => Ok(TextTest::Contains(text()?)),
        Operator::In => {
            let items: Option<Vec<String>> = value.as_array().and_then(|a| {
                a.iter()
                    .map(|v| v.as_str().map(|s| s.trim().to_string()))
                    .collect()
            });
            match items {
                Some(items) if !items.is_empty() => Ok(TextTest::In(items)),
                _ => Err(RuleError::new(
                    &value_path,
                    format!("in needs a non-empty list of strings, found {}", value),
                )),
            }
        }
        _ => Err(RuleError::new(
            format!("{}.operator", path),
            format!("operator {} is not valid for a text field", op.name()),
        )),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn check_time_bounds(field: TimeField, test: &NumericTest, path: &str) -> Result<(), RuleError> {
    let (min, max) = field.bounds();
    let values: Vec<f64> = match test {
        NumericTest::Between { lower, upper } => vec![*lower, *upper],
        NumericTest::Equals(v)
        | NumericTest::NotEquals(v)
        | NumericTest::GreaterThan(v)
        | NumericTest::GreaterThanOrEqual(v)
        | NumericTest::LessThan(v)
        | NumericTest::LessThanOrEqual(v) => vec![*v],
    };
    for v in values {
        if v < min || v > max {
            return Err(RuleError::new(
                format!("{}.value", path),
                format!("{} must be between {} and {}, found {}", field.name(), min, max, v),
            ));
        }
    }
    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig, conditions: &ConditionGroup) -> Result<(), RuleError> {
    if !scoring.base_score.is_finite() {
        return Err(RuleError::new(
            "scoring_config.base_score",
            "base_score must be a finite number",
        ));
    }

    let leaves = conditions.leaves();
    for (field, weight) in &scoring.condition_weights {
        let path = format!("scoring_config.condition_weights.{}", field);
        if !weight.is_finite() {
            return Err(RuleError::new(path, "weight must be a finite number"));
        }
        if !leaves.iter().any(|c| c.field_name() == field) {
            return Err(RuleError::new(
                path,
                format!("weight references field '{}' not used by any condition", field),
            ));
        }
    }
    Ok(())
}

impl Rule {
    /// Convert back to the wire format, e.g. for persisting updated counters.
    pub fn to_definition(&self) -> RuleDefinition {
        RuleDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            priority: self.priority.level() as i64,
            status: match self.status {
                RuleStatus::Active => "active",
                RuleStatus::Draft => "draft",
                RuleStatus::Archived => "archived",
            }
            .to_string(),
            conditions: group_definition(&self.conditions),
            scoring_config: self.scoring.clone(),
            actions: self.actions.clone(),
            tags: self.tags.clone(),
            execution_count: self.execution_count,
            success_count: self.success_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn group_definition(group: &ConditionGroup) -> GroupDefinition {
    GroupDefinition {
        operator: group.logic.to_string(),
        conditions: group
            .nodes
            .iter()
            .map(|node| match node {
                ConditionNode::Group(g) => NodeDefinition::Group(group_definition(g)),
                ConditionNode::Leaf(c) => NodeDefinition::Leaf(condition_definition(c)),
            })
            .collect(),
    }
}

fn condition_definition(condition: &Condition) -> ConditionDefinition {
    let (op, value) = match condition {
        Condition::Technical { test, .. } | Condition::Time { test, .. } => numeric_wire(test),
        Condition::Fundamental { test, .. } | Condition::Market { test, .. } => match test {
            Test::Numeric(t) => numeric_wire(t),
            Test::Text(t) => text_wire(t),
        },
    };
    let condition_type = match condition.condition_type() {
        ConditionType::Technical => "technical",
        ConditionType::Fundamental => "fundamental",
        ConditionType::Market => "market",
        ConditionType::Time => "time",
    };

    ConditionDefinition {
        field: condition.field_name().to_string(),
        operator: op.name().to_string(),
        value,
        condition_type: Some(condition_type.to_string()),
    }
}

fn numeric_wire(test: &NumericTest) -> (Operator, Value) {
    match test {
        NumericTest::Equals(v) => (Operator::Equals, Value::from(*v)),
        NumericTest::NotEquals(v) => (Operator::NotEquals, Value::from(*v)),
        NumericTest::GreaterThan(v) => (Operator::GreaterThan, Value::from(*v)),
        NumericTest::GreaterThanOrEqual(v) => (Operator::GreaterThanOrEqual, Value::from(*v)),
        NumericTest::LessThan(v) => (Operator::LessThan, Value::from(*v)),
        NumericTest::LessThanOrEqual(v) => (Operator::LessThanOrEqual, Value::from(*v)),
        NumericTest::Between { lower, upper } => {
            (Operator::Between, Value::from(vec![*lower, *upper]))
        }
    }
}

fn text_wire(test: &TextTest) -> (Operator, Value) {
    match test {
        TextTest::Equals(s) => (Operator::Equals, Value::from(s.as_str())),
        TextTest::NotEquals(s) => (Operator::NotEquals, Value::from(s.as_str())),
        TextTest::Contains(s) => (Operator::Contains, Value::from(s.as_str())),
        TextTest::In(items) => (Operator::In, Value::from(items.clone())),
    }
}
