//! JSON file rule store.
//!
//! The file holds an array of rule definitions. Every rule is validated on
//! load; execution counters live in memory until [`JsonRuleStore::save`].

use crate::domain::error::{RuleError, ScreenerError};
use crate::domain::rule::Rule;
use crate::domain::rule_validation::{validate_rule, RuleDefinition};
use crate::ports::rule_store_port::{RuleFilter, RuleStorePort};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

pub struct JsonRuleStore {
    rules: RwLock<Vec<Rule>>,
    path: Option<PathBuf>,
}

/// Parse a rule file without validating the rules in it.
pub fn read_definitions(content: &str) -> Result<Vec<RuleDefinition>, ScreenerError> {
    Ok(serde_json::from_str(content)?)
}

impl JsonRuleStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
            path: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScreenerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut store = Self::from_json(&content)?;
        info!(path = %path.display(), rules = store.len(), "loaded rule store");
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Validate every definition; the first invalid rule fails the load.
    /// Error paths are prefixed with the rule's index in the file.
    pub fn from_json(content: &str) -> Result<Self, ScreenerError> {
        let definitions = read_definitions(content)?;
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(definitions.len());

        for (i, def) in definitions.iter().enumerate() {
            let rule = validate_rule(def).map_err(|e| {
                RuleError::new(format!("[{}].{}", i, e.path), e.message)
            })?;
            if !seen.insert(rule.id.clone()) {
                return Err(RuleError::new(
                    format!("[{}].id", i),
                    format!("duplicate rule id '{}'", rule.id),
                )
                .into());
            }
            rules.push(rule);
        }

        Ok(Self::new(rules))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Write the current rules, counters included, back to the file they
    /// were loaded from.
    pub fn save(&self) -> Result<(), ScreenerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let definitions: Vec<RuleDefinition> =
            self.read().iter().map(Rule::to_definition).collect();
        let json = serde_json::to_string_pretty(&definitions)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "saved rule store");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Rule>> {
        self.rules.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Rule>> {
        self.rules.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl RuleStorePort for JsonRuleStore {
    fn get_rule(&self, id: &str) -> Result<Rule, ScreenerError> {
        self.read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ScreenerError::RuleNotFound { id: id.to_string() })
    }

    /// Matching rules by priority, then id.
    fn list_rules(&self, filter: &RuleFilter) -> Result<Vec<Rule>, ScreenerError> {
        let mut rules: Vec<Rule> = self
            .read()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }

    fn increment_execution_stats(&self, id: &str, matched: bool) -> Result<(), ScreenerError> {
        let mut rules = self.write();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ScreenerError::RuleNotFound { id: id.to_string() })?;
        rule.record_execution(matched);
        rule.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::RuleStatus;
    use tempfile::TempDir;

    const RULES: &str = r#"[
        {
            "id": "value",
            "name": "Value dividend",
            "priority": 2,
            "status": "active",
            "tags": ["income"],
            "conditions": {"operator": "AND", "conditions": [
                {"field": "pe_ratio", "operator": "less_than", "value": 15, "type": "fundamental"}
            ]},
            "scoring_config": {"base_score": 50, "condition_weights": {"pe_ratio": 20}}
        },
        {
            "id": "breakout",
            "name": "Breakout",
            "priority": 1,
            "status": "draft",
            "conditions": {"operator": "OR", "conditions": [
                {"field": "volume_ratio", "operator": "greater_than", "value": 2}
            ]}
        }
    ]"#;

    #[test]
    fn loads_and_validates() {
        let store = JsonRuleStore::from_json(RULES).unwrap();
        assert_eq!(store.len(), 2);
        let rule = store.get_rule("value").unwrap();
        assert_eq!(rule.status, RuleStatus::Active);
        assert_eq!(rule.scoring.base_score, 50.0);
    }

    #[test]
    fn missing_rule_is_not_found() {
        let store = JsonRuleStore::from_json(RULES).unwrap();
        assert!(matches!(
            store.get_rule("nope"),
            Err(ScreenerError::RuleNotFound { id }) if id == "nope"
        ));
    }

    #[test]
    fn invalid_rule_error_carries_index() {
        let content = r#"[{"id": "x", "name": "X", "conditions": {"operator": "AND", "conditions": []}}]"#;
        let err = JsonRuleStore::from_json(content).err().unwrap();
        match err {
            ScreenerError::RuleInvalid(e) => assert!(e.path.starts_with("[0]."), "{}", e.path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let content = format!(
            "[{0}, {0}]",
            r#"{"id": "dup", "name": "D", "conditions": {"operator": "AND", "conditions": [
                {"field": "price", "operator": "gt", "value": 1}]}}"#
        );
        let err = JsonRuleStore::from_json(&content).err().unwrap();
        assert!(err.to_string().contains("duplicate rule id"));
    }

    #[test]
    fn list_rules_filters_and_orders() {
        let store = JsonRuleStore::from_json(RULES).unwrap();

        let all = store.list_rules(&RuleFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["breakout", "value"]);

        let active = store
            .list_rules(&RuleFilter {
                status: Some(RuleStatus::Active),
                tag: None,
            })
            .unwrap();
        assert_eq!(active.len(), 1);

        let tagged = store
            .list_rules(&RuleFilter {
                status: None,
                tag: Some("INCOME".into()),
            })
            .unwrap();
        assert_eq!(tagged[0].id, "value");
    }

    #[test]
    fn increments_counters() {
        let store = JsonRuleStore::from_json(RULES).unwrap();
        store.increment_execution_stats("value", true).unwrap();
        store.increment_execution_stats("value", false).unwrap();

        let rule = store.get_rule("value").unwrap();
        assert_eq!(rule.execution_count, 2);
        assert_eq!(rule.success_count, 1);
        assert!(rule.updated_at.is_some());

        assert!(store.increment_execution_stats("nope", true).is_err());
    }

    #[test]
    fn save_persists_counters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, RULES).unwrap();

        let store = JsonRuleStore::from_file(&path).unwrap();
        store.increment_execution_stats("breakout", true).unwrap();
        store.save().unwrap();

        let reloaded = JsonRuleStore::from_file(&path).unwrap();
        let rule = reloaded.get_rule("breakout").unwrap();
        assert_eq!(rule.execution_count, 1);
        assert_eq!(rule.success_count, 1);
    }
}
