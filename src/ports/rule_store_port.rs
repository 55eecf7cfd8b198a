//! Rule store port.

use crate::domain::error::ScreenerError;
use crate::domain::rule::{Rule, RuleStatus};

/// Selects rules by status and tag; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub status: Option<RuleStatus>,
    pub tag: Option<String>,
}

impl RuleFilter {
    pub fn matches(&self, rule: &Rule) -> bool {
        if let Some(status) = self.status {
            if rule.status != status {
                return false;
            }
        }
        match &self.tag {
            Some(tag) => rule.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
            None => true,
        }
    }
}

/// Owns rule definitions and their execution counters.
///
/// The engine reads a rule, runs it, then asks the store to bump the
/// counters; it never writes rule state itself.
pub trait RuleStorePort: Send + Sync {
    fn get_rule(&self, id: &str) -> Result<Rule, ScreenerError>;

    fn list_rules(&self, filter: &RuleFilter) -> Result<Vec<Rule>, ScreenerError>;

    /// Increment `execution_count`, and `success_count` when `matched`.
    fn increment_execution_stats(&self, id: &str, matched: bool) -> Result<(), ScreenerError>;
}
