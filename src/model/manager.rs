//! The unit of persistence: the full rule/schedule set plus version token.

use serde::{Deserialize, Serialize};

use super::{Rule, Schedule};

/// The full rule/schedule set, as loaded from or written to the pipeline.
///
/// `version` is the opaque concurrency token of the revision this config
/// was loaded from; it is empty until a load and passed through unchanged
/// on every write so the pipeline can detect concurrent overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub schedules: Vec<Schedule>,

    #[serde(default)]
    pub version: String,
}

impl ScheduleConfig {
    /// Look up a rule by name.
    pub fn rule_by_name(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Look up a schedule by name.
    pub fn schedule(&self, name: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|schedule| schedule.name == name)
    }
}
