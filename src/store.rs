//! In-memory authoritative copy of the rule/schedule set.
//!
//! Pure data-structure manipulation with name-uniqueness enforcement; no
//! persistence or network behavior lives here. Edits accumulate in memory
//! and only become durable when the publisher ships the whole config.
//!
//! Replacement happens in place so list positions survive an edit — rule
//! order inside a schedule is load-bearing for resolution.

use uuid::Uuid;

use crate::model::{Rule, Schedule, ScheduleConfig};

/// Errors from config store mutations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a rule named {0:?} already exists")]
    RuleNameConflict(String),

    #[error("a schedule named {0:?} already exists")]
    ScheduleNameConflict(String),

    #[error("no rule with id {0}")]
    UnknownRule(Uuid),

    #[error("no schedule named {0:?}")]
    UnknownSchedule(String),
}

/// Owns the working copy of the config between load and publish.
///
/// Explicit lifecycle: construct empty, [`replace`](Self::replace) on every
/// successful load, mutate through the upsert/remove methods, and hand
/// [`config`](Self::config) to the publisher.
#[derive(Debug, Default)]
pub struct ConfigStore {
    config: ScheduleConfig,
}

impl ConfigStore {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Replace the working copy wholesale (after a reload).
    pub fn replace(&mut self, config: ScheduleConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    // ── Rules ──

    /// Insert a rule, or replace the rule with id `existing` in place.
    ///
    /// Fails when another rule (excluding `existing`) already carries the
    /// name, so renaming a rule to its own unchanged name never
    /// self-conflicts.
    pub fn upsert_rule(&mut self, rule: Rule, existing: Option<Uuid>) -> Result<(), StoreError> {
        let conflict = self
            .config
            .rules
            .iter()
            .filter(|other| Some(other.id) != existing)
            .any(|other| other.name == rule.name);

        if conflict {
            return Err(StoreError::RuleNameConflict(rule.name));
        }

        match existing {
            None => self.config.rules.push(rule),
            Some(id) => {
                let slot = self
                    .config
                    .rules
                    .iter_mut()
                    .find(|other| other.id == id)
                    .ok_or(StoreError::UnknownRule(id))?;
                *slot = rule;
            }
        }

        Ok(())
    }

    /// Remove a rule. Schedules referencing it keep the dangling id; the
    /// resolver skips ids it cannot resolve.
    pub fn remove_rule(&mut self, id: Uuid) -> Result<Rule, StoreError> {
        let index = self
            .config
            .rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or(StoreError::UnknownRule(id))?;

        Ok(self.config.rules.remove(index))
    }

    // ── Schedules ──

    /// Insert a schedule, or replace the schedule named `existing` in place.
    pub fn upsert_schedule(
        &mut self,
        schedule: Schedule,
        existing: Option<&str>,
    ) -> Result<(), StoreError> {
        let conflict = self
            .config
            .schedules
            .iter()
            .filter(|other| Some(other.name.as_str()) != existing)
            .any(|other| other.name == schedule.name);

        if conflict {
            return Err(StoreError::ScheduleNameConflict(schedule.name));
        }

        match existing {
            None => self.config.schedules.push(schedule),
            Some(name) => {
                let slot = self
                    .config
                    .schedules
                    .iter_mut()
                    .find(|other| other.name == name)
                    .ok_or_else(|| StoreError::UnknownSchedule(name.to_string()))?;
                *slot = schedule;
            }
        }

        Ok(())
    }

    pub fn remove_schedule(&mut self, name: &str) -> Result<Schedule, StoreError> {
        let index = self
            .config
            .schedules
            .iter()
            .position(|schedule| schedule.name == name)
            .ok_or_else(|| StoreError::UnknownSchedule(name.to_string()))?;

        Ok(self.config.schedules.remove(index))
    }
}
