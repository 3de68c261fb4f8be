//! Status conditions: `Creating`, `Available`, `Unavailable`, `Deleting`.
//!
//! Modeled after the broad reconciliation-controller convention this system
//! belongs to (a small, append/update-by-type list persisted inside
//! `status`), extended per `SPEC_FULL.md` §4 with a `last_transition_time`
//! that only moves when the condition's `reason` actually changes, so a
//! steady-state object doesn't churn its status on every reconcile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::drift::DriftReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    Creating,
    Available,
    Unavailable,
    Deleting,
}

impl ConditionType {
    fn as_str(self) -> &'static str {
        match self {
            ConditionType::Creating => "Creating",
            ConditionType::Available => "Available",
            ConditionType::Unavailable => "Unavailable",
            ConditionType::Deleting => "Deleting",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub reason: String,
    pub message: String,
    /// Structured drift detail, present only on `Unavailable` conditions
    /// raised by the drift detector.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub drift: Option<DriftReason>,
    pub last_transition_time: DateTime<Utc>,
}

/// The full set of conditions on a Managed Object, keyed by type (at most
/// one entry per `ConditionType`).
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn from_value(v: Value) -> Self {
        let conditions = serde_json::from_value(v).unwrap_or_default();
        Self { conditions }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self.conditions).unwrap_or(Value::Array(Vec::new()))
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    pub fn has(&self, condition_type: ConditionType) -> bool {
        self.get(condition_type).is_some()
    }

    /// Set (insert or replace) the condition of `condition_type`. The
    /// `last_transition_time` is only refreshed when `reason` differs from
    /// whatever was already recorded for this type — this is the one place
    /// `now` is threaded in, so callers (and tests) control it explicitly
    /// rather than this crate reaching for a clock.
    pub fn set(
        &mut self,
        condition_type: ConditionType,
        reason: impl Into<String>,
        message: impl Into<String>,
        drift: Option<DriftReason>,
        now: DateTime<Utc>,
    ) {
        let reason = reason.into();
        let message = message.into();

        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            let transition_time = if existing.reason == reason {
                existing.last_transition_time
            } else {
                now
            };
            existing.reason = reason;
            existing.message = message;
            existing.drift = drift;
            existing.last_transition_time = transition_time;
            return;
        }

        self.conditions.push(Condition {
            condition_type,
            reason,
            message,
            drift,
            last_transition_time: now,
        });
    }
}
