use crate::builder::MachineBuilder;
use crate::config::AttributeConfig;
use crate::core::{StateId, TrackingRecord};
use crate::host::Stateful;
use crate::ledger::TransitionLedger;
use crate::machine::Machine;
use crate::states;
use std::collections::HashMap;

/// In-memory host entity with ORM-like dirty tracking: `persist` clears
/// pending changes unless the record carries errors or rejects saves.
#[derive(Debug, Default, Clone)]
pub(crate) struct Record {
    pub(crate) values: HashMap<String, StateId>,
    pub(crate) saved: HashMap<String, StateId>,
    pub(crate) errors: Vec<(String, String)>,
    pub(crate) log: Vec<String>,
    pub(crate) tracked: Vec<(StateId, TrackingRecord)>,
    pub(crate) actor: Option<String>,
    pub(crate) flagged: bool,
    pub(crate) reject_saves: bool,
    pub(crate) saves: usize,
    ledger: TransitionLedger,
}

impl Record {
    pub(crate) fn set(&mut self, attribute: &str, value: &str) {
        self.values.insert(attribute.to_string(), StateId::from(value));
    }

    pub(crate) fn get(&self, attribute: &str) -> Option<&StateId> {
        self.values.get(attribute)
    }

    /// Treat the current values as persisted.
    pub(crate) fn save_point(&mut self) {
        self.saved = self.values.clone();
    }
}

impl Stateful for Record {
    fn read_state(&self, attribute: &str) -> Option<StateId> {
        self.values.get(attribute).cloned()
    }

    fn write_state(&mut self, attribute: &str, value: StateId) {
        self.values.insert(attribute.to_string(), value);
    }

    fn ledger(&self) -> &TransitionLedger {
        &self.ledger
    }

    fn add_error(&mut self, attribute: &str, message: String) {
        self.errors.push((attribute.to_string(), message));
    }

    fn changed_state(&self, attribute: &str) -> Option<(Option<StateId>, StateId)> {
        let current = self.values.get(attribute)?;
        let previous = self.saved.get(attribute);
        if previous == Some(current) {
            return None;
        }
        Some((previous.cloned(), current.clone()))
    }

    fn current_actor(&self) -> Option<String> {
        self.actor.clone()
    }

    fn record_tracking(&mut self, _attribute: &str, state: &StateId, record: TrackingRecord) {
        self.tracked.push((state.clone(), record));
    }

    fn persist(&mut self) -> bool {
        if self.reject_saves || !self.errors.is_empty() {
            return false;
        }
        self.save_point();
        self.saves += 1;
        true
    }
}

/// The draft/published kata workflow.
pub(crate) fn kata_config() -> AttributeConfig {
    AttributeConfig::new(
        "state",
        states! {
            draft => beta,
            published => {
                beta => {
                    needs_feedback => [draft, needs_approval],
                    needs_approval => [draft, approved],
                },
                approved => retired,
            },
            retired => none,
        },
    )
    .event("submit", "beta")
    .event("reject", "draft")
    .event("approve", "approved")
    .validate_on_change(true)
}

pub(crate) fn merge_config() -> AttributeConfig {
    AttributeConfig::new(
        "merge_status",
        states! {
            na => pending,
            pending => [approved, rejected],
            approved => none,
            rejected => pending,
        },
    )
    .default_state("na")
    .allow_nil(true)
}

pub(crate) fn kata_machine() -> Machine<Record> {
    MachineBuilder::new("Kata")
        .attribute(kata_config())
        .expect("kata config should be valid")
        .build()
        .expect("kata machine should build")
}

pub(crate) fn merge_machine() -> Machine<Record> {
    MachineBuilder::new("Merge")
        .attribute(merge_config())
        .expect("merge config should be valid")
        .build()
        .expect("merge machine should build")
}
