//! Declarative configuration for state attributes.
//!
//! A state attribute is described by a nested state map plus a handful of
//! options. Configurations can be written in code (see [`crate::states!`])
//! or loaded from JSON:
//!
//! ```json
//! {
//!   "name": "state",
//!   "default": "draft",
//!   "states": {
//!     "draft": "beta",
//!     "beta": { "needs_testing": "needs_approval", "needs_approval": "approved" },
//!     "approved": "retired",
//!     "retired": null
//!   },
//!   "events": ["publish", "approve"],
//!   "track": ["beta"]
//! }
//! ```
//!
//! Map values may be `null` or `"none"` (no outgoing transitions), `"*"`
//! (every other leaf), a single state name, a list of names, or a nested
//! map, which declares a group.

use crate::builder::error::BuildError;
use crate::core::{IntoStates, StateId, NONE, WILDCARD};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Outgoing transitions declared for one entry of a state map.
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// No outgoing transitions.
    None,
    /// Every other leaf state in the tree.
    Wildcard,
    /// Explicit targets, which may name leaves, groups or the wildcard.
    List(Vec<StateId>),
    /// The entry is a group containing these children.
    Group(StateConfig),
}

impl Targets {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    fn parse(name: &str) -> Self {
        match name {
            NONE => Self::None,
            WILDCARD => Self::Wildcard,
            other => Self::List(vec![StateId::from(other)]),
        }
    }
}

impl From<&str> for Targets {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(names: [&str; N]) -> Self {
        Self::List(names.into_states())
    }
}

impl From<Vec<StateId>> for Targets {
    fn from(names: Vec<StateId>) -> Self {
        Self::List(names)
    }
}

impl From<StateConfig> for Targets {
    fn from(config: StateConfig) -> Self {
        Self::Group(config)
    }
}

impl<'de> Deserialize<'de> for Targets {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TargetsVisitor;

        impl<'de> Visitor<'de> for TargetsVisitor {
            type Value = Targets;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("null, a state name, a list of state names or a nested state map")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Targets::None)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Targets::None)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Targets::parse(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut names = Vec::new();
                while let Some(name) = seq.next_element::<String>()? {
                    names.push(StateId::from(name));
                }
                Ok(Targets::List(names))
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                Ok(Targets::Group(StateConfig {
                    entries: read_entries(map)?,
                }))
            }
        }

        deserializer.deserialize_any(TargetsVisitor)
    }
}

/// An ordered state map. Declaration order is preserved because it fixes
/// the order of children and of wildcard expansions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateConfig {
    entries: Vec<(StateId, Targets)>,
}

impl StateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning the map for chaining.
    pub fn state(mut self, name: impl Into<StateId>, targets: impl Into<Targets>) -> Self {
        self.insert(name, targets);
        self
    }

    /// Append an entry in place.
    pub fn insert(&mut self, name: impl Into<StateId>, targets: impl Into<Targets>) {
        self.entries.push((name.into(), targets.into()));
    }

    pub fn entries(&self) -> impl Iterator<Item = (&StateId, &Targets)> {
        self.entries.iter().map(|(name, targets)| (name, targets))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.as_str() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn read_entries<'de, A>(mut map: A) -> Result<Vec<(StateId, Targets)>, A::Error>
where
    A: MapAccess<'de>,
{
    let mut entries = Vec::new();
    while let Some((name, targets)) = map.next_entry::<String, Targets>()? {
        entries.push((StateId::from(name), targets));
    }
    Ok(entries)
}

impl<'de> Deserialize<'de> for StateConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StateConfigVisitor;

        impl<'de> Visitor<'de> for StateConfigVisitor {
            type Value = StateConfig;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of state names")
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                Ok(StateConfig {
                    entries: read_entries(map)?,
                })
            }
        }

        deserializer.deserialize_map(StateConfigVisitor)
    }
}

/// A named event and the state(s) it is expected to lead to.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDef {
    pub name: String,
    /// Empty when the event was declared without a target.
    pub targets: Vec<StateId>,
}

/// Ordered list of declared events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable(Vec<EventDef>);

impl EventTable {
    pub fn iter(&self) -> impl Iterator<Item = &EventDef> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&EventDef> {
        self.0.iter().find(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn upsert(&mut self, event: EventDef) {
        match self.0.iter_mut().find(|e| e.name == event.name) {
            Some(existing) => *existing = event,
            None => self.0.push(event),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventTargetsRepr {
    One(StateId),
    Many(Vec<StateId>),
}

impl<'de> Deserialize<'de> for EventTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EventTableVisitor;

        impl<'de> Visitor<'de> for EventTableVisitor {
            type Value = EventTable;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a list of event names or a map of event name to target states")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut table = EventTable::default();
                while let Some(name) = seq.next_element::<String>()? {
                    table.upsert(EventDef {
                        name,
                        targets: Vec::new(),
                    });
                }
                Ok(table)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = EventTable::default();
                while let Some((name, targets)) =
                    map.next_entry::<String, Option<EventTargetsRepr>>()?
                {
                    let targets = match targets {
                        None => Vec::new(),
                        Some(EventTargetsRepr::One(state)) => vec![state],
                        Some(EventTargetsRepr::Many(states)) => states,
                    };
                    table.upsert(EventDef { name, targets });
                }
                Ok(table)
            }
        }

        deserializer.deserialize_any(EventTableVisitor)
    }
}

fn default_attribute_name() -> String {
    "state".to_string()
}

/// Options for one state attribute.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeConfig {
    /// Attribute name, `state` unless given.
    #[serde(default = "default_attribute_name")]
    pub name: String,

    /// Value reported while the host has never stored one.
    #[serde(default)]
    pub default: Option<StateId>,

    pub states: StateConfig,

    #[serde(default)]
    pub events: EventTable,

    /// States or groups whose entry is timestamped and attributed.
    #[serde(default)]
    pub track: Vec<StateId>,

    /// Check the host's changed-value pair during host validation.
    #[serde(default)]
    pub validate_on_change: bool,

    /// Accept a never-set value during inclusion validation.
    #[serde(default)]
    pub allow_nil: bool,

    /// Message for inclusion validation failures.
    #[serde(default)]
    pub message: Option<String>,
}

impl AttributeConfig {
    pub fn new(name: impl Into<String>, states: StateConfig) -> Self {
        Self {
            name: name.into(),
            default: None,
            states,
            events: EventTable::default(),
            track: Vec::new(),
            validate_on_change: false,
            allow_nil: false,
            message: None,
        }
    }

    /// Parse a single attribute configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn default_state(mut self, state: impl Into<StateId>) -> Self {
        self.default = Some(state.into());
        self
    }

    /// Declare an event leading to the given state(s).
    pub fn event(mut self, name: impl Into<String>, targets: impl IntoStates) -> Self {
        self.events.upsert(EventDef {
            name: name.into(),
            targets: targets.into_states(),
        });
        self
    }

    /// Declare events without an implied target.
    pub fn event_names<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        for name in names {
            self.events.upsert(EventDef {
                name: name.into(),
                targets: Vec::new(),
            });
        }
        self
    }

    pub fn track(mut self, states: impl IntoStates) -> Self {
        self.track.extend(states.into_states());
        self
    }

    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }

    pub fn allow_nil(mut self, allowed: bool) -> Self {
        self.allow_nil = allowed;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Configuration for every attribute of one entity type.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    pub name: String,
    pub attributes: Vec<AttributeConfig>,
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_state_map_in_order() {
        let config: StateConfig = serde_json::from_str(
            r#"{
                "draft": "beta",
                "beta": { "needs_testing": "needs_approval", "needs_approval": "approved" },
                "approved": ["retired"],
                "retired": null
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = config.entries().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["draft", "beta", "approved", "retired"]);

        let (_, beta) = config.entries().nth(1).unwrap();
        match beta {
            Targets::Group(children) => {
                assert_eq!(children.len(), 2);
                assert!(children.contains("needs_testing"));
            }
            other => panic!("expected group, got {other:?}"),
        }

        let (_, retired) = config.entries().nth(3).unwrap();
        assert_eq!(retired, &Targets::None);
    }

    #[test]
    fn parses_wildcard_and_none_strings() {
        let config: StateConfig =
            serde_json::from_str(r#"{ "a": "*", "b": "none", "c": "a" }"#).unwrap();
        let targets: Vec<&Targets> = config.entries().map(|(_, t)| t).collect();
        assert_eq!(targets[0], &Targets::Wildcard);
        assert_eq!(targets[1], &Targets::None);
        assert_eq!(targets[2], &Targets::List(vec![StateId::from("a")]));
    }

    #[test]
    fn events_accept_a_plain_list() {
        let config = AttributeConfig::from_json(
            r#"{ "states": { "a": "b", "b": null }, "events": ["go", "stop"] }"#,
        )
        .unwrap();
        assert_eq!(config.name, "state");
        let names: Vec<&str> = config.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["go", "stop"]);
        assert!(config.events.iter().all(|e| e.targets.is_empty()));
    }

    #[test]
    fn events_accept_a_target_map() {
        let config = AttributeConfig::from_json(
            r#"{
                "name": "merge_status",
                "default": "na",
                "states": { "na": "pending", "pending": ["approved", "rejected"], "approved": null, "rejected": "pending" },
                "events": { "merge": "pending", "settle": ["approved", "rejected"], "noop": null }
            }"#,
        )
        .unwrap();
        assert_eq!(config.default, Some(StateId::from("na")));
        assert_eq!(config.events.get("merge").unwrap().targets, vec![StateId::from("pending")]);
        assert_eq!(config.events.get("settle").unwrap().targets.len(), 2);
        assert!(config.events.get("noop").unwrap().targets.is_empty());
    }

    #[test]
    fn unknown_options_are_rejected() {
        let result = AttributeConfig::from_json(r#"{ "states": {}, "prefix": "x_" }"#);
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn fluent_config_matches_json() {
        let fluent = AttributeConfig::new(
            "state",
            StateConfig::new().state("a", "b").state("b", Targets::None),
        )
        .default_state("a")
        .event("go", "b")
        .track("b");

        let parsed = AttributeConfig::from_json(
            r#"{ "default": "a", "states": { "a": "b", "b": null }, "events": { "go": "b" }, "track": ["b"] }"#,
        )
        .unwrap();

        assert_eq!(fluent.states, parsed.states);
        assert_eq!(fluent.events, parsed.events);
        assert_eq!(fluent.track, parsed.track);
        assert_eq!(fluent.default, parsed.default);
    }

    #[test]
    fn machine_config_lists_attributes() {
        let config = MachineConfig::from_json(
            r#"{ "name": "Kata", "attributes": [ { "states": { "a": null } }, { "name": "review", "states": { "open": "closed", "closed": null } } ] }"#,
        )
        .unwrap();
        assert_eq!(config.name, "Kata");
        assert_eq!(config.attributes.len(), 2);
        assert_eq!(config.attributes[1].name, "review");
    }
}
