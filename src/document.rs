//! The serialized form of a machine description.
//!
//! A `DescriptionDocument` mirrors the JSON wire format field by field and keeps every token as a
//! string. It performs no validation; `MachineDescription::from_document` turns it into a checked,
//! compiled description.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

use crate::types::{DEFAULT_BLANK_SYMBOL, DEFAULT_UNCHANGED_SYMBOL, DEFAULT_WILDCARD_SYMBOL};

/// A map that keeps its entries in insertion order and tolerates duplicate keys.
///
/// Transition tables rely on authoring order ("first listed wildcard wins"), and duplicate keys have
/// to survive deserialization so they can be reported instead of silently overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V>(Vec<(K, V)>);

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<K: PartialEq, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, even if the key is already present.
    pub fn push(&mut self, key: K, value: V) {
        self.0.push((key, value));
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the first value stored under `key`, appending a default one if there is none.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let index = match self.0.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.0.push((key, V::default()));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, K: Deserialize<'de>, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<K, V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K: Deserialize<'de>, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<K, V> {
            type Value = OrderedMap<K, V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Transition table: source state -> (comma-joined pattern -> action).
pub type TransitionTable = OrderedMap<String, OrderedMap<String, ActionRecord>>;

/// The action part of a serialized transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    /// One token per tape: a literal symbol or the "unchanged" token.
    pub write: Vec<String>,
    /// One direction token per tape.
    #[serde(rename = "move")]
    pub moves: Vec<String>,
    #[serde(alias = "next_state")]
    pub next_state: String,
}

/// A machine description as it appears on the wire.
///
/// The field names of the original table generator (`Q`, `Sigma`, `Gamma`, `num_tapes`, `q0`, `F`,
/// `delta`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Free text about the machine; not interpreted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(alias = "Q")]
    pub states: Vec<String>,
    #[serde(alias = "Sigma")]
    pub input_alphabet: Vec<String>,
    #[serde(alias = "Gamma")]
    pub tape_alphabet: Vec<String>,
    #[serde(alias = "num_tapes")]
    pub tape_count: usize,
    #[serde(alias = "q0")]
    pub initial_state: String,
    #[serde(alias = "F")]
    pub accepting_states: Vec<String>,
    #[serde(default = "default_blank")]
    pub blank: String,
    #[serde(default = "default_wildcard")]
    pub wildcard: String,
    #[serde(default = "default_unchanged")]
    pub unchanged: String,
    #[serde(alias = "delta")]
    pub transitions: TransitionTable,
}

fn default_blank() -> String {
    DEFAULT_BLANK_SYMBOL.to_string()
}

fn default_wildcard() -> String {
    DEFAULT_WILDCARD_SYMBOL.to_string()
}

fn default_unchanged() -> String {
    DEFAULT_UNCHANGED_SYMBOL.to_string()
}

impl DescriptionDocument {
    /// Creates an empty document with the default reserved tokens.
    pub fn new(name: impl Into<String>, tape_count: usize) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            states: Vec::new(),
            input_alphabet: Vec::new(),
            tape_alphabet: Vec::new(),
            tape_count,
            initial_state: String::new(),
            accepting_states: Vec::new(),
            blank: default_blank(),
            wildcard: default_wildcard(),
            unchanged: default_unchanged(),
            transitions: TransitionTable::new(),
        }
    }

    /// Appends a transition to `state`, after the ones already declared for it.
    pub fn add_rule(
        &mut self,
        state: &str,
        pattern: &str,
        write: &[&str],
        moves: &[&str],
        next_state: &str,
    ) -> &mut Self {
        self.transitions
            .entry_or_default(state.to_string())
            .push(
                pattern.to_string(),
                ActionRecord {
                    write: write.iter().map(|s| s.to_string()).collect(),
                    moves: moves.iter().map(|s| s.to_string()).collect(),
                    next_state: next_state.to_string(),
                },
            );
        self
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_map_keeps_authoring_order_and_duplicates() {
        let map: OrderedMap<String, u32> =
            serde_json::from_str(r#"{ "z": 1, "a": 2, "z": 3 }"#).unwrap();

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "z"]);
        assert_eq!(map.get(&"z".to_string()), Some(&1));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"z":1,"a":2,"z":3}"#);
    }

    #[test]
    fn test_original_field_names_are_accepted() {
        let content = r#"{
            "Q": ["q0", "q1"],
            "Sigma": ["a"],
            "Gamma": ["a", "_"],
            "num_tapes": 1,
            "q0": "q0",
            "F": ["q1"],
            "delta": {
                "q0": { "a": { "write": ["*"], "move": ["R"], "next_state": "q1" } }
            }
        }"#;

        let document = DescriptionDocument::from_json(content).unwrap();
        assert_eq!(document.states, vec!["q0", "q1"]);
        assert_eq!(document.tape_count, 1);
        assert_eq!(document.blank, "_");
        assert_eq!(document.wildcard, "*");

        let rules = document.transitions.get(&"q0".to_string()).unwrap();
        assert_eq!(rules.get(&"a".to_string()).unwrap().next_state, "q1");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let content = r#"{ "states": ["q0"], "tapeCount": 1 }"#;
        let error = DescriptionDocument::from_json(content).unwrap_err();
        assert!(error.to_string().contains("missing field"));
    }

    #[test]
    fn test_add_rule_groups_by_state() {
        let mut document = DescriptionDocument::new("Builder", 2);
        document
            .add_rule("q0", "a,*", &["*", "b"], &["R", "S"], "q0")
            .add_rule("q1", "_,_", &["*", "*"], &["S", "S"], "q1")
            .add_rule("q0", "*,*", &["*", "*"], &["S", "S"], "q1");

        assert_eq!(document.transitions.len(), 2);
        let q0 = document.transitions.get(&"q0".to_string()).unwrap();
        let patterns: Vec<_> = q0.keys().cloned().collect();
        assert_eq!(patterns, vec!["a,*", "*,*"]);
    }
}
