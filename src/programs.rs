use crate::description::MachineDescription;
use crate::loader::{DescriptionLoader, Format};

use tracing::error;

/// A machine shipped with the crate.
struct EmbeddedMachine {
    source: &'static str,
    format: Format,
    sample_input: &'static [&'static str],
}

// Default embedded machines
const MACHINE_SOURCES: [EmbeddedMachine; 4] = [
    EmbeddedMachine {
        source: include_str!("../machines/binary-increment.tm"),
        format: Format::Text,
        sample_input: &["1101"],
    },
    EmbeddedMachine {
        source: include_str!("../machines/unary-addition.json"),
        format: Format::Json,
        sample_input: &["11+1"],
    },
    EmbeddedMachine {
        source: include_str!("../machines/two-tape-copy.json"),
        format: Format::Json,
        sample_input: &["1011"],
    },
    EmbeddedMachine {
        source: include_str!("../machines/palindrome.tm"),
        format: Format::Text,
        sample_input: &["abba"],
    },
];

/// A loaded catalogue entry.
pub struct CatalogEntry {
    pub description: MachineDescription,
    pub source: &'static str,
    pub format: Format,
    pub sample_input: Vec<String>,
}

lazy_static::lazy_static! {
    pub static ref MACHINES: Vec<CatalogEntry> = load_embedded();
}

fn load_embedded() -> Vec<CatalogEntry> {
    MACHINE_SOURCES
        .iter()
        .filter_map(|machine| {
            match DescriptionLoader::load_from_str(machine.source, machine.format) {
                Ok(description) => Some(CatalogEntry {
                    description,
                    source: machine.source,
                    format: machine.format,
                    sample_input: machine.sample_input.iter().map(|s| s.to_string()).collect(),
                }),
                Err(e) => {
                    error!(error = %e, "failed to load embedded machine");
                    None
                }
            }
        })
        .collect()
}

/// Read-only access to the built-in machines.
pub struct MachineCatalog;

impl MachineCatalog {
    /// Get the number of available machines
    pub fn count() -> usize {
        MACHINES.len()
    }

    /// List all machine names
    pub fn names() -> Vec<&'static str> {
        MACHINES.iter().map(|entry| entry.description.name()).collect()
    }

    /// Get a machine by its index
    pub fn by_index(index: usize) -> Option<&'static MachineDescription> {
        MACHINES.get(index).map(|entry| &entry.description)
    }

    /// Get a machine by its name, ignoring case
    pub fn by_name(name: &str) -> Option<&'static MachineDescription> {
        MACHINES
            .iter()
            .find(|entry| entry.description.name().eq_ignore_ascii_case(name))
            .map(|entry| &entry.description)
    }

    /// Get the catalogue entry, including its source text, by index
    pub fn entry(index: usize) -> Option<&'static CatalogEntry> {
        MACHINES.get(index)
    }

    /// Get information about a machine by its index
    pub fn info(index: usize) -> Option<MachineInfo> {
        let entry = MACHINES.get(index)?;
        let description = &entry.description;

        Some(MachineInfo {
            index,
            name: description.name().to_string(),
            tape_count: description.tape_count(),
            initial_state: description
                .state_name(description.initial_state())
                .to_string(),
            state_count: description.states().len(),
            transition_count: description.transition_count(),
            sample_input: entry.sample_input.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MachineInfo {
    pub index: usize,
    pub name: String,
    pub tape_count: usize,
    pub initial_state: String,
    pub state_count: usize,
    pub transition_count: usize,
    pub sample_input: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::machine::TuringMachine;
    use crate::types::Outcome;

    #[test]
    fn test_every_embedded_machine_loads() {
        assert_eq!(MachineCatalog::count(), MACHINE_SOURCES.len());
        assert_eq!(
            MachineCatalog::names(),
            vec![
                "Binary Increment",
                "Unary Addition",
                "Two-Tape Copy",
                "Palindrome"
            ]
        );
    }

    #[test]
    fn test_every_embedded_machine_accepts_its_sample() {
        for index in 0..MachineCatalog::count() {
            let entry = MachineCatalog::entry(index).unwrap();
            let mut machine = TuringMachine::new(&entry.description, &entry.sample_input).unwrap();

            let result = machine.run(&RunConfig::default());
            assert_eq!(
                result.outcome,
                Outcome::Accepted,
                "{} rejected its sample input",
                entry.description.name()
            );
        }
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let by_name = MachineCatalog::by_name("palindrome").unwrap();
        let by_index = MachineCatalog::by_index(3).unwrap();
        assert_eq!(by_name.name(), by_index.name());

        assert!(MachineCatalog::by_name("missing").is_none());
        assert!(MachineCatalog::by_index(99).is_none());
    }

    #[test]
    fn test_machine_info() {
        let info = MachineCatalog::info(2).unwrap();
        assert_eq!(info.name, "Two-Tape Copy");
        assert_eq!(info.tape_count, 2);
        assert_eq!(info.initial_state, "copy");
        assert_eq!(info.state_count, 2);
        assert_eq!(info.transition_count, 3);
        assert_eq!(info.sample_input, vec!["1011"]);

        assert!(MachineCatalog::info(99).is_none());
    }

    #[test]
    fn test_binary_increment() {
        let description = MachineCatalog::by_name("Binary Increment").unwrap();
        let mut machine = TuringMachine::new(description, &["111"]).unwrap();

        let result = machine.run(&RunConfig::default());
        assert_eq!(result.outcome, Outcome::Accepted);
        assert_eq!(result.steps, 4);
        assert_eq!(machine.tape_content(0, true).unwrap(), "0001");
    }

    #[test]
    fn test_unary_addition() {
        let description = MachineCatalog::by_name("Unary Addition").unwrap();
        let mut machine = TuringMachine::new(description, &["11+1"]).unwrap();

        machine.run(&RunConfig::default());
        assert_eq!(machine.tape_content(0, true).unwrap(), "111");
    }

    #[test]
    fn test_two_tape_copy() {
        let description = MachineCatalog::by_name("Two-Tape Copy").unwrap();
        let mut machine = TuringMachine::new(description, &["1011"]).unwrap();

        machine.run(&RunConfig::default());
        assert_eq!(machine.tape_contents(), vec!["1011", "1011"]);
    }

    #[test]
    fn test_palindrome() {
        let description = MachineCatalog::by_name("Palindrome").unwrap();

        for (input, expected) in [
            ("", Outcome::Accepted),
            ("a", Outcome::Accepted),
            ("aba", Outcome::Accepted),
            ("abba", Outcome::Accepted),
            ("ab", Outcome::Rejected),
            ("abb", Outcome::Rejected),
        ] {
            let mut machine = TuringMachine::new(description, &[input]).unwrap();
            assert_eq!(
                machine.run(&RunConfig::default()).outcome,
                expected,
                "input {input:?}"
            );
        }
    }
}
