//! Schema cache: node type -> declared port descriptors
//!
//! The cache is built once from the registered node definitions and is
//! read-only afterwards. It answers two questions for the reconciler:
//! which ports a node type declares, and which current port an old port
//! name was renamed to.
//!
//! Definition mistakes (a name declared as both input and output, a name
//! declared twice) are reported and the offending declarations are left
//! out. They never abort the build.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::descriptor::{NodeDefinition, PortDescriptor};
use crate::types::PortDirection;

/// A mistake in a node type's port declarations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A port name is declared as both input and output
    #[error("Port '{port}' of '{node_type}' is declared as both input and output")]
    ConflictingDirection { node_type: String, port: String },

    /// A port name is declared twice in the same direction
    #[error("Port '{port}' of '{node_type}' is declared more than once")]
    DuplicatePort { node_type: String, port: String },

    /// A former name is shadowed by a current port or claimed by two ports
    #[error("Former name '{old_name}' of '{node_type}' is ambiguous")]
    AmbiguousRename { node_type: String, old_name: String },
}

/// Process-wide port schema for every registered node type
#[derive(Debug, Default)]
pub struct SchemaCache {
    /// Ordered descriptors per node type (inputs first, then outputs)
    ports: HashMap<String, Vec<PortDescriptor>>,
    /// Per node type: old port name -> current port name
    renames: HashMap<String, HashMap<String, String>>,
    /// Declarations excluded from the schema
    errors: Vec<SchemaError>,
}

impl SchemaCache {
    /// Build the cache from a set of node definitions
    pub fn build<'a>(definitions: impl IntoIterator<Item = &'a NodeDefinition>) -> Self {
        let mut cache = Self::default();
        for definition in definitions {
            cache.add_definition(definition);
        }
        log::debug!(
            "Schema cache built for {} node types ({} definition errors)",
            cache.ports.len(),
            cache.errors.len()
        );
        cache
    }

    fn add_definition(&mut self, definition: &NodeDefinition) {
        let node_type = &definition.node_type;

        let input_names: HashSet<&str> = definition.inputs.iter().map(|p| p.name.as_str()).collect();
        let output_names: HashSet<&str> = definition.outputs.iter().map(|p| p.name.as_str()).collect();
        let mut conflicting: Vec<&str> = input_names.intersection(&output_names).copied().collect();
        conflicting.sort_unstable();
        for port in &conflicting {
            self.report(SchemaError::ConflictingDirection {
                node_type: node_type.clone(),
                port: port.to_string(),
            });
        }

        let declared = definition
            .inputs
            .iter()
            .map(|p| (p, PortDirection::Input))
            .chain(definition.outputs.iter().map(|p| (p, PortDirection::Output)));

        let mut descriptors: Vec<PortDescriptor> = Vec::new();
        for (port, direction) in declared {
            if conflicting.contains(&port.name.as_str()) {
                continue;
            }
            if descriptors.iter().any(|d| d.name == port.name) {
                self.report(SchemaError::DuplicatePort {
                    node_type: node_type.clone(),
                    port: port.name.clone(),
                });
                continue;
            }
            let mut descriptor = port.clone();
            descriptor.direction = direction;
            descriptors.push(descriptor);
        }

        let mut renames: HashMap<String, String> = HashMap::new();
        let mut ambiguous: HashSet<String> = HashSet::new();
        for descriptor in &descriptors {
            for old_name in &descriptor.former_names {
                let shadowed = descriptors.iter().any(|d| &d.name == old_name);
                let claimed = renames
                    .get(old_name)
                    .is_some_and(|current| current != &descriptor.name);
                if shadowed || claimed || ambiguous.contains(old_name) {
                    if ambiguous.insert(old_name.clone()) {
                        self.report(SchemaError::AmbiguousRename {
                            node_type: node_type.clone(),
                            old_name: old_name.clone(),
                        });
                    }
                    renames.remove(old_name);
                    continue;
                }
                renames.insert(old_name.clone(), descriptor.name.clone());
            }
        }

        if !renames.is_empty() {
            self.renames.insert(node_type.clone(), renames);
        }
        self.ports.insert(node_type.clone(), descriptors);
    }

    fn report(&mut self, error: SchemaError) {
        log::warn!("Excluding port declaration: {}", error);
        self.errors.push(error);
    }

    /// Ordered port descriptors of a node type (empty if unknown)
    pub fn descriptors(&self, node_type: &str) -> &[PortDescriptor] {
        self.ports.get(node_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a single descriptor by port name
    pub fn descriptor(&self, node_type: &str, name: &str) -> Option<&PortDescriptor> {
        self.descriptors(node_type).iter().find(|d| d.name == name)
    }

    /// The current name of a port formerly called `old_name`
    pub fn rename_of(&self, node_type: &str, old_name: &str) -> Option<&str> {
        self.renames
            .get(node_type)
            .and_then(|renames| renames.get(old_name))
            .map(String::as_str)
    }

    /// Declarations that were excluded while building
    pub fn definition_errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Check if a node type is known to the cache
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.ports.contains_key(node_type)
    }
}

/// Instance port name of a dynamic list element
pub fn list_element_name(list: &str, index: usize) -> String {
    format!("{} {}", list, index)
}

/// Split a list element port name into its list name and index
pub fn parse_list_element(name: &str) -> Option<(&str, usize)> {
    let (list, index) = name.rsplit_once(' ')?;
    if list.is_empty() {
        return None;
    }
    index.parse().ok().map(|index| (list, index))
}
