//! Model-level definitions carried through composition
//!
//! Besides the graph, a model owns local function definitions, metadata
//! properties and device configurations. These are not renamed: they are
//! addressed by (domain, name, overload) or by key, so composed models take
//! the union, keeping the first definition seen.

use indexmap::IndexMap;

use crate::proto::{DeviceConfigurationProto, FunctionProto, ModelProto, StringStringEntryProto};

/// Identity of a local function
pub type FunctionKey = (String, String, String);

fn function_key(function: &FunctionProto) -> FunctionKey {
    (
        function.domain.clone(),
        function.name.clone(),
        function.overload.clone(),
    )
}

/// Ordered set of local functions, first definition per key wins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionSet {
    functions: IndexMap<FunctionKey, FunctionProto>,
}

impl FunctionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a function; returns `false` when its key was already present
    pub fn insert(&mut self, function: &FunctionProto) -> bool {
        let key = function_key(function);
        match self.functions.get(&key) {
            Some(existing) => {
                if existing != function {
                    log::warn!(
                        "function '{}::{}' is defined twice with different bodies, keeping the first",
                        key.0,
                        key.1
                    );
                }
                false
            }
            None => {
                self.functions.insert(key, function.clone());
                true
            }
        }
    }

    /// Record every local function of a model
    pub fn extend_from_model(&mut self, model: &ModelProto) {
        for function in &model.functions {
            self.insert(function);
        }
    }

    /// Check for a function by key
    pub fn contains(&self, domain: &str, name: &str, overload: &str) -> bool {
        self.functions
            .contains_key(&(domain.to_string(), name.to_string(), overload.to_string()))
    }

    /// Number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Functions in insertion order
    pub fn to_functions(&self) -> Vec<FunctionProto> {
        self.functions.values().cloned().collect()
    }
}

/// Union of the local functions of several models
pub fn union_functions(models: &[ModelProto]) -> Vec<FunctionProto> {
    let mut set = FunctionSet::new();
    for model in models {
        set.extend_from_model(model);
    }
    set.to_functions()
}

/// Union of metadata properties, first value per key wins
pub fn union_metadata_props(models: &[ModelProto]) -> Vec<StringStringEntryProto> {
    let mut props: IndexMap<&str, &str> = IndexMap::new();
    for entry in models.iter().flat_map(|m| &m.metadata_props) {
        match props.get(entry.key.as_str()) {
            Some(&value) if value != entry.value => {
                log::debug!("metadata '{}' already set, ignoring '{}'", entry.key, entry.value);
            }
            Some(_) => {}
            None => {
                props.insert(&entry.key, &entry.value);
            }
        }
    }

    props
        .into_iter()
        .map(|(key, value)| StringStringEntryProto {
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect()
}

/// Union of device configurations, first definition per name wins
pub fn union_configurations(models: &[ModelProto]) -> Vec<DeviceConfigurationProto> {
    let mut configs: IndexMap<&str, &DeviceConfigurationProto> = IndexMap::new();
    for config in models.iter().flat_map(|m| &m.configuration) {
        configs.entry(config.name.as_str()).or_insert(config);
    }
    configs.into_values().cloned().collect()
}
