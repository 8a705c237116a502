//! The state action plugin contract
//!
//! A state action knows the directions a target can move in, computes the
//! next state from live data, and performs the move. Everything it needs is
//! passed in per call; instances hold only their configuration and injected
//! stores.
use crate::{
    access::AccessResult,
    account::Account,
    definition::ActionDefinition,
    error::{ActionLinkError, Result, StoreError},
    parameter::{DynamicParameter, NamedParameters, RouteParameters},
};
use std::collections::BTreeMap;

/// Direction id used when a plugin declares no directions.
pub const DEFAULT_DIRECTION: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Text,
    Integer,
    Boolean,
    /// Machine name: lowercase letters, digits and underscores.
    MachineName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    pub name: String,
    pub kind: ConfigKind,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSchema {
    keys: Vec<ConfigKey>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn required(mut self, name: &str, kind: ConfigKind) -> Self {
        self.keys.push(ConfigKey {
            name: name.to_string(),
            kind,
            required: true,
        });
        self
    }
    pub fn optional(mut self, name: &str, kind: ConfigKind) -> Self {
        self.keys.push(ConfigKey {
            name: name.to_string(),
            kind,
            required: false,
        });
        self
    }
    pub fn keys(&self) -> &[ConfigKey] {
        &self.keys
    }

    /// Check required keys are present and every declared value parses as its kind.
    pub fn validate(&self, config: &PluginConfig) -> std::result::Result<(), String> {
        for key in &self.keys {
            let Some(value) = config.get(&key.name) else {
                if key.required {
                    return Err(format!("missing required configuration `{}`", key.name));
                }
                continue;
            };
            let valid = match key.kind {
                ConfigKind::Text => true,
                ConfigKind::Integer => value.parse::<i64>().is_ok(),
                ConfigKind::Boolean => matches!(value, "true" | "false"),
                ConfigKind::MachineName => crate::utils::is_machine_name(value),
            };
            if !valid {
                return Err(format!(
                    "configuration `{}` is not a valid {:?} value: `{value}`",
                    key.name, key.kind
                ));
            }
        }
        Ok(())
    }
}

/// Plugin configuration owned by an action definition.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq)]
#[cbor(array)]
pub struct PluginConfig(#[n(0)] BTreeMap<String, String>);

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|value| value.parse().ok())
    }
    /// A required string value, for use by plugin constructors.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| ActionLinkError::Config(format!("missing `{key}`")))
    }
}

/// Static declaration of a plugin, known before any instance exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateActionDefinition {
    pub id: String,
    pub label: String,
    /// Direction id to label, in display order.
    pub directions: Vec<(String, String)>,
    pub dynamic_parameters: Vec<String>,
    pub config_schema: ConfigSchema,
}

impl StateActionDefinition {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            directions: Vec::new(),
            dynamic_parameters: Vec::new(),
            config_schema: ConfigSchema::new(),
        }
    }
    pub fn direction(mut self, id: &str, label: &str) -> Self {
        self.directions.push((id.to_string(), label.to_string()));
        self
    }
    pub fn dynamic_parameter(mut self, name: &str) -> Self {
        self.dynamic_parameters.push(name.to_string());
        self
    }
    pub fn config_schema(mut self, schema: ConfigSchema) -> Self {
        self.config_schema = schema;
        self
    }
}

pub trait StateAction {
    fn definition(&self) -> &StateActionDefinition;

    /// Declared directions, or the single implicit one when none are declared.
    fn directions(&self) -> Vec<(String, String)> {
        let declared = &self.definition().directions;
        if declared.is_empty() {
            vec![(DEFAULT_DIRECTION.to_string(), String::new())]
        } else {
            declared.clone()
        }
    }

    /// Enumerable states; empty when the state space is unbounded.
    fn states(&self) -> Vec<String> {
        Vec::new()
    }

    fn dynamic_parameter_names(&self) -> Vec<String> {
        self.definition().dynamic_parameters.clone()
    }

    /// Typed parameters in declared order. Names must match
    /// `dynamic_parameter_names`.
    fn dynamic_parameters(&self) -> Vec<DynamicParameter> {
        self.dynamic_parameter_names()
            .iter()
            .map(|name| DynamicParameter::text(name))
            .collect()
    }

    fn validate_parameters(&self, _parameters: &NamedParameters) -> Result<()> {
        Ok(())
    }

    /// The state `direction` leads to from the current data, `None` when no
    /// transition is reachable.
    fn next_state_name(
        &self,
        direction: &str,
        account: &Account,
        parameters: &NamedParameters,
    ) -> Option<String>;

    /// Whether any transition is logically possible, whoever asks.
    fn check_operability(&self, definition: &ActionDefinition, parameters: &NamedParameters)
    -> bool;

    fn check_permission_access(
        &self,
        _definition: &ActionDefinition,
        _direction: &str,
        _state: &str,
        _account: &Account,
        _parameters: &NamedParameters,
    ) -> AccessResult {
        AccessResult::Neutral
    }

    fn check_operand_general_access(
        &self,
        _definition: &ActionDefinition,
        _account: &Account,
    ) -> AccessResult {
        AccessResult::Neutral
    }

    fn check_operand_access(
        &self,
        definition: &ActionDefinition,
        direction: &str,
        state: &str,
        account: &Account,
        parameters: &NamedParameters,
    ) -> AccessResult;

    /// Write `state` into the target. Store failures surface unchanged so
    /// the caller can report the transition as failed.
    fn advance_state(
        &self,
        account: &Account,
        state: &str,
        parameters: &NamedParameters,
    ) -> std::result::Result<(), StoreError>;

    fn link_label(&self, direction: &str, state: &str, parameters: &NamedParameters) -> String;

    fn message(&self, _direction: &str, _state: &str, _parameters: &NamedParameters) -> String {
        String::new()
    }

    fn failure_message(&self, _direction: &str, _state: &str, _parameters: &NamedParameters) -> String {
        format!("{} could not be applied.", self.definition().label)
    }

    fn convert_parameters_for_route(&self, parameters: &NamedParameters) -> RouteParameters {
        parameters.to_route()
    }
}
