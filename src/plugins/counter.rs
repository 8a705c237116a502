//! Per-user item counters, such as a shopping cart
use crate::{
    access::AccessResult,
    account::Account,
    behavior::{DirectionPermissions, Repeatable},
    definition::ActionDefinition,
    error::{Result, StoreError},
    parameter::{DynamicParameter, NamedParameters},
    registry::PluginContext,
    state_action::{ConfigKind, ConfigSchema, PluginConfig, StateAction, StateActionDefinition},
    store::KeyValueStore,
};
use std::sync::Arc;

const ITEM: &str = "item";

pub fn definition() -> StateActionDefinition {
    StateActionDefinition::new("counter", "Item counter")
        .direction("add", "Add")
        .direction("remove", "Remove")
        .dynamic_parameter(ITEM)
        .config_schema(
            ConfigSchema::new()
                .optional("collection", ConfigKind::MachineName)
                .optional("max", ConfigKind::Integer),
        )
}

pub struct Counter {
    definition: StateActionDefinition,
    collection: String,
    max: Option<i64>,
    store: Arc<dyn KeyValueStore>,
}

impl Counter {
    pub fn new(
        definition: StateActionDefinition,
        config: &PluginConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            definition,
            collection: config.get("collection").unwrap_or("cart").to_string(),
            max: config.get_int("max"),
            store,
        }
    }

    pub fn create(
        definition: &StateActionDefinition,
        config: &PluginConfig,
        context: &PluginContext,
    ) -> Result<Box<dyn StateAction>> {
        Ok(Box::new(Self::new(
            definition.clone(),
            config,
            context.key_value.clone(),
        )))
    }

    fn key(account: &Account, item: &str) -> String {
        format!("{}:{item}", account.id())
    }

    fn item<'a>(parameters: &'a NamedParameters) -> &'a str {
        parameters
            .get(ITEM)
            .and_then(|value| value.as_text())
            .unwrap_or_default()
    }

    fn count(&self, account: &Account, item: &str) -> Option<i64> {
        match self.store.get(&self.collection, &Self::key(account, item)) {
            Ok(count) => Some(count.unwrap_or(0)),
            Err(err) => {
                tracing::error!(collection = %self.collection, error = %err, "failed to read counter");
                None
            }
        }
    }
}

impl StateAction for Counter {
    fn definition(&self) -> &StateActionDefinition {
        &self.definition
    }

    fn dynamic_parameters(&self) -> Vec<DynamicParameter> {
        vec![DynamicParameter::text(ITEM)]
    }

    fn next_state_name(
        &self,
        direction: &str,
        account: &Account,
        parameters: &NamedParameters,
    ) -> Option<String> {
        let count = self.count(account, Self::item(parameters))?;
        let next = match direction {
            "add" if self.max.is_none_or(|max| count < max) => count + 1,
            "remove" if count > 0 => count - 1,
            _ => return None,
        };
        Some(next.to_string())
    }

    fn check_operability(
        &self,
        _definition: &ActionDefinition,
        parameters: &NamedParameters,
    ) -> bool {
        !Self::item(parameters).is_empty()
    }

    fn check_permission_access(
        &self,
        definition: &ActionDefinition,
        direction: &str,
        _state: &str,
        account: &Account,
        _parameters: &NamedParameters,
    ) -> AccessResult {
        DirectionPermissions.check(definition, direction, account)
    }

    fn check_operand_access(
        &self,
        _definition: &ActionDefinition,
        _direction: &str,
        _state: &str,
        account: &Account,
        _parameters: &NamedParameters,
    ) -> AccessResult {
        // counters are keyed by account, anonymous visitors would share one
        AccessResult::allowed_if(!account.is_anonymous())
    }

    fn advance_state(
        &self,
        account: &Account,
        state: &str,
        parameters: &NamedParameters,
    ) -> std::result::Result<(), StoreError> {
        let value: i64 = state
            .parse()
            .map_err(|_| StoreError::Rejected(format!("`{state}` is not a count")))?;
        self.store
            .set(&self.collection, &Self::key(account, Self::item(parameters)), value)
    }

    fn link_label(&self, direction: &str, _state: &str, parameters: &NamedParameters) -> String {
        let label = match direction {
            "add" => "Add",
            _ => "Remove",
        };
        Repeatable.label(Self::item(parameters), label)
    }

    fn message(&self, _direction: &str, state: &str, parameters: &NamedParameters) -> String {
        format!("{} in {}: {state}.", Self::item(parameters), self.collection)
    }
}
