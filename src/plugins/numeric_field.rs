//! Step an integer field up or down within optional bounds
use crate::{
    access::AccessResult,
    account::Account,
    behavior::{DirectionPermissions, Repeatable},
    definition::ActionDefinition,
    entity::FieldValue,
    error::{ActionLinkError, Result, StoreError},
    parameter::{DynamicParameter, NamedParameters},
    registry::PluginContext,
    state_action::{ConfigKind, ConfigSchema, PluginConfig, StateAction, StateActionDefinition},
    store::EntityStore,
};
use std::sync::Arc;

const ENTITY: &str = "entity";

pub fn definition() -> StateActionDefinition {
    StateActionDefinition::new("numeric_field", "Numeric field")
        .direction("increase", "Increase")
        .direction("decrease", "Decrease")
        .dynamic_parameter(ENTITY)
        .config_schema(
            ConfigSchema::new()
                .required("entity_type", ConfigKind::MachineName)
                .required("field_name", ConfigKind::MachineName)
                .optional("step", ConfigKind::Integer)
                .optional("min", ConfigKind::Integer)
                .optional("max", ConfigKind::Integer),
        )
}

pub struct NumericField {
    definition: StateActionDefinition,
    entity_type: String,
    field_name: String,
    step: i64,
    min: Option<i64>,
    max: Option<i64>,
    entities: Arc<dyn EntityStore>,
}

impl NumericField {
    pub fn new(
        definition: StateActionDefinition,
        config: &PluginConfig,
        entities: Arc<dyn EntityStore>,
    ) -> Result<Self> {
        let step = config.get_int("step").unwrap_or(1);
        if step <= 0 {
            return Err(ActionLinkError::Config(format!("step must be positive, got {step}")));
        }
        Ok(Self {
            definition,
            entity_type: config.require("entity_type")?.to_string(),
            field_name: config.require("field_name")?.to_string(),
            step,
            min: config.get_int("min"),
            max: config.get_int("max"),
            entities,
        })
    }

    pub fn create(
        definition: &StateActionDefinition,
        config: &PluginConfig,
        context: &PluginContext,
    ) -> Result<Box<dyn StateAction>> {
        Ok(Box::new(Self::new(
            definition.clone(),
            config,
            context.entities.clone(),
        )?))
    }

    fn current(&self, parameters: &NamedParameters) -> Option<i64> {
        match parameters.entity(ENTITY)?.field(&self.field_name)? {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    fn direction_label(&self, direction: &str) -> &str {
        self.definition
            .directions
            .iter()
            .find(|(id, _)| id == direction)
            .map(|(_, label)| label.as_str())
            .unwrap_or_default()
    }
}

impl StateAction for NumericField {
    fn definition(&self) -> &StateActionDefinition {
        &self.definition
    }

    fn dynamic_parameters(&self) -> Vec<DynamicParameter> {
        vec![DynamicParameter::entity(ENTITY, &self.entity_type)]
    }

    fn validate_parameters(&self, parameters: &NamedParameters) -> Result<()> {
        match parameters.entity(ENTITY) {
            Some(entity) if entity.entity_type() == self.entity_type => Ok(()),
            _ => Err(ActionLinkError::invalid_parameter(
                ENTITY,
                format!("expected a {} entity", self.entity_type),
            )),
        }
    }

    fn next_state_name(
        &self,
        direction: &str,
        _account: &Account,
        parameters: &NamedParameters,
    ) -> Option<String> {
        let current = self.current(parameters)?;
        let next = match direction {
            "increase" => current.checked_add(self.step)?,
            "decrease" => current.checked_sub(self.step)?,
            _ => return None,
        };
        if self.max.is_some_and(|max| next > max) || self.min.is_some_and(|min| next < min) {
            return None;
        }
        Some(next.to_string())
    }

    fn check_operability(
        &self,
        _definition: &ActionDefinition,
        parameters: &NamedParameters,
    ) -> bool {
        self.current(parameters).is_some()
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

    fn check_operand_general_access(
        &self,
        _definition: &ActionDefinition,
        account: &Account,
    ) -> AccessResult {
        AccessResult::allowed_if(account.has_permission(&format!("administer {}", self.entity_type)))
    }

    fn check_operand_access(
        &self,
        _definition: &ActionDefinition,
        _direction: &str,
        _state: &str,
        account: &Account,
        parameters: &NamedParameters,
    ) -> AccessResult {
        match parameters.entity(ENTITY) {
            Some(entity) => AccessResult::allowed_if(entity.update_access(account)),
            None => AccessResult::Neutral,
        }
    }

    fn advance_state(
        &self,
        _account: &Account,
        state: &str,
        parameters: &NamedParameters,
    ) -> std::result::Result<(), StoreError> {
        let value: i64 = state
            .parse()
            .map_err(|_| StoreError::Rejected(format!("`{state}` is not an integer state")))?;
        let id = parameters
            .entity(ENTITY)
            .map(|entity| entity.id())
            .ok_or_else(|| StoreError::Rejected("no target entity".into()))?;

        let mut entity = self
            .entities
            .load(&self.entity_type, id)?
            .ok_or_else(|| StoreError::Rejected(format!("{} {id} no longer exists", self.entity_type)))?;
        entity.set_field(&self.field_name, FieldValue::Integer(value));
        self.entities.save(&mut entity)
    }

    fn link_label(&self, direction: &str, _state: &str, _parameters: &NamedParameters) -> String {
        Repeatable.label(&self.field_name, self.direction_label(direction))
    }

    fn message(&self, _direction: &str, state: &str, _parameters: &NamedParameters) -> String {
        Repeatable.message(&self.field_name, state)
    }
}
