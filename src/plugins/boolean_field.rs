//! Toggle a boolean field on an entity
use crate::{
    access::AccessResult,
    account::Account,
    behavior::{DirectionPermissions, Toggle},
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
    StateActionDefinition::new("boolean_field", "Boolean field")
        .direction("toggle", "Toggle")
        .dynamic_parameter(ENTITY)
        .config_schema(
            ConfigSchema::new()
                .required("entity_type", ConfigKind::MachineName)
                .required("field_name", ConfigKind::MachineName)
                .optional("label", ConfigKind::Text),
        )
}

pub struct BooleanField {
    definition: StateActionDefinition,
    entity_type: String,
    field_name: String,
    label: Option<String>,
    entities: Arc<dyn EntityStore>,
}

impl BooleanField {
    pub fn new(
        definition: StateActionDefinition,
        config: &PluginConfig,
        entities: Arc<dyn EntityStore>,
    ) -> Result<Self> {
        Ok(Self {
            definition,
            entity_type: config.require("entity_type")?.to_string(),
            field_name: config.require("field_name")?.to_string(),
            label: config.get("label").map(str::to_string),
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

    fn current(&self, parameters: &NamedParameters) -> Option<bool> {
        match parameters.entity(ENTITY)?.field(&self.field_name)? {
            FieldValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl StateAction for BooleanField {
    fn definition(&self) -> &StateActionDefinition {
        &self.definition
    }

    fn states(&self) -> Vec<String> {
        Toggle::STATES.iter().map(|s| s.to_string()).collect()
    }

    fn dynamic_parameters(&self) -> Vec<DynamicParameter> {
        vec![DynamicParameter::entity(ENTITY, &self.entity_type)]
    }

    fn validate_parameters(&self, parameters: &NamedParameters) -> Result<()> {
        match parameters.entity(ENTITY) {
            Some(entity) if entity.entity_type() == self.entity_type => Ok(()),
            Some(entity) => Err(ActionLinkError::invalid_parameter(
                ENTITY,
                format!(
                    "expected a {} entity, got {}",
                    self.entity_type,
                    entity.entity_type()
                ),
            )),
            None => Err(ActionLinkError::invalid_parameter(ENTITY, "not an entity")),
        }
    }

    fn next_state_name(
        &self,
        _direction: &str,
        _account: &Account,
        parameters: &NamedParameters,
    ) -> Option<String> {
        self.current(parameters).map(|value| Toggle.next(value))
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
        let value = Toggle
            .parse(state)
            .ok_or_else(|| StoreError::Rejected(format!("`{state}` is not a boolean state")))?;
        let id = parameters
            .entity(ENTITY)
            .map(|entity| entity.id())
            .ok_or_else(|| StoreError::Rejected("no target entity".into()))?;

        // reload so the write is based on the latest stored revision
        let mut entity = self
            .entities
            .load(&self.entity_type, id)?
            .ok_or_else(|| StoreError::Rejected(format!("{} {id} no longer exists", self.entity_type)))?;
        entity.set_field(&self.field_name, FieldValue::Boolean(value));
        self.entities.save(&mut entity)
    }

    fn link_label(&self, _direction: &str, state: &str, _parameters: &NamedParameters) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => Toggle.label(&self.field_name, state),
        }
    }

    fn message(&self, _direction: &str, state: &str, _parameters: &NamedParameters) -> String {
        format!("{} set to {state}.", self.field_name)
    }
}
