//! Dynamic parameters: declared, rich (named) and scalar (route) forms
use crate::{
    entity::{Entity, EntityId},
    error::{ActionLinkError, Result},
    store::EntityStore,
};
use std::sync::Arc;

/// Names the request path already uses; plugins may not declare them.
pub const RESERVED_PARAMETER_NAMES: [&str; 4] = ["direction", "state", "user", "linkStyle"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// An entity of the given type, addressed by id in routes.
    Entity { entity_type: String },
    Integer,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicParameter {
    pub name: String,
    pub kind: ParameterKind,
}

impl DynamicParameter {
    pub fn entity(name: &str, entity_type: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParameterKind::Entity {
                entity_type: entity_type.to_string(),
            },
        }
    }
    pub fn integer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParameterKind::Integer,
        }
    }
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParameterKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Entity(Entity),
    Integer(i64),
    Text(String),
}

impl ParameterValue {
    /// Primitive identifier for embedding in a URL.
    pub fn to_scalar(&self) -> String {
        match self {
            ParameterValue::Entity(entity) => entity.id().to_string(),
            ParameterValue::Integer(value) => value.to_string(),
            ParameterValue::Text(value) => value.clone(),
        }
    }
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            ParameterValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Entity> for ParameterValue {
    fn from(value: Entity) -> Self {
        ParameterValue::Entity(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

/// Parameters in the plugin's declared order, keyed by declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedParameters(Vec<(String, ParameterValue)>);

impl NamedParameters {
    /// Pair positional values with declared names. Arity must already match.
    pub fn from_positional(names: &[String], values: Vec<ParameterValue>) -> Self {
        Self(names.iter().cloned().zip(values).collect())
    }
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.get(name).and_then(ParameterValue::as_entity)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Default downcast: every value replaced by its scalar identifier.
    pub fn to_route(&self) -> RouteParameters {
        RouteParameters(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), value.to_scalar()))
                .collect(),
        )
    }
}

/// Scalar parameters as they appear in URLs. Holding only strings, a value
/// here can never be a rich object.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteParameters(Vec<(String, String)>);

impl RouteParameters {
    pub fn new(values: Vec<(String, String)>) -> Self {
        Self(values)
    }
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Upcasts raw route segments into the values a plugin expects.
pub trait ParameterConverter {
    fn upcast(&self, parameter: &DynamicParameter, raw: &str) -> Result<ParameterValue>;

    fn upcast_all(
        &self,
        parameters: &[DynamicParameter],
        raw: &RouteParameters,
    ) -> Result<Vec<ParameterValue>> {
        parameters
            .iter()
            .map(|parameter| {
                let value = raw.get(&parameter.name).ok_or_else(|| {
                    ActionLinkError::invalid_parameter(&parameter.name, "missing from route")
                })?;
                self.upcast(parameter, value)
            })
            .collect()
    }
}

/// Loads entity parameters from the entity store.
pub struct EntityParameterConverter {
    entities: Arc<dyn EntityStore>,
}

impl EntityParameterConverter {
    pub fn new(entities: Arc<dyn EntityStore>) -> Self {
        Self { entities }
    }
}

impl ParameterConverter for EntityParameterConverter {
    fn upcast(&self, parameter: &DynamicParameter, raw: &str) -> Result<ParameterValue> {
        match &parameter.kind {
            ParameterKind::Entity { entity_type } => {
                let id: EntityId = raw.parse().map_err(|_| {
                    ActionLinkError::invalid_parameter(&parameter.name, "not an entity id")
                })?;
                self.entities
                    .load(entity_type, id)?
                    .map(ParameterValue::Entity)
                    .ok_or_else(|| {
                        ActionLinkError::invalid_parameter(
                            &parameter.name,
                            format!("no {entity_type} with id {id}"),
                        )
                    })
            }
            ParameterKind::Integer => raw.parse().map(ParameterValue::Integer).map_err(|_| {
                ActionLinkError::invalid_parameter(&parameter.name, "not an integer")
            }),
            ParameterKind::Text => Ok(ParameterValue::Text(raw.to_string())),
        }
    }
}
