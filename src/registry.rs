//! Typed registries of state action plugins and link styles
//!
//! Plugins are registered once at startup with their static definition and a
//! factory. Reserved parameter names are rejected here, before any request is
//! served.
use crate::{
    error::{ActionLinkError, Result},
    link_style::{FullReload, LinkStyle, PartialUpdate},
    parameter::RESERVED_PARAMETER_NAMES,
    plugins,
    state_action::{PluginConfig, StateAction, StateActionDefinition},
    store::{EntityStore, KeyValueStore},
};
use std::{collections::BTreeMap, sync::Arc};

/// Stores injected into plugin instances.
#[derive(Clone)]
pub struct PluginContext {
    pub entities: Arc<dyn EntityStore>,
    pub key_value: Arc<dyn KeyValueStore>,
}

pub type StateActionFactory =
    Box<dyn Fn(&StateActionDefinition, &PluginConfig, &PluginContext) -> Result<Box<dyn StateAction>>>;

struct RegisteredPlugin {
    definition: StateActionDefinition,
    factory: StateActionFactory,
}

#[derive(Default)]
pub struct StateActionRegistry {
    plugins: BTreeMap<String, RegisteredPlugin>,
}

impl StateActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundled plugins.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        plugins::register_defaults(&mut registry)?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        definition: StateActionDefinition,
        factory: StateActionFactory,
    ) -> Result<()> {
        if let Some(name) = definition
            .dynamic_parameters
            .iter()
            .find(|name| RESERVED_PARAMETER_NAMES.contains(&name.as_str()))
        {
            return Err(ActionLinkError::PluginDiscovery {
                plugin: definition.id.clone(),
                name: name.clone(),
            });
        }
        for (i, name) in definition.dynamic_parameters.iter().enumerate() {
            if definition.dynamic_parameters[..i].contains(name) {
                return Err(ActionLinkError::InvalidDefinition {
                    id: definition.id.clone(),
                    reason: format!("dynamic parameter `{name}` declared twice"),
                });
            }
        }
        if self.plugins.contains_key(&definition.id) {
            return Err(ActionLinkError::InvalidDefinition {
                id: definition.id.clone(),
                reason: "plugin id already registered".into(),
            });
        }

        tracing::debug!(plugin = %definition.id, "registered state action plugin");
        self.plugins.insert(
            definition.id.clone(),
            RegisteredPlugin {
                definition,
                factory,
            },
        );
        Ok(())
    }

    pub fn definition(&self, plugin_id: &str) -> Option<&StateActionDefinition> {
        self.plugins.get(plugin_id).map(|p| &p.definition)
    }

    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        plugin_id: &str,
        config: &PluginConfig,
        context: &PluginContext,
    ) -> Result<Box<dyn StateAction>> {
        let plugin = self
            .plugins
            .get(plugin_id)
            .ok_or_else(|| ActionLinkError::UnknownPlugin(plugin_id.to_string()))?;
        (plugin.factory)(&plugin.definition, config, context)
    }
}

#[derive(Default, Clone)]
pub struct LinkStyleRegistry {
    styles: BTreeMap<String, Arc<dyn LinkStyle>>,
}

impl LinkStyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full reload (`nojs`) and partial update (`ajax`) styles.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FullReload));
        registry.register(Arc::new(PartialUpdate));
        registry
    }

    pub fn register(&mut self, style: Arc<dyn LinkStyle>) {
        self.styles.insert(style.id().to_string(), style);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn LinkStyle>> {
        self.styles.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SledStore;

    fn noop_factory() -> StateActionFactory {
        Box::new(
            |_: &StateActionDefinition,
             _: &PluginConfig,
             _: &PluginContext|
             -> Result<Box<dyn StateAction>> {
                Err(ActionLinkError::Config("not constructible".into()))
            },
        )
    }

    #[test]
    fn reserved_parameter_names_fail_discovery() {
        let mut registry = StateActionRegistry::new();

        for reserved in RESERVED_PARAMETER_NAMES {
            let definition = StateActionDefinition::new("bad", "Bad")
                .dynamic_parameter("node")
                .dynamic_parameter(reserved);

            let err = registry.register(definition, noop_factory()).unwrap_err();
            assert!(matches!(err, ActionLinkError::PluginDiscovery { ref name, .. } if name == reserved));
        }
        assert!(registry.definition("bad").is_none());
    }

    #[test]
    fn duplicate_plugins_are_rejected() {
        let mut registry = StateActionRegistry::new();
        let definition = StateActionDefinition::new("dup", "Dup");

        registry.register(definition.clone(), noop_factory()).unwrap();
        assert!(registry.register(definition, noop_factory()).is_err());
    }

    #[test]
    fn defaults_are_constructible() {
        let registry = StateActionRegistry::with_defaults().unwrap();
        let store = Arc::new(SledStore::temporary().unwrap());
        let context = PluginContext {
            entities: store.clone(),
            key_value: store,
        };

        let mut config = PluginConfig::new();
        config.insert("entity_type", "article");
        config.insert("field_name", "published");

        let plugin = registry.create("boolean_field", &config, &context).unwrap();
        assert_eq!(plugin.definition().id, "boolean_field");
        assert!(registry.create("missing", &config, &context).is_err());

        let styles = LinkStyleRegistry::with_defaults();
        assert!(styles.get("nojs").is_some());
        assert!(styles.get("ajax").is_some());
    }
}
