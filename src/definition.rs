//! Action definitions: the persisted configuration users interact with
use crate::{
    error::{ActionLinkError, Result},
    registry::{LinkStyleRegistry, StateActionRegistry},
    state_action::PluginConfig,
    utils,
};

/// Binds one state action plugin, its configuration and a link style.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ActionDefinition {
    #[n(0)]
    id: String,
    #[n(1)]
    label: String,
    #[n(2)]
    plugin_id: String,
    #[n(3)]
    plugin_config: PluginConfig,
    #[n(4)]
    link_style_id: String,
}

impl ActionDefinition {
    pub fn new(id: &str, label: &str, plugin_id: &str, link_style_id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            plugin_id: plugin_id.to_string(),
            plugin_config: PluginConfig::new(),
            link_style_id: link_style_id.to_string(),
        }
    }
    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.plugin_config.insert(key, value);
        self
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }
    pub fn plugin_config(&self) -> &PluginConfig {
        &self.plugin_config
    }
    pub fn link_style_id(&self) -> &str {
        &self.link_style_id
    }

    /// The blanket permission for using this action's links.
    pub fn permission_name(&self) -> String {
        format!("use {} action links", self.id)
    }

    pub fn route_name(&self) -> String {
        format!("action_link.{}", self.id)
    }

    /// Copy of this definition using another link style for the current
    /// request. Never persisted.
    pub fn with_link_style(&self, link_style_id: &str) -> Self {
        Self {
            link_style_id: link_style_id.to_string(),
            ..self.clone()
        }
    }

    /// Check the definition against the registered plugins and styles.
    pub fn validate(
        &self,
        plugins: &StateActionRegistry,
        styles: &LinkStyleRegistry,
    ) -> Result<()> {
        let invalid = |reason: String| ActionLinkError::InvalidDefinition {
            id: self.id.clone(),
            reason,
        };

        if !utils::is_machine_name(&self.id) {
            return Err(invalid("id must be a machine name".into()));
        }
        let plugin = plugins
            .definition(&self.plugin_id)
            .ok_or_else(|| ActionLinkError::UnknownPlugin(self.plugin_id.clone()))?;
        if styles.get(&self.link_style_id).is_none() {
            return Err(ActionLinkError::UnknownLinkStyle(self.link_style_id.clone()));
        }
        plugin
            .config_schema
            .validate(&self.plugin_config)
            .map_err(invalid)?;

        Ok(())
    }
}
