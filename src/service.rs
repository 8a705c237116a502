//! Service layer API for action links
//!
//! `ActionLinkService` owns the stores, registries, routes and token
//! generator. Definitions persisted in the database are discovered when the
//! service starts and get one route each.
use crate::{
    access::{AccessResolver, DefaultAccessResolver},
    account::Account,
    config::Settings,
    definition::ActionDefinition,
    error::{ActionLinkError, Result},
    handler::{ActionRequest, PendingRequest, ResolvedRequest},
    link::{LinkDescriptor, LinkSet, LinkSetBuilder},
    link_style::LinkStyle,
    parameter::{EntityParameterConverter, ParameterConverter, ParameterValue, RouteParameters},
    placeholder::LazyLinkSet,
    registry::{LinkStyleRegistry, PluginContext, StateActionRegistry},
    route::RouteTable,
    state_action::StateAction,
    store::{DefinitionStore, SledStore},
    token::CsrfTokenGenerator,
};
use std::sync::Arc;

pub struct ActionLinkService {
    settings: Settings,
    context: PluginContext,
    definitions: Arc<dyn DefinitionStore>,
    plugins: StateActionRegistry,
    styles: LinkStyleRegistry,
    routes: RouteTable,
    tokens: CsrfTokenGenerator,
    access: Box<dyn AccessResolver>,
    converter: Box<dyn ParameterConverter>,
}

impl ActionLinkService {
    /// Service over one sled database with the bundled plugins and styles.
    pub fn new(instance: Arc<sled::Db>, settings: Settings) -> Result<Self> {
        let store = Arc::new(SledStore::new(instance)?);
        let context = PluginContext {
            entities: store.clone(),
            key_value: store.clone(),
        };
        Self::with_parts(
            settings,
            context,
            store,
            StateActionRegistry::with_defaults()?,
            LinkStyleRegistry::with_defaults(),
        )
    }

    pub fn with_parts(
        settings: Settings,
        context: PluginContext,
        definitions: Arc<dyn DefinitionStore>,
        plugins: StateActionRegistry,
        styles: LinkStyleRegistry,
    ) -> Result<Self> {
        settings.validate()?;
        let tokens = match &settings.token_key {
            Some(key) => CsrfTokenGenerator::new(key.clone()),
            None => CsrfTokenGenerator::generate()?,
        };
        let converter = Box::new(EntityParameterConverter::new(context.entities.clone()));

        let mut service = Self {
            routes: RouteTable::new(&settings.base_path),
            settings,
            context,
            definitions,
            plugins,
            styles,
            tokens,
            access: Box::new(DefaultAccessResolver),
            converter,
        };
        service.discover()?;
        Ok(service)
    }

    pub fn with_access_resolver(mut self, access: Box<dyn AccessResolver>) -> Self {
        self.access = access;
        self
    }

    pub fn with_converter(mut self, converter: Box<dyn ParameterConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Register a route for every stored definition whose plugin is known.
    fn discover(&mut self) -> Result<()> {
        for definition in self.definitions.definitions()? {
            match self.plugins.definition(definition.plugin_id()) {
                Some(plugin) => {
                    self.routes.register(&definition, plugin);
                }
                None => tracing::warn!(
                    action = %definition.id(),
                    plugin = %definition.plugin_id(),
                    "stored action link uses an unknown plugin, no route registered"
                ),
            }
        }
        tracing::info!(routes = self.routes.len(), "action link routes discovered");
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
    pub fn tokens(&self) -> &CsrfTokenGenerator {
        &self.tokens
    }
    pub fn access(&self) -> &dyn AccessResolver {
        self.access.as_ref()
    }
    pub fn converter(&self) -> &dyn ParameterConverter {
        self.converter.as_ref()
    }

    /// Validate, persist and route a definition. Saving an existing id
    /// replaces it.
    pub fn save_definition(&mut self, definition: &ActionDefinition) -> Result<()> {
        definition.validate(&self.plugins, &self.styles)?;
        // plugin specific configuration checks run in the factory
        self.instantiate(definition)?;

        self.definitions.save_definition(definition)?;
        if let Some(plugin) = self.plugins.definition(definition.plugin_id()) {
            self.routes.register(definition, plugin);
        }
        tracing::info!(action = %definition.id(), plugin = %definition.plugin_id(), "saved action link");
        Ok(())
    }

    pub fn delete_definition(&mut self, id: &str) -> Result<bool> {
        let deleted = self.definitions.delete_definition(id)?;
        self.routes.unregister(id);
        if deleted {
            tracing::info!(action = %id, "deleted action link");
        }
        Ok(deleted)
    }

    pub fn load_definition(&self, id: &str) -> Result<ActionDefinition> {
        self.definitions
            .load_definition(id)?
            .ok_or_else(|| ActionLinkError::NotFound(format!("action link `{id}`")))
    }

    pub fn definitions(&self) -> Result<Vec<ActionDefinition>> {
        Ok(self.definitions.definitions()?)
    }

    /// A configured plugin instance for the definition.
    pub fn instantiate(&self, definition: &ActionDefinition) -> Result<Box<dyn StateAction>> {
        self.plugins
            .create(definition.plugin_id(), definition.plugin_config(), &self.context)
    }

    pub fn link_style(&self, id: &str) -> Result<Arc<dyn LinkStyle>> {
        self.styles
            .get(id)
            .ok_or_else(|| ActionLinkError::UnknownLinkStyle(id.to_string()))
    }

    pub fn link_builder(&self) -> LinkSetBuilder<'_> {
        LinkSetBuilder::new(&self.routes, &self.tokens, self.access.as_ref())
    }

    /// Links for every direction of `definition` as seen by `account`.
    pub fn build_link_set(
        &self,
        definition: &ActionDefinition,
        account: &Account,
        values: Vec<ParameterValue>,
    ) -> Result<LinkSet> {
        let plugin = self.instantiate(definition)?;
        let style = self.link_style(definition.link_style_id())?;
        self.link_builder()
            .build(definition, plugin.as_ref(), style.as_ref(), account, values)
    }

    pub fn build_single_link(
        &self,
        definition: &ActionDefinition,
        direction: &str,
        account: &Account,
        values: Vec<ParameterValue>,
    ) -> Result<Option<LinkDescriptor>> {
        let plugin = self.instantiate(definition)?;
        let style = self.link_style(definition.link_style_id())?;
        self.link_builder().build_single(
            definition,
            plugin.as_ref(),
            style.as_ref(),
            direction,
            account,
            values,
        )
    }

    /// Like `build_link_set`, upcasting scalar parameters first.
    pub fn build_from_route(
        &self,
        definition: &ActionDefinition,
        account: &Account,
        parameters: &RouteParameters,
    ) -> Result<LinkSet> {
        let plugin = self.instantiate(definition)?;
        let style = self.link_style(definition.link_style_id())?;
        let values = self
            .converter
            .upcast_all(&plugin.dynamic_parameters(), parameters)?;
        self.link_builder()
            .build(definition, plugin.as_ref(), style.as_ref(), account, values)
    }

    /// Follow an action link.
    pub fn handle(&self, request: &ActionRequest) -> Result<ResolvedRequest> {
        PendingRequest::new(self, request)?.resolve()
    }

    /// A user independent marker for a link set, resolved per user later.
    pub fn lazy_link_set(&self, action_id: &str, parameters: RouteParameters) -> Result<LazyLinkSet> {
        if self.routes.get(action_id).is_none() {
            return Err(ActionLinkError::NotFound(format!("action link `{action_id}`")));
        }
        Ok(LazyLinkSet::new(action_id, parameters))
    }
}
