//! Link descriptors and the link set builder
//!
//! Building runs the whole resolution pipeline for one definition, user and
//! parameter list: arity, parameter validation, the operability gate, then
//! per direction reachability and access. Unreachable directions keep an
//! empty placeholder so a later partial update has somewhere to land; denied
//! directions are left out entirely.
use crate::{
    access::{AccessRequest, AccessResolver},
    account::{Account, UserId},
    definition::ActionDefinition,
    error::{ActionLinkError, Result},
    link_style::LinkStyle,
    parameter::{NamedParameters, ParameterValue, RouteParameters},
    route::{ActionUrl, RouteTable},
    state_action::StateAction,
    token::CsrfTokenGenerator,
    utils::{css_identifier, escape_html, unique_css_identifier},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDescriptor {
    pub action_id: String,
    pub link_style: String,
    pub direction: String,
    /// Only set when the action has more than one direction.
    pub direction_label: Option<String>,
    pub state: Option<String>,
    pub user: UserId,
    pub route_parameters: RouteParameters,
    /// `None` for a placeholder.
    pub url: Option<ActionUrl>,
    pub label: Option<String>,
    /// Stable identifier of this direction, user and parameter combination.
    pub key: String,
    /// DOM id a partial update targets, set by link styles that need one.
    pub wrapper_id: Option<String>,
}

impl LinkDescriptor {
    pub fn is_placeholder(&self) -> bool {
        self.url.is_none()
    }

    pub fn render(&self) -> String {
        let class = css_identifier(["action-link", self.direction.as_str()]);
        let inner = match (&self.url, &self.label) {
            (Some(url), label) => format!(
                "<a href=\"{}\" class=\"action-link {class}\" data-action-link=\"{}\">{}</a>",
                escape_html(&url.to_string()),
                self.key,
                escape_html(label.as_deref().unwrap_or_default()),
            ),
            (None, _) => format!(
                "<span class=\"action-link action-link--empty\" data-action-link=\"{}\"></span>",
                self.key
            ),
        };
        match &self.wrapper_id {
            Some(id) => format!("<span id=\"{id}\" class=\"action-link-wrapper\">{inner}</span>"),
            None => inner,
        }
    }
}

/// Descriptors in direction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    links: Vec<LinkDescriptor>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, link: LinkDescriptor) {
        self.links.push(link);
    }
    pub fn get(&self, direction: &str) -> Option<&LinkDescriptor> {
        self.links.iter().find(|link| link.direction == direction)
    }
    pub fn remove(&mut self, direction: &str) -> Option<LinkDescriptor> {
        let index = self.links.iter().position(|link| link.direction == direction)?;
        Some(self.links.remove(index))
    }
    pub fn directions(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|link| link.direction.as_str())
    }
    pub fn iter(&self) -> impl Iterator<Item = &LinkDescriptor> {
        self.links.iter()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LinkDescriptor> {
        self.links.iter_mut()
    }
    pub fn len(&self) -> usize {
        self.links.len()
    }
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
    pub fn into_first(self) -> Option<LinkDescriptor> {
        self.links.into_iter().next()
    }
    pub fn render(&self) -> String {
        self.links.iter().map(LinkDescriptor::render).collect()
    }
}

/// What the link style sees while altering a freshly built set.
pub struct LinkBuildContext<'a> {
    pub definition: &'a ActionDefinition,
    pub account: &'a Account,
    pub parameters: &'a NamedParameters,
    pub route_parameters: &'a RouteParameters,
}

/// Check arity, name the positional values and let the plugin validate them.
pub fn prepare_parameters(
    definition: &ActionDefinition,
    plugin: &dyn StateAction,
    values: Vec<ParameterValue>,
) -> Result<NamedParameters> {
    let names = plugin.dynamic_parameter_names();
    if names.len() != values.len() {
        return Err(ActionLinkError::ParameterArity {
            action: definition.id().to_string(),
            expected: names.len(),
            given: values.len(),
        });
    }
    let parameters = NamedParameters::from_positional(&names, values);
    plugin.validate_parameters(&parameters)?;
    Ok(parameters)
}

pub struct LinkSetBuilder<'a> {
    routes: &'a RouteTable,
    tokens: &'a CsrfTokenGenerator,
    access: &'a dyn AccessResolver,
}

impl<'a> LinkSetBuilder<'a> {
    pub fn new(
        routes: &'a RouteTable,
        tokens: &'a CsrfTokenGenerator,
        access: &'a dyn AccessResolver,
    ) -> Self {
        Self {
            routes,
            tokens,
            access,
        }
    }

    /// Links for every direction of the definition.
    pub fn build(
        &self,
        definition: &ActionDefinition,
        plugin: &dyn StateAction,
        style: &dyn LinkStyle,
        account: &Account,
        values: Vec<ParameterValue>,
    ) -> Result<LinkSet> {
        self.build_directions(definition, plugin, style, account, values, None)
    }

    /// The link for one direction, `None` when it is denied or the action is
    /// not operable.
    pub fn build_single(
        &self,
        definition: &ActionDefinition,
        plugin: &dyn StateAction,
        style: &dyn LinkStyle,
        direction: &str,
        account: &Account,
        values: Vec<ParameterValue>,
    ) -> Result<Option<LinkDescriptor>> {
        let links =
            self.build_directions(definition, plugin, style, account, values, Some(direction))?;
        Ok(links.into_first())
    }

    fn build_directions(
        &self,
        definition: &ActionDefinition,
        plugin: &dyn StateAction,
        style: &dyn LinkStyle,
        account: &Account,
        values: Vec<ParameterValue>,
        only: Option<&str>,
    ) -> Result<LinkSet> {
        let parameters = prepare_parameters(definition, plugin, values)?;

        let directions = plugin.directions();
        if let Some(direction) = only {
            if !directions.iter().any(|(id, _)| id == direction) {
                return Err(ActionLinkError::invalid_parameter(
                    "direction",
                    format!("`{direction}` is not a direction of `{}`", definition.id()),
                ));
            }
        }

        if !plugin.check_operability(definition, &parameters) {
            tracing::debug!(action = %definition.id(), "action not operable, no links built");
            return Ok(LinkSet::new());
        }

        let route_parameters = plugin.convert_parameters_for_route(&parameters);
        let labelled = directions.len() > 1;

        let mut links = LinkSet::new();
        for (direction, direction_label) in directions
            .iter()
            .filter(|(id, _)| only.is_none_or(|only| only == id))
        {
            let state = plugin.next_state_name(direction, account, &parameters);

            let url = match &state {
                Some(state) => {
                    let request = AccessRequest {
                        definition,
                        plugin,
                        direction,
                        state,
                        account,
                        parameters: &parameters,
                    };
                    if !self.access.is_allowed(&request) {
                        tracing::debug!(action = %definition.id(), %direction, %state, user = account.id(), "direction denied, omitted");
                        continue;
                    }
                    let path = self.routes.path(
                        definition.id(),
                        definition.link_style_id(),
                        direction,
                        state,
                        account.id(),
                        &route_parameters,
                    )?;
                    let token = self.tokens.get(&path)?;
                    Some(ActionUrl { path, token })
                }
                None => {
                    tracing::debug!(action = %definition.id(), %direction, "direction unreachable, placeholder");
                    None
                }
            };

            links.push(LinkDescriptor {
                action_id: definition.id().to_string(),
                link_style: definition.link_style_id().to_string(),
                direction: direction.clone(),
                direction_label: labelled.then(|| direction_label.clone()),
                label: state
                    .as_deref()
                    .map(|state| plugin.link_label(direction, state, &parameters)),
                state,
                user: account.id(),
                route_parameters: route_parameters.clone(),
                url,
                key: link_key(definition.id(), direction, account.id(), &route_parameters),
                wrapper_id: None,
            });
        }

        if !links.is_empty() {
            let context = LinkBuildContext {
                definition,
                account,
                parameters: &parameters,
                route_parameters: &route_parameters,
            };
            style.alter_links_build(&mut links, &context);
        }
        Ok(links)
    }
}

/// Identifier of one direction's link for a user and parameter set.
pub fn link_key(
    action_id: &str,
    direction: &str,
    user: UserId,
    route_parameters: &RouteParameters,
) -> String {
    let user = user.to_string();
    unique_css_identifier(
        ["action-link", action_id, direction, user.as_str()]
            .into_iter()
            .chain(route_parameters.values()),
    )
}
