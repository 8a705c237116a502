//! Per-definition routes for followed action links
//!
//! Paths have the shape
//! `{base}/{action}/{linkStyle}/{direction}/{state}/{user}/{param}...`
//! with one trailing segment per declared dynamic parameter.
use crate::{
    account::UserId,
    definition::ActionDefinition,
    error::{ActionLinkError, Result},
    parameter::RouteParameters,
    state_action::StateActionDefinition,
};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Segments every action link path carries before its dynamic parameters.
const FIXED_SEGMENTS: [&str; 4] = ["linkStyle", "direction", "state", "user"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    pub name: String,
    pub action_id: String,
    pub path: String,
    pub parameter_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub action_id: String,
    pub link_style: String,
    pub direction: String,
    pub state: String,
    pub user: UserId,
    pub parameters: RouteParameters,
}

/// A followable link: path plus the CSRF token guarding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionUrl {
    pub path: String,
    pub token: String,
}

impl std::fmt::Display for ActionUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}?token={}", self.path, self.token)
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    base_path: String,
    routes: BTreeMap<String, RouteTemplate>,
}

impl RouteTable {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
            routes: BTreeMap::new(),
        }
    }

    /// Register (or replace) the route of one action definition.
    pub fn register(
        &mut self,
        definition: &ActionDefinition,
        plugin: &StateActionDefinition,
    ) -> &RouteTemplate {
        let mut path = format!("{}/{}", self.base_path, definition.id());
        for segment in FIXED_SEGMENTS
            .iter()
            .copied()
            .chain(plugin.dynamic_parameters.iter().map(String::as_str))
        {
            path.push_str("/{");
            path.push_str(segment);
            path.push('}');
        }

        tracing::debug!(route = %definition.route_name(), %path, "registered action link route");
        let action_id = definition.id().to_string();
        self.routes.insert(
            action_id.clone(),
            RouteTemplate {
                name: definition.route_name(),
                action_id: action_id.clone(),
                path,
                parameter_names: plugin.dynamic_parameters.clone(),
            },
        );
        &self.routes[&action_id]
    }

    pub fn unregister(&mut self, action_id: &str) -> Option<RouteTemplate> {
        self.routes.remove(action_id)
    }

    pub fn get(&self, action_id: &str) -> Option<&RouteTemplate> {
        self.routes.get(action_id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Concrete path for one transition.
    pub fn path(
        &self,
        action_id: &str,
        link_style: &str,
        direction: &str,
        state: &str,
        user: UserId,
        parameters: &RouteParameters,
    ) -> Result<String> {
        let template = self
            .get(action_id)
            .ok_or_else(|| ActionLinkError::NotFound(format!("route for `{action_id}`")))?;
        if template.parameter_names.len() != parameters.len() {
            return Err(ActionLinkError::ParameterArity {
                action: action_id.to_string(),
                expected: template.parameter_names.len(),
                given: parameters.len(),
            });
        }

        let user = user.to_string();
        let mut path = format!("{}/{}", self.base_path, encode_segment(action_id));
        for segment in [link_style, direction, state, user.as_str()]
            .into_iter()
            .chain(parameters.values())
        {
            path.push('/');
            path.push_str(&encode_segment(segment));
        }
        Ok(path)
    }

    /// Resolve an incoming path against the registered routes.
    pub fn match_path(&self, path: &str) -> Result<RouteMatch> {
        let not_found = || ActionLinkError::NotFound(path.to_string());

        let rest = path
            .strip_prefix(&self.base_path)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(not_found)?;
        let segments = rest
            .split('/')
            .map(decode_segment)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(not_found)?;

        let (action_id, rest) = segments.split_first().ok_or_else(not_found)?;
        let template = self.get(action_id).ok_or_else(not_found)?;
        if rest.len() != FIXED_SEGMENTS.len() + template.parameter_names.len() {
            return Err(not_found());
        }

        let user = rest[3].parse::<UserId>().map_err(|_| {
            ActionLinkError::invalid_parameter("user", format!("`{}` is not a user id", rest[3]))
        })?;
        let parameters = template
            .parameter_names
            .iter()
            .cloned()
            .zip(rest[FIXED_SEGMENTS.len()..].iter().cloned())
            .collect();

        Ok(RouteMatch {
            action_id: action_id.clone(),
            link_style: rest[0].clone(),
            direction: rest[1].clone(),
            state: rest[2].clone(),
            user,
            parameters: RouteParameters::new(parameters),
        })
    }
}

fn encode_segment(value: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    // dot segments would be collapsed by URL normalization
    if !encoded.is_empty() && encoded.bytes().all(|b| b == b'.') {
        encoded.replace('.', "%2E")
    } else {
        encoded
    }
}

/// Only the canonical encoding of a value is accepted, so every value has
/// exactly one path.
fn decode_segment(segment: &str) -> Option<String> {
    let value = form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(value, _)| value.into_owned())
        .unwrap_or_default();
    (encode_segment(&value) == segment).then_some(value)
}
