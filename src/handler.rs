//! Following an action link
//!
//! A request goes Pending -> Resolved. Building the `PendingRequest` matches
//! the route, checks the CSRF token and upcasts the parameters. Resolving it
//! checks access, re-checks operability and, when the link is still current,
//! advances the state before the link style shapes the response.
use crate::{
    access::AccessRequest,
    account::Account,
    definition::ActionDefinition,
    error::{ActionLinkError, Result},
    link::{LinkSet, prepare_parameters},
    link_style::{ActionOutcome, ActionResponse, LinkSetSource, LinkStyle},
    parameter::NamedParameters,
    route::RouteMatch,
    service::ActionLinkService,
    state_action::StateAction,
};
use std::sync::Arc;
use url::form_urlencoded;

#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub path: String,
    pub token: Option<String>,
    pub account: Account,
    pub referer: Option<String>,
}

impl ActionRequest {
    pub fn new(path: &str, account: Account) -> Self {
        Self {
            path: path.to_string(),
            token: None,
            account,
            referer: None,
        }
    }

    /// Split a followed `path?token=...` URL. The path is kept verbatim
    /// since the token is bound to it.
    pub fn from_url(url: &str, account: Account) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let token = form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == "token")
            .map(|(_, value)| value.into_owned());
        Self {
            token,
            ..Self::new(path, account)
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_referer(mut self, referer: &str) -> Self {
        self.referer = Some(referer.to_string());
        self
    }
}

/// A matched request whose token checked out and whose parameters are
/// upcast, awaiting access and operability checks.
pub struct PendingRequest<'a> {
    service: &'a ActionLinkService,
    request: &'a ActionRequest,
    route: RouteMatch,
    definition: ActionDefinition,
    plugin: Box<dyn StateAction>,
    style: Arc<dyn LinkStyle>,
    parameters: NamedParameters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub action_id: String,
    pub direction: String,
    pub state: String,
    /// False when the link was stale and nothing was written.
    pub completed: bool,
    pub message: Option<String>,
    pub response: ActionResponse,
}

impl<'a> PendingRequest<'a> {
    pub fn new(service: &'a ActionLinkService, request: &'a ActionRequest) -> Result<Self> {
        let route = service.routes().match_path(&request.path)?;

        let token_ok = request
            .token
            .as_deref()
            .is_some_and(|token| service.tokens().validate(token, &request.path));
        if !token_ok {
            tracing::warn!(action = %route.action_id, user = request.account.id(), "action link token rejected");
            return Err(ActionLinkError::InvalidToken(request.path.clone()));
        }

        let definition = service
            .load_definition(&route.action_id)?
            .with_link_style(&route.link_style);
        let style = service.link_style(&route.link_style)?;
        let plugin = service.instantiate(&definition)?;

        let values = service
            .converter()
            .upcast_all(&plugin.dynamic_parameters(), &route.parameters)?;
        let parameters = prepare_parameters(&definition, plugin.as_ref(), values)?;

        Ok(Self {
            service,
            request,
            route,
            definition,
            plugin,
            style,
            parameters,
        })
    }

    pub fn route(&self) -> &RouteMatch {
        &self.route
    }

    pub fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    /// Same decision the builder made when it emitted the link.
    pub fn check_access(&self) -> Result<()> {
        let account = &self.request.account;
        let denied = || ActionLinkError::AccessDenied {
            action: self.definition.id().to_string(),
            direction: self.route.direction.clone(),
        };

        if self.route.user != account.id() {
            tracing::warn!(
                action = %self.definition.id(),
                link_user = self.route.user,
                user = account.id(),
                "action link issued to another user"
            );
            return Err(denied());
        }
        if !self
            .plugin
            .directions()
            .iter()
            .any(|(id, _)| *id == self.route.direction)
        {
            return Err(ActionLinkError::invalid_parameter(
                "direction",
                format!("`{}` is not a direction of `{}`", self.route.direction, self.definition.id()),
            ));
        }

        let access = AccessRequest {
            definition: &self.definition,
            plugin: self.plugin.as_ref(),
            direction: &self.route.direction,
            state: &self.route.state,
            account,
            parameters: &self.parameters,
        };
        let dimensions = self.service.access().dimensions(&access);
        if !dimensions.is_allowed() {
            tracing::warn!(
                action = %self.definition.id(),
                direction = %self.route.direction,
                state = %self.route.state,
                user = account.id(),
                ?dimensions,
                "action link access denied"
            );
            return Err(denied());
        }
        Ok(())
    }

    /// Whether the requested transition is still the one the direction leads
    /// to. Repeating a completed request is therefore a no-op.
    pub fn is_operable(&self) -> bool {
        self.plugin.check_operability(&self.definition, &self.parameters)
            && self
                .plugin
                .next_state_name(&self.route.direction, &self.request.account, &self.parameters)
                .is_some_and(|next| next == self.route.state)
    }

    pub fn resolve(self) -> Result<ResolvedRequest> {
        self.check_access()?;

        let account = &self.request.account;
        let direction = self.route.direction.as_str();
        let state = self.route.state.as_str();

        let (completed, message) = if self.is_operable() {
            if let Err(source) = self.plugin.advance_state(account, state, &self.parameters) {
                let message = self.plugin.failure_message(direction, state, &self.parameters);
                tracing::error!(
                    action = %self.definition.id(),
                    %direction,
                    %state,
                    error = %source,
                    "{message}"
                );
                return Err(ActionLinkError::TransitionFailed {
                    action: self.definition.id().to_string(),
                    state: state.to_string(),
                    message,
                    source,
                });
            }
            let message = self.plugin.message(direction, state, &self.parameters);
            tracing::info!(action = %self.definition.id(), %direction, %state, user = account.id(), "action link followed");
            (true, Some(message).filter(|m| !m.is_empty()))
        } else {
            tracing::info!(action = %self.definition.id(), %direction, %state, user = account.id(), "stale action link ignored");
            (false, None)
        };

        let outcome = ActionOutcome {
            completed,
            definition: &self.definition,
            direction,
            state,
            account,
            route_parameters: &self.route.parameters,
            directions: self.plugin.directions().into_iter().map(|(id, _)| id).collect(),
            message: message.clone(),
            referer: self.request.referer.as_deref(),
            default_redirect: &self.service.settings().default_redirect,
        };
        let response = self.style.handle_action_request(&outcome, &self)?;

        Ok(ResolvedRequest {
            action_id: self.definition.id().to_string(),
            direction: direction.to_string(),
            state: state.to_string(),
            completed,
            message,
            response,
        })
    }
}

impl LinkSetSource for PendingRequest<'_> {
    /// Parameters are upcast again so the links reflect the written state.
    fn rebuild(&self) -> Result<LinkSet> {
        let values = self
            .service
            .converter()
            .upcast_all(&self.plugin.dynamic_parameters(), &self.route.parameters)?;
        self.service.link_builder().build(
            &self.definition,
            self.plugin.as_ref(),
            self.style.as_ref(),
            &self.request.account,
            values,
        )
    }
}
